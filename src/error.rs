use std::fmt;

#[derive(Debug)]
pub enum KeylineError {
    /// A numeric token could not be parsed as a finite float.
    BadNumber(String),
    /// A path command or attribute carried the wrong number of parameters.
    ParamMismatch,
    /// An unrecognized path command letter, surfaced only in strict mode.
    UnknownCommand(char),
    OddPointsInPolygon,
    /// A gradient frame could not be inverted.
    SingularMatrix,
    ZeroLengthId,
    MissingId(String),
    /// An SVG element this subset does not handle, surfaced only in strict mode.
    UnsupportedElement(String),
    Xml(roxmltree::Error),
    Io(std::io::Error),
}

impl fmt::Display for KeylineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeylineError::BadNumber(token) => write!(f, "bad number: {:?}", token),
            KeylineError::ParamMismatch => write!(f, "param mismatch"),
            KeylineError::UnknownCommand(cmd) => write!(f, "unknown command: {}", cmd),
            KeylineError::OddPointsInPolygon => {
                write!(f, "polygon has odd number of points")
            }
            KeylineError::SingularMatrix => write!(f, "matrix is not invertible"),
            KeylineError::ZeroLengthId => write!(f, "zero length id"),
            KeylineError::MissingId(id) => write!(f, "cannot find id: {}", id),
            KeylineError::UnsupportedElement(name) => {
                write!(f, "cannot process svg element {}", name)
            }
            KeylineError::Xml(err) => write!(f, "xml error: {}", err),
            KeylineError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for KeylineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeylineError::Xml(err) => Some(err),
            KeylineError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<roxmltree::Error> for KeylineError {
    fn from(value: roxmltree::Error) -> Self {
        KeylineError::Xml(value)
    }
}

impl From<std::io::Error> for KeylineError {
    fn from(value: std::io::Error) -> Self {
        KeylineError::Io(value)
    }
}
