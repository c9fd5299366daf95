//! Tokenizer for SVG number lists: path parameters, `points` attributes and
//! `transform()` argument lists all funnel through `push_floats`.

use crate::error::KeylineError;

fn read_float(dst: &mut Vec<f64>, token: &str) -> Result<(), KeylineError> {
    let value: f64 = token
        .parse()
        .map_err(|_| KeylineError::BadNumber(token.to_string()))?;
    // Overflowing tokens parse to infinity in Rust; treat them as malformed.
    if !value.is_finite() {
        return Err(KeylineError::BadNumber(token.to_string()));
    }
    dst.push(value);
    Ok(())
}

/// Scans `text` for floating point tokens and appends them to `dst`.
///
/// A token is a maximal run of digits, `.`, `e`, and a `-` directly after an
/// `e`. A `-` anywhere else acts as an implicit separator and starts the next
/// token, so `100-50` reads as two values. Every other character just ends
/// the current token.
pub fn push_floats(dst: &mut Vec<f64>, text: &str) -> Result<(), KeylineError> {
    let mut token_start: Option<usize> = None;
    let mut prev = ' ';
    for (i, r) in text.char_indices() {
        let in_number =
            r.is_ascii_digit() || r == '.' || r == 'e' || (r == '-' && prev == 'e');
        if !in_number {
            if let Some(start) = token_start {
                read_float(dst, &text[start..i])?;
            }
            token_start = if r == '-' { Some(i) } else { None };
        } else if token_start.is_none() {
            token_start = Some(i);
        }
        prev = r;
    }
    if let Some(start) = token_start {
        read_float(dst, &text[start..])?;
    }
    Ok(())
}

/// Reads a fraction or percentage, clamped to [0, 1]. Used for gradient
/// geometry and stop offsets.
pub fn read_fraction(text: &str) -> Result<f64, KeylineError> {
    let text = text.trim();
    let (digits, divisor) = match text.strip_suffix('%') {
        Some(rest) => (rest, 100.0),
        None => (text, 1.0),
    };
    let value: f64 = digits
        .parse()
        .map_err(|_| KeylineError::BadNumber(text.to_string()))?;
    if !value.is_finite() {
        return Err(KeylineError::BadNumber(text.to_string()));
    }
    Ok((value / divisor).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(text: &str) -> Vec<f64> {
        let mut out = Vec::new();
        push_floats(&mut out, text).expect("tokenize");
        out
    }

    #[test]
    fn splits_on_commas_and_whitespace() {
        assert_eq!(floats("20,20 0\t400"), vec![20.0, 20.0, 0.0, 400.0]);
    }

    #[test]
    fn minus_is_an_implicit_separator() {
        assert_eq!(floats("100-50"), vec![100.0, -50.0]);
        assert_eq!(floats("-1-2-3"), vec![-1.0, -2.0, -3.0]);
    }

    #[test]
    fn minus_after_exponent_stays_in_token() {
        assert_eq!(floats("1e-5 2e3"), vec![1e-5, 2000.0]);
    }

    #[test]
    fn plus_terminates_and_is_dropped() {
        // '+' is not a number character, so it only separates.
        assert_eq!(floats("5+3"), vec![5.0, 3.0]);
    }

    #[test]
    fn bare_exponent_is_rejected() {
        let mut out = Vec::new();
        assert!(matches!(
            push_floats(&mut out, "1e"),
            Err(KeylineError::BadNumber(_))
        ));
    }

    #[test]
    fn overflowing_exponent_is_rejected() {
        let mut out = Vec::new();
        assert!(matches!(
            push_floats(&mut out, "1e999"),
            Err(KeylineError::BadNumber(_))
        ));
    }

    #[test]
    fn doubled_decimal_point_is_rejected() {
        let mut out = Vec::new();
        assert!(matches!(
            push_floats(&mut out, ".5.25"),
            Err(KeylineError::BadNumber(_))
        ));
    }

    #[test]
    fn fraction_accepts_percent_and_clamps() {
        assert_eq!(read_fraction("50%").unwrap(), 0.5);
        assert_eq!(read_fraction(" 0.75 ").unwrap(), 0.75);
        assert_eq!(read_fraction("1.5").unwrap(), 1.0);
        assert_eq!(read_fraction("-0.2").unwrap(), 0.0);
        assert_eq!(read_fraction("120%").unwrap(), 1.0);
    }
}
