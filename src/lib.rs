mod arc;
mod cursor;
mod error;
mod gradient;
mod icon;
mod matrix;
mod numbers;
mod path;
mod reader;
mod style;
mod types;

pub use arc::find_ellipse_center;
pub use cursor::{ErrorMode, PathCursor};
pub use error::KeylineError;
pub use gradient::{
    Bounds, ColorFunc, ColorSource, GradStop, Gradient, GradientKind, GradientUnits, SpreadMethod,
};
pub use icon::{Scanner, SvgIcon, SvgPath};
pub use matrix::{Matrix2D, MatrixEmitter};
pub use numbers::{push_floats, read_fraction};
pub use path::{Emitter, Path, PathCommand};
pub use reader::read_icon;
pub use style::{parse_color, parse_transform, LineCap, LineJoin, Paint, PathStyle};
pub use types::{Px, PxPoint, PxRect, Rgba};
