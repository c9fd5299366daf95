use crate::error::KeylineError;
use crate::gradient::Gradient;
use crate::matrix::Matrix2D;
use crate::numbers::push_floats;
use crate::types::Rgba;
use std::collections::HashMap;
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    Miter,
    Round,
    #[default]
    Bevel,
}

/// What a fill or stroke paints with. `None` switches the operation off,
/// which is not the same as painting black.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    None,
    Color(Rgba),
    Gradient(Gradient),
}

/// Snapshot of the presentation attributes in effect for one path. Cloned
/// down the element tree; each element's own attributes overlay its copy.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStyle {
    pub fill: Paint,
    pub stroke: Paint,
    pub fill_opacity: f64,
    pub stroke_opacity: f64,
    pub line_width: f64,
    pub dash_offset: f64,
    pub miter_limit: f64,
    pub dash: Vec<f64>,
    pub use_non_zero_winding: bool,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub transform: Matrix2D,
}

impl Default for PathStyle {
    /// SVG defaults: black fill, no stroke.
    fn default() -> Self {
        PathStyle {
            fill: Paint::Color(Rgba::BLACK),
            stroke: Paint::None,
            fill_opacity: 1.0,
            stroke_opacity: 1.0,
            line_width: 2.0,
            dash_offset: 0.0,
            miter_limit: 4.0,
            dash: Vec::new(),
            use_non_zero_winding: true,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Bevel,
            transform: Matrix2D::IDENTITY,
        }
    }
}

/// Minimal named color set, enough for common icon exports. Full SVG 1.1
/// name tables are a collaborator concern.
fn named_color(name: &str) -> Option<Rgba> {
    let c = match name {
        "black" => Rgba::rgb(0, 0, 0),
        "white" => Rgba::rgb(255, 255, 255),
        "red" => Rgba::rgb(255, 0, 0),
        "green" => Rgba::rgb(0, 128, 0),
        "blue" => Rgba::rgb(0, 0, 255),
        "yellow" => Rgba::rgb(255, 255, 0),
        "cyan" | "aqua" => Rgba::rgb(0, 255, 255),
        "magenta" | "fuchsia" => Rgba::rgb(255, 0, 255),
        "gray" | "grey" => Rgba::rgb(128, 128, 128),
        "silver" => Rgba::rgb(192, 192, 192),
        "maroon" => Rgba::rgb(128, 0, 0),
        "olive" => Rgba::rgb(128, 128, 0),
        "lime" => Rgba::rgb(0, 255, 0),
        "navy" => Rgba::rgb(0, 0, 128),
        "teal" => Rgba::rgb(0, 128, 128),
        "purple" => Rgba::rgb(128, 0, 128),
        "orange" => Rgba::rgb(255, 165, 0),
        _ => return None,
    };
    Some(c)
}

fn parse_color_value(v: &str) -> Result<u8, KeylineError> {
    let v = v.trim();
    if let Some(pct) = v.strip_suffix('%') {
        let n: i64 = pct
            .trim()
            .parse()
            .map_err(|_| KeylineError::BadNumber(v.to_string()))?;
        return Ok((n * 0xFF / 100).clamp(0, 255) as u8);
    }
    let n: i64 = v
        .parse()
        .map_err(|_| KeylineError::BadNumber(v.to_string()))?;
    Ok(n.clamp(0, 255) as u8)
}

fn hex_color(hex: &str) -> Result<Rgba, KeylineError> {
    let expanded;
    let hex = match hex.len() {
        6 => hex,
        // Three-digit form doubles each digit.
        3 => {
            let b = hex.as_bytes();
            expanded = [b[0], b[0], b[1], b[1], b[2], b[2]];
            std::str::from_utf8(&expanded).map_err(|_| KeylineError::ParamMismatch)?
        }
        _ => return Err(KeylineError::ParamMismatch),
    };
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| KeylineError::ParamMismatch)
    };
    Ok(Rgba::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Parses a color value: `none`, a known name, `rgb(...)` with integer or
/// percent components, or `#rgb`/`#rrggbb`. `Ok(None)` means painting is
/// switched off.
pub fn parse_color(value: &str) -> Result<Option<Rgba>, KeylineError> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    if let Some(c) = named_color(v.to_ascii_lowercase().as_str()) {
        return Ok(Some(c));
    }
    if let Some(body) = v.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
        let vals: Vec<&str> = body.split(',').collect();
        if vals.len() != 3 {
            return Err(KeylineError::ParamMismatch);
        }
        return Ok(Some(Rgba::rgb(
            parse_color_value(vals[0])?,
            parse_color_value(vals[1])?,
            parse_color_value(vals[2])?,
        )));
    }
    if let Some(hex) = v.strip_prefix('#') {
        return Ok(Some(hex_color(hex)?));
    }
    Err(KeylineError::ParamMismatch)
}

/// Parses a transform list (`translate(…) rotate(…) …`) on top of `base`,
/// composing left to right. Angles arrive in degrees and convert here.
pub fn parse_transform(base: Matrix2D, text: &str) -> Result<Matrix2D, KeylineError> {
    let mut m1 = base;
    let mut points: Vec<f64> = Vec::new();
    for part in text.split(')') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (name, args) = part.split_once('(').ok_or(KeylineError::ParamMismatch)?;
        if args.is_empty() {
            return Err(KeylineError::ParamMismatch);
        }
        points.clear();
        push_floats(&mut points, args)?;
        m1 = match (name.trim().to_ascii_lowercase().as_str(), points.len()) {
            ("rotate", 1) => m1.rotate(points[0] * PI / 180.0),
            ("rotate", 3) => m1
                .translate(points[1], points[2])
                .rotate(points[0] * PI / 180.0)
                .translate(-points[1], -points[2]),
            ("translate", 1) => m1.translate(points[0], 0.0),
            ("translate", 2) => m1.translate(points[0], points[1]),
            ("skewx", 1) => m1.skew_x(points[0] * PI / 180.0),
            ("skewy", 1) => m1.skew_y(points[0] * PI / 180.0),
            // One-argument scale collapses the y axis; kept as observed.
            ("scale", 1) => m1.scale(points[0], 0.0),
            ("scale", 2) => m1.scale(points[0], points[1]),
            ("matrix", 6) => m1.mult(Matrix2D {
                a: points[0],
                b: points[1],
                c: points[2],
                d: points[3],
                e: points[4],
                f: points[5],
            }),
            _ => return Err(KeylineError::ParamMismatch),
        };
    }
    Ok(m1)
}

/// Resolves a fill/stroke value to a paint. `url(#id)` references pull a
/// copy of the named gradient; an unresolvable url degrades to opaque black.
fn resolve_paint(
    value: &str,
    gradients: &HashMap<String, Gradient>,
) -> Result<Paint, KeylineError> {
    let v = value.trim();
    if let Some(body) = v.strip_prefix("url(").and_then(|s| s.strip_suffix(')')) {
        if let Some(id) = body.trim().strip_prefix('#') {
            if let Some(grad) = gradients.get(id) {
                return Ok(Paint::Gradient(grad.clone()));
            }
        }
        return Ok(Paint::Color(Rgba::BLACK));
    }
    Ok(match parse_color(v)? {
        Some(c) => Paint::Color(c),
        None => Paint::None,
    })
}

fn parse_float(value: &str) -> Result<f64, KeylineError> {
    value
        .trim()
        .parse()
        .map_err(|_| KeylineError::BadNumber(value.to_string()))
}

impl PathStyle {
    /// Applies one presentation key/value pair to this snapshot. Both
    /// attributes and `style=""` declarations funnel through here. Unknown
    /// keys are ignored.
    pub fn apply(
        &mut self,
        key: &str,
        value: &str,
        gradients: &HashMap<String, Gradient>,
    ) -> Result<(), KeylineError> {
        let key = key.to_ascii_lowercase();
        let value = value.trim();
        match key.as_str() {
            "fill" => self.fill = resolve_paint(value, gradients)?,
            "stroke" => self.stroke = resolve_paint(value, gradients)?,
            "stroke-linecap" => match value {
                "butt" => self.line_cap = LineCap::Butt,
                "round" => self.line_cap = LineCap::Round,
                "square" => self.line_cap = LineCap::Square,
                _ => {}
            },
            "stroke-linejoin" => match value {
                "miter" => self.line_join = LineJoin::Miter,
                "round" => self.line_join = LineJoin::Round,
                "bevel" => self.line_join = LineJoin::Bevel,
                _ => {}
            },
            "stroke-miterlimit" => self.miter_limit = parse_float(value)?,
            "stroke-width" => {
                self.line_width = parse_float(value.trim_end_matches("px"))?;
            }
            "stroke-dashoffset" => self.dash_offset = parse_float(value)?,
            "stroke-dasharray" => {
                if value != "none" {
                    let mut dashes = Vec::new();
                    for d in value.split(',') {
                        dashes.push(parse_float(d)?);
                    }
                    self.dash = dashes;
                }
            }
            "opacity" | "stroke-opacity" | "fill-opacity" => {
                let op = parse_float(value)?;
                // Plain opacity folds into both sides.
                if key != "stroke-opacity" {
                    self.fill_opacity *= op;
                }
                if key != "fill-opacity" {
                    self.stroke_opacity *= op;
                }
            }
            "fill-rule" => match value {
                "evenodd" => self.use_non_zero_winding = false,
                "nonzero" => self.use_non_zero_winding = true,
                _ => {}
            },
            "transform" => self.transform = parse_transform(self.transform, value)?,
            _ => {}
        }
        Ok(())
    }
}
