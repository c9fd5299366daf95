//! SVG document ingestion. Builds an `SvgIcon` from SVG text: gradients are
//! collected in a pre-pass keyed by id, then the element tree is walked with
//! inherited style snapshots and every shape is compiled to a command
//! stream. This is an icon-oriented subset; text, filters and friends are
//! collaborator territory.

use crate::cursor::{ErrorMode, PathCursor};
use crate::error::KeylineError;
use crate::gradient::{GradStop, Gradient, GradientUnits, SpreadMethod};
use crate::icon::{SvgIcon, SvgPath};
use crate::matrix::Matrix2D;
use crate::numbers::{push_floats, read_fraction};
use crate::path::Emitter;
use crate::style::{parse_color, parse_transform, PathStyle};
use crate::types::PxPoint;
use tracing::warn;

const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

fn parse_length(value: &str) -> Result<f64, KeylineError> {
    let digits = value
        .trim()
        .trim_end_matches("px")
        .trim_end_matches("pt")
        .trim_end_matches("mm")
        .trim_end_matches("cm")
        .trim_end_matches("in")
        .trim();
    digits
        .parse()
        .map_err(|_| KeylineError::BadNumber(value.to_string()))
}

fn attr_length(
    node: roxmltree::Node<'_, '_>,
    name: &str,
    default: f64,
) -> Result<f64, KeylineError> {
    match node.attribute(name) {
        Some(value) => parse_length(value),
        None => Ok(default),
    }
}

/// Parses an SVG document into an icon. The error mode governs unknown
/// elements and unknown path commands; malformed numbers, colors and
/// transforms are always errors.
pub fn read_icon(source: &str, mode: ErrorMode) -> Result<SvgIcon, KeylineError> {
    let doc = roxmltree::Document::parse(source)?;
    let mut icon = SvgIcon::new();
    let root = match doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "svg")
    {
        Some(node) => node,
        None => return Ok(icon),
    };

    read_view_box(&mut icon, root)?;
    collect_gradients(&doc, &mut icon)?;

    let mut cursor = PathCursor::new();
    cursor.error_mode = mode;
    let style = PathStyle::default();
    read_element(root, &mut icon, &mut cursor, &style, mode)?;
    Ok(icon)
}

fn read_view_box(
    icon: &mut SvgIcon,
    root: roxmltree::Node<'_, '_>,
) -> Result<(), KeylineError> {
    if let Some(value) = root.attribute("viewBox") {
        let mut vals = Vec::new();
        push_floats(&mut vals, value)?;
        if vals.len() != 4 {
            return Err(KeylineError::ParamMismatch);
        }
        icon.view_box.x = vals[0];
        icon.view_box.y = vals[1];
        icon.view_box.w = vals[2];
        icon.view_box.h = vals[3];
    }
    // Fall back to width/height when the viewBox leaves an axis empty.
    if icon.view_box.w == 0.0 {
        icon.view_box.w = attr_length(root, "width", 0.0)?;
    }
    if icon.view_box.h == 0.0 {
        icon.view_box.h = attr_length(root, "height", 0.0)?;
    }
    Ok(())
}

fn collect_gradients(
    doc: &roxmltree::Document<'_>,
    icon: &mut SvgIcon,
) -> Result<(), KeylineError> {
    let mut hrefs: Vec<(String, String)> = Vec::new();
    for node in doc.descendants().filter(|n| n.is_element()) {
        let name = node.tag_name().name();
        if name != "linearGradient" && name != "radialGradient" {
            continue;
        }
        let id = match node.attribute("id") {
            Some(id) => id,
            None => continue,
        };
        if id.is_empty() {
            return Err(KeylineError::ZeroLengthId);
        }

        if let Some(href) = node
            .attribute("href")
            .or_else(|| node.attribute((XLINK_NS, "href")))
        {
            if let Some(base) = href.trim().strip_prefix('#') {
                if !base.is_empty() {
                    hrefs.push((id.to_string(), base.to_string()));
                }
            }
        }

        let mut grad = if name == "linearGradient" {
            let mut grad = Gradient::linear(icon.view_box);
            for (attr, slot) in [("x1", 0), ("y1", 1), ("x2", 2), ("y2", 3)] {
                if let Some(value) = node.attribute(attr) {
                    grad.points[slot] = read_fraction(value)?;
                }
            }
            grad
        } else {
            let mut grad = Gradient::radial(icon.view_box);
            let mut set_fx = false;
            let mut set_fy = false;
            for (attr, slot) in [("cx", 0), ("cy", 1), ("fx", 2), ("fy", 3), ("r", 4)] {
                if let Some(value) = node.attribute(attr) {
                    grad.points[slot] = read_fraction(value)?;
                    set_fx = set_fx || attr == "fx";
                    set_fy = set_fy || attr == "fy";
                }
            }
            // The focus defaults onto the center.
            if !set_fx {
                grad.points[2] = grad.points[0];
            }
            if !set_fy {
                grad.points[3] = grad.points[1];
            }
            grad
        };

        if let Some(value) = node.attribute("gradientUnits") {
            match value.trim() {
                "userSpaceOnUse" => grad.units = GradientUnits::UserSpaceOnUse,
                "objectBoundingBox" => grad.units = GradientUnits::ObjectBoundingBox,
                _ => {}
            }
        }
        if let Some(value) = node.attribute("spreadMethod") {
            match value.trim() {
                "pad" => grad.spread = SpreadMethod::Pad,
                "reflect" => grad.spread = SpreadMethod::Reflect,
                "repeat" => grad.spread = SpreadMethod::Repeat,
                _ => {}
            }
        }
        if let Some(value) = node.attribute("gradientTransform") {
            grad.matrix = parse_transform(Matrix2D::IDENTITY, value)?;
        }

        for stop in node
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "stop")
        {
            let offset = match stop.attribute("offset") {
                Some(value) => read_fraction(value)?,
                None => 0.0,
            };
            let color = match stop.attribute("stop-color") {
                Some(value) => parse_color(value)?,
                None => None,
            };
            // A stop with painting switched off contributes nothing.
            let Some(color) = color else { continue };
            let opacity = match stop.attribute("stop-opacity") {
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| KeylineError::BadNumber(value.to_string()))?,
                None => 1.0,
            };
            grad.stops.push(GradStop {
                color,
                offset,
                opacity,
            });
        }

        icon.ids.insert(id.to_string(), grad);
    }

    // A gradient that references another and has no stops of its own
    // inherits the referenced stops. Geometry is not inherited.
    for (id, base) in hrefs {
        let Some(base_stops) = icon.ids.get(&base).map(|g| g.stops.clone()) else {
            continue;
        };
        if let Some(def) = icon.ids.get_mut(&id) {
            if def.stops.is_empty() {
                def.stops = base_stops;
            }
        }
    }
    Ok(())
}

fn apply_attributes(
    node: roxmltree::Node<'_, '_>,
    style: &mut PathStyle,
    icon: &SvgIcon,
) -> Result<(), KeylineError> {
    for attr in node.attributes() {
        if attr.name() == "style" {
            for decl in attr.value().split(';') {
                let Some((key, value)) = decl.split_once(':') else {
                    continue;
                };
                style.apply(key.trim(), value, &icon.ids)?;
            }
        } else {
            style.apply(attr.name(), attr.value(), &icon.ids)?;
        }
    }
    Ok(())
}

fn read_element(
    node: roxmltree::Node<'_, '_>,
    icon: &mut SvgIcon,
    cursor: &mut PathCursor,
    inherited: &PathStyle,
    mode: ErrorMode,
) -> Result<(), KeylineError> {
    let mut style = inherited.clone();
    apply_attributes(node, &mut style, icon)?;

    let name = node.tag_name().name();
    match name {
        "svg" | "g" => {
            for child in node.children().filter(|n| n.is_element()) {
                read_element(child, icon, cursor, &style, mode)?;
            }
        }
        // Definitions render through references, never directly.
        "defs" => {}
        // Handled by the gradient pre-pass.
        "linearGradient" | "radialGradient" | "stop" => {}
        "path" => {
            if let Some(d) = node.attribute("d") {
                cursor.compile(d)?;
            }
        }
        "rect" => {
            let x = attr_length(node, "x", 0.0)?;
            let y = attr_length(node, "y", 0.0)?;
            let w = attr_length(node, "width", 0.0)?;
            let h = attr_length(node, "height", 0.0)?;
            if w != 0.0 && h != 0.0 {
                let start = PxPoint::from_f64(x, y);
                cursor.path.start(start);
                cursor.path.line(PxPoint::from_f64(x + w, y));
                cursor.path.line(PxPoint::from_f64(x + w, y + h));
                cursor.path.line(PxPoint::from_f64(x, y + h));
                cursor.path.line(start);
                cursor.path.stop(true);
            }
        }
        "circle" | "ellipse" => {
            let cx = attr_length(node, "cx", 0.0)?;
            let cy = attr_length(node, "cy", 0.0)?;
            let r = attr_length(node, "r", 0.0)?;
            let rx = attr_length(node, "rx", r)?;
            let ry = attr_length(node, "ry", r)?;
            // Zero radius switches the shape off; it is not an error.
            if rx != 0.0 && ry != 0.0 {
                cursor.ellipse_at(cx, cy, rx, ry);
            }
        }
        "line" => {
            let x1 = attr_length(node, "x1", 0.0)?;
            let y1 = attr_length(node, "y1", 0.0)?;
            let x2 = attr_length(node, "x2", 0.0)?;
            let y2 = attr_length(node, "y2", 0.0)?;
            cursor.path.start(PxPoint::from_f64(x1, y1));
            cursor.path.line(PxPoint::from_f64(x2, y2));
        }
        "polygon" | "polyline" => {
            if let Some(points) = node.attribute("points") {
                let mut vals = Vec::new();
                push_floats(&mut vals, points)?;
                if vals.len() % 2 != 0 {
                    return Err(KeylineError::OddPointsInPolygon);
                }
                if vals.len() > 4 {
                    cursor.path.start(PxPoint::from_f64(vals[0], vals[1]));
                    let mut i = 2;
                    while i + 1 < vals.len() {
                        cursor.path.line(PxPoint::from_f64(vals[i], vals[i + 1]));
                        i += 2;
                    }
                    // Polylines stay open.
                    if name == "polygon" {
                        cursor.path.stop(true);
                    }
                }
            }
        }
        "title" => icon.titles.push(node.text().unwrap_or("").to_string()),
        "desc" => icon
            .descriptions
            .push(node.text().unwrap_or("").to_string()),
        _ => match mode {
            ErrorMode::Strict => {
                return Err(KeylineError::UnsupportedElement(name.to_string()))
            }
            ErrorMode::Warn => warn!(element = name, "cannot process svg element"),
            ErrorMode::Ignore => {}
        },
    }

    if !cursor.path.is_empty() {
        icon.paths.push(SvgPath {
            style,
            path: std::mem::take(&mut cursor.path),
        });
    }
    Ok(())
}
