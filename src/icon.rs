use crate::error::KeylineError;
use crate::gradient::{Bounds, ColorSource, Gradient, GradientUnits};
use crate::matrix::{Matrix2D, MatrixEmitter};
use crate::path::{Emitter, Path};
use crate::style::{LineCap, LineJoin, Paint, PathStyle};
use crate::types::{Px, PxRect};
use std::collections::HashMap;

/// The rasterizer seam. A scanner accepts drawing commands like any emitter,
/// reports the extent of what it was fed, and rasterizes on `draw` using the
/// bound color source. When the source is a sampler, the scanner calls it
/// back with integer pixel centers while filling spans.
pub trait Scanner: Emitter {
    /// Extent of the commands fed since the last `clear`.
    fn path_extent(&self) -> PxRect;
    fn set_color(&mut self, color: ColorSource);
    fn set_winding(&mut self, use_non_zero: bool);
    fn set_stroke(
        &mut self,
        width: Px,
        miter_limit: Px,
        cap: LineCap,
        join: LineJoin,
        dash: &[f64],
        dash_offset: f64,
    );
    fn draw(&mut self);
}

/// One compiled path paired with the style snapshot it was declared under.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgPath {
    pub style: PathStyle,
    pub path: Path,
}

fn bounds_from_extent(extent: PxRect) -> Bounds {
    let min_x = extent.min.x.to_f64();
    let min_y = extent.min.y.to_f64();
    Bounds {
        x: min_x,
        y: min_y,
        w: extent.max.x.to_f64() - min_x,
        h: extent.max.y.to_f64() - min_y,
    }
}

/// Binds the paint as the scanner's color input. For bounding-box gradients
/// the bounds come from the extent of the path that was just fed, so this
/// must run after the commands and before `draw`.
fn bind_paint(
    scanner: &mut dyn Scanner,
    paint: &Paint,
    opacity: f64,
) -> Result<(), KeylineError> {
    match paint {
        Paint::None => {}
        Paint::Color(c) => scanner.set_color(ColorSource::Solid(c.apply_opacity(opacity))),
        Paint::Gradient(gradient) => {
            let mut gradient = gradient.clone();
            if gradient.units == GradientUnits::ObjectBoundingBox {
                gradient.bounds = bounds_from_extent(scanner.path_extent());
            }
            scanner.set_color(gradient.color_source(opacity)?);
        }
    }
    Ok(())
}

impl SvgPath {
    /// Fills, then strokes, according to the style snapshot. `base` is the
    /// icon-level transform; the path's own transform composes under it.
    pub fn draw(
        &self,
        scanner: &mut dyn Scanner,
        opacity: f64,
        base: Matrix2D,
    ) -> Result<(), KeylineError> {
        let matrix = base.mult(self.style.transform);
        if self.style.fill != Paint::None {
            scanner.clear();
            scanner.set_winding(self.style.use_non_zero_winding);
            {
                let mut adder = MatrixEmitter::new(&mut *scanner, matrix);
                self.path.add_to(&mut adder);
            }
            bind_paint(scanner, &self.style.fill, self.style.fill_opacity * opacity)?;
            scanner.draw();
            // Winding is left at its default for the next caller.
            scanner.set_winding(true);
        }
        if self.style.stroke != Paint::None {
            scanner.clear();
            scanner.set_stroke(
                Px::from_f64(self.style.line_width),
                Px::from_f64(self.style.miter_limit),
                self.style.line_cap,
                self.style.line_join,
                &self.style.dash,
                self.style.dash_offset,
            );
            {
                let mut adder = MatrixEmitter::new(&mut *scanner, matrix);
                self.path.add_to(&mut adder);
            }
            bind_paint(
                scanner,
                &self.style.stroke,
                self.style.stroke_opacity * opacity,
            )?;
            scanner.draw();
        }
        Ok(())
    }
}

/// A loaded icon: compiled paths with their styles, gradients by id, and the
/// icon-level transform applied to everything at draw time.
#[derive(Debug, Clone, Default)]
pub struct SvgIcon {
    pub view_box: Bounds,
    pub titles: Vec<String>,
    pub descriptions: Vec<String>,
    pub ids: HashMap<String, Gradient>,
    pub paths: Vec<SvgPath>,
    pub transform: Matrix2D,
}

impl SvgIcon {
    pub fn new() -> SvgIcon {
        SvgIcon::default()
    }

    /// Draws every path in document order.
    pub fn draw(&self, scanner: &mut dyn Scanner, opacity: f64) -> Result<(), KeylineError> {
        for path in &self.paths {
            path.draw(scanner, opacity, self.transform)?;
        }
        Ok(())
    }

    /// Sets the icon transform so the viewBox maps onto the given rectangle.
    pub fn set_target(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let scale_w = w / self.view_box.w;
        let scale_h = h / self.view_box.h;
        self.transform = Matrix2D::IDENTITY
            .translate(x - self.view_box.x * scale_w, y - self.view_box.y * scale_h)
            .scale(scale_w, scale_h);
    }

    /// Looks up a gradient definition by id.
    pub fn gradient(&self, id: &str) -> Result<&Gradient, KeylineError> {
        if id.is_empty() {
            return Err(KeylineError::ZeroLengthId);
        }
        self.ids
            .get(id)
            .ok_or_else(|| KeylineError::MissingId(id.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::test_scanner::{Event, RecordingScanner};
    use super::*;
    use crate::cursor::PathCursor;
    use crate::gradient::GradStop;
    use crate::types::{PxPoint, Rgba};

    fn triangle() -> Path {
        let mut cursor = PathCursor::new();
        cursor.compile("M0,0 L10,0 L10,10z").expect("triangle");
        cursor.path.clone()
    }

    #[test]
    fn solid_fill_binds_color_after_the_path_and_resets_winding() {
        let mut style = PathStyle::default();
        style.fill = Paint::Color(Rgba::rgb(255, 0, 0));
        style.fill_opacity = 0.5;
        let svg_path = SvgPath {
            style,
            path: triangle(),
        };

        let mut scanner = RecordingScanner::new();
        svg_path
            .draw(&mut scanner, 1.0, Matrix2D::IDENTITY)
            .expect("draw");

        assert_eq!(
            scanner.events,
            vec![
                Event::Clear,
                Event::Winding(true),
                Event::Start(PxPoint::from_f64(0.0, 0.0)),
                Event::Line(PxPoint::from_f64(10.0, 0.0)),
                Event::Line(PxPoint::from_f64(10.0, 10.0)),
                Event::Stop(true),
                Event::Color,
                Event::Draw,
                Event::Winding(true),
            ]
        );
        match &scanner.colors[0] {
            ColorSource::Solid(c) => assert_eq!(*c, Rgba::rgba(255, 0, 0, 127)),
            other => panic!("expected solid fill, got {:?}", other),
        }
    }

    #[test]
    fn gradient_fill_takes_bounds_from_the_path_extent() {
        let mut gradient = Gradient::linear(Bounds::default());
        gradient.stops = vec![
            GradStop {
                color: Rgba::rgb(255, 0, 0),
                offset: 0.0,
                opacity: 1.0,
            },
            GradStop {
                color: Rgba::rgb(0, 0, 255),
                offset: 1.0,
                opacity: 1.0,
            },
        ];
        let mut style = PathStyle::default();
        style.fill = Paint::Gradient(gradient);
        let svg_path = SvgPath {
            style,
            path: triangle(),
        };

        let mut scanner = RecordingScanner::new();
        svg_path
            .draw(&mut scanner, 1.0, Matrix2D::IDENTITY)
            .expect("draw");

        // Bounds resolve to the 10x10 triangle extent, so pixel 0 reads the
        // start of the ramp.
        match &scanner.colors[0] {
            ColorSource::Sampler(f) => assert_eq!(f(0, 0), Rgba::rgba(243, 0, 12, 255)),
            other => panic!("expected sampler, got {:?}", other),
        }
    }

    #[test]
    fn stroke_sets_width_in_fixed_point_and_skips_fill() {
        let mut style = PathStyle::default();
        style.fill = Paint::None;
        style.stroke = Paint::Color(Rgba::rgb(0, 128, 0));
        style.line_width = 3.0;
        let svg_path = SvgPath {
            style,
            path: triangle(),
        };

        let mut scanner = RecordingScanner::new();
        svg_path
            .draw(&mut scanner, 1.0, Matrix2D::IDENTITY)
            .expect("draw");

        assert!(scanner.events.contains(&Event::Stroke(Px::from_f64(3.0))));
        assert!(!scanner.events.contains(&Event::Winding(true)));
    }

    #[test]
    fn icon_transform_composes_over_path_transform() {
        let mut cursor = PathCursor::new();
        cursor.compile("M1,1").expect("path");
        let mut style = PathStyle::default();
        style.transform = Matrix2D::IDENTITY.translate(10.0, 0.0);
        let mut icon = SvgIcon::new();
        icon.paths.push(SvgPath {
            style,
            path: cursor.path.clone(),
        });
        icon.transform = Matrix2D::IDENTITY.scale(2.0, 2.0);

        let mut scanner = RecordingScanner::new();
        icon.draw(&mut scanner, 1.0).expect("draw");
        assert!(scanner
            .events
            .contains(&Event::Start(PxPoint::from_f64(22.0, 2.0))));
    }

    #[test]
    fn set_target_maps_the_viewbox() {
        let mut icon = SvgIcon::new();
        icon.view_box = Bounds {
            x: 0.0,
            y: 0.0,
            w: 100.0,
            h: 100.0,
        };
        icon.set_target(0.0, 0.0, 50.0, 50.0);
        let (x, y) = icon.transform.transform(100.0, 100.0);
        assert_eq!((x, y), (50.0, 50.0));

        icon.view_box.x = 10.0;
        icon.set_target(0.0, 0.0, 100.0, 100.0);
        let (x, _) = icon.transform.transform(10.0, 0.0);
        assert_eq!(x, 0.0);
    }

    #[test]
    fn gradient_lookup_validates_ids() {
        let mut icon = SvgIcon::new();
        icon.ids
            .insert("lg".to_string(), Gradient::linear(Bounds::default()));
        assert!(icon.gradient("lg").is_ok());
        assert!(matches!(
            icon.gradient(""),
            Err(KeylineError::ZeroLengthId)
        ));
        assert!(matches!(
            icon.gradient("nope"),
            Err(KeylineError::MissingId(_))
        ));
    }
}
