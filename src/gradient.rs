//! Linear and radial gradient sampling. A frozen `Gradient` builds a
//! per-pixel color function; the scanner queries it at integer pixel
//! centers while filling spans.

use crate::error::KeylineError;
use crate::matrix::Matrix2D;
use crate::types::Rgba;

pub(crate) const EPSILON_F: f64 = 1e-5;

/// Color painted for a gradient that ended up with no stops at all.
const NO_STOP_COLOR: Rgba = Rgba::rgb(255, 0, 255);
/// Painted when focal relocation cannot find the circle; not reachable
/// through the public constructors.
const UNREACHABLE_COLOR: Rgba = Rgba::rgb(255, 255, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpreadMethod {
    /// Samples outside [0, 1] clamp to the nearest end stop.
    #[default]
    Pad,
    /// Samples mirror back and forth between the ends.
    Reflect,
    /// Samples wrap around modulo one.
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradientUnits {
    /// Geometry is in fractions of the painted path's bounding box.
    #[default]
    ObjectBoundingBox,
    /// Geometry shares the path's coordinate space.
    UserSpaceOnUse,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradStop {
    pub color: Rgba,
    pub offset: f64,
    pub opacity: f64,
}

/// Rectangle a gradient's fractional geometry is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Pure per-pixel sampler: maps an integer pixel position to a color.
pub type ColorFunc = Box<dyn Fn(i32, i32) -> Rgba + Send + Sync>;

/// What a scanner paints with: one color for the whole path, or a sampler
/// queried per pixel.
pub enum ColorSource {
    Solid(Rgba),
    Sampler(ColorFunc),
}

impl std::fmt::Debug for ColorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorSource::Solid(c) => f.debug_tuple("Solid").field(c).finish(),
            ColorSource::Sampler(_) => f.write_str("Sampler(..)"),
        }
    }
}

/// A gradient definition, frozen once parsing finishes. `points` is
/// interpreted per kind: `[x1, y1, x2, y2, _]` for linear,
/// `[cx, cy, fx, fy, r]` for radial.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub kind: GradientKind,
    pub points: [f64; 5],
    pub stops: Vec<GradStop>,
    pub bounds: Bounds,
    pub matrix: Matrix2D,
    pub spread: SpreadMethod,
    pub units: GradientUnits,
}

impl Gradient {
    /// A linear gradient running left to right across its bounds.
    pub fn linear(bounds: Bounds) -> Gradient {
        Gradient {
            kind: GradientKind::Linear,
            points: [0.0, 0.0, 1.0, 0.0, 0.0],
            stops: Vec::new(),
            bounds,
            matrix: Matrix2D::IDENTITY,
            spread: SpreadMethod::Pad,
            units: GradientUnits::ObjectBoundingBox,
        }
    }

    /// A radial gradient centered in its bounds, focus on the center.
    pub fn radial(bounds: Bounds) -> Gradient {
        Gradient {
            kind: GradientKind::Radial,
            points: [0.5, 0.5, 0.5, 0.5, 0.5],
            stops: Vec::new(),
            bounds,
            matrix: Matrix2D::IDENTITY,
            spread: SpreadMethod::Pad,
            units: GradientUnits::ObjectBoundingBox,
        }
    }

    /// Builds the color source for this gradient at the given opacity.
    /// Degenerate stop counts resolve to a solid color; otherwise all
    /// invariant work (stop sort, frame inversion, focal relocation)
    /// happens here, once, leaving the per-pixel closure branch-light.
    pub fn color_source(&self, opacity: f64) -> Result<ColorSource, KeylineError> {
        match self.stops.len() {
            0 => return Ok(ColorSource::Solid(NO_STOP_COLOR.apply_opacity(opacity))),
            1 => {
                return Ok(ColorSource::Solid(
                    self.stops[0].color.apply_opacity(opacity),
                ))
            }
            _ => {}
        }

        let mut stops = self.stops.clone();
        stops.sort_by(|a, b| {
            a.offset
                .partial_cmp(&b.offset)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let ramp = StopRamp {
            stops,
            spread: self.spread,
        };

        let b = self.bounds;
        // Fractional geometry is mapped through the bounding box, so the
        // user matrix has to be conjugated into box space before inverting.
        let forward = match self.units {
            GradientUnits::ObjectBoundingBox => Matrix2D::IDENTITY
                .translate(b.x, b.y)
                .scale(b.w, b.h)
                .mult(self.matrix)
                .scale(1.0 / b.w, 1.0 / b.h)
                .translate(-b.x, -b.y),
            GradientUnits::UserSpaceOnUse => self.matrix,
        };
        let grad_t = forward.invert()?;

        match self.kind {
            GradientKind::Radial => self.radial_source(ramp, grad_t, opacity),
            GradientKind::Linear => Ok(self.linear_source(ramp, grad_t, opacity)),
        }
    }

    fn linear_source(&self, ramp: StopRamp, grad_t: Matrix2D, opacity: f64) -> ColorSource {
        let b = self.bounds;
        let p1x = b.x + b.w * self.points[0];
        let p1y = b.y + b.h * self.points[1];
        let p2x = b.x + b.w * self.points[2];
        let p2y = b.y + b.h * self.points[3];

        let dx = p2x - p1x;
        let dy = p2y - p1y;
        let d = dx * dx + dy * dy;
        ColorSource::Sampler(Box::new(move |xi, yi| {
            let (x, y) = grad_t.transform(xi as f64 + 0.5, yi as f64 + 0.5);
            let dfx = x - p1x;
            let dfy = y - p1y;
            ramp.color_at((dx * dfx + dy * dfy) / d, opacity)
        }))
    }

    fn radial_source(
        &self,
        ramp: StopRamp,
        grad_t: Matrix2D,
        opacity: f64,
    ) -> Result<ColorSource, KeylineError> {
        let b = self.bounds;
        let cx = b.x + b.w * self.points[0];
        let cy = b.y + b.h * self.points[1];
        let rx = b.w * self.points[4];
        let ry = b.h * self.points[4];

        if self.points[0] == self.points[2] && self.points[1] == self.points[3] {
            // Focus on the center: t is just the distance from the center in
            // radius-normalized coordinates.
            return Ok(ColorSource::Sampler(Box::new(move |xi, yi| {
                let (x, y) = grad_t.transform(xi as f64 + 0.5, yi as f64 + 0.5);
                let dx = x - cx;
                let dy = y - cy;
                ramp.color_at(
                    libm::sqrt(dx * dx / (rx * rx) + dy * dy / (ry * ry)),
                    opacity,
                )
            })));
        }

        let mut fx = b.x + b.w * self.points[2];
        let mut fy = b.y + b.h * self.points[3];

        // Scale to the space where the gradient ellipse is a unit circle.
        fx /= rx;
        fy /= ry;
        let cx = cx / rx;
        let cy = cy / ry;

        let dfx = fx - cx;
        let dfy = fy - cy;
        if dfx * dfx + dfy * dfy > 1.0 {
            // A focus outside the circle moves to where the center-to-focus
            // ray meets the rim, pulled in a hair so the ray stays valid.
            match ray_circle_intersection(fx, fy, cx, cy, cx, cy, 1.0 - EPSILON_F) {
                Some((nfx, nfy)) => {
                    fx = nfx;
                    fy = nfy;
                }
                None => return Ok(ColorSource::Solid(UNREACHABLE_COLOR)),
            }
        }

        let last = ramp.stops[ramp.stops.len() - 1];
        Ok(ColorSource::Sampler(Box::new(move |xi, yi| {
            let (x, y) = grad_t.transform(xi as f64 + 0.5, yi as f64 + 0.5);
            let ex = x / rx;
            let ey = y / ry;

            let (t1x, t1y) = match ray_circle_intersection(ex, ey, fx, fy, cx, cy, 1.0) {
                Some(p) => p,
                // The ray misses the circle; fall back to the outermost stop.
                None => return last.color.apply_opacity(last.opacity * opacity),
            };
            let tdx = t1x - fx;
            let tdy = t1y - fy;
            let dx = ex - fx;
            let dy = ey - fy;
            if tdx * tdx + tdy * tdy < EPSILON_F {
                return last.color.apply_opacity(last.opacity * opacity);
            }
            ramp.color_at(
                libm::sqrt(dx * dx + dy * dy) / libm::sqrt(tdx * tdx + tdy * tdy),
                opacity,
            )
        })))
    }
}

/// The sorted stop list plus spread mode, shared by every sampler closure.
#[derive(Clone)]
struct StopRamp {
    stops: Vec<GradStop>,
    spread: SpreadMethod,
}

fn expand16(c: u8) -> f64 {
    (c as u32 * 0x101) as f64
}

impl StopRamp {
    /// Maps the parameterized position `t` along the gradient to a color,
    /// honoring the spread mode.
    fn color_at(&self, t: f64, opacity: f64) -> Rgba {
        let stops = &self.stops;
        let d = stops.len();
        // The ends can be answered before any modular arithmetic.
        if t >= 1.0 && self.spread == SpreadMethod::Pad {
            let s = &stops[d - 1];
            return s.color.apply_opacity(s.opacity * opacity);
        }
        if t <= 0.0 && self.spread == SpreadMethod::Pad {
            return stops[0].color.apply_opacity(stops[0].opacity * opacity);
        }

        let mod_range = match self.spread {
            SpreadMethod::Reflect => 2.0,
            _ => 1.0,
        };
        let mut m = t % mod_range;
        if m < 0.0 {
            m += mod_range;
        }

        // Advance to the first stop at or past m.
        let mut place = 0;
        while place != d && m > stops[place].offset {
            place += 1;
        }

        match self.spread {
            SpreadMethod::Repeat => {
                let (s1, s2) = if place == 0 || place == d {
                    // Wrapping span between the outermost stops.
                    (&stops[d - 1], &stops[0])
                } else {
                    (&stops[place - 1], &stops[place])
                };
                self.blend(m, opacity, s1, s2, false)
            }
            SpreadMethod::Reflect => {
                if place == 0 {
                    stops[0].color.apply_opacity(stops[0].opacity * opacity)
                } else if place == d {
                    // Past the last stop the list is walked in reverse with
                    // mirrored offsets, covering the second half of the
                    // two-wide reflect interval.
                    let mut place = place;
                    while place != d * 2 && m - 1.0 > 1.0 - stops[d * 2 - place - 1].offset {
                        place += 1;
                    }
                    if place == d {
                        let s = &stops[d - 1];
                        s.color.apply_opacity(s.opacity * opacity)
                    } else if place == d * 2 {
                        stops[0].color.apply_opacity(stops[0].opacity * opacity)
                    } else {
                        self.blend(
                            m - 1.0,
                            opacity,
                            &stops[d * 2 - place],
                            &stops[d * 2 - place - 1],
                            true,
                        )
                    }
                } else {
                    self.blend(m, opacity, &stops[place - 1], &stops[place], false)
                }
            }
            SpreadMethod::Pad => {
                if place == 0 {
                    stops[0].color.apply_opacity(stops[0].opacity * opacity)
                } else if place == d {
                    let s = &stops[d - 1];
                    s.color.apply_opacity(s.opacity * opacity)
                } else {
                    self.blend(m, opacity, &stops[place - 1], &stops[place], false)
                }
            }
        }
    }

    fn blend(&self, t: f64, opacity: f64, s1: &GradStop, s2: &GradStop, flip: bool) -> Rgba {
        let mut t = t;
        let mut s1off = s1.offset;
        if s1.offset > s2.offset && !flip {
            // Wrapping span in repeat mode: shift the leading stop back a
            // full period.
            s1off -= 1.0;
            if t > 1.0 {
                t -= 1.0;
            }
        }
        if s2.offset == s1off {
            return s2.color.apply_opacity(s2.opacity);
        }
        if flip {
            t = 1.0 - t;
        }
        let tp = (t - s1off) / (s2.offset - s1off);

        // Channels interpolate in the 16-bit space and come back down with a
        // 256 divisor; the scanner's premultiply math depends on that exact
        // scaling.
        let ch = |a: u8, b: u8| ((expand16(a) * (1.0 - tp) + expand16(b) * tp) / 256.0) as u8;
        Rgba::rgb(
            ch(s1.color.r, s2.color.r),
            ch(s1.color.g, s2.color.g),
            ch(s1.color.b, s2.color.b),
        )
        .apply_opacity((s1.opacity * (1.0 - tp) + s2.opacity * tp) * opacity)
    }
}

/// Intersection of the ray starting at `(from_x, from_y)` and passing
/// through `(through_x, through_y)` with the circle at `(cx, cy)` of radius
/// `r`. With two hits on the ray, the one closest to the ray origin wins.
/// Tangent contact counts as a miss.
pub(crate) fn ray_circle_intersection(
    through_x: f64,
    through_y: f64,
    from_x: f64,
    from_y: f64,
    cx: f64,
    cy: f64,
    r: f64,
) -> Option<(f64, f64)> {
    let n = from_x - cx;
    let m = from_y - cy;
    let e = from_x - through_x;
    let d = from_y - through_y;

    // Quadratic normal form coefficients.
    let qa = e * e + d * d;
    let qb = -2.0 * (e * n + m * d);
    let qc = n * n + m * m - r * r;

    let disc = qb * qb - 4.0 * qa * qc;
    if disc <= 0.0 {
        return None;
    }
    let root = libm::sqrt(disc);
    let mut t1 = (-qb + root) / (2.0 * qa);
    let t2 = (-qb - root) / (2.0 * qa);
    match (t1 > 0.0, t2 > 0.0) {
        (true, true) => {
            if t2 < t1 {
                t1 = t2;
            }
        }
        (true, false) => {}
        (false, true) => t1 = t2,
        (false, false) => return None,
    }
    Some((n - e * t1 + cx, m - d * t1 + cy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stop(spread: SpreadMethod) -> Gradient {
        let mut g = Gradient::linear(Bounds {
            x: 0.0,
            y: 0.0,
            w: 10.0,
            h: 10.0,
        });
        g.spread = spread;
        g.stops = vec![
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
        g
    }

    fn sample(src: &ColorSource, x: i32, y: i32) -> Rgba {
        match src {
            ColorSource::Sampler(f) => f(x, y),
            ColorSource::Solid(c) => *c,
        }
    }

    #[test]
    fn no_stops_paints_the_placeholder_color() {
        let g = Gradient::linear(Bounds {
            x: 0.0,
            y: 0.0,
            w: 1.0,
            h: 1.0,
        });
        match g.color_source(1.0).unwrap() {
            ColorSource::Solid(c) => assert_eq!(c, Rgba::rgba(255, 0, 255, 255)),
            other => panic!("expected solid, got {:?}", other),
        }
    }

    #[test]
    fn single_stop_collapses_to_its_color() {
        let mut g = two_stop(SpreadMethod::Pad);
        g.stops.truncate(1);
        match g.color_source(0.5).unwrap() {
            ColorSource::Solid(c) => assert_eq!(c, Rgba::rgba(255, 0, 0, 127)),
            other => panic!("expected solid, got {:?}", other),
        }
    }

    #[test]
    fn linear_samples_blend_along_the_axis() {
        let src = two_stop(SpreadMethod::Pad).color_source(1.0).unwrap();
        // Pixel centers land at t = 0.05, 0.55 and 0.95.
        assert_eq!(sample(&src, 0, 0), Rgba::rgba(243, 0, 12, 255));
        assert_eq!(sample(&src, 5, 0), Rgba::rgba(115, 0, 140, 255));
        assert_eq!(sample(&src, 9, 0), Rgba::rgba(12, 0, 243, 255));
    }

    #[test]
    fn pad_clamps_to_end_stops_exactly() {
        let src = two_stop(SpreadMethod::Pad).color_source(0.5).unwrap();
        // Out of range on both sides, including far extrapolation.
        assert_eq!(sample(&src, -1, 0), Rgba::rgba(255, 0, 0, 127));
        assert_eq!(sample(&src, -100, 0), Rgba::rgba(255, 0, 0, 127));
        assert_eq!(sample(&src, 30, 0), Rgba::rgba(0, 0, 255, 127));
    }

    #[test]
    fn reflect_mirrors_around_the_far_end() {
        let src = two_stop(SpreadMethod::Reflect).color_source(1.0).unwrap();
        // t and 2 - t sample the same color: pixels 2 and 17 (t = 0.25 and
        // 1.75), pixels 4 and 15 (t = 0.45 and 1.55).
        assert_eq!(sample(&src, 2, 0), sample(&src, 17, 0));
        assert_eq!(sample(&src, 4, 0), sample(&src, 15, 0));
        assert_eq!(sample(&src, 0, 0), sample(&src, 19, 0));
    }

    #[test]
    fn repeat_wraps_with_period_one() {
        let src = two_stop(SpreadMethod::Repeat).color_source(1.0).unwrap();
        assert_eq!(sample(&src, 2, 0), sample(&src, 12, 0));
        assert_eq!(sample(&src, 7, 0), sample(&src, 17, 0));
        assert_eq!(sample(&src, 7, 0), sample(&src, -3, 0));
    }

    #[test]
    fn sampling_is_deterministic() {
        let src = two_stop(SpreadMethod::Repeat).color_source(0.8).unwrap();
        for (x, y) in [(0, 0), (3, 7), (-5, 2)] {
            assert_eq!(sample(&src, x, y), sample(&src, x, y));
        }
    }

    fn centered_radial() -> Gradient {
        let mut g = Gradient::radial(Bounds {
            x: 0.0,
            y: 0.0,
            w: 100.0,
            h: 100.0,
        });
        g.stops = vec![
            GradStop {
                color: Rgba::rgb(0, 0, 0),
                offset: 0.0,
                opacity: 1.0,
            },
            GradStop {
                color: Rgba::rgb(255, 255, 255),
                offset: 1.0,
                opacity: 1.0,
            },
        ];
        g
    }

    #[test]
    fn radial_center_is_near_the_first_stop() {
        let src = centered_radial().color_source(1.0).unwrap();
        let c = sample(&src, 50, 50);
        assert!(c.r < 8 && c.g < 8 && c.b < 8, "got {:?}", c);
    }

    #[test]
    fn radial_clamps_outside_the_circle() {
        let src = centered_radial().color_source(1.0).unwrap();
        // The bounds corner sits past the rim, as does far extrapolation.
        assert_eq!(sample(&src, 0, 0), Rgba::rgba(255, 255, 255, 255));
        assert_eq!(sample(&src, -100, -100), Rgba::rgba(255, 255, 255, 255));
    }

    #[test]
    fn focal_radial_is_dark_at_the_focus_and_light_at_the_rim() {
        let mut g = centered_radial();
        // Focus at (0.25, 0.5), center at (0.5, 0.5).
        g.points = [0.5, 0.5, 0.25, 0.5, 0.5];
        let src = g.color_source(1.0).unwrap();
        let near_focus = sample(&src, 24, 49);
        assert!(near_focus.r < 16, "focus sample {:?}", near_focus);
        let near_rim = sample(&src, 0, 49);
        assert!(near_rim.r > 200, "rim sample {:?}", near_rim);
    }

    #[test]
    fn focal_radial_relocates_an_outside_focus() {
        let mut g = centered_radial();
        // Focus fraction (1, 1) scales well outside the unit circle.
        g.points = [0.5, 0.5, 1.0, 1.0, 0.5];
        let src = g.color_source(1.0).unwrap();
        let a = sample(&src, 50, 50);
        assert_eq!(a, sample(&src, 50, 50));
        // Past the rim still clamps to the outer stop.
        assert_eq!(sample(&src, -100, -100).r, 255);
    }

    #[test]
    fn gradient_transform_shifts_sampling() {
        let mut g = two_stop(SpreadMethod::Pad);
        // The transform lives in box-fraction space, so half a box is 0.5,
        // which lands on pixel 5 of the 10-wide bounds.
        g.matrix = Matrix2D::IDENTITY.translate(0.5, 0.0);
        let src = g.color_source(1.0).unwrap();
        let shifted = sample(&src, 5, 0);
        let unshifted = sample(&two_stop(SpreadMethod::Pad).color_source(1.0).unwrap(), 0, 0);
        assert_eq!(shifted, unshifted);
    }

    #[test]
    fn degenerate_gradient_frame_is_singular() {
        let mut g = two_stop(SpreadMethod::Pad);
        g.matrix = Matrix2D::IDENTITY.scale(1.0, 0.0);
        assert!(matches!(
            g.color_source(1.0),
            Err(KeylineError::SingularMatrix)
        ));
    }

    #[test]
    fn stop_opacity_scales_with_external_opacity() {
        let mut g = two_stop(SpreadMethod::Pad);
        g.stops[0].opacity = 0.5;
        let src = g.color_source(0.5).unwrap();
        // At t <= 0 pad returns the first stop at opacity 0.5 * 0.5.
        assert_eq!(sample(&src, -1, 0).a, 63);
    }

    #[test]
    fn ray_hits_the_near_side_of_the_circle() {
        let (x, y) = ray_circle_intersection(2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0).unwrap();
        assert!((x - 1.0).abs() < 1e-9 && y.abs() < 1e-9);
    }

    #[test]
    fn ray_away_from_the_circle_misses() {
        assert!(ray_circle_intersection(5.0, 0.0, 3.0, 0.0, 0.0, 0.0, 1.0).is_none());
    }
}
