//! Elliptical arc approximation. An SVG arc segment is reduced to its center
//! parameterization, then covered with cubic Beziers using the closed-form
//! tangent weights from L. Maisonobe, "Drawing an elliptical arc using
//! polylines, quadratic or cubic Bezier curves", 2003.
//! https://www.spaceroots.org/documents/elllipse/elliptical-arc.pdf

use crate::cursor::PathCursor;
use crate::path::Emitter;
use crate::types::PxPoint;
use std::f64::consts::PI;
use tracing::debug;

/// Maximum radians a single cubic is allowed to span in the ellipse
/// parametric frame.
const MAX_DX: f64 = PI / 8.0;

/// Tangent vector of the parameterized ellipse at `eta`.
fn ellipse_prime(a: f64, b: f64, sin_theta: f64, cos_theta: f64, eta: f64) -> (f64, f64) {
    let b_cos_eta = b * libm::cos(eta);
    let a_sin_eta = a * libm::sin(eta);
    (
        -a_sin_eta * cos_theta - b_cos_eta * sin_theta,
        -a_sin_eta * sin_theta + b_cos_eta * cos_theta,
    )
}

/// Point on the parameterized ellipse at `eta`.
fn ellipse_point_at(
    a: f64,
    b: f64,
    sin_theta: f64,
    cos_theta: f64,
    eta: f64,
    cx: f64,
    cy: f64,
) -> (f64, f64) {
    let a_cos_eta = a * libm::cos(eta);
    let b_sin_eta = b * libm::sin(eta);
    (
        cx + a_cos_eta * cos_theta - b_sin_eta * sin_theta,
        cy + a_cos_eta * sin_theta + b_sin_eta * cos_theta,
    )
}

/// Locates the center of the ellipse through both endpoints, if one exists.
/// When the radii cannot reach, both are scaled up minimally, preserving
/// their ratio, and the (now unique) center is returned. Returns
/// `(cx, cy, rx, ry)`; callers can compare the radii against their inputs
/// to see whether they changed.
///
/// Works by transforming coordinates until the problem is finding the center
/// of a circle through the origin and one arbitrary point, then mapping the
/// answer back.
pub fn find_ellipse_center(
    mut rx: f64,
    mut ry: f64,
    rot_x: f64,
    start_x: f64,
    start_y: f64,
    end_x: f64,
    end_y: f64,
    sweep: bool,
    small_arc: bool,
) -> (f64, f64, f64, f64) {
    let cos = libm::cos(rot_x);
    let sin = libm::sin(rot_x);

    // Move the origin to the start point.
    let nx = end_x - start_x;
    let ny = end_y - start_y;

    // Rotate the ellipse x-axis onto the coordinate x-axis, then scale x so
    // the ellipse becomes a circle of radius ry. Center and foci coincide.
    let (nx, ny) = (nx * cos + ny * sin, -nx * sin + ny * cos);
    let nx = nx * ry / rx;

    let mid_x = nx / 2.0;
    let mid_y = ny / 2.0;
    let midlen_sq = mid_x * mid_x + mid_y * mid_y;

    let mut hr = 0.0;
    if ry * ry < midlen_sq {
        // Half the span is longer than the radius, so the requested ellipse
        // does not exist. Grow both radii just enough for one to.
        let nry = libm::sqrt(midlen_sq);
        if rx == ry {
            rx = nry; // prevents roundoff
        } else {
            rx = rx * nry / ry;
        }
        ry = nry;
    } else {
        hr = libm::sqrt(ry * ry - midlen_sq) / libm::sqrt(midlen_sq);
    }

    // When hr is zero the two candidates coincide.
    let (cx, cy) = if (sweep && small_arc) || (!sweep && !small_arc) {
        (mid_x + mid_y * hr, mid_y - mid_x * hr)
    } else {
        (mid_x - mid_y * hr, mid_y + mid_x * hr)
    };

    // Reverse the scale, then the rotation and translation.
    let cx = cx * rx / ry;
    (
        cx * cos - cy * sin + start_x,
        cx * sin + cy * cos + start_y,
        rx,
        ry,
    )
}

impl PathCursor {
    /// Entry point for the `A`/`a` path command. `pts` is one parameter set:
    /// `[rx, ry, rotation_deg, large_arc, sweep, end_x, end_y]` with the
    /// endpoint already absolute.
    pub(crate) fn add_arc(&mut self, pts: &mut [f64; 7]) {
        // A zero radius or a zero-length arc degenerates to a line.
        if pts[0] == 0.0
            || pts[1] == 0.0
            || (self.place_x == pts[5] && self.place_y == pts[6])
        {
            self.path.line(PxPoint::from_f64(pts[5], pts[6]));
            self.place_x = pts[5];
            self.place_y = pts[6];
            return;
        }
        let (cx, cy, rx, ry) = find_ellipse_center(
            pts[0],
            pts[1],
            pts[2] * PI / 180.0,
            self.place_x,
            self.place_y,
            pts[5],
            pts[6],
            pts[4] == 0.0,
            pts[3] == 0.0,
        );
        if rx != pts[0] || ry != pts[1] {
            debug!(rx, ry, "arc radii expanded to reach endpoints");
            pts[0] = rx;
            pts[1] = ry;
        }
        self.add_arc_with_center(pts, cx, cy);
    }

    /// Emits the arc as a chain of cubic Beziers around a known center.
    pub(crate) fn add_arc_with_center(&mut self, pts: &[f64; 7], cx: f64, cy: f64) {
        let rot_x = pts[2] * PI / 180.0;
        let large_arc = pts[3] != 0.0;
        let sweep = pts[4] != 0.0;
        let start_angle = libm::atan2(self.place_y - cy, self.place_x - cx) - rot_x;
        let end_angle = libm::atan2(pts[6] - cy, pts[5] - cx) - rot_x;
        let delta_theta = end_angle - start_angle;
        let arc_big = delta_theta.abs() > PI;

        // Angles in the parametric (eta) frame.
        let eta_start = libm::atan2(
            libm::sin(start_angle) / pts[1],
            libm::cos(start_angle) / pts[0],
        );
        let eta_end = libm::atan2(libm::sin(end_angle) / pts[1], libm::cos(end_angle) / pts[0]);
        let mut delta_eta = eta_end - eta_start;
        if arc_big != large_arc {
            if delta_eta < 0.0 {
                delta_eta += PI * 2.0;
            } else {
                delta_eta -= PI * 2.0;
            }
        }
        // Needed when the center sits at the midpoint of start and end.
        if delta_eta < 0.0 && sweep {
            delta_eta += PI * 2.0;
        } else if delta_eta >= 0.0 && !sweep {
            delta_eta -= PI * 2.0;
        }

        let segs = (delta_eta.abs() / MAX_DX) as i32 + 1;
        let d_eta = delta_eta / segs as f64;
        let tde = libm::tan(d_eta / 2.0);
        let alpha = libm::sin(d_eta) * (libm::sqrt(4.0 + 3.0 * tde * tde) - 1.0) / 3.0;

        let mut lx = self.place_x;
        let mut ly = self.place_y;
        let sin_theta = libm::sin(rot_x);
        let cos_theta = libm::cos(rot_x);
        let (mut ldx, mut ldy) = ellipse_prime(pts[0], pts[1], sin_theta, cos_theta, eta_start);
        for i in 1..=segs {
            let eta = eta_start + d_eta * i as f64;
            let (px, py) = if i == segs {
                // Snap the final endpoint exactly; no roundoff drift.
                (pts[5], pts[6])
            } else {
                ellipse_point_at(pts[0], pts[1], sin_theta, cos_theta, eta, cx, cy)
            };
            let (dx, dy) = ellipse_prime(pts[0], pts[1], sin_theta, cos_theta, eta);
            self.path.cube_bezier(
                PxPoint::from_f64(lx + alpha * ldx, ly + alpha * ldy),
                PxPoint::from_f64(px - alpha * dx, py - alpha * dy),
                PxPoint::from_f64(px, py),
            );
            lx = px;
            ly = py;
            ldx = dx;
            ldy = dy;
        }
        self.place_x = lx;
        self.place_y = ly;
    }

    /// Draws a full ellipse as a closed subpath, starting at the rightmost
    /// point. Used for the `circle` and `ellipse` shapes.
    pub fn ellipse_at(&mut self, cx: f64, cy: f64, rx: f64, ry: f64) {
        self.place_x = cx + rx;
        self.place_y = cy;
        let pts = [rx, ry, 0.0, 1.0, 0.0, self.place_x, self.place_y];
        self.path
            .start(PxPoint::from_f64(self.place_x, self.place_y));
        self.add_arc_with_center(&pts, cx, cy);
        self.path.stop(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathCommand;
    use crate::types::Px;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn arc_endpoint_is_exact_in_fixed_point() {
        let mut cursor = PathCursor::new();
        cursor.compile("M150,350 a25,25 -30 0,1 50,-25").expect("arc");
        let last = cursor.path.commands().last().copied().expect("commands");
        match last {
            PathCommand::CubeBezier(_, _, end) => {
                assert_eq!(end.x, Px::from_bits(12800));
                assert_eq!(end.y, Px::from_bits(20800));
            }
            other => panic!("expected a trailing cubic, got {:?}", other),
        }
        assert!(
            cursor
                .path
                .commands()
                .iter()
                .skip(1)
                .all(|c| matches!(c, PathCommand::CubeBezier(..))),
            "arc should emit only cubics after the start"
        );
    }

    #[test]
    fn arc_chain_endpoints_connect() {
        let mut cursor = PathCursor::new();
        cursor
            .compile("M150,350 a25,100 -30 0,1 50,-25")
            .expect("arc");
        let mut prev: Option<PxPoint> = None;
        for cmd in cursor.path.commands() {
            match *cmd {
                PathCommand::Start(p) => prev = Some(p),
                PathCommand::CubeBezier(_, _, end) => {
                    assert!(prev.is_some(), "cubic before start");
                    prev = Some(end);
                }
                ref other => panic!("unexpected command {:?}", other),
            }
        }
        assert_eq!(prev, Some(PxPoint::from_f64(200.0, 325.0)));
    }

    #[test]
    fn unreachable_radii_grow_preserving_ratio() {
        // Chord of length 100 with radii (10, 20): both must grow 5x.
        let (cx, cy, rx, ry) =
            find_ellipse_center(10.0, 20.0, 0.0, 0.0, 0.0, 100.0, 0.0, true, true);
        assert!(approx(rx, 50.0), "rx = {}", rx);
        assert!(approx(ry, 100.0), "ry = {}", ry);
        assert!(approx(rx / ry, 10.0 / 20.0));
        assert!(approx(cx, 50.0) && approx(cy, 0.0), "({}, {})", cx, cy);
    }

    #[test]
    fn equal_radii_grow_without_roundoff() {
        let (_, _, rx, ry) =
            find_ellipse_center(10.0, 10.0, 0.0, 0.0, 0.0, 100.0, 0.0, false, true);
        assert_eq!(rx, 50.0);
        assert_eq!(ry, 50.0);
    }

    #[test]
    fn reachable_radii_are_returned_unchanged() {
        let (cx, cy, rx, ry) =
            find_ellipse_center(10.0, 10.0, 0.0, 0.0, 0.0, 10.0, 0.0, true, true);
        assert_eq!((rx, ry), (10.0, 10.0));
        assert!(approx(cx, 5.0), "cx = {}", cx);
        assert!(approx(cy, -libm::sqrt(75.0)), "cy = {}", cy);
    }

    #[test]
    fn center_choice_flips_with_the_flags() {
        let (_, cy_a, _, _) =
            find_ellipse_center(10.0, 10.0, 0.0, 0.0, 0.0, 10.0, 0.0, true, true);
        let (_, cy_b, _, _) =
            find_ellipse_center(10.0, 10.0, 0.0, 0.0, 0.0, 10.0, 0.0, false, true);
        assert!(approx(cy_a, -cy_b), "{} vs {}", cy_a, cy_b);
    }

    #[test]
    fn zero_radius_arc_falls_back_to_a_line() {
        let mut cursor = PathCursor::new();
        cursor.compile("M10,10 A0,5 0 0,1 20,20").expect("arc");
        assert_eq!(
            cursor.path.commands()[1],
            PathCommand::Line(PxPoint::from_f64(20.0, 20.0))
        );
    }

    #[test]
    fn ellipse_at_closes_back_on_its_start() {
        let mut cursor = PathCursor::new();
        cursor.ellipse_at(50.0, 40.0, 10.0, 8.0);
        let cmds = cursor.path.commands();
        assert!(matches!(cmds[0], PathCommand::Start(p) if p == PxPoint::from_f64(60.0, 40.0)));
        assert!(matches!(cmds[cmds.len() - 1], PathCommand::Stop(true)));
        match cmds[cmds.len() - 2] {
            PathCommand::CubeBezier(_, _, end) => {
                assert_eq!(end, PxPoint::from_f64(60.0, 40.0));
            }
            ref other => panic!("expected cubic, got {:?}", other),
        }
        assert!(cmds.len() > 10, "a full ellipse spans many segments");
    }
}
