use crate::error::KeylineError;
use crate::path::Emitter;
use crate::types::{Px, PxPoint};

/// Affine 2-D transform in the SVG element order:
///
///   x' = a*x + c*y + e
///   y' = b*x + d*y + f
///
/// Value semantics: every operation returns a new matrix. Composition is
/// right-to-left, so `m1.mult(m2)` applies `m2` first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix2D {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix2D {
    fn default() -> Matrix2D {
        Matrix2D::IDENTITY
    }
}

impl Matrix2D {
    pub const IDENTITY: Matrix2D = Matrix2D {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn mult(self, other: Matrix2D) -> Matrix2D {
        Matrix2D {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn translate(self, x: f64, y: f64) -> Matrix2D {
        self.mult(Matrix2D {
            e: x,
            f: y,
            ..Matrix2D::IDENTITY
        })
    }

    pub fn scale(self, x: f64, y: f64) -> Matrix2D {
        self.mult(Matrix2D {
            a: x,
            d: y,
            ..Matrix2D::IDENTITY
        })
    }

    /// Rotation by `theta` radians.
    pub fn rotate(self, theta: f64) -> Matrix2D {
        let sin = libm::sin(theta);
        let cos = libm::cos(theta);
        self.mult(Matrix2D {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        })
    }

    pub fn skew_x(self, theta: f64) -> Matrix2D {
        self.mult(Matrix2D {
            c: libm::tan(theta),
            ..Matrix2D::IDENTITY
        })
    }

    pub fn skew_y(self, theta: f64) -> Matrix2D {
        self.mult(Matrix2D {
            b: libm::tan(theta),
            ..Matrix2D::IDENTITY
        })
    }

    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Transforms a 26.6 point. The linear part operates on the raw 26.6
    /// units directly; only the translation needs the 64x scale.
    pub fn transform_px(&self, p: PxPoint) -> PxPoint {
        let x = p.x.to_bits() as f64;
        let y = p.y.to_bits() as f64;
        PxPoint {
            x: Px::from_bits((x * self.a + y * self.c + self.e * 64.0) as i32),
            y: Px::from_bits((x * self.b + y * self.d + self.f * 64.0) as i32),
        }
    }

    /// Fails with `SingularMatrix` when the determinant is too close to zero
    /// for a stable inverse.
    pub fn invert(&self) -> Result<Matrix2D, KeylineError> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-12 {
            return Err(KeylineError::SingularMatrix);
        }
        Ok(Matrix2D {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }
}

/// Adapter that transforms every emitted point before forwarding to the
/// wrapped emitter. `stop` and `clear` pass through unchanged. The matrix
/// may be swapped between paths, never mid-path.
pub struct MatrixEmitter<'a, E: Emitter + ?Sized> {
    pub matrix: Matrix2D,
    out: &'a mut E,
}

impl<'a, E: Emitter + ?Sized> MatrixEmitter<'a, E> {
    pub fn new(out: &'a mut E, matrix: Matrix2D) -> MatrixEmitter<'a, E> {
        MatrixEmitter { matrix, out }
    }
}

impl<E: Emitter + ?Sized> Emitter for MatrixEmitter<'_, E> {
    fn start(&mut self, p: PxPoint) {
        self.out.start(self.matrix.transform_px(p));
    }

    fn line(&mut self, b: PxPoint) {
        self.out.line(self.matrix.transform_px(b));
    }

    fn quad_bezier(&mut self, b: PxPoint, c: PxPoint) {
        self.out
            .quad_bezier(self.matrix.transform_px(b), self.matrix.transform_px(c));
    }

    fn cube_bezier(&mut self, b: PxPoint, c: PxPoint, d: PxPoint) {
        self.out.cube_bezier(
            self.matrix.transform_px(b),
            self.matrix.transform_px(c),
            self.matrix.transform_px(d),
        );
    }

    fn stop(&mut self, closed: bool) {
        self.out.stop(closed);
    }

    fn clear(&mut self) {
        self.out.clear();
    }
}
