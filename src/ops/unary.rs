//! Unary scalar operations
//!
//! Transcendental formulas go through f64, matching the generic scalar path
//! of the CPU kernels; piecewise ops (relu, abs) and polynomials (square,
//! neg) stay in native precision so their boundary behavior is exact.

use super::UnaryScalarOp;
use crate::dtype::Element;

/// Square root: `f(x) = sqrt(x)`, `df = 1 / (2 * sqrt(x))`
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqrt;

impl<T: Element> UnaryScalarOp<T> for Sqrt {
    #[inline]
    fn f(&self, x: T) -> T {
        T::from_f64(x.to_f64().sqrt())
    }

    #[inline]
    fn df(&self, x: T) -> T {
        T::from_f64(0.5 / x.to_f64().sqrt())
    }
}

/// Rectified linear unit: `f(x) = max(x, 0)`
///
/// The derivative is exactly 1 for `x > 0` and exactly 0 for `x <= 0`; the
/// boundary at zero is classified as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Relu;

impl<T: Element> UnaryScalarOp<T> for Relu {
    #[inline]
    fn f(&self, x: T) -> T {
        if x > T::zero() {
            x
        } else {
            T::zero()
        }
    }

    #[inline]
    fn df(&self, x: T) -> T {
        if x > T::zero() {
            T::one()
        } else {
            T::zero()
        }
    }
}

/// Exponential: `f(x) = e^x`, `df = e^x`
#[derive(Debug, Clone, Copy, Default)]
pub struct Exp;

impl<T: Element> UnaryScalarOp<T> for Exp {
    #[inline]
    fn f(&self, x: T) -> T {
        T::from_f64(x.to_f64().exp())
    }

    #[inline]
    fn df(&self, x: T) -> T {
        T::from_f64(x.to_f64().exp())
    }
}

/// Natural logarithm: `f(x) = ln(x)`, `df = 1 / x`
#[derive(Debug, Clone, Copy, Default)]
pub struct Ln;

impl<T: Element> UnaryScalarOp<T> for Ln {
    #[inline]
    fn f(&self, x: T) -> T {
        T::from_f64(x.to_f64().ln())
    }

    #[inline]
    fn df(&self, x: T) -> T {
        T::one() / x
    }
}

/// Hyperbolic tangent: `f(x) = tanh(x)`, `df = 1 - tanh(x)^2`
#[derive(Debug, Clone, Copy, Default)]
pub struct Tanh;

impl<T: Element> UnaryScalarOp<T> for Tanh {
    #[inline]
    fn f(&self, x: T) -> T {
        T::from_f64(x.to_f64().tanh())
    }

    #[inline]
    fn df(&self, x: T) -> T {
        let t = x.to_f64().tanh();
        T::from_f64(1.0 - t * t)
    }
}

/// Square: `f(x) = x^2`, `df = 2x`
#[derive(Debug, Clone, Copy, Default)]
pub struct Square;

impl<T: Element> UnaryScalarOp<T> for Square {
    #[inline]
    fn f(&self, x: T) -> T {
        x * x
    }

    #[inline]
    fn df(&self, x: T) -> T {
        x + x
    }
}

/// Negation: `f(x) = -x`, `df = -1`
#[derive(Debug, Clone, Copy, Default)]
pub struct Neg;

impl<T: Element> UnaryScalarOp<T> for Neg {
    #[inline]
    fn f(&self, x: T) -> T {
        -x
    }

    #[inline]
    fn df(&self, _x: T) -> T {
        -T::one()
    }
}

/// Absolute value: `f(x) = |x|`
///
/// The derivative at zero is classified as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Abs;

impl<T: Element> UnaryScalarOp<T> for Abs {
    #[inline]
    fn f(&self, x: T) -> T {
        if x < T::zero() {
            -x
        } else {
            x
        }
    }

    #[inline]
    fn df(&self, x: T) -> T {
        if x < T::zero() {
            -T::one()
        } else if x > T::zero() {
            T::one()
        } else {
            T::zero()
        }
    }
}

/// Logistic sigmoid: `f(x) = 1 / (1 + e^-x)`, `df = f(x) * (1 - f(x))`
#[derive(Debug, Clone, Copy, Default)]
pub struct Sigmoid;

impl<T: Element> UnaryScalarOp<T> for Sigmoid {
    #[inline]
    fn f(&self, x: T) -> T {
        T::from_f64(1.0 / (1.0 + (-x.to_f64()).exp()))
    }

    #[inline]
    fn df(&self, x: T) -> T {
        let s = 1.0 / (1.0 + (-x.to_f64()).exp());
        T::from_f64(s * (1.0 - s))
    }
}
