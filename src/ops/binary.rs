//! Binary scalar operations

use super::BinaryScalarOp;
use crate::dtype::Element;

/// Addition: `f(x, y) = x + y`
#[derive(Debug, Clone, Copy, Default)]
pub struct Add;

impl<T: Element> BinaryScalarOp<T> for Add {
    #[inline]
    fn f(&self, x: T, y: T) -> T {
        x + y
    }

    #[inline]
    fn df_dx(&self, _x: T, _y: T) -> T {
        T::one()
    }

    #[inline]
    fn df_dy(&self, _x: T, _y: T) -> T {
        T::one()
    }
}

/// Subtraction: `f(x, y) = x - y`
#[derive(Debug, Clone, Copy, Default)]
pub struct Sub;

impl<T: Element> BinaryScalarOp<T> for Sub {
    #[inline]
    fn f(&self, x: T, y: T) -> T {
        x - y
    }

    #[inline]
    fn df_dx(&self, _x: T, _y: T) -> T {
        T::one()
    }

    #[inline]
    fn df_dy(&self, _x: T, _y: T) -> T {
        -T::one()
    }
}

/// Multiplication: `f(x, y) = x * y`
#[derive(Debug, Clone, Copy, Default)]
pub struct Mul;

impl<T: Element> BinaryScalarOp<T> for Mul {
    #[inline]
    fn f(&self, x: T, y: T) -> T {
        x * y
    }

    #[inline]
    fn df_dx(&self, _x: T, y: T) -> T {
        y
    }

    #[inline]
    fn df_dy(&self, x: T, _y: T) -> T {
        x
    }
}

/// Division: `f(x, y) = x / y`, `df/dx = 1/y`, `df/dy = -x/y^2`
#[derive(Debug, Clone, Copy, Default)]
pub struct Div;

impl<T: Element> BinaryScalarOp<T> for Div {
    #[inline]
    fn f(&self, x: T, y: T) -> T {
        x / y
    }

    #[inline]
    fn df_dx(&self, _x: T, y: T) -> T {
        T::one() / y
    }

    #[inline]
    fn df_dy(&self, x: T, y: T) -> T {
        -(x / (y * y))
    }
}
