//! Scalar element types for kernr buffers
//!
//! This module provides the `DType` enum representing the supported element
//! types at runtime, the `Element` trait connecting them to Rust's type
//! system, and the `AtomicAccum` trait for lock-free gradient accumulation.

mod atomic;
mod element;

pub use atomic::AtomicAccum;
pub use element::Element;

/// Data types supported by kernr buffers
///
/// The kernels are generic over [`Element`]; `DType` is the runtime tag a
/// host-side dispatch layer uses to label untyped device buffers.
///
/// # Discriminant Values (Serialization Stability)
///
/// The discriminant values are **stable**: F64=0, F32=1, F16=2, BF16=3.
/// New types will use new values; existing values are never changed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
#[repr(u8)]
pub enum DType {
    /// 64-bit floating point
    F64 = 0,
    /// 32-bit floating point (most common)
    F32 = 1,
    /// 16-bit floating point (IEEE 754)
    #[cfg(feature = "f16")]
    F16 = 2,
    /// 16-bit brain floating point
    #[cfg(feature = "f16")]
    BF16 = 3,
}

impl DType {
    /// Size of one element in bytes
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::F64 => 8,
            Self::F32 => 4,
            #[cfg(feature = "f16")]
            Self::F16 | Self::BF16 => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_dtype() {
        assert_eq!(f64::DTYPE, DType::F64);
        assert_eq!(f32::DTYPE, DType::F32);
    }

    #[test]
    fn test_size_in_bytes() {
        assert_eq!(DType::F64.size_in_bytes(), 8);
        assert_eq!(DType::F32.size_in_bytes(), 4);
    }

    #[cfg(feature = "f16")]
    #[test]
    fn test_half_element_dtype() {
        assert_eq!(half::f16::DTYPE, DType::F16);
        assert_eq!(half::bf16::DTYPE, DType::BF16);
        assert_eq!(DType::F16.size_in_bytes(), 2);
    }
}
