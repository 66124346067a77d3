//! # kernr
//!
//! **CPU reference kernels for a tensor autodiff backend.**
//!
//! kernr implements the device-side compute of an ML framework's forward and
//! backward passes as plain Rust: element-wise unary/binary operations over
//! arbitrarily strided views, 2D pooling (average/max/min) with zero-padding
//! semantics, and the gradient kernels for both. One logical task handles one
//! flat element; rayon supplies the fan-out that a GPU grid supplies on
//! device.
//!
//! ## What's here
//!
//! - **Strided index resolution**: map a flat row-major index into any
//!   strided view (broadcast, transposed, flipped) without materializing it
//! - **Element-wise ops**: forward kernels plus gradient accumulation with
//!   atomic float adds, so broadcast views stay correct under parallelism
//! - **2D pooling**: avg/max/min forward, and scatter-free backward that
//!   recovers contributing windows per input element
//! - **Validated entry points**: shape/stride/buffer checks happen once per
//!   launch in [`launch`]; the kernels themselves check nothing per element
//!
//! ## Quick Start
//!
//! ```rust
//! use kernr::launch;
//! use kernr::layout::Layout;
//! use kernr::ops::unary::Sqrt;
//!
//! let inp = [1.0f32, 4.0, 9.0, 16.0];
//! let mut out = [0.0f32; 4];
//! let layout = Layout::contiguous(&[2, 2]);
//! launch::unary_forward(&Sqrt, &inp, &layout, &mut out, &layout).unwrap();
//! assert_eq!(out, [1.0, 2.0, 3.0, 4.0]);
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded kernel fan-out
//! - `f16`: half-precision element types (F16, BF16)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dtype;
pub mod error;
pub mod kernels;
pub mod launch;
pub mod layout;
pub mod ops;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::{AtomicAccum, DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::kernels::pool2d::{Pool2dKind, Pool2dOp};
    pub use crate::launch;
    pub use crate::layout::Layout;
}
