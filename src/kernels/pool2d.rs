//! 2D pooling kernels (average / max / min), forward and backward
//!
//! Buffers are dense NCHW. The forward pass runs one task per output
//! element and scans its `kernel x kernel` window; the backward pass runs
//! one task per *input* element and recovers, arithmetically, every output
//! position whose window covered it — no argmax indices or other auxiliary
//! state is stored between the passes.
//!
//! Padding is virtual: a window position that falls in the zero-padding
//! border (or past the input edge) is skipped. For average pooling the
//! divisor stays at the nominal window area `kernel * kernel` regardless of
//! how many positions were skipped — zero-padding semantics, so outputs
//! whose window hangs over the border are systematically smaller in
//! magnitude than interior ones. That is intentional, not a bug.
//!
//! Backward writes are disjoint by construction (each task owns exactly one
//! input element), so gradients accumulate with plain `+=`, no atomics.

use super::for_each_flat;
use crate::dtype::Element;

/// 2D pooling operator descriptor.
///
/// The kernels trust `h_out`/`w_out`; launch validation checks them against
/// the output-size formula `out = (in + 2*padding - kernel) / stride + 1`
/// before anything runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pool2dOp {
    /// Window edge length (windows are square)
    pub kernel: usize,
    /// Step between window origins
    pub stride: usize,
    /// Virtual zero border width on every spatial edge
    pub padding: usize,
    /// Batch dimension
    pub batch: usize,
    /// Channel dimension
    pub chan: usize,
    /// Input height
    pub h_in: usize,
    /// Output height
    pub h_out: usize,
    /// Input width
    pub w_in: usize,
    /// Output width
    pub w_out: usize,
}

impl Pool2dOp {
    /// Number of input elements (`batch * chan * h_in * w_in`)
    #[inline]
    pub fn in_numel(&self) -> usize {
        self.batch * self.chan * self.h_in * self.w_in
    }

    /// Number of output elements (`batch * chan * h_out * w_out`)
    #[inline]
    pub fn out_numel(&self) -> usize {
        self.batch * self.chan * self.h_out * self.w_out
    }
}

/// Which statistic a pooling window computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool2dKind {
    /// Window sum divided by the nominal window area
    Avg,
    /// Window maximum, seeded at negative infinity
    Max,
    /// Window minimum, seeded at positive infinity
    Min,
}

/// Pooling forward: one task per output element.
///
/// # Safety
/// - `inp` must be valid for `op.in_numel()` reads, `out` for
///   `op.out_numel()` writes
/// - the descriptor must satisfy the output-size formula; `stride` and
///   `kernel` must be non-zero
pub unsafe fn pool2d_forward_kernel<T: Element>(
    kind: Pool2dKind,
    op: Pool2dOp,
    inp: *const T,
    out: *mut T,
) {
    let numel = op.out_numel();
    let area = T::from_f64((op.kernel * op.kernel) as f64);
    let inp_addr = inp as usize;
    let out_addr = out as usize;

    for_each_flat(numel, |i| {
        let inp_ptr = inp_addr as *const T;
        let out_ptr = out_addr as *mut T;

        let ow = i % op.w_out;
        let oh = (i / op.w_out) % op.h_out;
        // batch and channel never separate: both just offset whole planes
        let plane = i / (op.w_out * op.h_out);
        let inp_base = plane * op.h_in * op.w_in;

        let mut acc = match kind {
            Pool2dKind::Avg => T::zero(),
            Pool2dKind::Max => T::neg_infinity(),
            Pool2dKind::Min => T::infinity(),
        };

        for k1 in 0..op.kernel {
            let y_plus_p = oh * op.stride + k1;
            if y_plus_p < op.padding {
                continue; // window row in the top padding border
            }
            let y = y_plus_p - op.padding;
            if y >= op.h_in {
                continue;
            }
            for k2 in 0..op.kernel {
                let x_plus_p = ow * op.stride + k2;
                if x_plus_p < op.padding {
                    continue;
                }
                let x = x_plus_p - op.padding;
                if x >= op.w_in {
                    continue;
                }
                let v = unsafe { *inp_ptr.add(inp_base + y * op.w_in + x) };
                acc = match kind {
                    Pool2dKind::Avg => acc + v,
                    Pool2dKind::Max => {
                        if v > acc {
                            v
                        } else {
                            acc
                        }
                    }
                    Pool2dKind::Min => {
                        if v < acc {
                            v
                        } else {
                            acc
                        }
                    }
                };
            }
        }

        let result = match kind {
            Pool2dKind::Avg => acc / area,
            _ => acc,
        };
        unsafe {
            *out_ptr.add(i) = result;
        }
    });
}

/// Pooling backward: one task per input element, scatter-free.
///
/// For each window offset `(k1, k2)` the task recovers the candidate output
/// row `oh = (y + padding - k1) / stride`, valid only when `y + padding >= k1`,
/// the difference divides evenly by `stride`, and `oh < h_out` (likewise for
/// the column). This enumerates exactly the output positions whose window
/// covered this input element.
///
/// - `Avg` accumulates `grad_out / (kernel * kernel)` per covering window and
///   ignores the forward values.
/// - `Max`/`Min` accumulate `grad_out` whenever the stored forward output
///   exactly equals this input's value: every tied extremum receives the full
///   gradient, it is never split among ties.
///
/// `grad_inp` is added to, never reset.
///
/// # Safety
/// - `inp` and `grad_inp` must be valid for `op.in_numel()` elements, `out`
///   and `grad_out` for `op.out_numel()`
/// - the descriptor must satisfy the output-size formula; `stride` and
///   `kernel` must be non-zero
pub unsafe fn pool2d_backward_kernel<T: Element>(
    kind: Pool2dKind,
    op: Pool2dOp,
    inp: *const T,
    out: *const T,
    grad_inp: *mut T,
    grad_out: *const T,
) {
    let numel = op.in_numel();
    let area = T::from_f64((op.kernel * op.kernel) as f64);
    let inp_addr = inp as usize;
    let out_addr = out as usize;
    let gi_addr = grad_inp as usize;
    let go_addr = grad_out as usize;

    for_each_flat(numel, |i| {
        let inp_ptr = inp_addr as *const T;
        let out_ptr = out_addr as *const T;
        let gi_ptr = gi_addr as *mut T;
        let go_ptr = go_addr as *const T;

        let x = i % op.w_in;
        let y = (i / op.w_in) % op.h_in;
        let plane = i / (op.w_in * op.h_in);
        let out_base = plane * op.h_out * op.w_out;

        let v = unsafe { *inp_ptr.add(i) };
        let mut grad = T::zero();

        for k1 in 0..op.kernel {
            let y_plus_p = y + op.padding;
            if y_plus_p < k1 {
                continue; // this window offset would start above the input
            }
            let oh_num = y_plus_p - k1;
            if oh_num % op.stride != 0 {
                continue; // no window origin lands here
            }
            let oh = oh_num / op.stride;
            if oh >= op.h_out {
                continue;
            }
            for k2 in 0..op.kernel {
                let x_plus_p = x + op.padding;
                if x_plus_p < k2 {
                    continue;
                }
                let ow_num = x_plus_p - k2;
                if ow_num % op.stride != 0 {
                    continue;
                }
                let ow = ow_num / op.stride;
                if ow >= op.w_out {
                    continue;
                }

                let out_idx = out_base + oh * op.w_out + ow;
                match kind {
                    Pool2dKind::Avg => {
                        grad += unsafe { *go_ptr.add(out_idx) } / area;
                    }
                    Pool2dKind::Max | Pool2dKind::Min => {
                        // Routed by exact equality with the stored forward
                        // output; every tied position gets the full gradient.
                        if unsafe { *out_ptr.add(out_idx) } == v {
                            grad += unsafe { *go_ptr.add(out_idx) };
                        }
                    }
                }
            }
        }

        unsafe {
            *gi_ptr.add(i) += grad;
        }
    });
}
