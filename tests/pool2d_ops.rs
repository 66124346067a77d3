//! Integration tests for 2D pooling forward/backward kernels.

use kernr::kernels::pool2d::{Pool2dKind, Pool2dOp};
use kernr::launch;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Build a descriptor with the output size derived from the formula.
fn descriptor(
    batch: usize,
    chan: usize,
    h_in: usize,
    w_in: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
) -> Pool2dOp {
    let h_out = (h_in + 2 * padding - kernel) / stride + 1;
    let w_out = (w_in + 2 * padding - kernel) / stride + 1;
    Pool2dOp {
        kernel,
        stride,
        padding,
        batch,
        chan,
        h_in,
        h_out,
        w_in,
        w_out,
    }
}

/// Reference scatter implementation of pooling backward: enumerate output
/// windows the forward way and push gradient into every contributing input.
fn reference_backward(
    kind: Pool2dKind,
    op: Pool2dOp,
    inp: &[f64],
    out: &[f64],
    grad_out: &[f64],
) -> Vec<f64> {
    let mut grad_inp = vec![0.0f64; op.in_numel()];
    let area = (op.kernel * op.kernel) as f64;
    for plane in 0..op.batch * op.chan {
        let in_base = plane * op.h_in * op.w_in;
        let out_base = plane * op.h_out * op.w_out;
        for oh in 0..op.h_out {
            for ow in 0..op.w_out {
                let o = out_base + oh * op.w_out + ow;
                for k1 in 0..op.kernel {
                    let y = oh * op.stride + k1;
                    if y < op.padding || y - op.padding >= op.h_in {
                        continue;
                    }
                    let y = y - op.padding;
                    for k2 in 0..op.kernel {
                        let x = ow * op.stride + k2;
                        if x < op.padding || x - op.padding >= op.w_in {
                            continue;
                        }
                        let x = x - op.padding;
                        let idx = in_base + y * op.w_in + x;
                        match kind {
                            Pool2dKind::Avg => grad_inp[idx] += grad_out[o] / area,
                            Pool2dKind::Max | Pool2dKind::Min => {
                                if inp[idx] == out[o] {
                                    grad_inp[idx] += grad_out[o];
                                }
                            }
                        }
                    }
                }
            }
        }
    }
    grad_inp
}

// =============================================================================
// Forward
// =============================================================================

#[test]
fn test_avg_forward_all_ones_full_windows() {
    let op = descriptor(1, 1, 4, 4, 2, 2, 0);
    let inp = vec![1.0f64; 16];
    let mut out = vec![0.0f64; op.out_numel()];

    launch::pool2d_forward(Pool2dKind::Avg, op, &inp, &mut out).unwrap();

    // Every window is fully in bounds: exactly 1.0 everywhere
    assert_eq!(out, vec![1.0; 4]);
}

#[test]
fn test_avg_forward_padding_shrinks_border() {
    // 4x4 ones, 2x2 windows, stride 2, padding 1: corner windows see one
    // valid element, edge windows two, the center window four. The divisor
    // stays at kernel*kernel = 4, so borders come out below 1.0.
    let op = descriptor(1, 1, 4, 4, 2, 2, 1);
    assert_eq!((op.h_out, op.w_out), (3, 3));
    let inp = vec![1.0f64; 16];
    let mut out = vec![0.0f64; 9];

    launch::pool2d_forward(Pool2dKind::Avg, op, &inp, &mut out).unwrap();

    #[rustfmt::skip]
    let expected = vec![
        0.25, 0.5, 0.25,
        0.5,  1.0, 0.5,
        0.25, 0.5, 0.25,
    ];
    assert_eq!(out, expected);
}

#[test]
fn test_max_forward() {
    let op = descriptor(1, 1, 4, 4, 2, 2, 0);
    #[rustfmt::skip]
    let inp = [
        1.0f64, 2.0, 3.0, 4.0,
        5.0, 6.0, 7.0, 8.0,
        9.0, 10.0, 11.0, 12.0,
        13.0, 14.0, 15.0, 16.0,
    ];
    let mut out = [0.0f64; 4];

    launch::pool2d_forward(Pool2dKind::Max, op, &inp, &mut out).unwrap();

    assert_eq!(out, [6.0, 8.0, 14.0, 16.0]);
}

#[test]
fn test_min_forward_padding_is_skipped_not_zero() {
    // Padding positions contribute nothing: with all-5.0 input the corner
    // windows still report 5.0, not 0.0.
    let op = descriptor(1, 1, 4, 4, 2, 2, 1);
    let inp = vec![5.0f64; 16];
    let mut out = vec![0.0f64; 9];

    launch::pool2d_forward(Pool2dKind::Min, op, &inp, &mut out).unwrap();

    assert_eq!(out, vec![5.0; 9]);
}

#[test]
fn test_forward_planes_are_independent() {
    // Two batches, three channels; each plane holds a distinct constant.
    let op = descriptor(2, 3, 4, 4, 2, 2, 0);
    let mut inp = vec![0.0f64; op.in_numel()];
    for plane in 0..6 {
        for v in &mut inp[plane * 16..(plane + 1) * 16] {
            *v = plane as f64;
        }
    }
    let mut out = vec![0.0f64; op.out_numel()];

    launch::pool2d_forward(Pool2dKind::Avg, op, &inp, &mut out).unwrap();

    for plane in 0..6 {
        for &v in &out[plane * 4..(plane + 1) * 4] {
            assert_eq!(v, plane as f64);
        }
    }
}

#[test]
fn test_avg_forward_f32() {
    let op = descriptor(1, 1, 2, 2, 2, 2, 0);
    let inp = [1.0f32, 2.0, 3.0, 4.0];
    let mut out = [0.0f32; 1];

    launch::pool2d_forward(Pool2dKind::Avg, op, &inp, &mut out).unwrap();

    assert_eq!(out, [2.5]);
}

// =============================================================================
// Backward
// =============================================================================

#[test]
fn test_avg_backward_non_overlapping() {
    let op = descriptor(1, 1, 4, 4, 2, 2, 0);
    let inp = vec![1.0f64; 16];
    let mut out = vec![0.0f64; 4];
    launch::pool2d_forward(Pool2dKind::Avg, op, &inp, &mut out).unwrap();

    let grad_out = vec![1.0f64; 4];
    let mut grad_inp = vec![0.0f64; 16];
    launch::pool2d_backward(Pool2dKind::Avg, op, &inp, &out, &mut grad_inp, &grad_out).unwrap();

    // Each input sits in exactly one window: grad = 1/4 everywhere
    assert_eq!(grad_inp, vec![0.25; 16]);
}

#[test]
fn test_max_backward_ties_all_receive_full_gradient() {
    // One window holding a duplicated maximum: both positions get the whole
    // gradient, nothing is split.
    let op = descriptor(1, 1, 2, 2, 2, 2, 0);
    let inp = [5.0f64, 5.0, 3.0, 1.0];
    let mut out = [0.0f64; 1];
    launch::pool2d_forward(Pool2dKind::Max, op, &inp, &mut out).unwrap();
    assert_eq!(out, [5.0]);

    let grad_out = [2.0f64];
    let mut grad_inp = [0.0f64; 4];
    launch::pool2d_backward(Pool2dKind::Max, op, &inp, &out, &mut grad_inp, &grad_out).unwrap();

    assert_eq!(grad_inp, [2.0, 2.0, 0.0, 0.0]);
}

#[test]
fn test_min_backward_ties_all_receive_full_gradient() {
    let op = descriptor(1, 1, 2, 2, 2, 2, 0);
    let inp = [7.0f64, 1.0, 1.0, 9.0];
    let mut out = [0.0f64; 1];
    launch::pool2d_forward(Pool2dKind::Min, op, &inp, &mut out).unwrap();
    assert_eq!(out, [1.0]);

    let grad_out = [3.0f64];
    let mut grad_inp = [0.0f64; 4];
    launch::pool2d_backward(Pool2dKind::Min, op, &inp, &out, &mut grad_inp, &grad_out).unwrap();

    assert_eq!(grad_inp, [0.0, 3.0, 3.0, 0.0]);
}

#[test]
fn test_avg_backward_overlapping_matches_reference_scatter() {
    // 3x3 windows, stride 1, padding 1: windows overlap, every input feeds
    // several outputs. The scatter-free backward must agree with a direct
    // forward-window scatter.
    let op = descriptor(1, 2, 5, 5, 3, 1, 1);
    let mut rng = StdRng::seed_from_u64(21);
    let inp: Vec<f64> = (0..op.in_numel()).map(|_| rng.gen_range(-2.0..2.0)).collect();
    let mut out = vec![0.0f64; op.out_numel()];
    launch::pool2d_forward(Pool2dKind::Avg, op, &inp, &mut out).unwrap();

    let grad_out: Vec<f64> = (0..op.out_numel()).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let mut grad_inp = vec![0.0f64; op.in_numel()];
    launch::pool2d_backward(Pool2dKind::Avg, op, &inp, &out, &mut grad_inp, &grad_out).unwrap();

    let expected = reference_backward(Pool2dKind::Avg, op, &inp, &out, &grad_out);
    for (i, (&got, &want)) in grad_inp.iter().zip(expected.iter()).enumerate() {
        assert!((got - want).abs() < 1e-12, "element {i}: {got} vs {want}");
    }
}

#[test]
fn test_max_backward_overlapping_matches_reference_scatter() {
    let op = descriptor(2, 1, 6, 6, 3, 2, 1);
    let mut rng = StdRng::seed_from_u64(23);
    let inp: Vec<f64> = (0..op.in_numel()).map(|_| rng.gen_range(-2.0..2.0)).collect();
    let mut out = vec![0.0f64; op.out_numel()];
    launch::pool2d_forward(Pool2dKind::Max, op, &inp, &mut out).unwrap();

    let grad_out: Vec<f64> = (0..op.out_numel()).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let mut grad_inp = vec![0.0f64; op.in_numel()];
    launch::pool2d_backward(Pool2dKind::Max, op, &inp, &out, &mut grad_inp, &grad_out).unwrap();

    let expected = reference_backward(Pool2dKind::Max, op, &inp, &out, &grad_out);
    for (i, (&got, &want)) in grad_inp.iter().zip(expected.iter()).enumerate() {
        assert!((got - want).abs() < 1e-12, "element {i}: {got} vs {want}");
    }
}

#[test]
fn test_jacobian_transpose_sum_consistency() {
    // sum(grad_inp) must equal sum over outputs of grad_out weighted by that
    // output's responsibility: valid_count/area for avg, tie count for
    // max/min.
    let op = descriptor(1, 1, 5, 5, 3, 2, 1);
    let mut rng = StdRng::seed_from_u64(29);
    let inp: Vec<f64> = (0..op.in_numel()).map(|_| rng.gen_range(-2.0..2.0)).collect();

    for kind in [Pool2dKind::Avg, Pool2dKind::Max, Pool2dKind::Min] {
        let mut out = vec![0.0f64; op.out_numel()];
        launch::pool2d_forward(kind, op, &inp, &mut out).unwrap();

        let grad_out: Vec<f64> =
            (0..op.out_numel()).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let mut grad_inp = vec![0.0f64; op.in_numel()];
        launch::pool2d_backward(kind, op, &inp, &out, &mut grad_inp, &grad_out).unwrap();

        let got: f64 = grad_inp.iter().sum();

        // Weight each output by how many inputs it actually touched
        let area = (op.kernel * op.kernel) as f64;
        let mut want = 0.0f64;
        for oh in 0..op.h_out {
            for ow in 0..op.w_out {
                let o = oh * op.w_out + ow;
                let mut weight = 0.0f64;
                for k1 in 0..op.kernel {
                    let y = oh * op.stride + k1;
                    if y < op.padding || y - op.padding >= op.h_in {
                        continue;
                    }
                    let y = y - op.padding;
                    for k2 in 0..op.kernel {
                        let x = ow * op.stride + k2;
                        if x < op.padding || x - op.padding >= op.w_in {
                            continue;
                        }
                        let x = x - op.padding;
                        match kind {
                            Pool2dKind::Avg => weight += 1.0 / area,
                            Pool2dKind::Max | Pool2dKind::Min => {
                                if inp[y * op.w_in + x] == out[o] {
                                    weight += 1.0;
                                }
                            }
                        }
                    }
                }
                want += grad_out[o] * weight;
            }
        }

        assert!(
            (got - want).abs() < 1e-10,
            "{kind:?}: sum(grad_inp) = {got}, weighted sum(grad_out) = {want}"
        );
    }
}

#[test]
fn test_backward_accumulates_across_invocations() {
    let op = descriptor(1, 1, 4, 4, 2, 2, 0);
    let inp = vec![1.0f64; 16];
    let mut out = vec![0.0f64; 4];
    launch::pool2d_forward(Pool2dKind::Avg, op, &inp, &mut out).unwrap();

    let grad_out = vec![1.0f64; 4];
    let mut grad_inp = vec![0.0f64; 16];
    launch::pool2d_backward(Pool2dKind::Avg, op, &inp, &out, &mut grad_inp, &grad_out).unwrap();
    launch::pool2d_backward(Pool2dKind::Avg, op, &inp, &out, &mut grad_inp, &grad_out).unwrap();

    assert_eq!(grad_inp, vec![0.5; 16]);
}
