use super::ConvArgs;
use crate::kernels::parallel::for_each_region;

/// 3x3 stride-1 convolution in 2x4 output tiles.
///
/// Requires `out_h % 2 == 0`, `out_w % 4 == 0`, `in_h >= out_h + 2` and
/// `in_w >= out_w + 2`, which the tile plan guarantees.
pub(crate) fn conv2d_k3x3s1(args: &ConvArgs<'_>, input: &[f32], output: &mut [f32]) {
    let ConvArgs {
        filter,
        in_channels,
        in_h,
        in_w,
        out_channels,
        out_h,
        out_w,
        par,
        ..
    } = *args;
    assert!(out_h % 2 == 0 && out_w % 4 == 0);
    assert!(in_h >= out_h + 2 && in_w >= out_w + 2);
    let in_plane = in_h * in_w;

    for_each_region(par, output, out_h * out_w, |i, out| {
        let b = i / out_channels;
        let m = i % out_channels;
        for c in 0..in_channels {
            let in_ch = &input[(b * in_channels + c) * in_plane..][..in_plane];
            let f = &filter[(m * in_channels + c) * 9..][..9];
            for h in (0..out_h).step_by(2) {
                for w in (0..out_w).step_by(4) {
                    let mut acc = [[0.0f32; 4]; 2];
                    // input rows h..h+4 feed output rows h (kh = r) and h + 1 (kh = r - 1)
                    for r in 0..4 {
                        let row = &in_ch[(h + r) * in_w + w..][..6];
                        for (o, acc_row) in acc.iter_mut().enumerate() {
                            if r < o || r - o > 2 {
                                continue;
                            }
                            let k = &f[(r - o) * 3..(r - o) * 3 + 3];
                            for (j, a) in acc_row.iter_mut().enumerate() {
                                *a += row[j] * k[0] + row[j + 1] * k[1] + row[j + 2] * k[2];
                            }
                        }
                    }
                    for (o, acc_row) in acc.iter().enumerate() {
                        let dst = &mut out[(h + o) * out_w + w..][..4];
                        for (d, a) in dst.iter_mut().zip(acc_row) {
                            *d += *a;
                        }
                    }
                }
            }
        }
    });
}

/// 3x3 stride-2 convolution in 1x4 output tiles.
///
/// Requires `out_w % 4 == 0`, `in_h >= 2 * out_h + 1` and
/// `in_w >= 2 * out_w + 1`.
pub(crate) fn conv2d_k3x3s2(args: &ConvArgs<'_>, input: &[f32], output: &mut [f32]) {
    let ConvArgs {
        filter,
        in_channels,
        in_h,
        in_w,
        out_channels,
        out_h,
        out_w,
        par,
        ..
    } = *args;
    assert!(out_w % 4 == 0);
    assert!(in_h > 2 * out_h && in_w > 2 * out_w);
    let in_plane = in_h * in_w;

    for_each_region(par, output, out_h * out_w, |i, out| {
        let b = i / out_channels;
        let m = i % out_channels;
        for c in 0..in_channels {
            let in_ch = &input[(b * in_channels + c) * in_plane..][..in_plane];
            let f = &filter[(m * in_channels + c) * 9..][..9];
            for h in 0..out_h {
                let dst_row = &mut out[h * out_w..(h + 1) * out_w];
                for w in (0..out_w).step_by(4) {
                    let mut acc = [0.0f32; 4];
                    for (kh, k) in f.chunks_exact(3).enumerate() {
                        let row = &in_ch[(2 * h + kh) * in_w + 2 * w..][..9];
                        for (j, a) in acc.iter_mut().enumerate() {
                            *a += row[2 * j] * k[0] + row[2 * j + 1] * k[1] + row[2 * j + 2] * k[2];
                        }
                    }
                    for (d, a) in dst_row[w..w + 4].iter_mut().zip(&acc) {
                        *d += *a;
                    }
                }
            }
        }
    });
}
