//! Winograd F(6x6, 3x3) convolution.
//!
//! Each 8x8 input tile `d` and 3x3 filter `g` are moved into the transform
//! domain (`V = Bt d B`, `U = G g Gt`), multiplied element-wise and summed
//! over input channels, then brought back with `Y = At M A` to give a 6x6
//! output tile. Transform-domain buffers are laid out so every
//! (batch, channel) owns one contiguous `[tiles][64]` block.

use super::ConvArgs;
use crate::error::Result;
use crate::kernels::algorithm::{WINOGRAD_IN_TILE, WINOGRAD_OUT_TILE};
use crate::kernels::parallel::for_each_region;
use log::trace;
use rustc_hash::FxHasher;
use std::hash::Hasher;

const IN: usize = WINOGRAD_IN_TILE;
const OUT: usize = WINOGRAD_OUT_TILE;
const AREA: usize = IN * IN;

#[rustfmt::skip]
const BT: [[f32; 8]; 8] = [
    [1.0,  0.0, -5.25,  0.0,   5.25,  0.0,  -1.0, 0.0],
    [0.0,  1.0,  1.0,  -4.25, -4.25,  1.0,   1.0, 0.0],
    [0.0, -1.0,  1.0,   4.25, -4.25, -1.0,   1.0, 0.0],
    [0.0,  0.5,  0.25, -2.5,  -1.25,  2.0,   1.0, 0.0],
    [0.0, -0.5,  0.25,  2.5,  -1.25, -2.0,   1.0, 0.0],
    [0.0,  2.0,  4.0,  -2.5,  -5.0,   0.5,   1.0, 0.0],
    [0.0, -2.0,  4.0,   2.5,  -5.0,  -0.5,   1.0, 0.0],
    [0.0, -1.0,  0.0,   5.25,  0.0,  -5.25,  0.0, 1.0],
];

#[rustfmt::skip]
const G: [[f32; 3]; 8] = [
    [1.0,             0.0,             0.0],
    [-2.0 / 9.0,     -2.0 / 9.0,      -2.0 / 9.0],
    [-2.0 / 9.0,      2.0 / 9.0,      -2.0 / 9.0],
    [1.0 / 90.0,      1.0 / 45.0,      2.0 / 45.0],
    [1.0 / 90.0,     -1.0 / 45.0,      2.0 / 45.0],
    [32.0 / 45.0,     16.0 / 45.0,     8.0 / 45.0],
    [32.0 / 45.0,    -16.0 / 45.0,     8.0 / 45.0],
    [0.0,             0.0,             1.0],
];

#[rustfmt::skip]
const AT: [[f32; 8]; 6] = [
    [1.0, 1.0,  1.0,  1.0,   1.0,  1.0,       1.0,       0.0],
    [0.0, 1.0, -1.0,  2.0,  -2.0,  0.5,      -0.5,       0.0],
    [0.0, 1.0,  1.0,  4.0,   4.0,  0.25,      0.25,      0.0],
    [0.0, 1.0, -1.0,  8.0,  -8.0,  0.125,    -0.125,     0.0],
    [0.0, 1.0,  1.0, 16.0,  16.0,  0.0625,    0.0625,    0.0],
    [0.0, 1.0, -1.0, 32.0, -32.0,  0.03125,  -0.03125,   1.0],
];

/// `L * X * Lt` for an `R x K` matrix `L` and a `K x K` matrix `X`.
#[inline]
fn sandwich<const R: usize, const K: usize>(l: &[[f32; K]; R], x: &[[f32; K]; K]) -> [[f32; R]; R] {
    let mut lx = [[0.0f32; K]; R];
    for i in 0..R {
        for j in 0..K {
            let mut s = 0.0;
            for k in 0..K {
                s += l[i][k] * x[k][j];
            }
            lx[i][j] = s;
        }
    }
    let mut out = [[0.0f32; R]; R];
    for i in 0..R {
        for j in 0..R {
            let mut s = 0.0;
            for k in 0..K {
                s += lx[i][k] * l[j][k];
            }
            out[i][j] = s;
        }
    }
    out
}

fn transform_filter(g: &[f32], u: &mut [f32]) {
    let mut x = [[0.0f32; 3]; 3];
    for (r, row) in x.iter_mut().enumerate() {
        row.copy_from_slice(&g[r * 3..r * 3 + 3]);
    }
    let t = sandwich(&G, &x);
    for (r, row) in t.iter().enumerate() {
        u[r * IN..(r + 1) * IN].copy_from_slice(row);
    }
}

/// Identity of the filter whose transform is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FilterKey {
    out_channels: usize,
    in_channels: usize,
    fingerprint: u64,
}

impl FilterKey {
    pub(crate) fn of(filter: &[f32], out_channels: usize, in_channels: usize) -> Self {
        let mut hasher = FxHasher::default();
        for v in filter {
            hasher.write_u32(v.to_bits());
        }
        Self {
            out_channels,
            in_channels,
            fingerprint: hasher.finish(),
        }
    }
}

/// Transformed filter kept across calls.
///
/// Entries are keyed by filter shape and a hash of the filter bits, so a
/// call with a different filter re-transforms instead of reusing stale data.
#[derive(Debug, Default)]
pub struct WinogradFilterCache {
    transformed: Vec<f32>,
    key: Option<FilterKey>,
    transforms: usize,
}

impl WinogradFilterCache {
    pub(crate) fn is_valid_for(&self, key: &FilterKey) -> bool {
        self.key.as_ref() == Some(key)
    }

    pub fn invalidate(&mut self) {
        self.key = None;
    }

    /// How many times a filter has been transformed.
    pub fn transform_count(&self) -> usize {
        self.transforms
    }

    fn store(&mut self, key: FilterKey, transformed: &[f32]) {
        self.transformed.clear();
        self.transformed.extend_from_slice(transformed);
        self.key = Some(key);
        self.transforms += 1;
    }
}

/// Scratch regions carved for one Winograd call. `filter` is empty when the
/// cache already holds this filter.
pub(crate) struct WinogradScratch<'s> {
    pub input: &'s mut [f32],
    pub filter: &'s mut [f32],
    pub output: &'s mut [f32],
}

pub(crate) fn conv2d_winograd(
    args: &ConvArgs<'_>,
    key: FilterKey,
    scratch: WinogradScratch<'_>,
    cache: &mut WinogradFilterCache,
    input: &[f32],
    output: &mut [f32],
) -> Result<()> {
    let ConvArgs {
        filter,
        batch,
        in_channels,
        in_h,
        in_w,
        out_channels,
        out_h,
        out_w,
        par,
        ..
    } = *args;
    assert!(out_h % OUT == 0 && out_w % OUT == 0);
    assert!(in_h >= out_h + 2 && in_w >= out_w + 2);
    let tiles_h = out_h / OUT;
    let tiles_w = out_w / OUT;
    let tiles = tiles_h * tiles_w;
    let in_plane = in_h * in_w;
    let WinogradScratch {
        input: t_input,
        filter: t_filter,
        output: t_output,
    } = scratch;
    assert_eq!(t_input.len(), batch * in_channels * tiles * AREA);
    assert_eq!(t_output.len(), batch * out_channels * tiles * AREA);

    // V[b][c][tile] = Bt d B
    for_each_region(par, t_input, tiles * AREA, |i, v| {
        let plane = &input[i * in_plane..(i + 1) * in_plane];
        let mut d = [[0.0f32; IN]; IN];
        for th in 0..tiles_h {
            for tw in 0..tiles_w {
                for (r, row) in d.iter_mut().enumerate() {
                    let src = &plane[(th * OUT + r) * in_w + tw * OUT..][..IN];
                    row.copy_from_slice(src);
                }
                let t = sandwich(&BT, &d);
                let dst = &mut v[(th * tiles_w + tw) * AREA..][..AREA];
                for (r, row) in t.iter().enumerate() {
                    dst[r * IN..(r + 1) * IN].copy_from_slice(row);
                }
            }
        }
    });

    // U[m][c] = G g Gt, once per distinct filter
    if !cache.is_valid_for(&key) {
        assert_eq!(t_filter.len(), out_channels * in_channels * AREA);
        for_each_region(par, t_filter, in_channels * AREA, |m, u| {
            for c in 0..in_channels {
                let g = &filter[(m * in_channels + c) * 9..][..9];
                transform_filter(g, &mut u[c * AREA..(c + 1) * AREA]);
            }
        });
        cache.store(key, t_filter);
        trace!(
            "winograd: transformed filter {}x{}x3x3 (transform #{})",
            out_channels,
            in_channels,
            cache.transforms
        );
    }
    let u_all = &cache.transformed[..];

    // M[b][m][tile] = sum_c U[m][c] (.) V[b][c][tile]
    let v_all = &*t_input;
    for_each_region(par, t_output, tiles * AREA, |i, acc| {
        let b = i / out_channels;
        let m = i % out_channels;
        acc.fill(0.0);
        for c in 0..in_channels {
            let u = &u_all[(m * in_channels + c) * AREA..][..AREA];
            let v = &v_all[(b * in_channels + c) * tiles * AREA..][..tiles * AREA];
            for (acc_tile, v_tile) in acc.chunks_exact_mut(AREA).zip(v.chunks_exact(AREA)) {
                for p in 0..AREA {
                    acc_tile[p] += u[p] * v_tile[p];
                }
            }
        }
    });

    // Y = At M A into the padded output
    let m_all = &*t_output;
    for_each_region(par, output, out_h * out_w, |i, out| {
        let m_tiles = &m_all[i * tiles * AREA..(i + 1) * tiles * AREA];
        let mut x = [[0.0f32; IN]; IN];
        for th in 0..tiles_h {
            for tw in 0..tiles_w {
                let src = &m_tiles[(th * tiles_w + tw) * AREA..][..AREA];
                for (r, row) in x.iter_mut().enumerate() {
                    row.copy_from_slice(&src[r * IN..(r + 1) * IN]);
                }
                let y = sandwich(&AT, &x);
                for (r, row) in y.iter().enumerate() {
                    let dst = &mut out[(th * OUT + r) * out_w + tw * OUT..][..OUT];
                    for (d, v) in dst.iter_mut().zip(row) {
                        *d += *v;
                    }
                }
            }
        }
    });

    Ok(())
}
