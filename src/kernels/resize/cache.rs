//! Per-axis source indices and blend weights for bilinear resampling.

/// Where output coordinate `i` reads from along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CachedInterpolation {
    pub lower: usize,
    pub upper: usize,
    /// Weight of `upper`; always in `[0, 1)`.
    pub lerp: f32,
}

/// Source step per output step along one axis.
///
/// With `align_corners` the first and last samples of input and output line
/// up, which needs at least two output samples.
pub fn resize_scale(in_size: usize, out_size: usize, align_corners: bool) -> f32 {
    if align_corners && out_size > 1 {
        (in_size - 1) as f32 / (out_size - 1) as f32
    } else {
        in_size as f32 / out_size as f32
    }
}

/// Builds `out_size + 1` entries: one per output coordinate plus a trailing
/// all-zero sentinel. `in_size` must be non-zero.
pub fn compute_interpolation_weights(out_size: usize, in_size: usize, scale: f32) -> Vec<CachedInterpolation> {
    debug_assert!(in_size > 0);
    let last = in_size - 1;
    let mut weights = vec![CachedInterpolation::default(); out_size + 1];
    for (i, w) in weights.iter_mut().take(out_size).enumerate() {
        let src = i as f32 * scale;
        let floor = src.floor();
        let lower = floor as usize;
        *w = if lower >= last {
            CachedInterpolation {
                lower: last,
                upper: last,
                lerp: 0.0,
            }
        } else {
            CachedInterpolation {
                lower,
                upper: lower + 1,
                lerp: (src - floor).clamp(0.0, 1.0 - f32::EPSILON),
            }
        };
    }
    weights
}
