//! Vectorized element-wise helpers shared by the bias stage and the NHWC
//! bilinear blend.
//!
//! With the `simd` feature, x86_64 uses AVX when the CPU reports it at
//! runtime and aarch64 always uses NEON. Every vector kernel performs the
//! same sequence of IEEE operations as its scalar twin (no fused
//! multiply-add), so results do not depend on which path ran.

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
mod avx;
#[cfg(all(feature = "simd", target_arch = "aarch64"))]
mod neon;

/// `data[i] += value`
pub fn add_scalar(data: &mut [f32], value: f32) {
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    {
        if std::arch::is_x86_feature_detected!("avx") {
            unsafe { avx::add_scalar(data, value) };
            return;
        }
    }
    #[cfg(all(feature = "simd", target_arch = "aarch64"))]
    unsafe {
        neon::add_scalar(data, value);
    }
    #[cfg(not(all(feature = "simd", target_arch = "aarch64")))]
    scalar::add_scalar(data, value);
}

/// Adds `bias` to every `bias.len()`-sized group of `data` (one NHWC pixel
/// per group).
pub fn add_bias_channels(data: &mut [f32], bias: &[f32]) {
    if bias.is_empty() {
        return;
    }
    debug_assert_eq!(data.len() % bias.len(), 0);
    for pixel in data.chunks_exact_mut(bias.len()) {
        add_vectors(pixel, bias);
    }
}

/// `dst[i] += src[i]`
pub fn add_vectors(dst: &mut [f32], src: &[f32]) {
    assert_eq!(dst.len(), src.len());
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    {
        if std::arch::is_x86_feature_detected!("avx") {
            unsafe { avx::add_vectors(dst, src) };
            return;
        }
    }
    #[cfg(all(feature = "simd", target_arch = "aarch64"))]
    unsafe {
        neon::add_vectors(dst, src);
    }
    #[cfg(not(all(feature = "simd", target_arch = "aarch64")))]
    scalar::add_vectors(dst, src);
}

/// `data[i] = data[i].max(lo).min(hi)`; NaN maps to `lo`.
pub fn clamp(data: &mut [f32], lo: f32, hi: f32) {
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    {
        if std::arch::is_x86_feature_detected!("avx") {
            unsafe { avx::clamp(data, lo, hi) };
            return;
        }
    }
    #[cfg(all(feature = "simd", target_arch = "aarch64"))]
    unsafe {
        neon::clamp(data, lo, hi);
    }
    #[cfg(not(all(feature = "simd", target_arch = "aarch64")))]
    scalar::clamp(data, lo, hi);
}

/// Bilinear blend of four equally long channel vectors into `out`.
pub fn lerp_channels(
    top_left: &[f32],
    top_right: &[f32],
    bottom_left: &[f32],
    bottom_right: &[f32],
    x_lerp: f32,
    y_lerp: f32,
    out: &mut [f32],
) {
    let n = out.len();
    assert!(
        top_left.len() == n && top_right.len() == n && bottom_left.len() == n && bottom_right.len() == n,
        "lerp_channels: operand length mismatch"
    );
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    {
        if std::arch::is_x86_feature_detected!("avx") {
            unsafe { avx::lerp_channels(top_left, top_right, bottom_left, bottom_right, x_lerp, y_lerp, out) };
            return;
        }
    }
    #[cfg(all(feature = "simd", target_arch = "aarch64"))]
    unsafe {
        neon::lerp_channels(top_left, top_right, bottom_left, bottom_right, x_lerp, y_lerp, out);
    }
    #[cfg(not(all(feature = "simd", target_arch = "aarch64")))]
    scalar::lerp_channels(top_left, top_right, bottom_left, bottom_right, x_lerp, y_lerp, out);
}

/// Reference implementations; also used for the vector tails.
pub(crate) mod scalar {
    #[inline(always)]
    pub fn lerp(top_left: f32, top_right: f32, bottom_left: f32, bottom_right: f32, x_lerp: f32, y_lerp: f32) -> f32 {
        let top = top_left + (top_right - top_left) * x_lerp;
        let bottom = bottom_left + (bottom_right - bottom_left) * x_lerp;
        top + (bottom - top) * y_lerp
    }

    pub fn add_scalar(data: &mut [f32], value: f32) {
        for v in data.iter_mut() {
            *v += value;
        }
    }

    pub fn add_vectors(dst: &mut [f32], src: &[f32]) {
        for (d, s) in dst.iter_mut().zip(src) {
            *d += *s;
        }
    }

    pub fn clamp(data: &mut [f32], lo: f32, hi: f32) {
        for v in data.iter_mut() {
            *v = v.max(lo).min(hi);
        }
    }

    pub fn lerp_channels(
        top_left: &[f32],
        top_right: &[f32],
        bottom_left: &[f32],
        bottom_right: &[f32],
        x_lerp: f32,
        y_lerp: f32,
        out: &mut [f32],
    ) {
        for (i, o) in out.iter_mut().enumerate() {
            *o = lerp(top_left[i], top_right[i], bottom_left[i], bottom_right[i], x_lerp, y_lerp);
        }
    }
}
