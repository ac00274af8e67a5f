use super::scalar;
use std::arch::x86_64::*;

#[target_feature(enable = "avx")]
pub unsafe fn add_scalar(data: &mut [f32], value: f32) {
    let len = data.len();
    let ptr = data.as_mut_ptr();
    let v = _mm256_set1_ps(value);
    let mut i = 0;
    while i + 8 <= len {
        let x = _mm256_loadu_ps(ptr.add(i));
        _mm256_storeu_ps(ptr.add(i), _mm256_add_ps(x, v));
        i += 8;
    }
    scalar::add_scalar(&mut data[i..], value);
}

#[target_feature(enable = "avx")]
pub unsafe fn add_vectors(dst: &mut [f32], src: &[f32]) {
    let len = dst.len().min(src.len());
    let d = dst.as_mut_ptr();
    let s = src.as_ptr();
    let mut i = 0;
    while i + 8 <= len {
        let x = _mm256_loadu_ps(d.add(i));
        let y = _mm256_loadu_ps(s.add(i));
        _mm256_storeu_ps(d.add(i), _mm256_add_ps(x, y));
        i += 8;
    }
    scalar::add_vectors(&mut dst[i..], &src[i..]);
}

#[target_feature(enable = "avx")]
pub unsafe fn clamp(data: &mut [f32], lo: f32, hi: f32) {
    let len = data.len();
    let ptr = data.as_mut_ptr();
    let lo_v = _mm256_set1_ps(lo);
    let hi_v = _mm256_set1_ps(hi);
    let mut i = 0;
    while i + 8 <= len {
        let x = _mm256_loadu_ps(ptr.add(i));
        // maxps returns the second operand when either is NaN
        let x = _mm256_min_ps(_mm256_max_ps(x, lo_v), hi_v);
        _mm256_storeu_ps(ptr.add(i), x);
        i += 8;
    }
    scalar::clamp(&mut data[i..], lo, hi);
}

#[target_feature(enable = "avx")]
pub unsafe fn lerp_channels(
    top_left: &[f32],
    top_right: &[f32],
    bottom_left: &[f32],
    bottom_right: &[f32],
    x_lerp: f32,
    y_lerp: f32,
    out: &mut [f32],
) {
    let len = out.len();
    let xl = _mm256_set1_ps(x_lerp);
    let yl = _mm256_set1_ps(y_lerp);
    let mut i = 0;
    while i + 8 <= len {
        let tl = _mm256_loadu_ps(top_left.as_ptr().add(i));
        let tr = _mm256_loadu_ps(top_right.as_ptr().add(i));
        let bl = _mm256_loadu_ps(bottom_left.as_ptr().add(i));
        let br = _mm256_loadu_ps(bottom_right.as_ptr().add(i));
        let top = _mm256_add_ps(tl, _mm256_mul_ps(_mm256_sub_ps(tr, tl), xl));
        let bottom = _mm256_add_ps(bl, _mm256_mul_ps(_mm256_sub_ps(br, bl), xl));
        let r = _mm256_add_ps(top, _mm256_mul_ps(_mm256_sub_ps(bottom, top), yl));
        _mm256_storeu_ps(out.as_mut_ptr().add(i), r);
        i += 8;
    }
    scalar::lerp_channels(
        &top_left[i..],
        &top_right[i..],
        &bottom_left[i..],
        &bottom_right[i..],
        x_lerp,
        y_lerp,
        &mut out[i..],
    );
}
