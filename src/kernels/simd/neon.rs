use super::scalar;
use core::arch::aarch64::*;

pub unsafe fn add_scalar(data: &mut [f32], value: f32) {
    let len = data.len();
    let ptr = data.as_mut_ptr();
    let v = vdupq_n_f32(value);
    let mut i = 0;
    while i + 4 <= len {
        vst1q_f32(ptr.add(i), vaddq_f32(vld1q_f32(ptr.add(i)), v));
        i += 4;
    }
    scalar::add_scalar(&mut data[i..], value);
}

pub unsafe fn add_vectors(dst: &mut [f32], src: &[f32]) {
    let len = dst.len().min(src.len());
    let d = dst.as_mut_ptr();
    let s = src.as_ptr();
    let mut i = 0;
    while i + 4 <= len {
        vst1q_f32(d.add(i), vaddq_f32(vld1q_f32(d.add(i)), vld1q_f32(s.add(i))));
        i += 4;
    }
    scalar::add_vectors(&mut dst[i..], &src[i..]);
}

pub unsafe fn clamp(data: &mut [f32], lo: f32, hi: f32) {
    let len = data.len();
    let ptr = data.as_mut_ptr();
    let lo_v = vdupq_n_f32(lo);
    let hi_v = vdupq_n_f32(hi);
    let mut i = 0;
    while i + 4 <= len {
        // maxnm/minnm prefer the number over NaN, like f32::max/min
        let x = vminnmq_f32(vmaxnmq_f32(vld1q_f32(ptr.add(i)), lo_v), hi_v);
        vst1q_f32(ptr.add(i), x);
        i += 4;
    }
    scalar::clamp(&mut data[i..], lo, hi);
}

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
    let xl = vdupq_n_f32(x_lerp);
    let yl = vdupq_n_f32(y_lerp);
    let mut i = 0;
    while i + 4 <= len {
        let tl = vld1q_f32(top_left.as_ptr().add(i));
        let tr = vld1q_f32(top_right.as_ptr().add(i));
        let bl = vld1q_f32(bottom_left.as_ptr().add(i));
        let br = vld1q_f32(bottom_right.as_ptr().add(i));
        let top = vaddq_f32(tl, vmulq_f32(vsubq_f32(tr, tl), xl));
        let bottom = vaddq_f32(bl, vmulq_f32(vsubq_f32(br, bl), xl));
        let r = vaddq_f32(top, vmulq_f32(vsubq_f32(bottom, top), yl));
        vst1q_f32(out.as_mut_ptr().add(i), r);
        i += 4;
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
