//! Bilinear resampling of rank-4 feature maps.

pub mod cache;

pub use cache::{compute_interpolation_weights, resize_scale, CachedInterpolation};

use crate::error::{KernelError, Result};
use crate::kernels::parallel::{for_each_region, Parallelism};
use crate::kernels::simd;
use crate::kernels::utils::ensure_capacity;
use crate::tensor::{Element, FeatureDims, Layout, TensorView};
use log::debug;

/// Element types the resampler can blend.
///
/// Blending happens in `f32`; the result is stored through
/// [`Element::from_f32`].
pub trait Interpolate: Element {
    fn lerp(top_left: Self, top_right: Self, bottom_left: Self, bottom_right: Self, x_lerp: f32, y_lerp: f32) -> Self {
        Self::from_f32(simd::scalar::lerp(
            top_left.to_f32(),
            top_right.to_f32(),
            bottom_left.to_f32(),
            bottom_right.to_f32(),
            x_lerp,
            y_lerp,
        ))
    }

    /// Blends four channel vectors of one pixel.
    fn lerp_channels(
        top_left: &[Self],
        top_right: &[Self],
        bottom_left: &[Self],
        bottom_right: &[Self],
        x_lerp: f32,
        y_lerp: f32,
        out: &mut [Self],
    ) {
        for (c, o) in out.iter_mut().enumerate() {
            *o = Self::lerp(top_left[c], top_right[c], bottom_left[c], bottom_right[c], x_lerp, y_lerp);
        }
    }
}

impl Interpolate for f32 {
    fn lerp_channels(
        top_left: &[f32],
        top_right: &[f32],
        bottom_left: &[f32],
        bottom_right: &[f32],
        x_lerp: f32,
        y_lerp: f32,
        out: &mut [f32],
    ) {
        simd::lerp_channels(top_left, top_right, bottom_left, bottom_right, x_lerp, y_lerp, out);
    }
}

impl Interpolate for u8 {}

/// Bilinear resize to a fixed output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResizeBilinear {
    out_height: usize,
    out_width: usize,
    align_corners: bool,
    parallelism: Parallelism,
}

impl ResizeBilinear {
    /// `size` is `[out_height, out_width]`; both must be positive.
    pub fn new(size: &[i64], align_corners: bool) -> Result<Self> {
        let [h, w] = size else {
            return Err(KernelError::config(format!(
                "resize size must have 2 entries, got {}",
                size.len()
            )));
        };
        if *h <= 0 || *w <= 0 {
            return Err(KernelError::config(format!("resize size must be positive, got {:?}", size)));
        }
        Ok(Self {
            out_height: *h as usize,
            out_width: *w as usize,
            align_corners,
            parallelism: Parallelism::default(),
        })
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn out_size(&self) -> [usize; 2] {
        [self.out_height, self.out_width]
    }

    pub fn align_corners(&self) -> bool {
        self.align_corners
    }

    /// Resizes `input` into `out`, keeping its layout.
    pub fn forward<'o, T: Interpolate>(&self, input: &TensorView<'_, T>, out: &'o mut Vec<T>) -> Result<TensorView<'o, T>> {
        let layout = input.layout;
        let in_dims = input.dims4()?;
        if in_dims.numel() != input.data.len() {
            return Err(KernelError::ShapeMismatch {
                what: "input elements",
                expected: in_dims.numel(),
                actual: input.data.len(),
            });
        }
        if in_dims.height == 0 || in_dims.width == 0 {
            return Err(KernelError::config(format!(
                "cannot resize an empty {}x{} image",
                in_dims.height, in_dims.width
            )));
        }
        let out_dims = FeatureDims::new(in_dims.batch, in_dims.channels, self.out_height, self.out_width);
        ensure_capacity(out, out_dims.numel());

        if (in_dims.height, in_dims.width) == (out_dims.height, out_dims.width) {
            out.copy_from_slice(&input.data);
            return Ok(TensorView::from_slice(out, out_dims.shape(layout)).with_layout(layout));
        }

        let ys = compute_interpolation_weights(
            out_dims.height,
            in_dims.height,
            resize_scale(in_dims.height, out_dims.height, self.align_corners),
        );
        let xs = compute_interpolation_weights(
            out_dims.width,
            in_dims.width,
            resize_scale(in_dims.width, out_dims.width, self.align_corners),
        );
        debug!(
            "resize_bilinear: {:?} {:?} {}x{} -> {}x{} align_corners={}",
            T::DTYPE,
            layout,
            in_dims.height,
            in_dims.width,
            out_dims.height,
            out_dims.width,
            self.align_corners
        );

        match layout {
            Layout::Nchw => resize_nchw(&input.data, in_dims, out_dims, &xs, &ys, self.parallelism, out),
            Layout::Nhwc => resize_nhwc(&input.data, in_dims, out_dims, &xs, &ys, self.parallelism, out),
        }
        Ok(TensorView::from_slice(out, out_dims.shape(layout)).with_layout(layout))
    }
}

/// One-shot bilinear resize; see [`ResizeBilinear`].
pub fn resize_bilinear<'o, T: Interpolate>(
    input: &TensorView<'_, T>,
    size: &[i64],
    align_corners: bool,
    par: Parallelism,
    out: &'o mut Vec<T>,
) -> Result<TensorView<'o, T>> {
    ResizeBilinear::new(size, align_corners)?.with_parallelism(par).forward(input, out)
}

fn resize_nchw<T: Interpolate>(
    input: &[T],
    in_dims: FeatureDims,
    out_dims: FeatureDims,
    xs: &[CachedInterpolation],
    ys: &[CachedInterpolation],
    par: Parallelism,
    out: &mut [T],
) {
    let (in_h, in_w) = (in_dims.height, in_dims.width);
    let (out_h, out_w) = (out_dims.height, out_dims.width);
    for_each_region(par, out, out_h * out_w, |i, plane| {
        let src = &input[i * in_h * in_w..(i + 1) * in_h * in_w];
        for (y, out_row) in plane.chunks_exact_mut(out_w).enumerate() {
            let top = &src[ys[y].lower * in_w..][..in_w];
            let bottom = &src[ys[y].upper * in_w..][..in_w];
            let y_lerp = ys[y].lerp;
            for (o, xi) in out_row.iter_mut().zip(xs) {
                *o = T::lerp(
                    top[xi.lower],
                    top[xi.upper],
                    bottom[xi.lower],
                    bottom[xi.upper],
                    xi.lerp,
                    y_lerp,
                );
            }
        }
    });
}

fn resize_nhwc<T: Interpolate>(
    input: &[T],
    in_dims: FeatureDims,
    out_dims: FeatureDims,
    xs: &[CachedInterpolation],
    ys: &[CachedInterpolation],
    par: Parallelism,
    out: &mut [T],
) {
    let channels = in_dims.channels;
    let (in_h, in_w) = (in_dims.height, in_dims.width);
    let (out_h, out_w) = (out_dims.height, out_dims.width);
    let in_row = in_w * channels;
    for_each_region(par, out, out_w * channels, |i, out_row| {
        let b = i / out_h;
        let y = i % out_h;
        let image = &input[b * in_h * in_row..(b + 1) * in_h * in_row];
        let top = &image[ys[y].lower * in_row..][..in_row];
        let bottom = &image[ys[y].upper * in_row..][..in_row];
        for (pixel, xi) in out_row.chunks_exact_mut(channels).zip(xs) {
            let (lo, hi) = (xi.lower * channels, xi.upper * channels);
            T::lerp_channels(
                &top[lo..lo + channels],
                &top[hi..hi + channels],
                &bottom[lo..lo + channels],
                &bottom[hi..hi + channels],
                xi.lerp,
                ys[y].lerp,
                pixel,
            );
        }
    });
}
