use crate::error::{KernelError, Result};
use std::borrow::Cow;

/// Memory order of a rank-4 feature map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Layout {
    /// `[batch, channel, height, width]`
    #[default]
    Nchw,
    /// `[batch, height, width, channel]`
    Nhwc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    F32,
    /// 8-bit unsigned quantized values.
    U8,
}

/// Scalar types a kernel can read and write.
///
/// Blending always happens in `f32`; `from_f32` decides how the result is
/// stored back (identity for floats, round-to-nearest + saturate for `u8`).
pub trait Element: Copy + Default + PartialEq + Send + Sync + std::fmt::Debug + 'static {
    const DTYPE: DataType;
    fn to_f32(self) -> f32;
    fn from_f32(v: f32) -> Self;
}

impl Element for f32 {
    const DTYPE: DataType = DataType::F32;
    #[inline(always)]
    fn to_f32(self) -> f32 {
        self
    }
    #[inline(always)]
    fn from_f32(v: f32) -> Self {
        v
    }
}

impl Element for u8 {
    const DTYPE: DataType = DataType::U8;
    #[inline(always)]
    fn to_f32(self) -> f32 {
        self as f32
    }
    #[inline(always)]
    fn from_f32(v: f32) -> Self {
        // `as` saturates on overflow and maps NaN to 0
        v.round().clamp(0.0, 255.0) as u8
    }
}

#[derive(Debug, Clone)]
pub struct TensorView<'a, T: Element = f32> {
    pub data: Cow<'a, [T]>,
    pub shape: Cow<'a, [usize]>,
    pub layout: Layout,
}

impl<'a, T: Element> TensorView<'a, T> {
    pub fn new(data: &'a [T], shape: &'a [usize]) -> Self {
        let len: usize = shape.iter().product();
        assert_eq!(data.len(), len, "Data length mismatch");
        Self {
            data: Cow::Borrowed(data),
            shape: Cow::Borrowed(shape),
            layout: Layout::Nchw,
        }
    }

    pub fn from_owned(data: Vec<T>, shape: Vec<usize>) -> Self {
        let len: usize = shape.iter().product();
        assert_eq!(data.len(), len, "Data length mismatch");
        Self {
            data: Cow::Owned(data),
            shape: Cow::Owned(shape),
            layout: Layout::Nchw,
        }
    }

    pub fn from_slice(data: &'a [T], shape: Vec<usize>) -> Self {
        let len: usize = shape.iter().product();
        assert_eq!(data.len(), len, "Data length mismatch");
        Self {
            data: Cow::Borrowed(data),
            shape: Cow::Owned(shape),
            layout: Layout::Nchw,
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn to_owned(&self) -> TensorView<'static, T> {
        TensorView::from_owned(self.data.to_vec(), self.shape.to_vec()).with_layout(self.layout)
    }

    pub fn dtype(&self) -> DataType {
        T::DTYPE
    }

    pub fn dim(&self) -> usize {
        self.shape.len()
    }

    pub fn size(&self, dim: usize) -> usize {
        self.shape[dim]
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Logical `(batch, channels, height, width)` of a rank-4 tensor,
    /// independent of its memory layout.
    pub fn dims4(&self) -> Result<FeatureDims> {
        if self.shape.len() != 4 {
            return Err(KernelError::config(format!(
                "expected rank-4 tensor, got rank {}",
                self.shape.len()
            )));
        }
        let s = &self.shape;
        Ok(match self.layout {
            Layout::Nchw => FeatureDims::new(s[0], s[1], s[2], s[3]),
            Layout::Nhwc => FeatureDims::new(s[0], s[3], s[1], s[2]),
        })
    }
}

/// Logical extents of a feature map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureDims {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl FeatureDims {
    pub fn new(batch: usize, channels: usize, height: usize, width: usize) -> Self {
        Self {
            batch,
            channels,
            height,
            width,
        }
    }

    pub fn numel(&self) -> usize {
        self.batch * self.channels * self.height * self.width
    }

    pub fn shape(&self, layout: Layout) -> Vec<usize> {
        match layout {
            Layout::Nchw => vec![self.batch, self.channels, self.height, self.width],
            Layout::Nhwc => vec![self.batch, self.height, self.width, self.channels],
        }
    }
}
