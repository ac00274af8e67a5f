/// Resizes `v` to exactly `len` elements. A buffer that changes length is
/// zero-filled; one that already has the right length keeps its contents.
pub fn ensure_capacity<T: Default + Clone>(v: &mut Vec<T>, len: usize) {
    if v.len() != len {
        v.clear();
        v.resize(len, T::default());
    }
}

#[inline]
pub fn round_up(value: usize, factor: usize) -> usize {
    value.div_ceil(factor) * factor
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

pub fn tanh(x: f32) -> f32 {
    x.tanh()
}

pub fn leaky_relu_scalar(x: f32, alpha: f32) -> f32 {
    if x >= 0.0 {
        x
    } else {
        alpha * x
    }
}
