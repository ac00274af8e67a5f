// Kernel accuracy tests - every convolution algorithm against a plain reference
use approx::relative_eq;
use tessel::kernels::*;
use tessel::tensor::{FeatureDims, Layout, TensorView};
use tessel::KernelError;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn assert_close(actual: &[f32], expected: &[f32], epsilon: f32, max_relative: f32, name: &str) {
    assert_eq!(actual.len(), expected.len(), "{}: length mismatch", name);
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            relative_eq!(*a, *e, epsilon = epsilon, max_relative = max_relative),
            "{}: index {} got {} expected {}",
            name,
            i,
            a,
            e
        );
    }
}

/// Deterministic values in roughly `[-modulo/2, modulo/2) * scale`.
fn pattern(n: usize, modulo: usize, scale: f32) -> Vec<f32> {
    (0..n)
        .map(|i| ((i * 31 + 7) % modulo) as f32 * scale - (modulo / 2) as f32 * scale)
        .collect()
}

fn nchw_to_nhwc(data: &[f32], d: FeatureDims) -> Vec<f32> {
    let mut out = vec![0.0; data.len()];
    for b in 0..d.batch {
        for c in 0..d.channels {
            for y in 0..d.height {
                for x in 0..d.width {
                    out[((b * d.height + y) * d.width + x) * d.channels + c] =
                        data[((b * d.channels + c) * d.height + y) * d.width + x];
                }
            }
        }
    }
    out
}

struct Case {
    input: FeatureDims,
    out_channels: usize,
    kernel: [usize; 2],
    config: ConvConfig,
}

impl Case {
    fn new(input: FeatureDims, out_channels: usize, kernel: [usize; 2], config: ConvConfig) -> Self {
        Self {
            input,
            out_channels,
            kernel,
            config,
        }
    }

    fn input_data(&self) -> Vec<f32> {
        pattern(self.input.numel(), 7, 0.1)
    }

    fn filter_data(&self) -> Vec<f32> {
        let n = self.out_channels * self.input.channels * self.kernel[0] * self.kernel[1];
        pattern(n, 9, 0.05)
    }

    fn filter_shape(&self) -> Vec<usize> {
        vec![self.out_channels, self.input.channels, self.kernel[0], self.kernel[1]]
    }

    /// Direct NCHW convolution with explicit bounds checks.
    fn reference(&self, bias: Option<&[f32]>) -> (Vec<f32>, FeatureDims) {
        let c = &self.config;
        let d = self.input;
        let plan = plan_padding(
            [d.height, d.width],
            self.kernel,
            c.strides,
            c.dilations,
            c.padding,
            c.round_type,
        )
        .unwrap();
        let (top, left) = (plan.padding.top() as isize, plan.padding.left() as isize);
        let input = self.input_data();
        let filter = self.filter_data();
        let out_dims = FeatureDims::new(d.batch, self.out_channels, plan.out_h, plan.out_w);
        let [kh, kw] = self.kernel;
        let mut out = vec![0.0f32; out_dims.numel()];
        for b in 0..d.batch {
            for m in 0..self.out_channels {
                for oy in 0..plan.out_h {
                    for ox in 0..plan.out_w {
                        let mut sum = bias.map_or(0.0, |b| b[m]);
                        for ch in 0..d.channels {
                            for ky in 0..kh {
                                for kx in 0..kw {
                                    let iy = (oy * c.strides[0] + ky * c.dilations[0]) as isize - top;
                                    let ix = (ox * c.strides[1] + kx * c.dilations[1]) as isize - left;
                                    if iy < 0 || ix < 0 || iy >= d.height as isize || ix >= d.width as isize {
                                        continue;
                                    }
                                    let v = input[((b * d.channels + ch) * d.height + iy as usize) * d.width + ix as usize];
                                    sum += v * filter[((m * d.channels + ch) * kh + ky) * kw + kx];
                                }
                            }
                        }
                        out[((b * self.out_channels + m) * plan.out_h + oy) * plan.out_w + ox] =
                            c.activation.apply(sum);
                    }
                }
            }
        }
        (out, out_dims)
    }

    fn run(&self, layout: Layout, bias: Option<&[f32]>) -> (Vec<f32>, Option<ConvAlgorithm>) {
        let data = match layout {
            Layout::Nchw => self.input_data(),
            Layout::Nhwc => nchw_to_nhwc(&self.input_data(), self.input),
        };
        let input = TensorView::from_owned(data, self.input.shape(layout)).with_layout(layout);
        let filter = TensorView::from_owned(self.filter_data(), self.filter_shape());
        let bias = bias.map(|b| TensorView::from_owned(b.to_vec(), vec![b.len()]));
        let mut conv = Conv2d::new(self.config);
        let mut out = Vec::new();
        let y = conv.forward(&input, &filter, bias.as_ref(), &mut out).unwrap();
        assert_eq!(y.layout, layout);
        (y.data.to_vec(), conv.last_algorithm())
    }

    fn check(&self, algorithm: ConvAlgorithm, epsilon: f32, max_relative: f32) {
        init_logger();
        let name = format!("{:?}", algorithm);
        let (expected, out_dims) = self.reference(None);
        let (nchw, used) = self.run(Layout::Nchw, None);
        assert_eq!(used, Some(algorithm));
        assert_close(&nchw, &expected, epsilon, max_relative, &name);

        let (nhwc, used) = self.run(Layout::Nhwc, None);
        assert_eq!(used, Some(algorithm));
        assert_close(&nhwc, &nchw_to_nhwc(&expected, out_dims), epsilon, max_relative, &name);
    }
}

#[test]
fn test_ones_example() {
    let input = TensorView::from_owned(vec![1.0; 16], vec![1, 1, 4, 4]);
    let filter = TensorView::from_owned(vec![1.0; 9], vec![1, 1, 3, 3]);
    for algorithm in [ConvAlgorithm::K3x3S1, ConvAlgorithm::Generic] {
        let config = ConvConfig::default().with_algorithm(algorithm);
        let mut out = Vec::new();
        let y = conv2d(&input, &filter, None, &config, &mut out).unwrap();
        assert_eq!(&y.shape[..], &[1, 1, 2, 2]);
        assert_eq!(&y.data[..], &[9.0; 4]);
    }
}

#[test]
fn test_generic_matches_reference() {
    let config = ConvConfig::default()
        .with_strides([2, 1])
        .with_dilations([2, 2])
        .with_padding(Padding::Auto(PaddingType::Same));
    Case::new(FeatureDims::new(2, 3, 12, 15), 4, [5, 5], config).check(ConvAlgorithm::Generic, 1e-4, 1e-5);
}

#[test]
fn test_k3x3s1_matches_reference() {
    let config = ConvConfig::default().with_padding(Padding::Auto(PaddingType::Same));
    Case::new(FeatureDims::new(2, 3, 11, 13), 5, [3, 3], config).check(ConvAlgorithm::K3x3S1, 1e-4, 1e-5);

    let valid = ConvConfig::default();
    Case::new(FeatureDims::new(1, 4, 9, 10), 3, [3, 3], valid).check(ConvAlgorithm::K3x3S1, 1e-4, 1e-5);
}

#[test]
fn test_k3x3s2_matches_reference() {
    let config = ConvConfig::default()
        .with_strides([2, 2])
        .with_padding(Padding::Auto(PaddingType::Same));
    Case::new(FeatureDims::new(1, 16, 13, 10), 16, [3, 3], config).check(ConvAlgorithm::K3x3S2, 1e-4, 1e-5);
}

#[test]
fn test_k1x1s1_matches_reference() {
    let config = ConvConfig::default().with_padding(Padding::Explicit { h: 2, w: 1 });
    Case::new(FeatureDims::new(2, 16, 6, 7), 12, [1, 1], config).check(ConvAlgorithm::K1x1S1, 1e-4, 1e-5);
}

#[test]
fn test_winograd_matches_reference() {
    let config = ConvConfig::default().with_padding(Padding::Auto(PaddingType::Same));
    Case::new(FeatureDims::new(2, 8, 14, 17), 16, [3, 3], config).check(ConvAlgorithm::Winograd, 1e-3, 1e-3);

    let valid = ConvConfig::default();
    Case::new(FeatureDims::new(1, 12, 8, 8), 8, [3, 3], valid).check(ConvAlgorithm::Winograd, 1e-3, 1e-3);
}

#[test]
fn test_forced_fallback_agrees_with_fast_path() {
    let base = ConvConfig::default().with_padding(Padding::Auto(PaddingType::Same));
    let case = Case::new(FeatureDims::new(1, 8, 10, 10), 8, [3, 3], base);
    let (fast, used) = case.run(Layout::Nchw, None);
    assert_eq!(used, Some(ConvAlgorithm::Winograd));

    let generic = Case::new(case.input, 8, [3, 3], base.with_algorithm(ConvAlgorithm::Generic));
    let (slow, used) = generic.run(Layout::Nchw, None);
    assert_eq!(used, Some(ConvAlgorithm::Generic));
    assert_close(&fast, &slow, 1e-3, 1e-3, "winograd vs generic");
}

#[test]
fn test_ceil_rounding_reads_implicit_padding() {
    let config = ConvConfig::default()
        .with_strides([2, 2])
        .with_padding(Padding::Explicit { h: 0, w: 0 })
        .with_round_type(RoundType::Ceil);
    let case = Case::new(FeatureDims::new(1, 2, 8, 8), 3, [3, 3], config);
    let (expected, dims) = case.reference(None);
    assert_eq!((dims.height, dims.width), (4, 4));
    let (actual, used) = case.run(Layout::Nchw, None);
    assert_eq!(used, Some(ConvAlgorithm::K3x3S2));
    assert_close(&actual, &expected, 1e-4, 1e-5, "ceil");
}

#[test]
fn test_bias_and_activation() {
    let bias = [0.25, -0.5, 1.0, 0.0];
    for activation in [
        Activation::Relu,
        Activation::ReluX { max: 0.3 },
        Activation::LeakyRelu { alpha: 0.1 },
        Activation::Sigmoid,
        Activation::Tanh,
    ] {
        let config = ConvConfig::default()
            .with_padding(Padding::Auto(PaddingType::Same))
            .with_activation(activation);
        let case = Case::new(FeatureDims::new(1, 3, 6, 6), 4, [3, 3], config);
        let (expected, dims) = case.reference(Some(&bias));
        let (nchw, _) = case.run(Layout::Nchw, Some(&bias));
        assert_close(&nchw, &expected, 1e-4, 1e-5, &format!("{:?}", activation));
        let (nhwc, _) = case.run(Layout::Nhwc, Some(&bias));
        assert_close(&nhwc, &nchw_to_nhwc(&expected, dims), 1e-4, 1e-5, &format!("{:?} nhwc", activation));
    }
}

#[test]
fn test_sequential_and_rayon_are_identical() {
    for (kernel, strides, channels) in [([3, 3], [1, 1], 8), ([3, 3], [1, 1], 3), ([3, 3], [2, 2], 4), ([1, 1], [1, 1], 4), ([2, 3], [1, 2], 2)] {
        let base = ConvConfig::default()
            .with_strides(strides)
            .with_padding(Padding::Auto(PaddingType::Same));
        let seq = Case::new(FeatureDims::new(2, channels, 9, 11), 8, kernel, base.with_parallelism(Parallelism::Sequential));
        let par = Case::new(FeatureDims::new(2, channels, 9, 11), 8, kernel, base.with_parallelism(Parallelism::Rayon));
        for layout in [Layout::Nchw, Layout::Nhwc] {
            assert_eq!(seq.run(layout, None), par.run(layout, None));
        }
    }
}

#[test]
fn test_winograd_filter_is_transformed_once() {
    init_logger();
    let dims = FeatureDims::new(1, 8, 12, 12);
    let input = TensorView::from_owned(pattern(dims.numel(), 7, 0.1), dims.shape(Layout::Nchw));
    let filter = TensorView::from_owned(pattern(8 * 8 * 9, 9, 0.05), vec![8, 8, 3, 3]);
    let mut conv = Conv2d::new(ConvConfig::default().with_padding(Padding::Auto(PaddingType::Same)));

    let mut first = Vec::new();
    conv.forward(&input, &filter, None, &mut first).unwrap();
    let mut second = Vec::new();
    conv.forward(&input, &filter, None, &mut second).unwrap();
    assert_eq!(conv.last_algorithm(), Some(ConvAlgorithm::Winograd));
    assert_eq!(conv.filter_transform_count(), 1);
    assert_eq!(first, second);

    // a different filter must not reuse the cached transform
    let doubled: Vec<f32> = filter.data.iter().map(|v| v * 2.0).collect();
    let doubled = TensorView::from_owned(doubled, vec![8, 8, 3, 3]);
    let mut third = Vec::new();
    conv.forward(&input, &doubled, None, &mut third).unwrap();
    assert_eq!(conv.filter_transform_count(), 2);
    let expected: Vec<f32> = first.iter().map(|v| v * 2.0).collect();
    assert_close(&third, &expected, 1e-4, 1e-5, "doubled filter");

    conv.invalidate_filter_cache();
    conv.forward(&input, &doubled, None, &mut third).unwrap();
    assert_eq!(conv.filter_transform_count(), 3);
}

#[test]
fn test_scratch_never_shrinks() {
    let config = ConvConfig::default().with_padding(Padding::Auto(PaddingType::Same));
    let mut conv = Conv2d::new(config);
    let filter = TensorView::from_owned(pattern(8 * 8 * 9, 9, 0.05), vec![8, 8, 3, 3]);
    let mut out = Vec::new();

    let big = FeatureDims::new(1, 8, 20, 20);
    let input = TensorView::from_owned(pattern(big.numel(), 7, 0.1), big.shape(Layout::Nchw));
    conv.forward(&input, &filter, None, &mut out).unwrap();
    let capacity = conv.scratch().capacity_bytes();
    assert!(capacity > 0);

    let small = FeatureDims::new(1, 8, 6, 6);
    let input = TensorView::from_owned(pattern(small.numel(), 7, 0.1), small.shape(Layout::Nchw));
    conv.forward(&input, &filter, None, &mut out).unwrap();
    assert_eq!(conv.scratch().capacity_bytes(), capacity);
    assert!(conv.scratch().cursor_bytes() < capacity);
    assert_eq!(out.len(), small.numel());
}

#[test]
fn test_invalid_inputs_are_rejected() {
    let input = TensorView::from_owned(vec![1.0; 16], vec![1, 1, 4, 4]);
    let mut out = Vec::new();

    let flat = TensorView::from_owned(vec![1.0; 9], vec![1, 9]);
    let err = conv2d(&input, &flat, None, &ConvConfig::default(), &mut out).unwrap_err();
    assert!(matches!(err, KernelError::InvalidConfig(_)));

    let filter = TensorView::from_owned(vec![1.0; 9], vec![1, 1, 3, 3]);
    let config = ConvConfig::default().with_dilations([1, 0]);
    let err = conv2d(&input, &filter, None, &config, &mut out).unwrap_err();
    assert!(matches!(err, KernelError::InvalidConfig(_)));

    let config = ConvConfig::default().with_strides([2, 2]).with_algorithm(ConvAlgorithm::K1x1S1);
    let err = conv2d(&input, &filter, None, &config, &mut out).unwrap_err();
    assert!(matches!(err, KernelError::InvalidConfig(_)));
}

#[test]
fn test_resize_layouts_agree() {
    init_logger();
    let dims = FeatureDims::new(2, 5, 7, 9);
    let nchw = pattern(dims.numel(), 13, 0.5);
    let nhwc = nchw_to_nhwc(&nchw, dims);
    for align_corners in [false, true] {
        for size in [[14, 18], [3, 4], [1, 1], [7, 20]] {
            let size = [size[0] as i64, size[1] as i64];
            let a_in = TensorView::from_owned(nchw.clone(), dims.shape(Layout::Nchw));
            let b_in = TensorView::from_owned(nhwc.clone(), dims.shape(Layout::Nhwc)).with_layout(Layout::Nhwc);
            let (mut a, mut b) = (Vec::new(), Vec::new());
            resize_bilinear(&a_in, &size, align_corners, Parallelism::Rayon, &mut a).unwrap();
            resize_bilinear(&b_in, &size, align_corners, Parallelism::Sequential, &mut b).unwrap();
            let out_dims = FeatureDims::new(2, 5, size[0] as usize, size[1] as usize);
            assert_close(&b, &nchw_to_nhwc(&a, out_dims), 1e-6, 1e-6, "resize nhwc");
        }
    }
}

#[test]
fn test_resize_u8_tracks_f32() {
    let dims = FeatureDims::new(1, 3, 5, 6);
    let bytes: Vec<u8> = (0..dims.numel()).map(|i| ((i * 37) % 256) as u8).collect();
    let floats: Vec<f32> = bytes.iter().map(|&v| v as f32).collect();
    let resizer = ResizeBilinear::new(&[9, 4], true).unwrap();

    let q_in = TensorView::from_owned(bytes, dims.shape(Layout::Nhwc)).with_layout(Layout::Nhwc);
    let f_in = TensorView::from_owned(floats, dims.shape(Layout::Nhwc)).with_layout(Layout::Nhwc);
    let (mut q, mut f) = (Vec::new(), Vec::new());
    resizer.forward(&q_in, &mut q).unwrap();
    resizer.forward(&f_in, &mut f).unwrap();
    assert_eq!(q.len(), f.len());
    for (a, b) in q.iter().zip(&f) {
        assert!((*a as f32 - b).abs() <= 0.5 + 1e-3, "{} vs {}", a, b);
    }
}

#[test]
fn test_align_corners_single_output() {
    let input = TensorView::from_owned(vec![1.0f32, 2.0, 3.0, 4.0], vec![1, 1, 2, 2]);
    let mut out = Vec::new();
    let y = resize_bilinear(&input, &[1, 1], true, Parallelism::Sequential, &mut out).unwrap();
    assert_eq!(&y.data[..], &[1.0]);
}
