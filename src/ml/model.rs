use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig,
        Initializer,
        Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::data::batcher::SatBatch;
use crate::domain::partition::{CHANNELS, IMAGE_SIDE};

// ─── Topology ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvPadding {
    Valid,
    Same,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSpec {
    pub size:   usize,
    pub stride: usize,
}

/// One conv + bias + ReLU stage, optionally followed by max-pooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvStage {
    pub in_channels:  usize,
    pub out_channels: usize,
    pub kernel:       usize,
    pub padding:      ConvPadding,
    pub pool:         Option<PoolSpec>,
}

/// Feature extractor of the SAT-6 classifier, first stage first.
/// Spatial size goes 28 → 26 → 13 → 5 → 5 → 5 → 3.
pub const SAT6_STAGES: [ConvStage; 5] = [
    ConvStage { in_channels: CHANNELS, out_channels: 16, kernel: 3, padding: ConvPadding::Valid, pool: Some(PoolSpec { size: 2, stride: 2 }) },
    ConvStage { in_channels: 16,       out_channels: 48, kernel: 3, padding: ConvPadding::Same,  pool: Some(PoolSpec { size: 3, stride: 3 }) },
    ConvStage { in_channels: 48,       out_channels: 96, kernel: 3, padding: ConvPadding::Same,  pool: None },
    ConvStage { in_channels: 96,       out_channels: 64, kernel: 3, padding: ConvPadding::Same,  pool: None },
    ConvStage { in_channels: 64,       out_channels: 64, kernel: 3, padding: ConvPadding::Same,  pool: Some(PoolSpec { size: 2, stride: 2 }) },
];

/// Padding (before, after) that gives `ceil(input / stride)` outputs.
/// The odd unit goes after, i.e. bottom or right.
pub fn same_padding(input: usize, kernel: usize, stride: usize) -> (usize, usize) {
    let output = input.div_ceil(stride);
    let total  = ((output.saturating_sub(1)) * stride + kernel).saturating_sub(input);
    let before = total / 2;
    (before, total - before)
}

/// Side length of the feature map after running `stages` on a square input.
pub fn feature_side(input: usize, stages: &[ConvStage]) -> usize {
    stages.iter().fold(input, |side, stage| {
        let side = match stage.padding {
            ConvPadding::Valid => side + 1 - stage.kernel,
            ConvPadding::Same  => side,
        };
        match stage.pool {
            Some(pool) => side.div_ceil(pool.stride),
            None       => side,
        }
    })
}

/// Pad the two spatial axes of an NCHW tensor with zeros.
fn zero_pad<B: Backend>(
    x:      Tensor<B, 4>,
    height: (usize, usize),
    width:  (usize, usize),
) -> Tensor<B, 4> {
    let device = x.device();
    let [n, c, h, w] = x.dims();

    let mut x = x;
    if height.0 + height.1 > 0 {
        let mut parts: Vec<Tensor<B, 4>> = Vec::with_capacity(3);
        if height.0 > 0 {
            parts.push(Tensor::zeros([n, c, height.0, w], &device));
        }
        parts.push(x);
        if height.1 > 0 {
            parts.push(Tensor::zeros([n, c, height.1, w], &device));
        }
        x = Tensor::cat(parts, 2);
    }

    let h = h + height.0 + height.1;
    if width.0 + width.1 > 0 {
        let mut parts: Vec<Tensor<B, 4>> = Vec::with_capacity(3);
        if width.0 > 0 {
            parts.push(Tensor::zeros([n, c, h, width.0], &device));
        }
        parts.push(x);
        if width.1 > 0 {
            parts.push(Tensor::zeros([n, c, h, width.1], &device));
        }
        x = Tensor::cat(parts, 3);
    }
    x
}

// ─── Config ───────────────────────────────────────────────────────────────────
// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct Sat6CnnConfig {
    #[config(default = 6)]
    pub num_classes: usize,
    #[config(default = 200)]
    pub hidden:      usize,
    #[config(default = 0.5)]
    pub dropout:     f64,
    #[config(default = 0.1)]
    pub init_std:    f64,
}

impl Sat6CnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Sat6Cnn<B> {
        let stages: Vec<ConvBlock<B>> = SAT6_STAGES
            .iter()
            .map(|stage| self.build_stage(stage, device))
            .collect();

        let side = feature_side(IMAGE_SIDE, &SAT6_STAGES);
        let flat = side * side * SAT6_STAGES[SAT6_STAGES.len() - 1].out_channels;

        let fc1        = self.linear(flat, self.hidden, device);
        let fc2        = self.linear(self.hidden, self.hidden, device);
        let classifier = self.linear(self.hidden, self.num_classes, device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        Sat6Cnn { stages, fc1, fc2, classifier, dropout }
    }

    /// Turn one stage descriptor into layers.
    pub fn build_stage<B: Backend>(&self, stage: &ConvStage, device: &B::Device) -> ConvBlock<B> {
        let padding = match stage.padding {
            ConvPadding::Valid => PaddingConfig2d::Valid,
            ConvPadding::Same  => PaddingConfig2d::Same,
        };
        let conv = Conv2dConfig::new([stage.in_channels, stage.out_channels], [stage.kernel, stage.kernel])
            .with_padding(padding)
            .with_initializer(self.initializer())
            .init(device);
        let pool = stage.pool.map(|p| {
            MaxPool2dConfig::new([p.size, p.size])
                .with_strides([p.stride, p.stride])
                .init()
        });
        let (pool_size, pool_stride) = stage.pool.map_or((0, 0), |p| (p.size, p.stride));
        ConvBlock { conv, pool, pool_size, pool_stride }
    }

    fn linear<B: Backend>(&self, d_in: usize, d_out: usize, device: &B::Device) -> Linear<B> {
        LinearConfig::new(d_in, d_out)
            .with_initializer(self.initializer())
            .init(device)
    }

    fn initializer(&self) -> Initializer {
        Initializer::Normal { mean: 0.0, std: self.init_std }
    }
}

// ─── Layers ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv:        Conv2d<B>,
    pub pool:        Option<MaxPool2d>,
    pub pool_size:   usize,
    pub pool_stride: usize,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.conv.forward(x));
        match &self.pool {
            Some(pool) => {
                let [_, _, h, w] = x.dims();
                // Zero padding acts like -inf here because x is post-ReLU.
                let x = zero_pad(
                    x,
                    same_padding(h, self.pool_size, self.pool_stride),
                    same_padding(w, self.pool_size, self.pool_stride),
                );
                pool.forward(x)
            }
            None => x,
        }
    }
}

#[derive(Module, Debug)]
pub struct Sat6Cnn<B: Backend> {
    pub stages:     Vec<ConvBlock<B>>,
    pub fc1:        Linear<B>,
    pub fc2:        Linear<B>,
    pub classifier: Linear<B>,
    pub dropout:    Dropout,
}

pub struct Sat6Output<B: Backend> {
    /// Unnormalised class scores — shape: [batch, 6]
    pub logits:    Tensor<B, 2>,
    /// Second fully-connected activation — shape: [batch, hidden]
    pub embedding: Tensor<B, 2>,
}

impl<B: Backend> Sat6Cnn<B> {
    /// images: [batch, 4, 28, 28] → logits [batch, 6], embedding [batch, hidden]
    pub fn forward(&self, images: Tensor<B, 4>) -> Sat6Output<B> {
        let mut x = images;
        for stage in &self.stages {
            x = stage.forward(x);
        }

        let [batch, c, h, w] = x.dims();
        let x = x.reshape([batch, c * h * w]);

        let x         = relu(self.fc1.forward(self.dropout.forward(x)));
        let embedding = relu(self.fc2.forward(self.dropout.forward(x)));
        let logits    = self.classifier.forward(embedding.clone());

        Sat6Output { logits, embedding }
    }

    /// Mean softmax cross-entropy over the batch.
    pub fn forward_loss(&self, batch: SatBatch<B>) -> (Tensor<B, 1>, Sat6Output<B>) {
        let output = self.forward(batch.images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.logits.device())
            .forward(output.logits.clone(), batch.targets);
        (loss, output)
    }
}

/// Number of rows whose arg-max matches the target class.
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns shape [batch, 1]
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    correct as usize
}

/// Fraction of correct predictions, 0 for an empty batch.
pub fn accuracy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> f64 {
    let total = targets.dims()[0];
    if total == 0 {
        return 0.0;
    }
    count_correct(logits, targets) as f64 / total as f64
}
