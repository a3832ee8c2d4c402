//! Layer topology descriptor.
//!
//! [`LayerConfig`] carries the recognised fields of every layer kind (type
//! tag, input shape, kernel/window sizes, stride, padding, bias flag). It is
//! what persistence stores and what [`LayerConfig::build`] turns back into a
//! [`Layer`].

use crate::error::NeuraGraphError;
use crate::nn::layer::{Layer, LayerShapes};
use crate::nn::layers::{
    ActivationFn, ActivationLayer, AddLayer, AveragePoolingLayer, ConcatLayer, ConvolutionLayer,
    DropoutLayer, FullyConnectedLayer, GlobalAveragePoolingLayer, InputLayer,
    L2NormalizationLayer, MaxPoolingLayer, Padding, PowerLayer, QuantizedFullyConnectedLayer,
    SliceLayer,
};
use crate::types::{FloatT, Shape3d};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerConfig {
    Input {
        shape: Shape3d,
    },
    FullyConnected {
        in_size: usize,
        out_size: usize,
        has_bias: bool,
    },
    QuantizedFullyConnected {
        in_size: usize,
        out_size: usize,
        has_bias: bool,
    },
    Convolution {
        input: Shape3d,
        kernel_width: usize,
        kernel_height: usize,
        out_channels: usize,
        stride: usize,
        padding: Padding,
        has_bias: bool,
    },
    MaxPooling {
        input: Shape3d,
        pool_size: usize,
        stride: usize,
    },
    AveragePooling {
        input: Shape3d,
        pool_size: usize,
        stride: usize,
    },
    GlobalAveragePooling {
        input: Shape3d,
    },
    Activation {
        shape: Shape3d,
        function: ActivationFn,
    },
    Dropout {
        shape: Shape3d,
        rate: FloatT,
    },
    Add {
        num_inputs: usize,
        shape: Shape3d,
    },
    Concat {
        inputs: Vec<Shape3d>,
    },
    Slice {
        input: Shape3d,
        num_outputs: usize,
    },
    Power {
        shape: Shape3d,
        factor: FloatT,
        scale: FloatT,
    },
    L2Normalization {
        shape: Shape3d,
        epsilon: FloatT,
    },
}

impl LayerConfig {
    pub fn input(shape: Shape3d) -> Self {
        LayerConfig::Input { shape }
    }

    pub fn fully_connected(in_size: usize, out_size: usize) -> Self {
        LayerConfig::FullyConnected {
            in_size,
            out_size,
            has_bias: true,
        }
    }

    pub fn quantized_fully_connected(in_size: usize, out_size: usize) -> Self {
        LayerConfig::QuantizedFullyConnected {
            in_size,
            out_size,
            has_bias: true,
        }
    }

    /// Square-kernel convolution with stride 1 and valid padding.
    pub fn convolution(input: Shape3d, kernel_size: usize, out_channels: usize) -> Self {
        LayerConfig::Convolution {
            input,
            kernel_width: kernel_size,
            kernel_height: kernel_size,
            out_channels,
            stride: 1,
            padding: Padding::Valid,
            has_bias: true,
        }
    }

    /// Non-overlapping max pooling (`stride == pool_size`).
    pub fn max_pooling(input: Shape3d, pool_size: usize) -> Self {
        LayerConfig::MaxPooling {
            input,
            pool_size,
            stride: pool_size,
        }
    }

    pub fn average_pooling(input: Shape3d, pool_size: usize) -> Self {
        LayerConfig::AveragePooling {
            input,
            pool_size,
            stride: pool_size,
        }
    }

    pub fn activation(shape: Shape3d, function: ActivationFn) -> Self {
        LayerConfig::Activation { shape, function }
    }

    pub fn relu(shape: Shape3d) -> Self {
        LayerConfig::activation(shape, ActivationFn::Relu)
    }

    pub fn tanh(shape: Shape3d) -> Self {
        LayerConfig::activation(shape, ActivationFn::Tanh)
    }

    pub fn sigmoid(shape: Shape3d) -> Self {
        LayerConfig::activation(shape, ActivationFn::Sigmoid)
    }

    pub fn softmax(shape: Shape3d) -> Self {
        LayerConfig::activation(shape, ActivationFn::Softmax)
    }

    pub fn dropout(shape: Shape3d, rate: FloatT) -> Self {
        LayerConfig::Dropout { shape, rate }
    }

    pub fn add(num_inputs: usize, shape: Shape3d) -> Self {
        LayerConfig::Add { num_inputs, shape }
    }

    pub fn concat(inputs: Vec<Shape3d>) -> Self {
        LayerConfig::Concat { inputs }
    }

    pub fn slice(input: Shape3d, num_outputs: usize) -> Self {
        LayerConfig::Slice { input, num_outputs }
    }

    pub fn power(shape: Shape3d, factor: FloatT, scale: FloatT) -> Self {
        LayerConfig::Power {
            shape,
            factor,
            scale,
        }
    }

    pub fn l2_normalization(shape: Shape3d) -> Self {
        LayerConfig::L2Normalization {
            shape,
            epsilon: 1e-10,
        }
    }

    /// The descriptor's `type` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            LayerConfig::Input { .. } => InputLayer::TYPE,
            LayerConfig::FullyConnected { .. } => FullyConnectedLayer::TYPE,
            LayerConfig::QuantizedFullyConnected { .. } => QuantizedFullyConnectedLayer::TYPE,
            LayerConfig::Convolution { .. } => ConvolutionLayer::TYPE,
            LayerConfig::MaxPooling { .. } => MaxPoolingLayer::TYPE,
            LayerConfig::AveragePooling { .. } => AveragePoolingLayer::TYPE,
            LayerConfig::GlobalAveragePooling { .. } => GlobalAveragePoolingLayer::TYPE,
            LayerConfig::Activation { .. } => ActivationLayer::TYPE,
            LayerConfig::Dropout { .. } => DropoutLayer::TYPE,
            LayerConfig::Add { .. } => AddLayer::TYPE,
            LayerConfig::Concat { .. } => ConcatLayer::TYPE,
            LayerConfig::Slice { .. } => SliceLayer::TYPE,
            LayerConfig::Power { .. } => PowerLayer::TYPE,
            LayerConfig::L2Normalization { .. } => L2NormalizationLayer::TYPE,
        }
    }

    /// Declared input and output shapes for this configuration.
    ///
    /// Pure function of the configuration: no parameter is allocated.
    ///
    /// # Errors
    /// `InvalidLayerConfig` if the configuration is internally inconsistent
    /// (zero sizes, kernel larger than input, stride not tiling the input
    /// under valid padding, ...).
    pub fn shape_for(&self) -> Result<LayerShapes, NeuraGraphError> {
        match self {
            LayerConfig::Input { shape } => InputLayer::shape_for(*shape),
            LayerConfig::FullyConnected {
                in_size, out_size, ..
            } => FullyConnectedLayer::shape_for(*in_size, *out_size),
            LayerConfig::QuantizedFullyConnected {
                in_size, out_size, ..
            } => QuantizedFullyConnectedLayer::shape_for(*in_size, *out_size),
            LayerConfig::Convolution {
                input,
                kernel_width,
                kernel_height,
                out_channels,
                stride,
                padding,
                ..
            } => ConvolutionLayer::geometry(
                *input,
                *kernel_width,
                *kernel_height,
                *out_channels,
                *stride,
                *padding,
            )
            .map(|g| g.shapes()),
            LayerConfig::MaxPooling {
                input,
                pool_size,
                stride,
            } => MaxPoolingLayer::shape_for(*input, *pool_size, *stride),
            LayerConfig::AveragePooling {
                input,
                pool_size,
                stride,
            } => AveragePoolingLayer::shape_for(*input, *pool_size, *stride),
            LayerConfig::GlobalAveragePooling { input } => {
                GlobalAveragePoolingLayer::shape_for(*input)
            }
            LayerConfig::Activation { shape, function } => {
                ActivationLayer::shape_for(*shape, *function)
            }
            LayerConfig::Dropout { shape, rate } => DropoutLayer::shape_for(*shape, *rate),
            LayerConfig::Add { num_inputs, shape } => AddLayer::shape_for(*num_inputs, *shape),
            LayerConfig::Concat { inputs } => ConcatLayer::shape_for(inputs),
            LayerConfig::Slice { input, num_outputs } => {
                SliceLayer::shape_for(*input, *num_outputs)
            }
            LayerConfig::Power {
                shape,
                factor,
                scale,
            } => PowerLayer::shape_for(*shape, *factor, *scale),
            LayerConfig::L2Normalization { shape, epsilon } => {
                L2NormalizationLayer::shape_for(*shape, *epsilon)
            }
        }
    }

    /// Instantiates the layer, parameters zeroed.
    pub fn build(&self) -> Result<Layer, NeuraGraphError> {
        let layer = match self {
            LayerConfig::Input { shape } => Layer::Input(InputLayer::new(*shape)?),
            LayerConfig::FullyConnected {
                in_size,
                out_size,
                has_bias,
            } => Layer::FullyConnected(FullyConnectedLayer::new(*in_size, *out_size, *has_bias)?),
            LayerConfig::QuantizedFullyConnected {
                in_size,
                out_size,
                has_bias,
            } => Layer::QuantizedFullyConnected(QuantizedFullyConnectedLayer::new(
                *in_size, *out_size, *has_bias,
            )?),
            LayerConfig::Convolution {
                input,
                kernel_width,
                kernel_height,
                out_channels,
                stride,
                padding,
                has_bias,
            } => Layer::Convolution(ConvolutionLayer::new(
                ConvolutionLayer::geometry(
                    *input,
                    *kernel_width,
                    *kernel_height,
                    *out_channels,
                    *stride,
                    *padding,
                )?,
                *has_bias,
            )),
            LayerConfig::MaxPooling {
                input,
                pool_size,
                stride,
            } => Layer::MaxPooling(MaxPoolingLayer::new(*input, *pool_size, *stride)?),
            LayerConfig::AveragePooling {
                input,
                pool_size,
                stride,
            } => Layer::AveragePooling(AveragePoolingLayer::new(*input, *pool_size, *stride)?),
            LayerConfig::GlobalAveragePooling { input } => {
                Layer::GlobalAveragePooling(GlobalAveragePoolingLayer::new(*input)?)
            }
            LayerConfig::Activation { shape, function } => {
                Layer::Activation(ActivationLayer::new(*shape, *function)?)
            }
            LayerConfig::Dropout { shape, rate } => {
                Layer::Dropout(DropoutLayer::new(*shape, *rate)?)
            }
            LayerConfig::Add { num_inputs, shape } => {
                Layer::Add(AddLayer::new(*num_inputs, *shape)?)
            }
            LayerConfig::Concat { inputs } => Layer::Concat(ConcatLayer::new(inputs)?),
            LayerConfig::Slice { input, num_outputs } => {
                Layer::Slice(SliceLayer::new(*input, *num_outputs)?)
            }
            LayerConfig::Power {
                shape,
                factor,
                scale,
            } => Layer::Power(PowerLayer::new(*shape, *factor, *scale)?),
            LayerConfig::L2Normalization { shape, epsilon } => {
                Layer::L2Normalization(L2NormalizationLayer::new(*shape, *epsilon)?)
            }
        };
        Ok(layer)
    }
}

/// Rejects zero-sized shapes.
pub(crate) fn check_shape(layer_type: &str, what: &str, shape: Shape3d) -> Result<(), NeuraGraphError> {
    if shape.size() == 0 {
        return Err(NeuraGraphError::invalid_layer(
            layer_type,
            format!("{what} shape {shape} has no elements"),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
