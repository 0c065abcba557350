//! Function approximators for parameterized PDE solutions.
//!
//! The solver is generic over any differentiable mapping from a coordinate
//! batch to an output batch; [`SolutionNet`] is that seam. [`Fcnn`] is the
//! bundled implementation: a fully connected network over a private
//! [`VarMap`], defaulting to the 3 -> 32 -> 1 tanh architecture used when the
//! caller supplies no networks of their own.

use candle_core::{DType, Device, Tensor, Var};
use candle_nn::{Linear, Module, VarBuilder, VarMap};
use serde::{Deserialize, Serialize};

use crate::error::{PinnError, PinnResult};

/// Activation applied between hidden layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// Hyperbolic tangent (default; smooth derivatives suit residual losses).
    Tanh,
    /// Logistic sigmoid.
    Sigmoid,
    /// Rectified linear unit.
    Relu,
    /// Sigmoid-weighted linear unit.
    Silu,
}

impl Default for Activation {
    fn default() -> Self {
        Self::Tanh
    }
}

impl Activation {
    /// Apply the activation elementwise.
    pub fn apply(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Self::Tanh => xs.tanh(),
            Self::Sigmoid => candle_nn::ops::sigmoid(xs),
            Self::Relu => xs.relu(),
            Self::Silu => candle_nn::ops::silu(xs),
        }
    }
}

/// A trainable approximator usable as one dependent variable of a PDE system.
///
/// Implementors expose their parameters as [`Var`] handles (shared with the
/// optimizer) and support an independent structural copy for best-model
/// snapshots: the copy must not observe any later parameter update.
pub trait SolutionNet: Send + Sync {
    /// Evaluate the network on an `[n, input_dim]` batch.
    fn forward(&self, xs: &Tensor) -> PinnResult<Tensor>;

    /// Trainable parameter handles. Updates through these handles must be
    /// visible to subsequent `forward` calls.
    fn trainable_vars(&self) -> Vec<Var>;

    /// Independent copy with identical architecture and weights.
    fn clone_snapshot(&self) -> PinnResult<Box<dyn SolutionNet>>;

    /// Number of input coordinates consumed per point.
    fn input_dim(&self) -> usize;

    /// Number of output values produced per point.
    fn output_dim(&self) -> usize;
}

/// Configuration for [`Fcnn`].
///
/// # Example
///
/// ```ignore
/// use spherical_pinn_rs::nets::{Activation, FcnnConfig};
///
/// let config = FcnnConfig::default()
///     .with_input_units(1)
///     .with_output_units(9)
///     .with_hidden_units(64);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcnnConfig {
    /// Coordinates consumed per point.
    pub n_input_units: usize,
    /// Width of each hidden layer.
    pub n_hidden_units: usize,
    /// Number of hidden layers; zero collapses to a single affine map.
    pub n_hidden_layers: usize,
    /// Values produced per point.
    pub n_output_units: usize,
    /// Activation between hidden layers.
    pub activation: Activation,
}

impl Default for FcnnConfig {
    fn default() -> Self {
        Self {
            n_input_units: 3,
            n_hidden_units: 32,
            n_hidden_layers: 1,
            n_output_units: 1,
            activation: Activation::Tanh,
        }
    }
}

impl FcnnConfig {
    /// Builder: set the number of input coordinates.
    #[must_use]
    pub const fn with_input_units(mut self, n: usize) -> Self {
        self.n_input_units = n;
        self
    }

    /// Builder: set the hidden layer width.
    #[must_use]
    pub const fn with_hidden_units(mut self, n: usize) -> Self {
        self.n_hidden_units = n;
        self
    }

    /// Builder: set the number of hidden layers.
    #[must_use]
    pub const fn with_hidden_layers(mut self, n: usize) -> Self {
        self.n_hidden_layers = n;
        self
    }

    /// Builder: set the number of outputs.
    #[must_use]
    pub const fn with_output_units(mut self, n: usize) -> Self {
        self.n_output_units = n;
        self
    }

    /// Builder: set the hidden activation.
    #[must_use]
    pub const fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }
}

/// Fully connected network over a private [`VarMap`].
pub struct Fcnn {
    layers: Vec<Linear>,
    config: FcnnConfig,
    var_map: VarMap,
    dtype: DType,
    device: Device,
}

impl Fcnn {
    /// Create a new network with random initialization.
    ///
    /// # Errors
    ///
    /// Returns an error if any layer cannot be allocated on `device`.
    pub fn new(config: &FcnnConfig, dtype: DType, device: &Device) -> PinnResult<Self> {
        if config.n_input_units == 0 || config.n_output_units == 0 {
            return Err(PinnError::invalid_config(
                "Fcnn requires at least one input and one output unit",
            ));
        }
        let var_map = VarMap::new();
        let vb = VarBuilder::from_varmap(&var_map, dtype, device);

        let mut layers = Vec::with_capacity(config.n_hidden_layers + 1);
        if config.n_hidden_layers == 0 {
            layers.push(candle_nn::linear(
                config.n_input_units,
                config.n_output_units,
                vb.pp("fc0"),
            )?);
        } else {
            layers.push(candle_nn::linear(
                config.n_input_units,
                config.n_hidden_units,
                vb.pp("fc0"),
            )?);
            for i in 1..config.n_hidden_layers {
                layers.push(candle_nn::linear(
                    config.n_hidden_units,
                    config.n_hidden_units,
                    vb.pp(format!("fc{}", i)),
                )?);
            }
            layers.push(candle_nn::linear(
                config.n_hidden_units,
                config.n_output_units,
                vb.pp(format!("fc{}", config.n_hidden_layers)),
            )?);
        }

        Ok(Self {
            layers,
            config: config.clone(),
            var_map,
            dtype,
            device: device.clone(),
        })
    }

    /// Evaluate the network on an `[n, n_input_units]` batch.
    pub fn forward(&self, xs: &Tensor) -> PinnResult<Tensor> {
        let last = self.layers.len() - 1;
        let mut hidden = xs.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            hidden = layer.forward(&hidden)?;
            if i < last {
                hidden = self.config.activation.apply(&hidden)?;
            }
        }
        Ok(hidden)
    }

    /// Save the weights in safetensors format.
    pub fn save(&self, path: &std::path::Path) -> PinnResult<()> {
        self.var_map.save(path)?;
        Ok(())
    }

    /// Create a network and load weights saved by [`Fcnn::save`].
    ///
    /// The configuration must match the one the weights were saved with.
    pub fn load(
        config: &FcnnConfig,
        dtype: DType,
        device: &Device,
        path: &std::path::Path,
    ) -> PinnResult<Self> {
        let mut net = Self::new(config, dtype, device)?;
        net.var_map.load(path)?;
        Ok(net)
    }

    /// Network configuration.
    #[must_use]
    pub const fn config(&self) -> &FcnnConfig {
        &self.config
    }
}

impl SolutionNet for Fcnn {
    fn forward(&self, xs: &Tensor) -> PinnResult<Tensor> {
        Fcnn::forward(self, xs)
    }

    fn trainable_vars(&self) -> Vec<Var> {
        self.var_map.all_vars()
    }

    fn clone_snapshot(&self) -> PinnResult<Box<dyn SolutionNet>> {
        let clone = Fcnn::new(&self.config, self.dtype, &self.device)?;
        {
            let src = self.var_map.data().lock().unwrap();
            let dst = clone.var_map.data().lock().unwrap();
            for (name, var) in src.iter() {
                if let Some(dst_var) = dst.get(name) {
                    dst_var.set(var.as_tensor())?;
                }
            }
        }
        Ok(Box::new(clone))
    }

    fn input_dim(&self) -> usize {
        self.config.n_input_units
    }

    fn output_dim(&self) -> usize {
        self.config.n_output_units
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_out(net: &Fcnn) {
        for var in net.var_map.all_vars() {
            let zeros = var.zeros_like().unwrap();
            var.set(&zeros).unwrap();
        }
    }

    #[test]
    fn test_forward_shape() {
        let net = Fcnn::new(&FcnnConfig::default(), DType::F32, &Device::Cpu).unwrap();
        let xs = Tensor::zeros((5, 3), DType::F32, &Device::Cpu).unwrap();
        let ys = net.forward(&xs).unwrap();
        assert_eq!(ys.dims(), &[5, 1]);
    }

    #[test]
    fn test_no_hidden_layers_is_affine() {
        let config = FcnnConfig::default().with_hidden_layers(0);
        let net = Fcnn::new(&config, DType::F32, &Device::Cpu).unwrap();
        assert_eq!(net.layers.len(), 1);
        let xs = Tensor::ones((2, 3), DType::F32, &Device::Cpu).unwrap();
        assert_eq!(net.forward(&xs).unwrap().dims(), &[2, 1]);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let net = Fcnn::new(&FcnnConfig::default(), DType::F32, &Device::Cpu).unwrap();
        let xs = Tensor::rand(-1.0f32, 1.0f32, (4, 3), &Device::Cpu).unwrap();
        let before = net.forward(&xs).unwrap();

        let snapshot = net.clone_snapshot().unwrap();
        zero_out(&net);

        let zeroed = net.forward(&xs).unwrap().abs().unwrap();
        assert!(zeroed.sum_all().unwrap().to_scalar::<f32>().unwrap() < 1e-7);

        let kept = snapshot.forward(&xs).unwrap();
        let diff = (kept - &before)
            .unwrap()
            .abs()
            .unwrap()
            .sum_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(diff < 1e-6, "snapshot drifted by {diff}");
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.safetensors");

        let config = FcnnConfig::default().with_hidden_units(8);
        let net = Fcnn::new(&config, DType::F32, &Device::Cpu).unwrap();
        net.save(&path).unwrap();

        let loaded = Fcnn::load(&config, DType::F32, &Device::Cpu, &path).unwrap();
        let xs = Tensor::rand(-1.0f32, 1.0f32, (3, 3), &Device::Cpu).unwrap();
        let a = net.forward(&xs).unwrap();
        let b = loaded.forward(&xs).unwrap();
        let diff = (a - b)
            .unwrap()
            .abs()
            .unwrap()
            .sum_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_config_builders() {
        let config = FcnnConfig::default()
            .with_input_units(1)
            .with_output_units(9)
            .with_hidden_units(64)
            .with_hidden_layers(2)
            .with_activation(Activation::Silu);
        assert_eq!(config.n_input_units, 1);
        assert_eq!(config.n_output_units, 9);
        assert_eq!(config.n_hidden_units, 64);
        assert_eq!(config.n_hidden_layers, 2);
        assert_eq!(config.activation, Activation::Silu);
    }

    #[test]
    fn test_zero_width_rejected() {
        let config = FcnnConfig::default().with_input_units(0);
        assert!(Fcnn::new(&config, DType::F32, &Device::Cpu).is_err());
    }
}
