//! Gradient accumulation and parameter updates.
//!
//! The epoch loop calls [`Optimizer::backward`] once per batch and
//! [`Optimizer::step`] once per epoch, so gradients must accumulate across
//! backward calls instead of being applied immediately. The accumulator is
//! cleared by [`Optimizer::zero_grad`] after the step.

use candle_core::{Tensor, Var};
use serde::{Deserialize, Serialize};

use crate::error::PinnResult;

/// Accumulating optimizer over a fixed set of trainable variables.
pub trait Optimizer: Send {
    /// Backpropagate `loss` and add the resulting gradients to the
    /// accumulator. Variables the loss does not reach are left untouched.
    fn backward(&mut self, loss: &Tensor) -> PinnResult<()>;

    /// Apply one update from the accumulated gradients. Variables with no
    /// accumulated gradient are skipped. The accumulator is kept; call
    /// [`Optimizer::zero_grad`] to clear it.
    fn step(&mut self) -> PinnResult<()>;

    /// Clear all accumulated gradients.
    fn zero_grad(&mut self);

    /// Current learning rate.
    fn learning_rate(&self) -> f64;

    /// Replace the learning rate, e.g. from a schedule.
    fn set_learning_rate(&mut self, lr: f64);
}

/// Hyperparameters for [`Adam`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdamConfig {
    /// Step size.
    pub learning_rate: f64,
    /// Exponential decay rate for the first moment estimates.
    pub beta1: f64,
    /// Exponential decay rate for the second moment estimates.
    pub beta2: f64,
    /// Denominator fuzz term.
    pub eps: f64,
    /// Decoupled weight decay; zero disables it.
    pub weight_decay: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 0.0,
        }
    }
}

impl AdamConfig {
    /// Set the learning rate.
    #[must_use]
    pub const fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the moment decay rates.
    #[must_use]
    pub const fn with_betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    /// Set the decoupled weight decay.
    #[must_use]
    pub const fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }
}

/// Adam with decoupled weight decay and cross-batch gradient accumulation.
///
/// Moment estimates and the gradient accumulator are kept per variable,
/// indexed by position in the variable list given at construction.
pub struct Adam {
    vars: Vec<Var>,
    config: AdamConfig,
    accum: Vec<Option<Tensor>>,
    m: Vec<Option<Tensor>>,
    v: Vec<Option<Tensor>>,
    t: i32,
}

impl Adam {
    /// Optimize `vars` under `config`.
    #[must_use]
    pub fn new(vars: Vec<Var>, config: AdamConfig) -> Self {
        let n = vars.len();
        Self {
            vars,
            config,
            accum: vec![None; n],
            m: vec![None; n],
            v: vec![None; n],
            t: 0,
        }
    }

    /// The variables this optimizer updates.
    #[must_use]
    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// The hyperparameters in effect.
    #[must_use]
    pub const fn config(&self) -> &AdamConfig {
        &self.config
    }
}

impl Optimizer for Adam {
    fn backward(&mut self, loss: &Tensor) -> PinnResult<()> {
        let grads = loss.backward()?;
        for (i, var) in self.vars.iter().enumerate() {
            if let Some(grad) = grads.get(var) {
                self.accum[i] = Some(match self.accum[i].take() {
                    Some(prev) => (prev + grad)?,
                    None => grad.clone(),
                });
            }
        }
        Ok(())
    }

    fn step(&mut self) -> PinnResult<()> {
        self.t += 1;
        let bc1 = 1.0 - self.config.beta1.powi(self.t);
        let bc2 = 1.0 - self.config.beta2.powi(self.t);

        for (i, var) in self.vars.iter().enumerate() {
            let Some(grad) = self.accum[i].as_ref() else {
                continue;
            };

            let m_prev = match self.m[i].take() {
                Some(m) => m,
                None => grad.zeros_like()?,
            };
            let v_prev = match self.v[i].take() {
                Some(v) => v,
                None => grad.zeros_like()?,
            };

            let m_new = ((m_prev * self.config.beta1)? + (grad * (1.0 - self.config.beta1))?)?;
            let v_new =
                ((v_prev * self.config.beta2)? + (grad.sqr()? * (1.0 - self.config.beta2))?)?;

            let m_hat = (&m_new / bc1)?;
            let v_hat = (&v_new / bc2)?;
            let denom = (v_hat.sqrt()? + self.config.eps)?;
            let update = ((m_hat / denom)? * self.config.learning_rate)?;

            let mut next = (var.as_tensor() - &update)?;
            if self.config.weight_decay > 0.0 {
                let decay =
                    (var.as_tensor() * (self.config.learning_rate * self.config.weight_decay))?;
                next = (next - decay)?;
            }
            var.set(&next)?;

            self.m[i] = Some(m_new);
            self.v[i] = Some(v_new);
        }
        Ok(())
    }

    fn zero_grad(&mut self) {
        for slot in &mut self.accum {
            *slot = None;
        }
    }

    fn learning_rate(&self) -> f64 {
        self.config.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.config.learning_rate = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn scalar_var(value: f32) -> Var {
        Var::new(&[value], &Device::Cpu).unwrap()
    }

    fn value_of(var: &Var) -> f32 {
        var.as_tensor()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap()[0]
    }

    fn quadratic_loss(var: &Var, target: f64) -> Tensor {
        (var.as_tensor() - target)
            .unwrap()
            .sqr()
            .unwrap()
            .sum_all()
            .unwrap()
    }

    #[test]
    fn test_quadratic_descent() {
        let var = scalar_var(5.0);
        let config = AdamConfig::default().with_learning_rate(0.1);
        let mut opt = Adam::new(vec![var.clone()], config);

        let initial = (value_of(&var) - 3.0).abs();
        for _ in 0..300 {
            let loss = quadratic_loss(&var, 3.0);
            opt.backward(&loss).unwrap();
            opt.step().unwrap();
            opt.zero_grad();
        }
        let last = (value_of(&var) - 3.0).abs();
        assert!(last < 0.2, "expected convergence toward 3, got gap {last}");
        assert!(last < initial);
    }

    #[test]
    fn test_backward_accumulates_across_calls() {
        // d/dw (w - 3)^2 at w = 5 is 4; two backward calls accumulate to 8
        let var = scalar_var(5.0);
        let mut opt = Adam::new(vec![var.clone()], AdamConfig::default());

        let loss = quadratic_loss(&var, 3.0);
        opt.backward(&loss).unwrap();
        let loss = quadratic_loss(&var, 3.0);
        opt.backward(&loss).unwrap();

        let accum = opt.accum[0]
            .as_ref()
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap()[0];
        assert!((accum - 8.0).abs() < 1e-5);
    }

    #[test]
    fn test_zero_grad_clears_accumulator() {
        let var = scalar_var(5.0);
        let mut opt = Adam::new(vec![var.clone()], AdamConfig::default());

        let loss = quadratic_loss(&var, 3.0);
        opt.backward(&loss).unwrap();
        assert!(opt.accum[0].is_some());

        opt.zero_grad();
        assert!(opt.accum[0].is_none());
    }

    #[test]
    fn test_step_without_gradients_is_noop() {
        let var = scalar_var(2.5);
        let mut opt = Adam::new(vec![var.clone()], AdamConfig::default());

        opt.step().unwrap();
        assert!((value_of(&var) - 2.5).abs() < 1e-7);
    }

    #[test]
    fn test_weight_decay_shrinks_weights() {
        // the decay is decoupled from the gradient update, so under identical
        // losses the decayed var trails the plain one by lr * decay * value
        // after one step
        let plain = scalar_var(1.0);
        let decayed = scalar_var(1.0);
        let mut opt_plain = Adam::new(
            vec![plain.clone()],
            AdamConfig::default().with_learning_rate(0.1),
        );
        let mut opt_decayed = Adam::new(
            vec![decayed.clone()],
            AdamConfig::default()
                .with_learning_rate(0.1)
                .with_weight_decay(0.5),
        );

        let loss = quadratic_loss(&plain, 3.0);
        opt_plain.backward(&loss).unwrap();
        opt_plain.step().unwrap();
        let loss = quadratic_loss(&decayed, 3.0);
        opt_decayed.backward(&loss).unwrap();
        opt_decayed.step().unwrap();

        let gap = value_of(&plain) - value_of(&decayed);
        assert!(
            (gap - 0.05).abs() < 1e-5,
            "expected decay gap 0.05, got {gap}"
        );
    }

    #[test]
    fn test_learning_rate_roundtrip() {
        let mut opt = Adam::new(Vec::new(), AdamConfig::default());
        assert!((opt.learning_rate() - 1e-3).abs() < 1e-12);

        opt.set_learning_rate(5e-4);
        assert!((opt.learning_rate() - 5e-4).abs() < 1e-12);
    }

    #[test]
    fn test_config_builders() {
        let config = AdamConfig::default()
            .with_learning_rate(0.01)
            .with_betas(0.8, 0.95)
            .with_weight_decay(0.1);
        assert!((config.learning_rate - 0.01).abs() < 1e-12);
        assert!((config.beta1 - 0.8).abs() < 1e-12);
        assert!((config.beta2 - 0.95).abs() < 1e-12);
        assert!((config.weight_decay - 0.1).abs() < 1e-12);
    }
}
