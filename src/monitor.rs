//! Passive observers invoked at epoch boundaries.
//!
//! A [`Monitor`] is purely observational: it may read the networks,
//! conditions, and histories, but never alters training. The solver checks
//! it whenever the local epoch count reaches a multiple of
//! [`Monitor::check_every`], and once more on the final epoch.
//!
//! [`SolutionMonitor`] is the bundled implementation: it evaluates every
//! (network, condition) pair over a fixed spherical mesh and reports
//! per-variable summary statistics and the latest losses through `tracing`.

use std::sync::Arc;

use candle_core::{DType, Device, Tensor};

use crate::basis::FunctionBasis;
use crate::conditions::Condition;
use crate::error::{PinnError, PinnResult};
use crate::generator::SphericalBatch;
use crate::history::{HistoryStatistics, PhasePair};
use crate::nets::SolutionNet;

/// Observer of training progress.
pub trait Monitor {
    /// Epochs between two checks.
    fn check_every(&self) -> usize;

    /// Inspect the current state. Must not mutate anything the solver owns.
    fn check(
        &mut self,
        nets: &[Arc<dyn SolutionNet>],
        conditions: &[Condition],
        loss_history: &PhasePair<Vec<f64>>,
        analytic_mse_history: &PhasePair<Vec<f64>>,
    ) -> PinnResult<()>;
}

/// Spacing of the mesh's radial axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadialScale {
    /// Equally spaced radii.
    Linear,
    /// Equally spaced in `ln r`; resolves fields that vary near the inner
    /// boundary.
    Log,
}

/// Evaluates solutions on a fixed spherical mesh and logs summary
/// statistics.
///
/// Coefficient networks under harmonic conditions need a basis
/// ([`SolutionMonitor::with_basis`]) to be contracted into field values.
pub struct SolutionMonitor {
    r_min: f64,
    r_max: f64,
    check_every: usize,
    var_names: Option<Vec<String>>,
    shape: (usize, usize, usize),
    r_scale: RadialScale,
    basis: Option<Arc<dyn FunctionBasis>>,
    dtype: DType,
    device: Device,
    mesh: Option<SphericalBatch>,
}

impl SolutionMonitor {
    /// Monitor over the shell `[r_min, r_max]` with a 10x10x10 mesh,
    /// checking every 100 epochs.
    ///
    /// # Errors
    ///
    /// The radii must be an ordered positive finite pair.
    pub fn new(r_min: f64, r_max: f64) -> PinnResult<Self> {
        if !(r_min.is_finite() && r_max.is_finite()) || r_min <= 0.0 || r_max <= r_min {
            return Err(PinnError::invalid_config(format!(
                "expected 0 < r_min < r_max, got r_min={r_min}, r_max={r_max}"
            )));
        }
        Ok(Self {
            r_min,
            r_max,
            check_every: 100,
            var_names: None,
            shape: (10, 10, 10),
            r_scale: RadialScale::Linear,
            basis: None,
            dtype: DType::F32,
            device: Device::Cpu,
            mesh: None,
        })
    }

    /// Builder: set the check interval in epochs.
    #[must_use]
    pub const fn with_check_every(mut self, check_every: usize) -> Self {
        self.check_every = check_every;
        self
    }

    /// Builder: name the dependent variables for log output.
    #[must_use]
    pub fn with_var_names(mut self, names: Vec<String>) -> Self {
        self.var_names = Some(names);
        self
    }

    /// Builder: set the mesh resolution as (radii, polar, azimuthal) counts.
    #[must_use]
    pub fn with_shape(mut self, shape: (usize, usize, usize)) -> Self {
        self.shape = shape;
        self.mesh = None;
        self
    }

    /// Builder: set the radial spacing.
    #[must_use]
    pub fn with_r_scale(mut self, r_scale: RadialScale) -> Self {
        self.r_scale = r_scale;
        self.mesh = None;
        self
    }

    /// Builder: contract coefficient networks against `basis`.
    #[must_use]
    pub fn with_basis(mut self, basis: Arc<dyn FunctionBasis>) -> Self {
        self.basis = Some(basis);
        self
    }

    /// Builder: set the mesh dtype.
    #[must_use]
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self.mesh = None;
        self
    }

    /// Builder: set the device the mesh lives on.
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self.mesh = None;
        self
    }

    /// Number of mesh points evaluated per check.
    #[must_use]
    pub const fn mesh_len(&self) -> usize {
        self.shape.0 * self.shape.1 * self.shape.2
    }

    fn mesh(&mut self) -> PinnResult<&SphericalBatch> {
        if self.mesh.is_none() {
            self.mesh = Some(self.build_mesh()?);
        }
        // just populated above
        self.mesh
            .as_ref()
            .ok_or_else(|| PinnError::invalid_config("monitor mesh unavailable"))
    }

    fn build_mesh(&self) -> PinnResult<SphericalBatch> {
        let (n_r, n_theta, n_phi) = self.shape;
        if n_r == 0 || n_theta == 0 || n_phi == 0 {
            return Err(PinnError::invalid_config(
                "monitor mesh shape must be positive in every axis",
            ));
        }

        let radii: Vec<f64> = (0..n_r)
            .map(|i| {
                let fraction = if n_r > 1 { i as f64 / (n_r - 1) as f64 } else { 0.5 };
                match self.r_scale {
                    RadialScale::Linear => self.r_min + (self.r_max - self.r_min) * fraction,
                    RadialScale::Log => {
                        let (lo, hi) = (self.r_min.ln(), self.r_max.ln());
                        (lo + (hi - lo) * fraction).exp()
                    }
                }
            })
            .collect();
        let axis = |count: usize, max: f64| -> Vec<f64> {
            (0..count)
                .map(|i| {
                    let fraction = if count > 1 { i as f64 / (count - 1) as f64 } else { 0.5 };
                    max * fraction
                })
                .collect()
        };
        let thetas = axis(n_theta, std::f64::consts::PI);
        let phis = axis(n_phi, 2.0 * std::f64::consts::PI);

        let n = self.mesh_len();
        let mut r_column = Vec::with_capacity(n);
        let mut theta_column = Vec::with_capacity(n);
        let mut phi_column = Vec::with_capacity(n);
        for &r in &radii {
            for &theta in &thetas {
                for &phi in &phis {
                    r_column.push(r);
                    theta_column.push(theta);
                    phi_column.push(phi);
                }
            }
        }

        let column = |values: Vec<f64>| -> PinnResult<Tensor> {
            let len = values.len();
            Ok(Tensor::from_vec(values, (len, 1), &self.device)?.to_dtype(self.dtype)?)
        };
        SphericalBatch::new(&column(r_column)?, &column(theta_column)?, &column(phi_column)?)
    }

    fn field_values(
        &mut self,
        net: &dyn SolutionNet,
        condition: &Condition,
    ) -> PinnResult<Vec<f64>> {
        let basis = self.basis.clone();
        let mesh = self.mesh()?;
        let enforced = condition.enforce(net, mesh)?;
        let field = match condition {
            Condition::Spherical(_) => enforced,
            Condition::Harmonic(_) => {
                let basis = basis.ok_or_else(|| {
                    PinnError::invalid_config(
                        "monitor needs a basis to evaluate coefficient networks",
                    )
                })?;
                let basis_values = basis.eval(&mesh.theta, &mesh.phi)?;
                enforced.mul(&basis_values)?.sum(1)?
            }
        };
        Ok(field
            .to_dtype(DType::F64)?
            .flatten_all()?
            .to_vec1::<f64>()?)
    }
}

impl Monitor for SolutionMonitor {
    fn check_every(&self) -> usize {
        self.check_every
    }

    fn check(
        &mut self,
        nets: &[Arc<dyn SolutionNet>],
        conditions: &[Condition],
        loss_history: &PhasePair<Vec<f64>>,
        analytic_mse_history: &PhasePair<Vec<f64>>,
    ) -> PinnResult<()> {
        let epoch = loss_history.train.len();
        tracing::info!(
            epoch,
            train_loss = loss_history.train.last().copied().unwrap_or(f64::NAN),
            valid_loss = loss_history.valid.last().copied().unwrap_or(f64::NAN),
            "monitor check"
        );
        if let Some(latest) = analytic_mse_history.valid.last() {
            tracing::info!(epoch, valid_analytic_mse = latest, "analytic reference");
        }

        for (i, (net, condition)) in nets.iter().zip(conditions).enumerate() {
            let name = self
                .var_names
                .as_ref()
                .and_then(|names| names.get(i).cloned())
                .unwrap_or_else(|| format!("u[{i}]"));
            let values = self.field_values(net.as_ref(), condition)?;
            let stats = HistoryStatistics::from_values(&values);
            tracing::info!(
                var = %name,
                mesh_points = stats.count,
                mean = stats.mean,
                min = stats.min,
                max = stats.max,
                "solution summary"
            );
        }
        Ok(())
    }
}
