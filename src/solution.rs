//! Read-only evaluators over frozen (network, condition) sets.
//!
//! [`SphericalSolution`] evaluates each dependent variable directly from the
//! enforced network output. [`HarmonicSolution`] additionally contracts a
//! coefficient output against an angular basis:
//! `u(r, theta, phi) = sum_k R(r)[k] * Y(theta, phi)[k]`. Given matched
//! constructions of the same field, the two agree pointwise.

use std::sync::Arc;

use candle_core::Tensor;

use crate::basis::{FunctionBasis, RealSphericalHarmonics};
use crate::conditions::Condition;
use crate::error::{PinnError, PinnResult};
use crate::generator::SphericalBatch;
use crate::nets::SolutionNet;

fn check_paired(n_nets: usize, n_conditions: usize) -> PinnResult<()> {
    if n_nets != n_conditions {
        return Err(PinnError::invalid_config(format!(
            "got {n_nets} networks for {n_conditions} conditions; counts must match"
        )));
    }
    Ok(())
}

/// Direct-field evaluator: one enforced network output per dependent
/// variable.
pub struct SphericalSolution {
    nets: Vec<Arc<dyn SolutionNet>>,
    conditions: Vec<Condition>,
}

impl SphericalSolution {
    /// Bind an evaluator to `nets` and their index-paired `conditions`.
    ///
    /// # Errors
    ///
    /// Returns an error when the counts differ.
    pub fn new(nets: Vec<Arc<dyn SolutionNet>>, conditions: Vec<Condition>) -> PinnResult<Self> {
        check_paired(nets.len(), conditions.len())?;
        Ok(Self { nets, conditions })
    }

    /// Number of dependent variables.
    #[must_use]
    pub fn n_funcs(&self) -> usize {
        self.nets.len()
    }

    /// Evaluate every dependent variable at the given coordinates.
    ///
    /// Inputs may have any shape as long as the three agree elementwise;
    /// each output is returned in the input shape.
    pub fn evaluate(
        &self,
        rs: &Tensor,
        thetas: &Tensor,
        phis: &Tensor,
    ) -> PinnResult<Vec<Tensor>> {
        let shape = rs.shape().clone();
        let batch = SphericalBatch::new(rs, thetas, phis)?;
        let mut values = Vec::with_capacity(self.nets.len());
        for (net, condition) in self.nets.iter().zip(&self.conditions) {
            let u = condition.enforce(net.as_ref(), &batch)?;
            values.push(restore_shape(u, &shape)?);
        }
        Ok(values)
    }
}

impl std::fmt::Debug for SphericalSolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SphericalSolution")
            .field("n_funcs", &self.n_funcs())
            .finish_non_exhaustive()
    }
}

// columns come back as [n, 1]; hand them to the caller in the input shape
fn restore_shape(u: Tensor, shape: &candle_core::Shape) -> PinnResult<Tensor> {
    if u.elem_count() == shape.elem_count() {
        Ok(u.reshape(shape.dims())?)
    } else {
        Ok(u)
    }
}

/// Harmonic-coefficient evaluator: coefficient networks contracted against
/// an angular basis.
pub struct HarmonicSolution {
    nets: Vec<Arc<dyn SolutionNet>>,
    conditions: Vec<Condition>,
    basis: Arc<dyn FunctionBasis>,
}

impl HarmonicSolution {
    /// Bind an evaluator to coefficient `nets`, their `conditions`, and an
    /// angular basis.
    ///
    /// `max_degree` is the legacy way of requesting a default
    /// [`RealSphericalHarmonics`] basis of that degree; it is deprecated and
    /// superseded by `basis`, which always takes precedence when both are
    /// given.
    ///
    /// # Errors
    ///
    /// Returns an error when the counts differ or when neither `basis` nor
    /// `max_degree` is given.
    pub fn new(
        nets: Vec<Arc<dyn SolutionNet>>,
        conditions: Vec<Condition>,
        basis: Option<Arc<dyn FunctionBasis>>,
        max_degree: Option<u32>,
    ) -> PinnResult<Self> {
        check_paired(nets.len(), conditions.len())?;
        let basis = match (basis, max_degree) {
            (Some(basis), max_degree) => {
                if max_degree.is_some() {
                    tracing::warn!(
                        "`max_degree` is deprecated and ignored because an explicit basis \
                         was also given"
                    );
                }
                basis
            }
            (None, Some(max_degree)) => {
                tracing::warn!(
                    max_degree,
                    "`max_degree` is deprecated; pass an explicit basis instead"
                );
                Arc::new(RealSphericalHarmonics::new(max_degree))
            }
            (None, None) => {
                return Err(PinnError::invalid_config(
                    "a harmonic basis must be specified, either explicitly or via max_degree",
                ))
            }
        };
        Ok(Self {
            nets,
            conditions,
            basis,
        })
    }

    /// Number of dependent variables.
    #[must_use]
    pub fn n_funcs(&self) -> usize {
        self.nets.len()
    }

    /// The angular basis in use.
    #[must_use]
    pub fn basis(&self) -> &Arc<dyn FunctionBasis> {
        &self.basis
    }

    /// Evaluate every dependent variable at the given coordinates.
    ///
    /// Each coefficient network is enforced over the radii, contracted with
    /// the basis evaluated at the angles, and returned in the input shape.
    pub fn evaluate(
        &self,
        rs: &Tensor,
        thetas: &Tensor,
        phis: &Tensor,
    ) -> PinnResult<Vec<Tensor>> {
        let shape = rs.shape().clone();
        let batch = SphericalBatch::new(rs, thetas, phis)?;
        let basis_values = self.basis.eval(&batch.theta, &batch.phi)?;

        let mut values = Vec::with_capacity(self.nets.len());
        for (net, condition) in self.nets.iter().zip(&self.conditions) {
            let coefficients = condition.enforce(net.as_ref(), &batch)?;
            if coefficients.dim(1)? != self.basis.n_components() {
                return Err(PinnError::shape_mismatch(
                    format!("{} coefficient columns", self.basis.n_components()),
                    format!("{} coefficient columns", coefficients.dim(1)?),
                ));
            }
            let u = coefficients.mul(&basis_values)?.sum(1)?;
            values.push(restore_shape(u, &shape)?);
        }
        Ok(values)
    }
}

impl std::fmt::Debug for HarmonicSolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarmonicSolution")
            .field("n_funcs", &self.n_funcs())
            .field("n_components", &self.basis.n_components())
            .finish_non_exhaustive()
    }
}
