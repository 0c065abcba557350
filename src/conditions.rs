//! Boundary condition enforcement for spherical domains.
//!
//! A condition turns a raw network output into a field that satisfies the
//! prescribed boundary data *exactly*, by blending the boundary values with
//! the raw output through weights that vanish at the enforced boundaries.
//! No penalty terms are involved; the residual loss never has to trade
//! interior accuracy against boundary accuracy.
//!
//! Two families share the same algebra:
//!
//! - [`SphericalCondition`] constrains a scalar field `u(r, theta, phi)`;
//!   boundary data are functions of the angles.
//! - [`HarmonicCondition`] constrains a radius-only coefficient vector
//!   `R(r)`; boundary data are coefficient vectors. The field is recovered
//!   later by contraction with an angular basis (see [`crate::solution`]).
//!
//! [`Condition`] wraps both families and reports how many leading batch
//! coordinates each one consumes, so systems may mix full-coordinate and
//! radius-only conditions.

use std::fmt;
use std::sync::Arc;

use candle_core::Tensor;

use crate::error::{PinnError, PinnResult};
use crate::generator::SphericalBatch;
use crate::nets::SolutionNet;

/// Boundary data as a function of the angular coordinates.
///
/// Receives `[n, 1]` theta/phi columns and must return a tensor
/// broadcastable against the raw network output.
pub type SurfaceFn = Arc<dyn Fn(&Tensor, &Tensor) -> candle_core::Result<Tensor> + Send + Sync>;

/// Wrap a closure as a [`SurfaceFn`].
pub fn surface<F>(f: F) -> SurfaceFn
where
    F: Fn(&Tensor, &Tensor) -> candle_core::Result<Tensor> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A [`SurfaceFn`] that is constant over the whole boundary.
pub fn constant_surface(value: f64) -> SurfaceFn {
    Arc::new(move |theta, _phi| theta.zeros_like()?.affine(1.0, value))
}

/// Condition on a scalar field of all three spherical coordinates.
#[derive(Clone)]
pub enum SphericalCondition {
    /// No constraint; the raw network output is the field.
    Unconstrained,
    /// `u(r_0, theta, phi) = f(theta, phi)`, nothing prescribed outward.
    InnerDirichlet {
        /// Inner boundary radius (`r_0 = 0` collapses it to the origin).
        r_0: f64,
        /// Field value on the inner boundary.
        f: SurfaceFn,
    },
    /// `u = f` at `r_0` and `u = g` at `r_1`.
    AnnularDirichlet {
        /// Inner boundary radius.
        r_0: f64,
        /// Field value on the inner boundary.
        f: SurfaceFn,
        /// Outer boundary radius, strictly greater than `r_0`.
        r_1: f64,
        /// Field value on the outer boundary.
        g: SurfaceFn,
    },
    /// `u = f` at `r_0` and `u -> g` as `r -> infinity`.
    InfiniteDirichlet {
        /// Inner boundary radius.
        r_0: f64,
        /// Field value on the inner boundary.
        f: SurfaceFn,
        /// Field limit at infinity.
        g: SurfaceFn,
        /// Decay order `k`: the caller must pick `k` large enough that
        /// `exp(-k * (r - r_0))` dominates the raw output growth as
        /// `r -> infinity`. This is not validated numerically.
        order: f64,
    },
}

impl SphericalCondition {
    /// Dirichlet condition with an optional outer boundary.
    ///
    /// # Errors
    ///
    /// `r_1` and `g` must be both present or both absent; a partial pair is
    /// an invalid configuration. For a two-sided condition `r_1` must exceed
    /// `r_0`.
    pub fn dirichlet(
        r_0: f64,
        f: SurfaceFn,
        r_1: Option<f64>,
        g: Option<SurfaceFn>,
    ) -> PinnResult<Self> {
        match (r_1, g) {
            (None, None) => Ok(Self::InnerDirichlet { r_0, f }),
            (Some(r_1), Some(g)) => {
                if r_1 <= r_0 {
                    return Err(PinnError::invalid_config(format!(
                        "outer radius must exceed inner radius, got r_0={r_0}, r_1={r_1}"
                    )));
                }
                Ok(Self::AnnularDirichlet { r_0, f, r_1, g })
            }
            (r_1, g) => Err(PinnError::invalid_config(format!(
                "r_1 and g must be both set or both omitted; got r_1={:?}, g={}",
                r_1,
                if g.is_some() { "set" } else { "omitted" },
            ))),
        }
    }

    /// Dirichlet condition with inner data `f` and limit `g` at infinity.
    #[must_use]
    pub fn infinite(r_0: f64, f: SurfaceFn, g: SurfaceFn, order: f64) -> Self {
        Self::InfiniteDirichlet { r_0, f, g, order }
    }

    /// Apply the condition to `net` evaluated at the given coordinates.
    pub fn enforce(
        &self,
        net: &dyn SolutionNet,
        r: &Tensor,
        theta: &Tensor,
        phi: &Tensor,
    ) -> PinnResult<Tensor> {
        let raw = net.forward(&Tensor::cat(&[r, theta, phi], 1)?)?;
        match self {
            Self::Unconstrained => Ok(raw),
            Self::InnerDirichlet { r_0, f } => {
                let boundary = f(theta, phi)?;
                let weight = one_sided_weight(r, *r_0)?;
                Ok(weight.broadcast_mul(&raw)?.broadcast_add(&boundary)?)
            }
            Self::AnnularDirichlet { r_0, f, r_1, g } => {
                let r_tilde = normalized_radius(r, *r_0, *r_1)?;
                let inner = f(theta, phi)?.broadcast_mul(&r_tilde.affine(-1.0, 1.0)?)?;
                let outer = g(theta, phi)?.broadcast_mul(&r_tilde)?;
                let blended = annular_weight(&r_tilde)?.broadcast_mul(&raw)?;
                Ok(inner.broadcast_add(&outer)?.broadcast_add(&blended)?)
            }
            Self::InfiniteDirichlet { r_0, f, g, order } => {
                let dr = r.affine(1.0, -r_0)?;
                let decay = dr.affine(-order, 0.0)?.exp()?;
                let plateau = dr.tanh()?;
                let inner = f(theta, phi)?.broadcast_mul(&decay)?;
                let limit = g(theta, phi)?.broadcast_mul(&plateau)?;
                let blended = decay.mul(&plateau)?.broadcast_mul(&raw)?;
                Ok(inner.broadcast_add(&limit)?.broadcast_add(&blended)?)
            }
        }
    }
}

impl fmt::Debug for SphericalCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconstrained => f.write_str("Unconstrained"),
            Self::InnerDirichlet { r_0, .. } => f
                .debug_struct("InnerDirichlet")
                .field("r_0", r_0)
                .finish_non_exhaustive(),
            Self::AnnularDirichlet { r_0, r_1, .. } => f
                .debug_struct("AnnularDirichlet")
                .field("r_0", r_0)
                .field("r_1", r_1)
                .finish_non_exhaustive(),
            Self::InfiniteDirichlet { r_0, order, .. } => f
                .debug_struct("InfiniteDirichlet")
                .field("r_0", r_0)
                .field("order", order)
                .finish_non_exhaustive(),
        }
    }
}

/// Condition on a radius-only vector of angular-basis coefficients.
///
/// Boundary data are coefficient row vectors of the same length as the
/// network output, in the same dtype.
#[derive(Debug, Clone)]
pub enum HarmonicCondition {
    /// No constraint; the raw coefficient output is used as-is.
    Unconstrained,
    /// `R(r_0) = coeffs_0`, nothing prescribed outward.
    InnerDirichlet {
        /// Inner boundary radius.
        r_0: f64,
        /// Coefficient values on the inner boundary, shape `[1, k]`.
        coeffs_0: Tensor,
    },
    /// `R(r_0) = coeffs_0` and `R(r_1) = coeffs_1`.
    AnnularDirichlet {
        /// Inner boundary radius.
        r_0: f64,
        /// Coefficient values on the inner boundary, shape `[1, k]`.
        coeffs_0: Tensor,
        /// Outer boundary radius, strictly greater than `r_0`.
        r_1: f64,
        /// Coefficient values on the outer boundary, shape `[1, k]`.
        coeffs_1: Tensor,
    },
    /// `R(r_0) = coeffs_0` and `R -> coeffs_inf` as `r -> infinity`.
    InfiniteDirichlet {
        /// Inner boundary radius.
        r_0: f64,
        /// Coefficient values on the inner boundary, shape `[1, k]`.
        coeffs_0: Tensor,
        /// Coefficient limit at infinity, shape `[1, k]`.
        coeffs_inf: Tensor,
        /// Decay order `k`; same unvalidated caller precondition as the
        /// spherical variant.
        order: f64,
    },
}

impl HarmonicCondition {
    /// Dirichlet condition on coefficients with an optional outer boundary.
    ///
    /// # Errors
    ///
    /// `r_1` and `coeffs_1` must be both present or both absent, the
    /// coefficient vectors must be non-empty and of equal length, and a
    /// two-sided condition needs `r_1 > r_0`.
    pub fn dirichlet(
        r_0: f64,
        coeffs_0: &Tensor,
        r_1: Option<f64>,
        coeffs_1: Option<&Tensor>,
    ) -> PinnResult<Self> {
        let coeffs_0 = coeff_row(coeffs_0)?;
        match (r_1, coeffs_1) {
            (None, None) => Ok(Self::InnerDirichlet { r_0, coeffs_0 }),
            (Some(r_1), Some(coeffs_1)) => {
                if r_1 <= r_0 {
                    return Err(PinnError::invalid_config(format!(
                        "outer radius must exceed inner radius, got r_0={r_0}, r_1={r_1}"
                    )));
                }
                let coeffs_1 = coeff_row(coeffs_1)?;
                check_same_width(&coeffs_0, &coeffs_1)?;
                Ok(Self::AnnularDirichlet {
                    r_0,
                    coeffs_0,
                    r_1,
                    coeffs_1,
                })
            }
            (r_1, coeffs_1) => Err(PinnError::invalid_config(format!(
                "r_1 and coeffs_1 must be both set or both omitted; got r_1={:?}, coeffs_1={}",
                r_1,
                if coeffs_1.is_some() { "set" } else { "omitted" },
            ))),
        }
    }

    /// Dirichlet condition with inner coefficients and a limit at infinity.
    pub fn infinite(
        r_0: f64,
        coeffs_0: &Tensor,
        coeffs_inf: &Tensor,
        order: f64,
    ) -> PinnResult<Self> {
        let coeffs_0 = coeff_row(coeffs_0)?;
        let coeffs_inf = coeff_row(coeffs_inf)?;
        check_same_width(&coeffs_0, &coeffs_inf)?;
        Ok(Self::InfiniteDirichlet {
            r_0,
            coeffs_0,
            coeffs_inf,
            order,
        })
    }

    /// Apply the condition to `net` evaluated at the given radii.
    pub fn enforce(&self, net: &dyn SolutionNet, r: &Tensor) -> PinnResult<Tensor> {
        let raw = net.forward(r)?;
        match self {
            Self::Unconstrained => Ok(raw),
            Self::InnerDirichlet { r_0, coeffs_0 } => {
                let weight = one_sided_weight(r, *r_0)?;
                Ok(weight.broadcast_mul(&raw)?.broadcast_add(coeffs_0)?)
            }
            Self::AnnularDirichlet {
                r_0,
                coeffs_0,
                r_1,
                coeffs_1,
            } => {
                let r_tilde = normalized_radius(r, *r_0, *r_1)?;
                let inner = r_tilde.affine(-1.0, 1.0)?.broadcast_mul(coeffs_0)?;
                let outer = r_tilde.broadcast_mul(coeffs_1)?;
                let blended = annular_weight(&r_tilde)?.broadcast_mul(&raw)?;
                Ok(inner.broadcast_add(&outer)?.broadcast_add(&blended)?)
            }
            Self::InfiniteDirichlet {
                r_0,
                coeffs_0,
                coeffs_inf,
                order,
            } => {
                let dr = r.affine(1.0, -r_0)?;
                let decay = dr.affine(-order, 0.0)?.exp()?;
                let plateau = dr.tanh()?;
                let inner = decay.broadcast_mul(coeffs_0)?;
                let limit = plateau.broadcast_mul(coeffs_inf)?;
                let blended = decay.mul(&plateau)?.broadcast_mul(&raw)?;
                Ok(inner.broadcast_add(&limit)?.broadcast_add(&blended)?)
            }
        }
    }

    /// Number of coefficients the condition constrains, if any are recorded.
    #[must_use]
    pub fn n_coefficients(&self) -> Option<usize> {
        match self {
            Self::Unconstrained => None,
            Self::InnerDirichlet { coeffs_0, .. }
            | Self::AnnularDirichlet { coeffs_0, .. }
            | Self::InfiniteDirichlet { coeffs_0, .. } => Some(coeffs_0.elem_count()),
        }
    }
}

/// A condition of either family, tagged with its coordinate arity.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Full-coordinate condition on a scalar field.
    Spherical(SphericalCondition),
    /// Radius-only condition on basis coefficients.
    Harmonic(HarmonicCondition),
}

impl Condition {
    /// How many leading batch coordinates enforcement consumes:
    /// 3 (`r, theta, phi`) for spherical conditions, 1 (`r`) for harmonic.
    #[must_use]
    pub const fn arity(&self) -> usize {
        match self {
            Self::Spherical(_) => 3,
            Self::Harmonic(_) => 1,
        }
    }

    /// Enforce the condition on `net` over `batch`, consuming exactly
    /// [`Condition::arity`] leading coordinates.
    pub fn enforce(&self, net: &dyn SolutionNet, batch: &SphericalBatch) -> PinnResult<Tensor> {
        match self {
            Self::Spherical(c) => c.enforce(net, &batch.r, &batch.theta, &batch.phi),
            Self::Harmonic(c) => c.enforce(net, &batch.r),
        }
    }
}

impl From<SphericalCondition> for Condition {
    fn from(c: SphericalCondition) -> Self {
        Self::Spherical(c)
    }
}

impl From<HarmonicCondition> for Condition {
    fn from(c: HarmonicCondition) -> Self {
        Self::Harmonic(c)
    }
}

// 1 - exp(-(r - r_0)); zero exactly at r_0
fn one_sided_weight(r: &Tensor, r_0: f64) -> candle_core::Result<Tensor> {
    r.affine(-1.0, r_0)?.exp()?.affine(-1.0, 1.0)
}

// (r - r_0) / (r_1 - r_0)
fn normalized_radius(r: &Tensor, r_0: f64, r_1: f64) -> candle_core::Result<Tensor> {
    let span = r_1 - r_0;
    r.affine(1.0 / span, -r_0 / span)
}

// 1 - exp((1 - rt) * rt); zero exactly at rt = 0 and rt = 1
fn annular_weight(r_tilde: &Tensor) -> candle_core::Result<Tensor> {
    let product = r_tilde.affine(-1.0, 1.0)?.mul(r_tilde)?;
    product.exp()?.affine(-1.0, 1.0)
}

fn coeff_row(coeffs: &Tensor) -> PinnResult<Tensor> {
    let k = coeffs.elem_count();
    if k == 0 {
        return Err(PinnError::invalid_config(
            "boundary coefficient vector must be non-empty",
        ));
    }
    Ok(coeffs.reshape((1, k))?)
}

fn check_same_width(a: &Tensor, b: &Tensor) -> PinnResult<()> {
    if a.elem_count() != b.elem_count() {
        return Err(PinnError::shape_mismatch(
            format!("{} coefficients", a.elem_count()),
            format!("{} coefficients", b.elem_count()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{Device, Var};

    use crate::nets::SolutionNet;

    /// Net that outputs a constant everywhere, whatever the input width.
    struct ConstNet {
        value: f64,
        inputs: usize,
        outputs: usize,
    }

    impl ConstNet {
        fn new(value: f64, inputs: usize, outputs: usize) -> Self {
            Self {
                value,
                inputs,
                outputs,
            }
        }
    }

    impl SolutionNet for ConstNet {
        fn forward(&self, xs: &Tensor) -> PinnResult<Tensor> {
            let n = xs.dim(0)?;
            let zeros = Tensor::zeros((n, self.outputs), xs.dtype(), xs.device())?;
            Ok(zeros.affine(1.0, self.value)?)
        }

        fn trainable_vars(&self) -> Vec<Var> {
            Vec::new()
        }

        fn clone_snapshot(&self) -> PinnResult<Box<dyn SolutionNet>> {
            Ok(Box::new(Self::new(self.value, self.inputs, self.outputs)))
        }

        fn input_dim(&self) -> usize {
            self.inputs
        }

        fn output_dim(&self) -> usize {
            self.outputs
        }
    }

    fn batch_at_radius(r: f64, n: usize) -> SphericalBatch {
        let device = Device::Cpu;
        let rs = Tensor::from_vec(vec![r as f32; n], (n, 1), &device).unwrap();
        let thetas: Vec<f32> = (0..n).map(|i| 0.3 + 0.5 * i as f32).collect();
        let phis: Vec<f32> = (0..n).map(|i| 0.1 + 0.9 * i as f32).collect();
        let thetas = Tensor::from_vec(thetas, (n, 1), &device).unwrap();
        let phis = Tensor::from_vec(phis, (n, 1), &device).unwrap();
        SphericalBatch::new(&rs, &thetas, &phis).unwrap()
    }

    fn max_abs_diff(a: &Tensor, b: &Tensor) -> f32 {
        (a - b)
            .unwrap()
            .abs()
            .unwrap()
            .max_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap()
    }

    fn angular_sum() -> SurfaceFn {
        surface(|theta: &Tensor, phi: &Tensor| theta.sin()? + phi)
    }

    #[test]
    fn test_inner_dirichlet_exact_at_boundary() {
        let cond = SphericalCondition::dirichlet(1.0, angular_sum(), None, None).unwrap();
        let net = ConstNet::new(7.5, 3, 1);
        let batch = batch_at_radius(1.0, 5);

        let enforced = cond
            .enforce(&net, &batch.r, &batch.theta, &batch.phi)
            .unwrap();
        let expected = (batch.theta.sin().unwrap() + &batch.phi).unwrap();
        assert!(max_abs_diff(&enforced, &expected) < 1e-6);
    }

    #[test]
    fn test_inner_dirichlet_free_away_from_boundary() {
        // far from the boundary the raw output dominates up to the offset f
        let cond = SphericalCondition::dirichlet(0.0, constant_surface(2.0), None, None).unwrap();
        let net = ConstNet::new(3.0, 3, 1);
        let batch = batch_at_radius(40.0, 4);

        let enforced = cond
            .enforce(&net, &batch.r, &batch.theta, &batch.phi)
            .unwrap();
        let expected = batch.r.zeros_like().unwrap().affine(1.0, 5.0).unwrap();
        assert!(max_abs_diff(&enforced, &expected) < 1e-4);
    }

    #[test]
    fn test_annular_dirichlet_exact_at_both_boundaries() {
        let cond = SphericalCondition::dirichlet(
            1.0,
            angular_sum(),
            Some(2.0),
            Some(constant_surface(-4.0)),
        )
        .unwrap();
        let net = ConstNet::new(11.0, 3, 1);

        let inner = batch_at_radius(1.0, 4);
        let enforced = cond
            .enforce(&net, &inner.r, &inner.theta, &inner.phi)
            .unwrap();
        let expected = (inner.theta.sin().unwrap() + &inner.phi).unwrap();
        assert!(max_abs_diff(&enforced, &expected) < 1e-6);

        let outer = batch_at_radius(2.0, 4);
        let enforced = cond
            .enforce(&net, &outer.r, &outer.theta, &outer.phi)
            .unwrap();
        let expected = outer.r.zeros_like().unwrap().affine(1.0, -4.0).unwrap();
        assert!(max_abs_diff(&enforced, &expected) < 1e-6);
    }

    #[test]
    fn test_annular_midpoint_value_with_zero_net() {
        // f = 0 at r_0 = 1, g = 1 at r_1 = 2, raw output identically zero:
        // at the midpoint the enforced value is exactly 0.5
        let cond = SphericalCondition::dirichlet(
            1.0,
            constant_surface(0.0),
            Some(2.0),
            Some(constant_surface(1.0)),
        )
        .unwrap();
        let net = ConstNet::new(0.0, 3, 1);
        let batch = batch_at_radius(1.5, 6);

        let enforced = cond
            .enforce(&net, &batch.r, &batch.theta, &batch.phi)
            .unwrap();
        let expected = batch.r.zeros_like().unwrap().affine(1.0, 0.5).unwrap();
        assert!(max_abs_diff(&enforced, &expected) < 1e-6);
    }

    #[test]
    fn test_infinite_dirichlet_boundary_and_limit() {
        let cond = SphericalCondition::infinite(1.0, angular_sum(), constant_surface(9.0), 1.0);
        let net = ConstNet::new(-2.0, 3, 1);

        let inner = batch_at_radius(1.0, 4);
        let enforced = cond
            .enforce(&net, &inner.r, &inner.theta, &inner.phi)
            .unwrap();
        let expected = (inner.theta.sin().unwrap() + &inner.phi).unwrap();
        assert!(max_abs_diff(&enforced, &expected) < 1e-6);

        let far = batch_at_radius(30.0, 4);
        let enforced = cond.enforce(&net, &far.r, &far.theta, &far.phi).unwrap();
        let expected = far.r.zeros_like().unwrap().affine(1.0, 9.0).unwrap();
        assert!(max_abs_diff(&enforced, &expected) < 1e-4);
    }

    #[test]
    fn test_partial_outer_pair_rejected() {
        let err = SphericalCondition::dirichlet(1.0, constant_surface(0.0), Some(2.0), None)
            .unwrap_err();
        assert!(matches!(err, PinnError::InvalidConfig(_)));

        let err =
            SphericalCondition::dirichlet(1.0, constant_surface(0.0), None, Some(constant_surface(1.0)))
                .unwrap_err();
        assert!(matches!(err, PinnError::InvalidConfig(_)));
    }

    #[test]
    fn test_degenerate_annulus_rejected() {
        let err = SphericalCondition::dirichlet(
            2.0,
            constant_surface(0.0),
            Some(2.0),
            Some(constant_surface(1.0)),
        )
        .unwrap_err();
        assert!(matches!(err, PinnError::InvalidConfig(_)));
    }

    fn coeffs(values: &[f32]) -> Tensor {
        Tensor::from_vec(values.to_vec(), values.len(), &Device::Cpu).unwrap()
    }

    #[test]
    fn test_harmonic_inner_dirichlet_exact_at_boundary() {
        let coeffs_0 = coeffs(&[1.0, -2.0, 3.0]);
        let cond = HarmonicCondition::dirichlet(1.0, &coeffs_0, None, None).unwrap();
        let net = ConstNet::new(4.0, 1, 3);
        let batch = batch_at_radius(1.0, 5);

        let enforced = cond.enforce(&net, &batch.r).unwrap();
        assert_eq!(enforced.dims(), &[5, 3]);
        let expected = coeffs_0
            .reshape((1, 3))
            .unwrap()
            .broadcast_as((5, 3))
            .unwrap();
        assert!(max_abs_diff(&enforced, &expected) < 1e-6);
    }

    #[test]
    fn test_harmonic_annular_exact_at_both_boundaries() {
        let coeffs_0 = coeffs(&[1.0, 0.0]);
        let coeffs_1 = coeffs(&[0.0, 2.0]);
        let cond =
            HarmonicCondition::dirichlet(1.0, &coeffs_0, Some(3.0), Some(&coeffs_1)).unwrap();
        let net = ConstNet::new(5.0, 1, 2);

        let inner = batch_at_radius(1.0, 3);
        let enforced = cond.enforce(&net, &inner.r).unwrap();
        let expected = coeffs_0
            .reshape((1, 2))
            .unwrap()
            .broadcast_as((3, 2))
            .unwrap();
        assert!(max_abs_diff(&enforced, &expected) < 1e-6);

        let outer = batch_at_radius(3.0, 3);
        let enforced = cond.enforce(&net, &outer.r).unwrap();
        let expected = coeffs_1
            .reshape((1, 2))
            .unwrap()
            .broadcast_as((3, 2))
            .unwrap();
        assert!(max_abs_diff(&enforced, &expected) < 1e-6);
    }

    #[test]
    fn test_harmonic_infinite_limit() {
        let coeffs_0 = coeffs(&[2.0]);
        let coeffs_inf = coeffs(&[-1.0]);
        let cond = HarmonicCondition::infinite(0.5, &coeffs_0, &coeffs_inf, 2.0).unwrap();
        let net = ConstNet::new(10.0, 1, 1);

        let inner = batch_at_radius(0.5, 3);
        let enforced = cond.enforce(&net, &inner.r).unwrap();
        let expected = inner.r.zeros_like().unwrap().affine(1.0, 2.0).unwrap();
        assert!(max_abs_diff(&enforced, &expected) < 1e-6);

        let far = batch_at_radius(20.0, 3);
        let enforced = cond.enforce(&net, &far.r).unwrap();
        let expected = far.r.zeros_like().unwrap().affine(1.0, -1.0).unwrap();
        assert!(max_abs_diff(&enforced, &expected) < 1e-4);
    }

    #[test]
    fn test_harmonic_partial_pair_and_width_mismatch() {
        let coeffs_0 = coeffs(&[1.0, 2.0]);
        let err =
            HarmonicCondition::dirichlet(1.0, &coeffs_0, Some(2.0), None).unwrap_err();
        assert!(matches!(err, PinnError::InvalidConfig(_)));

        let narrow = coeffs(&[1.0]);
        let err = HarmonicCondition::dirichlet(1.0, &coeffs_0, Some(2.0), Some(&narrow))
            .unwrap_err();
        assert!(matches!(err, PinnError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_condition_arity() {
        let spherical: Condition = SphericalCondition::Unconstrained.into();
        assert_eq!(spherical.arity(), 3);

        let harmonic: Condition = HarmonicCondition::Unconstrained.into();
        assert_eq!(harmonic.arity(), 1);
    }

    #[test]
    fn test_arity_dispatch_feeds_radius_only_net() {
        // a 1-input net works under a harmonic condition even though the
        // batch carries three coordinates
        let harmonic: Condition = HarmonicCondition::Unconstrained.into();
        let net = ConstNet::new(1.5, 1, 4);
        let batch = batch_at_radius(2.0, 6);

        let out = harmonic.enforce(&net, &batch).unwrap();
        assert_eq!(out.dims(), &[6, 4]);
    }

    #[test]
    fn test_unconstrained_passthrough() {
        let cond: Condition = SphericalCondition::Unconstrained.into();
        let net = ConstNet::new(-3.25, 3, 1);
        let batch = batch_at_radius(1.7, 4);

        let out = cond.enforce(&net, &batch).unwrap();
        let expected = batch.r.zeros_like().unwrap().affine(1.0, -3.25).unwrap();
        assert!(max_abs_diff(&out, &expected) < 1e-6);
    }
}
