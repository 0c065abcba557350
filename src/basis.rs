//! Angular function bases for harmonic solution expansions.
//!
//! A basis maps angle columns to a `[n, k]` matrix whose rows hold the `k`
//! basis functions evaluated at each point. Coefficient networks trained
//! under [`crate::conditions::HarmonicCondition`] are contracted against
//! these rows to recover a scalar field.

use std::sync::Arc;

use candle_core::Tensor;

use crate::error::{PinnError, PinnResult};

/// A family of angular functions evaluated pointwise over a batch.
pub trait FunctionBasis: Send + Sync {
    /// Number of basis functions, i.e. the width of [`FunctionBasis::eval`].
    fn n_components(&self) -> usize;

    /// Evaluate all basis functions at the given `[n, 1]` angle columns,
    /// returning `[n, n_components]`.
    fn eval(&self, theta: &Tensor, phi: &Tensor) -> PinnResult<Tensor>;
}

/// Real spherical harmonics up to a maximum degree, in geodesy convention
/// (orthonormal over the sphere, no Condon-Shortley phase).
///
/// Components are ordered degree-major: for each degree `l` the orders run
/// `m = -l ..= l`, so `Y_{l,m}` sits at column `l^2 + l + m` and the total
/// count is `(max_degree + 1)^2`.
#[derive(Debug, Clone, Copy)]
pub struct RealSphericalHarmonics {
    max_degree: u32,
}

impl RealSphericalHarmonics {
    /// Harmonics of all degrees `0 ..= max_degree`.
    #[must_use]
    pub const fn new(max_degree: u32) -> Self {
        Self { max_degree }
    }

    /// The highest degree included.
    #[must_use]
    pub const fn max_degree(&self) -> u32 {
        self.max_degree
    }

    // sqrt((2l+1)/(4 pi) * (l-m)! / (l+m)!)
    fn normalizer(l: u32, m: u32) -> f64 {
        let mut ratio = 1.0_f64;
        for i in (l - m + 1)..=(l + m) {
            ratio /= f64::from(i);
        }
        (f64::from(2 * l + 1) / (4.0 * std::f64::consts::PI) * ratio).sqrt()
    }
}

impl FunctionBasis for RealSphericalHarmonics {
    fn n_components(&self) -> usize {
        let width = self.max_degree as usize + 1;
        width * width
    }

    fn eval(&self, theta: &Tensor, phi: &Tensor) -> PinnResult<Tensor> {
        if theta.dims() != phi.dims() {
            return Err(PinnError::shape_mismatch(
                format!("{:?}", theta.dims()),
                format!("{:?}", phi.dims()),
            ));
        }

        let l_max = self.max_degree;
        let x = theta.cos()?;
        let s = theta.sin()?;
        let sqrt2 = std::f64::consts::SQRT_2;

        let mut columns: Vec<(usize, Tensor)> = Vec::with_capacity(self.n_components());

        // For each order m, walk the associated Legendre functions P_l^m
        // upward in degree: the diagonal seed P_m^m = (2m-1)!! sin^m(theta),
        // then P_{m+1}^m = (2m+1) x P_m^m, then the three-term recurrence
        // (l-m) P_l^m = (2l-1) x P_{l-1}^m - (l+m-1) P_{l-2}^m.
        let mut diagonal = x.ones_like()?;
        for m in 0..=l_max {
            if m > 0 {
                diagonal = diagonal.mul(&s)?.affine(f64::from(2 * m - 1), 0.0)?;
            }

            let angular = if m == 0 {
                None
            } else {
                let m_phi = phi.affine(f64::from(m), 0.0)?;
                Some((m_phi.cos()?, m_phi.sin()?))
            };

            let mut prev2 = diagonal.clone();
            place_order(&mut columns, m, m, &prev2, angular.as_ref(), sqrt2)?;

            if m < l_max {
                let mut prev1 = x.mul(&diagonal)?.affine(f64::from(2 * m + 1), 0.0)?;
                place_order(&mut columns, m + 1, m, &prev1, angular.as_ref(), sqrt2)?;

                for l in (m + 2)..=l_max {
                    let a = f64::from(2 * l - 1) / f64::from(l - m);
                    let b = f64::from(l + m - 1) / f64::from(l - m);
                    let p = x
                        .mul(&prev1)?
                        .affine(a, 0.0)?
                        .sub(&prev2.affine(b, 0.0)?)?;
                    place_order(&mut columns, l, m, &p, angular.as_ref(), sqrt2)?;
                    prev2 = prev1;
                    prev1 = p;
                }
            }
        }

        columns.sort_by_key(|(idx, _)| *idx);
        let refs: Vec<&Tensor> = columns.iter().map(|(_, c)| c).collect();
        Ok(Tensor::cat(&refs, 1)?)
    }
}

// Rescale P_l^m into the Y_{l, +/-m} columns and record them at their
// degree-major indices.
fn place_order(
    columns: &mut Vec<(usize, Tensor)>,
    l: u32,
    m: u32,
    legendre: &Tensor,
    angular: Option<&(Tensor, Tensor)>,
    sqrt2: f64,
) -> PinnResult<()> {
    let base = (l * l + l) as usize;
    let norm = RealSphericalHarmonics::normalizer(l, m);
    match angular {
        None => {
            columns.push((base, legendre.affine(norm, 0.0)?));
        }
        Some((cos_mphi, sin_mphi)) => {
            let scaled = legendre.affine(sqrt2 * norm, 0.0)?;
            columns.push((base + m as usize, scaled.mul(cos_mphi)?));
            columns.push((base - m as usize, scaled.mul(sin_mphi)?));
        }
    }
    Ok(())
}

/// Adapter turning a closure into a [`FunctionBasis`].
///
/// The closure receives `[n, 1]` angle columns and must return exactly
/// `n_components` columns; the width is checked on every evaluation.
#[derive(Clone)]
pub struct CustomBasis {
    n_components: usize,
    eval_fn: Arc<dyn Fn(&Tensor, &Tensor) -> candle_core::Result<Tensor> + Send + Sync>,
}

impl CustomBasis {
    /// Wrap `eval_fn` as a basis of `n_components` functions.
    pub fn new<F>(n_components: usize, eval_fn: F) -> Self
    where
        F: Fn(&Tensor, &Tensor) -> candle_core::Result<Tensor> + Send + Sync + 'static,
    {
        Self {
            n_components,
            eval_fn: Arc::new(eval_fn),
        }
    }
}

impl FunctionBasis for CustomBasis {
    fn n_components(&self) -> usize {
        self.n_components
    }

    fn eval(&self, theta: &Tensor, phi: &Tensor) -> PinnResult<Tensor> {
        let out = (self.eval_fn)(theta, phi)?;
        let width = out.dim(1)?;
        if width != self.n_components {
            return Err(PinnError::shape_mismatch(
                format!("{} basis columns", self.n_components),
                format!("{width} basis columns"),
            ));
        }
        Ok(out)
    }
}

impl std::fmt::Debug for CustomBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomBasis")
            .field("n_components", &self.n_components)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use std::f64::consts::PI;

    fn angle_columns(pairs: &[(f64, f64)]) -> (Tensor, Tensor) {
        let device = Device::Cpu;
        let n = pairs.len();
        let thetas: Vec<f32> = pairs.iter().map(|(t, _)| *t as f32).collect();
        let phis: Vec<f32> = pairs.iter().map(|(_, p)| *p as f32).collect();
        (
            Tensor::from_vec(thetas, (n, 1), &device).unwrap(),
            Tensor::from_vec(phis, (n, 1), &device).unwrap(),
        )
    }

    fn column(matrix: &Tensor, idx: usize) -> Vec<f32> {
        matrix
            .narrow(1, idx, 1)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap()
    }

    fn assert_column_close(matrix: &Tensor, idx: usize, expected: &[f64]) {
        let got = column(matrix, idx);
        assert_eq!(got.len(), expected.len());
        for (g, e) in got.iter().zip(expected) {
            assert!(
                (f64::from(*g) - e).abs() < 1e-5,
                "column {idx}: got {g}, expected {e}"
            );
        }
    }

    const POINTS: [(f64, f64); 4] = [(0.0, 0.0), (0.7, 1.2), (1.9, 4.0), (3.0, 5.5)];

    #[test]
    fn test_component_count_is_square_of_degree_plus_one() {
        for degree in 0..5 {
            let basis = RealSphericalHarmonics::new(degree);
            assert_eq!(basis.n_components(), ((degree + 1) * (degree + 1)) as usize);
        }
    }

    #[test]
    fn test_eval_shape() {
        let basis = RealSphericalHarmonics::new(3);
        let (theta, phi) = angle_columns(&POINTS);
        let out = basis.eval(&theta, &phi).unwrap();
        assert_eq!(out.dims(), &[POINTS.len(), 16]);
    }

    #[test]
    fn test_degree_zero_is_constant() {
        let basis = RealSphericalHarmonics::new(0);
        let (theta, phi) = angle_columns(&POINTS);
        let out = basis.eval(&theta, &phi).unwrap();
        let expected = vec![0.5 / PI.sqrt(); POINTS.len()];
        assert_column_close(&out, 0, &expected);
    }

    #[test]
    fn test_degree_one_closed_forms() {
        let basis = RealSphericalHarmonics::new(1);
        let (theta, phi) = angle_columns(&POINTS);
        let out = basis.eval(&theta, &phi).unwrap();

        let c = (3.0 / (4.0 * PI)).sqrt();
        let y1m1: Vec<f64> = POINTS.iter().map(|(t, p)| c * t.sin() * p.sin()).collect();
        let y10: Vec<f64> = POINTS.iter().map(|(t, _)| c * t.cos()).collect();
        let y11: Vec<f64> = POINTS.iter().map(|(t, p)| c * t.sin() * p.cos()).collect();

        assert_column_close(&out, 1, &y1m1);
        assert_column_close(&out, 2, &y10);
        assert_column_close(&out, 3, &y11);
    }

    #[test]
    fn test_higher_degree_closed_forms() {
        let basis = RealSphericalHarmonics::new(3);
        let (theta, phi) = angle_columns(&POINTS);
        let out = basis.eval(&theta, &phi).unwrap();

        // zonal degree 2 exercises the three-term recurrence once
        let y20: Vec<f64> = POINTS
            .iter()
            .map(|(t, _)| 0.25 * (5.0 / PI).sqrt() * (3.0 * t.cos() * t.cos() - 1.0))
            .collect();
        assert_column_close(&out, 6, &y20);

        // Y_{2,-1} exercises the off-diagonal seed P_{m+1}^m
        let y2m1: Vec<f64> = POINTS
            .iter()
            .map(|(t, p)| 0.5 * (15.0 / PI).sqrt() * t.sin() * t.cos() * p.sin())
            .collect();
        assert_column_close(&out, 5, &y2m1);

        // Y_{2,2} exercises the sectoral double factorial
        let y22: Vec<f64> = POINTS
            .iter()
            .map(|(t, p)| 0.25 * (15.0 / PI).sqrt() * t.sin() * t.sin() * (2.0 * p).cos())
            .collect();
        assert_column_close(&out, 8, &y22);

        // zonal degree 3 exercises a second recurrence step
        let y30: Vec<f64> = POINTS
            .iter()
            .map(|(t, _)| {
                0.25 * (7.0 / PI).sqrt() * (5.0 * t.cos().powi(3) - 3.0 * t.cos())
            })
            .collect();
        assert_column_close(&out, 12, &y30);
    }

    #[test]
    fn test_mismatched_angle_shapes_rejected() {
        let basis = RealSphericalHarmonics::new(1);
        let (theta, _) = angle_columns(&POINTS);
        let (_, phi) = angle_columns(&POINTS[..2]);
        let err = basis.eval(&theta, &phi).unwrap_err();
        assert!(matches!(err, PinnError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_custom_basis_checks_width() {
        let honest = CustomBasis::new(2, |theta, _phi| {
            Tensor::cat(&[&theta.ones_like()?, &theta.cos()?], 1)
        });
        let (theta, phi) = angle_columns(&POINTS);
        let out = honest.eval(&theta, &phi).unwrap();
        assert_eq!(out.dims(), &[POINTS.len(), 2]);

        let lying = CustomBasis::new(3, |theta, _phi| theta.cos());
        let err = lying.eval(&theta, &phi).unwrap_err();
        assert!(matches!(err, PinnError::ShapeMismatch { .. }));
    }
}
