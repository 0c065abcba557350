//! Coordinate sampling for training and validation batches.
//!
//! A [`PointGenerator`] owns the sampling policy entirely; the solver only
//! decides how many batches to draw per epoch. Every coordinate column in a
//! [`SphericalBatch`] is registered as an autodiff leaf so residual systems
//! can differentiate network outputs with respect to the coordinates.

use std::f64::consts::PI;

use candle_core::{DType, Device, Tensor, Var};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{PinnError, PinnResult};

/// One batch of spherical coordinates, stored as `[n, 1]` columns.
///
/// `theta` is the polar angle in `[0, pi]`, `phi` the azimuth in `[0, 2*pi)`.
#[derive(Debug, Clone)]
pub struct SphericalBatch {
    /// Radii.
    pub r: Tensor,
    /// Polar angles.
    pub theta: Tensor,
    /// Azimuthal angles.
    pub phi: Tensor,
}

impl SphericalBatch {
    /// Build a batch from three coordinate tensors of equal element count.
    ///
    /// Each tensor is reshaped to a column and re-registered as a gradient
    /// leaf, whatever shape the generator produced.
    pub fn new(r: &Tensor, theta: &Tensor, phi: &Tensor) -> PinnResult<Self> {
        let n = r.elem_count();
        if theta.elem_count() != n || phi.elem_count() != n {
            return Err(PinnError::shape_mismatch(
                format!("{n} elements in every coordinate"),
                format!(
                    "r={}, theta={}, phi={}",
                    n,
                    theta.elem_count(),
                    phi.elem_count()
                ),
            ));
        }
        Ok(Self {
            r: leaf_column(r, n)?,
            theta: leaf_column(theta, n)?,
            phi: leaf_column(phi, n)?,
        })
    }

    /// Number of points in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.r.elem_count()
    }

    /// Whether the batch holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn leaf_column(values: &Tensor, n: usize) -> PinnResult<Tensor> {
    let column = values.reshape((n, 1))?;
    let leaf = Var::from_tensor(&column)?;
    Ok(leaf.as_tensor().clone())
}

/// Source of fresh coordinate batches.
pub trait PointGenerator: Send {
    /// Number of points per batch.
    fn size(&self) -> usize;

    /// Draw one fresh batch.
    fn generate(&mut self) -> PinnResult<SphericalBatch>;
}

/// Radial sampling policy for [`SphericalGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadialSampling {
    /// Stratified in shell volume: radii are uniform over the ball volume,
    /// so outer regions receive proportionally more points.
    VolumeUniformNoisy,
    /// Stratified in radius: radii are uniform over `[r_min, r_max]`.
    RadiusUniformNoisy,
}

/// Samples points in the spherical shell `r_min <= r <= r_max`.
///
/// Radii are drawn from jittered strata (one sample per equal-measure cell),
/// angles are area-uniform over the sphere. Seed the generator for
/// reproducible batches.
pub struct SphericalGenerator {
    size: usize,
    r_min: f64,
    r_max: f64,
    method: RadialSampling,
    dtype: DType,
    device: Device,
    rng: StdRng,
}

impl SphericalGenerator {
    /// Create a generator over the shell `[r_min, r_max]`.
    ///
    /// # Errors
    ///
    /// Returns an error when `size` is zero or the radii are not an ordered
    /// non-negative finite pair.
    pub fn new(size: usize, r_min: f64, r_max: f64) -> PinnResult<Self> {
        if size == 0 {
            return Err(PinnError::invalid_config("generator size must be positive"));
        }
        if !(r_min.is_finite() && r_max.is_finite()) || r_min < 0.0 || r_max <= r_min {
            return Err(PinnError::invalid_config(format!(
                "expected 0 <= r_min < r_max, got r_min={r_min}, r_max={r_max}"
            )));
        }
        Ok(Self {
            size,
            r_min,
            r_max,
            method: RadialSampling::VolumeUniformNoisy,
            dtype: DType::F32,
            device: Device::Cpu,
            rng: StdRng::from_entropy(),
        })
    }

    /// Builder: set the radial sampling policy.
    #[must_use]
    pub fn with_method(mut self, method: RadialSampling) -> Self {
        self.method = method;
        self
    }

    /// Builder: seed the internal RNG for reproducible batches.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Builder: set the tensor dtype of generated batches.
    #[must_use]
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Builder: set the device batches are generated on.
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    fn radius(&mut self, stratum: f64) -> f64 {
        match self.method {
            RadialSampling::RadiusUniformNoisy => self.r_min + (self.r_max - self.r_min) * stratum,
            RadialSampling::VolumeUniformNoisy => {
                let lo = self.r_min.powi(3);
                let hi = self.r_max.powi(3);
                (lo + (hi - lo) * stratum).cbrt()
            }
        }
    }

    fn column(&self, values: Vec<f64>) -> PinnResult<Tensor> {
        let n = values.len();
        let tensor = Tensor::from_vec(values, (n, 1), &self.device)?.to_dtype(self.dtype)?;
        Ok(tensor)
    }
}

impl PointGenerator for SphericalGenerator {
    fn size(&self) -> usize {
        self.size
    }

    fn generate(&mut self) -> PinnResult<SphericalBatch> {
        let n = self.size;
        let mut rs = Vec::with_capacity(n);
        let mut thetas = Vec::with_capacity(n);
        let mut phis = Vec::with_capacity(n);

        for i in 0..n {
            // one jittered sample per stratum keeps radial coverage even
            let stratum = (i as f64 + self.rng.gen::<f64>()) / n as f64;
            rs.push(self.radius(stratum));
            thetas.push((1.0 - 2.0 * self.rng.gen::<f64>()).acos());
            phis.push(2.0 * PI * self.rng.gen::<f64>());
        }

        let r = self.column(rs)?;
        let theta = self.column(thetas)?;
        let phi = self.column(phis)?;
        SphericalBatch::new(&r, &theta, &phi)
    }
}
