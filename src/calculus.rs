//! Derivative helpers for authoring residual systems.
//!
//! Residual systems differentiate enforced function values with respect to
//! the batch coordinates. [`diff`] wraps the substrate's backward pass so
//! user code never touches gradient stores directly; it requires the
//! coordinate to be a gradient leaf, which every [`crate::generator::SphericalBatch`]
//! column is.

use candle_core::Tensor;

use crate::error::{PinnError, PinnResult};

/// Elementwise derivative `du/dx` of a column `u` with respect to a leaf `x`.
///
/// Computed as the gradient of `sum(u)`, which equals the elementwise
/// derivative whenever `u[i]` depends only on `x[i]` (the usual case for
/// pointwise network outputs over a coordinate column).
///
/// The returned tensor stays in the computation graph: a loss built from it
/// still reaches the network parameters through a later backward pass.
/// Higher-order coordinate derivatives (applying [`diff`] to its own output)
/// are not supported by the substrate.
///
/// # Errors
///
/// Returns [`PinnError::MissingGradient`] when `x` is not a tracked leaf of
/// the graph that produced `u`.
pub fn diff(u: &Tensor, x: &Tensor) -> PinnResult<Tensor> {
    let grads = u.sum_all()?.backward()?;
    grads
        .get(x)
        .cloned()
        .ok_or_else(|| PinnError::missing_gradient("x"))
}
