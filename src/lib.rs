//! # spherical-pinn-rs
//!
//! Physics-informed training of neural networks for PDE systems posed in
//! spherical coordinates, with boundary conditions satisfied *exactly*
//! through closed-form analytic blending instead of penalty terms.
//!
//! ## Key Properties
//!
//! - **Exact boundaries**: Dirichlet data at an inner radius, an outer
//!   radius, or at infinity are built into the solution analytically; the
//!   residual loss never trades interior accuracy against boundary accuracy
//! - **Coupled systems**: one network and one condition per dependent
//!   variable, trained jointly against a shared residual system
//! - **Harmonic-coefficient mode**: solutions may be expressed as a
//!   radius-only coefficient vector contracted with an angular basis such as
//!   real spherical harmonics
//! - **Bounded memory**: training batches backpropagate one at a time, so
//!   gradients accumulate across batches while each graph is released
//!
//! ## Quick Start
//!
//! ```ignore
//! use spherical_pinn_rs::prelude::*;
//!
//! // u(1) = 0 and u(2) = 1, enforced exactly
//! let condition = SphericalCondition::dirichlet(
//!     1.0,
//!     constant_surface(0.0),
//!     Some(2.0),
//!     Some(constant_surface(1.0)),
//! )?;
//!
//! let mut solver = SphericalSolver::builder(
//!     |funcs, batch| {
//!         let du_dr = diff(&funcs[0], &batch.r)?;
//!         Ok(vec![du_dr.affine(1.0, -1.0)?])
//!     },
//!     vec![condition.into()],
//! )
//! .with_domain(1.0, 2.0)
//! .build()?;
//!
//! solver.fit(500, None, &mut [])?;
//! let solution = solver.get_solution(true, true)?;
//! # Ok::<(), spherical_pinn_rs::PinnError>(())
//! ```
//!
//! ## Modules
//!
//! - [`conditions`]: boundary-condition enforcement algebra
//! - [`basis`]: angular function bases (real spherical harmonics)
//! - [`nets`]: the [`nets::SolutionNet`] seam and the bundled [`nets::Fcnn`]
//! - [`generator`]: coordinate sampling for training and validation
//! - [`optim`]: accumulating Adam optimizer
//! - [`calculus`]: derivative helper for authoring residual systems
//! - [`solver`]: the training/validation loop
//! - [`solution`]: read-only evaluators over frozen networks
//! - [`monitor`] / [`callbacks`]: epoch-boundary observation and hooks
//! - [`history`] / [`error`]: bookkeeping and error types

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]

pub mod basis;
pub mod calculus;
pub mod callbacks;
pub mod conditions;
pub mod error;
pub mod generator;
pub mod history;
pub mod monitor;
pub mod nets;
pub mod optim;
pub mod solution;
pub mod solver;

pub use basis::{CustomBasis, FunctionBasis, RealSphericalHarmonics};
pub use calculus::diff;
pub use callbacks::{CheckAgainst, EarlyStopping, MonitorCallback, SolverCallback};
pub use conditions::{
    constant_surface, surface, Condition, HarmonicCondition, SphericalCondition, SurfaceFn,
};
pub use error::{PinnError, PinnResult};
pub use generator::{PointGenerator, RadialSampling, SphericalBatch, SphericalGenerator};
pub use history::{HistoryStatistics, PhasePair, TrainingPhase};
pub use monitor::{Monitor, RadialScale, SolutionMonitor};
pub use nets::{Activation, Fcnn, FcnnConfig, SolutionNet};
pub use optim::{Adam, AdamConfig, Optimizer};
pub use solution::{HarmonicSolution, SphericalSolution};
pub use solver::{SolverInternals, SphericalSolver, SphericalSolverBuilder};

/// Common imports for building and training spherical solvers.
pub mod prelude {
    pub use crate::basis::{CustomBasis, FunctionBasis, RealSphericalHarmonics};
    pub use crate::calculus::diff;
    pub use crate::callbacks::{EarlyStopping, MonitorCallback, SolverCallback};
    pub use crate::conditions::{
        constant_surface, surface, Condition, HarmonicCondition, SphericalCondition,
    };
    pub use crate::error::{PinnError, PinnResult};
    pub use crate::generator::{PointGenerator, SphericalBatch, SphericalGenerator};
    pub use crate::history::{PhasePair, TrainingPhase};
    pub use crate::monitor::{Monitor, SolutionMonitor};
    pub use crate::nets::{Activation, Fcnn, FcnnConfig, SolutionNet};
    pub use crate::optim::{Adam, AdamConfig, Optimizer};
    pub use crate::solution::{HarmonicSolution, SphericalSolution};
    pub use crate::solver::SphericalSolver;
}
