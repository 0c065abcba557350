//! Training and validation orchestration for spherical PDE systems.
//!
//! [`SphericalSolver`] owns one (network, condition) pair per dependent
//! variable, a shared optimizer, and one point generator per phase. Each
//! epoch runs a training phase followed by a validation phase: every batch
//! contributes a normalized loss, training batches backpropagate immediately
//! so gradients accumulate while each batch's graph is released, and a
//! single optimizer step closes the training phase. Validation never touches
//! parameters; it only updates the loss history and the best-model snapshot.
//!
//! Failures from the generator, residual system, criterion, or optimizer are
//! never caught inside the loop: they abort the running `fit` call and leave
//! the histories as accumulated up to the last completed epoch.

use std::sync::Arc;

use candle_core::{DType, Device, Tensor};

use crate::basis::FunctionBasis;
use crate::callbacks::SolverCallback;
use crate::conditions::Condition;
use crate::error::{PinnError, PinnResult};
use crate::generator::{PointGenerator, SphericalBatch, SphericalGenerator};
use crate::history::{PhasePair, TrainingPhase};
use crate::monitor::Monitor;
use crate::nets::{Fcnn, FcnnConfig, SolutionNet};
use crate::optim::{Adam, AdamConfig, Optimizer};
use crate::solution::{HarmonicSolution, SphericalSolution};

/// Points per batch of the default generators.
const DEFAULT_GENERATOR_SIZE: usize = 512;

/// PDE system: maps enforced function values and the batch coordinates to
/// one residual per dependent variable, each broadcastable to `[n, 1]`.
pub type ResidualSystem =
    Arc<dyn Fn(&[Tensor], &SphericalBatch) -> PinnResult<Vec<Tensor>> + Send + Sync>;

/// Reduction from the concatenated `[n, n_funcs]` residual matrix to a
/// scalar loss tensor.
pub type CriterionFn = Arc<dyn Fn(&Tensor) -> PinnResult<Tensor> + Send + Sync>;

/// Reference solution: maps the batch coordinates to one value tensor per
/// dependent variable, shaped like the corresponding network output.
pub type AnalyticSolutions =
    Arc<dyn Fn(&SphericalBatch) -> PinnResult<Vec<Tensor>> + Send + Sync>;

/// Override for condition enforcement; receives the raw network, its
/// condition, and the full batch.
pub type EnforcerFn =
    Arc<dyn Fn(&dyn SolutionNet, &Condition, &SphericalBatch) -> PinnResult<Tensor> + Send + Sync>;

/// Auxiliary scalar loss added to the criterion output each batch, e.g. for
/// regularization or extra physical constraints.
pub type AdditionalLossFn =
    Arc<dyn Fn(&[Tensor], &SphericalBatch, TrainingPhase) -> PinnResult<Tensor> + Send + Sync>;

/// Configures and validates a [`SphericalSolver`].
///
/// Every configuration error surfaces in [`SphericalSolverBuilder::build`],
/// never inside the training loop.
pub struct SphericalSolverBuilder {
    residuals: ResidualSystem,
    conditions: Vec<Condition>,
    r_min: Option<f64>,
    r_max: Option<f64>,
    nets: Option<Vec<Box<dyn SolutionNet>>>,
    train_generator: Option<Box<dyn PointGenerator>>,
    valid_generator: Option<Box<dyn PointGenerator>>,
    optimizer: Option<Box<dyn Optimizer>>,
    criterion: Option<CriterionFn>,
    analytic_solutions: Option<AnalyticSolutions>,
    enforcer: Option<EnforcerFn>,
    additional_loss: Option<AdditionalLossFn>,
    n_batches_train: usize,
    n_batches_valid: usize,
    dtype: DType,
    device: Device,
}

impl SphericalSolverBuilder {
    /// Builder: set the shell radii used for default generators and reported
    /// by [`SphericalSolver::internals`].
    #[must_use]
    pub fn with_domain(mut self, r_min: f64, r_max: f64) -> Self {
        self.r_min = Some(r_min);
        self.r_max = Some(r_max);
        self
    }

    /// Builder: supply one network per condition instead of the defaults.
    #[must_use]
    pub fn with_nets(mut self, nets: Vec<Box<dyn SolutionNet>>) -> Self {
        self.nets = Some(nets);
        self
    }

    /// Builder: supply the training-phase point generator.
    #[must_use]
    pub fn with_train_generator(mut self, generator: Box<dyn PointGenerator>) -> Self {
        self.train_generator = Some(generator);
        self
    }

    /// Builder: supply the validation-phase point generator.
    #[must_use]
    pub fn with_valid_generator(mut self, generator: Box<dyn PointGenerator>) -> Self {
        self.valid_generator = Some(generator);
        self
    }

    /// Builder: supply the optimizer. It must already hold the parameter
    /// handles of every network passed to [`SphericalSolverBuilder::with_nets`].
    #[must_use]
    pub fn with_optimizer(mut self, optimizer: Box<dyn Optimizer>) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    /// Builder: replace the default mean-of-squared-residuals criterion.
    #[must_use]
    pub fn with_criterion<F>(mut self, criterion: F) -> Self
    where
        F: Fn(&Tensor) -> PinnResult<Tensor> + Send + Sync + 'static,
    {
        self.criterion = Some(Arc::new(criterion));
        self
    }

    /// Builder: track squared error against a reference solution.
    #[must_use]
    pub fn with_analytic_solutions<F>(mut self, analytic: F) -> Self
    where
        F: Fn(&SphericalBatch) -> PinnResult<Vec<Tensor>> + Send + Sync + 'static,
    {
        self.analytic_solutions = Some(Arc::new(analytic));
        self
    }

    /// Builder: override condition enforcement entirely.
    #[must_use]
    pub fn with_enforcer<F>(mut self, enforcer: F) -> Self
    where
        F: Fn(&dyn SolutionNet, &Condition, &SphericalBatch) -> PinnResult<Tensor>
            + Send
            + Sync
            + 'static,
    {
        self.enforcer = Some(Arc::new(enforcer));
        self
    }

    /// Builder: add an auxiliary loss term on top of the criterion output.
    #[must_use]
    pub fn with_additional_loss<F>(mut self, additional: F) -> Self
    where
        F: Fn(&[Tensor], &SphericalBatch, TrainingPhase) -> PinnResult<Tensor>
            + Send
            + Sync
            + 'static,
    {
        self.additional_loss = Some(Arc::new(additional));
        self
    }

    /// Builder: batches drawn per training phase (default 1).
    #[must_use]
    pub const fn with_n_batches_train(mut self, n: usize) -> Self {
        self.n_batches_train = n;
        self
    }

    /// Builder: batches drawn per validation phase (default 4).
    #[must_use]
    pub const fn with_n_batches_valid(mut self, n: usize) -> Self {
        self.n_batches_valid = n;
        self
    }

    /// Builder: dtype for default networks and generators.
    #[must_use]
    pub const fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Builder: device for default networks and generators.
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Validate the configuration and assemble the solver.
    ///
    /// # Errors
    ///
    /// Returns [`PinnError::InvalidConfig`] when no condition is given, a
    /// batch count is zero, a generator is missing on either side without a
    /// domain pair to build the default from, or the network count does not
    /// match the condition count.
    pub fn build(self) -> PinnResult<SphericalSolver> {
        if self.conditions.is_empty() {
            return Err(PinnError::invalid_config(
                "at least one condition is required",
            ));
        }
        if self.n_batches_train == 0 || self.n_batches_valid == 0 {
            return Err(PinnError::invalid_config(format!(
                "batch counts must be positive, got n_batches_train={}, n_batches_valid={}",
                self.n_batches_train, self.n_batches_valid
            )));
        }
        if (self.train_generator.is_none() || self.valid_generator.is_none())
            && (self.r_min.is_none() || self.r_max.is_none())
        {
            return Err(PinnError::invalid_config(format!(
                "either both generators or both domain radii must be provided: \
                 got r_min={:?}, r_max={:?}, train_generator={}, valid_generator={}",
                self.r_min,
                self.r_max,
                if self.train_generator.is_some() { "set" } else { "omitted" },
                if self.valid_generator.is_some() { "set" } else { "omitted" },
            )));
        }

        let n_funcs = self.conditions.len();
        let nets: Vec<Arc<dyn SolutionNet>> = match self.nets {
            Some(nets) => {
                if nets.len() != n_funcs {
                    return Err(PinnError::invalid_config(format!(
                        "got {} networks for {} conditions; counts must match",
                        nets.len(),
                        n_funcs
                    )));
                }
                nets.into_iter().map(Arc::from).collect()
            }
            None => {
                let mut nets: Vec<Arc<dyn SolutionNet>> = Vec::with_capacity(n_funcs);
                for condition in &self.conditions {
                    let config = match condition {
                        Condition::Spherical(_) => FcnnConfig::default(),
                        Condition::Harmonic(c) => FcnnConfig::default()
                            .with_input_units(1)
                            .with_output_units(c.n_coefficients().unwrap_or(1)),
                    };
                    nets.push(Arc::new(Fcnn::new(&config, self.dtype, &self.device)?));
                }
                nets
            }
        };

        let train_generator = match self.train_generator {
            Some(generator) => generator,
            None => default_generator(self.r_min, self.r_max, self.dtype, &self.device)?,
        };
        let valid_generator = match self.valid_generator {
            Some(generator) => generator,
            None => default_generator(self.r_min, self.r_max, self.dtype, &self.device)?,
        };

        let optimizer = match self.optimizer {
            Some(optimizer) => optimizer,
            None => {
                let mut vars = Vec::new();
                for net in &nets {
                    vars.extend(net.trainable_vars());
                }
                Box::new(Adam::new(vars, AdamConfig::default()))
            }
        };

        let criterion = self
            .criterion
            .unwrap_or_else(|| Arc::new(|residuals: &Tensor| Ok(residuals.sqr()?.mean_all()?)));

        Ok(SphericalSolver {
            residuals: self.residuals,
            conditions: self.conditions,
            nets,
            n_funcs,
            r_min: self.r_min,
            r_max: self.r_max,
            generators: PhasePair::new(train_generator, valid_generator),
            optimizer,
            criterion,
            analytic_solutions: self.analytic_solutions,
            enforcer: self.enforcer,
            additional_loss: self.additional_loss,
            n_batches: PhasePair::new(self.n_batches_train, self.n_batches_valid),
            loss: PhasePair::default(),
            analytic_mse: PhasePair::default(),
            latest_batch: PhasePair::new(None, None),
            best_nets: None,
            lowest_loss: None,
            local_epoch: 0,
            max_local_epoch: 0,
            stop_training: false,
            phase: None,
        })
    }
}

fn default_generator(
    r_min: Option<f64>,
    r_max: Option<f64>,
    dtype: DType,
    device: &Device,
) -> PinnResult<Box<dyn PointGenerator>> {
    let r_min = r_min.ok_or_else(|| PinnError::invalid_config("default generator needs r_min"))?;
    let r_max = r_max.ok_or_else(|| PinnError::invalid_config("default generator needs r_max"))?;
    let generator = SphericalGenerator::new(DEFAULT_GENERATOR_SIZE, r_min, r_max)?
        .with_dtype(dtype)
        .with_device(device.clone());
    Ok(Box::new(generator))
}

fn scalar_f64(value: &Tensor) -> PinnResult<f64> {
    Ok(value.to_dtype(DType::F64)?.mean_all()?.to_scalar::<f64>()?)
}

/// Trains coupled networks to satisfy a PDE system in spherical coordinates.
///
/// # Example
///
/// ```ignore
/// use spherical_pinn_rs::conditions::{constant_surface, SphericalCondition};
/// use spherical_pinn_rs::solver::SphericalSolver;
///
/// let condition = SphericalCondition::dirichlet(
///     1.0,
///     constant_surface(0.0),
///     Some(2.0),
///     Some(constant_surface(1.0)),
/// )?;
/// let mut solver = SphericalSolver::builder(
///     |funcs, batch| {
///         let du_dr = spherical_pinn_rs::calculus::diff(&funcs[0], &batch.r)?;
///         Ok(vec![du_dr.affine(1.0, -1.0)?])
///     },
///     vec![condition.into()],
/// )
/// .with_domain(1.0, 2.0)
/// .build()?;
///
/// solver.fit(500, None, &mut [])?;
/// let solution = solver.get_solution(true, true)?;
/// ```
pub struct SphericalSolver {
    residuals: ResidualSystem,
    conditions: Vec<Condition>,
    nets: Vec<Arc<dyn SolutionNet>>,
    n_funcs: usize,
    r_min: Option<f64>,
    r_max: Option<f64>,
    generators: PhasePair<Box<dyn PointGenerator>>,
    optimizer: Box<dyn Optimizer>,
    criterion: CriterionFn,
    analytic_solutions: Option<AnalyticSolutions>,
    enforcer: Option<EnforcerFn>,
    additional_loss: Option<AdditionalLossFn>,
    n_batches: PhasePair<usize>,
    loss: PhasePair<Vec<f64>>,
    analytic_mse: PhasePair<Vec<f64>>,
    latest_batch: PhasePair<Option<SphericalBatch>>,
    best_nets: Option<Vec<Arc<dyn SolutionNet>>>,
    lowest_loss: Option<f64>,
    local_epoch: usize,
    max_local_epoch: usize,
    stop_training: bool,
    phase: Option<TrainingPhase>,
}

impl SphericalSolver {
    /// Start configuring a solver for `residuals` with one condition per
    /// dependent variable.
    pub fn builder<F>(residuals: F, conditions: Vec<Condition>) -> SphericalSolverBuilder
    where
        F: Fn(&[Tensor], &SphericalBatch) -> PinnResult<Vec<Tensor>> + Send + Sync + 'static,
    {
        SphericalSolverBuilder {
            residuals: Arc::new(residuals),
            conditions,
            r_min: None,
            r_max: None,
            nets: None,
            train_generator: None,
            valid_generator: None,
            optimizer: None,
            criterion: None,
            analytic_solutions: None,
            enforcer: None,
            additional_loss: None,
            n_batches_train: 1,
            n_batches_valid: 4,
            dtype: DType::F32,
            device: Device::Cpu,
        }
    }

    /// Run `max_epochs` epochs of training followed by validation.
    ///
    /// After both phases of an epoch, every callback runs in order; the
    /// monitor is then checked when the local epoch count reaches a multiple
    /// of its interval or on the final epoch. A callback may request a stop
    /// via [`SphericalSolver::set_stop_training`]; the flag is honored at the
    /// top of the next epoch, never mid-batch.
    ///
    /// # Errors
    ///
    /// Propagates the first failure from a generator, the residual system,
    /// the criterion, the optimizer, a callback, or the monitor; the
    /// histories keep everything accumulated up to the last completed epoch.
    pub fn fit(
        &mut self,
        max_epochs: usize,
        mut monitor: Option<&mut dyn Monitor>,
        callbacks: &mut [Box<dyn SolverCallback>],
    ) -> PinnResult<()> {
        self.stop_training = false;
        self.max_local_epoch = max_epochs;
        tracing::info!(max_epochs, n_funcs = self.n_funcs, "starting fit");

        for local_epoch in 0..max_epochs {
            if self.stop_training {
                tracing::info!(local_epoch, "stop requested by callback; ending fit early");
                break;
            }
            self.local_epoch = local_epoch;

            self.run_train_epoch()?;
            self.run_valid_epoch()?;
            tracing::debug!(
                local_epoch,
                global_epoch = self.global_epoch(),
                train_loss = self.loss.train.last().copied().unwrap_or(f64::NAN),
                valid_loss = self.loss.valid.last().copied().unwrap_or(f64::NAN),
                "epoch complete"
            );

            for callback in callbacks.iter_mut() {
                callback.call(self)?;
            }

            if let Some(monitor) = monitor.as_deref_mut() {
                let check_every = monitor.check_every().max(1);
                if (local_epoch + 1) % check_every == 0 || local_epoch + 1 == max_epochs {
                    monitor.check(&self.nets, &self.conditions, &self.loss, &self.analytic_mse)?;
                }
            }
        }
        Ok(())
    }

    /// Run one training epoch: accumulate gradients over the configured
    /// number of batches, append to the train loss history, then perform a
    /// single optimizer step and clear the gradients.
    pub fn run_train_epoch(&mut self) -> PinnResult<()> {
        self.run_epoch(TrainingPhase::Train)
    }

    /// Run one validation epoch: append to the valid loss history and update
    /// the best-model snapshot on a strict improvement. Parameters are never
    /// mutated.
    pub fn run_valid_epoch(&mut self) -> PinnResult<()> {
        self.run_epoch(TrainingPhase::Valid)
    }

    fn run_epoch(&mut self, phase: TrainingPhase) -> PinnResult<()> {
        self.phase = Some(phase);
        let n_batches = *self.n_batches.get(phase);
        let mut epoch_loss = 0.0;
        let mut epoch_analytic_mse = 0.0;

        for _ in 0..n_batches {
            let batch = self.generators.get_mut(phase).generate()?;

            let mut funcs = Vec::with_capacity(self.n_funcs);
            for (net, condition) in self.nets.iter().zip(&self.conditions) {
                let value = match &self.enforcer {
                    Some(enforcer) => enforcer(net.as_ref(), condition, &batch)?,
                    None => condition.enforce(net.as_ref(), &batch)?,
                };
                funcs.push(value);
            }

            if let Some(analytic) = &self.analytic_solutions {
                let references = analytic(&batch)?;
                if references.len() != self.n_funcs {
                    return Err(PinnError::shape_mismatch(
                        format!("{} analytic solutions", self.n_funcs),
                        format!("{}", references.len()),
                    ));
                }
                for (predicted, reference) in funcs.iter().zip(&references) {
                    let mse = predicted.broadcast_sub(reference)?.sqr()?.mean_all()?;
                    epoch_analytic_mse += scalar_f64(&mse)?;
                }
            }

            let residuals = (self.residuals)(&funcs, &batch)?;
            if residuals.len() != self.n_funcs {
                return Err(PinnError::shape_mismatch(
                    format!("{} residuals", self.n_funcs),
                    format!("{}", residuals.len()),
                ));
            }
            let residuals = Tensor::cat(&residuals, 1)?;

            let mut loss = (self.criterion)(&residuals)?;
            if let Some(additional) = &self.additional_loss {
                loss = (loss + additional(&funcs, &batch, phase)?)?;
            }
            // average across batches instead of summing
            let loss = (loss / n_batches as f64)?;

            // backpropagate per batch so each graph is released before the
            // next batch while gradients keep accumulating
            if phase == TrainingPhase::Train {
                self.optimizer.backward(&loss)?;
            }
            epoch_loss += scalar_f64(&loss)?;

            *self.latest_batch.get_mut(phase) = Some(batch);
        }

        self.loss.get_mut(phase).push(epoch_loss);

        match phase {
            TrainingPhase::Train => {
                self.optimizer.step()?;
                self.optimizer.zero_grad();
            }
            TrainingPhase::Valid => self.update_best()?,
        }

        if self.analytic_solutions.is_some() {
            let normalized = epoch_analytic_mse / (n_batches * self.n_funcs) as f64;
            self.analytic_mse.get_mut(phase).push(normalized);
        }
        Ok(())
    }

    fn update_best(&mut self) -> PinnResult<()> {
        let Some(&current) = self.loss.valid.last() else {
            return Ok(());
        };
        // ties never replace the snapshot
        if self.lowest_loss.map_or(true, |lowest| current < lowest) {
            let mut snapshot: Vec<Arc<dyn SolutionNet>> = Vec::with_capacity(self.nets.len());
            for net in &self.nets {
                snapshot.push(Arc::from(net.clone_snapshot()?));
            }
            self.best_nets = Some(snapshot);
            self.lowest_loss = Some(current);
            tracing::debug!(valid_loss = current, "new best snapshot");
        }
        Ok(())
    }

    /// Evaluator bound to the best (`best = true`) or current network set,
    /// either as an independent copy or sharing the live parameters.
    ///
    /// # Errors
    ///
    /// Requesting the best set before any validation epoch has recorded a
    /// snapshot is an invalid configuration.
    pub fn get_solution(&self, copy: bool, best: bool) -> PinnResult<SphericalSolution> {
        SphericalSolution::new(self.solution_nets(copy, best)?, self.conditions.clone())
    }

    /// Like [`SphericalSolver::get_solution`], but contracting coefficient
    /// outputs against `basis`.
    pub fn get_harmonic_solution(
        &self,
        copy: bool,
        best: bool,
        basis: Arc<dyn FunctionBasis>,
    ) -> PinnResult<HarmonicSolution> {
        HarmonicSolution::new(
            self.solution_nets(copy, best)?,
            self.conditions.clone(),
            Some(basis),
            None,
        )
    }

    fn solution_nets(&self, copy: bool, best: bool) -> PinnResult<Vec<Arc<dyn SolutionNet>>> {
        let source = if best {
            self.best_nets.as_ref().ok_or_else(|| {
                PinnError::invalid_config(
                    "no best snapshot recorded yet; run at least one validation epoch",
                )
            })?
        } else {
            &self.nets
        };
        if copy {
            let mut nets: Vec<Arc<dyn SolutionNet>> = Vec::with_capacity(source.len());
            for net in source {
                nets.push(Arc::from(net.clone_snapshot()?));
            }
            Ok(nets)
        } else {
            Ok(source.iter().map(Arc::clone).collect())
        }
    }

    /// Read-only snapshot of the solver's bookkeeping state.
    #[must_use]
    pub fn internals(&self) -> SolverInternals {
        SolverInternals {
            n_funcs: self.n_funcs,
            r_min: self.r_min,
            r_max: self.r_max,
            n_batches: self.n_batches.clone(),
            global_epoch: self.global_epoch(),
            local_epoch: self.local_epoch,
            max_local_epoch: self.max_local_epoch,
            lowest_loss: self.lowest_loss,
            has_best_nets: self.best_nets.is_some(),
            loss: self.loss.clone(),
            analytic_mse: self.analytic_mse.clone(),
            phase: self.phase,
        }
    }

    /// Number of dependent variables.
    #[must_use]
    pub const fn n_funcs(&self) -> usize {
        self.n_funcs
    }

    /// The live networks, one per dependent variable.
    #[must_use]
    pub fn nets(&self) -> &[Arc<dyn SolutionNet>] {
        &self.nets
    }

    /// The conditions, index-paired with [`SphericalSolver::nets`].
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// The best snapshot so far, if a validation epoch has recorded one.
    #[must_use]
    pub fn best_nets(&self) -> Option<&[Arc<dyn SolutionNet>]> {
        self.best_nets.as_deref()
    }

    /// Lowest validation loss observed so far.
    #[must_use]
    pub const fn lowest_loss(&self) -> Option<f64> {
        self.lowest_loss
    }

    /// Train/valid loss histories, one entry per epoch.
    #[must_use]
    pub const fn loss_history(&self) -> &PhasePair<Vec<f64>> {
        &self.loss
    }

    /// Train/valid analytic-MSE histories; empty unless a reference solution
    /// is configured.
    #[must_use]
    pub const fn analytic_mse_history(&self) -> &PhasePair<Vec<f64>> {
        &self.analytic_mse
    }

    /// Total training epochs ever run; always equals the train loss history
    /// length.
    #[must_use]
    pub fn global_epoch(&self) -> usize {
        self.loss.train.len()
    }

    /// Zero-based epoch index within the current or most recent `fit` call.
    #[must_use]
    pub const fn local_epoch(&self) -> usize {
        self.local_epoch
    }

    /// The `max_epochs` of the current or most recent `fit` call.
    #[must_use]
    pub const fn max_local_epoch(&self) -> usize {
        self.max_local_epoch
    }

    /// Phase of the most recent epoch run, if any.
    #[must_use]
    pub const fn phase(&self) -> Option<TrainingPhase> {
        self.phase
    }

    /// Most recent batch drawn for `phase`, kept for auxiliary loss terms.
    #[must_use]
    pub const fn latest_batch(&self, phase: TrainingPhase) -> Option<&SphericalBatch> {
        self.latest_batch.get(phase).as_ref()
    }

    /// Request (or cancel) a cooperative stop; honored at the next epoch
    /// boundary of a running `fit`.
    pub fn set_stop_training(&mut self, stop: bool) {
        self.stop_training = stop;
    }
}

impl std::fmt::Debug for SphericalSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SphericalSolver")
            .field("n_funcs", &self.n_funcs)
            .field("r_min", &self.r_min)
            .field("r_max", &self.r_max)
            .field("global_epoch", &self.global_epoch())
            .field("lowest_loss", &self.lowest_loss)
            .finish_non_exhaustive()
    }
}

/// Serializable view of the solver's bookkeeping, for callbacks, logging,
/// and offline analysis.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SolverInternals {
    /// Number of dependent variables.
    pub n_funcs: usize,
    /// Inner shell radius, when a domain was configured.
    pub r_min: Option<f64>,
    /// Outer shell radius, when a domain was configured.
    pub r_max: Option<f64>,
    /// Batches drawn per phase per epoch.
    pub n_batches: PhasePair<usize>,
    /// Total training epochs ever run.
    pub global_epoch: usize,
    /// Epoch index within the current `fit` call.
    pub local_epoch: usize,
    /// `max_epochs` of the current `fit` call.
    pub max_local_epoch: usize,
    /// Lowest validation loss so far.
    pub lowest_loss: Option<f64>,
    /// Whether a best snapshot exists.
    pub has_best_nets: bool,
    /// Loss histories.
    pub loss: PhasePair<Vec<f64>>,
    /// Analytic-MSE histories.
    pub analytic_mse: PhasePair<Vec<f64>>,
    /// Phase of the most recent epoch.
    pub phase: Option<TrainingPhase>,
}

impl SolverInternals {
    /// Serialize the snapshot to a JSON string.
    pub fn to_json(&self) -> PinnResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
