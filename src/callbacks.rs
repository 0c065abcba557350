//! Cooperative hooks run after every epoch of a `fit` call.
//!
//! Callbacks receive the solver itself and may request early termination
//! through [`crate::solver::SphericalSolver::set_stop_training`]; the flag is
//! honored at the next epoch boundary. Anything else the solver owns is
//! read-only by convention.

use crate::error::PinnResult;
use crate::monitor::Monitor;
use crate::solver::SphericalSolver;

/// Hook invoked after both phases of each epoch, in registration order.
pub trait SolverCallback {
    /// Observe the solver and optionally request a stop.
    fn call(&mut self, solver: &mut SphericalSolver) -> PinnResult<()>;
}

/// Which epoch counter a [`MonitorCallback`] checks its interval against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckAgainst {
    /// Epochs within the current `fit` call.
    Local,
    /// Epochs across all `fit` calls.
    Global,
}

/// Drives a [`Monitor`] from the callback hook instead of the solver's own
/// monitor slot, with a configurable epoch counter.
pub struct MonitorCallback<M> {
    monitor: M,
    check_against: CheckAgainst,
    repaint_last: bool,
}

impl<M: Monitor> MonitorCallback<M> {
    /// Check `monitor` against the local epoch counter and re-check on the
    /// final epoch.
    pub fn new(monitor: M) -> Self {
        Self {
            monitor,
            check_against: CheckAgainst::Local,
            repaint_last: true,
        }
    }

    /// Builder: choose the epoch counter the interval applies to.
    #[must_use]
    pub fn with_check_against(mut self, check_against: CheckAgainst) -> Self {
        self.check_against = check_against;
        self
    }

    /// Builder: whether to force a check on the final epoch of each `fit`.
    #[must_use]
    pub fn with_repaint_last(mut self, repaint_last: bool) -> Self {
        self.repaint_last = repaint_last;
        self
    }

    fn should_check(&self, local_epoch: usize, global_epoch: usize, max_local_epoch: usize) -> bool {
        let epoch_now = match self.check_against {
            CheckAgainst::Local => local_epoch + 1,
            // global_epoch already counts the epoch that just finished
            CheckAgainst::Global => global_epoch,
        };
        if epoch_now % self.monitor.check_every().max(1) == 0 {
            return true;
        }
        self.repaint_last && local_epoch + 1 == max_local_epoch
    }
}

impl<M: Monitor> SolverCallback for MonitorCallback<M> {
    fn call(&mut self, solver: &mut SphericalSolver) -> PinnResult<()> {
        if !self.should_check(
            solver.local_epoch(),
            solver.global_epoch(),
            solver.max_local_epoch(),
        ) {
            return Ok(());
        }
        self.monitor.check(
            solver.nets(),
            solver.conditions(),
            solver.loss_history(),
            solver.analytic_mse_history(),
        )
    }
}

/// Requests a stop when the validation loss has not improved by at least
/// `min_delta` for `patience` consecutive epochs.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f64,
    best: Option<f64>,
    counter: usize,
}

impl EarlyStopping {
    /// Stop after `patience` epochs without an improvement of `min_delta`.
    #[must_use]
    pub const fn new(patience: usize, min_delta: f64) -> Self {
        Self {
            patience,
            min_delta,
            best: None,
            counter: 0,
        }
    }

    /// Epochs since the last improvement.
    #[must_use]
    pub const fn stall_count(&self) -> usize {
        self.counter
    }

    // record one validation loss; true when patience is exhausted
    fn observe(&mut self, loss: f64) -> bool {
        let improved = self
            .best
            .map_or(true, |best| best - loss > self.min_delta);
        if improved {
            self.best = Some(loss);
            self.counter = 0;
            return false;
        }
        self.counter += 1;
        self.counter > self.patience
    }
}

impl SolverCallback for EarlyStopping {
    fn call(&mut self, solver: &mut SphericalSolver) -> PinnResult<()> {
        let Some(&loss) = solver.loss_history().valid.last() else {
            return Ok(());
        };
        if self.observe(loss) {
            tracing::info!(
                valid_loss = loss,
                stalled_epochs = self.counter,
                "early stopping: validation loss plateaued"
            );
            solver.set_stop_training(true);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_early_stopping_tracks_improvement() {
        let mut stopper = EarlyStopping::new(2, 0.0);
        assert!(!stopper.observe(1.0));
        assert!(!stopper.observe(0.8)); // improvement resets the counter
        assert!(!stopper.observe(0.9));
        assert!(!stopper.observe(0.85));
        assert!(stopper.observe(0.9)); // third stalled epoch exceeds patience
    }

    #[test]
    fn test_early_stopping_min_delta() {
        // a shrinking loss that never clears min_delta still counts as a stall
        let mut stopper = EarlyStopping::new(1, 0.5);
        assert!(!stopper.observe(1.0));
        assert!(!stopper.observe(0.9));
        assert!(stopper.observe(0.8));
    }

    #[test]
    fn test_early_stopping_zero_patience() {
        let mut stopper = EarlyStopping::new(0, 0.0);
        assert!(!stopper.observe(1.0));
        assert!(stopper.observe(1.0));
    }

    struct NeverMonitor {
        check_every: usize,
    }

    impl Monitor for NeverMonitor {
        fn check_every(&self) -> usize {
            self.check_every
        }

        fn check(
            &mut self,
            _nets: &[std::sync::Arc<dyn crate::nets::SolutionNet>],
            _conditions: &[crate::conditions::Condition],
            _loss_history: &crate::history::PhasePair<Vec<f64>>,
            _analytic_mse_history: &crate::history::PhasePair<Vec<f64>>,
        ) -> PinnResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_monitor_callback_interval_local() {
        let callback = MonitorCallback::new(NeverMonitor { check_every: 3 });
        // local epochs 2, 5, ... (1-based multiples of 3)
        assert!(!callback.should_check(0, 1, 10));
        assert!(!callback.should_check(1, 2, 10));
        assert!(callback.should_check(2, 3, 10));
        assert!(callback.should_check(5, 6, 10));
    }

    #[test]
    fn test_monitor_callback_interval_global() {
        let callback = MonitorCallback::new(NeverMonitor { check_every: 4 })
            .with_check_against(CheckAgainst::Global);
        // a fresh fit continuing from 6 earlier epochs checks at global 8
        assert!(!callback.should_check(0, 7, 10));
        assert!(callback.should_check(1, 8, 10));
    }

    #[test]
    fn test_monitor_callback_repaint_last() {
        let callback = MonitorCallback::new(NeverMonitor { check_every: 100 });
        assert!(callback.should_check(9, 10, 10));

        let callback = callback.with_repaint_last(false);
        assert!(!callback.should_check(9, 10, 10));
    }
}
