//! Laplace's equation on a spherical shell with exact Dirichlet data.
//!
//! Solves the spherically symmetric Laplace equation as a first-order
//! system: with `v = du/dr`, the residuals are `du/dr - v` and
//! `dv/dr + 2v/r`. Boundary data `u(1) = 0`, `u(2) = 1` are enforced
//! analytically, so the trained solution satisfies them exactly; the
//! analytic reference is `u = 2 - 2/r`.
//!
//! Run with `cargo run --example laplace_dirichlet`.

use candle_core::Tensor;
use spherical_pinn_rs::prelude::*;

fn main() -> PinnResult<()> {
    tracing_subscriber::fmt::init();

    let u_condition = SphericalCondition::dirichlet(
        1.0,
        constant_surface(0.0),
        Some(2.0),
        Some(constant_surface(1.0)),
    )?;
    let v_condition = SphericalCondition::Unconstrained;

    let mut solver = SphericalSolver::builder(
        |funcs: &[Tensor], batch: &SphericalBatch| {
            let u = &funcs[0];
            let v = &funcs[1];
            let du_dr = diff(u, &batch.r)?;
            let dv_dr = diff(v, &batch.r)?;
            // u' = v and v' + 2v/r = 0
            let first = (du_dr - v)?;
            let second = (dv_dr + v.broadcast_div(&batch.r)?.affine(2.0, 0.0)?)?;
            Ok(vec![first, second])
        },
        vec![u_condition.into(), v_condition.into()],
    )
    .with_domain(1.0, 2.0)
    .with_analytic_solutions(|batch: &SphericalBatch| {
        let u = batch.r.recip()?.affine(-2.0, 2.0)?;
        let v = batch.r.sqr()?.recip()?.affine(2.0, 0.0)?;
        Ok(vec![u, v])
    })
    .build()?;

    let mut monitor = SolutionMonitor::new(1.0, 2.0)?
        .with_check_every(100)
        .with_var_names(vec!["u".into(), "du_dr".into()]);
    let mut callbacks: Vec<Box<dyn SolverCallback>> =
        vec![Box::new(EarlyStopping::new(100, 1e-7))];

    solver.fit(500, Some(&mut monitor), &mut callbacks)?;
    tracing::info!(
        lowest_valid_loss = solver.lowest_loss().unwrap_or(f64::NAN),
        epochs = solver.global_epoch(),
        "training finished"
    );

    let solution = solver.get_solution(true, true)?;
    let device = candle_core::Device::Cpu;
    let rs = Tensor::from_vec(vec![1.0f32, 1.25, 1.5, 1.75, 2.0], 5, &device)?;
    let thetas = rs.zeros_like()?.affine(1.0, 1.0)?;
    let phis = rs.zeros_like()?;

    let values = solution.evaluate(&rs, &thetas, &phis)?;
    let radii = rs.to_vec1::<f32>()?;
    let u = values[0].to_vec1::<f32>()?;
    for (r, u) in radii.iter().zip(&u) {
        let reference = 2.0 - 2.0 / r;
        println!("r = {r:.2}  u = {u:+.4}  analytic = {reference:+.4}");
    }
    Ok(())
}
