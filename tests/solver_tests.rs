// Integration tests for the backward solver and the model outputs

mod common;

use kyle_model::{
    polynomial_roots, select_depth_root, BackwardRecursionSolver, CancellationFlag,
    DegeneracyKind, KyleError, KyleModel, ModelConfig, Termination, TERMINAL_VARIANCE_STEP,
};
use common::{budget_bound_params, solvable_params};
use ndarray::Array1;

#[test]
fn test_every_sequence_has_n_plus_one_entries() {
    for steps in [1, 5, 10] {
        let params = ModelConfig { steps, ..Default::default() }.build().unwrap();
        let run = KyleModel::seeded(params, 3).unwrap().run().unwrap();
        let m = &run.multiperiod;

        for seq in [
            &m.alpha, &m.beta, &m.delta, &m.lambda, &m.sigma_post, &m.noise_orders,
            &m.informed_orders, &m.price_changes, &m.cumulative_informed, &m.cumulative_noise,
        ] {
            assert_eq!(seq.len(), steps + 1, "N={}", steps);
        }
    }
}

#[test]
fn test_boundary_conditions() {
    let run = KyleModel::seeded(solvable_params(), 8).unwrap().run().unwrap();
    let m = &run.multiperiod;

    assert_eq!(m.beta[10], 0.0);
    assert_eq!(m.delta[10], 0.0);
    assert_eq!(m.beta, m.delta);
    assert_eq!(m.price_changes[0], run.parameters.initial_value());
    assert_eq!(m.informed_orders[0], 0.0);
    assert_eq!(m.price_changes[1], 0.0);
    assert_eq!(m.cumulative_informed[0], 0.0);
}

#[test]
fn test_converges_with_ten_steps() {
    let run = KyleModel::seeded(solvable_params(), 1).unwrap().run().unwrap();
    let m = &run.multiperiod;

    assert!(m.converged);
    assert_eq!(m.termination, Termination::Converged);
    assert_eq!(m.iterations, 54);
    assert!(m.initial_variance_gap(&run.parameters) <= run.parameters.tolerance());
    assert!(m.root_diagnostics.is_empty());
}

#[test]
fn test_loose_target_converges_quickly() {
    let params = ModelConfig {
        target_initial_variance: 13.0,
        tolerance: 0.5,
        ..Default::default()
    }
    .build()
    .unwrap();
    let result = KyleModel::seeded(params, 1).unwrap().multiperiod_price().unwrap();

    assert!(result.converged);
    assert_eq!(result.iterations, 2);
}

#[test]
fn test_iteration_budget_is_respected() {
    for budget in [1, 3, 7] {
        let params = budget_bound_params(5, budget);
        let result = KyleModel::seeded(params, 2).unwrap().multiperiod_price().unwrap();

        assert_eq!(result.iterations, budget);
        assert!(!result.converged);
        assert_eq!(result.termination, Termination::IterationBudgetExhausted);

        // Terminal variance after k passes is SIGMA_G - 0.007 k
        let expected = 0.4 - TERMINAL_VARIANCE_STEP * budget as f64;
        assert!((result.sigma_post[5] - expected).abs() < 1e-12);
    }
}

#[test]
fn test_unreachable_target_reports_non_convergence() {
    let params = budget_bound_params(2, 1);
    let result = KyleModel::seeded(params.clone(), 4).unwrap().multiperiod_price().unwrap();

    assert_eq!(result.iterations, 1);
    let err = result.ensure_converged(&params).unwrap_err();
    assert_eq!(err.category(), "numerical");
    assert!(matches!(err, KyleError::NonConvergence { iterations: 1, .. }));
}

#[test]
fn test_default_parameters_run_out_of_terminal_variance() {
    let err = KyleModel::seeded(Default::default(), 1)
        .unwrap()
        .multiperiod_price()
        .unwrap_err();

    assert!(matches!(
        err,
        KyleError::NumericalDegeneracy { index: 50, kind: DegeneracyKind::NegativeTerminalVariance }
    ));
}

#[test]
fn test_zero_price_impact_is_reported() {
    // 0.007 steps the terminal variance to exactly zero on the second pass
    let params = ModelConfig {
        steps: 5,
        terminal_guess_volatility: 0.007,
        target_initial_variance: 1000.0,
        ..Default::default()
    }
    .build()
    .unwrap();
    let err = KyleModel::seeded(params, 1).unwrap().multiperiod_price().unwrap_err();

    assert_eq!(err.period_index(), Some(5));
    assert!(matches!(
        err,
        KyleError::NumericalDegeneracy { kind: DegeneracyKind::ZeroPriceImpact, .. }
    ));
}

#[test]
fn test_backward_solve_ignores_noise_except_terminal_change() {
    let solver = BackwardRecursionSolver::new(solvable_params());
    let a = solver.solve(&Array1::from_elem(11, 0.3)).unwrap();
    let b = solver.solve(&Array1::from_elem(11, -1.7)).unwrap();

    assert_eq!(a.coefficients, b.coefficients);
    assert_eq!(a.iterations, b.iterations);
    assert!((a.terminal_price_change / 0.3 - b.terminal_price_change / -1.7).abs() < 1e-12);
}

#[test]
fn test_cancelled_solver_keeps_completed_work() {
    let flag = CancellationFlag::new();
    flag.cancel();
    let err = BackwardRecursionSolver::new(solvable_params())
        .with_cancellation(flag)
        .solve(&Array1::zeros(11))
        .unwrap_err();

    assert!(matches!(err, KyleError::Cancelled { iterations: 0 }));
}

#[test]
fn test_median_root_selection() {
    // (x - 1)(x - 2)(x - 5)
    let roots = polynomial_roots(&[1.0, -8.0, 17.0, -10.0]);
    assert_eq!(roots.len(), 3);
    let chosen = select_depth_root(&roots).unwrap();
    assert!((chosen.re - 2.0).abs() < 1e-9);
    assert!(chosen.is_admissible_depth());
}

#[test]
fn test_seeded_runs_are_identical() {
    let a = KyleModel::seeded(solvable_params(), 99).unwrap().run().unwrap();
    let b = KyleModel::seeded(solvable_params(), 99).unwrap().run().unwrap();

    assert_eq!(a.terminal_value.to_bits(), b.terminal_value.to_bits());
    assert_eq!(a.one_period.mm_price.to_bits(), b.one_period.mm_price.to_bits());
    let bits = |xs: &Array1<f64>| xs.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&a.multiperiod.lambda), bits(&b.multiperiod.lambda));
    assert_eq!(bits(&a.multiperiod.noise_orders), bits(&b.multiperiod.noise_orders));
    assert_eq!(bits(&a.multiperiod.price_changes), bits(&b.multiperiod.price_changes));
}

#[test]
fn test_single_step_matches_closed_form_depth() {
    let params = ModelConfig { steps: 1, ..Default::default() }.build().unwrap();
    let check = KyleModel::seeded(params, 12).unwrap().one_period_cross_check().unwrap();

    assert!(check.is_consistent(1e-9), "{:?}", check);
    assert!((check.depth_ratio() - std::f64::consts::SQRT_2).abs() < 1e-9);
}
