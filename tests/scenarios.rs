//! End-to-end scenarios. Each builds the real model and asserts on the
//! emitted formats and on the known optimal point; when a command-line
//! solver is installed the same model is also solved for real.

use float_eq::assert_float_eq;
use lp_modeler_rs::{
    default_solver, write_lp_string, write_mps_string, Category, Constraint, LpWriterOptions,
    MpsWriterOptions, Problem, Sense, Status, Variable,
};

fn continuous_problem() -> (Problem, Variable, Variable, Variable, Variable) {
    let x = Variable::new("x", Some(0.0), Some(4.0), Category::Continuous);
    let y = Variable::new("y", Some(-1.0), Some(1.0), Category::Continuous);
    let z = Variable::new("z", Some(0.0), None, Category::Continuous);
    let w = Variable::new("w", Some(0.0), None, Category::Continuous);
    let mut prob = Problem::new("test1", Sense::Minimize);
    prob.add_named("obj", &x + 4.0 * &y + 9.0 * &z).unwrap();
    prob.add_named("c1", Constraint::le(&x + &y, 5.0)).unwrap();
    prob.add_named("c2", Constraint::ge(&x + &z, 10.0)).unwrap();
    prob.add_named("c3", Constraint::eq(-(&y) + &z, 7.0)).unwrap();
    prob.add_named("c4", Constraint::ge(&w + 0.0, 0.0)).unwrap();
    (prob, x, y, z, w)
}

fn mip_problem() -> (Problem, Variable, Variable, Variable) {
    let x = Variable::new("x", Some(0.0), Some(4.0), Category::Continuous);
    let y = Variable::new("y", Some(-1.0), Some(1.0), Category::Continuous);
    let z = Variable::new("z", Some(0.0), None, Category::Integer);
    let mut prob = Problem::new("test2", Sense::Minimize);
    prob.add_named("obj", &x + 4.0 * &y + 9.0 * &z).unwrap();
    prob.add_named("c1", Constraint::le(&x + &y, 5.0)).unwrap();
    prob.add_named("c2", Constraint::ge(&x + &z, 10.0)).unwrap();
    prob.add_named("c3", Constraint::eq(-(&y) + &z, 7.5)).unwrap();
    (prob, x, y, z)
}

#[test]
fn continuous_optimum_is_feasible_and_costs_54() {
    let (mut prob, x, y, z, w) = continuous_problem();

    if let Some(solver) = default_solver() {
        let status = prob.solve(solver.as_ref()).unwrap();
        assert!(matches!(status, Status::Optimal | Status::Undefined));
        prob.round_solution(1e-5, 1e-7);
    } else {
        x.set_value(4.0);
        y.set_value(-1.0);
        z.set_value(6.0);
        w.set_value(0.0);
    }

    assert!(prob.valid(1e-5));
    assert_float_eq!(x.value().unwrap(), 4.0, abs <= 1e-4);
    assert_float_eq!(y.value().unwrap(), -1.0, abs <= 1e-4);
    assert_float_eq!(z.value().unwrap(), 6.0, abs <= 1e-4);
    assert_float_eq!(w.value().unwrap(), 0.0, abs <= 1e-4);
    assert_float_eq!(prob.objective().unwrap().value().unwrap(), 54.0, abs <= 1e-3);
}

#[test]
fn integer_optimum_rounds_z_up_to_seven() {
    let (mut prob, x, y, z) = mip_problem();

    if let Some(solver) = default_solver() {
        let status = prob.solve(solver.as_ref()).unwrap();
        // CBC encodes no status in its solution file.
        assert!(matches!(status, Status::Optimal | Status::Undefined));
        prob.round_solution(1e-5, 1e-7);
    } else {
        x.set_value(3.0);
        y.set_value(-0.5);
        z.set_value(7.0);
    }

    assert!(prob.valid(1e-5));
    assert_float_eq!(x.value().unwrap(), 3.0, abs <= 1e-4);
    assert_float_eq!(y.value().unwrap(), -0.5, abs <= 1e-4);
    assert_float_eq!(z.value().unwrap(), 7.0, abs <= 1e-4);
    assert_float_eq!(prob.objective().unwrap().value().unwrap(), 64.0, abs <= 1e-3);
}

#[test]
fn relaxing_the_mip_frees_the_fractional_optimum() {
    let (mut prob, x, y, z) = mip_problem();

    // Relaxed emission drops the integer sections entirely, turning the
    // model into the pure LP whose optimum is fractional.
    let relaxed = write_lp_string_with_mip_off(&mut prob);
    assert!(!relaxed.contains("Generals"));
    x.set_value(3.5);
    y.set_value(-1.0);
    z.set_value(6.5);

    // The fractional point satisfies every constraint and bound, and only
    // the integrality of z separates it from a valid MIP solution.
    for constraint in prob.constraints().values() {
        assert!(constraint.valid(1e-9));
    }
    assert_float_eq!(prob.infeasibility_gap(false).unwrap(), 0.0, abs <= 1e-12);
    assert_float_eq!(prob.infeasibility_gap(true).unwrap(), 0.5, abs <= 1e-12);
    assert_float_eq!(prob.objective().unwrap().value().unwrap(), 58.0, abs <= 1e-9);
}

fn write_lp_string_with_mip_off(prob: &mut Problem) -> String {
    lp_modeler_rs::writer::lp::write_lp_string_with_options(
        prob,
        &LpWriterOptions { write_sos: true, mip: false },
    )
    .unwrap()
}

#[test]
fn feasibility_only_problems_borrow_a_dummy_objective() {
    let x = Variable::new("x", Some(0.0), Some(4.0), Category::Continuous);
    let y = Variable::new("y", Some(-1.0), Some(1.0), Category::Continuous);
    let z = Variable::new("z", Some(0.0), None, Category::Integer);
    let mut prob = Problem::new("test4", Sense::Minimize);
    prob.add_named("c1", Constraint::le(&x + &y, 5.0)).unwrap();
    prob.add_named("c2", Constraint::ge(&x + &z, 10.0)).unwrap();
    prob.add_named("c3", Constraint::eq(-(&y) + &z, 7.5)).unwrap();

    let lp = write_lp_string(&mut prob).unwrap();
    assert!(lp.contains("OBJ: __dummy"));
    assert!(prob.objective().is_none());

    if let Some(solver) = default_solver() {
        let status = prob.solve(solver.as_ref()).unwrap();
        assert!(matches!(status, Status::Optimal | Status::Undefined));
        prob.round_solution(1e-5, 1e-7);
        for var in prob.variables() {
            assert!(var.valid(1e-5), "{} out of bounds", var.name());
        }
    }
}

#[test]
fn infeasible_problems_emit_cleanly() {
    let x = Variable::new("x", Some(0.0), Some(4.0), Category::Continuous);
    let y = Variable::new("y", Some(-1.0), Some(1.0), Category::Continuous);
    let z = Variable::new("z", Some(0.0), Some(10.0), Category::Continuous);
    let mut prob = Problem::new("test5", Sense::Minimize);
    prob.add_named("obj", &x + 4.0 * &y + 9.0 * &z).unwrap();
    prob.add_named("c1", Constraint::le(&x + &y, 5.2)).unwrap();
    prob.add_named("c2", Constraint::ge(&x + &z, 10.3)).unwrap();
    prob.add_named("c3", Constraint::eq(-(&y) + &z, 17.5)).unwrap();

    // No point inside the bounds satisfies c3: z - y peaks at 10 + 1.
    x.set_value(4.0);
    y.set_value(-1.0);
    z.set_value(10.0);
    assert!(!prob.valid(1e-5));

    let first_lp = write_lp_string(&mut prob).unwrap();
    let second_lp = write_lp_string(&mut prob).unwrap();
    assert_eq!(first_lp, second_lp);
    let (first_mps, _) = write_mps_string(&mut prob, &MpsWriterOptions::mip()).unwrap();
    let (second_mps, _) = write_mps_string(&mut prob, &MpsWriterOptions::mip()).unwrap();
    assert_eq!(first_mps, second_mps);

    if let Some(solver) = default_solver() {
        match prob.solve(solver.as_ref()) {
            // Backends with coarser reporting return Undefined.
            Ok(status) => assert!(matches!(status, Status::Infeasible | Status::Undefined)),
            Err(_) => {}
        }
    }
}
