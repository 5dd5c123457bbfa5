use std::{env, error::Error};

use lp_modeler_rs::{
    default_solver, write_lp_string, write_mps_string, Category, Constraint, MpsWriterOptions, Problem,
    Sense, Variable,
};

/// A small bounded model, handy for eyeballing both output formats.
fn sample_problem() -> Result<(Problem, Vec<Variable>), Box<dyn Error>> {
    let x = Variable::new("x", Some(0.0), Some(4.0), Category::Continuous);
    let y = Variable::new("y", Some(-1.0), Some(1.0), Category::Continuous);
    let z = Variable::new("z", Some(0.0), None, Category::Continuous);

    let mut problem = Problem::new("sample", Sense::Minimize);
    problem.add_named("obj", &x + 4.0 * &y + 9.0 * &z)?;
    problem.add_named("c1", Constraint::le(&x + &y, 5.0))?;
    problem.add_named("c2", Constraint::ge(&x + &z, 10.0))?;
    problem.add_named("c3", Constraint::eq(-(&y) + &z, 7.0))?;
    Ok((problem, vec![x, y, z]))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mode = env::args().nth(1).unwrap_or_else(|| "lp".to_string());
    let (mut problem, variables) = sample_problem()?;

    match mode.as_str() {
        "lp" => print!("{}", write_lp_string(&mut problem)?),
        "mps" => {
            let (contents, _) = write_mps_string(&mut problem, &MpsWriterOptions::mip())?;
            print!("{contents}");
        }
        "solve" => {
            let solver = default_solver().ok_or("no solver available on this machine")?;
            let status = problem.solve(solver.as_ref())?;
            println!("Status: {status}");
            for variable in &variables {
                println!("{} = {:?}", variable.name(), variable.value());
            }
            if let Some(objective) = problem.objective() {
                println!("objective = {:?}", objective.value());
            }
        }
        other => return Err(format!("unknown mode '{other}'; use lp, mps or solve").into()),
    }
    Ok(())
}
