//! The CPLEX backend, driving the interactive optimizer over stdin.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{LpError, LpResult};
use crate::model::Status;
use crate::problem::Problem;
use crate::solvers::{
    check_exit, executable_extension, find_executable, remove_temp_files, run_solver_process, Solver,
    SolverConfig,
};
use crate::writer::lp::{self, LpWriterOptions};

const SOLVER: &str = "CPLEX";

/// The CPLEX LP/MIP solver.
#[derive(Debug, Clone)]
pub struct Cplex {
    pub path: PathBuf,
    pub config: SolverConfig,
}

impl Default for Cplex {
    fn default() -> Self {
        Self { path: PathBuf::from(executable_extension("cplex")), config: SolverConfig::default() }
    }
}

impl Cplex {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_mip(mut self, mip: bool) -> Self {
        self.config.mip = mip;
        self
    }

    #[must_use]
    pub fn with_msg(mut self, msg: bool) -> Self {
        self.config.msg = msg;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.config.options = options;
        self
    }

    #[must_use]
    pub fn with_keep_files(mut self, keep_files: bool) -> Self {
        self.config.keep_files = keep_files;
        self
    }

    fn script(&self, problem: &Problem, tmp_lp: &str, tmp_sol: &str) -> String {
        let mut script = format!("read {tmp_lp}\n");
        for option in &self.config.options {
            script.push_str(option);
            script.push('\n');
        }
        if problem.is_mip() {
            if self.config.mip {
                script.push_str("mipopt\n");
                script.push_str("change problem fixed\n");
            } else {
                script.push_str("change problem relaxed_milp\n");
            }
        }
        script.push_str("optimize\n");
        script.push_str(&format!("write {tmp_sol}\n"));
        script.push_str("quit\n");
        script
    }
}

impl Solver for Cplex {
    fn available(&self) -> bool {
        find_executable(&self.path).is_some()
    }

    fn actual_solve(&self, problem: &mut Problem) -> LpResult<Status> {
        let program =
            find_executable(&self.path).ok_or_else(|| LpError::SolverNotFound { path: self.path.clone() })?;
        let (tmp_lp, tmp_sol) =
            super::temp_paths(&problem.name, self.config.keep_files, &self.config.tmp_dir, "lp", "txt");

        // The LP keeps its integer declarations either way; relaxing goes
        // through `change problem relaxed_milp`, which needs them present.
        lp::write_lp_file(problem, &tmp_lp, &LpWriterOptions { write_sos: true, mip: true })?;
        // A stale solution file would mask an infeasible run.
        let _ = fs::remove_file(&tmp_sol);

        let script =
            self.script(problem, &tmp_lp.to_string_lossy(), &tmp_sol.to_string_lossy());
        let exit = run_solver_process(&program, &[], Some(&script), self.config.msg)?;
        check_exit(SOLVER, exit)?;
        remove_temp_files(self.config.keep_files, &[tmp_lp.as_path()]);

        // CPLEX refuses to write a solution file for an infeasible problem.
        let status = if tmp_sol.exists() {
            let (status, values) = read_solution(BufReader::new(fs::File::open(&tmp_sol)?))?;
            problem.assign(&values)?;
            status
        } else {
            Status::Infeasible
        };
        remove_temp_files(self.config.keep_files, &[tmp_sol.as_path(), Path::new("cplex.log")]);
        problem.set_status(status);
        Ok(status)
    }
}

fn translate_status(word: &str) -> Option<Status> {
    match word {
        "OPTIMAL SOLN" => Some(Status::Optimal),
        _ => None,
    }
}

/// Parse the text solution report CPLEX's `write` command produces: the
/// status word at a fixed offset in the header, then the variable table of
/// `SECTION 2`.
fn read_solution<R: BufRead>(reader: R) -> LpResult<(Status, IndexMap<String, f64>)> {
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    let mut lines = lines.into_iter();

    for _ in 0..3 {
        lines
            .next()
            .ok_or_else(|| LpError::solution_format(SOLVER, "unexpected end of file"))?;
    }
    let status_line =
        lines.next().ok_or_else(|| LpError::solution_format(SOLVER, "missing status line"))?;
    let status_word = status_line.get(18..30).unwrap_or("").to_string();
    let status = translate_status(&status_word).ok_or_else(|| LpError::unknown_status(SOLVER, status_word))?;

    for line in lines.by_ref() {
        if line.starts_with(" SECTION 2") {
            break;
        }
    }
    for _ in 0..3 {
        lines
            .next()
            .ok_or_else(|| LpError::solution_format(SOLVER, "truncated variable section"))?;
    }

    let mut values = IndexMap::new();
    for line in lines {
        let parts: Vec<&str> = line.get(3..).unwrap_or("").split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        let name = parts
            .get(1)
            .ok_or_else(|| LpError::solution_format(SOLVER, "missing variable name"))?;
        let value: f64 = parts
            .get(3)
            .and_then(|field| field.parse().ok())
            .ok_or_else(|| LpError::solution_format(SOLVER, "missing variable value"))?;
        values.insert((*name).to_string(), value);
    }
    Ok((status, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLUTION: &str = "\
Problem name:  test1
Objective:     54.000000

SOLUTION          OPTIMAL SOLN  found

 SECTION 1 - Rows

 Number  Row name   Activity
 SECTION 2 - Variables

 Number  Name       Status     Value

    1  x          UL     4.000000
    2  y          LL    -1.000000
    3  z          BS     6.000000
    4  w          LL     0.000000
";

    #[test]
    fn parses_the_variable_section() {
        let (status, values) = read_solution(SOLUTION.as_bytes()).unwrap();
        assert_eq!(status, Status::Optimal);
        assert_eq!(values["x"], 4.0);
        assert_eq!(values["y"], -1.0);
        assert_eq!(values["z"], 6.0);
        assert_eq!(values["w"], 0.0);
    }

    #[test]
    fn unknown_status_words_are_rejected() {
        let input = "a\nb\nc\nSOLUTION          NO SOLUTION   found\n";
        assert!(matches!(
            read_solution(input.as_bytes()),
            Err(LpError::UnknownStatus { solver: "CPLEX", .. })
        ));
    }

    #[test]
    fn the_stdin_script_follows_the_problem_kind() {
        use crate::constraint::Constraint;
        use crate::model::{Category, Sense};
        use crate::variable::Variable;

        let z = Variable::new("z", Some(0.0), None, Category::Integer);
        let mut mip = Problem::new("m", Sense::Minimize);
        mip.add_named("c", Constraint::ge(&z + 0.0, 1.0)).unwrap();

        let solver = Cplex::new();
        let script = solver.script(&mip, "in.lp", "out.txt");
        assert_eq!(script, "read in.lp\nmipopt\nchange problem fixed\noptimize\nwrite out.txt\nquit\n");

        let relaxed = solver.clone().with_mip(false);
        let script = relaxed.script(&mip, "in.lp", "out.txt");
        assert_eq!(script, "read in.lp\nchange problem relaxed_milp\noptimize\nwrite out.txt\nquit\n");

        let x = Variable::new("x", Some(0.0), None, Category::Continuous);
        let mut lp = Problem::new("l", Sense::Minimize);
        lp.add_named("c", Constraint::ge(&x + 0.0, 1.0)).unwrap();
        let script = solver.script(&lp, "in.lp", "out.txt");
        assert_eq!(script, "read in.lp\noptimize\nwrite out.txt\nquit\n");
    }
}
