//! The XPRESS backend, driving `optimizer` over stdin.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::error::{LpError, LpResult};
use crate::model::Status;
use crate::problem::Problem;
use crate::solvers::{
    check_exit, executable_extension, find_executable, remove_temp_files, require_solution_file,
    run_solver_process, Solver, SolverConfig,
};
use crate::writer::lp::{self, LpWriterOptions};

const SOLVER: &str = "XPRESS";

/// The XPRESS LP/MIP solver.
#[derive(Debug, Clone)]
pub struct Xpress {
    pub path: PathBuf,
    pub config: SolverConfig,
}

impl Default for Xpress {
    fn default() -> Self {
        Self { path: PathBuf::from(executable_extension("optimizer")), config: SolverConfig::default() }
    }
}

impl Xpress {
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
    pub fn with_keep_files(mut self, keep_files: bool) -> Self {
        self.config.keep_files = keep_files;
        self
    }

    fn script(&self, problem: &Problem, tmp_lp: &str, tmp_sol: &str) -> String {
        let mut script = format!("READPROB {tmp_lp}\n");
        script.push_str(if problem.sense.is_minimization() { "MINIM\n" } else { "MAXIM\n" });
        if problem.is_mip() && self.config.mip {
            script.push_str("GLOBAL\n");
        }
        script.push_str(&format!("WRITEPRTSOL {tmp_sol}\n"));
        script.push_str("QUIT\n");
        script
    }
}

impl Solver for Xpress {
    fn available(&self) -> bool {
        find_executable(&self.path).is_some()
    }

    fn actual_solve(&self, problem: &mut Problem) -> LpResult<Status> {
        let program =
            find_executable(&self.path).ok_or_else(|| LpError::SolverNotFound { path: self.path.clone() })?;
        let (tmp_lp, tmp_sol) =
            super::temp_paths(&problem.name, self.config.keep_files, &self.config.tmp_dir, "lp", "prt");

        lp::write_lp_file(problem, &tmp_lp, &LpWriterOptions { write_sos: true, mip: self.config.mip })?;

        let script = self.script(problem, &tmp_lp.to_string_lossy(), &tmp_sol.to_string_lossy());
        let exit =
            run_solver_process(&program, &[problem.name.clone()], Some(&script), self.config.msg)?;
        check_exit(SOLVER, exit)?;
        require_solution_file(SOLVER, &tmp_sol)?;

        let (status, values) = read_solution(BufReader::new(fs::File::open(&tmp_sol)?))?;
        remove_temp_files(self.config.keep_files, &[tmp_lp.as_path(), tmp_sol.as_path()]);
        problem.set_status(status);
        problem.assign(&values)?;
        // The printed solution is rounded; a gap this large means the
        // reported status cannot be trusted.
        if problem.infeasibility_gap(self.config.mip)?.abs() > 1e-5 {
            problem.set_status(Status::Infeasible);
        }
        Ok(problem.status())
    }
}

fn translate_status(word: &str) -> Option<Status> {
    match word {
        "Optimal" => Some(Status::Optimal),
        _ => None,
    }
}

/// Parse the `WRITEPRTSOL` report: a header with row/column counts, the
/// status word, then a table whose `C` rows carry the column values.
fn read_solution<R: BufRead>(reader: R) -> LpResult<(Status, IndexMap<String, f64>)> {
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    let mut lines = lines.into_iter();

    for _ in 0..6 {
        lines
            .next()
            .ok_or_else(|| LpError::solution_format(SOLVER, "unexpected end of file"))?;
    }
    let size_line =
        lines.next().ok_or_else(|| LpError::solution_format(SOLVER, "missing problem size line"))?;
    let fields: Vec<&str> = size_line.split_whitespace().collect();
    let _rows: usize = fields
        .get(2)
        .and_then(|field| field.parse().ok())
        .ok_or_else(|| LpError::solution_format(SOLVER, format!("expected a row count in '{size_line}'")))?;
    let _columns: usize = fields
        .get(5)
        .and_then(|field| field.parse().ok())
        .ok_or_else(|| LpError::solution_format(SOLVER, format!("expected a column count in '{size_line}'")))?;

    for _ in 0..3 {
        lines
            .next()
            .ok_or_else(|| LpError::solution_format(SOLVER, "truncated header"))?;
    }
    let status_line =
        lines.next().ok_or_else(|| LpError::solution_format(SOLVER, "missing status line"))?;
    let status_word = status_line.split_whitespace().next().unwrap_or("").to_string();
    let status = translate_status(&status_word).ok_or_else(|| LpError::unknown_status(SOLVER, status_word))?;

    let mut values = IndexMap::new();
    for line in lines {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.first() != Some(&"C") {
            continue;
        }
        let name = parts
            .get(2)
            .ok_or_else(|| LpError::solution_format(SOLVER, "missing column name"))?;
        let value: f64 = parts
            .get(4)
            .and_then(|field| field.parse().ok())
            .ok_or_else(|| LpError::solution_format(SOLVER, "missing column value"))?;
        values.insert((*name).to_string(), value);
    }
    Ok((status, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLUTION: &str = "\
Page 1
XPRESS solution report
Problem: test1

Solution output

Problem has      5 rows and      4 columns
Objective function value: 54.000000


Optimal solution found

 C      1  x          AT  4.000000  0.000000
 C      2  y          AT -1.000000  0.000000
 C      3  z          BS  6.000000  0.000000
 C      4  w          AT  0.000000  0.000000
 R      1  c1         BS  3.000000  0.000000
";

    #[test]
    fn parses_only_the_column_rows() {
        let (status, values) = read_solution(SOLUTION.as_bytes()).unwrap();
        assert_eq!(status, Status::Optimal);
        assert_eq!(values.len(), 4);
        assert_eq!(values["x"], 4.0);
        assert_eq!(values["y"], -1.0);
        assert_eq!(values["z"], 6.0);
        assert_eq!(values["w"], 0.0);
    }

    #[test]
    fn unknown_status_words_are_rejected() {
        let input = "\
1
2
3
4
5
6
Problem has      1 rows and      1 columns
8
9
10
Unfinished search
";
        assert!(matches!(
            read_solution(input.as_bytes()),
            Err(LpError::UnknownStatus { solver: "XPRESS", .. })
        ));
    }

    #[test]
    fn the_stdin_script_tracks_sense_and_kind() {
        use crate::constraint::Constraint;
        use crate::model::{Category, Sense};
        use crate::variable::Variable;

        let z = Variable::new("z", Some(0.0), None, Category::Integer);
        let mut mip = Problem::new("m", Sense::Maximize);
        mip.add_named("c", Constraint::ge(&z + 0.0, 1.0)).unwrap();

        let solver = Xpress::new();
        let script = solver.script(&mip, "in.lp", "out.prt");
        assert_eq!(script, "READPROB in.lp\nMAXIM\nGLOBAL\nWRITEPRTSOL out.prt\nQUIT\n");

        let relaxed = solver.with_mip(false);
        let script = relaxed.script(&mip, "in.lp", "out.prt");
        assert_eq!(script, "READPROB in.lp\nMAXIM\nWRITEPRTSOL out.prt\nQUIT\n");
    }
}
