//! The GLPK backend, driving `glpsol` through command-line flags.

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

const SOLVER: &str = "GLPK";

/// The GLPK LP/MIP solver.
#[derive(Debug, Clone)]
pub struct Glpk {
    pub path: PathBuf,
    pub config: SolverConfig,
}

impl Default for Glpk {
    fn default() -> Self {
        Self { path: PathBuf::from(executable_extension("glpsol")), config: SolverConfig::default() }
    }
}

impl Glpk {
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
}

impl Solver for Glpk {
    fn available(&self) -> bool {
        find_executable(&self.path).is_some()
    }

    fn actual_solve(&self, problem: &mut Problem) -> LpResult<Status> {
        let program =
            find_executable(&self.path).ok_or_else(|| LpError::SolverNotFound { path: self.path.clone() })?;
        let (tmp_lp, tmp_sol) =
            super::temp_paths(&problem.name, self.config.keep_files, &self.config.tmp_dir, "lp", "sol");

        // glpsol rejects the SOS section. The LP always carries the full
        // integer declarations; relaxing is --nomip's job.
        lp::write_lp_file(problem, &tmp_lp, &LpWriterOptions { write_sos: false, mip: true })?;

        let mut args: Vec<String> = vec![
            "--lpt".to_string(),
            tmp_lp.to_string_lossy().into_owned(),
            "-o".to_string(),
            tmp_sol.to_string_lossy().into_owned(),
        ];
        if !self.config.mip {
            args.push("--nomip".to_string());
        }
        args.extend(self.config.options.iter().cloned());

        let exit = run_solver_process(&program, &args, None, self.config.msg)?;
        check_exit(SOLVER, exit)?;
        require_solution_file(SOLVER, &tmp_sol)?;

        let (status, values) = read_solution(BufReader::new(fs::File::open(&tmp_sol)?))?;
        problem.set_status(status);
        problem.assign(&values)?;
        remove_temp_files(self.config.keep_files, &[tmp_lp.as_path(), tmp_sol.as_path()]);
        Ok(status)
    }
}

fn translate_status(word: &str) -> Option<Status> {
    match word {
        "OPTIMAL" | "INTEGER OPTIMAL" => Some(Status::Optimal),
        "INTEGER NON-OPTIMAL" => Some(Status::Feasible),
        "INFEASIBLE (FINAL)" | "INTEGER EMPTY" => Some(Status::Infeasible),
        "UNBOUNDED" => Some(Status::Unbounded),
        "UNDEFINED" | "INTEGER UNDEFINED" => Some(Status::Undefined),
        _ => None,
    }
}

fn take_line<'a>(lines: &'a [String], pos: &mut usize) -> LpResult<&'a str> {
    let line = lines.get(*pos).ok_or_else(|| LpError::solution_format(SOLVER, "unexpected end of file"))?;
    *pos += 1;
    Ok(line)
}

fn count_field(line: &str) -> LpResult<usize> {
    line.split_whitespace()
        .nth(1)
        .and_then(|field| field.parse().ok())
        .ok_or_else(|| LpError::solution_format(SOLVER, format!("expected a count in '{line}'")))
}

fn parse_value(field: Option<&String>) -> LpResult<f64> {
    field
        .and_then(|field| field.parse().ok())
        .ok_or_else(|| LpError::solution_format(SOLVER, "missing column value"))
}

/// Parse the plain-text solution report `glpsol -o` writes: a header with
/// row/column counts and the status word at a fixed offset, the row block,
/// then the column block with each variable's value.
fn read_solution<R: BufRead>(reader: R) -> LpResult<(Status, IndexMap<String, f64>)> {
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    let mut pos = 0;

    take_line(&lines, &mut pos)?;
    let rows = count_field(take_line(&lines, &mut pos)?)?;
    let columns = count_field(take_line(&lines, &mut pos)?)?;
    take_line(&lines, &mut pos)?;
    let status_word = take_line(&lines, &mut pos)?.get(12..).unwrap_or("").to_string();
    let status =
        translate_status(&status_word).ok_or_else(|| LpError::unknown_status(SOLVER, status_word.clone()))?;
    let integral = matches!(status_word.as_str(), "INTEGER OPTIMAL" | "INTEGER UNDEFINED");

    for _ in 0..4 {
        take_line(&lines, &mut pos)?;
    }
    for _ in 0..rows {
        // A long row name pushes the rest of the entry onto the next line.
        if take_line(&lines, &mut pos)?.split_whitespace().count() == 2 {
            take_line(&lines, &mut pos)?;
        }
    }
    for _ in 0..3 {
        take_line(&lines, &mut pos)?;
    }

    let mut values = IndexMap::new();
    for _ in 0..columns {
        let mut parts: Vec<String> =
            take_line(&lines, &mut pos)?.split_whitespace().map(str::to_string).collect();
        let name = parts
            .get(1)
            .cloned()
            .ok_or_else(|| LpError::solution_format(SOLVER, "missing column name"))?;
        if parts.len() == 2 {
            let continuation = take_line(&lines, &mut pos)?;
            parts = vec!["0".to_string(), "0".to_string()];
            parts.extend(continuation.split_whitespace().map(str::to_string));
        }
        let value = if integral {
            if parts.get(2).map(String::as_str) == Some("*") {
                parse_value(parts.get(3))?
            } else {
                parse_value(parts.get(2))?
            }
        } else {
            parse_value(parts.get(3))?
        };
        values.insert(name, value);
    }
    Ok((status, values))
}
