//! The COIN backend: CBC for MIPs, CLP for pure LPs, both driven by a
//! scripted stdin session against an imported MPS file.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::error::{LpError, LpResult};
use crate::model::{Sense, Status};
use crate::problem::Problem;
use crate::solvers::{
    check_exit, executable_extension, find_executable, remove_temp_files, require_solution_file,
    run_solver_process, Solver, SolverConfig,
};
use crate::variable::Variable;
use crate::writer::mps::{self, MpsWriterOptions};

const SOLVER: &str = "COIN";

/// The COIN CLP/CBC solver pair.
#[derive(Debug, Clone)]
pub struct Coin {
    pub clp_path: PathBuf,
    pub cbc_path: PathBuf,
    pub config: SolverConfig,
    /// Enable CBC's cut generators.
    pub cuts: bool,
    pub presolve: bool,
    /// Use the dual simplex in CLP.
    pub dual: bool,
    /// CBC strong-branching candidate count.
    pub strong: u32,
}

impl Default for Coin {
    fn default() -> Self {
        Self {
            clp_path: PathBuf::from(executable_extension("clp")),
            cbc_path: PathBuf::from(executable_extension("cbc")),
            config: SolverConfig::default(),
            cuts: true,
            presolve: true,
            dual: true,
            strong: 5,
        }
    }
}

impl Coin {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_paths(mut self, clp: impl Into<PathBuf>, cbc: impl Into<PathBuf>) -> Self {
        self.clp_path = clp.into();
        self.cbc_path = cbc.into();
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

    #[must_use]
    pub fn with_cuts(mut self, cuts: bool) -> Self {
        self.cuts = cuts;
        self
    }

    #[must_use]
    pub fn with_presolve(mut self, presolve: bool) -> Self {
        self.presolve = presolve;
        self
    }

    #[must_use]
    pub fn with_dual(mut self, dual: bool) -> Self {
        self.dual = dual;
        self
    }

    #[must_use]
    pub fn with_strong(mut self, strong: u32) -> Self {
        self.strong = strong;
        self
    }

    fn cbc_script(&self, sense: Sense, tmp_mps: &str, tmp_sol: &str) -> String {
        let mut script = format!("import {tmp_mps}\n");
        if self.presolve {
            script.push_str("presolve on\n");
        }
        script.push_str(&format!("strong {}\n", self.strong));
        if self.cuts {
            script.push_str("gomory on\n");
            script.push_str("oddhole on\n");
            script.push_str("knapsack on\n");
            script.push_str("probing on\n");
        }
        for option in &self.config.options {
            script.push_str(option);
            script.push('\n');
        }
        script.push_str(if sense.is_minimization() { "min\n" } else { "max\n" });
        script.push_str(if self.config.mip { "branch\n" } else { "initialSolve\n" });
        script.push_str(&format!("solution {tmp_sol}\n"));
        script.push_str("quit\n");
        script
    }

    fn clp_script(&self, sense: Sense, tmp_mps: &str, tmp_sol: &str) -> String {
        let mut script = format!("import {tmp_mps}\n");
        if self.presolve {
            script.push_str("presolve on\n");
        }
        for option in &self.config.options {
            script.push_str(option);
            script.push('\n');
        }
        script.push_str(if sense.is_minimization() { "min\n" } else { "max\n" });
        script.push_str(if self.dual { "dualS\n" } else { "primalS\n" });
        script.push_str(&format!("solution {tmp_sol}\n"));
        script.push_str("quit\n");
        script
    }

    /// Solve a MIP with CBC.
    fn solve_cbc(&self, problem: &mut Problem) -> LpResult<Status> {
        let program = find_executable(&self.cbc_path)
            .ok_or_else(|| LpError::SolverNotFound { path: self.cbc_path.clone() })?;
        let (tmp_mps, tmp_sol) =
            super::temp_paths(&problem.name, self.config.keep_files, &self.config.tmp_dir, "mps", "sol");

        let info = mps::write_mps_file(problem, &tmp_mps, &MpsWriterOptions::mip())?;
        let script =
            self.cbc_script(problem.sense, &tmp_mps.to_string_lossy(), &tmp_sol.to_string_lossy());
        let exit =
            run_solver_process(&program, &["-".to_string()], Some(&script), self.config.msg)?;
        check_exit(SOLVER, exit)?;
        require_solution_file(SOLVER, &tmp_sol)?;

        let (status, values) =
            read_cbc_solution(BufReader::new(fs::File::open(&tmp_sol)?), &info.variables)?;
        problem.set_status(status);
        problem.assign(&values)?;
        remove_temp_files(self.config.keep_files, &[tmp_mps.as_path(), tmp_sol.as_path()]);
        Ok(status)
    }

    /// Solve a pure LP (or the relaxation) with CLP.
    fn solve_clp(&self, problem: &mut Problem) -> LpResult<Status> {
        let program = find_executable(&self.clp_path)
            .ok_or_else(|| LpError::SolverNotFound { path: self.clp_path.clone() })?;
        let (tmp_mps, tmp_sol) =
            super::temp_paths(&problem.name, self.config.keep_files, &self.config.tmp_dir, "mps", "sol");

        // CLP truncates long names, so emit under normalized ones.
        let options = MpsWriterOptions { sense: None, rename: true, mip: true };
        let info = mps::write_mps_file(problem, &tmp_mps, &options)?;
        let script =
            self.clp_script(problem.sense, &tmp_mps.to_string_lossy(), &tmp_sol.to_string_lossy());
        let exit =
            run_solver_process(&program, &["-".to_string()], Some(&script), self.config.msg)?;
        check_exit(SOLVER, exit)?;
        require_solution_file(SOLVER, &tmp_sol)?;

        let renamed = info.variable_names.unwrap_or_default();
        let (status, values) =
            read_clp_solution(BufReader::new(fs::File::open(&tmp_sol)?), &info.variables, &renamed)?;
        problem.set_status(status);
        problem.assign(&values)?;
        remove_temp_files(self.config.keep_files, &[tmp_mps.as_path(), tmp_sol.as_path()]);
        Ok(status)
    }
}

impl Solver for Coin {
    fn available(&self) -> bool {
        find_executable(&self.clp_path).is_some() && find_executable(&self.cbc_path).is_some()
    }

    fn actual_solve(&self, problem: &mut Problem) -> LpResult<Status> {
        if problem.is_mip() && self.config.mip {
            self.solve_cbc(problem)
        } else {
            self.solve_clp(problem)
        }
    }
}

/// Parse a CLP solution file. Every variable defaults to zero; lines
/// starting with `**` downgrade the (approximate) status to infeasible.
fn read_clp_solution<R: BufRead>(
    reader: R,
    variables: &[Variable],
    variable_names: &IndexMap<String, String>,
) -> LpResult<(Status, IndexMap<String, f64>)> {
    let mut values: IndexMap<String, f64> = variables.iter().map(|v| (v.name(), 0.0)).collect();
    let reverse: IndexMap<String, String> =
        variable_names.iter().map(|(original, renamed)| (renamed.clone(), original.clone())).collect();

    let mut status = Status::Optimal;
    for line in reader.lines() {
        let line = line?;
        if line.len() <= 2 {
            break;
        }
        let content = match line.strip_prefix("**") {
            Some(rest) => {
                status = Status::Infeasible;
                rest
            }
            None => line.as_str(),
        };
        let parts: Vec<&str> = content.split_whitespace().collect();
        let renamed = parts
            .get(1)
            .ok_or_else(|| LpError::solution_format(SOLVER, format!("short solution line '{line}'")))?;
        if let Some(original) = reverse.get(*renamed) {
            let value: f64 = parts
                .get(2)
                .and_then(|field| field.parse().ok())
                .ok_or_else(|| LpError::solution_format(SOLVER, "missing column value"))?;
            values.insert(original.clone(), value);
        }
    }
    Ok((status, values))
}

/// Parse a CBC solution file. The file carries no status, so the result
/// is always undefined; every variable defaults to zero.
fn read_cbc_solution<R: BufRead>(
    reader: R,
    variables: &[Variable],
) -> LpResult<(Status, IndexMap<String, f64>)> {
    let mut values: IndexMap<String, f64> = variables.iter().map(|v| (v.name(), 0.0)).collect();
    for line in reader.lines() {
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        let (Some(name), Some(field)) = (parts.get(1), parts.get(2)) else {
            if !line.trim().is_empty() {
                log::warn!("unparsed CBC solution line: {line}");
            }
            continue;
        };
        let Some(slot) = values.get_mut(*name) else {
            log::debug!("ignoring non-column line for '{name}'");
            continue;
        };
        *slot = field
            .parse()
            .map_err(|_| LpError::solution_format(SOLVER, format!("bad value in '{line}'")))?;
    }
    Ok((Status::Undefined, values))
}
