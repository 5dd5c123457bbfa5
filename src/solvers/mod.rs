//! Abstractions over external LP/MIP solver processes.
//!
//! Every backend follows the same shape: check that its executable can be
//! found, write the model to a temporary file, drive the process (through
//! command-line flags or a scripted stdin session), parse the solution
//! file it leaves behind, translate the backend's status word, assign the
//! values back onto the problem's variables, and clean the temporaries up
//! unless asked to keep them.

pub mod coin;
pub mod cplex;
pub mod glpk;
pub mod xpress;

use std::env;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

pub use coin::Coin;
pub use cplex::Cplex;
pub use glpk::Glpk;
pub use xpress::Xpress;

use crate::error::{LpError, LpResult};
use crate::model::Status;
use crate::problem::Problem;

/// A backend able to solve a prepared problem.
pub trait Solver {
    /// True if the backend can actually run on this machine.
    fn available(&self) -> bool;

    /// Solve a problem whose objective has already been fixed up by
    /// [`Problem::solve`].
    ///
    /// # Errors
    ///
    /// Fails when the executable is missing, the process fails, or the
    /// solution file is missing or malformed.
    fn actual_solve(&self, problem: &mut Problem) -> LpResult<Status>;
}

/// Knobs shared by every command-line backend.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Solve as a MIP; turning this off relaxes integer variables.
    pub mip: bool,
    /// Let the solver write to the terminal. When off, output is sent to
    /// the null device.
    pub msg: bool,
    /// Backend-specific options, passed through verbatim.
    pub options: Vec<String>,
    /// Keep the temporary model and solution files for debugging.
    pub keep_files: bool,
    /// Where temporary files go; resolved from the environment.
    pub tmp_dir: PathBuf,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self { mip: true, msg: true, options: Vec::new(), keep_files: false, tmp_dir: resolve_tmp_dir() }
    }
}

/// Resolve a writable temporary directory from the environment: `TMPDIR`
/// then `TMP` (then `TEMP` on Windows), defaulting to `/tmp` on Unix and
/// the current directory on Windows. Falls back to the empty path when
/// the candidate is missing or not writable.
pub fn resolve_tmp_dir() -> PathBuf {
    let mut dir = if cfg!(windows) { PathBuf::new() } else { PathBuf::from("/tmp") };
    if let Some(tmpdir) = env::var_os("TMPDIR") {
        dir = PathBuf::from(tmpdir);
    }
    if let Some(tmp) = env::var_os("TMP") {
        dir = PathBuf::from(tmp);
    }
    if cfg!(windows) {
        if let Some(temp) = env::var_os("TEMP") {
            dir = PathBuf::from(temp);
        }
    }
    if !dir.is_dir() || fs::metadata(&dir).map(|m| m.permissions().readonly()).unwrap_or(true) {
        return PathBuf::new();
    }
    dir
}

/// The platform spelling of an executable name.
pub(crate) fn executable_extension(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// Resolve a command to an executable path: an absolute path must itself
/// be executable, anything else is searched on `PATH`.
pub(crate) fn find_executable(command: &Path) -> Option<PathBuf> {
    if command.is_absolute() {
        return is_executable(command).then(|| command.to_path_buf());
    }
    let path = env::var_os("PATH")?;
    env::split_paths(&path).map(|dir| dir.join(command)).find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt as _;
    fs::metadata(path).map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Temporary model and solution file paths. Per-process names inside the
/// temporary directory by default; deterministic problem-named files in
/// the working directory when files are kept.
pub(crate) fn temp_paths(
    problem_name: &str,
    keep_files: bool,
    tmp_dir: &Path,
    model_ext: &str,
    solution_ext: &str,
) -> (PathBuf, PathBuf) {
    if keep_files {
        (
            PathBuf::from(format!("{problem_name}-model.{model_ext}")),
            PathBuf::from(format!("{problem_name}-model.{solution_ext}")),
        )
    } else {
        let pid = std::process::id();
        (
            tmp_dir.join(format!("{pid}-model.{model_ext}")),
            tmp_dir.join(format!("{pid}-model.{solution_ext}")),
        )
    }
}

/// Best-effort removal of the given temporaries unless they are kept.
pub(crate) fn remove_temp_files(keep_files: bool, paths: &[&Path]) {
    if keep_files {
        return;
    }
    for path in paths {
        let _ = fs::remove_file(path);
    }
}

/// Run a solver process to completion, optionally feeding a scripted
/// stdin session, silencing its output when `msg` is off.
pub(crate) fn run_solver_process(
    program: &Path,
    args: &[String],
    stdin_script: Option<&str>,
    msg: bool,
) -> LpResult<ExitStatus> {
    let mut command = Command::new(program);
    command.args(args);
    if !msg {
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());
    }
    if stdin_script.is_some() {
        command.stdin(Stdio::piped());
    } else {
        command.stdin(Stdio::null());
    }
    log::debug!("spawning {} {}", program.display(), args.join(" "));
    let mut child = command.spawn()?;
    if let Some(script) = stdin_script {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.as_bytes())?;
        }
    }
    Ok(child.wait()?)
}

/// Fail on a nonzero exit code.
pub(crate) fn check_exit(solver: &'static str, status: ExitStatus) -> LpResult<()> {
    if status.success() {
        Ok(())
    } else {
        Err(LpError::SolverFailure { solver, code: status.code() })
    }
}

/// Fail when the solver exited without leaving its solution file.
pub(crate) fn require_solution_file(solver: &'static str, path: &Path) -> LpResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(LpError::MissingSolutionFile { solver, path: path.to_path_buf() })
    }
}

/// Probe the command-line backends in fixed order (CPLEX, then COIN, then
/// GLPK) and return the first one available. The probe runs on every
/// call; there is no cached global.
pub fn default_solver() -> Option<Box<dyn Solver>> {
    let cplex = Cplex::default();
    if cplex.available() {
        return Some(Box::new(cplex));
    }
    let coin = Coin::default();
    if coin.available() {
        return Some(Box::new(coin));
    }
    let glpk = Glpk::default();
    if glpk.available() {
        return Some(Box::new(glpk));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_dir_is_a_directory_or_empty() {
        let dir = resolve_tmp_dir();
        assert!(dir.as_os_str().is_empty() || dir.is_dir());
    }

    #[test]
    fn missing_executables_are_not_found() {
        assert!(find_executable(Path::new("surely-not-a-real-solver-binary")).is_none());
        assert!(find_executable(Path::new("/surely/not/a/real/solver/binary")).is_none());
    }

    #[test]
    fn executable_extension_is_platform_dependent() {
        let name = executable_extension("glpsol");
        if cfg!(windows) {
            assert_eq!(name, "glpsol.exe");
        } else {
            assert_eq!(name, "glpsol");
        }
    }

    #[test]
    fn temp_paths_are_deterministic_when_keeping_files() {
        let (model, solution) = temp_paths("diet", true, Path::new("/tmp"), "lp", "sol");
        assert_eq!(model, PathBuf::from("diet-model.lp"));
        assert_eq!(solution, PathBuf::from("diet-model.sol"));

        let (model, solution) = temp_paths("diet", false, Path::new("/tmp"), "mps", "sol");
        let pid = std::process::id().to_string();
        assert!(model.to_string_lossy().contains(&pid));
        assert!(model.to_string_lossy().ends_with("-model.mps"));
        assert!(solution.starts_with("/tmp"));
    }
}
