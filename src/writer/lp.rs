//! CPLEX-style LP file emission.
//!
//! Lines never exceed 78 characters: a term that would overflow the
//! current line starts a new one. Constraints are emitted in ascending
//! name order and variables in name order, so re-emitting the same
//! problem yields byte-identical output.

use std::fs;
use std::path::Path;

use crate::constraint::Constraint;
use crate::error::LpResult;
use crate::expression::AffineExpression;
use crate::model::Category;
use crate::problem::Problem;
use crate::variable::Variable;
use crate::writer::{fmt_number, validate_problem, LP_LINE_WIDTH};

/// Options for LP emission.
#[derive(Debug, Clone)]
pub struct LpWriterOptions {
    /// Emit the SOS section. GLPK does not accept it, so its driver turns
    /// this off.
    pub write_sos: bool,
    /// Emit the integer sections and treat binaries specially. When off,
    /// every variable is written as continuous.
    pub mip: bool,
}

impl Default for LpWriterOptions {
    fn default() -> Self {
        Self { write_sos: true, mip: true }
    }
}

/// Write a problem to a string in CPLEX-style LP format with default
/// options.
///
/// # Errors
///
/// Fails on invalid names or inconsistent bounds.
pub fn write_lp_string(problem: &mut Problem) -> LpResult<String> {
    write_lp_string_with_options(problem, &LpWriterOptions::default())
}

/// Write a problem to a string in CPLEX-style LP format.
///
/// The objective is fixed up first (an absent or pure-constant objective
/// gains the throwaway `__dummy` variable) and restored before returning.
///
/// # Errors
///
/// Fails on invalid names or inconsistent bounds.
pub fn write_lp_string_with_options(problem: &mut Problem, options: &LpWriterOptions) -> LpResult<String> {
    validate_problem(problem)?;
    let (was_none, dummy) = problem.fix_objective();

    let mut out = String::new();
    out.push_str(&format!("\\* {} *\\\n", problem.name));
    out.push_str(if problem.sense.is_minimization() { "Minimize\n" } else { "Maximize\n" });

    if let Some(objective) = problem.objective() {
        append_expression(&mut out, objective.name().unwrap_or("OBJ"), objective);
    }

    out.push_str("Subject To\n");
    let mut names: Vec<String> = problem.constraints().keys().cloned().collect();
    names.sort();
    for name in &names {
        if let Some(constraint) = problem.constraints().get(name) {
            append_constraint(&mut out, name, constraint);
        }
    }

    let mut vs = problem.variables();
    vs.sort_by_key(Variable::name);

    let bounded: Vec<&Variable> = if options.mip {
        vs.iter()
            .filter(|v| !(v.is_positive() && v.category() == Category::Continuous) && !v.is_binary())
            .collect()
    } else {
        vs.iter().filter(|v| !v.is_positive()).collect()
    };
    if !bounded.is_empty() {
        out.push_str("Bounds\n");
        for var in bounded {
            out.push_str(&bound_line(var));
            out.push('\n');
        }
    }

    if options.mip {
        let generals: Vec<&Variable> =
            vs.iter().filter(|v| v.category() == Category::Integer && !v.is_binary()).collect();
        if !generals.is_empty() {
            out.push_str("Generals\n");
            for var in generals {
                out.push_str(&var.name());
                out.push('\n');
            }
        }
        let binaries: Vec<&Variable> = vs.iter().filter(|v| v.is_binary()).collect();
        if !binaries.is_empty() {
            out.push_str("Binaries\n");
            for var in binaries {
                out.push_str(&var.name());
                out.push('\n');
            }
        }
    }

    if options.write_sos && !(problem.sos1().is_empty() && problem.sos2().is_empty()) {
        out.push_str("SOS\n");
        for sos in problem.sos1().values() {
            out.push_str("S1:: \n");
            for (var, weight) in sos {
                out.push_str(&format!(" {}: {}\n", var.name(), fmt_number(*weight)));
            }
        }
        for sos in problem.sos2().values() {
            out.push_str("S2:: \n");
            for (var, weight) in sos {
                out.push_str(&format!(" {}: {}\n", var.name(), fmt_number(*weight)));
            }
        }
    }

    out.push_str("End\n");
    problem.restore_objective(was_none, dummy);
    Ok(out)
}

/// Write a problem to a file in CPLEX-style LP format.
///
/// # Errors
///
/// Fails on invalid names, inconsistent bounds, or I/O.
pub fn write_lp_file(problem: &mut Problem, path: &Path, options: &LpWriterOptions) -> LpResult<()> {
    let contents = write_lp_string_with_options(problem, options)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Append the term chunks of `expr` onto `line`, flushing `line` to `out`
/// whenever the next chunk would push it past the line width.
fn append_terms(out: &mut String, line: &mut String, expr: &AffineExpression) {
    let mut not_first = false;
    for (var, coeff) in expr.iter() {
        let (prefix, magnitude) = if coeff < 0.0 {
            (" - ", -coeff)
        } else if not_first {
            (" + ", coeff)
        } else {
            (" ", coeff)
        };
        not_first = true;
        let chunk = if magnitude == 1.0 {
            format!("{prefix}{}", var.name())
        } else {
            format!("{prefix}{} {}", fmt_number(magnitude), var.name())
        };
        if line.len() + chunk.len() > LP_LINE_WIDTH {
            out.push_str(line);
            out.push('\n');
            *line = chunk;
        } else {
            line.push_str(&chunk);
        }
    }
}

fn append_tail(out: &mut String, line: &str, tail: &str) {
    if line.len() + tail.len() > LP_LINE_WIDTH {
        out.push_str(line);
        out.push('\n');
        out.push_str(tail);
        out.push('\n');
    } else {
        out.push_str(line);
        out.push_str(tail);
        out.push('\n');
    }
}

/// The objective row. The constant is not written; the LP objective row
/// always carries at least one variable after the fix-up.
fn append_expression(out: &mut String, label: &str, expr: &AffineExpression) {
    let mut line = format!("{label}:");
    append_terms(out, &mut line, expr);
    let tail = if expr.is_numerical_constant() { format!(" {}", fmt_number(expr.constant())) } else { String::new() };
    append_tail(out, &line, &tail);
}

fn append_constraint(out: &mut String, label: &str, constraint: &Constraint) {
    let mut line = format!("{label}:");
    append_terms(out, &mut line, constraint.expression());
    if constraint.expression().is_empty() {
        line.push('0');
    }
    let tail = format!(" {} {}", constraint.sense().symbol(), fmt_number(constraint.rhs()));
    append_tail(out, &line, &tail);
}

/// The Bounds-section line for one variable.
fn bound_line(var: &Variable) -> String {
    let name = var.name();
    if var.is_free() {
        return format!("{name} free");
    }
    if var.is_constant() {
        return format!("{name} = {}", fmt_number(var.low_bound().unwrap_or(0.0)));
    }
    let mut line = match var.low_bound() {
        // CPLEX and XPRESS do not interpret integer variables without
        // explicit bounds, hence the explicit -inf.
        None => "-inf <= ".to_string(),
        Some(low) if low == 0.0 && var.category() == Category::Continuous => String::new(),
        Some(low) => format!("{} <= ", fmt_number(low)),
    };
    line.push_str(&name);
    if let Some(up) = var.up_bound() {
        line.push_str(&format!(" <= {}", fmt_number(up)));
    }
    line
}
