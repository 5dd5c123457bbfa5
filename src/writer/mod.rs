//! Text emission of models: CPLEX-style LP and fixed-column MPS.

pub mod lp;
pub mod mps;

use crate::error::{LpError, LpResult};
use crate::problem::Problem;

/// Maximum line length of the LP format.
pub(crate) const LP_LINE_WIDTH: usize = 78;

/// Render a number with up to twelve significant digits, dropping trailing
/// zeros and switching to scientific notation outside the `1e-4..1e12`
/// magnitude range.
pub(crate) fn fmt_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_owned();
    }
    let sci = format!("{value:.11e}");
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if exponent < -4 || exponent >= 12 {
        let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    } else {
        let decimals = (11 - exponent).max(0) as usize;
        let fixed = format!("{value:.decimals$}");
        if fixed.contains('.') {
            fixed.trim_end_matches('0').trim_end_matches('.').to_owned()
        } else {
            fixed
        }
    }
}

/// Render a number in the signed scientific form of MPS coefficient
/// fields: a sign column (space for positive), five fractional digits and
/// a two-digit exponent, e.g. ` 1.00000e+00` / `-2.50000e-01`.
pub(crate) fn fmt_scientific(value: f64) -> String {
    let sci = format!("{:.5e}", value.abs());
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let sign = if value < 0.0 { '-' } else { ' ' };
    let exponent_sign = if exponent < 0 { '-' } else { '+' };
    format!("{sign}{mantissa}e{exponent_sign}{:02}", exponent.abs())
}

/// Names both formats can carry without quoting.
pub(crate) fn validate_name(name: &str) -> LpResult<()> {
    let mut chars = name.chars();
    let valid_head = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_head && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(LpError::invalid_name(name))
    }
}

/// No variable may carry a lower bound above its upper bound.
pub(crate) fn validate_bounds(problem: &Problem) -> LpResult<()> {
    for var in problem.variables() {
        if let (Some(low), Some(up)) = (var.low_bound(), var.up_bound()) {
            if low > up {
                return Err(LpError::InconsistentBounds { name: var.name(), low, up });
            }
        }
    }
    Ok(())
}

/// Check every variable, constraint and objective name against the format
/// character set.
pub(crate) fn validate_names(problem: &Problem) -> LpResult<()> {
    for var in problem.variables() {
        validate_name(&var.name())?;
    }
    for name in problem.constraints().keys() {
        validate_name(name)?;
    }
    if let Some(name) = problem.objective().and_then(|obj| obj.name()) {
        validate_name(name)?;
    }
    Ok(())
}

pub(crate) fn validate_problem(problem: &Problem) -> LpResult<()> {
    validate_bounds(problem)?;
    validate_names(problem)
}
