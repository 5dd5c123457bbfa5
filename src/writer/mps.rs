//! Fixed-column MPS file emission.
//!
//! Sections are emitted in the strict order `*SENSE:`, `NAME`, `ROWS`,
//! `COLUMNS`, `RHS`, `BOUNDS`, `ENDATA`. Columns are grouped per variable
//! in discovery order (first the objective, then each constraint in
//! insertion order); that ordering is part of the format contract and is
//! reproducible byte-for-byte for the same construction sequence.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::LpResult;
use crate::model::{Category, Sense};
use crate::problem::Problem;
use crate::variable::Variable;
use crate::writer::{fmt_scientific, validate_bounds, validate_names};

/// Options for MPS emission.
#[derive(Debug, Clone, Default)]
pub struct MpsWriterOptions {
    /// Emit under this sense instead of the problem's own; the objective
    /// is negated when the two differ.
    pub sense: Option<Sense>,
    /// Rename constraints to `C0000000...`, variables to `X0000000...`
    /// and the objective row to `OBJ`.
    pub rename: bool,
    /// Bracket integer columns with marker records.
    pub mip: bool,
}

impl MpsWriterOptions {
    /// The defaults of a plain MIP emission: native sense, no renaming,
    /// markers on.
    #[must_use]
    pub fn mip() -> Self {
        Self { sense: None, rename: false, mip: true }
    }
}

/// What a downstream solution parser needs to know about an emission.
#[derive(Debug, Clone)]
pub struct MpsWriteInfo {
    /// Variables in writing order.
    pub variables: Vec<Variable>,
    /// Original name to `X0000000...` map, when renaming.
    pub variable_names: Option<IndexMap<String, String>>,
    /// Original name to `C0000000...` map, when renaming.
    pub constraint_names: Option<IndexMap<String, String>>,
    /// The objective row name that was written.
    pub objective_name: String,
}

/// Write a problem to a string in fixed-column MPS format.
///
/// # Errors
///
/// Fails on inconsistent bounds, or on invalid names unless renaming.
pub fn write_mps_string(problem: &mut Problem, options: &MpsWriterOptions) -> LpResult<(String, MpsWriteInfo)> {
    validate_bounds(problem)?;
    if !options.rename {
        validate_names(problem)?;
    }
    let (was_none, dummy) = problem.fix_objective();

    let emission_sense = options.sense.unwrap_or(problem.sense);
    let mut objective = problem.objective().cloned().unwrap_or_default();
    if emission_sense != problem.sense {
        let name = objective.name().map(str::to_string);
        objective = -objective;
        objective.set_name(name);
    }

    let (constraint_names, variable_names) = if options.rename {
        let (constraints, variables, _) = problem.normalized_names();
        (Some(constraints), Some(variables))
    } else {
        (None, None)
    };
    let row_name = |name: &str| match &constraint_names {
        Some(map) => map.get(name).cloned().unwrap_or_else(|| name.to_string()),
        None => name.to_string(),
    };
    let col_name = |name: &str| match &variable_names {
        Some(map) => map.get(name).cloned().unwrap_or_else(|| name.to_string()),
        None => name.to_string(),
    };
    let objective_name = if options.rename {
        "OBJ".to_string()
    } else {
        objective.name().unwrap_or("OBJ").to_string()
    };

    let mut out = String::new();
    out.push_str(&format!("*SENSE:{emission_sense}\n"));
    let problem_name = if options.rename { "MODEL" } else { problem.name.as_str() };
    out.push_str(&format!("NAME          {problem_name}\n"));

    let vs = problem.variables();

    out.push_str("ROWS\n");
    out.push_str(&format!(" N  {objective_name}\n"));
    for (name, constraint) in problem.constraints() {
        out.push_str(&format!(" {}  {}\n", constraint.sense().mps_row_type(), row_name(name)));
    }

    // One column group per variable: its constraint coefficients in
    // constraint insertion order, then its objective coefficient.
    let mut coefs: IndexMap<String, IndexMap<String, f64>> = IndexMap::new();
    for (name, constraint) in problem.constraints() {
        let row = row_name(name);
        for (var, coeff) in constraint.iter() {
            coefs.entry(col_name(&var.name())).or_default().insert(row.clone(), coeff);
        }
    }
    out.push_str("COLUMNS\n");
    for var in &vs {
        let marked = options.mip && var.category() == Category::Integer;
        if marked {
            out.push_str("    MARK      'MARKER'                 'INTORG'\n");
        }
        let column = col_name(&var.name());
        if let Some(rows) = coefs.get(&column) {
            for (row, coeff) in rows {
                out.push_str(&format!("    {column:<8}  {row:<8}  {}\n", fmt_scientific(*coeff)));
            }
        }
        let objective_coeff = objective.coefficient(var);
        if objective_coeff != 0.0 {
            out.push_str(&format!("    {column:<8}  {objective_name:<8}  {}\n", fmt_scientific(objective_coeff)));
        }
        if marked {
            out.push_str("    MARK      'MARKER'                 'INTEND'\n");
        }
    }

    out.push_str("RHS\n");
    for (name, constraint) in problem.constraints() {
        let row = row_name(name);
        out.push_str(&format!("    RHS       {row:<8}  {}\n", fmt_scientific(constraint.rhs())));
    }

    out.push_str("BOUNDS\n");
    for var in &vs {
        let column = col_name(&var.name());
        let low = var.low_bound();
        let up = var.up_bound();
        let integer = var.category() == Category::Integer;
        if low.is_some() && low == up {
            out.push_str(&format!(" FX BND       {column:<8}  {}\n", fmt_scientific(low.unwrap_or(0.0))));
        } else if low == Some(0.0) && up == Some(1.0) && options.mip && integer {
            out.push_str(&format!(" BV BND       {column:<8}\n"));
        } else {
            if let Some(low) = low {
                // A column without bound records is taken as >= 0 by COIN
                // and CPLEX, so a zero lower bound is only spelled out when
                // an integer column would otherwise look binary.
                if low != 0.0 || (options.mip && integer && up.is_none()) {
                    out.push_str(&format!(" LO BND       {column:<8}  {}\n", fmt_scientific(low)));
                }
            } else if up.is_some() {
                out.push_str(&format!(" MI BND       {column:<8}\n"));
            } else {
                out.push_str(&format!(" FR BND       {column:<8}\n"));
            }
            if let Some(up) = up {
                out.push_str(&format!(" UP BND       {column:<8}  {}\n", fmt_scientific(up)));
            }
        }
    }
    out.push_str("ENDATA\n");

    problem.restore_objective(was_none, dummy);
    let info = MpsWriteInfo { variables: vs, variable_names, constraint_names, objective_name };
    Ok((out, info))
}

/// Write a problem to a file in fixed-column MPS format, returning the
/// variable order and rename maps for a downstream solution parser.
///
/// # Errors
///
/// Fails on inconsistent bounds, invalid names, or I/O.
pub fn write_mps_file(problem: &mut Problem, path: &Path, options: &MpsWriterOptions) -> LpResult<MpsWriteInfo> {
    let (contents, info) = write_mps_string(problem, options)?;
    fs::write(path, contents)?;
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;
    use crate::model::Sense;

    fn sample_problem() -> Problem {
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
        prob
    }

    #[test]
    fn golden_continuous_problem() {
        let mut prob = sample_problem();
        let (out, info) = write_mps_string(&mut prob, &MpsWriterOptions::mip()).unwrap();

        let expected = "\
*SENSE:Minimize
NAME          test1
ROWS
 N  obj
 L  c1
 G  c2
 E  c3
 G  c4
COLUMNS
    x         c1         1.00000e+00
    x         c2         1.00000e+00
    x         obj        1.00000e+00
    y         c1         1.00000e+00
    y         c3        -1.00000e+00
    y         obj        4.00000e+00
    z         c2         1.00000e+00
    z         c3         1.00000e+00
    z         obj        9.00000e+00
    w         c4         1.00000e+00
RHS
    RHS       c1         5.00000e+00
    RHS       c2         1.00000e+01
    RHS       c3         7.00000e+00
    RHS       c4         0.00000e+00
BOUNDS
 UP BND       x          4.00000e+00
 LO BND       y         -1.00000e+00
 UP BND       y          1.00000e+00
ENDATA
";
        assert_eq!(out, expected);
        let order: Vec<String> = info.variables.iter().map(Variable::name).collect();
        assert_eq!(order, ["x", "y", "z", "w"]);
        assert_eq!(info.objective_name, "obj");
        assert!(info.variable_names.is_none());
    }

    #[test]
    fn emission_is_idempotent() {
        let mut prob = sample_problem();
        let (first, _) = write_mps_string(&mut prob, &MpsWriterOptions::mip()).unwrap();
        let (second, _) = write_mps_string(&mut prob, &MpsWriterOptions::mip()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn integer_columns_are_bracketed_by_markers() {
        let x = Variable::new("x", Some(0.0), Some(4.0), Category::Continuous);
        let z = Variable::new("z", Some(0.0), None, Category::Integer);
        let mut prob = Problem::new("mip", Sense::Minimize);
        prob.add_named("obj", &x + 9.0 * &z).unwrap();
        prob.add_named("c1", Constraint::ge(&x + &z, 10.0)).unwrap();

        let (out, _) = write_mps_string(&mut prob, &MpsWriterOptions::mip()).unwrap();
        let expected_block = "\
    MARK      'MARKER'                 'INTORG'
    z         c1         1.00000e+00
    z         obj        9.00000e+00
    MARK      'MARKER'                 'INTEND'
";
        assert!(out.contains(expected_block));
        // Integer without an upper bound: the zero lower bound is explicit.
        assert!(out.contains(" LO BND       z          0.00000e+00\n"));

        let (relaxed, _) =
            write_mps_string(&mut prob, &MpsWriterOptions { sense: None, rename: false, mip: false }).unwrap();
        assert!(!relaxed.contains("MARKER"));
        assert!(!relaxed.contains(" LO BND       z"));
    }

    #[test]
    fn binary_fixed_free_and_minus_infinity_bounds() {
        let b = Variable::binary("b");
        let c = Variable::new("c", Some(2.5), Some(2.5), Category::Continuous);
        let f = Variable::continuous("f");
        let m = Variable::new("m", None, Some(3.0), Category::Continuous);
        let mut prob = Problem::new("bounds", Sense::Minimize);
        prob.add_named("obj", &b + &c + &f + &m).unwrap();

        let (out, _) = write_mps_string(&mut prob, &MpsWriterOptions::mip()).unwrap();
        assert!(out.contains(" BV BND       b       \n"));
        assert!(out.contains(" FX BND       c          2.50000e+00\n"));
        assert!(out.contains(" FR BND       f       \n"));
        assert!(out.contains(" MI BND       m       \n"));
        assert!(out.contains(" UP BND       m          3.00000e+00\n"));
    }

    #[test]
    fn rename_mode_normalizes_every_name() {
        let mut prob = sample_problem();
        let options = MpsWriterOptions { sense: None, rename: true, mip: true };
        let (out, info) = write_mps_string(&mut prob, &options).unwrap();

        assert!(out.contains("NAME          MODEL\n"));
        assert!(out.contains(" N  OBJ\n"));
        assert!(out.contains(" L  C0000000\n"));
        assert!(out.contains("    X0000000  C0000000   1.00000e+00\n"));
        assert!(!out.contains(" L  c1\n"));

        let variable_names = info.variable_names.unwrap();
        assert_eq!(variable_names["x"], "X0000000");
        assert_eq!(variable_names["w"], "X0000003");
        let constraint_names = info.constraint_names.unwrap();
        assert_eq!(constraint_names["c4"], "C0000003");
        assert_eq!(info.objective_name, "OBJ");
    }

    #[test]
    fn sense_override_negates_the_objective() {
        let mut prob = sample_problem();
        let options = MpsWriterOptions { sense: Some(Sense::Maximize), rename: false, mip: true };
        let (out, _) = write_mps_string(&mut prob, &options).unwrap();

        assert!(out.contains("*SENSE:Maximize\n"));
        assert!(out.contains("    x         obj       -1.00000e+00\n"));
        assert!(out.contains("    y         obj       -4.00000e+00\n"));

        // The in-memory objective is untouched.
        let obj = prob.objective().unwrap();
        let x = prob.variables().into_iter().find(|v| v.name() == "x").unwrap();
        assert_eq!(obj.coefficient(&x), 1.0);
    }

    #[test]
    fn constant_objective_gets_the_dummy_column() {
        let x = Variable::new("x", Some(0.0), Some(4.0), Category::Continuous);
        let mut prob = Problem::new("feas", Sense::Minimize);
        prob.add_named("c1", Constraint::le(&x + 0.0, 4.0)).unwrap();

        let (out, info) = write_mps_string(&mut prob, &MpsWriterOptions::mip()).unwrap();
        assert!(out.contains(" N  OBJ\n"));
        assert!(out.contains("    __dummy   OBJ        1.00000e+00\n"));
        assert!(out.contains(" FX BND       __dummy    0.00000e+00\n"));
        assert_eq!(info.variables.len(), 2);
        assert!(prob.objective().is_none());
    }
}
