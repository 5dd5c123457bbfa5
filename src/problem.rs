//! The problem container: an objective, named constraints in insertion
//! order, optional SOS sets, and the status left behind by a solve.

use std::path::Path;

use indexmap::{IndexMap, IndexSet};

use crate::constraint::Constraint;
use crate::error::{LpError, LpResult};
use crate::expression::AffineExpression;
use crate::model::{Category, Sense, Status};
use crate::solvers::Solver;
use crate::variable::Variable;
use crate::writer::lp::{self, LpWriterOptions};
use crate::writer::mps::{self, MpsWriteInfo, MpsWriterOptions};

/// Anything [`Problem::add`] accepts: a constraint, a new objective, or a
/// trivially-known truth value.
#[derive(Debug, Clone)]
pub enum Element {
    Constraint(Constraint),
    Objective(AffineExpression),
    Satisfied(bool),
}

impl From<Constraint> for Element {
    fn from(constraint: Constraint) -> Self {
        Self::Constraint(constraint)
    }
}

impl From<AffineExpression> for Element {
    fn from(expression: AffineExpression) -> Self {
        Self::Objective(expression)
    }
}

impl From<&Variable> for Element {
    fn from(var: &Variable) -> Self {
        Self::Objective(AffineExpression::from(var))
    }
}

impl From<Variable> for Element {
    fn from(var: Variable) -> Self {
        Self::Objective(AffineExpression::from(&var))
    }
}

impl From<f64> for Element {
    fn from(constant: f64) -> Self {
        Self::Objective(AffineExpression::from(constant))
    }
}

impl From<bool> for Element {
    fn from(satisfied: bool) -> Self {
        Self::Satisfied(satisfied)
    }
}

/// An LP or MIP problem under construction.
///
/// The problem holds only references to the variables it discovers through
/// its objective and constraints; solution values assigned after a solve
/// are visible through every handle to the same variable.
#[derive(Debug, Clone)]
pub struct Problem {
    pub name: String,
    pub sense: Sense,
    objective: Option<AffineExpression>,
    constraints: IndexMap<String, Constraint>,
    sos1: IndexMap<String, IndexMap<Variable, f64>>,
    sos2: IndexMap<String, IndexMap<Variable, f64>>,
    status: Status,
    no_overlap: bool,
    last_unused: u64,
}

impl Problem {
    pub fn new(name: &str, sense: Sense) -> Self {
        Self {
            name: name.to_string(),
            sense,
            objective: None,
            constraints: IndexMap::new(),
            sos1: IndexMap::new(),
            sos2: IndexMap::new(),
            status: Status::NotSolved,
            no_overlap: true,
            last_unused: 0,
        }
    }

    /// Allow duplicate constraint names to overwrite (with a warning)
    /// instead of failing.
    #[must_use]
    pub fn with_overlap_allowed(mut self) -> Self {
        self.no_overlap = false;
        self
    }

    pub fn objective(&self) -> Option<&AffineExpression> {
        self.objective.as_ref()
    }

    pub fn set_objective(&mut self, objective: AffineExpression) {
        self.objective = Some(objective);
    }

    pub fn constraints(&self) -> &IndexMap<String, Constraint> {
        &self.constraints
    }

    pub fn sos1(&self) -> &IndexMap<String, IndexMap<Variable, f64>> {
        &self.sos1
    }

    pub fn sos2(&self) -> &IndexMap<String, IndexMap<Variable, f64>> {
        &self.sos2
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    /// Add a constraint or replace the objective, dispatching on the
    /// element kind.
    ///
    /// A constraint with no variables is dropped when trivially satisfied.
    /// `true` is ignored; it is what a comparison of two constants that
    /// holds would reduce to.
    ///
    /// # Errors
    ///
    /// Fails on a trivially false constraint, on `false`, and on a
    /// duplicate constraint name unless overlap is allowed.
    pub fn add(&mut self, element: impl Into<Element>) -> LpResult<()> {
        self.add_element(element.into(), None)
    }

    /// [`Problem::add`] with the name forced.
    ///
    /// # Errors
    ///
    /// See [`Problem::add`].
    pub fn add_named(&mut self, name: &str, element: impl Into<Element>) -> LpResult<()> {
        self.add_element(element.into(), Some(name.to_string()))
    }

    fn add_element(&mut self, element: Element, name: Option<String>) -> LpResult<()> {
        match element {
            Element::Constraint(constraint) => self.push_constraint(constraint, name),
            Element::Objective(mut expression) => {
                if name.is_some() {
                    expression.set_name(name);
                }
                self.objective = Some(expression);
                Ok(())
            }
            Element::Satisfied(true) => Ok(()),
            Element::Satisfied(false) => Err(LpError::UnsupportedElement),
        }
    }

    fn push_constraint(&mut self, constraint: Constraint, forced_name: Option<String>) -> LpResult<()> {
        if constraint.expression().is_empty() {
            if !constraint.valid(0.0) {
                return Err(LpError::FalseConstraint { constraint: constraint.to_string() });
            }
            return Ok(());
        }
        let name = forced_name
            .or_else(|| constraint.name().map(str::to_string))
            .unwrap_or_else(|| self.unused_constraint_name());
        if self.constraints.contains_key(&name) {
            if self.no_overlap {
                return Err(LpError::duplicate_constraint(name));
            }
            log::warn!("overlapping constraint name '{name}', overwriting");
        }
        self.constraints.insert(name, constraint);
        Ok(())
    }

    /// Add every constraint of a sequence under its own or an auto name.
    ///
    /// # Errors
    ///
    /// Fails like [`Problem::add`] on the first offending constraint.
    pub fn extend(&mut self, constraints: impl IntoIterator<Item = Constraint>) -> LpResult<()> {
        for constraint in constraints {
            self.push_constraint(constraint, None)?;
        }
        Ok(())
    }

    /// The first unused auto-generated constraint name `_C<k>`.
    fn unused_constraint_name(&mut self) -> String {
        self.last_unused += 1;
        loop {
            let candidate = format!("_C{}", self.last_unused);
            if !self.constraints.contains_key(&candidate) {
                return candidate;
            }
            self.last_unused += 1;
        }
    }

    /// Register a special ordered set of type 1.
    pub fn add_sos1(&mut self, name: &str, weights: impl IntoIterator<Item = (Variable, f64)>) {
        self.sos1.insert(name.to_string(), weights.into_iter().collect());
    }

    /// Register a special ordered set of type 2.
    pub fn add_sos2(&mut self, name: &str, weights: impl IntoIterator<Item = (Variable, f64)>) {
        self.sos2.insert(name.to_string(), weights.into_iter().collect());
    }

    /// Every variable reachable from the objective and the constraints, in
    /// discovery order and deduplicated by identity.
    pub fn variables(&self) -> Vec<Variable> {
        let mut seen: IndexSet<Variable> = IndexSet::new();
        if let Some(objective) = &self.objective {
            for (var, _) in objective.iter() {
                seen.insert(var.clone());
            }
        }
        for constraint in self.constraints.values() {
            for (var, _) in constraint.iter() {
                seen.insert(var.clone());
            }
        }
        seen.into_iter().collect()
    }

    /// The same set keyed by name; on a name collision the variable seen
    /// last wins.
    pub fn variables_dict(&self) -> IndexMap<String, Variable> {
        let mut vars = IndexMap::new();
        for var in self.variables() {
            vars.insert(var.name(), var);
        }
        vars
    }

    /// All `(variable name, constraint name, coefficient)` triples of the
    /// constraint matrix.
    pub fn coefficients(&self) -> Vec<(String, String, f64)> {
        let mut triples = Vec::new();
        for (name, constraint) in &self.constraints {
            for (var, coeff) in constraint.iter() {
                triples.push((var.name(), name.clone(), coeff));
            }
        }
        triples
    }

    /// True when any discovered variable is integer.
    pub fn is_mip(&self) -> bool {
        self.variables().iter().any(|v| v.category() == Category::Integer)
    }

    /// Assign solver values back onto the variables by name.
    ///
    /// # Errors
    ///
    /// Fails when a name does not belong to any variable of the problem.
    pub fn assign(&self, values: &IndexMap<String, f64>) -> LpResult<()> {
        let vars = self.variables_dict();
        for (name, value) in values {
            let var = vars.get(name).ok_or_else(|| LpError::UnknownVariable { name: name.clone() })?;
            var.set_value(*value);
        }
        Ok(())
    }

    /// Round every variable's value onto bounds and integer points.
    pub fn round_solution(&self, eps_int: f64, eps: f64) {
        for var in self.variables() {
            var.round(eps_int, eps);
        }
    }

    /// True when every variable and every constraint holds within `eps`.
    pub fn valid(&self, eps: f64) -> bool {
        self.variables().iter().all(|v| v.valid(eps))
            && self.constraints.values().all(|c| c.valid(eps))
    }

    /// The worst violation across variables and constraints.
    ///
    /// # Errors
    ///
    /// Fails when a variable has no value.
    pub fn infeasibility_gap(&self, mip: bool) -> LpResult<f64> {
        let mut gap: f64 = 0.0;
        for var in self.variables() {
            gap = gap.max(var.infeasibility_gap(mip)?.abs());
        }
        for constraint in self.constraints.values() {
            if !constraint.valid(0.0) {
                if let Some(value) = constraint.value() {
                    gap = gap.max(value.abs());
                }
            }
        }
        Ok(gap)
    }

    /// Rename maps used by the MPS writer's rename mode: constraints become
    /// `C0000000...`, variables `X0000000...`, the objective `OBJ`.
    pub fn normalized_names(&self) -> (IndexMap<String, String>, IndexMap<String, String>, &'static str) {
        let constraint_names = self
            .constraints
            .keys()
            .enumerate()
            .map(|(i, name)| (name.clone(), format!("C{i:07}")))
            .collect();
        let variable_names = self
            .variables()
            .iter()
            .enumerate()
            .map(|(i, var)| (var.name(), format!("X{i:07}")))
            .collect();
        (constraint_names, variable_names, "OBJ")
    }

    /// Make sure the objective demands a variable: an absent objective
    /// becomes an empty expression, and a pure-constant objective gains a
    /// throwaway `__dummy` variable fixed to zero. Every call must be
    /// paired with [`Problem::restore_objective`] on the same control path.
    pub fn fix_objective(&mut self) -> (bool, Option<Variable>) {
        let was_none = self.objective.is_none();
        let mut objective = self.objective.take().unwrap_or_default();
        let dummy = if objective.is_numerical_constant() {
            let dummy = Variable::new("__dummy", Some(0.0), Some(0.0), Category::Continuous);
            objective.add_in_place(&dummy);
            Some(dummy)
        } else {
            None
        };
        self.objective = Some(objective);
        (was_none, dummy)
    }

    /// Undo [`Problem::fix_objective`].
    pub fn restore_objective(&mut self, was_none: bool, dummy: Option<Variable>) {
        if was_none {
            self.objective = None;
        } else if let Some(dummy) = dummy {
            if let Some(objective) = self.objective.as_mut() {
                objective.sub_in_place(&dummy);
            }
        }
    }

    /// Write the problem in CPLEX-style LP format.
    ///
    /// # Errors
    ///
    /// Fails on invalid names, inconsistent bounds, or I/O.
    pub fn write_lp(&mut self, path: &Path, options: &LpWriterOptions) -> LpResult<()> {
        lp::write_lp_file(self, path, options)
    }

    /// Write the problem in fixed-column MPS format, returning the variable
    /// order and rename maps for a downstream solution parser.
    ///
    /// # Errors
    ///
    /// Fails on invalid names, inconsistent bounds, or I/O.
    pub fn write_mps(&mut self, path: &Path, options: &MpsWriterOptions) -> LpResult<MpsWriteInfo> {
        mps::write_mps_file(self, path, options)
    }

    /// Solve with the given backend: fix the objective, hand the problem to
    /// the solver, and restore the objective afterwards.
    ///
    /// # Errors
    ///
    /// Propagates solver errors; the objective fix-up is not unwound on an
    /// error path.
    pub fn solve(&mut self, solver: &dyn Solver) -> LpResult<Status> {
        let (was_none, dummy) = self.fix_objective();
        let status = solver.actual_solve(self)?;
        self.restore_objective(was_none, dummy);
        Ok(status)
    }
}
