//! Affine expressions: linear combinations of variables plus a constant.
//!
//! An [`AffineExpression`] maps each contributing [`Variable`] to its
//! nonzero coefficient. A coefficient that collapses to zero is removed
//! from the map, so iteration only ever yields contributing terms, in
//! insertion order.
//!
//! Expressions are built with the usual operators:
//!
//! ```rust
//! use lp_modeler_rs::{Category, Variable};
//!
//! let x = Variable::new("x", Some(0.0), Some(4.0), Category::Continuous);
//! let y = Variable::new("y", Some(-1.0), Some(1.0), Category::Continuous);
//! let objective = &x + 4.0 * &y;
//! ```
//!
//! Multiplication and division stay linear: scaling by a number is an
//! operator, while the expression-by-expression forms are fallible
//! ([`AffineExpression::try_mul`], [`AffineExpression::try_div`]) and
//! reject operands that would introduce a nonlinear term.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::error::{LpError, LpResult};
use crate::variable::Variable;

/// A linear combination of variables plus a scalar constant.
///
/// The optional name is used as the objective or constraint row name when
/// the expression is attached to a problem; arithmetic drops it, since the
/// result is a different expression.
#[derive(Debug, Clone, Default)]
pub struct AffineExpression {
    terms: IndexMap<Variable, f64>,
    constant: f64,
    name: Option<String>,
}

impl AffineExpression {
    /// The empty expression: no terms, constant zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from explicit terms and a constant. Zero coefficients are
    /// dropped; duplicate variables accumulate.
    pub fn from_terms(terms: impl IntoIterator<Item = (Variable, f64)>, constant: f64) -> Self {
        let mut expr = Self { constant, ..Self::default() };
        for (var, coeff) in terms {
            expr.add_term_owned(var, coeff);
        }
        expr
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True when the expression carries no variables at all.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Iterate over `(variable, coefficient)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, f64)> {
        self.terms.iter().map(|(var, coeff)| (var, *coeff))
    }

    /// The coefficient of `var`, zero when absent.
    pub fn coefficient(&self, var: &Variable) -> f64 {
        self.terms.get(var).copied().unwrap_or(0.0)
    }

    /// A single variable with coefficient one and no constant.
    pub fn is_atomic(&self) -> bool {
        self.terms.len() == 1 && self.constant == 0.0 && self.terms.values().next() == Some(&1.0)
    }

    /// No variables: the expression is a plain number.
    pub fn is_numerical_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// The variable of an atomic expression.
    pub fn atom(&self) -> Option<Variable> {
        self.terms.keys().next().cloned()
    }

    /// Add `coeff * var`, deleting the entry if the running sum collapses
    /// to zero.
    pub fn add_term(&mut self, var: &Variable, coeff: f64) {
        self.add_term_owned(var.clone(), coeff);
    }

    fn add_term_owned(&mut self, var: Variable, coeff: f64) {
        match self.terms.entry(var) {
            Entry::Occupied(mut occupied) => {
                let sum = occupied.get() + coeff;
                if sum == 0.0 {
                    occupied.shift_remove();
                } else {
                    *occupied.get_mut() = sum;
                }
            }
            Entry::Vacant(vacant) => {
                if coeff != 0.0 {
                    vacant.insert(coeff);
                }
            }
        }
    }

    /// Merge `other` into `self`. Accepts numbers, variables, expressions
    /// and sequences thereof; the name of `self` is kept.
    pub fn add_in_place<T: Into<AffineExpression>>(&mut self, other: T) {
        let other = other.into();
        self.constant += other.constant;
        for (var, coeff) in other.terms {
            self.add_term_owned(var, coeff);
        }
    }

    /// Subtract `other` from `self` in place.
    pub fn sub_in_place<T: Into<AffineExpression>>(&mut self, other: T) {
        let other = other.into();
        self.constant -= other.constant;
        for (var, coeff) in other.terms {
            self.add_term_owned(var, -coeff);
        }
    }

    /// Evaluate against the current variable values; `None` when any
    /// referenced variable has no value.
    pub fn value(&self) -> Option<f64> {
        let mut total = self.constant;
        for (var, coeff) in &self.terms {
            total += var.value()? * coeff;
        }
        Some(total)
    }

    /// Evaluate, substituting each unset variable's default point.
    pub fn value_or_default(&self) -> f64 {
        let mut total = self.constant;
        for (var, coeff) in &self.terms {
            total += var.value_or_default() * coeff;
        }
        total
    }

    /// Multiply two expressions.
    ///
    /// # Errors
    ///
    /// Fails unless at least one side is a numerical constant; the product
    /// would otherwise not be affine.
    pub fn try_mul(&self, other: &AffineExpression) -> LpResult<AffineExpression> {
        let mut result = AffineExpression::new();
        result.constant = self.constant * other.constant;
        if !other.terms.is_empty() {
            if !self.terms.is_empty() {
                return Err(LpError::NonConstantProduct);
            }
            if self.constant != 0.0 {
                for (var, coeff) in &other.terms {
                    result.terms.insert(var.clone(), self.constant * coeff);
                }
            }
        } else if other.constant != 0.0 {
            for (var, coeff) in &self.terms {
                result.terms.insert(var.clone(), other.constant * coeff);
            }
        }
        Ok(result)
    }

    /// Divide by another expression.
    ///
    /// # Errors
    ///
    /// Fails unless the divisor is a numerical constant.
    pub fn try_div(&self, other: &AffineExpression) -> LpResult<AffineExpression> {
        if !other.terms.is_empty() {
            return Err(LpError::NonConstantDivisor);
        }
        let mut result = AffineExpression::new();
        result.constant = self.constant / other.constant;
        for (var, coeff) in &self.terms {
            result.terms.insert(var.clone(), coeff / other.constant);
        }
        Ok(result)
    }

    /// The `a + 2*b - 3*c` fragment without the constant; empty when there
    /// are no terms.
    pub(crate) fn terms_fragment(&self) -> String {
        let mut s = String::new();
        for (var, coeff) in &self.terms {
            let mut value = *coeff;
            if value < 0.0 {
                s.push_str(if s.is_empty() { "-" } else { " - " });
                value = -value;
            } else if !s.is_empty() {
                s.push_str(" + ");
            }
            if value == 1.0 {
                s.push_str(&var.name());
            } else {
                s.push_str(&format!("{}*{}", value, var.name()));
            }
        }
        s
    }
}

impl From<f64> for AffineExpression {
    fn from(constant: f64) -> Self {
        Self { constant, ..Self::default() }
    }
}

impl From<&Variable> for AffineExpression {
    fn from(var: &Variable) -> Self {
        let mut terms = IndexMap::new();
        terms.insert(var.clone(), 1.0);
        Self { terms, constant: 0.0, name: None }
    }
}

impl From<Variable> for AffineExpression {
    fn from(var: Variable) -> Self {
        Self::from(&var)
    }
}

/// Copies the terms and constant; the name is not carried over.
impl From<&AffineExpression> for AffineExpression {
    fn from(expr: &AffineExpression) -> Self {
        Self { terms: expr.terms.clone(), constant: expr.constant, name: None }
    }
}

/// A sequence folds into the sum of its elements.
impl<T: Into<AffineExpression>> From<Vec<T>> for AffineExpression {
    fn from(items: Vec<T>) -> Self {
        lp_sum(items)
    }
}

/// A mapping folds into the sum of its values; the keys are ignored.
impl<K, T: Into<AffineExpression>> From<IndexMap<K, T>> for AffineExpression {
    fn from(items: IndexMap<K, T>) -> Self {
        lp_sum(items.into_values())
    }
}

impl<T: Into<AffineExpression>> Add<T> for AffineExpression {
    type Output = AffineExpression;

    fn add(mut self, rhs: T) -> AffineExpression {
        self.name = None;
        self.add_in_place(rhs);
        self
    }
}

impl<T: Into<AffineExpression>> Sub<T> for AffineExpression {
    type Output = AffineExpression;

    fn sub(mut self, rhs: T) -> AffineExpression {
        self.name = None;
        self.sub_in_place(rhs);
        self
    }
}

impl<T: Into<AffineExpression>> AddAssign<T> for AffineExpression {
    fn add_assign(&mut self, rhs: T) {
        self.add_in_place(rhs);
    }
}

impl<T: Into<AffineExpression>> SubAssign<T> for AffineExpression {
    fn sub_assign(&mut self, rhs: T) {
        self.sub_in_place(rhs);
    }
}

impl Neg for AffineExpression {
    type Output = AffineExpression;

    fn neg(mut self) -> AffineExpression {
        self.name = None;
        self.constant = -self.constant;
        for coeff in self.terms.values_mut() {
            *coeff = -*coeff;
        }
        self
    }
}

impl Neg for &AffineExpression {
    type Output = AffineExpression;

    fn neg(self) -> AffineExpression {
        -AffineExpression::from(self)
    }
}

impl Mul<f64> for AffineExpression {
    type Output = AffineExpression;

    fn mul(mut self, rhs: f64) -> AffineExpression {
        self.name = None;
        if rhs == 0.0 {
            self.terms.clear();
            self.constant = 0.0;
            return self;
        }
        self.constant *= rhs;
        for coeff in self.terms.values_mut() {
            *coeff *= rhs;
        }
        self
    }
}

impl Mul<AffineExpression> for f64 {
    type Output = AffineExpression;

    fn mul(self, rhs: AffineExpression) -> AffineExpression {
        rhs * self
    }
}

impl Div<f64> for AffineExpression {
    type Output = AffineExpression;

    fn div(mut self, rhs: f64) -> AffineExpression {
        self.name = None;
        self.constant /= rhs;
        for coeff in self.terms.values_mut() {
            *coeff /= rhs;
        }
        self
    }
}

impl<T: Into<AffineExpression>> Add<T> for &Variable {
    type Output = AffineExpression;

    fn add(self, rhs: T) -> AffineExpression {
        AffineExpression::from(self) + rhs
    }
}

impl<T: Into<AffineExpression>> Sub<T> for &Variable {
    type Output = AffineExpression;

    fn sub(self, rhs: T) -> AffineExpression {
        AffineExpression::from(self) - rhs
    }
}

impl<T: Into<AffineExpression>> Add<T> for Variable {
    type Output = AffineExpression;

    fn add(self, rhs: T) -> AffineExpression {
        AffineExpression::from(&self) + rhs
    }
}

impl<T: Into<AffineExpression>> Sub<T> for Variable {
    type Output = AffineExpression;

    fn sub(self, rhs: T) -> AffineExpression {
        AffineExpression::from(&self) - rhs
    }
}

impl Neg for &Variable {
    type Output = AffineExpression;

    fn neg(self) -> AffineExpression {
        -AffineExpression::from(self)
    }
}

impl Neg for Variable {
    type Output = AffineExpression;

    fn neg(self) -> AffineExpression {
        -AffineExpression::from(&self)
    }
}

impl Mul<f64> for &Variable {
    type Output = AffineExpression;

    fn mul(self, rhs: f64) -> AffineExpression {
        AffineExpression::from(self) * rhs
    }
}

impl Mul<f64> for Variable {
    type Output = AffineExpression;

    fn mul(self, rhs: f64) -> AffineExpression {
        AffineExpression::from(&self) * rhs
    }
}

impl Mul<&Variable> for f64 {
    type Output = AffineExpression;

    fn mul(self, rhs: &Variable) -> AffineExpression {
        AffineExpression::from(rhs) * self
    }
}

impl Mul<Variable> for f64 {
    type Output = AffineExpression;

    fn mul(self, rhs: Variable) -> AffineExpression {
        AffineExpression::from(&rhs) * self
    }
}

impl Div<f64> for &Variable {
    type Output = AffineExpression;

    fn div(self, rhs: f64) -> AffineExpression {
        AffineExpression::from(self) / rhs
    }
}

impl Div<f64> for Variable {
    type Output = AffineExpression;

    fn div(self, rhs: f64) -> AffineExpression {
        AffineExpression::from(&self) / rhs
    }
}

impl Add<AffineExpression> for f64 {
    type Output = AffineExpression;

    fn add(self, rhs: AffineExpression) -> AffineExpression {
        rhs + self
    }
}

impl Add<&Variable> for f64 {
    type Output = AffineExpression;

    fn add(self, rhs: &Variable) -> AffineExpression {
        AffineExpression::from(rhs) + self
    }
}

impl Add<Variable> for f64 {
    type Output = AffineExpression;

    fn add(self, rhs: Variable) -> AffineExpression {
        AffineExpression::from(&rhs) + self
    }
}

impl Sub<AffineExpression> for f64 {
    type Output = AffineExpression;

    fn sub(self, rhs: AffineExpression) -> AffineExpression {
        -rhs + self
    }
}

impl Sub<&Variable> for f64 {
    type Output = AffineExpression;

    fn sub(self, rhs: &Variable) -> AffineExpression {
        -AffineExpression::from(rhs) + self
    }
}

impl Sub<Variable> for f64 {
    type Output = AffineExpression;

    fn sub(self, rhs: Variable) -> AffineExpression {
        -AffineExpression::from(&rhs) + self
    }
}

impl fmt::Display for AffineExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms = self.terms_fragment();
        if terms.is_empty() {
            return write!(f, "{}", self.constant);
        }
        write!(f, "{terms}")?;
        if self.constant < 0.0 {
            write!(f, " - {}", -self.constant)?;
        } else if self.constant > 0.0 {
            write!(f, " + {}", self.constant)?;
        }
        Ok(())
    }
}

/// Left-fold a sequence of numbers, variables or expressions into a fresh
/// expression.
pub fn lp_sum<I>(items: I) -> AffineExpression
where
    I: IntoIterator,
    I::Item: Into<AffineExpression>,
{
    let mut total = AffineExpression::new();
    for item in items {
        total.add_in_place(item);
    }
    total
}

/// Dot product of a coefficient slice against variables or expressions.
/// The shorter side ends the product; broadcast a scalar by repeating it.
pub fn lp_dot<T>(coefficients: &[f64], items: &[T]) -> AffineExpression
where
    for<'a> &'a T: Into<AffineExpression>,
{
    let mut total = AffineExpression::new();
    for (coeff, item) in coefficients.iter().zip(items) {
        let expr: AffineExpression = item.into();
        total.add_in_place(expr * *coeff);
    }
    total
}

/// The value of a number, variable or expression; `None` when a referenced
/// variable has no value yet.
pub fn value<T: Into<AffineExpression>>(x: T) -> Option<f64> {
    x.into().value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    fn xyz() -> (Variable, Variable, Variable) {
        (
            Variable::new("x", Some(0.0), Some(4.0), Category::Continuous),
            Variable::new("y", Some(-1.0), Some(1.0), Category::Continuous),
            Variable::new("z", Some(0.0), None, Category::Continuous),
        )
    }

    #[test]
    fn operators_build_expressions() {
        let (x, y, z) = xyz();
        let expr = &x + 4.0 * &y + 9.0 * &z + 2.0;
        assert_eq!(expr.len(), 3);
        assert_eq!(expr.coefficient(&x), 1.0);
        assert_eq!(expr.coefficient(&y), 4.0);
        assert_eq!(expr.coefficient(&z), 9.0);
        assert_eq!(expr.constant(), 2.0);
    }

    #[test]
    fn zero_coefficients_are_never_stored() {
        let (x, y, _) = xyz();
        let expr = &x + &y - &x;
        assert_eq!(expr.len(), 1);
        assert_eq!(expr.coefficient(&x), 0.0);

        let mut direct = AffineExpression::new();
        direct.add_term(&x, 0.0);
        assert!(direct.is_empty());

        let filtered = AffineExpression::from_terms([(x.clone(), 0.0), (y.clone(), 2.0)], 1.0);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let (x, y, z) = xyz();
        let expr = 9.0 * &z + &x + 4.0 * &y;
        let names: Vec<String> = expr.iter().map(|(v, _)| v.name()).collect();
        assert_eq!(names, ["z", "x", "y"]);
    }

    #[test]
    fn value_requires_every_variable() {
        let (x, y, _) = xyz();
        let expr = 2.0 * &x + 3.0 * &y + 1.0;
        assert_eq!(expr.value(), None);
        x.set_value(1.0);
        assert_eq!(expr.value(), None);
        y.set_value(-1.0);
        assert_eq!(expr.value(), Some(0.0));
    }

    #[test]
    fn value_is_linear_in_each_variable() {
        let (x, y, _) = xyz();
        let expr = 2.0 * &x + 3.0 * &y;
        x.set_value(1.0);
        y.set_value(1.0);
        let before = expr.value().unwrap();
        x.set_value(1.5);
        let after = expr.value().unwrap();
        assert_eq!(after - before, 2.0 * 0.5);
    }

    #[test]
    fn value_or_default_substitutes_defaults() {
        let (x, y, _) = xyz();
        let expr = &x + 2.0 * &y + 5.0;
        assert_eq!(expr.value_or_default(), 5.0);
        y.set_value(1.0);
        assert_eq!(expr.value_or_default(), 7.0);
    }

    #[test]
    fn scaling_and_negation() {
        let (x, y, _) = xyz();
        let expr = (&x + 2.0 * &y + 1.0) * 3.0;
        assert_eq!(expr.coefficient(&x), 3.0);
        assert_eq!(expr.coefficient(&y), 6.0);
        assert_eq!(expr.constant(), 3.0);

        let negated = -expr;
        assert_eq!(negated.coefficient(&x), -3.0);
        assert_eq!(negated.constant(), -3.0);

        let halved = (4.0 * &x) / 2.0;
        assert_eq!(halved.coefficient(&x), 2.0);

        let wiped = (4.0 * &x) * 0.0;
        assert!(wiped.is_empty());
        assert_eq!(wiped.constant(), 0.0);
    }

    #[test]
    fn multiplication_stays_linear() {
        let (x, y, _) = xyz();
        let left = AffineExpression::from(&x);
        let right = AffineExpression::from(&y);
        assert!(matches!(left.try_mul(&right), Err(LpError::NonConstantProduct)));

        let by_constant = left.try_mul(&AffineExpression::from(3.0)).unwrap();
        assert_eq!(by_constant.coefficient(&x), 3.0);

        let from_constant = AffineExpression::from(2.0).try_mul(&right).unwrap();
        assert_eq!(from_constant.coefficient(&y), 2.0);
    }

    #[test]
    fn division_requires_constant_divisor() {
        let (x, y, _) = xyz();
        let expr = 4.0 * &x;
        assert!(matches!(expr.try_div(&AffineExpression::from(&y)), Err(LpError::NonConstantDivisor)));
        let quartered = expr.try_div(&AffineExpression::from(4.0)).unwrap();
        assert_eq!(quartered.coefficient(&x), 1.0);
    }

    #[test]
    fn atoms_and_constants() {
        let (x, _, _) = xyz();
        let atomic = AffineExpression::from(&x);
        assert!(atomic.is_atomic());
        assert_eq!(atomic.atom(), Some(x.clone()));
        assert!(!atomic.is_numerical_constant());

        let constant = AffineExpression::from(3.5);
        assert!(constant.is_numerical_constant());
        assert!(!constant.is_atomic());
    }

    #[test]
    fn arithmetic_drops_the_name_but_in_place_keeps_it() {
        let (x, y, _) = xyz();
        let named = AffineExpression::from(&x).with_name("obj");
        let derived = named.clone() + 1.0;
        assert_eq!(derived.name(), None);

        let mut kept = named;
        kept += &y;
        assert_eq!(kept.name(), Some("obj"));
    }

    #[test]
    fn display_matches_expected_layout() {
        let (x, y, _) = xyz();
        let expr = &x - 2.0 * &y + 3.0;
        assert_eq!(expr.to_string(), "x - 2*y + 3");
        assert_eq!(AffineExpression::from(0.0).to_string(), "0");
        assert_eq!((-(&x + 1.0)).to_string(), "-x - 1");
    }

    #[test]
    fn lp_sum_folds_mixed_items() {
        let (x, y, _) = xyz();
        let total = lp_sum(vec![&x + 0.0, 2.0 * &y, AffineExpression::from(5.0)]);
        assert_eq!(total.coefficient(&x), 1.0);
        assert_eq!(total.coefficient(&y), 2.0);
        assert_eq!(total.constant(), 5.0);
    }

    #[test]
    fn mappings_fold_into_their_value_sum() {
        let vars = Variable::dict("v", &[&["a", "b"]], Some(0.0), None, Category::Continuous);
        let mut expr = AffineExpression::from(1.0);
        expr.add_in_place(vars.clone());
        assert_eq!(expr.len(), 2);
        assert_eq!(expr.constant(), 1.0);
        for (_, var) in &vars {
            assert_eq!(expr.coefficient(var), 1.0);
        }
    }

    #[test]
    fn lp_dot_zips_coefficients_and_items() {
        let (x, y, z) = xyz();
        let vars = [x.clone(), y.clone(), z.clone()];
        let dotted = lp_dot(&[1.0, 4.0, 9.0], &vars);
        assert_eq!(dotted.coefficient(&x), 1.0);
        assert_eq!(dotted.coefficient(&y), 4.0);
        assert_eq!(dotted.coefficient(&z), 9.0);

        let shorter = lp_dot(&[2.0], &vars);
        assert_eq!(shorter.len(), 1);
    }

    #[test]
    fn top_level_value_helper() {
        let (x, _, _) = xyz();
        assert_eq!(value(3.25), Some(3.25));
        assert_eq!(value(&x), None);
        x.set_value(2.0);
        assert_eq!(value(&x), Some(2.0));
    }
}
