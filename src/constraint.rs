//! Linear constraints.
//!
//! A [`Constraint`] is an affine expression tagged with a relational
//! sense; it represents `sum(coeff * var) + constant  sense  0`, so the
//! user-facing right-hand side is the negated constant.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use crate::expression::AffineExpression;
use crate::model::ConstraintSense;
use crate::variable::Variable;

/// An affine expression constrained against zero.
#[derive(Debug, Clone)]
pub struct Constraint {
    expression: AffineExpression,
    sense: ConstraintSense,
}

impl Constraint {
    /// Wrap an expression with a sense. The relation reads
    /// `expression  sense  0`.
    pub fn new(expression: AffineExpression, sense: ConstraintSense) -> Self {
        Self { expression, sense }
    }

    /// `lhs <= rhs`
    pub fn le(lhs: impl Into<AffineExpression>, rhs: impl Into<AffineExpression>) -> Self {
        Self::new(lhs.into() - rhs.into(), ConstraintSense::Le)
    }

    /// `lhs >= rhs`
    pub fn ge(lhs: impl Into<AffineExpression>, rhs: impl Into<AffineExpression>) -> Self {
        Self::new(lhs.into() - rhs.into(), ConstraintSense::Ge)
    }

    /// `lhs = rhs`
    pub fn eq(lhs: impl Into<AffineExpression>, rhs: impl Into<AffineExpression>) -> Self {
        Self::new(lhs.into() - rhs.into(), ConstraintSense::Eq)
    }

    pub fn sense(&self) -> ConstraintSense {
        self.sense
    }

    /// The linear part, with the right-hand side folded into its constant.
    pub fn expression(&self) -> &AffineExpression {
        &self.expression
    }

    /// The user-facing right-hand side.
    pub fn rhs(&self) -> f64 {
        -self.expression.constant()
    }

    pub fn name(&self) -> Option<&str> {
        self.expression.name()
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.expression = self.expression.with_name(name);
        self
    }

    /// Iterate over `(variable, coefficient)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, f64)> {
        self.expression.iter()
    }

    /// Evaluate the left-hand side against zero; `None` when a referenced
    /// variable has no value.
    pub fn value(&self) -> Option<f64> {
        self.expression.value()
    }

    /// True when the relation holds within `eps`: `|value| <= eps` for an
    /// equality, `sense * value >= -eps` otherwise. A constraint whose
    /// value cannot be computed is not valid.
    pub fn valid(&self, eps: f64) -> bool {
        let value = match self.value() {
            Some(value) => value,
            None => return false,
        };
        match self.sense {
            ConstraintSense::Eq => value.abs() <= eps,
            _ => value * f64::from(self.sense.as_i8()) >= -eps,
        }
    }

    /// Merge another constraint into this one. Senses combine under the
    /// product-sign rule: operands whose senses do not oppose are added and
    /// the senses or-ed; opposing operands are subtracted and the negated
    /// sense or-ed in.
    pub fn add_in_place(&mut self, other: &Constraint) {
        let own = self.sense.as_i8();
        let theirs = other.sense.as_i8();
        if own * theirs >= 0 {
            self.expression.add_in_place(other.expression());
            self.sense = ConstraintSense::from_i8(own | theirs);
        } else {
            self.expression.sub_in_place(other.expression());
            self.sense = ConstraintSense::from_i8(own | -theirs);
        }
    }

    /// Subtract another constraint from this one under the same rule.
    pub fn sub_in_place(&mut self, other: &Constraint) {
        let own = self.sense.as_i8();
        let theirs = other.sense.as_i8();
        if own * theirs <= 0 {
            self.expression.sub_in_place(other.expression());
            self.sense = ConstraintSense::from_i8(own | -theirs);
        } else {
            self.expression.add_in_place(other.expression());
            self.sense = ConstraintSense::from_i8(own | theirs);
        }
    }
}

impl Add for Constraint {
    type Output = Constraint;

    fn add(mut self, rhs: Constraint) -> Constraint {
        self.add_in_place(&rhs);
        self
    }
}

impl Sub for Constraint {
    type Output = Constraint;

    fn sub(mut self, rhs: Constraint) -> Constraint {
        self.sub_in_place(&rhs);
        self
    }
}

impl Neg for Constraint {
    type Output = Constraint;

    fn neg(self) -> Constraint {
        let sense = ConstraintSense::from_i8(-self.sense.as_i8());
        Constraint::new(-self.expression, sense)
    }
}

/// Scales the relation; the sense is preserved.
impl Mul<f64> for Constraint {
    type Output = Constraint;

    fn mul(self, rhs: f64) -> Constraint {
        Constraint::new(self.expression * rhs, self.sense)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms = self.expression.terms_fragment();
        let terms = if terms.is_empty() { "0".to_string() } else { terms };
        write!(f, "{terms} {} {}", self.sense, self.rhs())
    }
}
