//! Decision variables.
//!
//! A [`Variable`] is a cheap shared handle: cloning it yields another
//! reference to the same underlying variable, and equality and hashing
//! follow that identity rather than the name. Two separately created
//! variables never compare equal, even when their names collide, so they
//! can key a term map without interfering with each other.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{LpError, LpResult};
use crate::model::Category;

#[derive(Debug)]
struct VarData {
    name: String,
    low_bound: Option<f64>,
    up_bound: Option<f64>,
    category: Category,
    value: Option<f64>,
}

/// A named decision variable with optional bounds and a category.
///
/// Names are sanitized on construction: every `-` or `+` is replaced with
/// `_`, since neither survives the LP and MPS formats.
#[derive(Clone)]
pub struct Variable {
    data: Rc<RefCell<VarData>>,
}

impl Variable {
    /// Create a variable with the given bounds and category.
    ///
    /// `None` bounds mean unbounded on that side.
    pub fn new(name: &str, low_bound: Option<f64>, up_bound: Option<f64>, category: Category) -> Self {
        let name = name.chars().map(|c| if c == '-' || c == '+' { '_' } else { c }).collect();
        Self {
            data: Rc::new(RefCell::new(VarData { name, low_bound, up_bound, category, value: None })),
        }
    }

    /// Create an unbounded continuous variable.
    pub fn continuous(name: &str) -> Self {
        Self::new(name, None, None, Category::Continuous)
    }

    /// Create a binary variable: an integer restricted to `[0, 1]`.
    pub fn binary(name: &str) -> Self {
        Self::new(name, Some(0.0), Some(1.0), Category::Integer)
    }

    /// A rectangular grid of variables over the Cartesian product of the
    /// index sets, flattened in row-major order. Each variable's name is the
    /// base name followed by one `_<index>` segment per dimension.
    pub fn matrix(
        name: &str,
        indices: &[&[&str]],
        low_bound: Option<f64>,
        up_bound: Option<f64>,
        category: Category,
    ) -> Vec<Self> {
        index_tuples(indices)
            .into_iter()
            .map(|tuple| Self::new(&format!("{}_{}", name, tuple.join("_")), low_bound, up_bound, category))
            .collect()
    }

    /// A flat mapping from full index tuples to variables, one entry per
    /// element of the Cartesian product of the index sets.
    pub fn dict(
        name: &str,
        indices: &[&[&str]],
        low_bound: Option<f64>,
        up_bound: Option<f64>,
        category: Category,
    ) -> IndexMap<Vec<String>, Self> {
        index_tuples(indices)
            .into_iter()
            .map(|tuple| {
                let var = Self::new(&format!("{}_{}", name, tuple.join("_")), low_bound, up_bound, category);
                (tuple, var)
            })
            .collect()
    }

    /// A nested mapping with one level per index set; the leaves are
    /// variables named like those of [`Variable::matrix`].
    pub fn dicts(
        name: &str,
        indices: &[&[&str]],
        low_bound: Option<f64>,
        up_bound: Option<f64>,
        category: Category,
    ) -> VarDict {
        match indices.split_first() {
            None => VarDict::Var(Self::new(name, low_bound, up_bound, category)),
            Some((first, rest)) => {
                let mut level = IndexMap::new();
                for index in *first {
                    let child = Self::dicts(&format!("{name}_{index}"), rest, low_bound, up_bound, category);
                    level.insert((*index).to_string(), child);
                }
                VarDict::Nested(level)
            }
        }
    }

    /// The sanitized name.
    pub fn name(&self) -> String {
        self.data.borrow().name.clone()
    }

    pub fn low_bound(&self) -> Option<f64> {
        self.data.borrow().low_bound
    }

    pub fn up_bound(&self) -> Option<f64> {
        self.data.borrow().up_bound
    }

    pub fn category(&self) -> Category {
        self.data.borrow().category
    }

    /// The value assigned by the last solve, if any.
    pub fn value(&self) -> Option<f64> {
        self.data.borrow().value
    }

    pub fn set_value(&self, value: f64) {
        self.data.borrow_mut().value = Some(value);
    }

    /// Replace both bounds.
    pub fn bounds(&self, low_bound: Option<f64>, up_bound: Option<f64>) {
        let mut data = self.data.borrow_mut();
        data.low_bound = low_bound;
        data.up_bound = up_bound;
    }

    /// Restrict to the nonnegative half-line.
    pub fn positive(&self) {
        self.bounds(Some(0.0), None);
    }

    /// Snap the value onto a bound it overshoots by at most `eps`, then onto
    /// the nearest integer when the category asks for one and the value is
    /// within `eps_int` of it.
    pub fn round(&self, eps_int: f64, eps: f64) {
        let mut data = self.data.borrow_mut();
        let mut v = match data.value {
            Some(v) => v,
            None => return,
        };
        if let Some(up) = data.up_bound.filter(|&up| v > up && v <= up + eps) {
            v = up;
        } else if let Some(low) = data.low_bound.filter(|&low| v < low && v >= low - eps) {
            v = low;
        }
        if data.category == Category::Integer && (v.round() - v).abs() <= eps_int {
            v = v.round();
        }
        data.value = Some(v);
    }

    /// The value, rounded to the nearest integer when the category is
    /// integer and the value is within `eps` of it.
    pub fn rounded_value(&self, eps: f64) -> Option<f64> {
        let data = self.data.borrow();
        match data.value {
            Some(v) if data.category == Category::Integer && (v - v.round()).abs() <= eps => Some(v.round()),
            other => other,
        }
    }

    /// The value if assigned, otherwise the feasible point closest to zero.
    pub fn value_or_default(&self) -> f64 {
        let data = self.data.borrow();
        if let Some(v) = data.value {
            return v;
        }
        match (data.low_bound, data.up_bound) {
            (Some(low), Some(up)) => {
                if 0.0 >= low && 0.0 <= up {
                    0.0
                } else if low >= 0.0 {
                    low
                } else {
                    up
                }
            }
            (Some(low), None) => {
                if 0.0 >= low {
                    0.0
                } else {
                    low
                }
            }
            (None, Some(up)) => {
                if 0.0 <= up {
                    0.0
                } else {
                    up
                }
            }
            (None, None) => 0.0,
        }
    }

    /// True when a value is assigned, lies within the bounds (within `eps`)
    /// and, for integer variables, within `eps` of an integer.
    pub fn valid(&self, eps: f64) -> bool {
        let data = self.data.borrow();
        let v = match data.value {
            Some(v) => v,
            None => return false,
        };
        if data.up_bound.is_some_and(|up| v > up + eps) {
            return false;
        }
        if data.low_bound.is_some_and(|low| v < low - eps) {
            return false;
        }
        if data.category == Category::Integer && (v.round() - v).abs() > eps {
            return false;
        }
        true
    }

    /// Signed distance outside the bounds; for integer variables under a MIP
    /// solve, also the fractional distance to the nearest integer.
    ///
    /// # Errors
    ///
    /// Returns an error if no value is assigned.
    pub fn infeasibility_gap(&self, mip: bool) -> LpResult<f64> {
        let data = self.data.borrow();
        let v = data.value.ok_or_else(|| LpError::MissingValue { name: data.name.clone() })?;
        if let Some(up) = data.up_bound {
            if v > up {
                return Ok(v - up);
            }
        }
        if let Some(low) = data.low_bound {
            if v < low {
                return Ok(v - low);
            }
        }
        if mip && data.category == Category::Integer && v.round() - v != 0.0 {
            return Ok(v.round() - v);
        }
        Ok(0.0)
    }

    /// An integer restricted to `[0, 1]`.
    pub fn is_binary(&self) -> bool {
        let data = self.data.borrow();
        data.category == Category::Integer && data.low_bound == Some(0.0) && data.up_bound == Some(1.0)
    }

    pub fn is_integer(&self) -> bool {
        self.data.borrow().category == Category::Integer
    }

    /// Unbounded on both sides.
    pub fn is_free(&self) -> bool {
        let data = self.data.borrow();
        data.low_bound.is_none() && data.up_bound.is_none()
    }

    /// Both bounds present and equal.
    pub fn is_constant(&self) -> bool {
        let data = self.data.borrow();
        data.low_bound.is_some() && data.up_bound == data.low_bound
    }

    /// The implicit LP default: lower bound zero, no upper bound.
    pub fn is_positive(&self) -> bool {
        let data = self.data.borrow();
        data.low_bound == Some(0.0) && data.up_bound.is_none()
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.data) as usize).hash(state);
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.borrow();
        f.debug_struct("Variable")
            .field("name", &data.name)
            .field("low_bound", &data.low_bound)
            .field("up_bound", &data.up_bound)
            .field("category", &data.category)
            .field("value", &data.value)
            .finish()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data.borrow().name)
    }
}

/// Nested mapping produced by [`Variable::dicts`].
#[derive(Debug, Clone)]
pub enum VarDict {
    Var(Variable),
    Nested(IndexMap<String, VarDict>),
}

impl VarDict {
    /// Step one level down.
    pub fn get(&self, key: &str) -> Option<&VarDict> {
        match self {
            Self::Var(_) => None,
            Self::Nested(level) => level.get(key),
        }
    }

    /// The variable at a leaf.
    pub fn var(&self) -> Option<&Variable> {
        match self {
            Self::Var(var) => Some(var),
            Self::Nested(_) => None,
        }
    }

    /// Walk a full index path down to a leaf variable.
    pub fn at(&self, path: &[&str]) -> Option<&Variable> {
        match path.split_first() {
            None => self.var(),
            Some((first, rest)) => self.get(first)?.at(rest),
        }
    }
}

/// The Cartesian product of the index sets, one `Vec` per combination.
fn index_tuples(indices: &[&[&str]]) -> Vec<Vec<String>> {
    if indices.is_empty() {
        return Vec::new();
    }
    let mut tuples: Vec<Vec<String>> = vec![Vec::new()];
    for set in indices {
        let mut next = Vec::with_capacity(tuples.len() * set.len());
        for prefix in &tuples {
            for index in *set {
                let mut tuple = prefix.clone();
                tuple.push((*index).to_string());
                next.push(tuple);
            }
        }
        tuples = next;
    }
    tuples
}
