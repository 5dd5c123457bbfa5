//! An LP/MIP modeler for Rust.
//!
//! This crate builds linear and mixed-integer programs out of decision
//! variables, affine expressions and constraints, writes them in the
//! CPLEX-style LP and fixed-column MPS text formats, and drives the
//! external GLPK, COIN CLP/CBC, CPLEX and XPRESS solvers over their
//! command-line interfaces.
//!
//! # Quick Start
//!
//! ```rust
//! use lp_modeler_rs::{Category, Constraint, Problem, Sense, Variable};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let x = Variable::new("x", Some(0.0), Some(3.0), Category::Continuous);
//!     let y = Variable::new("y", Some(0.0), None, Category::Continuous);
//!
//!     let mut problem = Problem::new("myProblem", Sense::Minimize);
//!     problem.add(&x + 2.0 * &y)?;
//!     problem.add_named("c1", Constraint::le(&x + &y, 2.0))?;
//!
//!     if let Some(solver) = lp_modeler_rs::default_solver() {
//!         let status = problem.solve(solver.as_ref())?;
//!         println!("{status}: x = {:?}", x.value());
//!     }
//!     Ok(())
//! }
//! ```

pub mod constraint;
pub mod error;
pub mod expression;
pub mod model;
pub mod problem;
pub mod solvers;
pub mod variable;
pub mod writer;

pub use constraint::Constraint;
pub use error::{LpError, LpResult};
pub use expression::{lp_dot, lp_sum, value, AffineExpression};
pub use model::{Category, ConstraintSense, Sense, Status};
pub use problem::{Element, Problem};
pub use solvers::{default_solver, Coin, Cplex, Glpk, Solver, SolverConfig, Xpress};
pub use variable::{VarDict, Variable};
pub use writer::lp::{write_lp_string, LpWriterOptions};
pub use writer::mps::{write_mps_string, MpsWriteInfo, MpsWriterOptions};
