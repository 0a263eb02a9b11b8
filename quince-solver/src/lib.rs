//! Quince Solver - Quantifier Instantiation Strategies
//!
//! This crate hosts the instantiation strategies of the Quince experiment
//! harness:
//! - A bounded incremental ground oracle ([`GroundSolver`])
//! - The MBQI refinement loop ([`MbqiEngine`])
//! - The E-matching placeholder ([`EMatchingEngine`])
//! - The string-keyed engine factory ([`QuantEngineFactory`])
//!
//! # Examples
//!
//! ```
//! use quince_core::ast::TermManager;
//! use quince_solver::SolverResult;
//! use quince_solver::mbqi::MbqiEngine;
//!
//! let mut tm = TermManager::new();
//!
//! // forall x. x >= x, plus the ground fact c = 3
//! let x1 = tm.mk_bound(0, tm.sorts.int_sort);
//! let x2 = tm.mk_bound(0, tm.sorts.int_sort);
//! let body = tm.mk_ge(x1, x2);
//! let q = tm.mk_forall(&[("x", tm.sorts.int_sort)], body);
//! let c = tm.mk_const("c", tm.sorts.int_sort);
//! let three = tm.mk_int(3);
//! let fact = tm.mk_eq(c, three);
//!
//! let mut engine = MbqiEngine::new(&[q, fact], None, &tm).unwrap();
//! let (result, model) = engine.solve(&mut tm).unwrap();
//! assert_eq!(result, SolverResult::Sat);
//! assert!(model.is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ematching;
pub mod ground;
pub mod mbqi;
pub mod strategy;

pub use ematching::EMatchingEngine;
pub use ground::{GroundSolver, SampleConfig, SolverResult};
pub use mbqi::{MbqiConfig, MbqiEngine, MbqiStats, QuantifiedFormula, mbqi_solve};
pub use strategy::{QuantEngine, QuantEngineFactory};
