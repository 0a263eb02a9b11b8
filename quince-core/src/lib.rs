//! Quince Core - Terms, Sorts, Models, and Substitution
//!
//! This crate provides the foundational types for the Quince quantifier
//! instantiation engine:
//! - Arena-allocated terms with hash-consed [`TermId`] references
//! - Sort system with built-in Bool/Int/Real and uninterpreted sorts
//! - Model abstraction with a completing evaluator
//! - De Bruijn-aware bound-variable substitution with multi-valued expansion
//! - Instantiation-string parsing
//!
//! # Examples
//!
//! ## Creating Terms
//!
//! ```
//! use quince_core::ast::TermManager;
//!
//! let mut tm = TermManager::new();
//!
//! let x = tm.mk_bound(0, tm.sorts.int_sort);
//! let zero = tm.mk_int(0);
//! let body = tm.mk_gt(x, zero);
//! let q = tm.mk_forall(&[("x", tm.sorts.int_sort)], body);
//! assert_eq!(tm.display(q), "(forall ((x Int)) (> x 0))");
//! ```
//!
//! ## Substituting Bound Variables
//!
//! ```
//! use quince_core::ast::TermManager;
//! use quince_core::subst::{SubstitutionMap, substitute};
//!
//! let mut tm = TermManager::new();
//! let x = tm.mk_bound(0, tm.sorts.int_sort);
//! let zero = tm.mk_int(0);
//! let body = tm.mk_gt(x, zero);
//! let q = tm.mk_forall(&[("x", tm.sorts.int_sort)], body);
//!
//! let mut map = SubstitutionMap::new();
//! let five = tm.mk_int(5);
//! map.bind(tm.intern("x"), five);
//!
//! let ground = substitute(q, &map, &mut tm).unwrap();
//! assert_eq!(tm.display(ground), "(> 5 0)");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ast;
pub mod error;
pub mod inst;
pub mod model;
pub mod sort;
pub mod subst;

pub use ast::{BoundList, QuantKind, Term, TermId, TermKind, TermManager};
pub use error::{QuinceError, Result};
pub use inst::parse_inst;
pub use model::{FuncInterp, Model, ModelEvaluator, Value, values_equal};
pub use sort::{Sort, SortId, SortKind, SortStore};
pub use subst::{SubstitutionMap, substitute};
