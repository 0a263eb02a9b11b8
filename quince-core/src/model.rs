//! Values, models, and evaluation with completion.
//!
//! A [`Model`] is an immutable snapshot produced by a satisfiability check:
//! it maps declarations (constant name + sort) to [`Value`]s and
//! uninterpreted functions to finite tables. The [`ModelEvaluator`] computes
//! the value of a ground term under a model with *completion semantics*:
//! declarations the model does not assign receive a sort default instead of
//! failing the evaluation.
//!
//! Models are discarded and replaced on every refinement iteration of the
//! instantiation loop; nothing here is shared between engine instances.

use std::cmp::Ordering;
use std::fmt;

use lasso::{Key, Spur};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{TermId, TermKind, TermManager};
use crate::error::{QuinceError, Result};
use crate::sort::{SortId, SortKind};

/// A concrete value in a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(BigInt),
    /// Rational value.
    Rational(BigRational),
    /// Element of an uninterpreted sort's universe, named by the constant
    /// that introduced it.
    Elem(Spur),
}

impl Value {
    /// Whether this is a boolean value.
    #[must_use]
    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// The boolean payload, if any.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this is an integer value.
    #[must_use]
    pub fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    /// The integer payload, if any.
    #[must_use]
    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this is a rational value.
    #[must_use]
    pub fn is_rational(&self) -> bool {
        matches!(self, Self::Rational(_))
    }

    /// The rational payload, if any.
    #[must_use]
    pub fn as_rational(&self) -> Option<&BigRational> {
        match self {
            Self::Rational(v) => Some(v),
            _ => None,
        }
    }

    /// Rebuild this value as a literal term of the given sort.
    pub fn to_term(&self, sort: SortId, manager: &mut TermManager) -> TermId {
        match self {
            Self::Bool(b) => manager.mk_bool(*b),
            Self::Int(v) => manager.mk_int(v.clone()),
            Self::Rational(v) => manager.mk_rational(v.clone()),
            Self::Elem(name) => manager.mk_const_interned(*name, sort),
        }
    }

    /// The completion default for a sort, if the sort has one.
    #[must_use]
    pub fn default_for(kind: &SortKind) -> Option<Value> {
        match kind {
            SortKind::Bool => Some(Value::Bool(false)),
            SortKind::Int => Some(Value::Int(BigInt::zero())),
            SortKind::Real => Some(Value::Rational(BigRational::zero())),
            SortKind::Uninterpreted(_) | SortKind::Function { .. } => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Rational(v) => write!(f, "{v}"),
            Self::Elem(name) => write!(f, "@{}", name.into_usize()),
        }
    }
}

/// Finite table interpreting an uninterpreted function.
#[derive(Debug, Clone)]
pub struct FuncInterp {
    /// Explicit (arguments, result) entries.
    pub entries: Vec<(Vec<Value>, Value)>,
    /// Result for argument tuples not covered by an entry.
    pub default: Value,
}

impl FuncInterp {
    /// A table with no explicit entries.
    #[must_use]
    pub fn constant(default: Value) -> Self {
        Self {
            entries: Vec::new(),
            default,
        }
    }

    /// Look up the result for an argument tuple.
    #[must_use]
    pub fn lookup(&self, args: &[Value]) -> &Value {
        for (entry_args, result) in &self.entries {
            if entry_args.len() == args.len()
                && entry_args.iter().zip(args).all(|(a, b)| values_equal(a, b))
            {
                return result;
            }
        }
        &self.default
    }
}

/// Immutable interpretation snapshot: declaration -> value, plus function
/// tables.
#[derive(Debug, Clone, Default)]
pub struct Model {
    values: FxHashMap<(Spur, SortId), Value>,
    funcs: FxHashMap<Spur, FuncInterp>,
}

impl Model {
    /// Create an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a value to a constant declaration.
    pub fn assign(&mut self, name: Spur, sort: SortId, value: Value) {
        self.values.insert((name, sort), value);
    }

    /// Assign a function table to a function name.
    pub fn assign_func(&mut self, name: Spur, interp: FuncInterp) {
        self.funcs.insert(name, interp);
    }

    /// Value of a constant declaration, if assigned.
    #[must_use]
    pub fn value_of(&self, name: Spur, sort: SortId) -> Option<&Value> {
        self.values.get(&(name, sort))
    }

    /// Table of a function, if assigned.
    #[must_use]
    pub fn func_interp(&self, name: Spur) -> Option<&FuncInterp> {
        self.funcs.get(&name)
    }

    /// Iterate over assigned constant declarations.
    pub fn decls(&self) -> impl Iterator<Item = (Spur, SortId, &Value)> {
        self.values.iter().map(|(&(n, s), v)| (n, s, v))
    }

    /// All values assigned to declarations of the given sort, deduplicated
    /// by their rendered form.
    #[must_use]
    pub fn universe(&self, sort: SortId) -> Vec<Value> {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut out = Vec::new();
        for (&(_, s), v) in &self.values {
            if s == sort && seen.insert(v.to_string()) {
                out.push(v.clone());
            }
        }
        out
    }

    /// Number of assigned constant declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no declaration is assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.funcs.is_empty()
    }
}

/// Evaluates ground terms under a model with completion semantics.
#[derive(Debug)]
pub struct ModelEvaluator<'m> {
    model: &'m Model,
    cache: FxHashMap<TermId, Value>,
}

impl<'m> ModelEvaluator<'m> {
    /// Create an evaluator over a model snapshot.
    #[must_use]
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            cache: FxHashMap::default(),
        }
    }

    /// Evaluate a ground term. Evaluating a bound variable or quantifier is
    /// an internal error: instantiation must have eliminated them first.
    pub fn eval(&mut self, id: TermId, manager: &TermManager) -> Result<Value> {
        if let Some(v) = self.cache.get(&id) {
            return Ok(v.clone());
        }

        let Some(term) = manager.get(id) else {
            return Err(QuinceError::internal(format!(
                "term {id:?} not found in manager"
            )));
        };

        let value = match &term.kind {
            TermKind::True => Value::Bool(true),
            TermKind::False => Value::Bool(false),
            TermKind::IntConst(v) => Value::Int(v.clone()),
            TermKind::RealConst(v) => Value::Rational(v.clone()),
            TermKind::Const(name) => self.eval_const(*name, term.sort, manager)?,
            TermKind::Apply { func, args } => {
                let mut arg_values = Vec::with_capacity(args.len());
                for &a in args {
                    arg_values.push(self.eval(a, manager)?);
                }
                self.eval_apply(*func, &arg_values, term.sort, manager)?
            }
            TermKind::Not(a) => Value::Bool(!self.eval_bool(*a, manager)?),
            TermKind::And(args) => {
                let mut result = true;
                for &a in args {
                    result &= self.eval_bool(a, manager)?;
                }
                Value::Bool(result)
            }
            TermKind::Or(args) => {
                let mut result = false;
                for &a in args {
                    result |= self.eval_bool(a, manager)?;
                }
                Value::Bool(result)
            }
            TermKind::Implies(a, b) => {
                Value::Bool(!self.eval_bool(*a, manager)? || self.eval_bool(*b, manager)?)
            }
            TermKind::Ite(c, t, e) => {
                if self.eval_bool(*c, manager)? {
                    self.eval(*t, manager)?
                } else {
                    self.eval(*e, manager)?
                }
            }
            TermKind::Eq(a, b) => {
                let lhs = self.eval(*a, manager)?;
                let rhs = self.eval(*b, manager)?;
                Value::Bool(values_equal(&lhs, &rhs))
            }
            TermKind::Lt(a, b) => self.eval_cmp(*a, *b, Ordering::is_lt, manager)?,
            TermKind::Le(a, b) => self.eval_cmp(*a, *b, Ordering::is_le, manager)?,
            TermKind::Gt(a, b) => self.eval_cmp(*a, *b, Ordering::is_gt, manager)?,
            TermKind::Ge(a, b) => self.eval_cmp(*a, *b, Ordering::is_ge, manager)?,
            TermKind::Add(args) => {
                let mut acc = self.eval(args[0], manager)?;
                for &a in &args[1..] {
                    let rhs = self.eval(a, manager)?;
                    acc = numeric_add(&acc, &rhs)?;
                }
                acc
            }
            TermKind::Sub(a, b) => {
                let lhs = self.eval(*a, manager)?;
                let rhs = self.eval(*b, manager)?;
                numeric_sub(&lhs, &rhs)?
            }
            TermKind::Mul(args) => {
                let mut acc = self.eval(args[0], manager)?;
                for &a in &args[1..] {
                    let rhs = self.eval(a, manager)?;
                    acc = numeric_mul(&acc, &rhs)?;
                }
                acc
            }
            TermKind::Neg(a) => {
                let v = self.eval(*a, manager)?;
                numeric_neg(&v)?
            }
            TermKind::BoundVar(_) | TermKind::Forall { .. } | TermKind::Exists { .. } => {
                return Err(QuinceError::internal(format!(
                    "evaluation of non-ground term `{}`",
                    manager.display(id)
                )));
            }
        };

        self.cache.insert(id, value.clone());
        Ok(value)
    }

    fn eval_bool(&mut self, id: TermId, manager: &TermManager) -> Result<bool> {
        let v = self.eval(id, manager)?;
        v.as_bool().ok_or_else(|| {
            QuinceError::internal(format!("expected boolean, got {v} for {}", manager.display(id)))
        })
    }

    fn eval_cmp(
        &mut self,
        a: TermId,
        b: TermId,
        check: impl Fn(Ordering) -> bool,
        manager: &TermManager,
    ) -> Result<Value> {
        let lhs = self.eval(a, manager)?;
        let rhs = self.eval(b, manager)?;
        Ok(Value::Bool(check(numeric_cmp(&lhs, &rhs)?)))
    }

    fn eval_const(&self, name: Spur, sort: SortId, manager: &TermManager) -> Result<Value> {
        if let Some(v) = self.model.value_of(name, sort) {
            return Ok(v.clone());
        }
        // Completion: unassigned declarations get a sort default. An
        // unassigned uninterpreted constant stands for its own universe
        // element.
        let kind = manager
            .sorts
            .get(sort)
            .map(|s| &s.kind)
            .ok_or_else(|| QuinceError::internal(format!("dangling sort {sort:?}")))?;
        match Value::default_for(kind) {
            Some(v) => Ok(v),
            None => match kind {
                SortKind::Uninterpreted(_) => Ok(Value::Elem(name)),
                _ => Err(QuinceError::internal(format!(
                    "no completion default for `{}`",
                    manager.resolve(name)
                ))),
            },
        }
    }

    fn eval_apply(
        &self,
        func: Spur,
        args: &[Value],
        sort: SortId,
        manager: &TermManager,
    ) -> Result<Value> {
        if let Some(interp) = self.model.func_interp(func) {
            return Ok(interp.lookup(args).clone());
        }
        // Completion: a function with no table behaves as the constant
        // default function of its range sort.
        let kind = manager
            .sorts
            .get(sort)
            .map(|s| &s.kind)
            .ok_or_else(|| QuinceError::internal(format!("dangling sort {sort:?}")))?;
        match Value::default_for(kind) {
            Some(v) => Ok(v),
            None => match kind {
                SortKind::Uninterpreted(_) => Ok(Value::Elem(func)),
                _ => Err(QuinceError::internal(format!(
                    "no completion default for application of `{}`",
                    manager.resolve(func)
                ))),
            },
        }
    }
}

/// Semantic equality: integers and rationals compare numerically.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Elem(x), Value::Elem(y)) => x == y,
        _ => match (to_rational(a), to_rational(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

fn to_rational(v: &Value) -> Option<BigRational> {
    match v {
        Value::Int(i) => Some(BigRational::from_integer(i.clone())),
        Value::Rational(r) => Some(r.clone()),
        _ => None,
    }
}

fn numeric_pair(a: &Value, b: &Value) -> Result<(BigRational, BigRational)> {
    match (to_rational(a), to_rational(b)) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(QuinceError::internal(format!(
            "numeric operation on non-numeric values {a} and {b}"
        ))),
    }
}

fn numeric_cmp(a: &Value, b: &Value) -> Result<Ordering> {
    let (x, y) = numeric_pair(a, b)?;
    Ok(x.cmp(&y))
}

fn numeric_add(a: &Value, b: &Value) -> Result<Value> {
    if let (Value::Int(x), Value::Int(y)) = (a, b) {
        return Ok(Value::Int(x + y));
    }
    let (x, y) = numeric_pair(a, b)?;
    Ok(Value::Rational(x + y))
}

fn numeric_sub(a: &Value, b: &Value) -> Result<Value> {
    if let (Value::Int(x), Value::Int(y)) = (a, b) {
        return Ok(Value::Int(x - y));
    }
    let (x, y) = numeric_pair(a, b)?;
    Ok(Value::Rational(x - y))
}

fn numeric_mul(a: &Value, b: &Value) -> Result<Value> {
    if let (Value::Int(x), Value::Int(y)) = (a, b) {
        return Ok(Value::Int(x * y));
    }
    let (x, y) = numeric_pair(a, b)?;
    Ok(Value::Rational(x * y))
}

fn numeric_neg(a: &Value) -> Result<Value> {
    match a {
        Value::Int(x) => Ok(Value::Int(-x)),
        Value::Rational(x) => Ok(Value::Rational(-x)),
        _ => Err(QuinceError::internal(format!(
            "arithmetic negation of non-numeric value {a}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::BigRational;

    #[test]
    fn test_value_accessors() {
        let v = Value::Bool(true);
        assert!(v.is_bool());
        assert_eq!(v.as_bool(), Some(true));
        assert!(v.as_int().is_none());

        let v = Value::Int(BigInt::from(42));
        assert!(v.is_int());
        assert_eq!(v.as_int(), Some(&BigInt::from(42)));

        let v = Value::Rational(BigRational::new(BigInt::from(1), BigInt::from(3)));
        assert!(v.is_rational());
        assert_eq!(format!("{v}"), "1/3");
    }

    #[test]
    fn test_value_display_integral_rational() {
        let v = Value::Rational(BigRational::from_integer(BigInt::from(5)));
        assert_eq!(format!("{v}"), "5");
    }

    #[test]
    fn test_bool_model_evaluation() {
        let mut tm = TermManager::new();
        let p = tm.mk_const("p", tm.sorts.bool_sort);
        let q = tm.mk_const("q", tm.sorts.bool_sort);
        let p_name = tm.intern("p");
        let q_name = tm.intern("q");

        let mut model = Model::new();
        model.assign(p_name, tm.sorts.bool_sort, Value::Bool(true));
        model.assign(q_name, tm.sorts.bool_sort, Value::Bool(false));

        let conj = tm.mk_and([p, q]);
        let disj = tm.mk_or([p, q]);
        let imp = tm.mk_implies(q, p);

        let mut evaluator = ModelEvaluator::new(&model);
        assert_eq!(evaluator.eval(conj, &tm).unwrap(), Value::Bool(false));
        assert_eq!(evaluator.eval(disj, &tm).unwrap(), Value::Bool(true));
        assert_eq!(evaluator.eval(imp, &tm).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_int_arithmetic_evaluation() {
        let mut tm = TermManager::new();
        let x = tm.mk_const("x", tm.sorts.int_sort);
        let y = tm.mk_const("y", tm.sorts.int_sort);
        let x_name = tm.intern("x");
        let y_name = tm.intern("y");

        let mut model = Model::new();
        model.assign(x_name, tm.sorts.int_sort, Value::Int(BigInt::from(5)));
        model.assign(y_name, tm.sorts.int_sort, Value::Int(BigInt::from(-3)));

        let sum = tm.mk_add([x, y]);
        let prod = tm.mk_mul([x, y]);
        let cmp = tm.mk_gt(x, y);

        let mut evaluator = ModelEvaluator::new(&model);
        assert_eq!(evaluator.eval(sum, &tm).unwrap(), Value::Int(BigInt::from(2)));
        assert_eq!(
            evaluator.eval(prod, &tm).unwrap(),
            Value::Int(BigInt::from(-15))
        );
        assert_eq!(evaluator.eval(cmp, &tm).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_completion_defaults() {
        let mut tm = TermManager::new();
        let c = tm.mk_const("unassigned", tm.sorts.int_sort);
        let b = tm.mk_const("flag", tm.sorts.bool_sort);
        let zero = tm.mk_int(0);
        let eq = tm.mk_eq(c, zero);

        let model = Model::new();
        let mut evaluator = ModelEvaluator::new(&model);
        // Unassigned Int defaults to 0, unassigned Bool to false.
        assert_eq!(evaluator.eval(eq, &tm).unwrap(), Value::Bool(true));
        assert_eq!(evaluator.eval(b, &tm).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_func_interp_lookup() {
        let mut tm = TermManager::new();
        let one = tm.mk_int(1);
        let app = tm.mk_apply("f", [one], tm.sorts.int_sort);
        let f_name = tm.intern("f");

        let mut model = Model::new();
        let mut interp = FuncInterp::constant(Value::Int(BigInt::from(0)));
        interp
            .entries
            .push((vec![Value::Int(BigInt::from(1))], Value::Int(BigInt::from(7))));
        model.assign_func(f_name, interp);

        let mut evaluator = ModelEvaluator::new(&model);
        assert_eq!(evaluator.eval(app, &tm).unwrap(), Value::Int(BigInt::from(7)));

        let two = tm.mk_int(2);
        let app2 = tm.mk_apply("f", [two], tm.sorts.int_sort);
        assert_eq!(
            evaluator.eval(app2, &tm).unwrap(),
            Value::Int(BigInt::from(0))
        );
    }

    #[test]
    fn test_non_ground_evaluation_fails() {
        let mut tm = TermManager::new();
        let x = tm.mk_bound(0, tm.sorts.int_sort);
        let model = Model::new();
        let mut evaluator = ModelEvaluator::new(&model);
        assert!(matches!(
            evaluator.eval(x, &tm),
            Err(QuinceError::Internal(_))
        ));
    }

    #[test]
    fn test_universe_dedup() {
        let mut tm = TermManager::new();
        let a = tm.intern("a");
        let b = tm.intern("b");
        let c = tm.intern("c");
        let int = tm.sorts.int_sort;

        let mut model = Model::new();
        model.assign(a, int, Value::Int(BigInt::from(1)));
        model.assign(b, int, Value::Int(BigInt::from(1)));
        model.assign(c, int, Value::Int(BigInt::from(2)));

        let mut universe = model.universe(int);
        universe.sort_by_key(std::string::ToString::to_string);
        assert_eq!(universe.len(), 2);
    }

    #[test]
    fn test_mixed_int_rational_comparison() {
        let mut tm = TermManager::new();
        let half = tm.mk_rational(BigRational::new(BigInt::from(1), BigInt::from(2)));
        let one = tm.mk_int(1);
        let lt = tm.mk_lt(half, one);

        let model = Model::new();
        let mut evaluator = ModelEvaluator::new(&model);
        assert_eq!(evaluator.eval(lt, &tm).unwrap(), Value::Bool(true));
    }
}
