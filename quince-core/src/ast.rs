//! Arena-allocated terms with hash-consing.
//!
//! Terms are immutable and interned: structurally equal terms share one
//! [`TermId`]. The [`TermManager`] owns the arena, the name interner, and
//! the [`SortStore`], and exposes `mk_*` constructors for every term shape.
//!
//! # Bound variables
//!
//! Quantifier bodies reference their binders through De Bruijn indices:
//! `BoundVar(0)` is the nearest enclosing binder. A quantifier's bound list
//! is ordered outermost-first, so within a quantifier binding `k` variables
//! the variable at list position `i` appears in the immediate body as
//! `BoundVar(k - 1 - i)`. Substitution (see [`crate::subst`]) relies on this
//! numbering and never rewrites a bound variable by bare index.

use lasso::{Rodeo, Spur};
use num_bigint::BigInt;
use num_rational::BigRational;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::sort::{SortId, SortKind, SortStore};

/// Handle to an interned term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u32);

impl TermId {
    /// Create a term id from a raw index.
    #[must_use]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw index of this term.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Binder list attached to a quantifier: (name, sort), outermost first.
pub type BoundList = SmallVec<[(Spur, SortId); 4]>;

/// The shape of a term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// De Bruijn reference to an enclosing binder; 0 = nearest.
    BoundVar(u32),
    /// A free constant, identified by its interned name.
    Const(Spur),
    /// Boolean literal true.
    True,
    /// Boolean literal false.
    False,
    /// Integer literal.
    IntConst(BigInt),
    /// Rational literal.
    RealConst(BigRational),
    /// Uninterpreted function or predicate application.
    Apply {
        /// Interned function name.
        func: Spur,
        /// Arguments, in order.
        args: SmallVec<[TermId; 4]>,
    },
    /// Logical negation.
    Not(TermId),
    /// N-ary conjunction.
    And(SmallVec<[TermId; 4]>),
    /// N-ary disjunction.
    Or(SmallVec<[TermId; 4]>),
    /// Implication.
    Implies(TermId, TermId),
    /// If-then-else.
    Ite(TermId, TermId, TermId),
    /// Equality.
    Eq(TermId, TermId),
    /// Strictly less.
    Lt(TermId, TermId),
    /// Less or equal.
    Le(TermId, TermId),
    /// Strictly greater.
    Gt(TermId, TermId),
    /// Greater or equal.
    Ge(TermId, TermId),
    /// N-ary addition.
    Add(SmallVec<[TermId; 4]>),
    /// Subtraction.
    Sub(TermId, TermId),
    /// N-ary multiplication.
    Mul(SmallVec<[TermId; 4]>),
    /// Arithmetic negation.
    Neg(TermId),
    /// Universal quantifier.
    Forall {
        /// Bound variables, outermost first.
        vars: BoundList,
        /// Quantifier body.
        body: TermId,
    },
    /// Existential quantifier.
    Exists {
        /// Bound variables, outermost first.
        vars: BoundList,
        /// Quantifier body.
        body: TermId,
    },
}

/// An interned term: its kind and sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    /// The shape of the term.
    pub kind: TermKind,
    /// The sort of the term.
    pub sort: SortId,
}

/// Which quantifier a term is, when it is one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantKind {
    /// Universal.
    Forall,
    /// Existential.
    Exists,
}

impl QuantKind {
    /// Whether this is the universal quantifier.
    #[must_use]
    pub fn is_universal(self) -> bool {
        matches!(self, Self::Forall)
    }
}

/// Owns the term arena, the name interner, and the sort store.
#[derive(Debug)]
pub struct TermManager {
    terms: Vec<Term>,
    table: FxHashMap<Term, TermId>,
    names: Rodeo,
    /// The sort store; `manager.sorts.int_sort` etc.
    pub sorts: SortStore,
}

impl TermManager {
    /// Create an empty manager with the built-in sorts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
            table: FxHashMap::default(),
            names: Rodeo::default(),
            sorts: SortStore::new(),
        }
    }

    /// Intern a name.
    pub fn intern(&mut self, name: &str) -> Spur {
        self.names.get_or_intern(name)
    }

    /// Resolve an interned name.
    #[must_use]
    pub fn resolve(&self, name: Spur) -> &str {
        self.names.resolve(&name)
    }

    /// Look up a term by id.
    #[must_use]
    pub fn get(&self, id: TermId) -> Option<&Term> {
        self.terms.get(id.index())
    }

    /// Sort of a term. Panics only on a dangling id, which cannot be
    /// constructed through this manager.
    #[must_use]
    pub fn sort_of(&self, id: TermId) -> SortId {
        self.terms[id.index()].sort
    }

    /// Number of interned terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether no terms have been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn mk(&mut self, kind: TermKind, sort: SortId) -> TermId {
        let term = Term { kind, sort };
        if let Some(&id) = self.table.get(&term) {
            return id;
        }
        let id = TermId(self.terms.len() as u32);
        self.terms.push(term.clone());
        self.table.insert(term, id);
        id
    }

    /// Boolean literal true.
    pub fn mk_true(&mut self) -> TermId {
        let sort = self.sorts.bool_sort;
        self.mk(TermKind::True, sort)
    }

    /// Boolean literal false.
    pub fn mk_false(&mut self) -> TermId {
        let sort = self.sorts.bool_sort;
        self.mk(TermKind::False, sort)
    }

    /// Boolean literal.
    pub fn mk_bool(&mut self, value: bool) -> TermId {
        if value { self.mk_true() } else { self.mk_false() }
    }

    /// Integer literal.
    pub fn mk_int(&mut self, value: impl Into<BigInt>) -> TermId {
        let sort = self.sorts.int_sort;
        self.mk(TermKind::IntConst(value.into()), sort)
    }

    /// Rational literal.
    pub fn mk_rational(&mut self, value: BigRational) -> TermId {
        let sort = self.sorts.real_sort;
        self.mk(TermKind::RealConst(value), sort)
    }

    /// Free constant with the given name and sort.
    pub fn mk_const(&mut self, name: &str, sort: SortId) -> TermId {
        let name = self.intern(name);
        self.mk(TermKind::Const(name), sort)
    }

    /// Free constant from an already-interned name.
    pub fn mk_const_interned(&mut self, name: Spur, sort: SortId) -> TermId {
        self.mk(TermKind::Const(name), sort)
    }

    /// De Bruijn bound-variable reference.
    pub fn mk_bound(&mut self, index: u32, sort: SortId) -> TermId {
        self.mk(TermKind::BoundVar(index), sort)
    }

    /// Uninterpreted function or predicate application.
    pub fn mk_apply(
        &mut self,
        func: &str,
        args: impl IntoIterator<Item = TermId>,
        sort: SortId,
    ) -> TermId {
        let func = self.intern(func);
        let args: SmallVec<[TermId; 4]> = args.into_iter().collect();
        self.mk(TermKind::Apply { func, args }, sort)
    }

    /// Application from an already-interned function name.
    pub fn mk_apply_interned(
        &mut self,
        func: Spur,
        args: SmallVec<[TermId; 4]>,
        sort: SortId,
    ) -> TermId {
        self.mk(TermKind::Apply { func, args }, sort)
    }

    /// Negation.
    pub fn mk_not(&mut self, arg: TermId) -> TermId {
        let sort = self.sorts.bool_sort;
        self.mk(TermKind::Not(arg), sort)
    }

    /// Conjunction. Empty input yields `true`, a singleton its element.
    pub fn mk_and(&mut self, args: impl IntoIterator<Item = TermId>) -> TermId {
        let args: SmallVec<[TermId; 4]> = args.into_iter().collect();
        match args.len() {
            0 => self.mk_true(),
            1 => args[0],
            _ => {
                let sort = self.sorts.bool_sort;
                self.mk(TermKind::And(args), sort)
            }
        }
    }

    /// Disjunction. Empty input yields `false`, a singleton its element.
    pub fn mk_or(&mut self, args: impl IntoIterator<Item = TermId>) -> TermId {
        let args: SmallVec<[TermId; 4]> = args.into_iter().collect();
        match args.len() {
            0 => self.mk_false(),
            1 => args[0],
            _ => {
                let sort = self.sorts.bool_sort;
                self.mk(TermKind::Or(args), sort)
            }
        }
    }

    /// Implication.
    pub fn mk_implies(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let sort = self.sorts.bool_sort;
        self.mk(TermKind::Implies(lhs, rhs), sort)
    }

    /// If-then-else. Takes its sort from the then-branch.
    pub fn mk_ite(&mut self, cond: TermId, then_branch: TermId, else_branch: TermId) -> TermId {
        let sort = self.sort_of(then_branch);
        self.mk(TermKind::Ite(cond, then_branch, else_branch), sort)
    }

    /// Equality.
    pub fn mk_eq(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let sort = self.sorts.bool_sort;
        self.mk(TermKind::Eq(lhs, rhs), sort)
    }

    /// Strictly less.
    pub fn mk_lt(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let sort = self.sorts.bool_sort;
        self.mk(TermKind::Lt(lhs, rhs), sort)
    }

    /// Less or equal.
    pub fn mk_le(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let sort = self.sorts.bool_sort;
        self.mk(TermKind::Le(lhs, rhs), sort)
    }

    /// Strictly greater.
    pub fn mk_gt(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let sort = self.sorts.bool_sort;
        self.mk(TermKind::Gt(lhs, rhs), sort)
    }

    /// Greater or equal.
    pub fn mk_ge(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let sort = self.sorts.bool_sort;
        self.mk(TermKind::Ge(lhs, rhs), sort)
    }

    /// N-ary addition. Takes its sort from the first argument; an empty sum
    /// is the integer zero.
    pub fn mk_add(&mut self, args: impl IntoIterator<Item = TermId>) -> TermId {
        let args: SmallVec<[TermId; 4]> = args.into_iter().collect();
        match args.len() {
            0 => self.mk_int(0),
            1 => args[0],
            _ => {
                let sort = self.sort_of(args[0]);
                self.mk(TermKind::Add(args), sort)
            }
        }
    }

    /// Subtraction.
    pub fn mk_sub(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let sort = self.sort_of(lhs);
        self.mk(TermKind::Sub(lhs, rhs), sort)
    }

    /// N-ary multiplication. Takes its sort from the first argument; an
    /// empty product is the integer one.
    pub fn mk_mul(&mut self, args: impl IntoIterator<Item = TermId>) -> TermId {
        let args: SmallVec<[TermId; 4]> = args.into_iter().collect();
        match args.len() {
            0 => self.mk_int(1),
            1 => args[0],
            _ => {
                let sort = self.sort_of(args[0]);
                self.mk(TermKind::Mul(args), sort)
            }
        }
    }

    /// Arithmetic negation.
    pub fn mk_neg(&mut self, arg: TermId) -> TermId {
        let sort = self.sort_of(arg);
        self.mk(TermKind::Neg(arg), sort)
    }

    /// Universal quantifier over named variables.
    pub fn mk_forall(&mut self, vars: &[(&str, SortId)], body: TermId) -> TermId {
        let vars: BoundList = vars.iter().map(|&(n, s)| (self.intern(n), s)).collect();
        self.mk_forall_interned(vars, body)
    }

    /// Existential quantifier over named variables.
    pub fn mk_exists(&mut self, vars: &[(&str, SortId)], body: TermId) -> TermId {
        let vars: BoundList = vars.iter().map(|&(n, s)| (self.intern(n), s)).collect();
        self.mk_exists_interned(vars, body)
    }

    /// Universal quantifier from already-interned binders.
    pub fn mk_forall_interned(&mut self, vars: BoundList, body: TermId) -> TermId {
        let sort = self.sorts.bool_sort;
        self.mk(TermKind::Forall { vars, body }, sort)
    }

    /// Existential quantifier from already-interned binders.
    pub fn mk_exists_interned(&mut self, vars: BoundList, body: TermId) -> TermId {
        let sort = self.sorts.bool_sort;
        self.mk(TermKind::Exists { vars, body }, sort)
    }

    /// Quantifier from a [`QuantKind`], used when rebuilding residual
    /// quantifiers during substitution.
    pub fn mk_quantifier(&mut self, kind: QuantKind, vars: BoundList, body: TermId) -> TermId {
        match kind {
            QuantKind::Forall => self.mk_forall_interned(vars, body),
            QuantKind::Exists => self.mk_exists_interned(vars, body),
        }
    }

    /// Decompose a quantifier into (kind, binders, body).
    #[must_use]
    pub fn as_quantifier(&self, id: TermId) -> Option<(QuantKind, BoundList, TermId)> {
        match &self.get(id)?.kind {
            TermKind::Forall { vars, body } => Some((QuantKind::Forall, vars.clone(), *body)),
            TermKind::Exists { vars, body } => Some((QuantKind::Exists, vars.clone(), *body)),
            _ => None,
        }
    }

    /// Whether a term is ground: no bound variables and no quantifiers.
    #[must_use]
    pub fn is_ground(&self, id: TermId) -> bool {
        let Some(term) = self.get(id) else {
            return false;
        };
        match &term.kind {
            TermKind::BoundVar(_) | TermKind::Forall { .. } | TermKind::Exists { .. } => false,
            TermKind::Const(_)
            | TermKind::True
            | TermKind::False
            | TermKind::IntConst(_)
            | TermKind::RealConst(_) => true,
            TermKind::Apply { args, .. }
            | TermKind::And(args)
            | TermKind::Or(args)
            | TermKind::Add(args)
            | TermKind::Mul(args) => args.iter().all(|&a| self.is_ground(a)),
            TermKind::Not(a) | TermKind::Neg(a) => self.is_ground(*a),
            TermKind::Implies(a, b)
            | TermKind::Eq(a, b)
            | TermKind::Lt(a, b)
            | TermKind::Le(a, b)
            | TermKind::Gt(a, b)
            | TermKind::Ge(a, b)
            | TermKind::Sub(a, b) => self.is_ground(*a) && self.is_ground(*b),
            TermKind::Ite(c, t, e) => {
                self.is_ground(*c) && self.is_ground(*t) && self.is_ground(*e)
            }
        }
    }

    /// Human-readable name of a sort.
    #[must_use]
    pub fn sort_name(&self, id: SortId) -> String {
        match self.sorts.get(id).map(|s| &s.kind) {
            Some(SortKind::Bool) => "Bool".to_string(),
            Some(SortKind::Int) => "Int".to_string(),
            Some(SortKind::Real) => "Real".to_string(),
            Some(SortKind::Uninterpreted(name)) => self.resolve(*name).to_string(),
            Some(SortKind::Function { .. }) => "(-> ...)".to_string(),
            None => format!("?sort{}", id.index()),
        }
    }

    /// Render a term as an SMT-LIB-flavoured string. Bound variables print
    /// their source names when the enclosing binder is in scope.
    #[must_use]
    pub fn display(&self, id: TermId) -> String {
        let mut out = String::new();
        let mut env: Vec<Spur> = Vec::new();
        self.fmt_term(id, &mut env, &mut out);
        out
    }

    fn fmt_term(&self, id: TermId, env: &mut Vec<Spur>, out: &mut String) {
        use std::fmt::Write;

        let Some(term) = self.get(id) else {
            let _ = write!(out, "?t{}", id.index());
            return;
        };
        match &term.kind {
            TermKind::BoundVar(i) => {
                let i = *i as usize;
                if i < env.len() {
                    let _ = write!(out, "{}", self.resolve(env[env.len() - 1 - i]));
                } else {
                    let _ = write!(out, "_{i}");
                }
            }
            TermKind::Const(name) => {
                let _ = write!(out, "{}", self.resolve(*name));
            }
            TermKind::True => out.push_str("true"),
            TermKind::False => out.push_str("false"),
            TermKind::IntConst(v) => {
                let _ = write!(out, "{v}");
            }
            TermKind::RealConst(v) => {
                let _ = write!(out, "{v}");
            }
            TermKind::Apply { func, args } => {
                if args.is_empty() {
                    let _ = write!(out, "({})", self.resolve(*func));
                } else {
                    let _ = write!(out, "({}", self.resolve(*func));
                    for &a in args {
                        out.push(' ');
                        self.fmt_term(a, env, out);
                    }
                    out.push(')');
                }
            }
            TermKind::Not(a) => self.fmt_op("not", &[*a], env, out),
            TermKind::And(args) => self.fmt_op("and", args, env, out),
            TermKind::Or(args) => self.fmt_op("or", args, env, out),
            TermKind::Implies(a, b) => self.fmt_op("=>", &[*a, *b], env, out),
            TermKind::Ite(c, t, e) => self.fmt_op("ite", &[*c, *t, *e], env, out),
            TermKind::Eq(a, b) => self.fmt_op("=", &[*a, *b], env, out),
            TermKind::Lt(a, b) => self.fmt_op("<", &[*a, *b], env, out),
            TermKind::Le(a, b) => self.fmt_op("<=", &[*a, *b], env, out),
            TermKind::Gt(a, b) => self.fmt_op(">", &[*a, *b], env, out),
            TermKind::Ge(a, b) => self.fmt_op(">=", &[*a, *b], env, out),
            TermKind::Add(args) => self.fmt_op("+", args, env, out),
            TermKind::Sub(a, b) => self.fmt_op("-", &[*a, *b], env, out),
            TermKind::Mul(args) => self.fmt_op("*", args, env, out),
            TermKind::Neg(a) => self.fmt_op("-", &[*a], env, out),
            TermKind::Forall { vars, body } => {
                self.fmt_quantifier("forall", vars, *body, env, out);
            }
            TermKind::Exists { vars, body } => {
                self.fmt_quantifier("exists", vars, *body, env, out);
            }
        }
    }

    fn fmt_op(&self, op: &str, args: &[TermId], env: &mut Vec<Spur>, out: &mut String) {
        out.push('(');
        out.push_str(op);
        for &a in args {
            out.push(' ');
            self.fmt_term(a, env, out);
        }
        out.push(')');
    }

    fn fmt_quantifier(
        &self,
        word: &str,
        vars: &BoundList,
        body: TermId,
        env: &mut Vec<Spur>,
        out: &mut String,
    ) {
        use std::fmt::Write;

        let _ = write!(out, "({word} (");
        for (i, (name, sort)) in vars.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "({} {})", self.resolve(*name), self.sort_name(*sort));
        }
        out.push_str(") ");
        // Binders enter the environment outermost-first, so the innermost
        // (index 0) sits at the top of the stack.
        for (name, _) in vars {
            env.push(*name);
        }
        self.fmt_term(body, env, out);
        env.truncate(env.len() - vars.len());
        out.push(')');
    }
}

impl Default for TermManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consing() {
        let mut tm = TermManager::new();
        let a = tm.mk_int(5);
        let b = tm.mk_int(5);
        let c = tm.mk_int(6);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_and_flattening() {
        let mut tm = TermManager::new();
        let p = tm.mk_const("p", tm.sorts.bool_sort);
        assert_eq!(tm.mk_and([]), tm.mk_true());
        assert_eq!(tm.mk_and([p]), p);
        assert_eq!(tm.mk_or([]), tm.mk_false());
        assert_eq!(tm.mk_or([p]), p);
    }

    #[test]
    fn test_is_ground() {
        let mut tm = TermManager::new();
        let x = tm.mk_bound(0, tm.sorts.int_sort);
        let zero = tm.mk_int(0);
        let body = tm.mk_gt(x, zero);
        let q = tm.mk_forall(&[("x", tm.sorts.int_sort)], body);

        let c = tm.mk_const("c", tm.sorts.int_sort);
        let ground = tm.mk_gt(c, zero);

        assert!(!tm.is_ground(x));
        assert!(!tm.is_ground(body));
        assert!(!tm.is_ground(q));
        assert!(tm.is_ground(ground));
        assert!(tm.is_ground(zero));
    }

    #[test]
    fn test_as_quantifier() {
        let mut tm = TermManager::new();
        let x = tm.mk_bound(0, tm.sorts.int_sort);
        let zero = tm.mk_int(0);
        let body = tm.mk_gt(x, zero);
        let q = tm.mk_exists(&[("x", tm.sorts.int_sort)], body);

        let (kind, vars, b) = tm.as_quantifier(q).unwrap();
        assert_eq!(kind, QuantKind::Exists);
        assert!(!kind.is_universal());
        assert_eq!(vars.len(), 1);
        assert_eq!(b, body);
        assert!(tm.as_quantifier(body).is_none());
    }

    #[test]
    fn test_display_quantifier() {
        let mut tm = TermManager::new();
        let x = tm.mk_bound(0, tm.sorts.int_sort);
        let zero = tm.mk_int(0);
        let body = tm.mk_gt(x, zero);
        let q = tm.mk_forall(&[("x", tm.sorts.int_sort)], body);
        assert_eq!(tm.display(q), "(forall ((x Int)) (> x 0))");
    }

    #[test]
    fn test_display_nested_binders() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        // forall x y. exists z. x + y < z
        // At the exists body: z = 0, y = 1, x = 2.
        let x = tm.mk_bound(2, int);
        let y = tm.mk_bound(1, int);
        let z = tm.mk_bound(0, int);
        let sum = tm.mk_add([x, y]);
        let lt = tm.mk_lt(sum, z);
        let inner = tm.mk_exists(&[("z", int)], lt);
        let q = tm.mk_forall(&[("x", int), ("y", int)], inner);
        assert_eq!(
            tm.display(q),
            "(forall ((x Int) (y Int)) (exists ((z Int)) (< (+ x y) z)))"
        );
    }
}
