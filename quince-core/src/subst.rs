//! Bound-variable substitution with multi-valued expansion.
//!
//! [`substitute`] rewrites quantified variables *by name*: bindings are
//! applied while unwinding a quantifier's own bound list, never against a
//! bare De Bruijn index, because the same index means different things under
//! different quantifiers. A binding may carry several candidate values; the
//! owning quantifier is then instantiated once per combination (Cartesian
//! product over its multi-valued variables) and the copies are conjoined for
//! `forall`, disjoined for `exists`.
//!
//! # Index discipline
//!
//! Within a quantifier binding `k` variables, the variable at list position
//! `i` (outermost first) is `BoundVar(k - 1 - i)` in the immediate body — the
//! binder list is reversed when computing indices. The rewrite carries a
//! binder-depth counter through nested quantifiers, renumbers references to
//! binders that survive a partial instantiation, and shifts references that
//! escape the unwound quantifier by the number of eliminated binders.
//!
//! # Shadowing
//!
//! An inner binder that re-binds a name already present in the bindings
//! shadows it: the name is dropped from the map before descending into the
//! rebuilt body, so inner occurrences stay untouched.

use lasso::Spur;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::ast::{BoundList, QuantKind, TermId, TermKind, TermManager};
use crate::error::{QuinceError, Result};

/// Mapping from variable name to an ordered, non-empty set of ground terms.
///
/// Repeated [`bind`](Self::bind) calls on the same name accumulate values;
/// binding the same term twice is a no-op.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionMap {
    bindings: FxHashMap<Spur, SmallVec<[TermId; 2]>>,
}

impl SubstitutionMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate value for a variable.
    pub fn bind(&mut self, var: Spur, term: TermId) {
        let values = self.bindings.entry(var).or_default();
        if !values.contains(&term) {
            values.push(term);
        }
    }

    /// Candidate values for a variable.
    #[must_use]
    pub fn get(&self, var: Spur) -> Option<&[TermId]> {
        self.bindings.get(&var).map(|v| v.as_slice())
    }

    /// Whether a variable is bound.
    #[must_use]
    pub fn contains(&self, var: Spur) -> bool {
        self.bindings.contains_key(&var)
    }

    /// Number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterate over (name, values) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Spur, &[TermId])> {
        self.bindings.iter().map(|(&k, v)| (k, v.as_slice()))
    }

    /// Copy of this map without the given names. Used to drop shadowed
    /// bindings before descending under a re-binding quantifier.
    #[must_use]
    fn without(&self, names: &[Spur]) -> Self {
        let bindings = self
            .bindings
            .iter()
            .filter(|(name, _)| !names.contains(name))
            .map(|(&k, v)| (k, v.clone()))
            .collect();
        Self { bindings }
    }
}

/// Substitute bound variables by name throughout a formula.
///
/// Quantifiers whose bound list intersects the map are partially
/// instantiated: bound variables present in the map are eliminated, the rest
/// survive under a rebuilt quantifier of the same kind. Multi-valued
/// bindings expand into a conjunction (universal) or disjunction
/// (existential) of instantiated copies.
///
/// # Errors
///
/// [`QuinceError::SortMismatch`] when a binding's sort disagrees with the
/// bound variable's declared sort; [`QuinceError::Internal`] for empty or
/// non-ground binding sets.
pub fn substitute(
    term: TermId,
    bindings: &SubstitutionMap,
    manager: &mut TermManager,
) -> Result<TermId> {
    for (name, values) in bindings.iter() {
        if values.is_empty() {
            return Err(QuinceError::internal(format!(
                "empty binding set for `{}`",
                manager.resolve(name)
            )));
        }
        for &v in values {
            if !manager.is_ground(v) {
                return Err(QuinceError::internal(format!(
                    "binding for `{}` is not ground: {}",
                    manager.resolve(name),
                    manager.display(v)
                )));
            }
        }
    }
    walk(term, bindings, manager)
}

/// Recursive descent: intercept quantifiers, rebuild everything else only
/// when a child changed.
fn walk(term: TermId, bindings: &SubstitutionMap, manager: &mut TermManager) -> Result<TermId> {
    if bindings.is_empty() {
        return Ok(term);
    }
    let Some(data) = manager.get(term).cloned() else {
        return Err(QuinceError::internal(format!(
            "term {term:?} not found in manager"
        )));
    };
    match data.kind {
        TermKind::Forall { vars, body } => {
            unwind_quantifier(term, QuantKind::Forall, &vars, body, bindings, manager)
        }
        TermKind::Exists { vars, body } => {
            unwind_quantifier(term, QuantKind::Exists, &vars, body, bindings, manager)
        }
        _ => map_children(term, manager, &mut |child, manager| {
            walk(child, bindings, manager)
        }),
    }
}

/// Instantiate one quantifier against the bindings.
fn unwind_quantifier(
    term: TermId,
    kind: QuantKind,
    vars: &BoundList,
    body: TermId,
    bindings: &SubstitutionMap,
    manager: &mut TermManager,
) -> Result<TermId> {
    let k = vars.len() as u32;

    // Partition the bound list: positions are outermost-first, so position
    // `pos` is De Bruijn index `k - 1 - pos` in the immediate body.
    let mut eliminated: Vec<(usize, Spur, crate::sort::SortId)> = Vec::new();
    let mut remaining: BoundList = SmallVec::new();
    let mut remaining_positions: Vec<usize> = Vec::new();
    for (pos, &(name, sort)) in vars.iter().enumerate() {
        if bindings.contains(name) {
            eliminated.push((pos, name, sort));
        } else {
            remaining.push((name, sort));
            remaining_positions.push(pos);
        }
    }

    if eliminated.is_empty() {
        // This quantifier binds none of the mapped names; nested
        // quantifiers may still.
        let new_body = walk(body, bindings, manager)?;
        if new_body == body {
            return Ok(term);
        }
        return Ok(manager.mk_quantifier(kind, vars.clone(), new_body));
    }

    for &(_, name, sort) in &eliminated {
        for &v in bindings.get(name).unwrap_or(&[]) {
            let found = manager.sort_of(v);
            if found != sort {
                return Err(QuinceError::SortMismatch {
                    expected: manager.sort_name(sort),
                    found: manager.sort_name(found),
                    context: manager.resolve(name).to_string(),
                });
            }
        }
    }

    let k_new = remaining.len() as u32;
    let renumber: FxHashMap<u32, u32> = remaining_positions
        .iter()
        .enumerate()
        .map(|(new_pos, &old_pos)| (k - 1 - old_pos as u32, k_new - 1 - new_pos as u32))
        .collect();

    // Shadowed names must not leak into the rebuilt body.
    let shadowed: Vec<Spur> = eliminated.iter().map(|&(_, name, _)| name).collect();
    let inner = bindings.without(&shadowed);

    let choices: Vec<&[TermId]> = eliminated
        .iter()
        .map(|&(_, name, _)| bindings.get(name).unwrap_or(&[]))
        .collect();

    let mut instances = Vec::new();
    let mut indices = vec![0usize; choices.len()];
    loop {
        let mut by_index: FxHashMap<u32, TermId> = FxHashMap::default();
        for (slot, &choice) in indices.iter().enumerate() {
            let (pos, _, _) = eliminated[slot];
            by_index.insert(k - 1 - pos as u32, choices[slot][choice]);
        }

        let rewritten = rewrite_bound(body, 0, &by_index, &renumber, k, k_new, manager)?;
        let resolved = walk(rewritten, &inner, manager)?;
        let instance = if k_new > 0 {
            manager.mk_quantifier(kind, remaining.clone(), resolved)
        } else {
            resolved
        };
        instances.push(instance);

        // Odometer over the value sets, rightmost fastest.
        let mut carry = true;
        for (slot, idx) in indices.iter_mut().enumerate().rev() {
            if carry {
                *idx += 1;
                if *idx >= choices[slot].len() {
                    *idx = 0;
                } else {
                    carry = false;
                }
            }
        }
        if carry {
            break;
        }
    }

    // Several instantiation points are conjoined evidence for a universal,
    // disjoined choice for an existential.
    if instances.len() == 1 {
        Ok(instances.remove(0))
    } else {
        match kind {
            QuantKind::Forall => Ok(manager.mk_and(instances)),
            QuantKind::Exists => Ok(manager.mk_or(instances)),
        }
    }
}

/// Rewrite De Bruijn references while unwinding a quantifier of `k` binders
/// down to `k_new`: eliminated indices become their ground value, surviving
/// indices are renumbered, references escaping the quantifier shift down by
/// the number of eliminated binders.
fn rewrite_bound(
    term: TermId,
    depth: u32,
    eliminated: &FxHashMap<u32, TermId>,
    renumber: &FxHashMap<u32, u32>,
    k: u32,
    k_new: u32,
    manager: &mut TermManager,
) -> Result<TermId> {
    let Some(data) = manager.get(term).cloned() else {
        return Err(QuinceError::internal(format!(
            "term {term:?} not found in manager"
        )));
    };
    match data.kind {
        TermKind::BoundVar(i) => {
            if i < depth {
                return Ok(term);
            }
            let rel = i - depth;
            if let Some(&value) = eliminated.get(&rel) {
                Ok(value)
            } else if let Some(&new_rel) = renumber.get(&rel) {
                Ok(manager.mk_bound(new_rel + depth, data.sort))
            } else if rel >= k {
                Ok(manager.mk_bound(i - (k - k_new), data.sort))
            } else {
                Err(QuinceError::internal(format!(
                    "bound variable {i} at depth {depth} escapes its binder"
                )))
            }
        }
        TermKind::Forall { vars, body } => {
            let inner_depth = depth + vars.len() as u32;
            let new_body =
                rewrite_bound(body, inner_depth, eliminated, renumber, k, k_new, manager)?;
            if new_body == body {
                Ok(term)
            } else {
                Ok(manager.mk_forall_interned(vars, new_body))
            }
        }
        TermKind::Exists { vars, body } => {
            let inner_depth = depth + vars.len() as u32;
            let new_body =
                rewrite_bound(body, inner_depth, eliminated, renumber, k, k_new, manager)?;
            if new_body == body {
                Ok(term)
            } else {
                Ok(manager.mk_exists_interned(vars, new_body))
            }
        }
        _ => map_children(term, manager, &mut |child, manager| {
            rewrite_bound(child, depth, eliminated, renumber, k, k_new, manager)
        }),
    }
}

/// Rebuild a non-quantifier node from transformed children, preserving the
/// original id when nothing changed.
fn map_children<F>(term: TermId, manager: &mut TermManager, f: &mut F) -> Result<TermId>
where
    F: FnMut(TermId, &mut TermManager) -> Result<TermId>,
{
    let Some(data) = manager.get(term).cloned() else {
        return Err(QuinceError::internal(format!(
            "term {term:?} not found in manager"
        )));
    };

    let mut apply_list = |args: &SmallVec<[TermId; 4]>,
                          manager: &mut TermManager,
                          f: &mut F|
     -> Result<(SmallVec<[TermId; 4]>, bool)> {
        let mut changed = false;
        let mut out = SmallVec::with_capacity(args.len());
        for &a in args {
            let new = f(a, manager)?;
            changed |= new != a;
            out.push(new);
        }
        Ok((out, changed))
    };

    match &data.kind {
        TermKind::BoundVar(_)
        | TermKind::Const(_)
        | TermKind::True
        | TermKind::False
        | TermKind::IntConst(_)
        | TermKind::RealConst(_) => Ok(term),

        TermKind::Apply { func, args } => {
            let (new_args, changed) = apply_list(args, manager, f)?;
            if changed {
                Ok(manager.mk_apply_interned(*func, new_args, data.sort))
            } else {
                Ok(term)
            }
        }
        TermKind::And(args) => {
            let (new_args, changed) = apply_list(args, manager, f)?;
            if changed {
                Ok(manager.mk_and(new_args))
            } else {
                Ok(term)
            }
        }
        TermKind::Or(args) => {
            let (new_args, changed) = apply_list(args, manager, f)?;
            if changed {
                Ok(manager.mk_or(new_args))
            } else {
                Ok(term)
            }
        }
        TermKind::Add(args) => {
            let (new_args, changed) = apply_list(args, manager, f)?;
            if changed {
                Ok(manager.mk_add(new_args))
            } else {
                Ok(term)
            }
        }
        TermKind::Mul(args) => {
            let (new_args, changed) = apply_list(args, manager, f)?;
            if changed {
                Ok(manager.mk_mul(new_args))
            } else {
                Ok(term)
            }
        }
        TermKind::Not(a) => {
            let new = f(*a, manager)?;
            if new == *a {
                Ok(term)
            } else {
                Ok(manager.mk_not(new))
            }
        }
        TermKind::Neg(a) => {
            let new = f(*a, manager)?;
            if new == *a {
                Ok(term)
            } else {
                Ok(manager.mk_neg(new))
            }
        }
        TermKind::Implies(a, b) => {
            let (na, nb) = (f(*a, manager)?, f(*b, manager)?);
            if na == *a && nb == *b {
                Ok(term)
            } else {
                Ok(manager.mk_implies(na, nb))
            }
        }
        TermKind::Eq(a, b) => {
            let (na, nb) = (f(*a, manager)?, f(*b, manager)?);
            if na == *a && nb == *b {
                Ok(term)
            } else {
                Ok(manager.mk_eq(na, nb))
            }
        }
        TermKind::Lt(a, b) => {
            let (na, nb) = (f(*a, manager)?, f(*b, manager)?);
            if na == *a && nb == *b {
                Ok(term)
            } else {
                Ok(manager.mk_lt(na, nb))
            }
        }
        TermKind::Le(a, b) => {
            let (na, nb) = (f(*a, manager)?, f(*b, manager)?);
            if na == *a && nb == *b {
                Ok(term)
            } else {
                Ok(manager.mk_le(na, nb))
            }
        }
        TermKind::Gt(a, b) => {
            let (na, nb) = (f(*a, manager)?, f(*b, manager)?);
            if na == *a && nb == *b {
                Ok(term)
            } else {
                Ok(manager.mk_gt(na, nb))
            }
        }
        TermKind::Ge(a, b) => {
            let (na, nb) = (f(*a, manager)?, f(*b, manager)?);
            if na == *a && nb == *b {
                Ok(term)
            } else {
                Ok(manager.mk_ge(na, nb))
            }
        }
        TermKind::Sub(a, b) => {
            let (na, nb) = (f(*a, manager)?, f(*b, manager)?);
            if na == *a && nb == *b {
                Ok(term)
            } else {
                Ok(manager.mk_sub(na, nb))
            }
        }
        TermKind::Ite(c, t, e) => {
            let (nc, nt, ne) = (f(*c, manager)?, f(*t, manager)?, f(*e, manager)?);
            if nc == *c && nt == *t && ne == *e {
                Ok(term)
            } else {
                Ok(manager.mk_ite(nc, nt, ne))
            }
        }
        TermKind::Forall { .. } | TermKind::Exists { .. } => Err(QuinceError::internal(
            "map_children reached a quantifier".to_string(),
        )),
    }
}
