//! Bounded ground satisfiability oracle.
//!
//! [`GroundSolver`] is an incremental, blocking session over ground
//! formulas: assertions accumulate monotonically (with `push`/`pop` scopes
//! for callers that want them) and [`check`](GroundSolver::check) searches
//! for a model by bounded enumeration over the same synthetic finite
//! domains the MBQI loop samples.
//!
//! The verdicts are deliberately asymmetric in strength:
//! - `Sat` is sound — the returned model makes every assertion true under
//!   the completing evaluator;
//! - `Unsat` is reported only when it is certain: a closed assertion
//!   without uninterpreted applications evaluates to false, or the
//!   enumeration was exhaustive (all free constants boolean, no
//!   uninterpreted applications);
//! - everything else is `Unknown`.
//!
//! There is no wall-clock bound; a caller wanting one must impose it
//! externally.

use lasso::Spur;
use num_bigint::BigInt;
use num_rational::BigRational;
use rustc_hash::FxHashSet;

use quince_core::ast::{TermId, TermKind, TermManager};
use quince_core::error::{QuinceError, Result};
use quince_core::model::{Model, ModelEvaluator, Value};
use quince_core::sort::{SortId, SortKind, SortStore};

/// Outcome of a satisfiability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverResult {
    /// A model was found.
    Sat,
    /// The assertions are certainly unsatisfiable.
    Unsat,
    /// No conclusion. Never an error, and never falsification.
    Unknown,
}

/// Synthetic finite domains sampled per sort.
///
/// This bound is a heuristic, not a constant: tune it per problem via
/// [`MbqiConfig`](crate::mbqi::MbqiConfig) or directly on the solver.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    /// Smallest sampled integer.
    pub int_min: i64,
    /// Largest sampled integer.
    pub int_max: i64,
    /// Whether the real sample includes half-integers over the same range.
    pub half_rationals: bool,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            int_min: -5,
            int_max: 5,
            half_rationals: true,
        }
    }
}

impl SampleConfig {
    /// Synthetic sample for a sort. Uninterpreted and function sorts have
    /// no synthetic members.
    #[must_use]
    pub fn synthetic_values(&self, sort: SortId, sorts: &SortStore) -> Vec<Value> {
        match sorts.get(sort).map(|s| &s.kind) {
            Some(SortKind::Bool) => vec![Value::Bool(false), Value::Bool(true)],
            Some(SortKind::Int) => (self.int_min..=self.int_max)
                .map(|i| Value::Int(BigInt::from(i)))
                .collect(),
            Some(SortKind::Real) => {
                let mut values: Vec<Value> = (self.int_min..=self.int_max)
                    .map(|i| Value::Rational(BigRational::from_integer(BigInt::from(i))))
                    .collect();
                if self.half_rationals {
                    for i in self.int_min..=self.int_max {
                        let half = BigRational::new(BigInt::from(i), BigInt::from(2));
                        if !half.is_integer() {
                            values.push(Value::Rational(half));
                        }
                    }
                }
                values
            }
            _ => Vec::new(),
        }
    }

    /// Whether the sample covers the sort's whole domain.
    #[must_use]
    pub fn is_complete_for(&self, sort: SortId, sorts: &SortStore) -> bool {
        matches!(sorts.get(sort).map(|s| &s.kind), Some(SortKind::Bool))
    }
}

/// One free constant declaration occurring in the assertion set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Decl {
    name: Spur,
    sort: SortId,
}

/// Incremental ground satisfiability session.
#[derive(Debug)]
pub struct GroundSolver {
    assertions: Vec<TermId>,
    scopes: Vec<usize>,
    sample: SampleConfig,
    max_candidates: usize,
    model: Option<Model>,
}

impl GroundSolver {
    /// Create a session with the default sample bounds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sample(SampleConfig::default())
    }

    /// Create a session with explicit sample bounds.
    #[must_use]
    pub fn with_sample(sample: SampleConfig) -> Self {
        Self {
            assertions: Vec::new(),
            scopes: Vec::new(),
            sample,
            max_candidates: 100_000,
            model: None,
        }
    }

    /// Assert a ground formula.
    ///
    /// # Errors
    ///
    /// [`QuinceError::Internal`] when the term is not ground — quantified
    /// formulas are never asserted directly.
    pub fn assert(&mut self, term: TermId, manager: &TermManager) -> Result<()> {
        if !manager.is_ground(term) {
            return Err(QuinceError::internal(format!(
                "assertion is not ground: {}",
                manager.display(term)
            )));
        }
        self.assertions.push(term);
        Ok(())
    }

    /// Assert several ground formulas.
    pub fn assert_many(&mut self, terms: &[TermId], manager: &TermManager) -> Result<()> {
        for &t in terms {
            self.assert(t, manager)?;
        }
        Ok(())
    }

    /// Open a backtracking scope.
    pub fn push(&mut self) {
        self.scopes.push(self.assertions.len());
    }

    /// Discard assertions made since the matching `push`.
    pub fn pop(&mut self) {
        if let Some(mark) = self.scopes.pop() {
            self.assertions.truncate(mark);
        }
    }

    /// Number of asserted formulas.
    #[must_use]
    pub fn num_assertions(&self) -> usize {
        self.assertions.len()
    }

    /// Model from the last `Sat` check, if any.
    #[must_use]
    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    /// Run a satisfiability check over the current assertion set.
    pub fn check(&mut self, manager: &TermManager) -> SolverResult {
        self.model = None;

        if self.assertions.is_empty() {
            self.model = Some(Model::new());
            return SolverResult::Sat;
        }

        let mut decls: Vec<Decl> = Vec::new();
        let mut seen_decls: FxHashSet<Decl> = FxHashSet::default();
        let mut has_uninterpreted_apply = false;
        for &a in &self.assertions {
            collect_decls(
                a,
                manager,
                &mut decls,
                &mut seen_decls,
                &mut has_uninterpreted_apply,
            );
        }

        // Closed assertions decide immediately: false without an
        // uninterpreted application cannot be repaired by any model.
        let empty = Model::new();
        for &a in &self.assertions {
            if is_closed(a, manager) && !contains_apply(a, manager) {
                let mut evaluator = ModelEvaluator::new(&empty);
                match evaluator.eval(a, manager) {
                    Ok(Value::Bool(false)) => return SolverResult::Unsat,
                    Ok(_) => {}
                    Err(_) => return SolverResult::Unknown,
                }
            }
        }

        if decls.is_empty() {
            let mut evaluator = ModelEvaluator::new(&empty);
            let mut all_true = true;
            for &a in &self.assertions {
                match evaluator.eval(a, manager) {
                    Ok(Value::Bool(true)) => {}
                    Ok(_) => {
                        all_true = false;
                        break;
                    }
                    Err(_) => return SolverResult::Unknown,
                }
            }
            if all_true {
                self.model = Some(Model::new());
                return SolverResult::Sat;
            }
            return if has_uninterpreted_apply {
                SolverResult::Unknown
            } else {
                SolverResult::Unsat
            };
        }

        let domains: Vec<Vec<Value>> = decls
            .iter()
            .map(|d| self.domain_for(d.sort, &decls, manager))
            .collect();
        if domains.iter().any(Vec::is_empty) {
            return SolverResult::Unknown;
        }

        let mut truncated = false;
        let mut examined = 0usize;
        let mut indices = vec![0usize; decls.len()];
        loop {
            if examined >= self.max_candidates {
                truncated = true;
                break;
            }
            examined += 1;

            let mut candidate = Model::new();
            for (slot, &idx) in indices.iter().enumerate() {
                candidate.assign(decls[slot].name, decls[slot].sort, domains[slot][idx].clone());
            }

            let mut evaluator = ModelEvaluator::new(&candidate);
            let mut all_true = true;
            for &a in &self.assertions {
                match evaluator.eval(a, manager) {
                    Ok(Value::Bool(true)) => {}
                    Ok(_) => {
                        all_true = false;
                        break;
                    }
                    Err(_) => return SolverResult::Unknown,
                }
            }
            if all_true {
                tracing::debug!("ground check: model found after {examined} candidates");
                self.model = Some(candidate);
                return SolverResult::Sat;
            }

            let mut carry = true;
            for (slot, idx) in indices.iter_mut().enumerate().rev() {
                if carry {
                    *idx += 1;
                    if *idx >= domains[slot].len() {
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

        let exhaustive = !truncated
            && !has_uninterpreted_apply
            && decls
                .iter()
                .all(|d| self.sample.is_complete_for(d.sort, &manager.sorts));
        tracing::debug!(
            "ground check: no model in {examined} candidates, exhaustive={exhaustive}"
        );
        if exhaustive {
            SolverResult::Unsat
        } else {
            SolverResult::Unknown
        }
    }

    /// Candidate values for a sort: the synthetic sample, plus — for
    /// uninterpreted sorts — one universe element per declared constant.
    fn domain_for(&self, sort: SortId, decls: &[Decl], manager: &TermManager) -> Vec<Value> {
        let mut values = self.sample.synthetic_values(sort, &manager.sorts);
        if let Some(SortKind::Uninterpreted(_)) = manager.sorts.get(sort).map(|s| &s.kind) {
            for d in decls {
                if d.sort == sort {
                    values.push(Value::Elem(d.name));
                }
            }
        }
        values
    }
}

impl Default for GroundSolver {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_decls(
    term: TermId,
    manager: &TermManager,
    decls: &mut Vec<Decl>,
    seen: &mut FxHashSet<Decl>,
    has_apply: &mut bool,
) {
    let Some(data) = manager.get(term) else {
        return;
    };
    match &data.kind {
        TermKind::Const(name) => {
            let decl = Decl {
                name: *name,
                sort: data.sort,
            };
            if seen.insert(decl) {
                decls.push(decl);
            }
        }
        TermKind::Apply { args, .. } => {
            *has_apply = true;
            for &a in args {
                collect_decls(a, manager, decls, seen, has_apply);
            }
        }
        TermKind::And(args) | TermKind::Or(args) | TermKind::Add(args) | TermKind::Mul(args) => {
            for &a in args {
                collect_decls(a, manager, decls, seen, has_apply);
            }
        }
        TermKind::Not(a) | TermKind::Neg(a) => {
            collect_decls(*a, manager, decls, seen, has_apply);
        }
        TermKind::Implies(a, b)
        | TermKind::Eq(a, b)
        | TermKind::Lt(a, b)
        | TermKind::Le(a, b)
        | TermKind::Gt(a, b)
        | TermKind::Ge(a, b)
        | TermKind::Sub(a, b) => {
            collect_decls(*a, manager, decls, seen, has_apply);
            collect_decls(*b, manager, decls, seen, has_apply);
        }
        TermKind::Ite(c, t, e) => {
            collect_decls(*c, manager, decls, seen, has_apply);
            collect_decls(*t, manager, decls, seen, has_apply);
            collect_decls(*e, manager, decls, seen, has_apply);
        }
        _ => {}
    }
}

fn is_closed(term: TermId, manager: &TermManager) -> bool {
    let mut decls = Vec::new();
    let mut seen = FxHashSet::default();
    let mut has_apply = false;
    collect_decls(term, manager, &mut decls, &mut seen, &mut has_apply);
    decls.is_empty()
}

fn contains_apply(term: TermId, manager: &TermManager) -> bool {
    let mut decls = Vec::new();
    let mut seen = FxHashSet::default();
    let mut has_apply = false;
    collect_decls(term, manager, &mut decls, &mut seen, &mut has_apply);
    has_apply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_session_is_sat() {
        let tm = TermManager::new();
        let mut solver = GroundSolver::new();
        assert_eq!(solver.check(&tm), SolverResult::Sat);
        assert!(solver.model().is_some());
    }

    #[test]
    fn test_closed_false_is_unsat() {
        let mut tm = TermManager::new();
        let minus_one = tm.mk_int(-1);
        let zero = tm.mk_int(0);
        let bad = tm.mk_gt(minus_one, zero);

        let mut solver = GroundSolver::new();
        solver.assert(bad, &tm).unwrap();
        assert_eq!(solver.check(&tm), SolverResult::Unsat);
    }

    #[test]
    fn test_simple_constraint_sat_with_model() {
        let mut tm = TermManager::new();
        let c = tm.mk_const("c", tm.sorts.int_sort);
        let minus_one = tm.mk_int(-1);
        let eq = tm.mk_eq(c, minus_one);

        let mut solver = GroundSolver::new();
        solver.assert(eq, &tm).unwrap();
        assert_eq!(solver.check(&tm), SolverResult::Sat);

        let c_name = tm.intern("c");
        let model = solver.model().unwrap();
        assert_eq!(
            model.value_of(c_name, tm.sorts.int_sort),
            Some(&Value::Int(BigInt::from(-1)))
        );
    }

    #[test]
    fn test_propositional_contradiction_is_unsat() {
        let mut tm = TermManager::new();
        let p = tm.mk_const("p", tm.sorts.bool_sort);
        let not_p = tm.mk_not(p);
        let both = tm.mk_and([p, not_p]);

        let mut solver = GroundSolver::new();
        solver.assert(both, &tm).unwrap();
        assert_eq!(solver.check(&tm), SolverResult::Unsat);
    }

    #[test]
    fn test_out_of_range_constraint_is_unknown() {
        let mut tm = TermManager::new();
        let c = tm.mk_const("c", tm.sorts.int_sort);
        let hundred = tm.mk_int(100);
        let eq = tm.mk_eq(c, hundred);

        let mut solver = GroundSolver::new();
        solver.assert(eq, &tm).unwrap();
        // 100 is outside the sampled domain; the truncated search cannot
        // conclude unsat.
        assert_eq!(solver.check(&tm), SolverResult::Unknown);
    }

    #[test]
    fn test_non_ground_assertion_rejected() {
        let mut tm = TermManager::new();
        let x = tm.mk_bound(0, tm.sorts.int_sort);
        let zero = tm.mk_int(0);
        let body = tm.mk_gt(x, zero);
        let q = tm.mk_forall(&[("x", tm.sorts.int_sort)], body);

        let mut solver = GroundSolver::new();
        assert!(solver.assert(q, &tm).is_err());
        assert!(solver.assert(body, &tm).is_err());
    }

    #[test]
    fn test_push_pop_restores_assertions() {
        let mut tm = TermManager::new();
        let c = tm.mk_const("c", tm.sorts.int_sort);
        let one = tm.mk_int(1);
        let two = tm.mk_int(2);
        let eq1 = tm.mk_eq(c, one);
        let eq2 = tm.mk_eq(c, two);

        let mut solver = GroundSolver::new();
        solver.assert(eq1, &tm).unwrap();
        solver.push();
        solver.assert(eq2, &tm).unwrap();
        assert_eq!(solver.num_assertions(), 2);
        // c = 1 and c = 2 together: no candidate satisfies both, but the
        // int domain is truncated, so the verdict stays unknown.
        assert_eq!(solver.check(&tm), SolverResult::Unknown);
        solver.pop();
        assert_eq!(solver.num_assertions(), 1);
        assert_eq!(solver.check(&tm), SolverResult::Sat);
    }

    #[test]
    fn test_uninterpreted_predicate_stays_unknown() {
        let mut tm = TermManager::new();
        let c = tm.mk_const("c", tm.sorts.int_sort);
        let app = tm.mk_apply("P", [c], tm.sorts.bool_sort);

        let mut solver = GroundSolver::new();
        solver.assert(app, &tm).unwrap();
        // P has no interpretation; completion makes it false everywhere,
        // but another interpretation could satisfy it.
        assert_eq!(solver.check(&tm), SolverResult::Unknown);
    }

    #[test]
    fn test_sample_config_bounds() {
        let tm = TermManager::new();
        let sample = SampleConfig::default();
        let ints = sample.synthetic_values(tm.sorts.int_sort, &tm.sorts);
        assert_eq!(ints.len(), 11);
        let bools = sample.synthetic_values(tm.sorts.bool_sort, &tm.sorts);
        assert_eq!(bools.len(), 2);
        let reals = sample.synthetic_values(tm.sorts.real_sort, &tm.sorts);
        // 11 integers plus the non-integral halves.
        assert!(reals.len() > 11);
        assert!(sample.is_complete_for(tm.sorts.bool_sort, &tm.sorts));
        assert!(!sample.is_complete_for(tm.sorts.int_sort, &tm.sorts));
    }
}
