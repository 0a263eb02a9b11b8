//! Model-Based Quantifier Instantiation.
//!
//! The MBQI loop alternates between satisfiability checks over an
//! incremental ground session and a refinement pass over the tracked
//! quantified formulas:
//!
//! 1. Check the ground assertions. `Unsat`/`Unknown` are terminal.
//! 2. On `Sat`, take the candidate model and, per quantifier, enumerate a
//!    finite candidate domain per bound variable: values the model already
//!    assigns to declarations of that sort, plus a synthetic sample
//!    ([`SampleConfig`]).
//! 3. Substitute each fresh combination into the body and evaluate it under
//!    the model with completion. A universal instance that evaluates false
//!    is a genuine counterexample; it is asserted back into the session.
//! 4. A round that produces no new instances is `Sat` — the model survived
//!    refinement. Otherwise go back to 1.
//!
//! Termination is bounded by [`MbqiConfig::max_iterations`]; running out of
//! budget yields `Unknown`, which callers must read as "no conclusion",
//! never as falsification.
//!
//! # References
//!
//! - Ge, Y., & de Moura, L. (2009). "Complete instantiation for quantified
//!   formulas in satisfiability modulo theories." CAV 2009.

use std::fmt;

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use quince_core::ast::{BoundList, TermId, TermManager};
use quince_core::error::{QuinceError, Result};
use quince_core::model::{Model, ModelEvaluator, Value};
use quince_core::sort::SortId;
use quince_core::subst::{SubstitutionMap, substitute};

use crate::ground::{GroundSolver, SampleConfig, SolverResult};

/// Configuration of the MBQI loop.
#[derive(Debug, Clone)]
pub struct MbqiConfig {
    /// Maximum number of refinement iterations before giving up with
    /// `Unknown`.
    pub max_iterations: usize,
    /// Synthetic domain sample used for candidate enumeration.
    pub sample: SampleConfig,
}

impl Default for MbqiConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            sample: SampleConfig::default(),
        }
    }
}

/// A quantified formula tracked by the engine.
#[derive(Debug, Clone)]
pub struct QuantifiedFormula {
    /// The original quantified term.
    pub term: TermId,
    /// Bound variables (name, sort), outermost first.
    pub vars: BoundList,
    /// The body of the quantifier.
    pub body: TermId,
    /// Whether this is universal (true) or existential (false).
    pub is_universal: bool,
}

impl QuantifiedFormula {
    /// Decompose a quantifier term.
    ///
    /// # Errors
    ///
    /// [`QuinceError::UnsupportedQuantifier`] when the term is not a
    /// top-level quantifier.
    pub fn try_from_term(term: TermId, manager: &TermManager) -> Result<Self> {
        let Some((kind, vars, body)) = manager.as_quantifier(term) else {
            return Err(QuinceError::UnsupportedQuantifier(format!(
                "not a quantified formula: {}",
                manager.display(term)
            )));
        };
        Ok(Self {
            term,
            vars,
            body,
            is_universal: kind.is_universal(),
        })
    }

    /// Number of bound variables.
    #[must_use]
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }
}

/// Statistics about one engine instance.
#[derive(Debug, Clone, Default)]
pub struct MbqiStats {
    /// Satisfiability checks issued to the ground session.
    pub checks: usize,
    /// Completed refinement iterations.
    pub iterations: usize,
    /// Ground instances produced (returned or asserted).
    pub instances_produced: usize,
    /// Combinations skipped because their value tuple was already produced.
    pub duplicates_skipped: usize,
    /// Universal instances that evaluated false under a candidate model.
    pub counterexamples: usize,
}

impl fmt::Display for MbqiStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MBQI statistics:")?;
        writeln!(f, "  checks: {}", self.checks)?;
        writeln!(f, "  iterations: {}", self.iterations)?;
        writeln!(f, "  instances produced: {}", self.instances_produced)?;
        writeln!(f, "  duplicates skipped: {}", self.duplicates_skipped)?;
        write!(f, "  counterexamples: {}", self.counterexamples)
    }
}

/// Key identifying one instantiation: the quantifier plus the rendered
/// value tuple.
type InstantiationKey = (TermId, Vec<String>);

/// Model-based quantifier instantiation engine.
///
/// Owns its ground session exclusively; the assertion set and the
/// deduplication set grow monotonically and are never shared between
/// engine instances.
#[derive(Debug)]
pub struct MbqiEngine {
    session: GroundSolver,
    quantifiers: Vec<QuantifiedFormula>,
    ground_formulas: Vec<TermId>,
    seen: FxHashSet<InstantiationKey>,
    model: Option<Model>,
    config: MbqiConfig,
    stats: MbqiStats,
}

impl MbqiEngine {
    /// Create an engine over the given formulas with the default
    /// configuration.
    pub fn new(formulas: &[TermId], model: Option<Model>, manager: &TermManager) -> Result<Self> {
        Self::with_config(formulas, model, MbqiConfig::default(), manager)
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(
        formulas: &[TermId],
        model: Option<Model>,
        config: MbqiConfig,
        manager: &TermManager,
    ) -> Result<Self> {
        let mut engine = Self {
            session: GroundSolver::with_sample(config.sample.clone()),
            quantifiers: Vec::new(),
            ground_formulas: Vec::new(),
            seen: FxHashSet::default(),
            model,
            config,
            stats: MbqiStats::default(),
        };
        for &f in formulas {
            engine.add_formula(f, manager)?;
        }
        Ok(engine)
    }

    /// Route a formula: top-level quantifiers are tracked, ground formulas
    /// asserted into the session.
    ///
    /// # Errors
    ///
    /// [`QuinceError::UnsupportedQuantifier`] when the formula is neither
    /// ground nor a top-level quantifier; the engine state is unchanged.
    pub fn add_formula(&mut self, term: TermId, manager: &TermManager) -> Result<()> {
        if manager.as_quantifier(term).is_some() {
            self.quantifiers.push(QuantifiedFormula::try_from_term(term, manager)?);
            return Ok(());
        }
        if manager.is_ground(term) {
            self.session.assert(term, manager)?;
            self.ground_formulas.push(term);
            return Ok(());
        }
        Err(QuinceError::UnsupportedQuantifier(format!(
            "formula is neither ground nor a top-level quantifier: {}",
            manager.display(term)
        )))
    }

    /// Track a formula that must be a quantifier.
    pub fn add_quantified(&mut self, term: TermId, manager: &TermManager) -> Result<()> {
        self.quantifiers.push(QuantifiedFormula::try_from_term(term, manager)?);
        Ok(())
    }

    /// Whether the engine has a universally quantified formula to work on.
    #[must_use]
    pub fn is_applicable(&self) -> bool {
        self.quantifiers.iter().any(|q| q.is_universal)
    }

    /// Replace the candidate model snapshot.
    pub fn update_model(&mut self, model: Model) {
        self.model = Some(model);
    }

    /// Engine statistics.
    #[must_use]
    pub fn stats(&self) -> &MbqiStats {
        &self.stats
    }

    /// Tracked quantifiers.
    #[must_use]
    pub fn quantifiers(&self) -> &[QuantifiedFormula] {
        &self.quantifiers
    }

    /// Ground formulas asserted at construction.
    #[must_use]
    pub fn ground_formulas(&self) -> &[TermId] {
        &self.ground_formulas
    }

    /// Run the refinement loop to completion or budget exhaustion.
    pub fn solve(&mut self, manager: &mut TermManager) -> Result<(SolverResult, Option<Model>)> {
        for iteration in 0..self.config.max_iterations {
            self.stats.checks += 1;
            match self.session.check(manager) {
                SolverResult::Unsat => return Ok((SolverResult::Unsat, None)),
                SolverResult::Unknown => return Ok((SolverResult::Unknown, None)),
                SolverResult::Sat => {}
            }
            let model = self
                .session
                .model()
                .cloned()
                .ok_or_else(|| QuinceError::internal("sat check produced no model"))?;

            let quantifiers = self.quantifiers.clone();
            let mut batch = Vec::new();
            for q in &quantifiers {
                self.refine_quantifier(q, &model, manager, &mut batch)?;
            }

            debug!(
                "mbqi iteration {iteration}: {} new instances",
                batch.len()
            );

            if batch.is_empty() {
                self.model = Some(model.clone());
                return Ok((SolverResult::Sat, Some(model)));
            }

            self.session.assert_many(&batch, manager)?;
            self.model = Some(model);
            self.stats.iterations += 1;
        }
        Ok((SolverResult::Unknown, None))
    }

    /// Convenience wrapper returning only the verdict.
    pub fn check_sat(&mut self, manager: &mut TermManager) -> Result<SolverResult> {
        self.solve(manager).map(|(result, _)| result)
    }

    /// Convenience wrapper returning the witness model on `Sat`.
    pub fn get_model(&mut self, manager: &mut TermManager) -> Result<Option<Model>> {
        self.solve(manager).map(|(result, model)| {
            if result == SolverResult::Sat {
                model
            } else {
                None
            }
        })
    }

    /// One model-based instantiation pass: every fresh value combination
    /// over every tracked quantifier, substituted into its body.
    ///
    /// Uses the stored model snapshot when one is present, otherwise asks
    /// the session for one; without a satisfiable session the result is
    /// empty. Produced combinations enter the deduplication set, so a
    /// second call against an unchanged model produces nothing.
    pub fn find_instantiations(&mut self, manager: &mut TermManager) -> Result<Vec<TermId>> {
        let model = match &self.model {
            Some(m) => m.clone(),
            None => {
                self.stats.checks += 1;
                if self.session.check(manager) != SolverResult::Sat {
                    return Ok(Vec::new());
                }
                let model = self
                    .session
                    .model()
                    .cloned()
                    .ok_or_else(|| QuinceError::internal("sat check produced no model"))?;
                self.model = Some(model.clone());
                model
            }
        };

        let quantifiers = self.quantifiers.clone();
        let mut instances = Vec::new();
        for q in &quantifiers {
            self.enumerate_combinations(q, &model, manager, &mut |engine, inst, _value| {
                engine.stats.instances_produced += 1;
                instances.push(inst);
                true
            })?;
        }
        Ok(instances)
    }

    /// Evaluate fresh combinations for one quantifier and collect violating
    /// universal instances into the batch.
    fn refine_quantifier(
        &mut self,
        q: &QuantifiedFormula,
        model: &Model,
        manager: &mut TermManager,
        batch: &mut Vec<TermId>,
    ) -> Result<()> {
        let is_universal = q.is_universal;
        self.enumerate_combinations(q, model, manager, &mut |engine, inst, value| {
            if is_universal && value == Some(Value::Bool(false)) {
                trace!("counterexample instance produced");
                engine.stats.counterexamples += 1;
                engine.stats.instances_produced += 1;
                batch.push(inst);
                return true;
            }
            // An existential instance evaluating true confirms satisfaction;
            // nothing needs asserting. Instances left non-ground by nested
            // quantifiers evaluate to `None` and are inconclusive.
            false
        })
    }

    /// Enumerate the Cartesian product of per-variable candidate domains,
    /// skipping combinations already produced. The callback receives the
    /// substituted instance and its evaluation under the model (`None` when
    /// the instance is not ground); it returns whether the combination
    /// counts as produced and enters the deduplication set.
    fn enumerate_combinations(
        &mut self,
        q: &QuantifiedFormula,
        model: &Model,
        manager: &mut TermManager,
        on_instance: &mut dyn FnMut(&mut Self, TermId, Option<Value>) -> bool,
    ) -> Result<()> {
        if q.vars.is_empty() {
            return Ok(());
        }

        let domains: Vec<Vec<Value>> = q
            .vars
            .iter()
            .map(|&(_, sort)| self.candidate_domain(sort, model, manager))
            .collect();
        if domains.iter().any(Vec::is_empty) {
            return Ok(());
        }

        let mut indices = vec![0usize; domains.len()];
        loop {
            let values: Vec<&Value> = indices
                .iter()
                .enumerate()
                .map(|(slot, &idx)| &domains[slot][idx])
                .collect();
            let key: InstantiationKey =
                (q.term, values.iter().map(|v| v.to_string()).collect());

            if self.seen.contains(&key) {
                self.stats.duplicates_skipped += 1;
            } else {
                let mut map = SubstitutionMap::new();
                for (&(name, sort), &value) in q.vars.iter().zip(&values) {
                    let term = value.to_term(sort, manager);
                    map.bind(name, term);
                }
                let instance = substitute(q.term, &map, manager)?;
                let value = if manager.is_ground(instance) {
                    let mut evaluator = ModelEvaluator::new(model);
                    Some(evaluator.eval(instance, manager)?)
                } else {
                    None
                };
                if on_instance(self, instance, value) {
                    self.seen.insert(key);
                }
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
                return Ok(());
            }
        }
    }

    /// Candidate domain for one bound variable: values the model assigns to
    /// declarations of the sort, then the synthetic sample, deduplicated by
    /// rendered form.
    fn candidate_domain(&self, sort: SortId, model: &Model, manager: &TermManager) -> Vec<Value> {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut domain = Vec::new();
        for value in model.universe(sort) {
            if seen.insert(value.to_string()) {
                domain.push(value);
            }
        }
        for value in self.config.sample.synthetic_values(sort, &manager.sorts) {
            if seen.insert(value.to_string()) {
                domain.push(value);
            }
        }
        domain
    }
}

/// Solve a formula set with a fresh engine, the way a one-shot caller would.
pub fn mbqi_solve(
    formulas: &[TermId],
    config: MbqiConfig,
    manager: &mut TermManager,
) -> Result<(SolverResult, Option<Model>)> {
    let mut engine = MbqiEngine::with_config(formulas, None, config, manager)?;
    engine.solve(manager)
}
