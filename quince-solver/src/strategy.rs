//! Strategy dispatch and the engine factory.
//!
//! The strategy set is closed and small, so dispatch is a tagged variant
//! matched in place rather than an open trait hierarchy. Every variant
//! answers the same capability set: `is_applicable`, `find_instantiations`,
//! `update_model`.
//!
//! [`QuantEngineFactory`] is the only externally visible configuration
//! surface: engines are selected by the case-insensitive string keys
//! `"mbqi"` and `"e-matching"`.

use quince_core::ast::{TermId, TermManager};
use quince_core::error::{QuinceError, Result};
use quince_core::model::Model;

use crate::ematching::EMatchingEngine;
use crate::mbqi::MbqiEngine;

/// A quantifier instantiation engine of some strategy.
#[derive(Debug)]
pub enum QuantEngine {
    /// Model-based quantifier instantiation.
    Mbqi(MbqiEngine),
    /// Pattern-based instantiation (placeholder).
    EMatching(EMatchingEngine),
}

impl QuantEngine {
    /// The canonical key of this engine's strategy.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mbqi(_) => "mbqi",
            Self::EMatching(_) => "e-matching",
        }
    }

    /// Whether the strategy applies to the tracked formulas. Both shipped
    /// strategies restrict themselves to universally quantified input.
    #[must_use]
    pub fn is_applicable(&self, manager: &TermManager) -> bool {
        match self {
            Self::Mbqi(engine) => engine.is_applicable(),
            Self::EMatching(engine) => engine.is_applicable(manager),
        }
    }

    /// Produce a finite batch of instantiation witnesses. Order is
    /// strategy-defined and not stable across calls.
    pub fn find_instantiations(&mut self, manager: &mut TermManager) -> Result<Vec<TermId>> {
        match self {
            Self::Mbqi(engine) => engine.find_instantiations(manager),
            Self::EMatching(engine) => engine.find_instantiations(manager),
        }
    }

    /// Replace the candidate model snapshot for future instantiations.
    pub fn update_model(&mut self, model: Model) {
        match self {
            Self::Mbqi(engine) => engine.update_model(model),
            Self::EMatching(engine) => engine.update_model(model),
        }
    }
}

/// String-keyed constructor for [`QuantEngine`]s.
#[derive(Debug)]
pub struct QuantEngineFactory;

impl QuantEngineFactory {
    /// The canonical set of supported engine kinds.
    #[must_use]
    pub fn available_engines() -> &'static [&'static str] {
        &["mbqi", "e-matching"]
    }

    /// Build an engine by kind. Matching is case-insensitive.
    ///
    /// # Errors
    ///
    /// [`QuinceError::UnknownEngine`] for a kind outside
    /// [`available_engines`](Self::available_engines), raised before any
    /// engine state is constructed.
    pub fn create(
        kind: &str,
        formulas: &[TermId],
        model: Option<Model>,
        manager: &TermManager,
    ) -> Result<QuantEngine> {
        match kind.to_ascii_lowercase().as_str() {
            "mbqi" => Ok(QuantEngine::Mbqi(MbqiEngine::new(formulas, model, manager)?)),
            "e-matching" => Ok(QuantEngine::EMatching(EMatchingEngine::new(formulas, model))),
            _ => Err(QuinceError::UnknownEngine(kind.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universal(tm: &mut TermManager) -> TermId {
        let x = tm.mk_bound(0, tm.sorts.int_sort);
        let zero = tm.mk_int(0);
        let body = tm.mk_gt(x, zero);
        tm.mk_forall(&[("x", tm.sorts.int_sort)], body)
    }

    #[test]
    fn test_factory_is_case_insensitive() {
        let mut tm = TermManager::new();
        let q = universal(&mut tm);

        let lower = QuantEngineFactory::create("mbqi", &[q], None, &tm).unwrap();
        let upper = QuantEngineFactory::create("MBQI", &[q], None, &tm).unwrap();
        assert_eq!(lower.name(), upper.name());

        let mixed = QuantEngineFactory::create("E-Matching", &[q], None, &tm).unwrap();
        assert_eq!(mixed.name(), "e-matching");
    }

    #[test]
    fn test_factory_rejects_unknown_kind() {
        let mut tm = TermManager::new();
        let q = universal(&mut tm);
        let err = QuantEngineFactory::create("bogus", &[q], None, &tm).unwrap_err();
        assert!(matches!(err, QuinceError::UnknownEngine(_)));
        assert_eq!(format!("{err}"), "unknown engine kind: 'bogus'");
    }

    #[test]
    fn test_available_engines_verbatim() {
        assert_eq!(
            QuantEngineFactory::available_engines(),
            &["mbqi", "e-matching"]
        );
    }

    #[test]
    fn test_dispatch_applicability() {
        let mut tm = TermManager::new();
        let q = universal(&mut tm);

        let mbqi = QuantEngineFactory::create("mbqi", &[q], None, &tm).unwrap();
        assert!(mbqi.is_applicable(&tm));

        let ematching = QuantEngineFactory::create("e-matching", &[q], None, &tm).unwrap();
        assert!(ematching.is_applicable(&tm));
    }

    #[test]
    fn test_update_model_dispatch() {
        let mut tm = TermManager::new();
        let q = universal(&mut tm);
        let mut engine = QuantEngineFactory::create("e-matching", &[q], None, &tm).unwrap();
        engine.update_model(Model::new());
        assert!(engine.find_instantiations(&mut tm).unwrap().is_empty());
    }
}
