//! E-matching instantiation strategy (placeholder).
//!
//! Pattern-based instantiation needs a congruence-closure-backed term index
//! to match triggers against asserted ground terms; none of that machinery
//! lives here yet. The engine keeps the strategy contract — it is
//! applicable to universally quantified input and produces no
//! instantiations — so callers can select it without special-casing, and a
//! real matcher can replace the body without touching the interface.

use quince_core::ast::{TermId, TermKind, TermManager};
use quince_core::error::Result;
use quince_core::model::Model;

/// Pattern-based instantiation engine. Currently yields nothing.
#[derive(Debug)]
pub struct EMatchingEngine {
    formulas: Vec<TermId>,
    model: Option<Model>,
}

impl EMatchingEngine {
    /// Create an engine over the given formulas.
    #[must_use]
    pub fn new(formulas: &[TermId], model: Option<Model>) -> Self {
        Self {
            formulas: formulas.to_vec(),
            model,
        }
    }

    /// Whether the engine tracks a universally quantified formula.
    #[must_use]
    pub fn is_applicable(&self, manager: &TermManager) -> bool {
        self.formulas.iter().any(|&f| {
            matches!(
                manager.get(f).map(|t| &t.kind),
                Some(TermKind::Forall { .. })
            )
        })
    }

    /// Produce instantiations. Always empty; never fails, applicable or
    /// not.
    pub fn find_instantiations(&mut self, _manager: &mut TermManager) -> Result<Vec<TermId>> {
        Ok(Vec::new())
    }

    /// Replace the candidate model snapshot.
    pub fn update_model(&mut self, model: Model) {
        self.model = Some(model);
    }

    /// The tracked formulas.
    #[must_use]
    pub fn formulas(&self) -> &[TermId] {
        &self.formulas
    }

    /// The current model snapshot, if any.
    #[must_use]
    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_produces_nothing() {
        let mut tm = TermManager::new();
        let x = tm.mk_bound(0, tm.sorts.int_sort);
        let zero = tm.mk_int(0);
        let body = tm.mk_gt(x, zero);
        let q = tm.mk_forall(&[("x", tm.sorts.int_sort)], body);

        let mut engine = EMatchingEngine::new(&[q], None);
        assert!(engine.is_applicable(&tm));
        assert!(engine.find_instantiations(&mut tm).unwrap().is_empty());
        assert!(engine.model().is_none());

        engine.update_model(Model::new());
        assert!(engine.model().is_some());
        assert!(engine.find_instantiations(&mut tm).unwrap().is_empty());
    }

    #[test]
    fn test_inapplicable_input_does_not_fail() {
        let mut tm = TermManager::new();
        let c = tm.mk_const("c", tm.sorts.int_sort);
        let zero = tm.mk_int(0);
        let ground = tm.mk_gt(c, zero);
        let x = tm.mk_bound(0, tm.sorts.int_sort);
        let body = tm.mk_gt(x, zero);
        let exists = tm.mk_exists(&[("x", tm.sorts.int_sort)], body);

        let mut engine = EMatchingEngine::new(&[ground, exists], None);
        assert!(!engine.is_applicable(&tm));
        assert!(engine.find_instantiations(&mut tm).unwrap().is_empty());
    }
}
