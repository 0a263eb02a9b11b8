//! Property-based tests for the substitution engine.
//!
//! Properties covered:
//! - Instantiation agrees with direct evaluation over the sampled domain
//! - Names absent from a formula never change it
//! - Multi-valued expansion produces one instance per combination

use num_bigint::BigInt;
use proptest::prelude::*;
use quince_core::ast::{TermKind, TermManager};
use quince_core::model::{Model, ModelEvaluator, Value};
use quince_core::subst::{SubstitutionMap, substitute};

/// Strategy for generating sampled instantiation points
fn point_strategy() -> impl Strategy<Value = i64> {
    -50i64..50i64
}

proptest! {
    /// Instantiating forall x. x + b > 0 at a point matches arithmetic.
    #[test]
    fn instantiation_matches_arithmetic(a in point_strategy(), b in point_strategy()) {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_bound(0, int);
        let offset = tm.mk_int(b);
        let sum = tm.mk_add([x, offset]);
        let zero = tm.mk_int(0);
        let body = tm.mk_gt(sum, zero);
        let q = tm.mk_forall(&[("x", int)], body);

        let mut map = SubstitutionMap::new();
        let literal = tm.mk_int(a);
        map.bind(tm.intern("x"), literal);
        let instance = substitute(q, &map, &mut tm).unwrap();
        prop_assert!(tm.is_ground(instance));

        let model = Model::new();
        let mut evaluator = ModelEvaluator::new(&model);
        let value = evaluator.eval(instance, &tm).unwrap();
        prop_assert_eq!(value, Value::Bool(a + b > 0));
    }

    /// A binding for a name the formula never binds is a no-op.
    #[test]
    fn absent_name_is_identity(a in point_strategy()) {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_bound(0, int);
        let zero = tm.mk_int(0);
        let body = tm.mk_ge(x, zero);
        let q = tm.mk_forall(&[("x", int)], body);

        let mut map = SubstitutionMap::new();
        let literal = tm.mk_int(a);
        map.bind(tm.intern("unrelated"), literal);
        let result = substitute(q, &map, &mut tm).unwrap();
        prop_assert_eq!(result, q);
    }

    /// Multi-valued expansion of a universal produces a conjunction with
    /// exactly one conjunct per distinct value.
    #[test]
    fn multi_value_conjunct_count(values in proptest::collection::hash_set(point_strategy(), 2..5)) {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_bound(0, int);
        let body = tm.mk_apply("P", [x], tm.sorts.bool_sort);
        let q = tm.mk_forall(&[("x", int)], body);

        let mut map = SubstitutionMap::new();
        let x_name = tm.intern("x");
        for &v in &values {
            let literal = tm.mk_int(v);
            map.bind(x_name, literal);
        }

        let result = substitute(q, &map, &mut tm).unwrap();
        match &tm.get(result).unwrap().kind {
            TermKind::And(args) => prop_assert_eq!(args.len(), values.len()),
            _ => prop_assert!(false, "expected a conjunction"),
        }
    }

    /// Full two-variable instantiation is ground and places values at the
    /// positions their binder names dictate.
    #[test]
    fn two_variable_instantiation_positions(a in point_strategy(), b in point_strategy()) {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_bound(1, int);
        let y = tm.mk_bound(0, int);
        let diff = tm.mk_sub(x, y);
        let zero = tm.mk_int(0);
        let body = tm.mk_ge(diff, zero);
        let q = tm.mk_forall(&[("x", int), ("y", int)], body);

        let mut map = SubstitutionMap::new();
        let a_lit = tm.mk_int(a);
        let b_lit = tm.mk_int(b);
        map.bind(tm.intern("x"), a_lit);
        map.bind(tm.intern("y"), b_lit);

        let instance = substitute(q, &map, &mut tm).unwrap();
        prop_assert!(tm.is_ground(instance));

        let model = Model::new();
        let mut evaluator = ModelEvaluator::new(&model);
        let value = evaluator.eval(instance, &tm).unwrap();
        prop_assert_eq!(value, Value::Bool(a - b >= 0));
    }

    /// Substitution through an untouched nested quantifier keeps the
    /// residual formula well-scoped and evaluable once fully instantiated.
    #[test]
    fn nested_residual_stays_well_scoped(a in point_strategy(), b in point_strategy()) {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;

        // forall x. exists y. x + y = c, instantiated at x := a then
        // y := b, must equal the arithmetic fact a + b = c.
        let x = tm.mk_bound(1, int);
        let y = tm.mk_bound(0, int);
        let sum = tm.mk_add([x, y]);
        let c = tm.mk_const("c", int);
        let inner_body = tm.mk_eq(sum, c);
        let inner = tm.mk_exists(&[("y", int)], inner_body);
        let q = tm.mk_forall(&[("x", int)], inner);

        let mut outer_map = SubstitutionMap::new();
        let a_lit = tm.mk_int(a);
        outer_map.bind(tm.intern("x"), a_lit);
        let residual = substitute(q, &outer_map, &mut tm).unwrap();

        let mut inner_map = SubstitutionMap::new();
        let b_lit = tm.mk_int(b);
        inner_map.bind(tm.intern("y"), b_lit);
        let instance = substitute(residual, &inner_map, &mut tm).unwrap();
        prop_assert!(tm.is_ground(instance));

        let c_name = tm.intern("c");
        let mut model = Model::new();
        model.assign(c_name, int, Value::Int(BigInt::from(a + b)));
        let mut evaluator = ModelEvaluator::new(&model);
        let value = evaluator.eval(instance, &tm).unwrap();
        prop_assert_eq!(value, Value::Bool(true));
    }
}
