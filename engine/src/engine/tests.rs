use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::domain::{Domain, DomainEvent, Val};

fn int_bounds(ce: &ConstraintEngine, v: VarKey) -> (i64, i64) {
    ce.current_domain(v).int_bounds().expect("integer domain")
}

#[test]
fn equality_narrows_both_sides() {
    let mut ce = ConstraintEngine::new();
    let a = ce.new_variable("a", Domain::int_interval(0, 10)).unwrap();
    let b = ce.new_variable("b", Domain::int_interval(5, 20)).unwrap();
    ce.create_constraint("eq", &[a, b]).unwrap();
    assert!(ce.propagate());
    assert_eq!(int_bounds(&ce, a), (5, 10));
    assert_eq!(int_bounds(&ce, b), (5, 10));
}

#[test]
fn add_eq_interval_arithmetic() {
    let mut ce = ConstraintEngine::new();
    let x = ce.new_variable("x", Domain::int_interval(0, 5)).unwrap();
    let y = ce.new_variable("y", Domain::int_interval(0, 5)).unwrap();
    let z = ce.new_variable("z", Domain::int_interval(0, 100)).unwrap();
    ce.create_constraint("addEq", &[x, y, z]).unwrap();
    assert!(ce.propagate());
    assert_eq!(int_bounds(&ce, z), (0, 10));

    ce.specify(z, Val::Int(9)).unwrap();
    assert!(ce.propagate());
    assert_eq!(int_bounds(&ce, x), (4, 5));
    assert_eq!(int_bounds(&ce, y), (4, 5));
}

#[test]
fn leq_trims_bounds() {
    let mut ce = ConstraintEngine::new();
    let a = ce.new_variable("a", Domain::int_interval(0, 10)).unwrap();
    let b = ce.new_variable("b", Domain::int_interval(3, 8)).unwrap();
    ce.create_constraint("leq", &[a, b]).unwrap();
    assert!(ce.propagate());
    assert_eq!(int_bounds(&ce, a), (0, 8));
    assert_eq!(int_bounds(&ce, b), (3, 8));
}

#[test]
fn neq_removes_a_settled_member() {
    let mut ce = ConstraintEngine::new();
    let a = ce.new_variable("a", Domain::num_enum([1.0, 2.0], false)).unwrap();
    let b = ce.new_variable("b", Domain::num_enum([2.0], false)).unwrap();
    ce.create_constraint("neq", &[a, b]).unwrap();
    assert!(ce.propagate());
    assert!(ce.current_domain(a).is_member(Val::Float(1.0)));
    assert!(!ce.current_domain(a).is_member(Val::Float(2.0)));
}

#[test]
fn specify_then_reset_restores_base() {
    let mut ce = ConstraintEngine::new();
    let v = ce.new_variable("v", Domain::int_interval(0, 10)).unwrap();
    ce.specify(v, Val::Int(4)).unwrap();
    assert_eq!(ce.current_domain(v).singleton(), Some(Val::Int(4)));
    assert!(ce.variable(v).is_specified());

    // idempotent on the same value
    ce.specify(v, Val::Int(4)).unwrap();

    ce.reset(v).unwrap();
    assert!(!ce.variable(v).is_specified());
    assert_eq!(int_bounds(&ce, v), (0, 10));
}

#[test]
fn specify_requires_membership_in_base() {
    let mut ce = ConstraintEngine::new();
    let v = ce.new_variable("v", Domain::int_interval(0, 10)).unwrap();
    assert!(ce.specify(v, Val::Int(11)).is_err());

    let fixed = ce
        .new_variable_full("w", Domain::int_interval(0, 1), false, false, None, 0)
        .unwrap();
    assert!(matches!(ce.specify(fixed, Val::Int(0)), Err(crate::Error::InvalidOperation(_))));
}

#[test]
fn restrict_base_domain_narrows_and_auto_specifies() {
    let mut ce = ConstraintEngine::new();
    let v = ce.new_variable("v", Domain::int_interval(0, 10)).unwrap();
    ce.restrict_base_domain(v, &Domain::int_interval(0, 5)).unwrap();
    assert_eq!(ce.variable(v).base_domain(), &Domain::int_interval(0, 5));
    assert_eq!(int_bounds(&ce, v), (0, 5));

    // widening is not a restriction
    ce.restrict_base_domain(v, &Domain::int_interval(0, 50)).unwrap();
    assert_eq!(ce.variable(v).base_domain(), &Domain::int_interval(0, 5));

    // a singleton restriction turns into a specification
    ce.restrict_base_domain(v, &Domain::int_singleton(3)).unwrap();
    assert_eq!(ce.variable(v).specified_value(), Some(Val::Int(3)));

    // disjoint restrictions are usage errors
    assert!(ce.restrict_base_domain(v, &Domain::int_interval(7, 9)).is_err());
}

#[test]
fn violation_flow_attributes_and_recovers() {
    let mut ce = ConstraintEngine::new();
    ce.set_allow_violations(true);
    let v = ce.new_variable("v", Domain::int_interval(0, 3)).unwrap();
    let w = ce.new_variable("w", Domain::int_interval(0, 10)).unwrap();
    let eq = ce.create_constraint("eq", &[v, w]).unwrap();
    assert!(ce.propagate());
    assert_eq!(int_bounds(&ce, w), (0, 3));

    // specifying w outside the equality's reach empties a domain; the
    // violation manager charges the equality and propagation recovers
    ce.specify(w, Val::Int(9)).unwrap();
    assert!(ce.propagate());
    assert_eq!(ce.violated_constraints(), vec![eq]);
    assert!(ce.is_violated(eq));
    assert_eq!(ce.violation(), 1.0);
    assert_eq!(ce.violation_expl(), vec!["eq(v,w)".to_string()]);
    assert!(!ce.constraint(eq).is_active());

    // resetting the specification clears the violation
    ce.reset(w).unwrap();
    assert!(ce.propagate());
    assert!(ce.violated_constraints().is_empty());
    assert_eq!(ce.violation(), 0.0);
    assert!(ce.constraint(eq).is_active());
    assert_eq!(int_bounds(&ce, w), (0, 3));
}

#[test]
fn relaxation_cascades_through_equality_chain() {
    let mut ce = ConstraintEngine::new();
    ce.set_auto_propagation(false);
    let x1 = ce.new_variable("x1", Domain::int_interval(0, 10)).unwrap();
    let x2 = ce.new_variable("x2", Domain::int_interval(0, 10)).unwrap();
    let x3 = ce.new_variable("x3", Domain::int_interval(0, 10)).unwrap();
    ce.create_constraint("eq", &[x1, x2]).unwrap();
    ce.create_constraint("eq", &[x2, x3]).unwrap();

    ce.specify(x1, Val::Int(5)).unwrap();
    assert!(ce.propagate());
    for v in [x1, x2, x3] {
        assert_eq!(ce.current_domain(v).singleton(), Some(Val::Int(5)));
    }

    ce.reset(x1).unwrap();
    let cycle = ce.cycle_count();
    assert_eq!(ce.variable(x1).last_relaxed(), cycle);
    assert_eq!(ce.variable(x2).last_relaxed(), cycle);
    assert_eq!(ce.variable(x3).last_relaxed(), cycle);

    assert!(ce.propagate());
    for v in [x1, x2, x3] {
        assert_eq!(int_bounds(&ce, v), (0, 10));
    }
}

#[test]
fn specified_variables_are_not_cascaded() {
    let mut ce = ConstraintEngine::new();
    ce.set_auto_propagation(false);
    let x = ce.new_variable("x", Domain::int_interval(0, 10)).unwrap();
    let y = ce.new_variable("y", Domain::int_interval(0, 10)).unwrap();
    ce.create_constraint("eq", &[x, y]).unwrap();
    ce.specify(y, Val::Int(5)).unwrap();
    ce.specify(x, Val::Int(5)).unwrap();
    assert!(ce.propagate());

    ce.reset(x).unwrap();
    // y keeps its specification through the cascade
    assert_eq!(ce.current_domain(y).singleton(), Some(Val::Int(5)));
    assert!(ce.propagate());
    assert_eq!(ce.current_domain(x).singleton(), Some(Val::Int(5)));
}

#[test]
fn redundant_constraints_retire_after_propagation() {
    let mut ce = ConstraintEngine::new();
    ce.set_auto_propagation(false);
    let a = ce.new_variable("a", Domain::int_interval(2, 2)).unwrap();
    let b = ce.new_variable("b", Domain::int_interval(2, 2)).unwrap();
    let eq = ce.create_constraint("eq", &[a, b]).unwrap();
    assert!(ce.constraint(eq).is_redundant());
    assert!(ce.constraint(eq).is_active());

    assert!(ce.propagate());
    assert!(!ce.constraint(eq).is_active());
    assert_eq!(int_bounds(&ce, a), (2, 2));
}

#[test]
fn constraints_on_inactive_variables_start_deactivated() {
    let mut ce = ConstraintEngine::new();
    let a = ce.new_variable("a", Domain::int_interval(0, 10)).unwrap();
    let b = ce.new_variable("b", Domain::int_interval(5, 20)).unwrap();
    ce.deactivate_variable(a).unwrap();
    let eq = ce.create_constraint("eq", &[a, b]).unwrap();
    assert!(!ce.constraint(eq).is_active());
    assert!(ce.propagate());
    // no narrowing happened through the inactive constraint
    assert_eq!(int_bounds(&ce, b), (5, 20));

    ce.activate_variable(a).unwrap();
    assert!(ce.constraint(eq).is_active());
    assert!(ce.propagate());
    assert_eq!(int_bounds(&ce, b), (5, 10));
}

#[test]
fn removing_a_constraint_relaxes_its_scope() {
    let mut ce = ConstraintEngine::new();
    let a = ce.new_variable("a", Domain::int_interval(0, 10)).unwrap();
    let b = ce.new_variable("b", Domain::int_interval(5, 20)).unwrap();
    let eq = ce.create_constraint("eq", &[a, b]).unwrap();
    assert!(ce.propagate());
    assert_eq!(int_bounds(&ce, a), (5, 10));

    ce.remove_constraint(eq).unwrap();
    assert!(ce.propagate());
    assert_eq!(int_bounds(&ce, a), (0, 10));
    assert_eq!(int_bounds(&ce, b), (5, 20));
}

#[derive(Default)]
struct EventLog {
    events: Rc<RefCell<Vec<String>>>,
}

impl EngineListener for EventLog {
    fn notify_propagation_commenced(&mut self) {
        self.events.borrow_mut().push("commenced".into());
    }
    fn notify_propagation_completed(&mut self) {
        self.events.borrow_mut().push("completed".into());
    }
    fn notify_propagation_preempted(&mut self) {
        self.events.borrow_mut().push("preempted".into());
    }
    fn notify_constraint_executed(&mut self, c: ConstraintKey) {
        self.events.borrow_mut().push(format!("executed {c}"));
    }
    fn notify_variable_added(&mut self, v: VarKey) {
        self.events.borrow_mut().push(format!("var+ {v}"));
    }
    fn notify_variable_removed(&mut self, v: VarKey) {
        self.events.borrow_mut().push(format!("var- {v}"));
    }
    fn notify_constraint_removed(&mut self, c: ConstraintKey) {
        self.events.borrow_mut().push(format!("con- {c}"));
    }
    fn notify_variable_changed(&mut self, v: VarKey, change: DomainEvent) {
        self.events.borrow_mut().push(format!("chg {v} {change}"));
    }
}

#[test]
fn listeners_observe_the_propagation_lifecycle() {
    let mut ce = ConstraintEngine::new();
    ce.set_auto_propagation(false);
    let log = EventLog::default();
    let events = log.events.clone();
    let _handle = ce.add_listener(Box::new(log));

    let a = ce.new_variable("a", Domain::int_interval(0, 10)).unwrap();
    let b = ce.new_variable("b", Domain::int_interval(5, 20)).unwrap();
    ce.create_constraint("eq", &[a, b]).unwrap();
    assert!(ce.propagate());

    let seen = events.borrow();
    let commenced = seen.iter().position(|e| e == "commenced").unwrap();
    let completed = seen.iter().position(|e| e == "completed").unwrap();
    let executed = seen.iter().position(|e| e.starts_with("executed")).unwrap();
    assert!(commenced < executed && executed < completed);
}

#[test]
fn dropped_listener_handles_unsubscribe() {
    let mut ce = ConstraintEngine::new();
    let log = EventLog::default();
    let events = log.events.clone();
    let handle = ce.add_listener(Box::new(log));
    ce.new_variable("a", Domain::int_interval(0, 1)).unwrap();
    assert_eq!(events.borrow().len(), 1);

    drop(handle);
    ce.new_variable("b", Domain::int_interval(0, 1)).unwrap();
    assert_eq!(events.borrow().len(), 1);
}

#[test]
fn purge_destroys_constraints_before_variables_silently() {
    let mut ce = ConstraintEngine::new();
    ce.set_auto_propagation(false);
    let log = EventLog::default();
    let events = log.events.clone();
    let _handle = ce.add_listener(Box::new(log));

    let vars: Vec<VarKey> = (0..50)
        .map(|i| ce.new_variable(&format!("v{i}"), Domain::int_interval(0, 10)).unwrap())
        .collect();
    for i in 0..50 {
        ce.create_constraint("eq", &[vars[i], vars[(i + 1) % 50]]).unwrap();
    }
    assert_eq!(ce.variable_count(), 50);
    assert_eq!(ce.constraint_count(), 50);
    assert_eq!(ce.propagator_count(), 2);

    let published_before = events.borrow().len();
    ce.purge();
    // teardown publishes nothing, so no notification can reference a dangling key
    assert_eq!(events.borrow().len(), published_before);
    assert_eq!(ce.variable_count(), 0);
    assert_eq!(ce.constraint_count(), 0);
    assert_eq!(ce.propagator_count(), 0);
}

#[test]
fn post_propagation_callbacks_can_force_another_pass() {
    let mut ce = ConstraintEngine::new();
    ce.set_auto_propagation(false);
    let v = ce.new_variable("v", Domain::int_interval(0, 10)).unwrap();
    let fired = Rc::new(RefCell::new(0u32));
    let fired_in_cb = fired.clone();
    ce.add_post_propagation_callback(Box::new(move |cnet| {
        *fired_in_cb.borrow_mut() += 1;
        if *fired_in_cb.borrow() == 1 {
            cnet.restrict_int_bounds(v, 0, 5);
            true // one more pass to absorb the change
        } else {
            false
        }
    }));
    ce.touch(v).unwrap();
    assert!(ce.propagate());
    assert_eq!(int_bounds(&ce, v), (0, 5));
    assert!(*fired.borrow() >= 2);
}

#[test]
fn unknown_constraint_names_are_rejected() {
    let mut ce = ConstraintEngine::new();
    let a = ce.new_variable("a", Domain::int_interval(0, 1)).unwrap();
    let b = ce.new_variable("b", Domain::int_interval(0, 1)).unwrap();
    assert!(matches!(
        ce.create_constraint("frobnicate", &[a, b]),
        Err(crate::Error::UnknownType(_))
    ));
    assert!(matches!(
        ce.create_constraint("eq", &[a]),
        Err(crate::Error::TypeMismatch(_))
    ));
}

#[test]
fn incomparable_scopes_are_rejected() {
    let mut ce = ConstraintEngine::new();
    let n = ce.new_variable("n", Domain::int_interval(0, 1)).unwrap();
    let sym = ce.intern("red");
    let s = ce
        .new_variable("s", Domain::sym_enum([sym], false, crate::domain::SymTag::Symbol))
        .unwrap();
    assert!(matches!(
        ce.create_constraint("eq", &[n, s]),
        Err(crate::Error::TypeMismatch(_))
    ));
    assert!(matches!(
        ce.create_constraint("precedes", &[n, s]),
        Err(crate::Error::TypeMismatch(_))
    ));
}

#[test]
fn variables_stay_valid_through_propagation() {
    let mut ce = ConstraintEngine::new();
    let a = ce.new_variable("a", Domain::int_interval(0, 10)).unwrap();
    let b = ce.new_variable("b", Domain::int_interval(5, 20)).unwrap();
    let eq = ce.create_constraint("eq", &[a, b]).unwrap();
    assert!(ce.propagate());
    assert!(ce.cnet().validate_variable(a));
    assert!(ce.cnet().validate_variable(b));
    assert_eq!(ce.constraint(eq).scope(), &[a, b]);

    ce.remove_constraint(eq).unwrap();
    assert!(ce.cnet().validate_variable(a));
    assert!(ce.variable(a).constraints().is_empty());
}

#[test]
fn strict_mode_halts_on_first_empty() {
    let mut ce = ConstraintEngine::new();
    ce.set_auto_propagation(false);
    let a = ce.new_variable("a", Domain::int_interval(0, 3)).unwrap();
    let b = ce.new_variable("b", Domain::int_interval(7, 9)).unwrap();
    ce.create_constraint("eq", &[a, b]).unwrap();
    assert!(!ce.propagate());
    assert!(ce.proven_inconsistent());
    assert_eq!(ce.consistency(), Consistency::ProvenInconsistent);
    // empty variables alone still report a violation of 1.0
    assert_eq!(ce.violation(), 1.0);
}
