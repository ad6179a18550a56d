//! The constraint engine: variables, constraints, propagators and the
//! propagation loop.
//!
//! The engine owns all variables and constraints (arena storage, stable keys)
//! and a list of [Propagator]s driven in registration order. Domain mutations
//! route change events synchronously to the engine (relaxation cascades,
//! violation tracking, listener publication) and are buffered for propagator
//! agenda maintenance, which is drained between constraint executions.

pub mod constraint;
pub mod listener;
pub mod propagator;
pub mod variable;
pub mod violation;

#[cfg(test)]
mod tests;

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

use env_param::EnvParam;
use itertools::Itertools;

use crate::collections::store::Arena;
use crate::constraints::Rule;
use crate::create_key_type;
use crate::domain::{Domain, DomainEvent, Val};
use crate::symbols::{SymId, SymbolTable};
use crate::temporal::propagator::TemporalPropagator;
use crate::Error;

pub use constraint::Constraint;
pub use listener::{DomainListener, EngineListener, ListenerHandle};
pub use propagator::{DefaultPropagator, Propagator};
pub use variable::Variable;
pub use violation::ViolationMgr;

use listener::ListenerRegistry;

create_key_type!(pub VarKey);
create_key_type!(pub ConstraintKey);

pub static AUTO_PROPAGATE: EnvParam<bool> = EnvParam::new("TEMPUS_AUTO_PROPAGATE", "true");
pub static MAX_VIOLATIONS: EnvParam<u32> = EnvParam::new("TEMPUS_MAX_VIOLATIONS", "0");

/// Engine-level toggles. Defaults come from environment parameters.
#[derive(Copy, Clone, Debug)]
pub struct EngineConfig {
    /// Propagate automatically after any public mutation that leaves the
    /// engine dirty.
    pub auto_propagate: bool,
    /// Violation budget; 0 is strict mode (first empty domain halts).
    pub max_violations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            auto_propagate: AUTO_PROPAGATE.get(),
            max_violations: MAX_VIOLATIONS.get(),
        }
    }
}

/// Overall consistency state of the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Consistency {
    ConstraintConsistent,
    Pending,
    ProvenInconsistent,
}

/// Lifecycle phase. While purging, removal paths are short-circuited and no
/// notifications are published. The transition happens exactly once.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Running,
    Purging,
}

/// Buffered notification for propagator agenda maintenance. Listener
/// publication is synchronous; propagators receive their notifications between
/// constraint executions, in event order.
#[derive(Copy, Clone, Debug)]
enum Pending {
    DomainChange(VarKey, DomainEvent),
    ConstraintActivated(ConstraintKey),
    ConstraintDeactivated(ConstraintKey),
    VariableActivated(VarKey),
    VariableDeactivated(VarKey),
}

/// The constraint network state: everything propagators narrow against.
///
/// Split out of [ConstraintEngine] so that a propagator (owned by the engine)
/// can execute against `&mut Cnet` while the engine retains the propagator
/// list.
pub struct Cnet {
    pub(crate) variables: Arena<VarKey, Variable>,
    pub(crate) constraints: Arena<ConstraintKey, Constraint>,
    pub(crate) violations: ViolationMgr,
    pub(crate) symbols: SymbolTable,
    pub(crate) redundant: BTreeSet<ConstraintKey>,
    relaxed: BTreeSet<VarKey>,
    pending: VecDeque<Pending>,
    listeners: Rc<RefCell<ListenerRegistry>>,
    relaxing: bool,
    relaxing_violation: bool,
    dirty: bool,
    cycle_count: u64,
    most_recent_repropagation: u64,
    phase: Phase,
}

impl Cnet {
    fn new() -> Self {
        Cnet {
            variables: Arena::new(),
            constraints: Arena::new(),
            violations: ViolationMgr::default(),
            symbols: SymbolTable::new(),
            redundant: BTreeSet::new(),
            relaxed: BTreeSet::new(),
            pending: VecDeque::new(),
            listeners: Rc::new(RefCell::new(ListenerRegistry::default())),
            relaxing: false,
            relaxing_violation: false,
            dirty: false,
            cycle_count: 1,
            most_recent_repropagation: 1,
            phase: Phase::Running,
        }
    }

    // ----- queries -----

    pub fn variable(&self, v: VarKey) -> &Variable {
        &self.variables[v]
    }

    pub fn constraint(&self, c: ConstraintKey) -> &Constraint {
        &self.constraints[c]
    }

    pub fn current_domain(&self, v: VarKey) -> &Domain {
        &self.variables[v].current
    }

    pub fn has_variable(&self, v: VarKey) -> bool {
        self.variables.contains(v)
    }

    pub fn has_constraint(&self, c: ConstraintKey) -> bool {
        self.constraints.contains(c)
    }

    pub fn proven_inconsistent(&self) -> bool {
        self.violations.has_empty_variables()
    }

    pub fn allow_violations(&self) -> bool {
        self.violations.max_violations_allowed() > 0
    }

    pub fn violations(&self) -> &ViolationMgr {
        &self.violations
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Cycle of the most recent relaxation, used by propagators that cache
    /// state across propagations.
    pub fn most_recent_repropagation(&self) -> u64 {
        self.most_recent_repropagation
    }

    pub fn is_purging(&self) -> bool {
        self.phase == Phase::Purging
    }

    pub fn intern(&mut self, text: &str) -> SymId {
        self.symbols.intern(text)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    // ----- event routing -----

    fn publish(&mut self, event: impl FnMut(&mut dyn EngineListener)) {
        if self.is_purging() {
            return;
        }
        self.dirty = true;
        self.listeners.clone().borrow_mut().publish(event);
    }

    /// Routes a domain-change event: violation/relaxation handling first, then
    /// listener publication, then buffering for propagator dispatch.
    pub(crate) fn route_event(&mut self, var: VarKey, change: DomainEvent) {
        if self.is_purging() {
            return;
        }
        self.dirty = true;
        if !self.variables[var].is_active() {
            return;
        }
        tracing::trace!(var = %var, change = %change, "domain change");

        if change == DomainEvent::Emptied {
            self.handle_empty(var);
        } else if change.is_relaxation() {
            self.handle_relax(var);
        } else {
            self.relaxed.remove(&var);
        }

        self.pending.push_back(Pending::DomainChange(var, change));
        self.listeners.clone().borrow_mut().publish_domain_change(var, change);
    }

    fn handle_empty(&mut self, var: VarKey) {
        debug_assert!(self.variables[var].current.is_empty());
        self.violations.add_empty_variable(var);
        if self.violations.can_continue() {
            if let Some(culprit) = self.variables[var].propagating_constraint {
                // attribute the emptying to the constraint and keep going;
                // an empty caused directly by a specify has no culprit and is
                // recovered by the next relaxation round
                self.mark_violated(culprit);
            }
        }
    }

    fn handle_relax(&mut self, var: VarKey) {
        if self.relaxing {
            return;
        }
        tracing::trace!(var = %var, "relaxation cascade");
        if !self.relaxing_violation {
            self.clear_violations_touching(var);
        }
        if self.relaxed.is_empty() {
            self.increment_cycle();
        }
        if self.variables[var].last_relaxed < self.cycle_count {
            self.variables[var].last_relaxed = self.cycle_count;
        }
        self.relaxed.insert(var);

        if self.violations.has_empty_variables() && !self.violations.is_empty_variable(var) {
            self.relax_empty_variables();
        }

        self.relaxing = true;
        // transitive closure of variables reachable through active constraints
        let mut agenda: Vec<VarKey> = Vec::new();
        let mut visited: BTreeSet<VarKey> = BTreeSet::new();
        self.add_linked_vars(var, &mut agenda, &mut visited);
        let mut i = 0;
        while i < agenda.len() {
            let v = agenda[i];
            self.add_linked_vars(v, &mut agenda, &mut visited);
            i += 1;
        }
        for v in agenda {
            if self.variables.contains(v) && self.variables[v].last_relaxed < self.cycle_count {
                self.variables[v].last_relaxed = self.cycle_count;
                self.relax_variable(v);
                if !self.relaxing_violation {
                    self.clear_violations_touching(v);
                }
            }
        }
        self.relaxing = false;
    }

    fn add_linked_vars(&self, var: VarKey, agenda: &mut Vec<VarKey>, visited: &mut BTreeSet<VarKey>) {
        for &(ck, _) in &self.variables[var].constraints {
            let Some(c) = self.constraints.get(ck) else {
                continue;
            };
            if !c.is_active() {
                continue;
            }
            for &v in c.modified_variables(var) {
                if v == var || visited.contains(&v) {
                    continue;
                }
                let reached = &self.variables[v];
                // a specified variable will not move under relaxation
                if !reached.is_specified() && reached.last_relaxed < self.cycle_count {
                    visited.insert(v);
                    agenda.push(v);
                }
            }
        }
    }

    fn clear_violations_touching(&mut self, var: VarKey) {
        if self.violations.violation_count() == 0 {
            return;
        }
        let adjacent: Vec<ConstraintKey> =
            self.variables[var].constraints.iter().map(|&(c, _)| c).collect();
        for c in adjacent {
            if self.violations.is_violated(c) {
                self.clear_violated(c);
            }
        }
    }

    /// Relaxes the current domain to the specified singleton or the base.
    pub(crate) fn relax_variable(&mut self, var: VarKey) {
        let target = self.variables[var].relaxation_target();
        let outcome = self.variables[var].current.relax_to(&target);
        match outcome {
            Ok(Some(ev)) => self.route_event(var, ev),
            Ok(None) => {}
            Err(_) => {
                // current escaped the target (stale specification); re-seed it
                if let Some(ev) = self.variables[var].current.reset_to(&target) {
                    self.route_event(var, ev);
                }
            }
        }
    }

    pub(crate) fn relax_empty_variables(&mut self) {
        if self.violations.relaxing {
            return;
        }
        self.violations.relaxing = true;
        while let Some(v) = self.violations.pop_empty_variable() {
            if self.variables.contains(v) {
                tracing::debug!(var = %v, "relaxing empty variable");
                self.relax_variable(v);
            }
        }
        self.violations.relaxing = false;
    }

    fn increment_cycle(&mut self) {
        self.cycle_count += 1;
        if !self.relaxed.is_empty() {
            self.most_recent_repropagation = self.cycle_count;
        }
    }

    // ----- violation transitions -----

    pub(crate) fn mark_violated(&mut self, c: ConstraintKey) {
        if self.violations.is_violated(c) {
            return;
        }
        tracing::debug!(constraint = %c, "constraint violated");
        self.violations.add_violated(c);
        self.deactivate_constraint(c);
        self.publish(|l| l.notify_violation_added(c));
    }

    pub(crate) fn clear_violated(&mut self, c: ConstraintKey) {
        if self.violations.remove_violated(c) {
            self.undo_constraint_deactivation(c);
            self.publish(|l| l.notify_violation_removed(c));
        }
    }

    /// Marks a constraint as violated on behalf of a propagator that detected
    /// the inconsistency itself.
    pub fn notify_constraint_violated(&mut self, c: ConstraintKey) {
        self.mark_violated(c);
    }

    /// Records a variable as emptied without mutating its domain (the
    /// emptiness was established in a propagator-private structure).
    pub fn note_variable_emptied(&mut self, v: VarKey) {
        self.violations.add_empty_variable(v);
    }

    pub(crate) fn deactivate_constraint(&mut self, c: ConstraintKey) {
        let con = &mut self.constraints[c];
        con.deactivation_ref_count += 1;
        if con.deactivation_ref_count == 1 {
            self.pending.push_back(Pending::ConstraintDeactivated(c));
            self.publish(|l| l.notify_constraint_deactivated(c));
        }
    }

    pub(crate) fn undo_constraint_deactivation(&mut self, c: ConstraintKey) {
        let con = &mut self.constraints[c];
        // a redundant constraint stays deactivated
        if con.is_redundant {
            return;
        }
        debug_assert!(con.deactivation_ref_count > 0);
        con.deactivation_ref_count -= 1;
        if con.is_active() {
            self.pending.push_back(Pending::ConstraintActivated(c));
            self.publish(|l| l.notify_constraint_activated(c));
        }
    }

    // ----- constraint execution & domain mutation helpers -----

    pub(crate) fn execute_constraint(&mut self, ck: ConstraintKey) {
        let (rule, scope) = {
            let c = &self.constraints[ck];
            debug_assert!(c.is_active());
            (c.rule, c.scope.clone())
        };
        self.publish(|l| l.notify_constraint_executed(ck));
        for &v in &scope {
            self.variables[v].propagating_constraint = Some(ck);
        }
        rule.execute(self, &scope);
        for &v in &scope {
            if let Some(var) = self.variables.get_mut(v) {
                var.propagating_constraint = None;
            }
        }
    }

    /// Tags domain changes of `v` with the constraint they originate from, for
    /// violation attribution by propagators that narrow variables directly.
    pub fn set_propagating_constraint(&mut self, v: VarKey, c: Option<ConstraintKey>) {
        self.variables[v].propagating_constraint = c;
    }

    pub(crate) fn apply_domain(&mut self, v: VarKey, new: Domain, ev: Option<DomainEvent>) {
        self.variables[v].current = new;
        if let Some(ev) = ev {
            self.route_event(v, ev);
        }
    }

    /// Narrows the current domain of a numeric variable to `[lo, hi]`.
    /// Returns true iff anything changed.
    pub fn restrict_bounds(&mut self, v: VarKey, lo: f64, hi: f64) -> bool {
        let mut d = self.variables[v].current.clone();
        match d.intersect_bounds(lo, hi) {
            Ok(ev) => {
                let changed = ev.is_some();
                self.apply_domain(v, d, ev);
                changed
            }
            Err(_) => {
                debug_assert!(false, "bounds restriction on a symbolic domain");
                false
            }
        }
    }

    /// Integer-exact variant of [Cnet::restrict_bounds].
    pub fn restrict_int_bounds(&mut self, v: VarKey, lb: i64, ub: i64) -> bool {
        let mut d = self.variables[v].current.clone();
        match d.intersect_int_bounds(lb, ub) {
            Ok(ev) => {
                let changed = ev.is_some();
                self.apply_domain(v, d, ev);
                changed
            }
            Err(_) => {
                debug_assert!(false, "bounds restriction on a symbolic domain");
                false
            }
        }
    }

    /// Narrows the current domain of `v` by intersection with `other`.
    pub fn intersect_current(&mut self, v: VarKey, other: &Domain) -> Result<bool, Error> {
        let mut d = self.variables[v].current.clone();
        let ev = d.intersect(other)?;
        let changed = ev.is_some();
        self.apply_domain(v, d, ev);
        Ok(changed)
    }

    pub fn remove_value(&mut self, v: VarKey, val: Val) -> bool {
        let mut d = self.variables[v].current.clone();
        let ev = d.remove(val);
        let changed = ev.is_some();
        self.apply_domain(v, d, ev);
        changed
    }

    /// Forces the current domain of `v` empty (used by propagators to signal
    /// an inconsistency discovered in their own structures).
    pub fn empty_current(&mut self, v: VarKey) {
        let mut d = self.variables[v].current.clone();
        let ev = d.empty();
        self.apply_domain(v, d, Some(ev));
    }

    pub(crate) fn equate_pair(&mut self, x: VarKey, y: VarKey) {
        let mut a = self.variables[x].current.clone();
        let mut b = self.variables[y].current.clone();
        match Domain::equate(&mut a, &mut b) {
            Ok((ev_a, ev_b)) => {
                self.apply_domain(x, a, ev_a);
                self.apply_domain(y, b, ev_b);
            }
            Err(_) => debug_assert!(false, "equate over incomparable scope"),
        }
    }

    /// Structural validity of a variable: the current domain stays within the
    /// base (or is empty), and every adjacency entry matches the constraint's
    /// declared scope position.
    pub fn validate_variable(&self, v: VarKey) -> bool {
        let Some(var) = self.variables.get(v) else {
            return false;
        };
        if !var.current.is_empty() && !var.current.is_subset_of(&var.base) {
            return false;
        }
        var.constraints.iter().all(|&(ck, idx)| {
            self.constraints
                .get(ck)
                .is_some_and(|c| c.scope.get(idx) == Some(&v))
        })
    }

    /// Re-evaluates redundancy after a base-domain restriction.
    pub(crate) fn notify_base_domain_restricted(&mut self, ck: ConstraintKey) {
        let c = &self.constraints[ck];
        if c.is_redundant {
            return;
        }
        let redundant = c.scope.iter().all(|&v| {
            let base = &self.variables[v].base;
            base.is_closed() && base.is_singleton()
        });
        if redundant {
            let c = &mut self.constraints[ck];
            c.is_redundant = true;
            self.redundant.insert(ck);
            if self.constraints[ck].is_active() {
                // make sure it is propagated once before being retired
                self.pending.push_back(Pending::ConstraintActivated(ck));
            }
        }
    }
}

struct PropagatorEntry {
    name: String,
    enabled: bool,
    prop: Box<dyn Propagator>,
}

type PostPropagationCallback = Box<dyn FnMut(&mut Cnet) -> bool>;

/// The engine: network state plus the propagators that narrow it.
pub struct ConstraintEngine {
    cnet: Cnet,
    propagators: Vec<PropagatorEntry>,
    callbacks: Vec<PostPropagationCallback>,
    config: EngineConfig,
    prop_in_progress: bool,
    purged: bool,
}

impl Default for ConstraintEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut cnet = Cnet::new();
        cnet.violations.set_max_violations_allowed(config.max_violations);
        let mut engine = ConstraintEngine {
            cnet,
            propagators: Vec::new(),
            callbacks: Vec::new(),
            config,
            prop_in_progress: false,
            purged: false,
        };
        engine.register_propagator("default", Box::new(DefaultPropagator::new()));
        engine.register_propagator("temporal", Box::new(TemporalPropagator::new()));
        engine
    }

    /// Registers (or replaces) a named propagator. Execution order is
    /// registration order; replacement keeps the position.
    pub fn register_propagator(&mut self, name: &str, prop: Box<dyn Propagator>) {
        if let Some(entry) = self.propagators.iter_mut().find(|e| e.name == name) {
            tracing::warn!(name, "overwriting propagator");
            entry.prop = prop;
        } else {
            self.propagators.push(PropagatorEntry {
                name: name.to_string(),
                enabled: true,
                prop,
            });
        }
    }

    pub fn set_propagator_enabled(&mut self, name: &str, enabled: bool) {
        if let Some(entry) = self.propagators.iter_mut().find(|e| e.name == name) {
            entry.enabled = enabled;
        }
    }

    fn propagator_index(&self, name: &str) -> Option<usize> {
        self.propagators.iter().position(|e| e.name == name)
    }

    // ----- accessors -----

    pub fn cnet(&self) -> &Cnet {
        &self.cnet
    }

    pub fn variable(&self, v: VarKey) -> &Variable {
        self.cnet.variable(v)
    }

    pub fn current_domain(&self, v: VarKey) -> &Domain {
        self.cnet.current_domain(v)
    }

    pub fn constraint(&self, c: ConstraintKey) -> &Constraint {
        self.cnet.constraint(c)
    }

    pub fn variable_count(&self) -> usize {
        self.cnet.variables.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.cnet.constraints.len()
    }

    pub fn propagator_count(&self) -> usize {
        self.propagators.len()
    }

    pub fn cycle_count(&self) -> u64 {
        self.cnet.cycle_count
    }

    pub fn most_recent_repropagation(&self) -> u64 {
        self.cnet.most_recent_repropagation
    }

    pub fn is_propagating(&self) -> bool {
        self.prop_in_progress
    }

    pub fn proven_inconsistent(&self) -> bool {
        self.cnet.proven_inconsistent()
    }

    pub fn constraint_consistent(&self) -> bool {
        !self.cnet.proven_inconsistent() && self.next_required().is_none()
    }

    pub fn pending(&self) -> bool {
        if !self.cnet.dirty {
            return false;
        }
        let relaxed = self.cnet.relaxed.iter().any(|&v| {
            self.cnet.variables[v]
                .constraints
                .iter()
                .any(|&(c, _)| self.cnet.constraints.get(c).is_some_and(|c| c.is_active()))
        });
        relaxed || (!self.proven_inconsistent() && !self.constraint_consistent())
    }

    pub fn consistency(&self) -> Consistency {
        if self.proven_inconsistent() {
            Consistency::ProvenInconsistent
        } else if self.pending() {
            Consistency::Pending
        } else {
            Consistency::ConstraintConsistent
        }
    }

    pub fn intern(&mut self, text: &str) -> SymId {
        self.cnet.intern(text)
    }

    // ----- configuration -----

    pub fn auto_propagation(&self) -> bool {
        self.config.auto_propagate
    }

    pub fn set_auto_propagation(&mut self, on: bool) {
        if on != self.config.auto_propagate {
            self.config.auto_propagate = on;
            self.maybe_propagate();
        }
    }

    pub fn allow_violations(&self) -> bool {
        self.cnet.allow_violations()
    }

    /// Relaxed mode with an effectively unbounded budget, or strict mode.
    pub fn set_allow_violations(&mut self, allow: bool) {
        let max = if allow { u32::MAX } else { 0 };
        self.cnet.violations.set_max_violations_allowed(max);
    }

    pub fn set_max_violations_allowed(&mut self, max: u32) {
        self.cnet.violations.set_max_violations_allowed(max);
    }

    // ----- violations -----

    pub fn is_violated(&self, c: ConstraintKey) -> bool {
        self.cnet.violations.is_violated(c)
    }

    pub fn violated_constraints(&self) -> Vec<ConstraintKey> {
        self.cnet.violations.violated().collect()
    }

    /// Aggregate violation metric: one unit per violated constraint, with a
    /// floor of 1.0 whenever an empty variable alone caused the state.
    pub fn violation(&self) -> f64 {
        let total: f64 = self.cnet.violations.violated().map(|_| 1.0).sum();
        if total == 0.0 && self.cnet.violations.has_empty_variables() {
            1.0
        } else {
            total
        }
    }

    pub fn violation_expl(&self) -> Vec<String> {
        self.cnet
            .violations
            .violated()
            .map(|c| self.describe_constraint(c))
            .collect()
    }

    fn describe_constraint(&self, ck: ConstraintKey) -> String {
        let c = &self.cnet.constraints[ck];
        let args = c
            .scope
            .iter()
            .map(|&v| {
                let var = &self.cnet.variables[v];
                if var.name.is_empty() {
                    var.current.to_string()
                } else {
                    var.name.clone()
                }
            })
            .join(",");
        format!("{}({})", c.name, args)
    }

    // ----- listeners & callbacks -----

    pub fn add_listener(&mut self, listener: Box<dyn EngineListener>) -> ListenerHandle {
        let key = self.cnet.listeners.borrow_mut().add_engine_listener(listener);
        ListenerHandle::new(&self.cnet.listeners, key)
    }

    pub fn add_domain_listener(
        &mut self,
        var: VarKey,
        listener: Box<dyn DomainListener>,
    ) -> ListenerHandle {
        let key = self.cnet.listeners.borrow_mut().add_domain_listener(var, listener);
        ListenerHandle::new(&self.cnet.listeners, key)
    }

    /// Registers a callback run after each quiescent propagation pass; a
    /// `true` return forces another pass.
    pub fn add_post_propagation_callback(&mut self, cb: PostPropagationCallback) {
        self.callbacks.push(cb);
    }

    // ----- variables -----

    pub fn new_variable(&mut self, name: &str, base: Domain) -> Result<VarKey, Error> {
        self.new_variable_full(name, base, true, false, None, 0)
    }

    pub fn new_variable_full(
        &mut self,
        name: &str,
        base: Domain,
        can_be_specified: bool,
        internal: bool,
        parent: Option<u32>,
        index: usize,
    ) -> Result<VarKey, Error> {
        self.check_mutable()?;
        let mut var = Variable::new(name.to_string(), base, can_be_specified, internal);
        var.parent = parent;
        var.index = index;
        let vk = self.cnet.variables.push(var);
        self.cnet.publish(|l| l.notify_variable_added(vk));
        Ok(vk)
    }

    pub fn remove_variable(&mut self, v: VarKey) -> Result<(), Error> {
        self.check_mutable()?;
        let var = self
            .cnet
            .variables
            .get_mut(v)
            .ok_or(Error::InvalidOperation("unknown variable"))?;
        if !var.constraints.is_empty() {
            return Err(Error::InvalidOperation("variable still has attached constraints"));
        }
        var.deleted = true;
        self.cnet.relaxed.remove(&v);
        self.cnet.violations.remove_empty_variable(v);
        self.cnet.listeners.borrow_mut().forget_variable(v);
        self.cnet.publish(|l| l.notify_variable_removed(v));
        self.cnet.variables.remove(v);
        Ok(())
    }

    /// Specifies the variable to a single member value. Idempotent when the
    /// value is already specified; empties the current domain when the value
    /// fell outside it.
    pub fn specify(&mut self, v: VarKey, val: Val) -> Result<(), Error> {
        self.check_mutable()?;
        let var = self
            .cnet
            .variables
            .get_mut(v)
            .ok_or(Error::InvalidOperation("unknown variable"))?;
        if !var.can_be_specified {
            return Err(Error::InvalidOperation("variable cannot be specified"));
        }
        if var.specified == Some(val) {
            return Ok(());
        }
        if !var.base.is_member(val) {
            return Err(Error::InvalidOperation("specified value outside the base domain"));
        }
        var.specified = Some(val);
        let ev = var.current.set(val)?;
        self.cnet.route_event(v, ev);
        self.maybe_propagate();
        Ok(())
    }

    /// Clears the specification and relaxes the current domain back to base.
    pub fn reset(&mut self, v: VarKey) -> Result<(), Error> {
        self.check_mutable()?;
        let var = self
            .cnet
            .variables
            .get_mut(v)
            .ok_or(Error::InvalidOperation("unknown variable"))?;
        var.specified = None;
        let base = var.base.clone();
        if let Some(ev) = var.current.reset_to(&base) {
            self.cnet.route_event(v, ev);
        }
        self.maybe_propagate();
        Ok(())
    }

    /// Permanently narrows the base domain. A singleton restriction of an
    /// unspecified variable turns into a specification.
    pub fn restrict_base_domain(&mut self, v: VarKey, d: &Domain) -> Result<(), Error> {
        self.check_mutable()?;
        {
            let var = self
                .cnet
                .variables
                .get(v)
                .ok_or(Error::InvalidOperation("unknown variable"))?;
            if !var.is_active() {
                return Err(Error::InvalidOperation("restriction of an inactive variable"));
            }
            if !var.base.intersects(d) {
                return Err(Error::InvalidOperation("restriction disjoint from the base domain"));
            }
            if var.base.is_subset_of(d) && (var.base.is_closed() || d.is_open()) {
                return Ok(()); // already at least as restricted
            }
        }
        let var = &mut self.cnet.variables[v];
        var.base.intersect(d)?;
        // keep current within the narrowed base
        let mut cur = var.current.clone();
        let ev = cur.intersect(d)?;
        self.cnet.apply_domain(v, cur, ev);

        let (auto_specify, singleton) = {
            let var = &self.cnet.variables[v];
            (
                d.is_singleton() && !var.is_specified() && var.can_be_specified,
                d.singleton(),
            )
        };
        if let (true, Some(val)) = (auto_specify, singleton) {
            self.specify(v, val)?;
        }

        // status change notification, even without an actual narrowing
        self.cnet.route_event(v, DomainEvent::BoundsRestricted);
        let adjacent: Vec<ConstraintKey> =
            self.cnet.variables[v].constraints.iter().map(|&(c, _)| c).collect();
        for ck in adjacent {
            self.cnet.notify_base_domain_restricted(ck);
        }
        self.maybe_propagate();
        Ok(())
    }

    /// Relaxes the current domain to the specified singleton or the base.
    pub fn relax_variable(&mut self, v: VarKey) -> Result<(), Error> {
        self.check_mutable()?;
        if !self.cnet.variables.contains(v) {
            return Err(Error::InvalidOperation("unknown variable"));
        }
        self.cnet.relax_variable(v);
        self.maybe_propagate();
        Ok(())
    }

    /// Re-triggers propagation through this variable without changing it.
    pub fn touch(&mut self, v: VarKey) -> Result<(), Error> {
        self.check_mutable()?;
        if !self.cnet.variables.contains(v) {
            return Err(Error::InvalidOperation("unknown variable"));
        }
        self.cnet.route_event(v, DomainEvent::Reset);
        self.maybe_propagate();
        Ok(())
    }

    pub fn close_domain(&mut self, v: VarKey) -> Result<(), Error> {
        self.check_mutable()?;
        let var = self
            .cnet
            .variables
            .get_mut(v)
            .ok_or(Error::InvalidOperation("unknown variable"))?;
        if var.base.is_open() {
            var.base.close()?;
        }
        let (closed, emptied) = var.current.close()?;
        self.cnet.route_event(v, closed);
        if let Some(ev) = emptied {
            self.cnet.route_event(v, ev);
        }
        self.maybe_propagate();
        Ok(())
    }

    pub fn open_domain(&mut self, v: VarKey) -> Result<(), Error> {
        self.check_mutable()?;
        let var = self
            .cnet
            .variables
            .get_mut(v)
            .ok_or(Error::InvalidOperation("unknown variable"))?;
        if var.base.is_closed() {
            var.base.open()?;
        }
        let ev = var.current.open()?;
        self.cnet.route_event(v, ev);
        Ok(())
    }

    pub fn insert_value(&mut self, v: VarKey, val: Val) -> Result<(), Error> {
        self.check_mutable()?;
        let var = self
            .cnet
            .variables
            .get_mut(v)
            .ok_or(Error::InvalidOperation("unknown variable"))?;
        var.base.insert(val)?;
        if let Some(ev) = var.current.insert(val)? {
            self.cnet.route_event(v, ev);
        }
        Ok(())
    }

    pub fn remove_value(&mut self, v: VarKey, val: Val) -> Result<(), Error> {
        self.check_mutable()?;
        if !self.cnet.variables.contains(v) {
            return Err(Error::InvalidOperation("unknown variable"));
        }
        self.cnet.remove_value(v, val);
        self.maybe_propagate();
        Ok(())
    }

    pub fn deactivate_variable(&mut self, v: VarKey) -> Result<(), Error> {
        self.check_mutable()?;
        let var = self
            .cnet
            .variables
            .get_mut(v)
            .ok_or(Error::InvalidOperation("unknown variable"))?;
        var.deactivation_ref_count += 1;
        if var.deactivation_ref_count == 1 {
            let adjacent: Vec<ConstraintKey> = var.constraints.iter().map(|&(c, _)| c).collect();
            for ck in adjacent {
                self.cnet.deactivate_constraint(ck);
            }
            self.cnet.pending.push_back(Pending::VariableDeactivated(v));
            self.cnet.publish(|l| l.notify_variable_deactivated(v));
        }
        Ok(())
    }

    pub fn activate_variable(&mut self, v: VarKey) -> Result<(), Error> {
        self.check_mutable()?;
        let var = self
            .cnet
            .variables
            .get_mut(v)
            .ok_or(Error::InvalidOperation("unknown variable"))?;
        if var.deactivation_ref_count == 0 {
            return Err(Error::InvalidOperation("variable is already active"));
        }
        var.deactivation_ref_count -= 1;
        if var.deactivation_ref_count == 0 {
            let adjacent: Vec<ConstraintKey> = var.constraints.iter().map(|&(c, _)| c).collect();
            for ck in adjacent {
                self.cnet.undo_constraint_deactivation(ck);
            }
            self.cnet.pending.push_back(Pending::VariableActivated(v));
            self.cnet.publish(|l| l.notify_variable_activated(v));
        }
        Ok(())
    }

    // ----- constraints -----

    /// Creates a constraint by public name over the given scope, registering
    /// it with the propagator the rule belongs to.
    pub fn create_constraint(&mut self, name: &str, scope: &[VarKey]) -> Result<ConstraintKey, Error> {
        self.check_mutable()?;
        let rule = Rule::from_name(name).ok_or_else(|| Error::UnknownType(name.to_string()))?;
        if scope.len() != rule.arity() {
            return Err(Error::TypeMismatch("wrong number of constraint arguments"));
        }
        for &v in scope {
            if !self.cnet.variables.contains(v) {
                return Err(Error::InvalidOperation("unknown variable in scope"));
            }
        }
        self.check_scope_types(rule, scope)?;
        let pi = self
            .propagator_index(rule.propagator_name())
            .ok_or_else(|| Error::UnknownType(rule.propagator_name().to_string()))?;

        let non_singletons = scope
            .iter()
            .filter(|&&v| !self.cnet.variables[v].base.is_singleton())
            .count();
        let inactive_args = scope
            .iter()
            .filter(|&&v| !self.cnet.variables[v].is_active())
            .count() as u32;

        let ck = self.cnet.constraints.push(Constraint {
            name: name.to_string(),
            rule,
            scope: scope.iter().copied().collect(),
            propagator: pi,
            deactivation_ref_count: inactive_args,
            is_unary: non_singletons <= 1,
            is_redundant: false,
        });
        for (i, &v) in scope.iter().enumerate() {
            self.cnet.variables[v].add_constraint(ck, i);
        }
        self.propagators[pi].prop.handle_constraint_added(ck, &self.cnet);
        self.cnet.publish(|l| l.notify_constraint_added(ck));
        tracing::debug!(constraint = %ck, name, "constraint created");

        self.cnet.notify_base_domain_restricted(ck);
        if !self.cnet.constraints[ck].is_active() {
            self.cnet.pending.push_back(Pending::ConstraintDeactivated(ck));
            self.cnet.publish(|l| l.notify_constraint_deactivated(ck));
        }
        self.maybe_propagate();
        Ok(ck)
    }

    fn check_scope_types(&self, rule: Rule, scope: &[VarKey]) -> Result<(), Error> {
        match rule {
            Rule::Eq | Rule::Neq => {
                let a = &self.cnet.variables[scope[0]].current;
                let b = &self.cnet.variables[scope[1]].current;
                if !a.can_be_compared(b) {
                    return Err(Error::TypeMismatch("incomparable equality scope"));
                }
            }
            Rule::Leq | Rule::AddEq => {
                for &v in scope {
                    if !self.cnet.variables[v].current.is_numeric() {
                        return Err(Error::TypeMismatch("numeric constraint over symbolic scope"));
                    }
                }
            }
            Rule::TemporalDistance | Rule::Precedes | Rule::Concurrent => {
                for &v in scope {
                    if !matches!(self.cnet.variables[v].current, Domain::IntInterval(_)) {
                        return Err(Error::TypeMismatch("temporal constraint over non-integer scope"));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn remove_constraint(&mut self, ck: ConstraintKey) -> Result<(), Error> {
        self.check_mutable()?;
        if !self.cnet.constraints.contains(ck) {
            return Err(Error::InvalidOperation("unknown constraint"));
        }
        self.cnet.redundant.remove(&ck);
        let (pi, scope, was_active) = {
            let c = &self.cnet.constraints[ck];
            (c.propagator, c.scope.clone(), c.is_active())
        };
        self.propagators[pi].prop.handle_constraint_removed(ck, &self.cnet);

        // detach before relaxing so the cascade does not run back through the
        // dying constraint
        for (i, &v) in scope.iter().enumerate() {
            self.cnet.variables[v].remove_constraint(ck, i);
        }
        if self.cnet.violations.remove_violated(ck) {
            self.cnet.publish(|l| l.notify_violation_removed(ck));
        }
        self.cnet.publish(|l| l.notify_constraint_removed(ck));
        self.cnet.constraints.remove(ck);

        if was_active {
            for &v in &scope {
                if self.cnet.variables[v].last_relaxed < self.cnet.cycle_count {
                    self.cnet.relax_variable(v);
                }
            }
        }
        self.maybe_propagate();
        Ok(())
    }

    pub fn deactivate_constraint(&mut self, ck: ConstraintKey) -> Result<(), Error> {
        self.check_mutable()?;
        if !self.cnet.constraints.contains(ck) {
            return Err(Error::InvalidOperation("unknown constraint"));
        }
        self.cnet.deactivate_constraint(ck);
        Ok(())
    }

    pub fn undo_constraint_deactivation(&mut self, ck: ConstraintKey) -> Result<(), Error> {
        self.check_mutable()?;
        if !self.cnet.constraints.contains(ck) {
            return Err(Error::InvalidOperation("unknown constraint"));
        }
        self.cnet.undo_constraint_deactivation(ck);
        Ok(())
    }

    // ----- propagation -----

    /// Propagates to quiescence. In relaxed mode, inconsistent passes relax
    /// the emptied variables and re-enter until consistent or the violation
    /// budget is exhausted. Returns true iff the network is consistent.
    pub fn propagate(&mut self) -> bool {
        loop {
            let result = self.do_propagate();
            if !result && self.cnet.violations.can_continue() {
                self.cnet.relaxing_violation = true;
                self.cnet.relax_empty_variables();
                self.cnet.relaxing_violation = false;
            } else {
                return result;
            }
        }
    }

    fn do_propagate(&mut self) -> bool {
        debug_assert!(!self.cnet.is_purging(), "propagation while purging");
        if self.prop_in_progress {
            debug_assert!(false, "re-entrant propagation");
            return !self.proven_inconsistent();
        }
        if !self.cnet.dirty {
            return true;
        }
        tracing::debug!(cycle = self.cnet.cycle_count, "propagation starting");

        if self.cnet.violations.has_empty_variables() {
            self.cnet.relax_empty_variables();
        }
        // an empty variable surviving relaxation (empty base domains and the
        // like) is terminal for this pass
        if self.cnet.violations.has_empty_variables() {
            return false;
        }

        self.cnet.relaxed.clear();
        let mut started = false;
        let mut continue_prop = true;

        while continue_prop {
            self.cnet.increment_cycle();
            self.prop_in_progress = true;

            loop {
                self.drain_events();
                if self.cnet.proven_inconsistent() {
                    break;
                }
                let Some(i) = self.next_required() else {
                    break;
                };
                if !started {
                    started = true;
                    self.cnet.publish(|l| l.notify_propagation_commenced());
                }
                tracing::trace!(propagator = %self.propagators[i].name, "executing propagator");
                self.propagators[i].prop.execute(&mut self.cnet);
            }

            continue_prop = false;
            self.prop_in_progress = false;
            self.cnet.increment_cycle();

            // callbacks must not re-enter propagation
            let old_auto = self.config.auto_propagate;
            self.config.auto_propagate = false;
            let mut callbacks = std::mem::take(&mut self.callbacks);
            for cb in callbacks.iter_mut() {
                continue_prop |= cb(&mut self.cnet);
            }
            self.callbacks = callbacks;
            self.config.auto_propagate = old_auto;
        }

        let result = self.constraint_consistent();
        if result && started {
            self.cnet.publish(|l| l.notify_propagation_completed());
            self.cnet.dirty = false;
            self.process_redundant_constraints();
            tracing::debug!("propagation completed");
        } else if !result && started {
            self.cnet.publish(|l| l.notify_propagation_preempted());
            tracing::debug!("propagation preempted");
        }
        self.cnet.relaxed.clear();
        result
    }

    fn next_required(&self) -> Option<usize> {
        self.propagators
            .iter()
            .position(|e| e.enabled && e.prop.update_required())
    }

    /// Dispatches buffered notifications to propagator agendas, in order.
    fn drain_events(&mut self) {
        while let Some(p) = self.cnet.pending.pop_front() {
            match p {
                Pending::DomainChange(v, ev) => {
                    if ev == DomainEvent::Emptied {
                        continue; // over-ruled; propagators never see it
                    }
                    let adjacency: Vec<(ConstraintKey, usize)> = match self.cnet.variables.get(v) {
                        Some(var) => var.constraints.clone(),
                        None => continue,
                    };
                    for (ck, idx) in adjacency {
                        let Some(c) = self.cnet.constraints.get(ck) else {
                            continue;
                        };
                        if !c.is_active() || c.rule.can_ignore(idx, ev) {
                            continue;
                        }
                        let pi = c.propagator;
                        self.propagators[pi].prop.handle_notification(v, idx, ck, ev);
                    }
                }
                Pending::ConstraintActivated(ck) => {
                    let Some(c) = self.cnet.constraints.get(ck) else {
                        continue;
                    };
                    let pi = c.propagator;
                    self.propagators[pi].prop.handle_constraint_activated(ck, &self.cnet);
                }
                Pending::ConstraintDeactivated(ck) => {
                    let Some(c) = self.cnet.constraints.get(ck) else {
                        continue;
                    };
                    let pi = c.propagator;
                    self.propagators[pi]
                        .prop
                        .handle_constraint_deactivated(ck, &self.cnet);
                }
                Pending::VariableActivated(v) => {
                    for entry in self.propagators.iter_mut() {
                        entry.prop.handle_variable_activated(v);
                    }
                }
                Pending::VariableDeactivated(v) => {
                    for entry in self.propagators.iter_mut() {
                        entry.prop.handle_variable_deactivated(v);
                    }
                }
            }
        }
    }

    /// Once quiescent, constraints whose arguments are all fixed can be
    /// retired from the agenda for good.
    fn process_redundant_constraints(&mut self) {
        let redundant = std::mem::take(&mut self.cnet.redundant);
        for ck in redundant {
            if self.cnet.constraints.contains(ck) && self.cnet.constraints[ck].is_redundant {
                self.cnet.deactivate_constraint(ck);
            }
        }
        self.drain_events();
    }

    fn maybe_propagate(&mut self) {
        if self.config.auto_propagate && !self.prop_in_progress && self.cnet.dirty {
            self.propagate();
        }
    }

    fn check_mutable(&self) -> Result<(), Error> {
        if self.prop_in_progress {
            return Err(Error::InvalidOperation("mutation while propagation is in progress"));
        }
        if self.purged {
            return Err(Error::InvalidOperation("engine has been purged"));
        }
        Ok(())
    }

    // ----- teardown -----

    /// Full teardown: constraints, then variables, then propagators. No
    /// notifications are published while purging and cross-removals are
    /// short-circuited.
    pub fn purge(&mut self) {
        self.cnet.phase = Phase::Purging;
        let constraints: Vec<ConstraintKey> = self.cnet.constraints.keys().collect();
        for ck in constraints {
            self.cnet.constraints.remove(ck);
        }
        self.cnet.redundant.clear();

        let variables: Vec<VarKey> = self.cnet.variables.keys().collect();
        for vk in variables {
            if let Some(var) = self.cnet.variables.get_mut(vk) {
                var.deleted = true;
            }
            self.cnet.variables.remove(vk);
        }

        self.cnet.relaxed.clear();
        self.cnet.pending.clear();
        self.cnet.violations.clear_empty_variables();
        let violated: Vec<ConstraintKey> = self.cnet.violations.violated().collect();
        for c in violated {
            self.cnet.violations.remove_violated(c);
        }
        self.propagators.clear();
        self.callbacks.clear();
        self.purged = true;
    }

    // ----- planner-facing temporal queries -----

    /// Approximate precedence test: last-propagated bounds first, then a
    /// reachability probe in the distance graph.
    pub fn can_precede(&mut self, a: VarKey, b: VarKey) -> bool {
        self.propagate();
        let (cnet, tp) = self.temporal_parts();
        tp.can_precede(a, b, cnet)
    }

    /// Exact test that the distance between the two timepoints admits zero.
    pub fn can_be_concurrent(&mut self, a: VarKey, b: VarKey) -> bool {
        self.propagate();
        let (cnet, tp) = self.temporal_parts();
        tp.can_be_concurrent(a, b, cnet)
    }

    /// Combined precedence and minimal-duration test for insertion between a
    /// predecessor and successor.
    pub fn can_fit_between(
        &mut self,
        start: VarKey,
        end: VarKey,
        pred_end: VarKey,
        succ_start: VarKey,
    ) -> bool {
        self.propagate();
        let (cnet, tp) = self.temporal_parts();
        tp.can_fit_between(start, end, pred_end, succ_start, cnet)
    }

    /// The domain of `b - a`; exact (two Dijkstras) or approximate (direct
    /// edges only).
    pub fn temporal_distance_domain(&mut self, a: VarKey, b: VarKey, exact: bool) -> Domain {
        self.propagate();
        let (cnet, tp) = self.temporal_parts();
        tp.temporal_distance_domain(a, b, exact, cnet)
    }

    /// Batched exact variant of [ConstraintEngine::temporal_distance_domain].
    pub fn temporal_distance_domains(&mut self, a: VarKey, bs: &[VarKey]) -> Vec<Domain> {
        self.propagate();
        let (cnet, tp) = self.temporal_parts();
        tp.temporal_distance_domains(a, bs, cnet)
    }

    /// New reference times minimizing perturbation from the old ones, in order.
    pub fn min_perturb_times(&mut self, vars: &[VarKey], old_reftimes: &[i64]) -> Vec<i64> {
        self.propagate();
        let (cnet, tp) = self.temporal_parts();
        tp.min_perturb_times(vars, old_reftimes, cnet)
    }

    fn temporal_parts(&mut self) -> (&Cnet, &mut TemporalPropagator) {
        let i = self.propagator_index("temporal").expect("temporal propagator registered");
        let tp = self.propagators[i]
            .prop
            .as_any_mut()
            .downcast_mut::<TemporalPropagator>()
            .expect("temporal propagator type");
        (&self.cnet, tp)
    }
}
