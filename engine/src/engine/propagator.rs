use std::any::Any;
use std::collections::BTreeSet;
use std::collections::VecDeque;

use crate::domain::DomainEvent;
use crate::engine::{Cnet, ConstraintKey, VarKey};

/// A strategy object grouping constraints that share an execution discipline.
///
/// The engine drives propagators in registration order: while any enabled
/// propagator reports [Propagator::update_required], the first such propagator
/// is executed. Notifications arrive between executions, in event order.
pub trait Propagator: Any {
    /// A domain of `var` changed while `constraint` (holding it at
    /// `arg_index`) is active and interested.
    fn handle_notification(
        &mut self,
        var: VarKey,
        arg_index: usize,
        constraint: ConstraintKey,
        change: DomainEvent,
    );

    fn handle_constraint_added(&mut self, constraint: ConstraintKey, cnet: &Cnet);
    fn handle_constraint_removed(&mut self, constraint: ConstraintKey, cnet: &Cnet);
    fn handle_constraint_activated(&mut self, constraint: ConstraintKey, cnet: &Cnet);
    fn handle_constraint_deactivated(&mut self, constraint: ConstraintKey, cnet: &Cnet);
    fn handle_variable_activated(&mut self, var: VarKey);
    fn handle_variable_deactivated(&mut self, var: VarKey);

    /// True while the propagator has pending work.
    fn update_required(&self) -> bool;

    /// Runs the pending work to a local fixpoint, narrowing domains through
    /// `cnet`.
    fn execute(&mut self, cnet: &mut Cnet);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Baseline agenda propagator: runs each pending constraint once per batch, in
/// the order the work arrived.
#[derive(Default)]
pub struct DefaultPropagator {
    agenda: VecDeque<ConstraintKey>,
    queued: BTreeSet<ConstraintKey>,
}

impl DefaultPropagator {
    pub fn new() -> Self {
        Default::default()
    }

    fn enqueue(&mut self, constraint: ConstraintKey) {
        if self.queued.insert(constraint) {
            self.agenda.push_back(constraint);
        }
    }

    fn dequeue(&mut self, constraint: ConstraintKey) {
        if self.queued.remove(&constraint) {
            self.agenda.retain(|&c| c != constraint);
        }
    }
}

impl Propagator for DefaultPropagator {
    fn handle_notification(
        &mut self,
        _var: VarKey,
        _arg_index: usize,
        constraint: ConstraintKey,
        _change: DomainEvent,
    ) {
        self.enqueue(constraint);
    }

    fn handle_constraint_added(&mut self, constraint: ConstraintKey, _cnet: &Cnet) {
        self.enqueue(constraint);
    }

    fn handle_constraint_removed(&mut self, constraint: ConstraintKey, _cnet: &Cnet) {
        self.dequeue(constraint);
    }

    fn handle_constraint_activated(&mut self, constraint: ConstraintKey, _cnet: &Cnet) {
        self.enqueue(constraint);
    }

    fn handle_constraint_deactivated(&mut self, constraint: ConstraintKey, _cnet: &Cnet) {
        self.dequeue(constraint);
    }

    fn handle_variable_activated(&mut self, _var: VarKey) {}

    fn handle_variable_deactivated(&mut self, _var: VarKey) {}

    fn update_required(&self) -> bool {
        !self.agenda.is_empty()
    }

    fn execute(&mut self, cnet: &mut Cnet) {
        while let Some(constraint) = self.agenda.pop_front() {
            self.queued.remove(&constraint);
            // the constraint may have been deactivated or removed since queuing
            let Some(c) = cnet.constraints.get(constraint) else {
                continue;
            };
            if !c.is_active() {
                continue;
            }
            cnet.execute_constraint(constraint);
            if cnet.proven_inconsistent() && !cnet.allow_violations() {
                break;
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
