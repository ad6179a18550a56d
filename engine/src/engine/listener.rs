use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::create_key_type;
use crate::domain::DomainEvent;
use crate::engine::{ConstraintKey, VarKey};

create_key_type!(pub ListenerKey);

/// Subscriber interface for per-variable domain changes.
pub trait DomainListener {
    fn notify_change(&mut self, var: VarKey, change: DomainEvent);
}

/// Subscriber interface for engine-level events. All methods default to no-ops
/// so implementors only override what they observe.
#[allow(unused_variables)]
pub trait EngineListener {
    fn notify_propagation_commenced(&mut self) {}
    fn notify_propagation_completed(&mut self) {}
    fn notify_propagation_preempted(&mut self) {}

    fn notify_constraint_added(&mut self, constraint: ConstraintKey) {}
    fn notify_constraint_removed(&mut self, constraint: ConstraintKey) {}
    fn notify_constraint_activated(&mut self, constraint: ConstraintKey) {}
    fn notify_constraint_deactivated(&mut self, constraint: ConstraintKey) {}
    fn notify_constraint_executed(&mut self, constraint: ConstraintKey) {}

    fn notify_variable_added(&mut self, var: VarKey) {}
    fn notify_variable_removed(&mut self, var: VarKey) {}
    fn notify_variable_activated(&mut self, var: VarKey) {}
    fn notify_variable_deactivated(&mut self, var: VarKey) {}
    fn notify_variable_changed(&mut self, var: VarKey, change: DomainEvent) {}

    fn notify_violation_added(&mut self, constraint: ConstraintKey) {}
    fn notify_violation_removed(&mut self, constraint: ConstraintKey) {}
}

/// The engine's subscription store. The engine holds the owning `Rc`;
/// subscribers hold a [ListenerHandle] that unregisters itself on drop.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next: u32,
    engine_listeners: Vec<(ListenerKey, Box<dyn EngineListener>)>,
    domain_listeners: Vec<(ListenerKey, VarKey, Box<dyn DomainListener>)>,
}

impl ListenerRegistry {
    fn fresh_key(&mut self) -> ListenerKey {
        let k = ListenerKey::from_u32(self.next);
        self.next += 1;
        k
    }

    pub(crate) fn add_engine_listener(&mut self, listener: Box<dyn EngineListener>) -> ListenerKey {
        let k = self.fresh_key();
        self.engine_listeners.push((k, listener));
        k
    }

    pub(crate) fn add_domain_listener(
        &mut self,
        var: VarKey,
        listener: Box<dyn DomainListener>,
    ) -> ListenerKey {
        let k = self.fresh_key();
        self.domain_listeners.push((k, var, listener));
        k
    }

    pub(crate) fn remove(&mut self, key: ListenerKey) {
        self.engine_listeners.retain(|(k, _)| *k != key);
        self.domain_listeners.retain(|(k, _, _)| *k != key);
    }

    /// Delivers an engine-level event to every subscriber, in subscription order.
    pub(crate) fn publish(&mut self, mut event: impl FnMut(&mut dyn EngineListener)) {
        for (_, listener) in self.engine_listeners.iter_mut() {
            event(listener.as_mut());
        }
    }

    /// Delivers a domain change to the engine listeners and to the listeners
    /// attached to this particular variable.
    pub(crate) fn publish_domain_change(&mut self, var: VarKey, change: DomainEvent) {
        for (_, listener) in self.engine_listeners.iter_mut() {
            listener.notify_variable_changed(var, change);
        }
        for (_, v, listener) in self.domain_listeners.iter_mut() {
            if *v == var {
                listener.notify_change(var, change);
            }
        }
    }

    /// Drops subscriptions attached to a removed variable.
    pub(crate) fn forget_variable(&mut self, var: VarKey) {
        self.domain_listeners.retain(|(_, v, _)| *v != var);
    }
}

/// Move-only subscription handle; dropping it unsubscribes the listener.
pub struct ListenerHandle {
    registry: Weak<RefCell<ListenerRegistry>>,
    key: ListenerKey,
}

impl ListenerHandle {
    pub(crate) fn new(registry: &Rc<RefCell<ListenerRegistry>>, key: ListenerKey) -> Self {
        ListenerHandle {
            registry: Rc::downgrade(registry),
            key,
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().remove(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    struct Probe(Rc<RefCell<Vec<VarKey>>>);
    impl EngineListener for Probe {
        fn notify_variable_added(&mut self, var: VarKey) {
            self.0.borrow_mut().push(var);
        }
    }

    #[test]
    fn dropping_the_handle_unsubscribes() {
        let registry = Rc::new(RefCell::new(ListenerRegistry::default()));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let key = registry
            .borrow_mut()
            .add_engine_listener(Box::new(Probe(seen.clone())));
        let handle = ListenerHandle::new(&registry, key);

        let v = VarKey::from(0usize);
        registry.borrow_mut().publish(|l| l.notify_variable_added(v));
        assert_eq!(seen.borrow().len(), 1);

        drop(handle);
        registry.borrow_mut().publish(|l| l.notify_variable_added(v));
        assert_eq!(seen.borrow().len(), 1);
    }
}
