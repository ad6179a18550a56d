use crate::domain::{Domain, Val};
use crate::engine::{ConstraintKey, VarKey};

/// A constrained variable: the declared envelope (`base`), the optional
/// client-specified member, and the domain propagation operates on (`current`).
///
/// Invariants: `current ⊆ base` modulo openness, unless `current` is empty
/// with a recorded emptying constraint; when specified, `current` is the
/// singleton of the specified value (or empty when the value fell outside).
#[derive(Debug)]
pub struct Variable {
    pub(crate) name: String,
    pub(crate) base: Domain,
    pub(crate) current: Domain,
    pub(crate) specified: Option<Val>,
    pub(crate) can_be_specified: bool,
    pub(crate) internal: bool,
    /// Active iff zero.
    pub(crate) deactivation_ref_count: u32,
    /// Cycle of the most recent relaxation; monotonic.
    pub(crate) last_relaxed: u64,
    /// Adjacency, in `add_constraint` order: (constraint, position in scope).
    pub(crate) constraints: Vec<(ConstraintKey, usize)>,
    /// The constraint currently narrowing this variable; an emptied domain is
    /// attributed to it.
    pub(crate) propagating_constraint: Option<ConstraintKey>,
    /// Set while the variable is being torn down; guards re-entrant removals.
    pub(crate) deleted: bool,
    pub(crate) parent: Option<u32>,
    pub(crate) index: usize,
}

impl Variable {
    pub(crate) fn new(name: String, base: Domain, can_be_specified: bool, internal: bool) -> Self {
        let current = base.clone();
        Variable {
            name,
            base,
            current,
            specified: None,
            can_be_specified,
            internal,
            deactivation_ref_count: 0,
            last_relaxed: 0,
            constraints: Vec::new(),
            propagating_constraint: None,
            deleted: false,
            parent: None,
            index: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_domain(&self) -> &Domain {
        &self.base
    }

    /// The domain propagation last produced.
    pub fn current_domain(&self) -> &Domain {
        &self.current
    }

    pub fn specified_value(&self) -> Option<Val> {
        self.specified
    }

    pub fn is_specified(&self) -> bool {
        self.specified.is_some()
    }

    pub fn can_be_specified(&self) -> bool {
        self.can_be_specified
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn is_active(&self) -> bool {
        self.deactivation_ref_count == 0
    }

    pub fn last_relaxed(&self) -> u64 {
        self.last_relaxed
    }

    pub fn parent(&self) -> Option<u32> {
        self.parent
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Adjacent constraints with their argument positions, in attachment order.
    pub fn constraints(&self) -> &[(ConstraintKey, usize)] {
        &self.constraints
    }

    pub fn propagating_constraint(&self) -> Option<ConstraintKey> {
        self.propagating_constraint
    }

    /// The domain a relaxation restores: the specified singleton when
    /// specified, the base domain otherwise.
    pub(crate) fn relaxation_target(&self) -> Domain {
        match self.specified {
            Some(v) => {
                let mut d = self.base.clone();
                let _ = d.set(v);
                d
            }
            None => self.base.clone(),
        }
    }

    pub(crate) fn add_constraint(&mut self, constraint: ConstraintKey, arg_index: usize) {
        debug_assert!(
            !self.constraints.iter().any(|&(c, i)| c == constraint && i == arg_index),
            "constraint attached twice at the same index"
        );
        self.constraints.push((constraint, arg_index));
    }

    pub(crate) fn remove_constraint(&mut self, constraint: ConstraintKey, arg_index: usize) {
        if self.deleted {
            return; // collection being torn down
        }
        if let Some(pos) = self
            .constraints
            .iter()
            .position(|&(c, i)| c == constraint && i == arg_index)
        {
            self.constraints.remove(pos);
        }
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relaxation_target_honors_specification() {
        let mut v = Variable::new("x".into(), Domain::int_interval(0, 10), true, false);
        assert_eq!(v.relaxation_target(), Domain::int_interval(0, 10));
        v.specified = Some(Val::Int(4));
        assert_eq!(v.relaxation_target(), Domain::int_singleton(4));
    }

    #[test]
    fn adjacency_preserves_attachment_order() {
        let mut v = Variable::new("x".into(), Domain::int_interval(0, 1), true, false);
        let c0 = ConstraintKey::from(0usize);
        let c1 = ConstraintKey::from(1usize);
        v.add_constraint(c1, 0);
        v.add_constraint(c0, 1);
        assert_eq!(v.constraints(), &[(c1, 0), (c0, 1)]);
        v.remove_constraint(c1, 0);
        assert_eq!(v.constraints(), &[(c0, 1)]);
    }
}
