use crate::domain::event::DomainEvent;

/// Domain over the booleans, numerically the range {0, 1}.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoolDomain {
    pub has_false: bool,
    pub has_true: bool,
}

impl BoolDomain {
    pub fn both() -> Self {
        BoolDomain {
            has_false: true,
            has_true: true,
        }
    }

    pub fn singleton(v: bool) -> Self {
        BoolDomain {
            has_false: !v,
            has_true: v,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.has_false && !self.has_true
    }

    pub fn is_singleton(&self) -> bool {
        self.has_false != self.has_true
    }

    pub fn singleton_value(&self) -> Option<bool> {
        if self.is_singleton() {
            Some(self.has_true)
        } else {
            None
        }
    }

    pub fn is_member(&self, v: bool) -> bool {
        if v {
            self.has_true
        } else {
            self.has_false
        }
    }

    pub fn size(&self) -> u64 {
        self.has_false as u64 + self.has_true as u64
    }

    /// Numeric view: lower and upper bound over {0, 1}. None when empty.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match (self.has_false, self.has_true) {
            (true, true) => Some((0, 1)),
            (true, false) => Some((0, 0)),
            (false, true) => Some((1, 1)),
            (false, false) => None,
        }
    }

    pub fn empty(&mut self) -> DomainEvent {
        self.has_false = false;
        self.has_true = false;
        DomainEvent::Emptied
    }

    /// Keeps only members for which `keep` holds.
    pub fn retain(&mut self, keep: impl Fn(bool) -> bool) -> Option<DomainEvent> {
        let drop_false = self.has_false && !keep(false);
        let drop_true = self.has_true && !keep(true);
        if !drop_false && !drop_true {
            return None;
        }
        self.has_false &= !drop_false;
        self.has_true &= !drop_true;
        Some(if self.is_empty() {
            DomainEvent::Emptied
        } else {
            DomainEvent::RestrictToSingleton
        })
    }

    pub fn remove(&mut self, v: bool) -> Option<DomainEvent> {
        if !self.is_member(v) {
            return None;
        }
        if v {
            self.has_true = false;
        } else {
            self.has_false = false;
        }
        Some(if self.is_empty() {
            DomainEvent::Emptied
        } else {
            DomainEvent::ValueRemoved
        })
    }
}

impl std::fmt::Display for BoolDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.has_false, self.has_true) {
            (true, true) => write!(f, "{{false, true}}"),
            (true, false) => write!(f, "{{false}}"),
            (false, true) => write!(f, "{{true}}"),
            (false, false) => write!(f, "{{}}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_narrows_then_empties() {
        let mut d = BoolDomain::both();
        assert_eq!(d.remove(false), Some(DomainEvent::ValueRemoved));
        assert_eq!(d.singleton_value(), Some(true));
        assert_eq!(d.remove(false), None);
        assert_eq!(d.remove(true), Some(DomainEvent::Emptied));
        assert!(d.is_empty());
    }

    #[test]
    fn numeric_bounds_view() {
        assert_eq!(BoolDomain::both().bounds(), Some((0, 1)));
        assert_eq!(BoolDomain::singleton(true).bounds(), Some((1, 1)));
        assert_eq!(BoolDomain::singleton(false).bounds(), Some((0, 0)));
    }

    #[test]
    fn retain_reports_singleton_transition() {
        let mut d = BoolDomain::both();
        assert_eq!(d.retain(|v| v), Some(DomainEvent::RestrictToSingleton));
        assert_eq!(d.singleton_value(), Some(true));
    }
}
