use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::domain::event::DomainEvent;
use crate::domain::interval::{cmp_eq, leq, MIN_DELTA};
use crate::symbols::SymId;
use crate::Error;

/// A real number usable as a `BTreeSet` member (total order over f64).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Num(pub f64);

impl Eq for Num {}

impl PartialOrd for Num {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Num {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Enumerated set of reals. The open form admits incremental [NumEnum::insert]
/// until [NumEnum::close] is called.
///
/// Membership is granular: values within ε of a member count as that member.
#[derive(Clone, Debug, PartialEq)]
pub struct NumEnum {
    pub members: BTreeSet<Num>,
    pub open: bool,
}

impl NumEnum {
    pub fn new(values: impl IntoIterator<Item = f64>, open: bool) -> Self {
        NumEnum {
            members: values.into_iter().map(Num).collect(),
            open,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_singleton(&self) -> bool {
        !self.open && self.members.len() == 1
    }

    pub fn singleton_value(&self) -> Option<f64> {
        if self.is_singleton() {
            self.members.first().map(|n| n.0)
        } else {
            None
        }
    }

    pub fn size(&self) -> Option<u64> {
        if self.open {
            None
        } else {
            Some(self.members.len() as u64)
        }
    }

    pub fn is_member(&self, v: f64) -> bool {
        self.members
            .range(Num(v - MIN_DELTA)..=Num(v + MIN_DELTA))
            .next()
            .is_some()
    }

    pub fn bounds(&self) -> Option<(f64, f64)> {
        match (self.members.first(), self.members.last()) {
            (Some(lo), Some(hi)) => Some((lo.0, hi.0)),
            _ => None,
        }
    }

    pub fn empty(&mut self) -> DomainEvent {
        self.members.clear();
        DomainEvent::Emptied
    }

    pub(crate) fn restriction_event(&self, removed: usize) -> Option<DomainEvent> {
        if removed == 0 {
            None
        } else if self.members.is_empty() {
            Some(DomainEvent::Emptied)
        } else if self.members.len() == 1 {
            Some(DomainEvent::RestrictToSingleton)
        } else {
            Some(DomainEvent::ValueRemoved)
        }
    }

    /// Keeps the members also present in `other` (under ε). Intersecting a
    /// closed set into an open one closes it; two open sets stay open.
    pub fn intersect(&mut self, other: &NumEnum) -> Option<DomainEvent> {
        let before = self.members.len();
        self.members.retain(|n| other.is_member(n.0));
        self.open &= other.open;
        self.restriction_event(before - self.members.len())
    }

    /// Keeps the members inside `[lo, hi]` (under ε).
    pub fn retain_in_bounds(&mut self, lo: f64, hi: f64) -> Option<DomainEvent> {
        let before = self.members.len();
        self.members.retain(|n| leq(lo, n.0) && leq(n.0, hi));
        self.restriction_event(before - self.members.len())
    }

    /// Removes the members also present in `other`.
    pub fn difference(&mut self, other: &NumEnum) -> Option<DomainEvent> {
        let before = self.members.len();
        self.members.retain(|n| !other.is_member(n.0));
        self.restriction_event(before - self.members.len())
    }

    pub fn remove(&mut self, v: f64) -> Option<DomainEvent> {
        let hits: Vec<Num> = self
            .members
            .range(Num(v - MIN_DELTA)..=Num(v + MIN_DELTA))
            .copied()
            .collect();
        for hit in &hits {
            self.members.remove(hit);
        }
        self.restriction_event(hits.len())
    }

    /// Widens an open enumeration. Inserting an existing member is a no-op
    /// even when closed.
    pub fn insert(&mut self, v: f64) -> Result<Option<DomainEvent>, Error> {
        if self.is_member(v) {
            return Ok(None);
        }
        if !self.open {
            return Err(Error::InvalidOperation("insert into a closed enumeration"));
        }
        self.members.insert(Num(v));
        Ok(Some(DomainEvent::Relaxed))
    }

    pub fn restrict_to(&mut self, v: f64) -> Option<DomainEvent> {
        if !self.is_member(v) {
            return Some(self.empty());
        }
        self.members.retain(|n| cmp_eq(n.0, v));
        Some(DomainEvent::SetToSingleton)
    }
}

impl std::fmt::Display for NumEnum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, n) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", n.0)?;
        }
        write!(f, "}}")?;
        if self.open {
            write!(f, "...")?;
        }
        Ok(())
    }
}

/// Which kind of interned label a symbolic enumeration carries. Domains with
/// different tags are not comparable even though both hold [SymId]s.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SymTag {
    Symbol,
    String,
}

/// Enumerated set of interned labels.
#[derive(Clone, Debug, PartialEq)]
pub struct SymEnum {
    pub members: BTreeSet<SymId>,
    pub open: bool,
    pub tag: SymTag,
}

impl SymEnum {
    pub fn new(values: impl IntoIterator<Item = SymId>, open: bool, tag: SymTag) -> Self {
        SymEnum {
            members: values.into_iter().collect(),
            open,
            tag,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_singleton(&self) -> bool {
        !self.open && self.members.len() == 1
    }

    pub fn singleton_value(&self) -> Option<SymId> {
        if self.is_singleton() {
            self.members.first().copied()
        } else {
            None
        }
    }

    pub fn size(&self) -> Option<u64> {
        if self.open {
            None
        } else {
            Some(self.members.len() as u64)
        }
    }

    pub fn is_member(&self, v: SymId) -> bool {
        self.members.contains(&v)
    }

    pub fn empty(&mut self) -> DomainEvent {
        self.members.clear();
        DomainEvent::Emptied
    }

    fn restriction_event(&self, removed: usize) -> Option<DomainEvent> {
        if removed == 0 {
            None
        } else if self.members.is_empty() {
            Some(DomainEvent::Emptied)
        } else if self.members.len() == 1 {
            Some(DomainEvent::RestrictToSingleton)
        } else {
            Some(DomainEvent::ValueRemoved)
        }
    }

    pub fn intersect(&mut self, other: &SymEnum) -> Option<DomainEvent> {
        let before = self.members.len();
        self.members.retain(|s| other.members.contains(s));
        self.open &= other.open;
        self.restriction_event(before - self.members.len())
    }

    pub fn difference(&mut self, other: &SymEnum) -> Option<DomainEvent> {
        let before = self.members.len();
        self.members.retain(|s| !other.members.contains(s));
        self.restriction_event(before - self.members.len())
    }

    pub fn remove(&mut self, v: SymId) -> Option<DomainEvent> {
        if self.members.remove(&v) {
            self.restriction_event(1)
        } else {
            None
        }
    }

    pub fn insert(&mut self, v: SymId) -> Result<Option<DomainEvent>, Error> {
        if self.members.contains(&v) {
            return Ok(None);
        }
        if !self.open {
            return Err(Error::InvalidOperation("insert into a closed enumeration"));
        }
        self.members.insert(v);
        Ok(Some(DomainEvent::Relaxed))
    }

    pub fn restrict_to(&mut self, v: SymId) -> Option<DomainEvent> {
        if !self.members.contains(&v) {
            return Some(self.empty());
        }
        self.members.retain(|s| *s == v);
        Some(DomainEvent::SetToSingleton)
    }
}

impl std::fmt::Display for SymEnum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, s) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{s}")?;
        }
        write!(f, "}}")?;
        if self.open {
            write!(f, "...")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsilon_membership() {
        let d = NumEnum::new([1.0, 2.0, 3.5], false);
        assert!(d.is_member(2.0 + MIN_DELTA / 2.0));
        assert!(!d.is_member(2.0 + 2.0 * MIN_DELTA));
    }

    #[test]
    fn intersection_of_open_enums_stays_open() {
        let mut a = NumEnum::new([1.0, 2.0, 3.0], true);
        let b = NumEnum::new([2.0, 3.0, 4.0], true);
        assert_eq!(a.intersect(&b), Some(DomainEvent::ValueRemoved));
        assert!(a.open);

        // intersecting a closed set into an open enum closes it
        let closed = NumEnum::new([3.0], false);
        assert_eq!(a.intersect(&closed), Some(DomainEvent::RestrictToSingleton));
        assert!(!a.open);
        assert_eq!(a.singleton_value(), Some(3.0));
    }

    #[test]
    fn insert_requires_open_unless_already_member() {
        let mut open = NumEnum::new([1.0], true);
        assert_eq!(open.insert(2.0).unwrap(), Some(DomainEvent::Relaxed));

        let mut closed = NumEnum::new([1.0], false);
        assert!(closed.insert(2.0).is_err());
        assert_eq!(closed.insert(1.0).unwrap(), None); // member, tolerated
    }

    #[test]
    fn open_enum_is_not_a_singleton() {
        let d = NumEnum::new([5.0], true);
        assert!(!d.is_singleton());
        assert_eq!(d.size(), None);
    }

    #[test]
    fn sym_enum_restriction_events() {
        let a = SymId::from(0usize);
        let b = SymId::from(1usize);
        let c = SymId::from(2usize);
        let mut d = SymEnum::new([a, b, c], false, SymTag::Symbol);
        assert_eq!(d.remove(c), Some(DomainEvent::ValueRemoved));
        assert_eq!(d.remove(c), None);
        assert_eq!(d.remove(b), Some(DomainEvent::RestrictToSingleton));
        assert_eq!(d.remove(a), Some(DomainEvent::Emptied));
    }
}
