//! Abstract domains: the value containers propagation operates on.
//!
//! A [Domain] is a tagged variant over intervals (integer and real),
//! booleans, and enumerations (numeric and symbolic). Every mutating
//! operation narrows or relaxes the member set and reports the single
//! [DomainEvent] to publish; an operation that empties the domain reports
//! [DomainEvent::Emptied] and nothing else.
//!
//! Families: the interval, boolean and numeric-enumeration variants form the
//! numeric family (booleans range over {0, 1}); symbolic enumerations form
//! the symbolic family, further split by their label tag. Operations mixing
//! incomparable families fail with [Error::TypeMismatch].

pub mod boolean;
pub mod enumerated;
pub mod event;
pub mod interval;

pub use boolean::BoolDomain;
pub use enumerated::{Num, NumEnum, SymEnum, SymTag};
pub use event::DomainEvent;
pub use interval::{cmp_eq, leq, lt, FloatInterval, IntInterval, INFINITY, MIN_DELTA};

use crate::symbols::SymId;
use crate::Error;

/// A single member value of some domain.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Val {
    Int(i64),
    Float(f64),
    Bool(bool),
    Sym(SymId),
    Str(SymId),
}

impl Val {
    /// Numeric view of the value; `None` for symbolic values.
    pub fn as_f64(self) -> Option<f64> {
        match self {
            Val::Int(i) => Some(i as f64),
            Val::Float(f) => Some(f),
            Val::Bool(b) => Some(b as u8 as f64),
            Val::Sym(_) | Val::Str(_) => None,
        }
    }

    pub fn as_sym(self) -> Option<SymId> {
        match self {
            Val::Sym(s) | Val::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Val::Int(i) => write!(f, "{i}"),
            Val::Float(x) => write!(f, "{x}"),
            Val::Bool(b) => write!(f, "{b}"),
            Val::Sym(s) => write!(f, "'{s}"),
            Val::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

/// A set of values of one of the supported shapes.
#[derive(Clone, Debug)]
pub enum Domain {
    IntInterval(IntInterval),
    FloatInterval(FloatInterval),
    Bool(BoolDomain),
    NumEnum(NumEnum),
    SymEnum(SymEnum),
}

impl Domain {
    // ----- constructors -----

    pub fn int_interval(lb: i64, ub: i64) -> Domain {
        Domain::IntInterval(IntInterval::new(lb, ub))
    }

    pub fn int_full() -> Domain {
        Domain::IntInterval(IntInterval::full())
    }

    pub fn int_singleton(v: i64) -> Domain {
        Domain::IntInterval(IntInterval::singleton(v))
    }

    pub fn float_interval(lb: f64, ub: f64) -> Domain {
        Domain::FloatInterval(FloatInterval::new(lb, ub))
    }

    pub fn float_full() -> Domain {
        Domain::FloatInterval(FloatInterval::full())
    }

    pub fn boolean() -> Domain {
        Domain::Bool(BoolDomain::both())
    }

    pub fn bool_singleton(v: bool) -> Domain {
        Domain::Bool(BoolDomain::singleton(v))
    }

    pub fn num_enum(values: impl IntoIterator<Item = f64>, open: bool) -> Domain {
        Domain::NumEnum(NumEnum::new(values, open))
    }

    pub fn sym_enum(values: impl IntoIterator<Item = SymId>, open: bool, tag: SymTag) -> Domain {
        Domain::SymEnum(SymEnum::new(values, open, tag))
    }

    // ----- queries -----

    pub fn is_empty(&self) -> bool {
        match self {
            Domain::IntInterval(d) => d.is_empty(),
            Domain::FloatInterval(d) => d.is_empty(),
            Domain::Bool(d) => d.is_empty(),
            Domain::NumEnum(d) => d.is_empty(),
            Domain::SymEnum(d) => d.is_empty(),
        }
    }

    pub fn is_open(&self) -> bool {
        match self {
            Domain::NumEnum(d) => d.open,
            Domain::SymEnum(d) => d.open,
            _ => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    pub fn is_singleton(&self) -> bool {
        match self {
            Domain::IntInterval(d) => d.is_singleton(),
            Domain::FloatInterval(d) => d.is_singleton(),
            Domain::Bool(d) => d.is_singleton(),
            Domain::NumEnum(d) => d.is_singleton(),
            Domain::SymEnum(d) => d.is_singleton(),
        }
    }

    /// The single member of a singleton domain.
    pub fn singleton(&self) -> Option<Val> {
        if !self.is_singleton() {
            return None;
        }
        match self {
            Domain::IntInterval(d) => Some(Val::Int(d.lb)),
            Domain::FloatInterval(d) => Some(Val::Float(d.lb)),
            Domain::Bool(d) => d.singleton_value().map(Val::Bool),
            Domain::NumEnum(d) => d.singleton_value().map(Val::Float),
            Domain::SymEnum(d) => d.singleton_value().map(|s| match d.tag {
                SymTag::Symbol => Val::Sym(s),
                SymTag::String => Val::Str(s),
            }),
        }
    }

    /// Member count, defined for closed finite domains only.
    pub fn size(&self) -> Option<u64> {
        if self.is_open() {
            return None;
        }
        match self {
            Domain::IntInterval(d) => d.size(),
            Domain::FloatInterval(d) => d.size(),
            Domain::Bool(d) => Some(d.size()),
            Domain::NumEnum(d) => d.size(),
            Domain::SymEnum(d) => d.size(),
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Domain::IntInterval(d) => d.is_finite(),
            Domain::FloatInterval(d) => d.is_finite(),
            _ => !self.is_open(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Domain::SymEnum(_))
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, Domain::SymEnum(_))
    }

    /// Default comparability: same family, and for symbolic domains the same
    /// label tag.
    pub fn can_be_compared(&self, other: &Domain) -> bool {
        match (self, other) {
            (Domain::SymEnum(a), Domain::SymEnum(b)) => a.tag == b.tag,
            (a, b) => a.is_numeric() && b.is_numeric(),
        }
    }

    pub fn is_member(&self, v: Val) -> bool {
        match (self, v) {
            (Domain::SymEnum(d), Val::Sym(s)) if d.tag == SymTag::Symbol => d.is_member(s),
            (Domain::SymEnum(d), Val::Str(s)) if d.tag == SymTag::String => d.is_member(s),
            (Domain::SymEnum(_), _) => false,
            (d, v) => match v.as_f64() {
                Some(x) => d.is_member_num(x),
                None => false,
            },
        }
    }

    fn is_member_num(&self, x: f64) -> bool {
        match self {
            Domain::IntInterval(d) => cmp_eq(x, x.round()) && d.is_member(x.round() as i64),
            Domain::FloatInterval(d) => d.is_member(x),
            Domain::Bool(d) => {
                (cmp_eq(x, 0.0) && d.is_member(false)) || (cmp_eq(x, 1.0) && d.is_member(true))
            }
            Domain::NumEnum(d) => d.is_member(x),
            Domain::SymEnum(_) => false,
        }
    }

    /// Real-valued bounds of a non-empty numeric domain.
    pub fn num_bounds(&self) -> Option<(f64, f64)> {
        match self {
            Domain::IntInterval(d) if !d.is_empty() => Some((d.lb as f64, d.ub as f64)),
            Domain::FloatInterval(d) if !d.is_empty() => Some((d.lb, d.ub)),
            Domain::Bool(d) => d.bounds().map(|(l, u)| (l as f64, u as f64)),
            Domain::NumEnum(d) => d.bounds(),
            _ => None,
        }
    }

    /// Integer bounds of a non-empty integer-shaped domain, as the temporal
    /// network consumes them.
    pub fn int_bounds(&self) -> Option<(i64, i64)> {
        match self {
            Domain::IntInterval(d) if !d.is_empty() => Some((d.lb, d.ub)),
            Domain::Bool(d) => d.bounds(),
            _ => None,
        }
    }

    pub fn intersects(&self, other: &Domain) -> bool {
        if !self.can_be_compared(other) {
            return false;
        }
        let mut probe = self.clone();
        matches!(probe.intersect(other), Ok(_)) && !probe.is_empty()
    }

    /// Subset check, ignoring openness.
    pub fn is_subset_of(&self, other: &Domain) -> bool {
        if self.is_empty() {
            return true;
        }
        if !self.can_be_compared(other) {
            return false;
        }
        match (self, other) {
            (Domain::SymEnum(a), Domain::SymEnum(b)) => a.members.is_subset(&b.members),
            (Domain::NumEnum(a), b) => a.members.iter().all(|n| b.is_member_num(n.0)),
            (Domain::Bool(a), b) => {
                (!a.has_false || b.is_member_num(0.0)) && (!a.has_true || b.is_member_num(1.0))
            }
            (a, b) => {
                // interval against interval-like: containment of the hulls
                let (alb, aub) = a.num_bounds().expect("non-empty numeric domain");
                match b {
                    Domain::NumEnum(be) => {
                        a.size().is_some_and(|n| n <= 1) && be.is_member(alb) && be.is_member(aub)
                    }
                    _ => {
                        let (blb, bub) = match b.num_bounds() {
                            Some(bounds) => bounds,
                            None => return false,
                        };
                        leq(blb, alb) && leq(aub, bub)
                    }
                }
            }
        }
    }

    // ----- mutators -----

    /// Makes the domain empty unconditionally.
    pub fn empty(&mut self) -> DomainEvent {
        match self {
            Domain::IntInterval(d) => d.empty(),
            Domain::FloatInterval(d) => d.empty(),
            Domain::Bool(d) => d.empty(),
            Domain::NumEnum(d) => d.empty(),
            Domain::SymEnum(d) => d.empty(),
        }
    }

    /// Narrows to the intersection with `other`. `Ok(Some(_))` iff anything
    /// was removed.
    pub fn intersect(&mut self, other: &Domain) -> Result<Option<DomainEvent>, Error> {
        if !self.can_be_compared(other) {
            return Err(Error::TypeMismatch("intersection of incomparable domains"));
        }
        Ok(match (self, other) {
            (Domain::IntInterval(a), Domain::IntInterval(b)) => {
                if b.is_empty() {
                    narrow_to_empty_int(a)
                } else {
                    a.intersect_bounds(b.lb, b.ub)
                }
            }
            (Domain::FloatInterval(a), Domain::FloatInterval(b)) => {
                if b.is_empty() {
                    narrow_to_empty_float(a)
                } else {
                    a.intersect_bounds(b.lb, b.ub)
                }
            }
            (Domain::Bool(a), Domain::Bool(b)) => a.retain(|v| b.is_member(v)),
            (Domain::NumEnum(a), Domain::NumEnum(b)) => a.intersect(b),
            (Domain::SymEnum(a), Domain::SymEnum(b)) => a.intersect(b),
            (Domain::NumEnum(a), b) => {
                let changed = if b.is_empty() {
                    if a.is_empty() {
                        None
                    } else {
                        Some(a.empty())
                    }
                } else {
                    let before = a.members.len();
                    a.members.retain(|n| b.is_member_num(n.0));
                    a.restriction_event(before - a.members.len())
                };
                if b.is_closed() {
                    a.open = false;
                }
                changed
            }
            (Domain::Bool(a), b) => a.retain(|v| b.is_member_num(v as u8 as f64)),
            (a, b) => {
                // interval side against the numeric hull of the other
                match b.num_bounds() {
                    Some((lo, hi)) => match a {
                        Domain::IntInterval(d) => d.intersect_float_bounds(lo, hi),
                        Domain::FloatInterval(d) => d.intersect_bounds(lo, hi),
                        _ => unreachable!("remaining variants handled above"),
                    },
                    None if a.is_empty() => None,
                    None => Some(a.empty()),
                }
            }
        })
    }

    /// Narrows a numeric domain to `[lo, hi]`.
    pub fn intersect_bounds(&mut self, lo: f64, hi: f64) -> Result<Option<DomainEvent>, Error> {
        match self {
            Domain::IntInterval(d) => Ok(d.intersect_float_bounds(lo, hi)),
            Domain::FloatInterval(d) => Ok(d.intersect_bounds(lo, hi)),
            Domain::Bool(d) => Ok(d.retain(|v| {
                let x = v as u8 as f64;
                leq(lo, x) && leq(x, hi)
            })),
            Domain::NumEnum(d) => Ok(d.retain_in_bounds(lo, hi)),
            Domain::SymEnum(_) => Err(Error::TypeMismatch("bounds intersection on a symbolic domain")),
        }
    }

    /// Narrows an integer-shaped domain to `[lo, hi]` without rounding slack.
    pub fn intersect_int_bounds(&mut self, lo: i64, hi: i64) -> Result<Option<DomainEvent>, Error> {
        match self {
            Domain::IntInterval(d) => Ok(d.intersect_bounds(lo, hi)),
            _ => self.intersect_bounds(lo as f64, hi as f64),
        }
    }

    /// Removes the members of `other`. `Ok(Some(_))` iff anything was removed.
    pub fn difference(&mut self, other: &Domain) -> Result<Option<DomainEvent>, Error> {
        if !self.can_be_compared(other) {
            return Err(Error::TypeMismatch("difference of incomparable domains"));
        }
        Ok(match (self, other) {
            (Domain::SymEnum(a), Domain::SymEnum(b)) => a.difference(b),
            (Domain::NumEnum(a), Domain::NumEnum(b)) => a.difference(b),
            (Domain::NumEnum(a), b) => {
                let before = a.members.len();
                a.members.retain(|n| !b.is_member_num(n.0));
                a.restriction_event(before - a.members.len())
            }
            (Domain::Bool(a), b) => {
                let mut ev = None;
                if a.is_member(false) && b.is_member_num(0.0) {
                    ev = a.remove(false);
                }
                if a.is_member(true) && b.is_member_num(1.0) {
                    ev = a.remove(true).or(ev);
                }
                ev
            }
            (a, b) => match b.num_bounds() {
                Some((lo, hi)) => match a {
                    Domain::IntInterval(d) => {
                        d.difference_bounds((lo - MIN_DELTA).ceil() as i64, (hi + MIN_DELTA).floor() as i64)
                    }
                    Domain::FloatInterval(d) => d.difference_bounds(lo, hi),
                    _ => unreachable!("remaining variants handled above"),
                },
                None => None,
            },
        })
    }

    /// Mutates both domains to their intersection. Returns the events for
    /// (a, b); at most one side may become empty (the second intersection is
    /// skipped once the first empties).
    pub fn equate(a: &mut Domain, b: &mut Domain) -> Result<(Option<DomainEvent>, Option<DomainEvent>), Error> {
        let ev_a = a.intersect(b)?;
        if a.is_empty() {
            return Ok((ev_a, None));
        }
        let ev_b = b.intersect(a)?;
        debug_assert!(!b.is_empty(), "both sides of equate emptied");
        Ok((ev_a, ev_b))
    }

    /// Grows the domain to `other`, which must be a superset (or equal).
    pub fn relax_to(&mut self, other: &Domain) -> Result<Option<DomainEvent>, Error> {
        if !self.is_subset_of(other) {
            return Err(Error::InvalidOperation("relax target does not cover the domain"));
        }
        if self == other {
            return Ok(None);
        }
        *self = other.clone();
        Ok(Some(DomainEvent::Relaxed))
    }

    /// Re-populates the domain from `other` (caller checks `other` against the
    /// base domain). Emits `Reset` when anything changed.
    pub fn reset_to(&mut self, other: &Domain) -> Option<DomainEvent> {
        if self == other {
            return None;
        }
        *self = other.clone();
        Some(DomainEvent::Reset)
    }

    /// Restricts to the singleton `{v}`. Empties the domain when `v` is not a
    /// member.
    pub fn set(&mut self, v: Val) -> Result<DomainEvent, Error> {
        if !self.is_member(v) {
            return Ok(self.empty());
        }
        match (&mut *self, v) {
            (Domain::IntInterval(d), _) => {
                let x = v.as_f64().ok_or(Error::TypeMismatch("symbolic value for numeric domain"))?;
                *d = IntInterval::singleton(x.round() as i64);
            }
            (Domain::FloatInterval(d), _) => {
                let x = v.as_f64().ok_or(Error::TypeMismatch("symbolic value for numeric domain"))?;
                *d = FloatInterval::singleton(x);
            }
            (Domain::Bool(d), _) => {
                let x = v.as_f64().ok_or(Error::TypeMismatch("symbolic value for numeric domain"))?;
                *d = BoolDomain::singleton(cmp_eq(x, 1.0));
            }
            (Domain::NumEnum(d), _) => {
                let x = v.as_f64().ok_or(Error::TypeMismatch("symbolic value for numeric domain"))?;
                d.restrict_to(x);
            }
            (Domain::SymEnum(d), _) => {
                let s = v.as_sym().ok_or(Error::TypeMismatch("numeric value for symbolic domain"))?;
                d.restrict_to(s);
            }
        }
        Ok(DomainEvent::SetToSingleton)
    }

    /// Widens an open enumeration with a new member.
    pub fn insert(&mut self, v: Val) -> Result<Option<DomainEvent>, Error> {
        match (&mut *self, v) {
            (Domain::NumEnum(d), v) => {
                let x = v.as_f64().ok_or(Error::TypeMismatch("symbolic value for numeric domain"))?;
                d.insert(x)
            }
            (Domain::SymEnum(d), v) => {
                let s = v.as_sym().ok_or(Error::TypeMismatch("numeric value for symbolic domain"))?;
                d.insert(s)
            }
            _ => Err(Error::InvalidOperation("insert into a non-enumerated domain")),
        }
    }

    /// Removes a single member if present. Never fails.
    pub fn remove(&mut self, v: Val) -> Option<DomainEvent> {
        if !self.is_member(v) {
            return None;
        }
        match (&mut *self, v) {
            (Domain::NumEnum(d), v) => d.remove(v.as_f64()?),
            (Domain::SymEnum(d), v) => d.remove(v.as_sym()?),
            (Domain::Bool(d), v) => d.remove(cmp_eq(v.as_f64()?, 1.0)),
            (Domain::IntInterval(d), v) => {
                let x = v.as_f64()?.round() as i64;
                d.difference_bounds(x, x)
            }
            (Domain::FloatInterval(d), v) => {
                let x = v.as_f64()?;
                d.difference_bounds(x, x)
            }
        }
    }

    /// Closes an open enumeration. Reports `Closed`, followed by `Emptied`
    /// when the enumeration closed over no members.
    pub fn close(&mut self) -> Result<(DomainEvent, Option<DomainEvent>), Error> {
        let open = match self {
            Domain::NumEnum(d) => &mut d.open,
            Domain::SymEnum(d) => &mut d.open,
            _ => return Err(Error::InvalidOperation("interval and boolean domains are always closed")),
        };
        if !*open {
            return Err(Error::InvalidOperation("domain is already closed"));
        }
        *open = false;
        let emptied = self.is_empty().then_some(DomainEvent::Emptied);
        Ok((DomainEvent::Closed, emptied))
    }

    /// Re-opens a closed enumeration for incremental insertion.
    pub fn open(&mut self) -> Result<DomainEvent, Error> {
        let open = match self {
            Domain::NumEnum(d) => &mut d.open,
            Domain::SymEnum(d) => &mut d.open,
            _ => return Err(Error::InvalidOperation("interval and boolean domains cannot be opened")),
        };
        if *open {
            return Err(Error::InvalidOperation("domain is already open"));
        }
        *open = true;
        Ok(DomainEvent::Opened)
    }
}

fn narrow_to_empty_int(d: &mut IntInterval) -> Option<DomainEvent> {
    if d.is_empty() {
        None
    } else {
        Some(d.empty())
    }
}

fn narrow_to_empty_float(d: &mut FloatInterval) -> Option<DomainEvent> {
    if d.is_empty() {
        None
    } else {
        Some(d.empty())
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Domain::IntInterval(a), Domain::IntInterval(b)) => a == b,
            (Domain::FloatInterval(a), Domain::FloatInterval(b)) => a == b,
            (Domain::Bool(a), Domain::Bool(b)) => a == b,
            (Domain::NumEnum(a), Domain::NumEnum(b)) => a.open == b.open && a.members == b.members,
            (Domain::SymEnum(a), Domain::SymEnum(b)) => {
                a.tag == b.tag && a.open == b.open && a.members == b.members
            }
            // across variants only two comparable empty domains are equal
            (a, b) => a.is_empty() && b.is_empty() && a.can_be_compared(b),
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Domain::IntInterval(d) => write!(f, "{d}"),
            Domain::FloatInterval(d) => write!(f, "{d}"),
            Domain::Bool(d) => write!(f, "{d}"),
            Domain::NumEnum(d) => write!(f, "{d}"),
            Domain::SymEnum(d) => write!(f, "{d}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_same_domain_is_a_noop() {
        let mut d = Domain::int_interval(0, 10);
        let copy = d.clone();
        assert_eq!(d.intersect(&copy).unwrap(), None);
        assert_eq!(d, copy);
    }

    #[test]
    fn intersect_across_numeric_variants() {
        let mut ints = Domain::int_interval(0, 10);
        let floats = Domain::float_interval(2.5, 7.5);
        assert_eq!(ints.intersect(&floats).unwrap(), Some(DomainEvent::BoundsRestricted));
        assert_eq!(ints.int_bounds(), Some((3, 7)));

        let mut members = Domain::num_enum([1.0, 4.0, 9.0], false);
        let window = Domain::int_interval(2, 10);
        assert_eq!(members.intersect(&window).unwrap(), Some(DomainEvent::ValueRemoved));
        assert!(members.is_member(Val::Float(4.0)));
        assert!(!members.is_member(Val::Float(1.0)));
    }

    #[test]
    fn symbolic_and_numeric_do_not_compare() {
        let mut nums = Domain::int_interval(0, 5);
        let syms = Domain::sym_enum([SymId::from(0usize)], false, SymTag::Symbol);
        assert!(nums.intersect(&syms).is_err());
        assert!(!nums.can_be_compared(&syms));
    }

    #[test]
    fn boolean_is_numeric_with_range_zero_one() {
        let mut b = Domain::boolean();
        assert!(b.is_numeric());
        assert!(!b.is_symbolic());
        let zero = Domain::int_interval(0, 0);
        assert_eq!(b.intersect(&zero).unwrap(), Some(DomainEvent::RestrictToSingleton));
        assert_eq!(b.singleton(), Some(Val::Bool(false)));
    }

    #[test]
    fn equate_stabilizes_after_one_call() {
        let mut a = Domain::int_interval(0, 10);
        let mut b = Domain::int_interval(5, 20);
        let (ev_a, ev_b) = Domain::equate(&mut a, &mut b).unwrap();
        assert!(ev_a.is_some() && ev_b.is_some());
        assert_eq!(a, b);
        let (ev_a, ev_b) = Domain::equate(&mut a, &mut b).unwrap();
        assert_eq!((ev_a, ev_b), (None, None));
    }

    #[test]
    fn equate_empties_at_most_one_side() {
        let mut a = Domain::int_interval(0, 2);
        let mut b = Domain::int_interval(10, 12);
        let (ev_a, ev_b) = Domain::equate(&mut a, &mut b).unwrap();
        assert_eq!(ev_a, Some(DomainEvent::Emptied));
        assert_eq!(ev_b, None);
        assert!(a.is_empty());
        assert!(!b.is_empty());
    }

    #[test]
    fn relax_to_current_is_a_noop() {
        let mut d = Domain::int_interval(3, 4);
        let copy = d.clone();
        assert_eq!(d.relax_to(&copy).unwrap(), None);
        let wider = Domain::int_interval(0, 10);
        assert_eq!(d.relax_to(&wider).unwrap(), Some(DomainEvent::Relaxed));
        let narrower = Domain::int_interval(5, 6);
        assert!(d.relax_to(&narrower).is_err());
    }

    #[test]
    fn set_outside_the_domain_empties_it() {
        let mut d = Domain::int_interval(0, 5);
        assert_eq!(d.set(Val::Int(3)).unwrap(), DomainEvent::SetToSingleton);
        assert_eq!(d.singleton(), Some(Val::Int(3)));
        assert_eq!(d.set(Val::Int(9)).unwrap(), DomainEvent::Emptied);
        assert!(d.is_empty());
    }

    #[test]
    fn closing_an_enum_that_received_no_insert_empties_it() {
        let mut d = Domain::num_enum([], true);
        let (closed, emptied) = d.close().unwrap();
        assert_eq!(closed, DomainEvent::Closed);
        assert_eq!(emptied, Some(DomainEvent::Emptied));
        assert!(d.close().is_err()); // already closed
    }

    #[test]
    fn open_close_cycle_on_enums_only() {
        let mut d = Domain::num_enum([1.0], false);
        assert_eq!(d.open().unwrap(), DomainEvent::Opened);
        assert!(d.open().is_err());
        assert_eq!(d.insert(Val::Float(2.0)).unwrap(), Some(DomainEvent::Relaxed));
        let (closed, emptied) = d.close().unwrap();
        assert_eq!((closed, emptied), (DomainEvent::Closed, None));

        let mut interval = Domain::int_interval(0, 1);
        assert!(interval.open().is_err());
        assert!(interval.close().is_err());
    }

    #[test]
    fn empty_domains_of_comparable_variants_are_equal() {
        let mut a = Domain::int_interval(0, 1);
        a.empty();
        let mut b = Domain::float_interval(0.0, 1.0);
        b.empty();
        assert_eq!(a, b);

        let mut s = Domain::sym_enum([], false, SymTag::Symbol);
        s.empty();
        assert_ne!(a, s);
    }

    #[test]
    fn subset_ignores_openness() {
        let small = Domain::num_enum([1.0, 2.0], true);
        let big = Domain::num_enum([1.0, 2.0, 3.0], false);
        assert!(small.is_subset_of(&big));
        assert!(!big.is_subset_of(&small));

        let vals = Domain::num_enum([1.0, 2.0], false);
        let hull = Domain::int_interval(0, 5);
        assert!(vals.is_subset_of(&hull));
    }
}
