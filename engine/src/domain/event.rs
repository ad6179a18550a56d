/// The change kinds a domain mutation can publish.
///
/// Exactly one event is emitted per mutating operation, after the domain has
/// mutated. An operation that also empties the domain reports [DomainEvent::Emptied]
/// and nothing else.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DomainEvent {
    UpperBoundDecreased,
    LowerBoundIncreased,
    BoundsRestricted,
    ValueRemoved,
    RestrictToSingleton,
    SetToSingleton,
    Reset,
    Relaxed,
    Closed,
    Opened,
    Emptied,
}

impl DomainEvent {
    /// True for events that can only shrink the set of values.
    pub fn is_restriction(self) -> bool {
        matches!(
            self,
            DomainEvent::UpperBoundDecreased
                | DomainEvent::LowerBoundIncreased
                | DomainEvent::BoundsRestricted
                | DomainEvent::ValueRemoved
                | DomainEvent::RestrictToSingleton
                | DomainEvent::SetToSingleton
                | DomainEvent::Closed
                | DomainEvent::Emptied
        )
    }

    /// True for events that may grow the set of values.
    ///
    /// `Reset` counts as a relaxation: resetting re-populates the domain from a
    /// superset and must trigger the same downstream cascade as `relax`.
    pub fn is_relaxation(self) -> bool {
        matches!(self, DomainEvent::Relaxed | DomainEvent::Reset | DomainEvent::Opened)
    }

    /// True when the change leaves the domain a singleton.
    pub fn is_singleton_event(self) -> bool {
        matches!(self, DomainEvent::RestrictToSingleton | DomainEvent::SetToSingleton)
    }
}

impl std::fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DomainEvent::UpperBoundDecreased => "UPPER_BOUND_DECREASED",
            DomainEvent::LowerBoundIncreased => "LOWER_BOUND_INCREASED",
            DomainEvent::BoundsRestricted => "BOUNDS_RESTRICTED",
            DomainEvent::ValueRemoved => "VALUE_REMOVED",
            DomainEvent::RestrictToSingleton => "RESTRICT_TO_SINGLETON",
            DomainEvent::SetToSingleton => "SET_TO_SINGLETON",
            DomainEvent::Reset => "RESET",
            DomainEvent::Relaxed => "RELAXED",
            DomainEvent::Closed => "CLOSED",
            DomainEvent::Opened => "OPENED",
            DomainEvent::Emptied => "EMPTIED",
        };
        write!(f, "{name}")
    }
}
