//! The built-in constraint rules.
//!
//! A rule is the behavior half of a constraint: given the scope, it narrows
//! argument domains. Rules are a closed sum; the factory maps public names to
//! rules and to the propagator that schedules them. The temporal rules also
//! carry an interval-arithmetic execution so that they remain meaningful when
//! run outside the temporal propagator.

use crate::domain::{interval::INFINITY, Domain, DomainEvent};
use crate::engine::{Cnet, VarKey};

/// Behavior of a constraint over its scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rule {
    /// `eq(a, b)`: both domains narrow to their intersection.
    Eq,
    /// `neq(a, b)`: a singleton side is removed from the other.
    Neq,
    /// `leq(a, b)`: a ≤ b.
    Leq,
    /// `addEq(x, y, z)`: x + y = z.
    AddEq,
    /// `temporalDistance(s, d, e)`: s + d = e with d the distance.
    TemporalDistance,
    /// `precedes(s, e)` / `before(s, e)`: s ≤ e.
    Precedes,
    /// `concurrent(s, e)`: s = e.
    Concurrent,
}

impl Rule {
    /// Resolves a public constraint name. `before` is a synonym of `precedes`;
    /// the historical all-lowercase spelling of `temporalDistance` is accepted.
    pub fn from_name(name: &str) -> Option<Rule> {
        match name {
            "eq" => Some(Rule::Eq),
            "neq" => Some(Rule::Neq),
            "leq" => Some(Rule::Leq),
            "addEq" => Some(Rule::AddEq),
            "temporalDistance" | "temporaldistance" => Some(Rule::TemporalDistance),
            "precedes" | "before" => Some(Rule::Precedes),
            "concurrent" => Some(Rule::Concurrent),
            _ => None,
        }
    }

    /// The propagator this rule registers under.
    pub fn propagator_name(self) -> &'static str {
        if self.is_temporal() {
            "temporal"
        } else {
            "default"
        }
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, Rule::TemporalDistance | Rule::Precedes | Rule::Concurrent)
    }

    pub fn arity(self) -> usize {
        match self {
            Rule::AddEq | Rule::TemporalDistance => 3,
            _ => 2,
        }
    }

    /// Lets the constraint skip re-execution for changes that cannot produce
    /// further narrowing through it.
    pub fn can_ignore(self, arg_index: usize, change: DomainEvent) -> bool {
        match self {
            Rule::Leq | Rule::Precedes => {
                (arg_index == 0 && change == DomainEvent::UpperBoundDecreased)
                    || (arg_index == 1 && change == DomainEvent::LowerBoundIncreased)
            }
            _ => false,
        }
    }

    /// Narrows the argument domains. Any argument emptied mid-way aborts the
    /// remaining narrowing of this execution.
    pub(crate) fn execute(self, cnet: &mut Cnet, scope: &[VarKey]) {
        match self {
            Rule::Eq | Rule::Concurrent => {
                cnet.equate_pair(scope[0], scope[1]);
            }
            Rule::Neq => {
                let a = cnet.current_domain(scope[0]).singleton();
                let b = cnet.current_domain(scope[1]).singleton();
                if let Some(v) = a {
                    cnet.remove_value(scope[1], v);
                }
                if cnet.current_domain(scope[1]).is_empty() {
                    return;
                }
                if let Some(v) = b {
                    cnet.remove_value(scope[0], v);
                }
            }
            Rule::Leq | Rule::Precedes => {
                let Some((alb, _)) = num_bounds(cnet.current_domain(scope[0])) else {
                    return;
                };
                let Some((_, bub)) = num_bounds(cnet.current_domain(scope[1])) else {
                    return;
                };
                cnet.restrict_bounds(scope[0], f64::NEG_INFINITY, bub);
                if cnet.current_domain(scope[0]).is_empty() {
                    return;
                }
                cnet.restrict_bounds(scope[1], alb, f64::INFINITY);
            }
            Rule::AddEq | Rule::TemporalDistance => {
                let Some((xl, xu)) = num_bounds(cnet.current_domain(scope[0])) else {
                    return;
                };
                let Some((yl, yu)) = num_bounds(cnet.current_domain(scope[1])) else {
                    return;
                };
                let Some((zl, zu)) = num_bounds(cnet.current_domain(scope[2])) else {
                    return;
                };
                cnet.restrict_bounds(scope[2], xl + yl, xu + yu);
                if cnet.current_domain(scope[2]).is_empty() {
                    return;
                }
                cnet.restrict_bounds(scope[0], zl - yu, zu - yl);
                if cnet.current_domain(scope[0]).is_empty() {
                    return;
                }
                cnet.restrict_bounds(scope[1], zl - xu, zu - xl);
            }
        }
    }
}

/// Real bounds with the engine's unbounded markers widened to IEEE infinities,
/// so that interval arithmetic cannot manufacture spuriously finite bounds.
fn num_bounds(d: &Domain) -> Option<(f64, f64)> {
    let (lb, ub) = d.num_bounds()?;
    let widen = |b: f64| {
        if b >= INFINITY as f64 {
            f64::INFINITY
        } else if b <= -(INFINITY as f64) {
            f64::NEG_INFINITY
        } else {
            b
        }
    };
    Some((widen(lb), widen(ub)))
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Rule::Eq => "eq",
            Rule::Neq => "neq",
            Rule::Leq => "leq",
            Rule::AddEq => "addEq",
            Rule::TemporalDistance => "temporalDistance",
            Rule::Precedes => "precedes",
            Rule::Concurrent => "concurrent",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_resolution() {
        assert_eq!(Rule::from_name("eq"), Some(Rule::Eq));
        assert_eq!(Rule::from_name("before"), Some(Rule::Precedes));
        assert_eq!(Rule::from_name("precedes"), Some(Rule::Precedes));
        assert_eq!(Rule::from_name("temporaldistance"), Some(Rule::TemporalDistance));
        assert_eq!(Rule::from_name("nosuch"), None);
    }

    #[test]
    fn temporal_rules_register_with_the_temporal_propagator() {
        assert_eq!(Rule::Precedes.propagator_name(), "temporal");
        assert_eq!(Rule::Concurrent.propagator_name(), "temporal");
        assert_eq!(Rule::Eq.propagator_name(), "default");
    }

    #[test]
    fn leq_ignores_harmless_changes() {
        assert!(Rule::Leq.can_ignore(0, DomainEvent::UpperBoundDecreased));
        assert!(Rule::Leq.can_ignore(1, DomainEvent::LowerBoundIncreased));
        assert!(!Rule::Leq.can_ignore(0, DomainEvent::LowerBoundIncreased));
        assert!(!Rule::Eq.can_ignore(0, DomainEvent::UpperBoundDecreased));
    }
}
