//! Finite-domain constraint engine with a Simple Temporal Network propagator.
//!
//! This crate provides the essential building blocks of a constraint-based
//! planning core:
//!  - [domain]: value containers (intervals, enumerations, booleans) with
//!    strictly defined intersection/relaxation semantics driving change events
//!  - [engine]: the constraint engine proper — variables, constraints,
//!    propagators, the propagation loop and violation management
//!  - [temporal]: a distance graph and STN with incremental Bellman-Ford and
//!    bounded Dijkstra, bridged into the engine by a dedicated propagator
//!
//! ## Example
//!
//! ```
//! use tempus::engine::ConstraintEngine;
//! use tempus::domain::Domain;
//!
//! let mut ce = ConstraintEngine::new();
//! let s = ce.new_variable("s", Domain::int_interval(0, 10)).unwrap();
//! let e = ce.new_variable("e", Domain::int_interval(0, 20)).unwrap();
//! ce.create_constraint("precedes", &[s, e]).unwrap();
//! assert!(ce.propagate());
//! ```

pub mod collections;
pub mod constraints;
pub mod domain;
pub mod engine;
pub mod factory;
pub mod symbols;
pub mod temporal;

pub use engine::ConstraintEngine;

/// Errors surfaced by the public API.
///
/// Inconsistency is deliberately absent: an unsatisfiable constraint set is a
/// legitimate state reported by `propagate()` returning false, not an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A usage precondition was violated (invalid key, non-member value,
    /// widening a narrow-only bound, re-entrant propagation, ...).
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),
    /// Incompatible domain families or constraint scope.
    #[error("type mismatch: {0}")]
    TypeMismatch(&'static str),
    /// An edge length or propagated distance outside the representable range.
    #[error("out of range: {0}")]
    OutOfRange(&'static str),
    /// An unregistered type or constraint name was passed to a factory.
    #[error("unknown type: {0}")]
    UnknownType(String),
}
