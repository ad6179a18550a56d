use smallvec::SmallVec;

use crate::constraints::Rule;
use crate::engine::VarKey;

/// A constraint record: a named rule applied over an ordered scope.
#[derive(Debug)]
pub struct Constraint {
    pub(crate) name: String,
    pub(crate) rule: Rule,
    pub(crate) scope: SmallVec<[VarKey; 3]>,
    /// Index of the owning propagator in the engine's registration order.
    pub(crate) propagator: usize,
    /// Active iff zero. Each inactive argument variable contributes one unit;
    /// violation marking and redundancy processing contribute more.
    pub(crate) deactivation_ref_count: u32,
    /// At most one argument has a non-singleton base domain.
    pub(crate) is_unary: bool,
    /// All arguments have closed singleton base domains; queued for
    /// deactivation after the next successful propagation.
    pub(crate) is_redundant: bool,
}

impl Constraint {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule(&self) -> Rule {
        self.rule
    }

    pub fn scope(&self) -> &[VarKey] {
        &self.scope
    }

    pub fn is_active(&self) -> bool {
        self.deactivation_ref_count == 0
    }

    pub fn is_unary(&self) -> bool {
        self.is_unary
    }

    pub fn is_redundant(&self) -> bool {
        self.is_redundant
    }

    pub fn is_variable_of(&self, var: VarKey) -> bool {
        self.scope.contains(&var)
    }

    /// The variables a relaxation of `_var` may have to reach through this
    /// constraint. The default is the whole scope.
    pub fn modified_variables(&self, _var: VarKey) -> &[VarKey] {
        &self.scope
    }
}
