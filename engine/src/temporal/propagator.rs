//! Bridges the constraint engine onto the temporal network.
//!
//! Temporal variables map 1:1 to timepoints and temporal constraints map 1:1
//! to network constraints, with changes buffered between engine ticks. Each
//! execution applies buffered removals, narrows or swaps the affected network
//! constraints, propagates the network, and either feeds tightened bounds back
//! into the engine domains or surfaces the negative cycle as violations.

use std::any::Any;
use std::collections::BTreeSet;

use hashbrown::HashMap;

use crate::domain::{interval::INFINITY, Domain, DomainEvent};
use crate::engine::{Cnet, ConstraintKey, Propagator, VarKey};
use crate::temporal::graph::{map_to_internal_infinity, NodeKey, Time, NEG_INFINITY, POS_INFINITY};
use crate::temporal::network::{TcKey, TemporalNetwork};

fn to_tnet(t: i64) -> Time {
    map_to_internal_infinity(t)
}

fn from_tnet(t: Time) -> i64 {
    if t >= POS_INFINITY {
        INFINITY
    } else if t <= NEG_INFINITY {
        -INFINITY
    } else {
        t
    }
}

pub struct TemporalPropagator {
    tnet: TemporalNetwork,
    /// Two-way variable <-> timepoint binding; cleared before either side dies.
    var_to_tp: HashMap<VarKey, NodeKey>,
    tp_to_var: HashMap<NodeKey, VarKey>,
    /// Two-way constraint binding.
    cnet_to_tnet: HashMap<ConstraintKey, TcKey>,
    tnet_to_cnet: HashMap<TcKey, ConstraintKey>,
    changed_variables: BTreeSet<VarKey>,
    active_variables: BTreeSet<VarKey>,
    changed_constraints: BTreeSet<ConstraintKey>,
    constraints_for_deletion: Vec<TcKey>,
    timepoints_for_deletion: Vec<NodeKey>,
    most_recent_repropagation: u64,
}

impl Default for TemporalPropagator {
    fn default() -> Self {
        Self::new()
    }
}

impl TemporalPropagator {
    pub fn new() -> Self {
        TemporalPropagator {
            tnet: TemporalNetwork::new(),
            var_to_tp: HashMap::new(),
            tp_to_var: HashMap::new(),
            cnet_to_tnet: HashMap::new(),
            tnet_to_cnet: HashMap::new(),
            changed_variables: BTreeSet::new(),
            active_variables: BTreeSet::new(),
            changed_constraints: BTreeSet::new(),
            constraints_for_deletion: Vec::new(),
            timepoints_for_deletion: Vec::new(),
            most_recent_repropagation: 1,
        }
    }

    pub fn network(&self) -> &TemporalNetwork {
        &self.tnet
    }

    pub fn timepoint(&self, var: VarKey) -> Option<NodeKey> {
        self.var_to_tp.get(&var).copied()
    }

    pub fn most_recent_repropagation(&self) -> u64 {
        self.most_recent_repropagation
    }

    fn buffer(&mut self, var: VarKey, cnet: &Cnet) {
        if self.var_to_tp.contains_key(&var) {
            self.changed_variables.insert(var);
        } else {
            self.add_timepoint(var, cnet);
        }
    }

    fn add_timepoint(&mut self, var: VarKey, cnet: &Cnet) {
        debug_assert!(!self.var_to_tp.contains_key(&var));
        let tp = self.tnet.add_timepoint();
        self.var_to_tp.insert(var, tp);
        self.tp_to_var.insert(tp, var);
        self.active_variables.insert(var);
        self.changed_variables.insert(var);
        tracing::debug!(var = %var, tp = %tp, "timepoint added");

        // pin the timepoint to the variable's current bounds
        let (lb, ub) = match cnet.current_domain(var).int_bounds() {
            Some((lb, ub)) => (to_tnet(lb), to_tnet(ub)),
            None => (NEG_INFINITY, POS_INFINITY), // emptied or untyped; recovered on relax
        };
        let origin = self.tnet.origin();
        match self.tnet.add_temporal_constraint(origin, tp, lb, ub, true) {
            Ok(tc) => self.tnet.set_bound_tc(tp, Some(tc)),
            Err(_) => debug_assert!(false, "variable bounds outside the temporal range"),
        }
    }

    /// The argument variables mirrored as timepoints: both endpoints, never
    /// the distance variable of a ternary constraint.
    fn scope_timepoint_vars(c: &crate::engine::Constraint) -> (VarKey, VarKey) {
        let scope = c.scope();
        if scope.len() == 3 {
            (scope[0], scope[2])
        } else {
            (scope[0], scope[1])
        }
    }

    // ----- applying buffered changes to the network -----

    fn update_tnet(&mut self, cnet: &mut Cnet) {
        if !self.constraints_for_deletion.is_empty() || !self.timepoints_for_deletion.is_empty() {
            self.most_recent_repropagation = cnet.most_recent_repropagation();
        }
        for tc in std::mem::take(&mut self.constraints_for_deletion) {
            self.tnet.remove_temporal_constraint(tc, true);
        }
        for tp in std::mem::take(&mut self.timepoints_for_deletion) {
            if let Some(tc) = self.tnet.bound_tc(tp) {
                self.tnet.remove_temporal_constraint(tc, true);
                self.tnet.set_bound_tc(tp, None);
            }
            tracing::debug!(tp = %tp, "timepoint deleted");
            self.tnet.delete_timepoint(tp);
        }

        let changed_vars: Vec<VarKey> = std::mem::take(&mut self.changed_variables).into_iter().collect();
        for var in changed_vars {
            if !cnet.has_variable(var) || !cnet.variable(var).is_active() {
                continue;
            }
            self.update_timepoint(var, cnet);
        }

        let changed: Vec<ConstraintKey> = self.changed_constraints.iter().copied().collect();
        self.changed_constraints.clear();
        for ck in changed {
            if !cnet.has_constraint(ck) || !cnet.constraint(ck).is_active() {
                continue;
            }
            self.update_temporal_constraint(ck, cnet);
            // distance-variable restrictions may already have emptied a domain
            if cnet.proven_inconsistent() && !cnet.allow_violations() {
                break;
            }
        }
    }

    fn update_timepoint(&mut self, var: VarKey, cnet: &Cnet) {
        let tp = self.var_to_tp[&var];
        let (lb, ub) = match cnet.current_domain(var).int_bounds() {
            Some((lb, ub)) => (to_tnet(lb), to_tnet(ub)),
            None => return, // empty; the relaxation pass will restore it
        };
        let bound_tc = self.tnet.bound_tc(tp);
        if let Some(new_tc) = self.update_constraint(bound_tc, tp, lb, ub, cnet) {
            self.tnet.set_bound_tc(tp, Some(new_tc));
        }
    }

    /// Restriction narrows the network constraint in place; relaxation swaps
    /// it for a wider one (incremental propagation cannot widen).
    fn update_constraint(
        &mut self,
        tc: Option<TcKey>,
        tp: NodeKey,
        lb: Time,
        ub: Time,
        cnet: &Cnet,
    ) -> Option<TcKey> {
        let origin = self.tnet.origin();
        let Some(tc) = tc else {
            return self.tnet.add_temporal_constraint(origin, tp, lb, ub, true).ok();
        };
        debug_assert!(lb <= ub);
        let (lbt, ubt) = self.tnet.constraint_bounds(tc);

        if lb < lbt || ub > ubt {
            // relaxation
            self.most_recent_repropagation = cnet.most_recent_repropagation();
            let (head, foot) = self.tnet.constraint_scope(tc);
            let linked = self.tnet_to_cnet.remove(&tc);
            self.tnet.remove_temporal_constraint(tc, true);
            let new_tc = match self.tnet.add_temporal_constraint(head, foot, lb, ub, true) {
                Ok(tc) => tc,
                Err(_) => {
                    debug_assert!(false, "relaxed bounds outside the temporal range");
                    return None;
                }
            };
            if let Some(ck) = linked {
                self.cnet_to_tnet.insert(ck, new_tc);
                self.tnet_to_cnet.insert(new_tc, ck);
                None
            } else {
                debug_assert_eq!(foot, tp);
                Some(new_tc)
            }
        } else if !self.tnet.constraint_is_complete(tc) || lb > lbt || ub < ubt {
            // restriction; retain the most restricted bounds seen
            let new_lb = lb.max(lbt);
            let new_ub = ub.min(ubt);
            if !self.tnet.constraint_is_complete(tc) || lbt < new_lb || ubt > new_ub {
                if self.tnet.narrow_temporal_constraint(tc, new_lb, new_ub).is_err() {
                    debug_assert!(false, "narrowing rejected");
                }
            }
            None
        } else {
            None
        }
    }

    fn update_temporal_constraint(&mut self, ck: ConstraintKey, cnet: &mut Cnet) {
        if !self.cnet_to_tnet.contains_key(&ck) {
            self.add_temporal_constraint(ck, cnet);
            return;
        }
        let scope: Vec<VarKey> = cnet.constraint(ck).scope().to_vec();
        if scope.len() == 3 {
            let (s, d, e) = (scope[0], scope[1], scope[2]);
            // apply the endpoint-implied bounds to the distance variable so
            // the ternary constraint keeps its sum semantics
            let s_dom = cnet.current_domain(s);
            let e_dom = cnet.current_domain(e);
            if s_dom.is_finite() && e_dom.is_finite() {
                if let (Some((slb, sub)), Some((elb, eub))) = (s_dom.int_bounds(), e_dom.int_bounds()) {
                    cnet.set_propagating_constraint(d, Some(ck));
                    cnet.restrict_int_bounds(d, elb - sub, eub - slb);
                    cnet.set_propagating_constraint(d, None);
                    if cnet.current_domain(d).is_empty() {
                        return;
                    }
                }
            }
            let Some((lb, ub)) = cnet.current_domain(d).int_bounds() else {
                return;
            };
            let tc = self.cnet_to_tnet[&ck];
            let (_, foot) = self.tnet.constraint_scope(tc);
            self.update_constraint(Some(tc), foot, to_tnet(lb), to_tnet(ub), cnet);
        }
        // binary temporal constraints carry fixed bounds; nothing to narrow
    }

    fn add_temporal_constraint(&mut self, ck: ConstraintKey, cnet: &Cnet) {
        let c = cnet.constraint(ck);
        debug_assert!(c.is_active());
        let scope = c.scope();
        debug_assert!(scope.len() == 2 || scope.len() == 3);

        let start = scope[0];
        let (end, lb, ub) = if scope.len() == 3 {
            let d = cnet.current_domain(scope[1]);
            let (lb, ub) = d.int_bounds().unwrap_or((-INFINITY, INFINITY));
            (scope[2], to_tnet(lb), to_tnet(ub))
        } else if c.rule() == crate::constraints::Rule::Concurrent {
            (scope[1], 0, 0)
        } else {
            (scope[1], 0, POS_INFINITY)
        };

        let start_tp = self.var_to_tp[&start];
        let end_tp = self.var_to_tp[&end];
        match self.tnet.add_temporal_constraint(start_tp, end_tp, lb, ub, true) {
            Ok(tc) => {
                self.cnet_to_tnet.insert(ck, tc);
                self.tnet_to_cnet.insert(tc, ck);
                tracing::debug!(constraint = %ck, lb, ub, "temporal constraint added");
            }
            Err(_) => debug_assert!(false, "constraint bounds outside the temporal range"),
        }
    }

    // ----- reading results back into the engine -----

    fn update_temp_vars(&mut self, cnet: &mut Cnet) {
        let updated: Vec<NodeKey> = self.tnet.updated_timepoints().iter().copied().collect();
        let mut distance_constraints: BTreeSet<ConstraintKey> = BTreeSet::new();
        for tp in updated {
            let (lb, ub) = self.tnet.last_timepoint_bounds(tp);
            debug_assert!(lb <= ub);
            let Some(&var) = self.tp_to_var.get(&tp) else {
                continue;
            };
            if !cnet.variable(var).is_active() {
                self.handle_variable_deactivated(var);
                continue;
            }
            debug_assert!(!cnet.current_domain(var).is_empty());
            cnet.restrict_int_bounds(var, from_tnet(lb), from_tnet(ub));

            // endpoints of sum constraints push an update to the distance
            for &(ck, idx) in cnet.variable(var).constraints() {
                if !cnet.has_constraint(ck) {
                    continue;
                }
                let c = cnet.constraint(ck);
                if c.is_active() && c.scope().len() == 3 && (idx == 0 || idx == 2) {
                    distance_constraints.insert(ck);
                }
            }
        }
        for ck in distance_constraints {
            self.update_distance(ck, cnet);
        }
        self.tnet.reset_updated_timepoints();
    }

    /// Recomputes the distance domain from freshly propagated endpoint bounds.
    fn update_distance(&mut self, ck: ConstraintKey, cnet: &mut Cnet) {
        let scope: Vec<VarKey> = cnet.constraint(ck).scope().to_vec();
        let (s, d, e) = (scope[0], scope[1], scope[2]);
        let s_dom = cnet.current_domain(s);
        let e_dom = cnet.current_domain(e);
        if !s_dom.is_finite() || !e_dom.is_finite() {
            return;
        }
        let (Some((slb, sub)), Some((elb, eub))) = (s_dom.int_bounds(), e_dom.int_bounds()) else {
            return;
        };
        cnet.set_propagating_constraint(d, Some(ck));
        cnet.restrict_int_bounds(d, elb - sub, eub - slb);
        cnet.set_propagating_constraint(d, None);
    }

    fn surface_inconsistency(&mut self, cnet: &mut Cnet) {
        let updated_var = self
            .tnet
            .updated_timepoints()
            .iter()
            .find_map(|tp| self.tp_to_var.get(tp).copied())
            .or_else(|| self.var_to_tp.keys().next().copied());
        if cnet.allow_violations() {
            // walk the nogood and charge the engine constraints behind it
            let origin = self.tnet.origin();
            let nogood = self.tnet.nogood_edges();
            tracing::debug!(edges = nogood.len(), "mapping temporal nogood to violations");
            for (from, to, _len) in nogood {
                let from_var = if from == origin {
                    updated_var
                } else {
                    self.tp_to_var.get(&from).copied()
                };
                let to_var = if to == origin {
                    updated_var
                } else {
                    self.tp_to_var.get(&to).copied()
                };
                let (Some(from_var), Some(to_var)) = (from_var, to_var) else {
                    continue;
                };
                let culprit = cnet
                    .variable(from_var)
                    .constraints()
                    .iter()
                    .map(|&(c, _)| c)
                    .find(|&c| {
                        cnet.has_constraint(c) && cnet.constraint(c).is_variable_of(to_var)
                    });
                if let Some(c) = culprit {
                    cnet.notify_constraint_violated(c);
                    cnet.note_variable_emptied(from_var);
                    cnet.note_variable_emptied(to_var);
                }
            }
        } else if let Some(var) = updated_var {
            // signal PROVEN_INCONSISTENT through an emptied domain
            cnet.empty_current(var);
        }
    }

    // ----- planner-facing queries -----

    /// Approximate: last-propagated bounds first, then a reachability probe.
    pub fn can_precede(&mut self, first: VarKey, second: VarKey, cnet: &Cnet) -> bool {
        debug_assert!(!self.update_required());
        let (Some(&f), Some(&s)) = (self.var_to_tp.get(&first), self.var_to_tp.get(&second)) else {
            // no temporal constraints on one of them: only the domains decide
            let a = cnet.current_domain(first).num_bounds();
            let b = cnet.current_domain(second).num_bounds();
            return match (a, b) {
                (Some((alb, _)), Some((_, bub))) => alb <= bub,
                _ => false,
            };
        };
        let (flb, _) = self.tnet.last_timepoint_bounds(f);
        let (_, sub) = self.tnet.last_timepoint_bounds(s);
        if sub < flb {
            return false;
        }
        !self.tnet.is_distance_less_than(f, s, 0)
    }

    /// Exact: the distance bounds between the two timepoints must include 0.
    pub fn can_be_concurrent(&mut self, first: VarKey, second: VarKey, cnet: &Cnet) -> bool {
        let (Some(&f), Some(&s)) = (self.var_to_tp.get(&first), self.var_to_tp.get(&second)) else {
            return cnet.current_domain(first).intersects(cnet.current_domain(second));
        };
        let (lb, ub) = self.tnet.calc_distance_bounds(f, s, true);
        lb <= 0 && ub >= 0
    }

    /// Can a token over [start, end] fit between a predecessor's end and a
    /// successor's start.
    pub fn can_fit_between(
        &mut self,
        start: VarKey,
        end: VarKey,
        pred_end: VarKey,
        succ_start: VarKey,
        _cnet: &Cnet,
    ) -> bool {
        debug_assert!(!self.update_required());
        let tstart = self.var_to_tp[&start];
        let tend = self.var_to_tp[&end];
        let pend = self.var_to_tp[&pred_end];
        let sstart = self.var_to_tp[&succ_start];

        if self.tnet.is_distance_less_than(pend, sstart, 1) {
            return false;
        }
        let (_, sub) = self.tnet.last_timepoint_bounds(tstart);
        let (elb, _) = self.tnet.last_timepoint_bounds(tend);
        let min_duration = elb - sub;
        if self.tnet.is_distance_less_than(pend, sstart, min_duration) {
            return false;
        }
        let (_, sub) = self.tnet.timepoint_bounds(tstart);
        let (elb, _) = self.tnet.timepoint_bounds(tend);
        let min_duration = elb - sub;
        !self.tnet.is_distance_less_than(pend, sstart, min_duration)
    }

    /// The domain of `second - first`.
    pub fn temporal_distance_domain(
        &mut self,
        first: VarKey,
        second: VarKey,
        exact: bool,
        cnet: &Cnet,
    ) -> Domain {
        let (Some(&f), Some(&s)) = (self.var_to_tp.get(&first), self.var_to_tp.get(&second)) else {
            // no network involvement: derive from the domains
            let a = cnet.current_domain(first).int_bounds();
            let b = cnet.current_domain(second).int_bounds();
            return match (a, b) {
                (Some((alb, aub)), Some((blb, bub))) => Domain::int_interval(blb - aub, bub - alb),
                _ => Domain::int_full(),
            };
        };
        let (lb, ub) = self.tnet.calc_distance_bounds(f, s, exact);
        Domain::int_interval(from_tnet(lb), from_tnet(ub))
    }

    /// Batched exact distances from one variable to many.
    pub fn temporal_distance_domains(
        &mut self,
        first: VarKey,
        seconds: &[VarKey],
        _cnet: &Cnet,
    ) -> Vec<Domain> {
        let f = self.var_to_tp[&first];
        let targs: Vec<NodeKey> = seconds.iter().map(|v| self.var_to_tp[v]).collect();
        self.tnet
            .calc_distance_bounds_many(f, &targs)
            .into_iter()
            .map(|(lb, ub)| Domain::int_interval(from_tnet(lb), from_tnet(ub)))
            .collect()
    }

    /// For each variable in order, the reference time closest to the old one
    /// admitted by the network, assuming earlier variables are pinned to their
    /// new times. One Dijkstra per variable: lower bounds are pulled from
    /// already-assigned predecessors, upper bounds pushed forward in a cache.
    pub fn min_perturb_times(&mut self, vars: &[VarKey], old_reftimes: &[i64], _cnet: &Cnet) -> Vec<i64> {
        debug_assert_eq!(vars.len(), old_reftimes.len());
        let tps: Vec<NodeKey> = vars.iter().map(|v| self.var_to_tp[v]).collect();
        let mut uppers: Vec<Time> = tps
            .iter()
            .map(|&tp| self.tnet.last_timepoint_bounds(tp).1)
            .collect();
        let mut new_reftimes: Vec<Time> = vec![0; vars.len()];

        for i in 0..tps.len() {
            let tp = tps[i];
            self.tnet.dijkstra_from(tp);

            let mut lb = self.tnet.last_timepoint_bounds(tp).0;
            for j in 0..i {
                let distance = self.tnet.distance(tps[j]);
                let lb1 = new_reftimes[j] - distance;
                if lb1 > lb {
                    lb = lb1;
                }
            }
            let ub = uppers[i];
            debug_assert!(lb <= ub, "minimal-perturbation bounds crossed");

            let old = to_tnet(old_reftimes[i]);
            new_reftimes[i] = old.clamp(lb, ub);

            for j in (i + 1)..tps.len() {
                let distance = self.tnet.distance(tps[j]);
                let ub1 = new_reftimes[i] + distance;
                if ub1 < uppers[j] {
                    uppers[j] = ub1;
                }
            }
        }
        new_reftimes.into_iter().map(from_tnet).collect()
    }
}

impl Propagator for TemporalPropagator {
    fn handle_notification(
        &mut self,
        var: VarKey,
        _arg_index: usize,
        constraint: ConstraintKey,
        _change: DomainEvent,
    ) {
        self.changed_constraints.insert(constraint);
        // only registered active variables are buffered for timepoint updates
        if self.active_variables.contains(&var) {
            self.changed_variables.insert(var);
        }
    }

    fn handle_constraint_added(&mut self, constraint: ConstraintKey, cnet: &Cnet) {
        self.changed_constraints.insert(constraint);
        let (a, b) = Self::scope_timepoint_vars(cnet.constraint(constraint));
        self.buffer(a, cnet);
        self.buffer(b, cnet);
    }

    fn handle_constraint_removed(&mut self, constraint: ConstraintKey, _cnet: &Cnet) {
        self.changed_constraints.remove(&constraint);
        if let Some(tc) = self.cnet_to_tnet.remove(&constraint) {
            self.tnet_to_cnet.remove(&tc);
            self.constraints_for_deletion.push(tc);
        }
    }

    fn handle_constraint_activated(&mut self, constraint: ConstraintKey, cnet: &Cnet) {
        self.changed_constraints.insert(constraint);
        let (a, b) = Self::scope_timepoint_vars(cnet.constraint(constraint));
        for var in [a, b] {
            self.buffer(var, cnet);
            self.active_variables.insert(var);
        }
    }

    fn handle_constraint_deactivated(&mut self, constraint: ConstraintKey, cnet: &Cnet) {
        self.changed_constraints.remove(&constraint);
        if let Some(tc) = self.cnet_to_tnet.remove(&constraint) {
            self.tnet_to_cnet.remove(&tc);
            // a violated constraint's edges may already have relaxed bounds
            let mark_deleted = cnet.violations().is_violated(constraint);
            self.tnet.remove_temporal_constraint(tc, mark_deleted);
        }
    }

    fn handle_variable_activated(&mut self, _var: VarKey) {
        // nothing to do; the constraint activation handler re-buffers
    }

    fn handle_variable_deactivated(&mut self, var: VarKey) {
        if let Some(tp) = self.var_to_tp.remove(&var) {
            self.tp_to_var.remove(&tp);
            self.tnet.clear_deletion_marker(tp);
            self.timepoints_for_deletion.push(tp);
        }
        self.changed_variables.remove(&var);
        self.active_variables.remove(&var);
    }

    fn update_required(&self) -> bool {
        !(self.constraints_for_deletion.is_empty()
            && self.timepoints_for_deletion.is_empty()
            && self.changed_constraints.is_empty()
            && self.changed_variables.is_empty())
    }

    fn execute(&mut self, cnet: &mut Cnet) {
        self.update_tnet(cnet);

        if cnet.proven_inconsistent() && !cnet.allow_violations() {
            return;
        }

        if !self.tnet.propagate() {
            tracing::debug!("temporal network inconsistent");
            self.surface_inconsistency(cnet);
        } else {
            self.update_temp_vars(cnet);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{Domain, Val};
    use crate::engine::{ConstraintEngine, Consistency};

    fn int_bounds(ce: &ConstraintEngine, v: crate::engine::VarKey) -> (i64, i64) {
        ce.current_domain(v).int_bounds().expect("integer domain")
    }

    #[test]
    fn precedes_then_distance_tightens_bounds() {
        let mut ce = ConstraintEngine::new();
        let s = ce.new_variable("s", Domain::int_interval(0, 10)).unwrap();
        let e = ce.new_variable("e", Domain::int_interval(0, 20)).unwrap();
        ce.create_constraint("precedes", &[s, e]).unwrap();
        assert!(ce.propagate());
        assert_eq!(int_bounds(&ce, s), (0, 10));
        assert_eq!(int_bounds(&ce, e), (0, 20));

        let d = ce.new_variable("d", Domain::int_interval(5, 7)).unwrap();
        ce.create_constraint("temporalDistance", &[s, d, e]).unwrap();
        assert!(ce.propagate());
        assert_eq!(int_bounds(&ce, s), (0, 10));
        assert_eq!(int_bounds(&ce, e), (5, 17));
        assert_eq!(int_bounds(&ce, d), (5, 7));
    }

    #[test]
    fn concurrent_keeps_timepoints_aligned() {
        let mut ce = ConstraintEngine::new();
        let a = ce.new_variable("a", Domain::int_interval(3, 12)).unwrap();
        let b = ce.new_variable("b", Domain::int_interval(0, 8)).unwrap();
        ce.create_constraint("concurrent", &[a, b]).unwrap();
        assert!(ce.propagate());
        assert_eq!(int_bounds(&ce, a), (3, 8));
        assert_eq!(int_bounds(&ce, b), (3, 8));
    }

    #[test]
    fn before_is_a_synonym_of_precedes() {
        let mut ce = ConstraintEngine::new();
        let a = ce.new_variable("a", Domain::int_interval(5, 10)).unwrap();
        let b = ce.new_variable("b", Domain::int_interval(0, 20)).unwrap();
        ce.create_constraint("before", &[a, b]).unwrap();
        assert!(ce.propagate());
        assert_eq!(int_bounds(&ce, b), (5, 20));
    }

    #[test]
    fn inconsistent_temporal_constraints_preempt() {
        let mut ce = ConstraintEngine::new();
        ce.set_auto_propagation(false);
        let a = ce.new_variable("a", Domain::int_interval(0, 5)).unwrap();
        let b = ce.new_variable("b", Domain::int_interval(20, 30)).unwrap();
        // b precedes a, but b's window lies entirely after a's
        ce.create_constraint("precedes", &[b, a]).unwrap();
        assert!(!ce.propagate());
        assert_eq!(ce.consistency(), Consistency::ProvenInconsistent);
    }

    #[test]
    fn removing_the_offending_constraint_recovers() {
        let mut ce = ConstraintEngine::new();
        ce.set_auto_propagation(false);
        let a = ce.new_variable("a", Domain::int_interval(0, 5)).unwrap();
        let b = ce.new_variable("b", Domain::int_interval(20, 30)).unwrap();
        let bad = ce.create_constraint("precedes", &[b, a]).unwrap();
        assert!(!ce.propagate());

        ce.remove_constraint(bad).unwrap();
        assert!(ce.propagate());
        assert_eq!(int_bounds(&ce, a), (0, 5));
        assert_eq!(int_bounds(&ce, b), (20, 30));
    }

    #[test]
    fn specify_propagates_through_the_network() {
        let mut ce = ConstraintEngine::new();
        let s = ce.new_variable("s", Domain::int_interval(0, 10)).unwrap();
        let d = ce.new_variable("d", Domain::int_interval(2, 2)).unwrap();
        let e = ce.new_variable("e", Domain::int_interval(0, 20)).unwrap();
        ce.create_constraint("temporalDistance", &[s, d, e]).unwrap();
        assert!(ce.propagate());

        ce.specify(s, Val::Int(4)).unwrap();
        assert!(ce.propagate());
        assert_eq!(int_bounds(&ce, e), (6, 6));

        ce.reset(s).unwrap();
        assert!(ce.propagate());
        assert_eq!(int_bounds(&ce, s), (0, 10));
        assert_eq!(int_bounds(&ce, e), (2, 12));
    }

    #[test]
    fn can_precede_and_concurrent_queries() {
        let mut ce = ConstraintEngine::new();
        let a = ce.new_variable("a", Domain::int_interval(0, 10)).unwrap();
        let b = ce.new_variable("b", Domain::int_interval(0, 10)).unwrap();
        let c = ce.new_variable("c", Domain::int_interval(0, 10)).unwrap();
        let d = ce.new_variable("d", Domain::int_interval(3, 3)).unwrap();
        ce.create_constraint("temporalDistance", &[a, d, b]).unwrap();
        ce.create_constraint("precedes", &[a, c]).unwrap();
        assert!(ce.propagate());

        assert!(ce.can_precede(a, b));
        assert!(!ce.can_precede(b, a)); // b is exactly 3 after a
        assert!(ce.can_be_concurrent(a, c));
        assert!(!ce.can_be_concurrent(a, b));
    }

    #[test]
    fn can_fit_between_requires_room() {
        let mut ce = ConstraintEngine::new();
        let pred_end = ce.new_variable("pe", Domain::int_interval(0, 10)).unwrap();
        let succ_start = ce.new_variable("ss", Domain::int_interval(0, 100)).unwrap();
        let gap = ce.new_variable("gap", Domain::int_interval(0, 20)).unwrap();
        ce.create_constraint("temporalDistance", &[pred_end, gap, succ_start]).unwrap();

        // token pinned at 50 so its minimal duration of 4 is visible
        let start = ce.new_variable("start", Domain::int_interval(50, 50)).unwrap();
        let end = ce.new_variable("end", Domain::int_interval(0, 100)).unwrap();
        let dur = ce.new_variable("dur", Domain::int_interval(4, 6)).unwrap();
        ce.create_constraint("temporalDistance", &[start, dur, end]).unwrap();
        assert!(ce.propagate());

        // a 4..6 token fits in a gap of up to 20
        assert!(ce.can_fit_between(start, end, pred_end, succ_start));

        // tighten the gap to at most 2: too small for the minimal duration
        let tight = ce.new_variable("tight", Domain::int_interval(0, 2)).unwrap();
        ce.create_constraint("temporalDistance", &[pred_end, tight, succ_start]).unwrap();
        assert!(ce.propagate());
        assert!(!ce.can_fit_between(start, end, pred_end, succ_start));
    }

    #[test]
    fn temporal_distance_domains_batch() {
        let mut ce = ConstraintEngine::new();
        let a = ce.new_variable("a", Domain::int_interval(0, 0)).unwrap();
        let b = ce.new_variable("b", Domain::int_interval(0, 50)).unwrap();
        let c = ce.new_variable("c", Domain::int_interval(0, 50)).unwrap();
        let d1 = ce.new_variable("d1", Domain::int_interval(5, 10)).unwrap();
        let d2 = ce.new_variable("d2", Domain::int_interval(2, 4)).unwrap();
        ce.create_constraint("temporalDistance", &[a, d1, b]).unwrap();
        ce.create_constraint("temporalDistance", &[b, d2, c]).unwrap();
        assert!(ce.propagate());

        let single = ce.temporal_distance_domain(a, c, true);
        assert_eq!(single.int_bounds(), Some((7, 14)));

        let batch = ce.temporal_distance_domains(a, &[b, c]);
        assert_eq!(batch[0].int_bounds(), Some((5, 10)));
        assert_eq!(batch[1].int_bounds(), Some((7, 14)));
    }

    #[test]
    fn min_perturb_times_pin_in_order() {
        let mut ce = ConstraintEngine::new();
        let a = ce.new_variable("a", Domain::int_interval(0, 20)).unwrap();
        let b = ce.new_variable("b", Domain::int_interval(0, 40)).unwrap();
        let d = ce.new_variable("d", Domain::int_interval(5, 15)).unwrap();
        ce.create_constraint("temporalDistance", &[a, d, b]).unwrap();
        assert!(ce.propagate());

        // old times violate the distance: b must trail a by at least 5
        let times = ce.min_perturb_times(&[a, b], &[10, 11]);
        assert_eq!(times[0], 10);
        assert_eq!(times[1], 15);

        // old times already feasible: kept as-is
        let times = ce.min_perturb_times(&[a, b], &[3, 12]);
        assert_eq!(times, vec![3, 12]);
    }
}
