//! A Simple Temporal Network over the distance graph.
//!
//! One distinguished node is the origin with bounds forever [0,0]; every other
//! timepoint's bounds are its propagated distances from/to the origin.
//! Additions are propagated eagerly and incrementally, which admits a
//! specialized constant-time cycle check: a new inconsistency must involve the
//! added constraint, so propagation returning to its start node proves a
//! negative cycle. Deletions mark the network for a full Bellman-Ford on the
//! next consistency query.

use std::collections::BTreeSet;

use env_param::EnvParam;

use crate::collections::store::{Arena, KeyMap};
use crate::create_key_type;
use crate::temporal::graph::{
    map_to_internal_infinity, DistanceGraph, NodeKey, Time, MAX_DISTANCE, MAX_LENGTH, MIN_DISTANCE,
    MIN_LENGTH, NEG_INFINITY, POS_INFINITY,
};
use crate::Error;

create_key_type!(pub TcKey);

pub static TNET_EXTENSIVE_CHECKS: EnvParam<bool> = EnvParam::new("TEMPUS_TNET_EXTENSIVE_CHECKS", "false");

/// Network options. Defaults come from environment parameters.
#[derive(Clone, Debug)]
pub struct TnetConfig {
    /// Re-validate the potential function after every propagation. Expensive;
    /// meant for debugging propagation order issues.
    pub extensive_checks: bool,
}

impl Default for TnetConfig {
    fn default() -> Self {
        TnetConfig {
            extensive_checks: TNET_EXTENSIVE_CHECKS.get(),
        }
    }
}

/// Per-timepoint state layered over the graph node.
#[derive(Debug)]
pub(crate) struct Timepoint {
    pub lower_bound: Time,
    pub upper_bound: Time,
    /// Distance from the optional reference timepoint.
    pub reftime: Time,
    /// Handle of the implicit origin->tp bounds constraint, owned by the
    /// bridge that mirrors an engine variable onto this timepoint.
    pub bound_tc: Option<TcKey>,
    /// When set, deleting this timepoint forces a full propagation.
    pub deletion_marker: bool,
    /// Leader of the zero-distance equivalence ring, if any.
    pub ring_leader: Option<NodeKey>,
    /// Followers, maintained on the leader only.
    pub ring_followers: Vec<NodeKey>,
}

impl Timepoint {
    fn new(reftime: Time) -> Self {
        Timepoint {
            lower_bound: NEG_INFINITY,
            upper_bound: POS_INFINITY,
            reftime,
            bound_tc: None,
            deletion_marker: true,
            ring_leader: None,
            ring_followers: Vec::new(),
        }
    }
}

/// A temporal constraint `lb <= foot - head <= ub`, realized as up to two
/// directed edges: head->foot of `ub` and foot->head of `-lb`. An unbounded
/// side inhibits its edge but the constraint persists.
#[derive(Debug)]
pub(crate) struct TemporalSpec {
    pub head: NodeKey,
    pub foot: NodeKey,
    pub lb: Time,
    pub ub: Time,
    pub edge_count: u8,
}

#[derive(Debug, Default, Clone, Copy)]
struct Stats {
    full_propagations: u64,
    inc_propagations: u64,
}

pub struct TemporalNetwork {
    config: TnetConfig,
    graph: DistanceGraph,
    tps: KeyMap<NodeKey, Timepoint>,
    constraints: Arena<TcKey, TemporalSpec>,
    origin: NodeKey,
    consistent: bool,
    has_deletions: bool,
    refpoint: Option<NodeKey>,
    updated_timepoints: BTreeSet<NodeKey>,
    stats: Stats,
}

impl Default for TemporalNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl TemporalNetwork {
    pub fn new() -> Self {
        Self::with_config(TnetConfig::default())
    }

    pub fn with_config(config: TnetConfig) -> Self {
        let mut net = TemporalNetwork {
            config,
            graph: DistanceGraph::new(),
            tps: KeyMap::default(),
            constraints: Arena::new(),
            origin: NodeKey::from_u32(0),
            consistent: true,
            has_deletions: false,
            refpoint: None,
            updated_timepoints: BTreeSet::new(),
            stats: Stats::default(),
        };
        let origin = net.add_timepoint();
        debug_assert_eq!(origin, net.origin);
        net.full_propagate();
        net
    }

    /// The potential function is valid when every edge satisfies
    /// `potential(to) <= potential(from) + length`; propagation relies on it
    /// for non-negative reduced costs.
    fn potential_valid(&self) -> bool {
        self.graph.edges.values().all(|e| {
            self.graph.nodes[e.to].potential <= self.graph.nodes[e.from].potential + e.length
        })
    }

    pub fn origin(&self) -> NodeKey {
        self.origin
    }

    pub fn is_consistent(&self) -> bool {
        self.consistent
    }

    pub fn num_timepoints(&self) -> usize {
        self.graph.num_nodes()
    }

    pub fn has_timepoint(&self, tp: NodeKey) -> bool {
        self.graph.has_node(tp)
    }

    pub fn has_constraint(&self, tc: TcKey) -> bool {
        self.constraints.contains(tc)
    }

    // ----- lifecycle -----

    pub fn add_timepoint(&mut self) -> NodeKey {
        let node = self.graph.create_node();
        let reftime = match self.refpoint {
            Some(rp) if self.graph.nodes[rp].in_edges.is_empty() => POS_INFINITY,
            Some(_) => NEG_INFINITY,
            None => 0,
        };
        self.tps.insert(node, Timepoint::new(reftime));
        node
    }

    pub fn delete_timepoint(&mut self, tp: NodeKey) {
        debug_assert!(self.has_timepoint(tp), "deleting an unknown timepoint");
        debug_assert!(tp != self.origin, "the origin is never deleted");
        self.has_deletions = self.has_deletions || self.tps[tp].deletion_marker;
        self.cleanup_teq(tp);
        self.updated_timepoints.remove(&tp);
        // removes every incident edge first
        self.graph.delete_node(tp);
        self.tps.remove(tp);
    }

    pub fn clear_deletion_marker(&mut self, tp: NodeKey) {
        self.tps[tp].deletion_marker = false;
    }

    fn check_bounds_validity(lb: Time, ub: Time) -> Result<(), Error> {
        if lb > ub {
            return Err(Error::InvalidOperation("empty temporal constraint interval"));
        }
        if (ub > MAX_LENGTH && ub < POS_INFINITY) || ub > POS_INFINITY || ub < MIN_LENGTH {
            return Err(Error::OutOfRange("temporal constraint upper bound in forbidden range"));
        }
        if (-lb > MAX_LENGTH && -lb < POS_INFINITY) || -lb > POS_INFINITY || -lb < MIN_LENGTH {
            return Err(Error::OutOfRange("temporal constraint lower bound in forbidden range"));
        }
        Ok(())
    }

    /// Registers `lb <= foot - head <= ub`. With `propagate` the addition is
    /// immediately propagated incrementally; a detected negative cycle leaves
    /// the network inconsistent with the nogood recoverable through
    /// [TemporalNetwork::nogood_edges].
    pub fn add_temporal_constraint(
        &mut self,
        head: NodeKey,
        foot: NodeKey,
        lb: Time,
        ub: Time,
        propagate: bool,
    ) -> Result<TcKey, Error> {
        let lb = map_to_internal_infinity(lb);
        let ub = map_to_internal_infinity(ub);
        Self::check_bounds_validity(lb, ub)?;
        if !self.has_timepoint(head) || !self.has_timepoint(foot) {
            return Err(Error::InvalidOperation("unknown timepoint in temporal constraint"));
        }
        if head == foot {
            return Err(Error::InvalidOperation("temporal constraint over a single timepoint"));
        }
        self.maintain_teq(lb, ub, head, foot);

        let mut edge_count = 0u8;
        if ub <= MAX_LENGTH {
            self.graph.add_edge_spec(head, foot, ub)?;
            edge_count += 1;
        }
        if lb >= MIN_LENGTH {
            self.graph.add_edge_spec(foot, head, -lb)?;
            edge_count += 1;
        }
        let tc = self.constraints.push(TemporalSpec {
            head,
            foot,
            lb,
            ub,
            edge_count,
        });
        if propagate {
            self.inc_propagate(head, foot);
        }
        Ok(tc)
    }

    /// Tightens a constraint in place; the new bounds must be at least as
    /// tight on both sides.
    pub fn narrow_temporal_constraint(&mut self, tc: TcKey, new_lb: Time, new_ub: Time) -> Result<(), Error> {
        let new_lb = map_to_internal_infinity(new_lb);
        let new_ub = map_to_internal_infinity(new_ub);
        Self::check_bounds_validity(new_lb, new_ub)?;
        let (head, foot, old_lb, old_ub) = {
            let sp = self
                .constraints
                .get(tc)
                .ok_or(Error::InvalidOperation("unknown temporal constraint"))?;
            (sp.head, sp.foot, sp.lb, sp.ub)
        };
        if new_lb < old_lb || new_ub > old_ub {
            return Err(Error::InvalidOperation("narrowed bounds must be tighter"));
        }
        self.maintain_teq(new_lb, new_ub, head, foot);

        let mut edge_count = self.constraints[tc].edge_count;
        if new_ub <= MAX_LENGTH {
            self.graph.add_edge_spec(head, foot, new_ub)?;
            edge_count += 1;
        }
        if new_lb >= MIN_LENGTH {
            self.graph.add_edge_spec(foot, head, -new_lb)?;
            edge_count += 1;
        }
        if old_ub <= MAX_LENGTH {
            self.graph.remove_edge_spec(head, foot, old_ub);
            edge_count -= 1;
        }
        if old_lb >= MIN_LENGTH {
            self.graph.remove_edge_spec(foot, head, -old_lb);
            edge_count -= 1;
        }
        {
            let sp = &mut self.constraints[tc];
            sp.lb = new_lb;
            sp.ub = new_ub;
            sp.edge_count = edge_count;
            debug_assert!(sp.edge_count <= 2);
        }
        if !self.has_deletions {
            self.inc_propagate(head, foot);
        }
        Ok(())
    }

    /// Removes a constraint's edges. With `mark_deleted` the next consistency
    /// query runs a full propagation (a deletion can only relax bounds, which
    /// incremental propagation cannot recover).
    pub fn remove_temporal_constraint(&mut self, tc: TcKey, mark_deleted: bool) {
        let Some(sp) = self.constraints.get(tc) else {
            debug_assert!(false, "removing an unknown temporal constraint");
            return;
        };
        let (head, foot, lb, ub) = (sp.head, sp.foot, sp.lb, sp.ub);
        if ub <= MAX_LENGTH {
            self.graph.remove_edge_spec(head, foot, ub);
        }
        if lb >= MIN_LENGTH {
            self.graph.remove_edge_spec(foot, head, -lb);
        }
        self.has_deletions = self.has_deletions || mark_deleted;
        self.constraints.remove(tc);
    }

    pub fn constraint_bounds(&self, tc: TcKey) -> (Time, Time) {
        let sp = &self.constraints[tc];
        (sp.lb, sp.ub)
    }

    pub fn constraint_scope(&self, tc: TcKey) -> (NodeKey, NodeKey) {
        let sp = &self.constraints[tc];
        (sp.head, sp.foot)
    }

    /// A constraint is complete when both of its edges are registered.
    pub fn constraint_is_complete(&self, tc: TcKey) -> bool {
        self.constraints[tc].edge_count == 2
    }

    pub fn bound_tc(&self, tp: NodeKey) -> Option<TcKey> {
        self.tps[tp].bound_tc
    }

    pub fn set_bound_tc(&mut self, tp: NodeKey, tc: Option<TcKey>) {
        self.tps[tp].bound_tc = tc;
    }

    // ----- consistency lifecycle -----

    /// Additions propagate eagerly, so an update is pending only after
    /// deletions.
    pub fn update_required(&self) -> bool {
        self.has_deletions
    }

    pub fn propagate(&mut self) -> bool {
        if self.update_required() {
            self.full_propagate();
        }
        self.consistent
    }

    fn set_consistency(&mut self, consistent: bool) {
        if !consistent && self.consistent {
            tracing::debug!("temporal network became inconsistent");
        }
        self.consistent = consistent;
    }

    fn note_update(&mut self, tp: NodeKey) {
        if tp != self.origin {
            self.updated_timepoints.insert(tp);
        }
    }

    pub fn updated_timepoints(&self) -> &BTreeSet<NodeKey> {
        &self.updated_timepoints
    }

    pub fn reset_updated_timepoints(&mut self) {
        self.updated_timepoints.clear();
    }

    pub(crate) fn full_propagate(&mut self) {
        tracing::debug!("temporal network full propagation");
        self.stats.full_propagations += 1;
        self.updated_timepoints.clear();
        let origin = self.origin;
        let updated = &mut self.updated_timepoints;
        let ok = self.graph.bellman_ford(|n| {
            if n != origin {
                updated.insert(n);
            }
        });
        self.set_consistency(ok);
        self.has_deletions = false;
        if !self.consistent {
            return;
        }

        // specialized Dijkstras refresh the lower/upper bounds from scratch
        let keys: Vec<NodeKey> = self.graph.nodes.keys().collect();
        for n in &keys {
            let tp = &mut self.tps[*n];
            tp.upper_bound = POS_INFINITY;
            tp.lower_bound = NEG_INFINITY;
        }
        self.tps[origin].upper_bound = 0;
        self.tps[origin].lower_bound = 0;
        self.graph.nodes[origin].depth = 0;

        self.graph.queue_reset();
        self.graph.queue_insert(origin, 0);
        self.inc_dijkstra_forward();
        self.graph.queue_insert(origin, 0);
        self.inc_dijkstra_backward();

        if let Some(rp) = self.refpoint {
            let initref = if self.graph.nodes[rp].in_edges.is_empty() {
                POS_INFINITY
            } else {
                NEG_INFINITY
            };
            for n in &keys {
                self.tps[*n].reftime = initref;
            }
            self.tps[rp].reftime = 0;
            self.graph.nodes[rp].depth = 0;
            self.graph.queue_insert(rp, 0);
            if initref == POS_INFINITY {
                self.inc_dijkstra_reftime();
            } else {
                self.inc_dijkstra_ref_back();
            }
        }
        if self.config.extensive_checks {
            assert!(self.potential_valid(), "invalid potential function after full propagation");
        }
    }

    /// First-hop propagation of an added or narrowed constraint, determining
    /// the direction in which it is effective.
    fn start_node(
        &mut self,
        head: NodeKey,
        head_distance: Time,
        foot: NodeKey,
        foot_distance: Time,
        forwards: bool,
    ) -> Option<(NodeKey, Time)> {
        let (from, to) = if forwards { (head, foot) } else { (foot, head) };
        if let Some(e) = self.graph.find_edge(from, to) {
            let length = self.graph.edge(e).length;
            if head_distance < POS_INFINITY && head_distance + length < foot_distance {
                self.graph.nodes[head].depth = 0;
                self.graph.nodes[foot].depth = 1;
                return Some((foot, head_distance + length));
            }
        }
        // propagation, if any, goes the other way
        if let Some(e) = self.graph.find_edge(to, from) {
            let length = self.graph.edge(e).length;
            if foot_distance < POS_INFINITY && foot_distance + length < head_distance {
                self.graph.nodes[foot].depth = 0;
                self.graph.nodes[head].depth = 1;
                return Some((head, foot_distance + length));
            }
        }
        None
    }

    fn inc_propagate(&mut self, src: NodeKey, targ: NodeKey) {
        // after a deletion or in an inconsistent network the next consistency
        // check performs a full propagation instead
        if self.has_deletions || !self.consistent {
            return;
        }
        self.stats.inc_propagations += 1;
        self.graph.queue_reset();

        let head_pot = self.graph.nodes[src].potential;
        let foot_pot = self.graph.nodes[targ].potential;
        if let Some((next, dist)) = self.start_node(src, head_pot, targ, foot_pot, true) {
            let start = if next == src { targ } else { src };
            let pred = self.graph.find_edge(start, next);
            self.graph.nodes[next].potential = dist;
            self.graph.nodes[next].predecessor = pred;
            self.note_update(next);
            self.graph.queue_insert(next, 0);
            let origin = self.origin;
            let updated = &mut self.updated_timepoints;
            let ok = self.graph.inc_bellman_ford(Some(start), |n| {
                if n != origin {
                    updated.insert(n);
                }
            });
            self.set_consistency(ok);
        }
        if !self.consistent {
            return;
        }

        // refresh upper bounds
        self.graph.queue_reset();
        let h = self.tps[src].upper_bound;
        let f = self.tps[targ].upper_bound;
        if let Some((next, dist)) = self.start_node(src, h, targ, f, true) {
            self.tps[next].upper_bound = dist;
            self.note_update(next);
            self.graph.queue_insert(next, 0);
            self.inc_dijkstra_forward();
        }

        // lower bounds propagate backwards over negated distances
        self.graph.queue_reset();
        let h = -self.tps[src].lower_bound;
        let f = -self.tps[targ].lower_bound;
        if let Some((next, dist)) = self.start_node(src, h, targ, f, false) {
            self.tps[next].lower_bound = -dist;
            self.note_update(next);
            self.graph.queue_insert(next, 0);
            self.inc_dijkstra_backward();
        }

        if let Some(rp) = self.refpoint {
            self.graph.queue_reset();
            if self.graph.nodes[rp].in_edges.is_empty() {
                let h = self.tps[src].reftime;
                let f = self.tps[targ].reftime;
                if let Some((next, dist)) = self.start_node(src, h, targ, f, true) {
                    self.tps[next].reftime = dist;
                    self.note_update(next);
                    self.graph.queue_insert(next, 0);
                    self.inc_dijkstra_reftime();
                }
            } else {
                let h = -self.tps[src].reftime;
                let f = -self.tps[targ].reftime;
                if let Some((next, dist)) = self.start_node(src, h, targ, f, false) {
                    self.tps[next].reftime = -dist;
                    self.note_update(next);
                    self.graph.queue_insert(next, 0);
                    self.inc_dijkstra_ref_back();
                }
            }
        }
        if self.config.extensive_checks {
            assert!(self.potential_valid(), "invalid potential function after propagation");
        }
    }

    fn inc_dijkstra_forward(&mut self) {
        let bf_bound = self.graph.num_nodes();
        while let Some(node) = self.graph.queue_pop() {
            let node_ub = self.tps[node].upper_bound;
            let node_depth = self.graph.nodes[node].depth;
            let out_count = self.graph.nodes[node].out_edges.len();
            for i in 0..out_count {
                let e = self.graph.nodes[node].out_edges[i];
                let (next, length) = {
                    let edge = self.graph.edge(e);
                    (edge.to, edge.length)
                };
                let new_distance = node_ub + length;
                if new_distance < self.tps[next].upper_bound {
                    debug_assert!(
                        (MIN_DISTANCE..=MAX_DISTANCE).contains(&new_distance),
                        "upper bound out of range"
                    );
                    self.tps[next].upper_bound = new_distance;
                    self.graph.nodes[next].depth = node_depth + 1;
                    debug_assert!(self.graph.nodes[next].depth <= bf_bound);
                    // priority key from Johnson's reweighting
                    let key = new_distance - self.graph.nodes[next].potential;
                    self.graph.queue_insert(next, key);
                    self.note_update(next);
                }
            }
        }
    }

    fn inc_dijkstra_backward(&mut self) {
        let bf_bound = self.graph.num_nodes();
        while let Some(node) = self.graph.queue_pop() {
            let node_dist = -self.tps[node].lower_bound;
            let node_depth = self.graph.nodes[node].depth;
            let in_count = self.graph.nodes[node].in_edges.len();
            for i in 0..in_count {
                let e = self.graph.nodes[node].in_edges[i];
                let (next, length) = {
                    let edge = self.graph.edge(e);
                    (edge.from, edge.length)
                };
                let new_distance = node_dist + length;
                if new_distance < -self.tps[next].lower_bound {
                    debug_assert!(
                        (MIN_DISTANCE..=MAX_DISTANCE).contains(&new_distance),
                        "lower bound out of range"
                    );
                    self.tps[next].lower_bound = -new_distance;
                    self.graph.nodes[next].depth = node_depth + 1;
                    debug_assert!(self.graph.nodes[next].depth <= bf_bound);
                    // backward propagation keys on distance plus potential
                    let key = new_distance + self.graph.nodes[next].potential;
                    self.graph.queue_insert(next, key);
                    self.note_update(next);
                }
            }
        }
    }

    fn inc_dijkstra_reftime(&mut self) {
        let bf_bound = self.graph.num_nodes();
        while let Some(node) = self.graph.queue_pop() {
            let node_ref = self.tps[node].reftime;
            let node_depth = self.graph.nodes[node].depth;
            let out_count = self.graph.nodes[node].out_edges.len();
            for i in 0..out_count {
                let e = self.graph.nodes[node].out_edges[i];
                let (next, length) = {
                    let edge = self.graph.edge(e);
                    (edge.to, edge.length)
                };
                let new_distance = node_ref + length;
                if new_distance < self.tps[next].reftime {
                    debug_assert!((MIN_DISTANCE..=MAX_DISTANCE).contains(&new_distance));
                    self.tps[next].reftime = new_distance;
                    self.graph.nodes[next].depth = node_depth + 1;
                    debug_assert!(self.graph.nodes[next].depth <= bf_bound);
                    let key = new_distance - self.graph.nodes[next].potential;
                    self.graph.queue_insert(next, key);
                    self.note_update(next);
                }
            }
        }
    }

    fn inc_dijkstra_ref_back(&mut self) {
        let bf_bound = self.graph.num_nodes();
        while let Some(node) = self.graph.queue_pop() {
            let node_dist = -self.tps[node].reftime;
            let node_depth = self.graph.nodes[node].depth;
            let in_count = self.graph.nodes[node].in_edges.len();
            for i in 0..in_count {
                let e = self.graph.nodes[node].in_edges[i];
                let (next, length) = {
                    let edge = self.graph.edge(e);
                    (edge.from, edge.length)
                };
                let new_distance = node_dist + length;
                if new_distance < -self.tps[next].reftime {
                    debug_assert!((MIN_DISTANCE..=MAX_DISTANCE).contains(&new_distance));
                    self.tps[next].reftime = -new_distance;
                    self.graph.nodes[next].depth = node_depth + 1;
                    debug_assert!(self.graph.nodes[next].depth <= bf_bound);
                    let key = new_distance + self.graph.nodes[next].potential;
                    self.graph.queue_insert(next, key);
                    self.note_update(next);
                }
            }
        }
    }

    // ----- bounds & distance queries -----

    /// Propagates if needed; under inconsistency returns the sentinel empty
    /// interval (2, -2), so callers wanting unambiguous reads test consistency
    /// first.
    pub fn timepoint_bounds(&mut self, tp: NodeKey) -> (Time, Time) {
        self.propagate();
        debug_assert!(self.has_timepoint(tp));
        if self.consistent {
            let t = &self.tps[tp];
            (t.lower_bound, t.upper_bound)
        } else {
            (2, -2)
        }
    }

    /// Bounds as of the last propagation, without enforcing consistency.
    pub fn last_timepoint_bounds(&self, tp: NodeKey) -> (Time, Time) {
        let t = &self.tps[tp];
        (t.lower_bound, t.upper_bound)
    }

    pub fn reftime(&self, tp: NodeKey) -> Time {
        self.tps[tp].reftime
    }

    /// Installs (or clears) the reference timepoint for reftime propagation.
    pub fn set_reference_timepoint(&mut self, tp: Option<NodeKey>) {
        self.refpoint = tp;
        self.full_propagate();
    }

    /// `dist(from, to) < bound`, on a consistent network.
    pub fn is_distance_less_than(&mut self, from: NodeKey, to: NodeKey, bound: Time) -> bool {
        self.propagate();
        debug_assert!(self.consistent, "distance query on an inconsistent network");
        self.graph.is_distance_less_than(from, to, bound)
    }

    pub fn is_distance_less_than_or_equal(&mut self, from: NodeKey, to: NodeKey, bound: Time) -> bool {
        self.is_distance_less_than(from, to, bound + crate::temporal::graph::TIME_TICK)
    }

    /// Cheap approximation of [TemporalNetwork::is_distance_less_than]:
    /// filters on potentials and lower bounds only, erring on the permissive
    /// side.
    pub fn is_distance_possibly_less_than(&mut self, src: NodeKey, dest: NodeKey, bound: Time) -> bool {
        self.propagate();
        debug_assert!(self.consistent);
        debug_assert!(bound >= MIN_DISTANCE);
        // potentials are always finite, so an infinite bound safely fails this
        if self.graph.nodes[dest].potential >= self.graph.nodes[src].potential + bound {
            return false;
        }
        let dest_lb = self.tps[dest].lower_bound;
        if dest_lb >= MIN_DISTANCE {
            // there is a path from dest to the origin
            let src_lb = self.tps[src].lower_bound;
            if src_lb == NEG_INFINITY {
                return false; // then there can be no path from src to dest
            }
            if dest_lb >= src_lb + bound {
                return false;
            }
        }
        true
    }

    /// Distance bounds between two timepoints: exact via two Dijkstras, or
    /// approximate from the direct edges.
    pub fn calc_distance_bounds(&mut self, src: NodeKey, targ: NodeKey, exact: bool) -> (Time, Time) {
        self.propagate();
        if !self.consistent {
            return (2, -2);
        }
        if !exact {
            let ub = match self.graph.find_edge(src, targ) {
                Some(e) => self.graph.edge(e).length,
                None => POS_INFINITY,
            };
            let lb = match self.graph.find_edge(targ, src) {
                Some(e) => -self.graph.edge(e).length,
                None => NEG_INFINITY,
            };
            return (lb, ub);
        }
        self.graph.dijkstra(src, Some(targ));
        let ub = self.graph.distance(targ);
        self.graph.dijkstra(targ, Some(src));
        let lb = -self.graph.distance(src);
        (lb, ub)
    }

    /// Batched exact distance bounds: treats `src` as the origin for one
    /// four-Dijkstra pass instead of `2 * targs.len()` runs, then restores the
    /// proper bounds.
    pub fn calc_distance_bounds_many(&mut self, src: NodeKey, targs: &[NodeKey]) -> Vec<(Time, Time)> {
        self.propagate();
        if !self.consistent {
            return targs.iter().map(|_| (2, -2)).collect();
        }
        self.propagate_bounds_from(src);
        let result = targs
            .iter()
            .map(|&t| (self.tps[t].lower_bound, self.tps[t].upper_bound))
            .collect();
        let origin = self.origin;
        self.propagate_bounds_from(origin);
        result
    }

    fn propagate_bounds_from(&mut self, src: NodeKey) {
        let keys: Vec<NodeKey> = self.graph.nodes.keys().collect();
        for n in keys {
            let tp = &mut self.tps[n];
            tp.upper_bound = POS_INFINITY;
            tp.lower_bound = NEG_INFINITY;
        }
        self.tps[src].upper_bound = 0;
        self.tps[src].lower_bound = 0;
        self.graph.nodes[src].depth = 0;
        self.graph.queue_reset();
        self.graph.queue_insert(src, 0);
        self.inc_dijkstra_forward();
        self.graph.queue_insert(src, 0);
        self.inc_dijkstra_backward();
    }

    /// Per-target distance bounds whose signs alone decide precedence; uses
    /// two bounded Dijkstras instead of `2 * targs.len()` exact runs.
    pub fn calc_distance_signs(&mut self, src: NodeKey, targs: &[NodeKey]) -> Vec<(Time, Time)> {
        self.propagate();
        debug_assert!(self.consistent, "distance signs on an inconsistent network");
        if targs.is_empty() {
            return Vec::new();
        }
        let mut min_potential = POS_INFINITY;
        let mut max_potential = NEG_INFINITY;
        for &t in targs {
            min_potential = min_potential.min(self.graph.nodes[t].potential);
            max_potential = max_potential.max(self.graph.nodes[t].potential);
        }
        let mut lbs = vec![-1; targs.len()];
        let mut ubs = vec![1; targs.len()];

        self.graph.bounded_dijkstra_forward(src, 1, min_potential);
        for (i, &t) in targs.iter().enumerate() {
            let d = self.graph.distance(t);
            if d < POS_INFINITY {
                ubs[i] = d;
            }
        }
        self.graph.bounded_dijkstra_backward(src, 1, max_potential);
        for (i, &t) in targs.iter().enumerate() {
            let d = self.graph.distance(t);
            if d < POS_INFINITY {
                lbs[i] = -d;
            }
        }
        for i in 0..targs.len() {
            debug_assert!(lbs[i] < 0 || ubs[i] >= 0, "distance sign ub anomaly");
            debug_assert!(ubs[i] > 0 || lbs[i] <= 0, "distance sign lb anomaly");
        }
        lbs.into_iter().zip(ubs).collect()
    }

    /// Exposes plain single-source propagation for callers computing many
    /// distances from one node (minimal-perturbation scheduling).
    pub fn dijkstra_from(&mut self, src: NodeKey) {
        self.graph.dijkstra(src, None);
    }

    /// Distance computed by the latest [TemporalNetwork::dijkstra_from].
    pub fn distance(&self, n: NodeKey) -> Time {
        self.graph.distance(n)
    }

    pub fn has_edge_to_origin(&self, tp: NodeKey) -> bool {
        self.graph.find_edge(tp, self.origin).is_some()
    }

    /// The edges of the recorded negative cycle, empty when consistent.
    pub fn nogood_edges(&mut self) -> Vec<(NodeKey, NodeKey, Time)> {
        if self.propagate() {
            return Vec::new();
        }
        self.graph
            .nogood()
            .iter()
            .map(|&e| {
                let edge = self.graph.edge(e);
                (edge.from, edge.to, edge.length)
            })
            .collect()
    }

    /// The timepoints behind the recorded inconsistency.
    pub fn inconsistency_reason(&self) -> Vec<NodeKey> {
        debug_assert!(!self.consistent, "no inconsistency to explain");
        self.graph.nogood().iter().map(|&e| self.graph.edge(e).to).collect()
    }

    // ----- zero-distance equivalence rings -----

    /// On a [0,0] constraint, makes one endpoint the ring leader and enrolls
    /// the other. Merging two established rings is beyond this mechanism, and
    /// deletions may degrade ring integrity; a full propagation restores
    /// correct bounds regardless.
    fn maintain_teq(&mut self, lb: Time, ub: Time, src: NodeKey, targ: NodeKey) {
        if lb != 0 || ub != 0 {
            return;
        }
        if self.tps[targ].ring_leader.is_none() && self.tps[src].ring_leader.is_none() {
            self.tps[src].ring_leader = Some(src);
        }
        if self.tps[targ].ring_leader.is_none() {
            let leader = self.tps[src].ring_leader.expect("source has a leader here");
            self.tps[targ].ring_leader = Some(leader);
            self.tps[leader].ring_followers.push(targ);
        }
        if self.tps[src].ring_leader.is_none() {
            let leader = self.tps[targ].ring_leader.expect("target has a leader here");
            self.tps[src].ring_leader = Some(leader);
            self.tps[leader].ring_followers.push(src);
        }
    }

    fn cleanup_teq(&mut self, tp: NodeKey) {
        match self.tps[tp].ring_leader {
            Some(leader) if leader == tp => {
                let followers = std::mem::take(&mut self.tps[tp].ring_followers);
                for f in followers {
                    self.tps[f].ring_leader = None;
                }
                self.tps[tp].ring_leader = None;
            }
            Some(leader) => {
                self.tps[leader].ring_followers.retain(|&f| f != tp);
                self.tps[tp].ring_leader = None;
            }
            None => {}
        }
    }

    /// The ring leader, the timepoint itself for a trivial ring.
    pub fn ring_leader(&self, tp: NodeKey) -> NodeKey {
        self.tps[tp].ring_leader.unwrap_or(tp)
    }

    pub fn ring_followers(&self, tp: NodeKey) -> Vec<NodeKey> {
        match self.tps[tp].ring_leader {
            Some(leader) => self.tps[leader].ring_followers.clone(),
            None => Vec::new(),
        }
    }

    /// Enabling predecessors of the ring: targets of negative out-edges, plus
    /// zero-length targets outside the ring.
    pub fn ring_predecessors(&self, tp: NodeKey) -> Vec<NodeKey> {
        let leader = self.ring_leader(tp);
        let mut out = Vec::new();
        for &e in &self.graph.nodes[leader].out_edges {
            let edge = self.graph.edge(e);
            if edge.length < 0 {
                out.push(edge.to);
            } else if edge.length == 0 && self.tps[edge.to].ring_leader != Some(leader) {
                out.push(edge.to);
            }
        }
        out
    }

    pub fn print_stats(&self) {
        println!("# timepoints: {}", self.num_timepoints());
        println!("# temporal constraints: {}", self.constraints.len());
        println!("# full propagations: {}", self.stats.full_propagations);
        println!("# incremental propagations: {}", self.stats.inc_propagations);
    }
}
