//! A directed graph with weighted edges and the single-source shortest-path
//! machinery shared by the temporal network: full and incremental
//! Bellman-Ford over node potentials, bounded bidirectional Dijkstra, and a
//! marked reachability probe for distance queries.

use hashbrown::HashMap;

use crate::collections::heap::{BucketQueue, Dqueue};
use crate::collections::store::Arena;
use crate::create_key_type;
use crate::Error;

/// Scalar time. Edge lengths and node distances both use it; the limits below
/// keep their sums representable.
pub type Time = i64;

/// Largest finite time value.
pub const TIME_MAX: Time = crate::domain::INFINITY - 1;
pub const TIME_MIN: Time = -TIME_MAX;

/// Granularity of the time scale: `x <= y` iff `x < y + TIME_TICK`.
pub const TIME_TICK: Time = 1;

/// Limits on edge lengths and propagated distances. Half the finite range, so
/// that adding an acceptable length to an acceptable distance can never
/// overflow; only stored node distances need checking, not every transient
/// sum.
pub const MAX_LENGTH: Time = TIME_MAX / 2;
pub const MIN_LENGTH: Time = -MAX_LENGTH;
pub const MAX_DISTANCE: Time = TIME_MAX / 2;
pub const MIN_DISTANCE: Time = -MAX_DISTANCE;

/// Unbounded sentinels, symmetric under negation, with `POS_INFINITY + 1`
/// still representable.
pub const POS_INFINITY: Time = MAX_DISTANCE + 1;
pub const NEG_INFINITY: Time = -POS_INFINITY;

/// Clamps an externally-supplied time onto the internal sentinels.
pub fn map_to_internal_infinity(t: Time) -> Time {
    t.clamp(NEG_INFINITY, POS_INFINITY)
}

create_key_type!(pub NodeKey);
create_key_type!(pub EdgeKey);

#[derive(Debug)]
pub(crate) struct GraphNode {
    pub out_edges: Vec<EdgeKey>,
    pub in_edges: Vec<EdgeKey>,
    /// Distance from the source of the current propagation.
    pub distance: Time,
    /// Distance from the Johnson-style external source; admissible heuristic
    /// for the bounded Dijkstra variants.
    pub potential: Time,
    /// Propagation depth, tested against the Bellman-Ford limit.
    pub depth: usize,
    /// Last edge that updated this node; traces nogoods.
    pub predecessor: Option<EdgeKey>,
    /// Obsoletable mark (valid iff equal to the graph's current mark).
    mark: u64,
    /// Dijkstra run that last wrote `distance`.
    pub generation: u64,
}

impl GraphNode {
    fn new() -> Self {
        GraphNode {
            out_edges: Vec::new(),
            in_edges: Vec::new(),
            distance: 0,
            potential: 0,
            depth: 0,
            predecessor: None,
            mark: 0,
            generation: 0,
        }
    }
}

/// An edge aggregates every constraint between the same ordered node pair: the
/// effective length is the minimum of `length_specs`, and the edge lives as
/// long as one spec remains.
#[derive(Debug)]
pub(crate) struct GraphEdge {
    pub from: NodeKey,
    pub to: NodeKey,
    pub length: Time,
    pub length_specs: Vec<Time>,
}

pub struct DistanceGraph {
    pub(crate) nodes: Arena<NodeKey, GraphNode>,
    pub(crate) edges: Arena<EdgeKey, GraphEdge>,
    edge_map: HashMap<(NodeKey, NodeKey), EdgeKey>,
    pub(crate) queue: BucketQueue<NodeKey, Time>,
    worklist: Dqueue<NodeKey>,
    /// Edges of the most recently detected negative cycle.
    pub(crate) nogood: Vec<EdgeKey>,
    /// Current value of the obsoletable node mark, scoped to this graph.
    mark: u64,
    /// Dijkstra generation counter, scoped to this graph.
    pub(crate) generation: u64,
}

impl Default for DistanceGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceGraph {
    pub fn new() -> Self {
        DistanceGraph {
            nodes: Arena::new(),
            edges: Arena::new(),
            edge_map: HashMap::new(),
            queue: BucketQueue::new(),
            worklist: Dqueue::new(),
            nogood: Vec::new(),
            mark: 1,
            generation: 0,
        }
    }

    pub fn create_node(&mut self) -> NodeKey {
        self.nodes.push(GraphNode::new())
    }

    pub fn has_node(&self, n: NodeKey) -> bool {
        self.nodes.contains(n)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Removes the node and every incident edge.
    pub fn delete_node(&mut self, n: NodeKey) {
        debug_assert!(self.has_node(n), "deleting a node outside this graph");
        let incident: Vec<EdgeKey> = self.nodes[n]
            .out_edges
            .iter()
            .chain(self.nodes[n].in_edges.iter())
            .copied()
            .collect();
        for e in incident {
            self.delete_edge(e);
        }
        self.nodes.remove(n);
    }

    pub fn find_edge(&self, from: NodeKey, to: NodeKey) -> Option<EdgeKey> {
        self.edge_map.get(&(from, to)).copied()
    }

    pub(crate) fn edge(&self, e: EdgeKey) -> &GraphEdge {
        &self.edges[e]
    }

    fn create_edge(&mut self, from: NodeKey, to: NodeKey, length: Time) -> EdgeKey {
        debug_assert!(self.has_node(from) && self.has_node(to));
        let e = self.edges.push(GraphEdge {
            from,
            to,
            length,
            length_specs: Vec::new(),
        });
        self.nodes[from].out_edges.push(e);
        self.nodes[to].in_edges.push(e);
        self.edge_map.insert((from, to), e);
        e
    }

    fn delete_edge(&mut self, e: EdgeKey) {
        let (from, to) = {
            let edge = &self.edges[e];
            (edge.from, edge.to)
        };
        self.nodes[from].out_edges.retain(|&x| x != e);
        self.nodes[to].in_edges.retain(|&x| x != e);
        self.edge_map.remove(&(from, to));
        self.edges.remove(e);
    }

    /// Registers one constraint of `length` on the `from -> to` edge, creating
    /// the edge as needed. The effective length is the minimum registered.
    pub fn add_edge_spec(&mut self, from: NodeKey, to: NodeKey, length: Time) -> Result<(), Error> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
            return Err(Error::OutOfRange("edge length outside the representable range"));
        }
        let e = match self.find_edge(from, to) {
            Some(e) => e,
            None => self.create_edge(from, to, length),
        };
        let edge = &mut self.edges[e];
        edge.length_specs.push(length);
        if length < edge.length {
            edge.length = length;
        }
        Ok(())
    }

    /// Removes one occurrence of `length` from the edge's specs; the edge is
    /// deleted when no spec remains.
    pub fn remove_edge_spec(&mut self, from: NodeKey, to: NodeKey, length: Time) {
        let Some(e) = self.find_edge(from, to) else {
            debug_assert!(false, "removing a spec from a non-existent edge");
            return;
        };
        let edge = &mut self.edges[e];
        if let Some(pos) = edge.length_specs.iter().position(|&l| l == length) {
            edge.length_specs.remove(pos);
        } else {
            debug_assert!(false, "removing an unregistered spec");
        }
        if edge.length_specs.is_empty() {
            self.delete_edge(e);
        } else {
            edge.length = *edge.length_specs.iter().min().unwrap();
        }
    }

    // ----- marks and queue plumbing -----

    /// Invalidates every node mark in O(1).
    pub(crate) fn unmark_all(&mut self) {
        self.mark += 1;
    }

    pub(crate) fn mark(&mut self, n: NodeKey) {
        self.nodes[n].mark = self.mark;
    }

    pub(crate) fn is_marked(&self, n: NodeKey) -> bool {
        self.nodes[n].mark == self.mark
    }

    fn unmark(&mut self, n: NodeKey) {
        self.nodes[n].mark = self.mark.wrapping_sub(1);
    }

    /// Enqueues with an explicit priority key; the mark records queue
    /// membership so stale duplicate entries are discarded on pop.
    pub(crate) fn queue_insert(&mut self, n: NodeKey, key: Time) {
        self.mark(n);
        self.queue.insert(n, key);
    }

    /// Pops the marked node with the smallest key, skipping superseded entries.
    pub(crate) fn queue_pop(&mut self) -> Option<NodeKey> {
        while let Some((n, _)) = self.queue.pop() {
            if self.nodes.contains(n) && self.is_marked(n) {
                self.unmark(n);
                return Some(n);
            }
        }
        None
    }

    pub(crate) fn queue_reset(&mut self) {
        self.queue.clear();
        self.unmark_all();
    }

    // ----- Bellman-Ford -----

    /// Full propagation of node potentials from scratch, seeding the queue
    /// with the change against the previous potential so stronger updates run
    /// first. Returns false on a negative cycle (traced into the nogood).
    pub fn bellman_ford(&mut self, mut on_update: impl FnMut(NodeKey)) -> bool {
        self.queue_reset();
        let keys: Vec<NodeKey> = self.nodes.keys().collect();
        for n in keys {
            let node = &mut self.nodes[n];
            let old_potential = node.potential;
            // stash the previous potential for delta priorities
            node.distance = old_potential;
            node.potential = 0;
            node.depth = 0;
            self.queue_insert(n, -old_potential);
        }
        self.bf_relax_loop(None, false, &mut on_update)
    }

    /// Incremental propagation from a pre-seeded queue. A propagation
    /// returning to `incremental_source` proves a negative cycle through the
    /// newly added edge.
    pub fn inc_bellman_ford(
        &mut self,
        incremental_source: Option<NodeKey>,
        mut on_update: impl FnMut(NodeKey),
    ) -> bool {
        self.generation += 1;
        self.bf_relax_loop(incremental_source, true, &mut on_update)
    }

    fn bf_relax_loop(
        &mut self,
        incremental_source: Option<NodeKey>,
        generation_stash: bool,
        on_update: &mut impl FnMut(NodeKey),
    ) -> bool {
        let bf_bound = self.nodes.len();
        while let Some(n) = self.queue_pop() {
            let node_potential = self.nodes[n].potential;
            let node_depth = self.nodes[n].depth;
            let out_count = self.nodes[n].out_edges.len();
            for i in 0..out_count {
                let e = self.nodes[n].out_edges[i];
                let (next, length) = {
                    let edge = &self.edges[e];
                    (edge.to, edge.length)
                };
                let potential = node_potential + length;
                if potential < self.nodes[next].potential {
                    debug_assert!(potential >= MIN_DISTANCE, "potential underflow");
                    let old_potential = if generation_stash {
                        // lazily stash the pre-propagation potential, once per run
                        if self.nodes[next].generation < self.generation {
                            self.nodes[next].generation = self.generation;
                            self.nodes[next].distance = self.nodes[next].potential;
                        }
                        self.nodes[next].distance
                    } else {
                        self.nodes[next].distance
                    };
                    let node_mut = &mut self.nodes[next];
                    node_mut.potential = potential;
                    node_mut.predecessor = Some(e);
                    node_mut.depth = node_depth + 1;
                    on_update(next);
                    if node_mut.depth > bf_bound || incremental_source == Some(next) {
                        self.update_nogood_list(next);
                        return false;
                    }
                    // stronger propagations first: priority is the change in potential
                    self.queue_insert(next, potential - old_potential);
                }
            }
        }
        true
    }

    // ----- Dijkstra -----

    /// Single-source shortest paths over `distance`, stopping early at
    /// `destination` when given. Distances are valid until the next run; read
    /// them with [DistanceGraph::distance].
    pub fn dijkstra(&mut self, source: NodeKey, destination: Option<NodeKey>) {
        debug_assert!(self.has_node(source));
        self.generation += 1;
        let generation = self.generation;
        {
            let s = &mut self.nodes[source];
            s.distance = 0;
            s.depth = 0;
            s.generation = generation;
        }
        self.queue_reset();
        let key = self.nodes[source].distance - self.nodes[source].potential;
        self.queue_insert(source, key);
        let bf_bound = self.nodes.len();
        while let Some(n) = self.queue_pop() {
            if Some(n) == destination {
                return;
            }
            let node_distance = self.nodes[n].distance;
            let node_depth = self.nodes[n].depth;
            let out_count = self.nodes[n].out_edges.len();
            for i in 0..out_count {
                let e = self.nodes[n].out_edges[i];
                let (next, length) = {
                    let edge = &self.edges[e];
                    (edge.to, edge.length)
                };
                let new_distance = node_distance + length;
                if new_distance > MAX_DISTANCE {
                    continue;
                }
                let next_node = &mut self.nodes[next];
                if next_node.generation < generation || new_distance < next_node.distance {
                    debug_assert!(new_distance >= MIN_DISTANCE, "distance underflow");
                    next_node.generation = generation;
                    next_node.distance = new_distance;
                    next_node.predecessor = Some(e);
                    next_node.depth = node_depth + 1;
                    debug_assert!(next_node.depth <= bf_bound, "propagation in an inconsistent graph");
                    let key = new_distance - self.nodes[next].potential;
                    self.queue_insert(next, key);
                }
            }
        }
    }

    /// Distance computed by the most recent [DistanceGraph::dijkstra] run, or
    /// `POS_INFINITY` when the node was not reached.
    pub fn distance(&self, n: NodeKey) -> Time {
        let node = &self.nodes[n];
        if node.generation == self.generation {
            node.distance
        } else {
            POS_INFINITY
        }
    }

    /// Bounded Dijkstra over out-edges: only reaches nodes strictly closer
    /// than `bound`, pruned by the potential-based to-go estimate.
    pub fn bounded_dijkstra_forward(&mut self, source: NodeKey, bound: Time, min_potential: Time) {
        self.bounded_dijkstra(source, bound, min_potential, 1)
    }

    /// Bounded Dijkstra over in-edges (reversed direction).
    pub fn bounded_dijkstra_backward(&mut self, source: NodeKey, bound: Time, max_potential: Time) {
        self.bounded_dijkstra(source, bound, max_potential, -1)
    }

    fn bounded_dijkstra(&mut self, source: NodeKey, bound: Time, dest_potential: Time, direction: i64) {
        debug_assert!(self.has_node(source));
        self.generation += 1;
        let generation = self.generation;
        {
            let s = &mut self.nodes[source];
            s.distance = 0;
            s.depth = 0;
            s.generation = generation;
        }
        self.queue_reset();
        self.queue_insert(source, 0);
        let bf_bound = self.nodes.len();
        while let Some(n) = self.queue_pop() {
            let node_distance = self.nodes[n].distance;
            let node_depth = self.nodes[n].depth;
            let count = if direction == -1 {
                self.nodes[n].in_edges.len()
            } else {
                self.nodes[n].out_edges.len()
            };
            for i in 0..count {
                let e = if direction == -1 {
                    self.nodes[n].in_edges[i]
                } else {
                    self.nodes[n].out_edges[i]
                };
                let (next, length) = {
                    let edge = &self.edges[e];
                    (if direction == -1 { edge.from } else { edge.to }, edge.length)
                };
                let new_distance = node_distance + length;

                // admissible estimate of the remaining distance to go
                let to_go = direction * (dest_potential - self.nodes[next].potential);
                if new_distance + to_go >= bound {
                    continue;
                }

                let next_node = &mut self.nodes[next];
                if next_node.generation < generation || new_distance < next_node.distance {
                    debug_assert!((MIN_DISTANCE..=MAX_DISTANCE).contains(&new_distance));
                    next_node.generation = generation;
                    next_node.distance = new_distance;
                    next_node.depth = node_depth + 1;
                    debug_assert!(next_node.depth <= bf_bound, "propagation in an inconsistent graph");
                    self.queue_insert(next, new_distance + to_go);
                }
            }
        }
    }

    // ----- distance queries -----

    /// `dist(src, targ) < bound`, decided by simulating the propagation that
    /// adding a `targ -> src` edge of `-bound` would cause: that edge closes a
    /// negative cycle iff the distance is under the bound, so it suffices to
    /// check whether the simulated propagation reaches `targ`.
    pub fn is_distance_less_than(&mut self, src: NodeKey, targ: NodeKey, bound: Time) -> bool {
        debug_assert!(self.has_node(src) && self.has_node(targ));
        self.unmark_all();
        let new_potential = self.nodes[targ].potential - bound;
        if bound == 1 {
            // zero-duration checks: the all-zero-path approximation is enough
            return self.all_zero_propagation_path(src, targ, new_potential);
        }
        self.propagation_path(src, targ, new_potential)
    }

    fn all_zero_propagation_path(&mut self, node: NodeKey, targ: NodeKey, potential: Time) -> bool {
        if potential >= self.nodes[node].potential {
            return false; // propagation is ineffective
        }
        if node == targ {
            return true;
        }
        if self.is_marked(node) {
            return false;
        }
        self.mark(node);
        let out_count = self.nodes[node].out_edges.len();
        for i in 0..out_count {
            let e = self.nodes[node].out_edges[i];
            let (to, length) = {
                let edge = &self.edges[e];
                (edge.to, edge.length)
            };
            if length == 0 && self.all_zero_propagation_path(to, targ, potential) {
                return true;
            }
        }
        false
    }

    /// Marked worklist search. An approximation: marking can suppress a later,
    /// stronger propagation across an already-visited node, which is accepted
    /// by the zigzag-check callers.
    fn propagation_path(&mut self, src: NodeKey, targ: NodeKey, potential: Time) -> bool {
        if potential >= self.nodes[src].potential {
            return false;
        }
        self.mark(src);
        self.nodes[src].distance = potential;
        let mut worklist = std::mem::take(&mut self.worklist);
        worklist.reset();
        worklist.push(src);
        let mut found = false;
        'search: while let Some(node) = worklist.pop() {
            let node_distance = self.nodes[node].distance;
            // iterate downwards to mirror the recursive exploration order
            for i in (0..self.nodes[node].out_edges.len()).rev() {
                let e = self.nodes[node].out_edges[i];
                let (next, length) = {
                    let edge = &self.edges[e];
                    (edge.to, edge.length)
                };
                if self.is_marked(next) {
                    continue;
                }
                let new_potential = node_distance + length;
                if new_potential >= self.nodes[next].potential {
                    continue; // ineffective; leave unmarked for a later stronger path
                }
                if next == targ {
                    found = true;
                    break 'search;
                }
                self.mark(next);
                self.nodes[next].distance = new_potential;
                worklist.push(next);
            }
        }
        self.worklist = worklist;
        found
    }

    // ----- nogoods -----

    /// Follows predecessor edges from the node where the inconsistency
    /// surfaced until a node repeats, then traces the closed cycle into the
    /// nogood buffer.
    fn update_nogood_list(&mut self, start: NodeKey) {
        self.unmark_all();
        let mut node = start;
        while !self.is_marked(node) {
            self.mark(node);
            let pred = self.nodes[node].predecessor.expect("broken predecessor chain");
            node = self.edges[pred].from;
        }
        self.nogood.clear();
        let stop = node;
        loop {
            let e = self.nodes[node].predecessor.expect("broken predecessor chain");
            self.nogood.push(e);
            node = self.edges[e].from;
            if node == stop {
                break;
            }
        }
    }

    /// Edges of the most recently detected negative cycle.
    pub(crate) fn nogood(&self) -> &[EdgeKey] {
        &self.nogood
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(edges: &[(usize, usize, Time)], n: usize) -> (DistanceGraph, Vec<NodeKey>) {
        let mut g = DistanceGraph::new();
        let nodes: Vec<NodeKey> = (0..n).map(|_| g.create_node()).collect();
        for &(a, b, w) in edges {
            g.add_edge_spec(nodes[a], nodes[b], w).unwrap();
        }
        (g, nodes)
    }

    #[test]
    fn edge_specs_form_a_multiset() {
        let (mut g, n) = graph_with(&[], 2);
        g.add_edge_spec(n[0], n[1], 5).unwrap();
        g.add_edge_spec(n[0], n[1], 3).unwrap();
        g.add_edge_spec(n[0], n[1], 5).unwrap();
        let e = g.find_edge(n[0], n[1]).unwrap();
        assert_eq!(g.edge(e).length, 3);

        g.remove_edge_spec(n[0], n[1], 3);
        assert_eq!(g.edge(e).length, 5);
        g.remove_edge_spec(n[0], n[1], 5);
        assert_eq!(g.edge(e).length, 5); // one occurrence left
        g.remove_edge_spec(n[0], n[1], 5);
        assert!(g.find_edge(n[0], n[1]).is_none()); // last spec deletes the edge
    }

    #[test]
    fn edge_length_limits() {
        let (mut g, n) = graph_with(&[], 2);
        assert!(g.add_edge_spec(n[0], n[1], MAX_LENGTH).is_ok());
        assert!(matches!(
            g.add_edge_spec(n[0], n[1], MAX_LENGTH + 1),
            Err(Error::OutOfRange(_))
        ));
        assert!(g.add_edge_spec(n[0], n[1], MIN_LENGTH).is_ok());
        assert!(g.add_edge_spec(n[0], n[1], MIN_LENGTH - 1).is_err());
    }

    #[test]
    fn bellman_ford_computes_potentials() {
        // potentials are shortest distances from a virtual zero-source
        let (mut g, n) = graph_with(&[(0, 1, 2), (1, 2, -3), (0, 2, 1)], 3);
        assert!(g.bellman_ford(|_| {}));
        assert_eq!(g.nodes[n[0]].potential, 0);
        assert_eq!(g.nodes[n[1]].potential, 0);
        assert_eq!(g.nodes[n[2]].potential, -3);
    }

    #[test]
    fn bellman_ford_detects_negative_cycles() {
        let (mut g, n) = graph_with(&[(0, 1, 2), (1, 0, -3)], 2);
        assert!(!g.bellman_ford(|_| {}));
        let cycle: Vec<(NodeKey, NodeKey)> =
            g.nogood().iter().map(|&e| (g.edge(e).from, g.edge(e).to)).collect();
        assert_eq!(cycle.len(), 2);
        assert!(cycle.contains(&(n[0], n[1])));
        assert!(cycle.contains(&(n[1], n[0])));
    }

    #[test]
    fn dijkstra_shortest_distances() {
        let (mut g, n) = graph_with(&[(0, 1, 1), (1, 3, 1), (0, 2, 4), (3, 2, 1)], 4);
        assert!(g.bellman_ford(|_| {}));
        g.dijkstra(n[0], None);
        assert_eq!(g.distance(n[1]), 1);
        assert_eq!(g.distance(n[3]), 2);
        assert_eq!(g.distance(n[2]), 3);

        // unreached nodes report infinity through the generation check
        let (mut g2, m) = graph_with(&[(0, 1, 1)], 3);
        assert!(g2.bellman_ford(|_| {}));
        g2.dijkstra(m[0], None);
        assert_eq!(g2.distance(m[2]), POS_INFINITY);
    }

    #[test]
    fn dijkstra_handles_negative_lengths_after_bellman_ford() {
        let (mut g, n) = graph_with(&[(0, 1, 5), (0, 2, 2), (2, 1, -4)], 3);
        assert!(g.bellman_ford(|_| {}));
        g.dijkstra(n[0], None);
        assert_eq!(g.distance(n[1]), -2);
    }

    #[test]
    fn incremental_bellman_ford_finds_cycle_through_new_edge() {
        let (mut g, n) = graph_with(&[(0, 1, 2), (1, 2, 2)], 3);
        assert!(g.bellman_ford(|_| {}));

        // add edge closing a negative cycle 0 -> 1 -> 2 -> 0
        g.add_edge_spec(n[2], n[0], -5).unwrap();
        g.queue_reset();
        // seed from the target of the new edge, as the network does
        let potential = g.nodes[n[2]].potential - 5;
        g.nodes[n[0]].potential = potential;
        g.nodes[n[0]].depth = 1;
        g.nodes[n[0]].predecessor = g.find_edge(n[2], n[0]);
        g.queue_insert(n[0], 0);
        assert!(!g.inc_bellman_ford(Some(n[2]), |_| {}));
        assert_eq!(g.nogood().len(), 3);
    }

    #[test]
    fn distance_probe_against_bound() {
        let (mut g, n) = graph_with(&[(0, 1, 2), (1, 2, 2)], 3);
        assert!(g.bellman_ford(|_| {}));
        assert!(g.is_distance_less_than(n[0], n[2], 5));
        assert!(!g.is_distance_less_than(n[0], n[2], 4)); // dist == 4, not <
        assert!(!g.is_distance_less_than(n[2], n[0], 100.min(MAX_DISTANCE)));
    }

    #[test]
    fn zero_path_probe_at_bound_one() {
        let (mut g, n) = graph_with(&[(0, 1, 0), (1, 2, 0), (0, 3, 1)], 4);
        assert!(g.bellman_ford(|_| {}));
        // bound 1 restricts the search to all-zero paths
        assert!(g.is_distance_less_than(n[0], n[2], 1));
        assert!(!g.is_distance_less_than(n[0], n[3], 1));
    }

    #[test]
    fn deleting_a_node_removes_incident_edges() {
        let (mut g, n) = graph_with(&[(0, 1, 1), (1, 2, 1), (2, 0, 1)], 3);
        g.delete_node(n[1]);
        assert!(g.find_edge(n[0], n[1]).is_none());
        assert!(g.find_edge(n[1], n[2]).is_none());
        assert!(g.find_edge(n[2], n[0]).is_some());
        assert_eq!(g.num_nodes(), 2);
    }

    #[test]
    fn bounded_dijkstra_stops_at_the_bound() {
        let (mut g, n) = graph_with(&[(0, 1, 1), (1, 2, 1), (2, 3, 1)], 4);
        assert!(g.bellman_ford(|_| {}));
        let min_potential = (0..4).map(|i| g.nodes[n[i]].potential).min().unwrap();
        g.bounded_dijkstra_forward(n[0], 2, min_potential);
        assert_eq!(g.distance(n[1]), 1);
        // n[3] at distance 3 is beyond the bound of 2
        assert_eq!(g.distance(n[3]), POS_INFINITY);
    }
}
