//! Role hierarchy graph with deduplicating traversals
//!
//! Edges point from an ascendant (the conveyor of privileges) to a
//! descendant (the heir). Cycles and diamonds are legal: every traversal
//! keeps a visited set keyed by identity, so it terminates on cyclic graphs
//! and reports each node once however many paths reach it.

use crate::types::RoleIdentity;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Traversal order for ascendant/descendant enumeration
///
/// Only the enumeration order differs; both orders visit the same set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOrder {
    #[default]
    BreadthFirst,
    DepthFirst,
}

/// Directed hierarchy of role identities
#[derive(Debug, Clone, Default)]
pub struct RoleGraph {
    /// ascendant -> direct descendants
    heirs: HashMap<RoleIdentity, Vec<RoleIdentity>>,

    /// descendant -> direct ascendants
    conveyors: HashMap<RoleIdentity, Vec<RoleIdentity>>,

    edge_count: usize,
}

impl RoleGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct edges
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Register that `ascendant` conveys its privileges to `descendant`
    ///
    /// No cycle check is performed. Returns `false` if the edge already existed.
    pub fn add_edge(&mut self, ascendant: RoleIdentity, descendant: RoleIdentity) -> bool {
        if self.has_direct_edge(&ascendant, &descendant) {
            return false;
        }

        self.heirs
            .entry(ascendant.clone())
            .or_default()
            .push(descendant.clone());
        self.conveyors.entry(descendant).or_default().push(ascendant);
        self.edge_count += 1;
        true
    }

    /// Remove the edge `ascendant -> descendant`, returning whether it existed
    pub fn remove_edge(&mut self, ascendant: &RoleIdentity, descendant: &RoleIdentity) -> bool {
        let removed = detach(&mut self.heirs, ascendant, descendant);
        if removed {
            detach(&mut self.conveyors, descendant, ascendant);
            self.edge_count -= 1;
        }
        removed
    }

    /// Whether the edge `ascendant -> descendant` exists (direct membership only)
    pub fn has_direct_edge(&self, ascendant: &RoleIdentity, descendant: &RoleIdentity) -> bool {
        self.heirs
            .get(ascendant)
            .is_some_and(|heirs| heirs.contains(descendant))
    }

    /// Whether `descendant` is reachable from `ascendant` in one or more hops
    pub fn is_ascendant(&self, ascendant: &RoleIdentity, descendant: &RoleIdentity) -> bool {
        let mut visited: HashSet<&RoleIdentity> = HashSet::new();
        let mut queue: VecDeque<&RoleIdentity> = self.heirs_of(ascendant).collect();

        while let Some(node) = queue.pop_front() {
            if node == descendant {
                return true;
            }
            if visited.insert(node) {
                queue.extend(self.heirs_of(node));
            }
        }
        false
    }

    /// Every node from which `role` is transitively reachable, each exactly once
    pub fn ascendants(&self, role: &RoleIdentity, order: SearchOrder) -> Vec<RoleIdentity> {
        walk(&self.conveyors, role, order)
    }

    /// Every node transitively reachable from `role`, each exactly once
    pub fn descendants(&self, role: &RoleIdentity, order: SearchOrder) -> Vec<RoleIdentity> {
        walk(&self.heirs, role, order)
    }

    /// Ascendants of `role` grouped by hop distance
    ///
    /// Index 0 holds the ascendants at distance 1. A node appears only at the
    /// distance where it is first reached; `role` itself is never included.
    pub fn ascendants_by_distance(&self, role: &RoleIdentity) -> Vec<Vec<RoleIdentity>> {
        self.ascendant_layers(role)
            .map(|layer| layer.into_iter().cloned().collect())
            .collect()
    }

    /// Lazy form of [`ascendants_by_distance`](Self::ascendants_by_distance)
    pub fn ascendant_layers(&self, role: &RoleIdentity) -> AscendantLayers<'_> {
        // Seeded with the graph's own key so `seen` only borrows from the graph.
        // A role without conveyors has no layers.
        let (seen, frontier) = match self.conveyors.get_key_value(role) {
            Some((key, _)) => (HashSet::from([key]), vec![key]),
            None => (HashSet::new(), Vec::new()),
        };

        AscendantLayers {
            conveyors: &self.conveyors,
            seen,
            frontier,
        }
    }

    fn heirs_of<'g>(&'g self, role: &RoleIdentity) -> impl Iterator<Item = &'g RoleIdentity> {
        self.heirs.get(role).into_iter().flatten()
    }
}

/// Breadth-first layering of ascendants with a single global visited set
pub struct AscendantLayers<'g> {
    conveyors: &'g HashMap<RoleIdentity, Vec<RoleIdentity>>,
    seen: HashSet<&'g RoleIdentity>,
    frontier: Vec<&'g RoleIdentity>,
}

impl<'g> Iterator for AscendantLayers<'g> {
    type Item = Vec<&'g RoleIdentity>;

    fn next(&mut self) -> Option<Self::Item> {
        let conveyors = self.conveyors;
        let mut layer = Vec::new();
        for node in &self.frontier {
            for conveyor in conveyors.get(*node).into_iter().flatten() {
                if self.seen.insert(conveyor) {
                    layer.push(conveyor);
                }
            }
        }

        if layer.is_empty() {
            self.frontier.clear();
            return None;
        }
        self.frontier = layer.clone();
        Some(layer)
    }
}

fn walk(
    edges: &HashMap<RoleIdentity, Vec<RoleIdentity>>,
    start: &RoleIdentity,
    order: SearchOrder,
) -> Vec<RoleIdentity> {
    let neighbors = |node: &RoleIdentity| edges.get(node).into_iter().flatten();

    let mut visited: HashSet<&RoleIdentity> = HashSet::new();
    let mut found = Vec::new();
    let mut pending: VecDeque<&RoleIdentity> = VecDeque::new();

    match order {
        SearchOrder::BreadthFirst => pending.extend(neighbors(start)),
        SearchOrder::DepthFirst => pending.extend(neighbors(start).rev()),
    }

    loop {
        let next = match order {
            SearchOrder::BreadthFirst => pending.pop_front(),
            SearchOrder::DepthFirst => pending.pop_back(),
        };
        let Some(node) = next else { break };

        if !visited.insert(node) {
            continue;
        }
        found.push(node.clone());

        match order {
            SearchOrder::BreadthFirst => pending.extend(neighbors(node)),
            // reversed so the first neighbor is expanded first
            SearchOrder::DepthFirst => pending.extend(neighbors(node).rev()),
        }
    }

    found
}

fn detach(
    edges: &mut HashMap<RoleIdentity, Vec<RoleIdentity>>,
    from: &RoleIdentity,
    to: &RoleIdentity,
) -> bool {
    let Some(targets) = edges.get_mut(from) else {
        return false;
    };
    let Some(position) = targets.iter().position(|t| t == to) else {
        return false;
    };

    targets.swap_remove(position);
    if targets.is_empty() {
        edges.remove(from);
    }
    true
}
