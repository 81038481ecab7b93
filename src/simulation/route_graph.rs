//! City route graph for macro-level routing
//!
//! Directed graph of named locations. Edge costs carry a congestion factor
//! that can be changed at any time; routes are always computed from the
//! current weights and never cached.

use std::collections::HashMap;

use log::{debug, warn};
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use super::error::{DispatchError, DispatchResult};
use super::types::NodeId;

/// A named place in the city
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: NodeId,
    pub name: String,
}

/// Edge data for the route graph
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteEdge {
    pub base_weight: f64,
    pub congestion: f64,
    /// base_weight * congestion
    pub weight: f64,
}

impl RouteEdge {
    pub fn new(base_weight: f64) -> Self {
        Self {
            base_weight,
            congestion: 1.0,
            weight: base_weight,
        }
    }

    fn set_congestion(&mut self, congestion: f64) {
        self.congestion = congestion;
        self.weight = self.base_weight * congestion;
    }
}

/// A shortest route between two locations
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Visited locations, start and end included
    pub nodes: Vec<NodeId>,
    pub total_cost: f64,
}

impl Route {
    /// "A -> B -> C" using location names
    pub fn describe(&self, graph: &RouteGraph) -> String {
        self.nodes
            .iter()
            .map(|id| {
                graph
                    .location(*id)
                    .map(|l| l.name.clone())
                    .unwrap_or_else(|_| id.to_string())
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

#[derive(Debug, Default, Clone)]
pub struct RouteGraph {
    graph: DiGraph<Location, RouteEdge>,
    node_index: HashMap<NodeId, NodeIndex>,
}

impl RouteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a location, or renames it if the id already exists
    pub fn add_location(&mut self, id: NodeId, name: impl Into<String>) {
        let name = name.into();
        if let Some(index) = self.node_index.get(&id) {
            self.graph[*index].name = name;
            return;
        }
        let index = self.graph.add_node(Location { id, name });
        self.node_index.insert(id, index);
    }

    fn index_of(&self, id: NodeId) -> DispatchResult<NodeIndex> {
        self.node_index
            .get(&id)
            .copied()
            .ok_or(DispatchError::UnknownNode(id))
    }

    pub fn location(&self, id: NodeId) -> DispatchResult<&Location> {
        Ok(&self.graph[self.index_of(id)?])
    }

    /// All locations sorted by id
    pub fn locations(&self) -> Vec<&Location> {
        let mut locations: Vec<&Location> = self.graph.node_weights().collect();
        locations.sort_by_key(|l| l.id);
        locations
    }

    pub fn location_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Adds a one-way edge with congestion 1.0. There is at most one road per
    /// direction: adding `from -> to` again replaces the existing road.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, base_weight: f64) -> DispatchResult<()> {
        if !base_weight.is_finite() || base_weight < 0.0 {
            return Err(DispatchError::InvalidWeight(base_weight));
        }
        let from_index = self.index_of(from)?;
        let to_index = self.index_of(to)?;
        self.graph
            .update_edge(from_index, to_index, RouteEdge::new(base_weight));
        Ok(())
    }

    fn find_edge(&self, from: NodeId, to: NodeId) -> DispatchResult<EdgeIndex> {
        let from_index = self.index_of(from)?;
        let to_index = self.index_of(to)?;
        self.graph
            .edges(from_index)
            .find(|edge| edge.target() == to_index)
            .map(|edge| edge.id())
            .ok_or(DispatchError::UnknownEdge(from, to))
    }

    pub fn edge(&self, from: NodeId, to: NodeId) -> DispatchResult<&RouteEdge> {
        let edge = self.find_edge(from, to)?;
        Ok(&self.graph[edge])
    }

    /// Sets the congestion factor on the edge `from -> to`.
    /// The effective weight is recomputed from the base weight, not compounded.
    pub fn update_congestion(
        &mut self,
        from: NodeId,
        to: NodeId,
        congestion: f64,
    ) -> DispatchResult<()> {
        if !congestion.is_finite() || congestion <= 0.0 {
            return Err(DispatchError::InvalidCongestion(congestion));
        }
        let edge = self.find_edge(from, to)?;
        self.graph[edge].set_congestion(congestion);
        debug!(
            "Congestion on {} -> {} set to {:.2} (weight {:.2})",
            from, to, congestion, self.graph[edge].weight
        );
        Ok(())
    }

    /// Cheapest route by effective weight (A* with a null heuristic, i.e. Dijkstra)
    pub fn shortest_route(&self, from: NodeId, to: NodeId) -> DispatchResult<Route> {
        let start = self.index_of(from)?;
        let end = self.index_of(to)?;

        let Some((total_cost, path)) = astar(
            &self.graph,
            start,
            |node| node == end,
            |edge| edge.weight().weight,
            |_| 0.0,
        ) else {
            warn!("No route from {} to {}", from, to);
            return Err(DispatchError::RouteUnreachable { from, to });
        };

        Ok(Route {
            nodes: path.into_iter().map(|index| self.graph[index].id).collect(),
            total_cost,
        })
    }

    /// The six-location network the demo city runs on (weights in minutes)
    pub fn demo_city() -> DispatchResult<Self> {
        let mut graph = Self::new();
        let names = [
            (1, "NUST Hostels"),
            (2, "NUST Gate 1"),
            (3, "NUST Gate 2"),
            (4, "Bus Stop 26"),
            (5, "F-6 Markaz"),
            (6, "F-10 Markaz"),
        ];
        for (id, name) in names {
            graph.add_location(NodeId(id), name);
        }

        let edges = [
            (1, 2, 3.0),
            (1, 3, 2.0),
            (2, 1, 3.0),
            (2, 3, 2.0),
            (2, 4, 20.0),
            (2, 5, 25.0),
            (2, 6, 15.0),
            (3, 1, 2.0),
            (3, 2, 2.0),
            (3, 4, 15.0),
            (3, 5, 35.0),
            (3, 6, 25.0),
            (4, 2, 20.0),
            (4, 3, 17.0),
            (4, 5, 45.0),
            (4, 6, 35.0),
            (5, 2, 25.0),
            (5, 3, 28.0),
            (5, 4, 45.0),
            (5, 6, 15.0),
            (6, 2, 15.0),
            (6, 3, 18.0),
            (6, 4, 35.0),
            (6, 5, 15.0),
        ];
        for (from, to, weight) in edges {
            graph.add_edge(NodeId(from), NodeId(to), weight)?;
        }
        Ok(graph)
    }
}
