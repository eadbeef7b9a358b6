use crate::StreetNetwork;
use petgraph::algo::connected_components;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

/// Summary statistics for a street network (density/degree/weak components).
#[derive(Debug)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub weak_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub density: f64,
}

/// Calculates graph-level statistics such as density, degree distribution,
/// and component counts (classic network science measures).
pub fn graph_stats(network: &StreetNetwork) -> GraphStats {
    let node_count = network.graph.node_count();
    let edge_count = network.graph.edge_count();
    let mut degrees = Vec::with_capacity(node_count);
    for node in network.graph.node_indices() {
        degrees.push(network.graph.edges_directed(node, petgraph::Direction::Outgoing).count()
            + network.graph.edges_directed(node, petgraph::Direction::Incoming).count());
    }
    let min_degree = *degrees.iter().min().unwrap_or(&0);
    let max_degree = *degrees.iter().max().unwrap_or(&0);
    let avg_degree = if node_count == 0 {
        0.0
    } else {
        degrees.iter().copied().sum::<usize>() as f64 / node_count as f64
    };
    let density = if node_count < 2 {
        0.0
    } else {
        edge_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
    };
    // connected_components on a directed graph counts weakly connected pieces
    let weak_components = connected_components(&network.graph);
    GraphStats {
        node_count,
        edge_count,
        weak_components,
        min_degree,
        avg_degree,
        max_degree,
        density,
    }
}

/// Weakly-connected components of the subgraph induced by `edges`.
///
/// Edge direction is ignored. Every node incident to at least one edge of the
/// set belongs to exactly one component. Components are returned in order of
/// their lowest node index, members sorted ascending, so the result is
/// deterministic for a given graph.
pub fn weak_components_of_edges(
    network: &StreetNetwork,
    edges: &HashSet<EdgeIndex>,
) -> Vec<Vec<NodeIndex>> {
    let mut adjacency: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
    for &edge in edges {
        if let Some((u, v)) = network.graph.edge_endpoints(edge) {
            adjacency.entry(u).or_default().push(v);
            adjacency.entry(v).or_default().push(u);
        }
    }

    let mut starts: Vec<NodeIndex> = adjacency.keys().copied().collect();
    starts.sort_unstable();

    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut components = Vec::new();
    for start in starts {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(node);
            if let Some(neighbors) = adjacency.get(&node) {
                for &neighbor in neighbors {
                    if !visited.contains(&neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        members.sort_unstable();
        components.push(members);
    }
    components
}

/// Sum of lengths over an edge set.
pub fn edge_set_length(network: &StreetNetwork, edges: &HashSet<EdgeIndex>) -> f64 {
    edges
        .iter()
        .filter_map(|&edge| network.graph.edge_weight(edge))
        .map(|street| street.length)
        .sum()
}

/// All nodes incident to at least one edge of the set.
pub fn edge_set_nodes(network: &StreetNetwork, edges: &HashSet<EdgeIndex>) -> HashSet<NodeIndex> {
    let mut nodes = HashSet::new();
    for &edge in edges {
        if let Some((u, v)) = network.graph.edge_endpoints(edge) {
            nodes.insert(u);
            nodes.insert(v);
        }
    }
    nodes
}

/// Degree of `node` counting only edges in the set (direction ignored,
/// parallel edges counted independently, self-loops counted twice).
pub fn degree_within(
    network: &StreetNetwork,
    edges: &HashSet<EdgeIndex>,
    node: NodeIndex,
) -> usize {
    let mut degree = 0;
    for &edge in edges {
        if let Some((u, v)) = network.graph.edge_endpoints(edge) {
            if u == node {
                degree += 1;
            }
            if v == node {
                degree += 1;
            }
        }
    }
    degree
}

/// Undirected neighbors of `node` within an edge set, deduplicated and sorted.
pub fn neighbors_within(
    network: &StreetNetwork,
    edges: &HashSet<EdgeIndex>,
    node: NodeIndex,
) -> Vec<NodeIndex> {
    let mut neighbors = Vec::new();
    for &edge in edges {
        if let Some((u, v)) = network.graph.edge_endpoints(edge) {
            if u == node {
                neighbors.push(v);
            } else if v == node {
                neighbors.push(u);
            }
        }
    }
    neighbors.sort_unstable();
    neighbors.dedup();
    neighbors
}

/// Collect the edge indices of every street whose label equals `value`.
pub fn edges_with_label(network: &StreetNetwork, value: &str) -> HashSet<EdgeIndex> {
    network
        .graph
        .edge_references()
        .filter(|edge| edge.weight().label.as_deref() == Some(value))
        .map(|edge| edge.id())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Junction, JunctionId, Street, StreetId};

    /// Two disjoint paths: 0-1-2 and 3-4.
    fn two_path_network() -> (StreetNetwork, HashSet<EdgeIndex>) {
        let mut network = StreetNetwork::new();
        let nodes: Vec<NodeIndex> = (0..5)
            .map(|i| network.add_junction(Junction::new(JunctionId::new(i))))
            .collect();
        let mut edges = HashSet::new();
        edges.insert(network.add_street(nodes[0], nodes[1], Street::new(StreetId::new(0), 1.0)));
        edges.insert(network.add_street(nodes[1], nodes[2], Street::new(StreetId::new(1), 2.0)));
        edges.insert(network.add_street(nodes[3], nodes[4], Street::new(StreetId::new(2), 3.0)));
        (network, edges)
    }

    #[test]
    fn test_weak_components_of_edges() {
        let (network, edges) = two_path_network();
        let components = weak_components_of_edges(&network, &edges);
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].len(), 3);
        assert_eq!(components[1].len(), 2);
    }

    #[test]
    fn test_weak_components_respect_edge_subset() {
        let (network, edges) = two_path_network();
        // Drop the middle edge; 0-1 and 3-4 remain, node 2 disappears entirely.
        let subset: HashSet<EdgeIndex> = edges
            .iter()
            .copied()
            .filter(|&e| network.graph.edge_weight(e).unwrap().id != StreetId::new(1))
            .collect();
        let components = weak_components_of_edges(&network, &subset);
        assert_eq!(components.len(), 2);
        assert!(components.iter().all(|c| c.len() == 2));
    }

    #[test]
    fn test_edge_set_length_and_nodes() {
        let (network, edges) = two_path_network();
        assert_eq!(edge_set_length(&network, &edges), 6.0);
        assert_eq!(edge_set_nodes(&network, &edges).len(), 5);
    }

    #[test]
    fn test_degree_within() {
        let (network, edges) = two_path_network();
        let middle = network.junction_index_map()[&JunctionId::new(1)];
        let end = network.junction_index_map()[&JunctionId::new(0)];
        assert_eq!(degree_within(&network, &edges, middle), 2);
        assert_eq!(degree_within(&network, &edges, end), 1);
    }

    #[test]
    fn test_neighbors_within_dedups_parallel_edges(){
        let mut network = StreetNetwork::new();
        let a = network.add_junction(Junction::new(JunctionId::new(0)));
        let b = network.add_junction(Junction::new(JunctionId::new(1)));
        let mut edges = HashSet::new();
        edges.insert(network.add_street(a, b, Street::new(StreetId::new(0), 1.0)));
        edges.insert(network.add_street(b, a, Street::new(StreetId::new(1), 1.0)));
        assert_eq!(neighbors_within(&network, &edges, a), vec![b]);
        assert_eq!(degree_within(&network, &edges, a), 2);
    }

    #[test]
    fn test_graph_stats() {
        let (network, _) = two_path_network();
        let stats = graph_stats(&network);
        assert_eq!(stats.node_count, 5);
        assert_eq!(stats.edge_count, 3);
        assert_eq!(stats.weak_components, 2);
        assert_eq!(stats.max_degree, 2);
    }

    #[test]
    fn test_edges_with_label() {
        let mut network = StreetNetwork::new();
        let a = network.add_junction(Junction::new(JunctionId::new(0)));
        let b = network.add_junction(Junction::new(JunctionId::new(1)));
        network.add_street(a, b, Street::new(StreetId::new(0), 1.0).with_label("x"));
        network.add_street(b, a, Street::new(StreetId::new(1), 1.0));
        assert_eq!(edges_with_label(&network, "x").len(), 1);
        assert!(edges_with_label(&network, "y").is_empty());
    }
}
