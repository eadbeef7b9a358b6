//! Partition bookkeeping and the partitioning strategy seam.
//!
//! A [`Partition`] groups the streets that share one label value; a
//! [`Component`] is one weakly-connected piece of a partition with an
//! `ignore` flag for pieces below the configured thresholds. The
//! [`SubgraphView`] is the non-owning subgraph representation used
//! throughout: an edge-id set plus scalar summaries, re-derivable against
//! any loaded graph, so no live graph reference is ever serialized.
//!
//! Partitioning *quality* is supplied by pluggable strategies implementing
//! [`Partitioner`]; the decomposition pipeline in [`crate::decompose`] only
//! guarantees the bookkeeping is correct once a strategy has proposed an
//! assignment.

use ltn_core::{LtnResult, StreetId, StreetNetwork};
use petgraph::graph::EdgeIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use ltn_core::graph_utils::{edge_set_length, edge_set_nodes};

/// A named group of streets sharing one label value. May be disconnected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Display name (the label value for label-built partitions)
    pub name: String,
    /// The label value this partition groups by
    pub value: String,
    /// Member street IDs, ascending
    pub edges: Vec<StreetId>,
    /// Number of distinct junctions touched by the member streets
    pub num_nodes: usize,
    /// Number of member streets
    pub num_edges: usize,
    /// Summed street length, metres
    pub length_total: f64,
}

/// One weakly-connected piece of a partition.
///
/// Components supersede partitions once produced: consumers work with the
/// component list if present, else the partition list, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub value: String,
    pub edges: Vec<StreetId>,
    pub num_nodes: usize,
    pub num_edges: usize,
    pub length_total: f64,
    /// True when the component fell below the edge-count or length threshold.
    /// Ignored components are retired: their streets are relabeled as
    /// unassigned and end up in the sparsified skeleton.
    pub ignore: bool,
}

/// A non-owning subgraph: an edge-id set plus scalar summaries.
///
/// Used for the sparsified skeleton. Carries no graph reference, so it can be
/// persisted as-is and re-bound to a freshly loaded graph by resolving the
/// edge IDs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgraphView {
    pub edges: Vec<StreetId>,
    pub num_nodes: usize,
    pub num_edges: usize,
    pub length_total: f64,
}

impl SubgraphView {
    /// Build a view from in-memory edge indices.
    pub fn from_edge_indices(network: &StreetNetwork, edges: &HashSet<EdgeIndex>) -> Self {
        let (num_nodes, num_edges, length_total) = summarize_edges(network, edges);
        Self {
            edges: sorted_street_ids(network, edges),
            num_nodes,
            num_edges,
            length_total,
        }
    }
}

/// A borrowed view of one surviving cell, independent of whether it came from
/// the partition or the component list.
#[derive(Debug, Clone, Copy)]
pub struct CellRef<'a> {
    pub name: &'a str,
    pub edges: &'a [StreetId],
    pub length_total: f64,
}

/// Node/edge/length summary for an edge set.
pub fn summarize_edges(
    network: &StreetNetwork,
    edges: &HashSet<EdgeIndex>,
) -> (usize, usize, f64) {
    (
        edge_set_nodes(network, edges).len(),
        edges.len(),
        edge_set_length(network, edges),
    )
}

/// Street IDs of an edge-index set, ascending.
pub fn sorted_street_ids(network: &StreetNetwork, edges: &HashSet<EdgeIndex>) -> Vec<StreetId> {
    let mut ids: Vec<StreetId> = edges
        .iter()
        .filter_map(|&edge| network.graph.edge_weight(edge))
        .map(|street| street.id)
        .collect();
    ids.sort_unstable();
    ids
}

/// What a partitioning strategy proposes: either a label per street (streets
/// left out stay unassigned), or directly the sparsified skeleton from which
/// the cells are derived as the complement.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionOutcome {
    Labels(Vec<(StreetId, String)>),
    Sparsified(Vec<StreetId>),
}

/// Strategy interface for proposing a partitioning.
///
/// Implementations decide *where* the cell boundaries go; everything
/// downstream (component splitting, the sparsified complement, orderings,
/// metrics) is the fixed pipeline in [`crate::decompose::Decomposition`].
pub trait Partitioner {
    fn assign(&self, network: &StreetNetwork) -> LtnResult<PartitionOutcome>;
}

/// Uses the labels already present on the streets as the assignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelPartitioner;

impl Partitioner for LabelPartitioner {
    fn assign(&self, network: &StreetNetwork) -> LtnResult<PartitionOutcome> {
        let assignments = network
            .graph
            .edge_weights()
            .filter_map(|street| {
                street
                    .label
                    .as_ref()
                    .map(|label| (street.id, label.clone()))
            })
            .collect();
        Ok(PartitionOutcome::Labels(assignments))
    }
}

/// Declares an explicit sparsified skeleton; the cells become the
/// weakly-connected pieces of the complement.
#[derive(Debug, Clone, Default)]
pub struct SkeletonPartitioner {
    pub skeleton: Vec<StreetId>,
}

impl SkeletonPartitioner {
    pub fn new(skeleton: Vec<StreetId>) -> Self {
        Self { skeleton }
    }
}

impl Partitioner for SkeletonPartitioner {
    fn assign(&self, _network: &StreetNetwork) -> LtnResult<PartitionOutcome> {
        Ok(PartitionOutcome::Sparsified(self.skeleton.clone()))
    }
}
