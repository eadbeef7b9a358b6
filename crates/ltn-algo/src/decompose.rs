//! The graph decomposition pipeline.
//!
//! [`Decomposition`] turns a labeled street network into the three-way
//! bookkeeping the rest of the toolkit runs on: partitions (streets grouped
//! by label), components (weakly-connected pieces of a partition, with
//! below-threshold pieces retired), and the sparsified complement (every
//! street claimed by no surviving cell — the through-traffic skeleton).
//!
//! The pipeline is fixed: a [`Partitioner`] strategy proposes either a
//! labeling or a skeleton exactly once, and `run` does the rest —
//! partition building, component splitting, complement derivation, the
//! canonical node ordering, and a consistency check. The two entry paths
//! (labels → complement, skeleton → components) are mutually exclusive
//! within one run.
//!
//! Structural invariant once a run finishes: the sparsified edge set and the
//! surviving cells' edge sets form a disjoint union equal to the whole edge
//! set. Violations are reported as diagnostics, not errors — metrics stay
//! computable on an invalid decomposition, the caller just gets warned.

use ltn_core::graph_utils::{
    degree_within, edge_set_nodes, weak_components_of_edges,
};
use ltn_core::{Diagnostics, JunctionId, LtnError, LtnResult, StreetId, StreetNetwork};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::partition::{
    sorted_street_ids, summarize_edges, CellRef, Component, Partition, PartitionOutcome,
    Partitioner, SubgraphView,
};

/// Explicit pipeline configuration, passed at run time. No process-global
/// state is consulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecomposeOptions {
    /// Split each partition into weakly-connected components.
    pub split_components: bool,
    /// Components with fewer edges are retired (`ignore = true`).
    pub min_edge_count: usize,
    /// Components with less total length are retired (`ignore = true`).
    pub min_length: f64,
}

impl Default for DecomposeOptions {
    fn default() -> Self {
        Self {
            split_components: true,
            min_edge_count: 0,
            min_length: 0.0,
        }
    }
}

/// Partition/component/sparsified bookkeeping for one street network.
///
/// Two-phase: construct with [`Decomposition::new`], then [`Decomposition::run`]
/// with a strategy. Queries that depend on a finished run return
/// [`LtnError::Precondition`] before then.
///
/// Holds no graph reference — cells and the skeleton are edge-id sets plus
/// summaries, so the whole struct serializes independently of the graph and
/// re-binds to a freshly loaded one (see [`Decomposition::check_against`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    pub name: String,
    /// Streets grouped by label value, in first-seen label order.
    pub partitions: Vec<Partition>,
    /// Weakly-connected pieces, once splitting (or skeleton derivation) ran.
    /// Supersedes `partitions` for all consumers when present.
    pub components: Option<Vec<Component>>,
    /// The through-traffic skeleton: every street claimed by no surviving cell.
    pub sparsified: Option<SubgraphView>,
    options: DecomposeOptions,
    node_order: Option<Vec<JunctionId>>,
}

impl Decomposition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitions: Vec::new(),
            components: None,
            sparsified: None,
            options: DecomposeOptions::default(),
            node_order: None,
        }
    }

    /// The configuration the last run used.
    pub fn options(&self) -> &DecomposeOptions {
        &self.options
    }

    /// Number of components found during splitting, if splitting ran.
    pub fn num_components(&self) -> Option<usize> {
        self.components.as_ref().map(|components| components.len())
    }

    /// Run the fixed decomposition pipeline with the given strategy.
    ///
    /// Mutates the network only through transient attribute tagging: applying
    /// the proposed labels and resetting the label on retired components'
    /// streets. Returns the consistency diagnostics; warnings there are
    /// non-fatal and also logged.
    pub fn run(
        &mut self,
        network: &mut StreetNetwork,
        partitioner: &dyn Partitioner,
        options: &DecomposeOptions,
    ) -> LtnResult<Diagnostics> {
        info!(
            name = %self.name,
            junctions = network.num_junctions(),
            streets = network.num_streets(),
            "running decomposition"
        );

        let outcome = partitioner.assign(network)?;

        self.options = options.clone();
        self.partitions.clear();
        self.components = None;
        self.sparsified = None;
        self.node_order = None;

        match outcome {
            PartitionOutcome::Labels(assignments) => {
                apply_labels(network, &assignments)?;
                self.build_partitions(network)?;
                if options.split_components {
                    self.split_into_components(network)?;
                }
                self.set_sparsified_from_components(network)?;
            }
            PartitionOutcome::Sparsified(skeleton) => {
                let street_map = network.street_index_map();
                let edges = resolve_edges(&skeleton, &street_map)?;
                for street in network.graph.edge_weights_mut() {
                    street.label = None;
                }
                self.sparsified = Some(SubgraphView::from_edge_indices(network, &edges));
                self.set_components_from_sparsified(network)?;
            }
        }

        self.freeze_node_order(network)?;

        let diagnostics = self.verify(network);
        if diagnostics.has_issues() {
            warn!(
                name = %self.name,
                summary = %diagnostics.summary(),
                "decomposition is structurally inconsistent; proceeding"
            );
        }
        Ok(diagnostics)
    }

    /// Group streets by label value into partitions. Read-only on the graph.
    pub fn build_partitions(&mut self, network: &StreetNetwork) -> LtnResult<()> {
        let mut value_order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, HashSet<EdgeIndex>> = HashMap::new();
        for edge in network.graph.edge_references() {
            if let Some(value) = &edge.weight().label {
                if !grouped.contains_key(value) {
                    value_order.push(value.clone());
                }
                grouped.entry(value.clone()).or_default().insert(edge.id());
            }
        }

        self.partitions = value_order
            .into_iter()
            .map(|value| {
                let edges = &grouped[&value];
                let (num_nodes, num_edges, length_total) = summarize_edges(network, edges);
                Partition {
                    name: value.clone(),
                    value,
                    edges: sorted_street_ids(network, edges),
                    num_nodes,
                    num_edges,
                    length_total,
                }
            })
            .collect();
        debug!(partitions = self.partitions.len(), "built partitions from labels");
        Ok(())
    }

    /// Split each partition into weakly-connected components and retire the
    /// pieces below the thresholds.
    ///
    /// Each component's edge set is re-derived as the label-induced subgraph
    /// restricted to the component's node set — a node's full neighborhood
    /// may include streets of other labels, which must not leak in. Retired
    /// components get their streets relabeled as unassigned so they behave
    /// as unpartitioned downstream; that relabeling is the one deliberate
    /// graph mutation of this step and is logged.
    pub fn split_into_components(&mut self, network: &mut StreetNetwork) -> LtnResult<()> {
        let street_map = network.street_index_map();
        let mut components = Vec::new();

        for partition in &self.partitions {
            let edge_set = resolve_edges(&partition.edges, &street_map)?;
            let pieces = weak_components_of_edges(network, &edge_set);
            debug!(
                partition = %partition.name,
                pieces = pieces.len(),
                "splitting partition into weak components"
            );
            for (i, piece) in pieces.iter().enumerate() {
                let node_set: HashSet<NodeIndex> = piece.iter().copied().collect();
                let comp_edges: HashSet<EdgeIndex> = network
                    .graph
                    .edge_references()
                    .filter(|edge| {
                        edge.weight().label.as_deref() == Some(partition.value.as_str())
                            && node_set.contains(&edge.source())
                            && node_set.contains(&edge.target())
                    })
                    .map(|edge| edge.id())
                    .collect();
                let (num_nodes, num_edges, length_total) = summarize_edges(network, &comp_edges);
                let ignore = num_edges < self.options.min_edge_count
                    || length_total < self.options.min_length;
                components.push(Component {
                    name: format!("{}_component_{}", partition.name, i),
                    value: partition.value.clone(),
                    edges: sorted_street_ids(network, &comp_edges),
                    num_nodes,
                    num_edges,
                    length_total,
                    ignore,
                });
            }
        }

        let mut reset_streets = 0usize;
        for component in components.iter().filter(|component| component.ignore) {
            for id in &component.edges {
                if let Some(&edge) = street_map.get(id) {
                    network.graph[edge].label = None;
                    reset_streets += 1;
                }
            }
        }
        if reset_streets > 0 {
            info!(
                streets = reset_streets,
                "reset label to unassigned on retired components' streets"
            );
        }

        self.components = Some(components);
        Ok(())
    }

    /// Derive the sparsified skeleton as the edge-disjoint complement of all
    /// surviving cells.
    pub fn set_sparsified_from_components(&mut self, network: &StreetNetwork) -> LtnResult<()> {
        let retained: HashSet<StreetId> = match &self.components {
            Some(components) => components
                .iter()
                .filter(|component| !component.ignore)
                .flat_map(|component| component.edges.iter().copied())
                .collect(),
            None => self
                .partitions
                .iter()
                .flat_map(|partition| partition.edges.iter().copied())
                .collect(),
        };
        let edges: HashSet<EdgeIndex> = network
            .graph
            .edge_references()
            .filter(|edge| !retained.contains(&edge.weight().id))
            .map(|edge| edge.id())
            .collect();
        let view = SubgraphView::from_edge_indices(network, &edges);
        debug!(
            streets = view.num_edges,
            length = view.length_total,
            "derived sparsified complement"
        );
        self.sparsified = Some(view);
        Ok(())
    }

    /// Inverse entry path: the strategy supplied the skeleton directly, so the
    /// cells are the weakly-connected pieces of `graph − sparsified`, each
    /// expanded with the non-sparsified streets touching its node set. The
    /// derived cell names are tagged onto the streets.
    pub fn set_components_from_sparsified(
        &mut self,
        network: &mut StreetNetwork,
    ) -> LtnResult<()> {
        let view = self.sparsified.as_ref().ok_or_else(|| {
            LtnError::Precondition(
                "sparsified skeleton not set; supply it before deriving components".into(),
            )
        })?;
        let street_map = network.street_index_map();
        let sparsified_ids: HashSet<StreetId> = view.edges.iter().copied().collect();
        let cell_edges: HashSet<EdgeIndex> = network
            .graph
            .edge_references()
            .filter(|edge| !sparsified_ids.contains(&edge.weight().id))
            .map(|edge| edge.id())
            .collect();

        let pieces = weak_components_of_edges(network, &cell_edges);
        let mut components = Vec::new();
        for (i, piece) in pieces.iter().enumerate() {
            let node_set: HashSet<NodeIndex> = piece.iter().copied().collect();
            let expanded: HashSet<EdgeIndex> = cell_edges
                .iter()
                .copied()
                .filter(|&edge| {
                    network
                        .graph
                        .edge_endpoints(edge)
                        .map(|(u, v)| node_set.contains(&u) || node_set.contains(&v))
                        .unwrap_or(false)
                })
                .collect();
            let (num_nodes, num_edges, length_total) = summarize_edges(network, &expanded);
            let ignore = num_edges < self.options.min_edge_count
                || length_total < self.options.min_length;
            let name = format!("{}_cell_{}", self.name, i);
            components.push(Component {
                value: name.clone(),
                name,
                edges: sorted_street_ids(network, &expanded),
                num_nodes,
                num_edges,
                length_total,
                ignore,
            });
        }

        let mut tagged = 0usize;
        for component in &components {
            let label = (!component.ignore).then(|| component.value.clone());
            for id in &component.edges {
                if let Some(&edge) = street_map.get(id) {
                    network.graph[edge].label = label.clone();
                    tagged += 1;
                }
            }
        }
        info!(
            components = components.len(),
            streets = tagged,
            "derived components from sparsified skeleton"
        );

        self.components = Some(components);
        Ok(())
    }

    /// The surviving cells: non-retired components if splitting ran, else the
    /// partitions. Never both.
    pub fn cells(&self) -> LtnResult<Vec<CellRef<'_>>> {
        if let Some(components) = &self.components {
            Ok(components
                .iter()
                .filter(|component| !component.ignore)
                .map(|component| CellRef {
                    name: &component.name,
                    edges: &component.edges,
                    length_total: component.length_total,
                })
                .collect())
        } else if !self.partitions.is_empty() {
            Ok(self
                .partitions
                .iter()
                .map(|partition| CellRef {
                    name: &partition.name,
                    edges: &partition.edges,
                    length_total: partition.length_total,
                })
                .collect())
        } else {
            Err(LtnError::Precondition(
                "decomposition has not run; no partitions or components available".into(),
            ))
        }
    }

    /// Interior junctions per surviving cell: degree ≥ 2 within the cell's
    /// subgraph and not part of the sparsified node set. A junction on the
    /// boundary of two cells is owned by the skeleton and never interior.
    pub fn interior_junctions(
        &self,
        network: &StreetNetwork,
    ) -> LtnResult<Vec<(String, Vec<JunctionId>)>> {
        let view = self.sparsified.as_ref().ok_or_else(|| {
            LtnError::Precondition(
                "sparsified skeleton not derived; interior junctions are undefined".into(),
            )
        })?;
        let street_map = network.street_index_map();
        let sparsified_nodes =
            edge_set_nodes(network, &resolve_edges(&view.edges, &street_map)?);

        let mut interiors = Vec::new();
        for cell in self.cells()? {
            let edge_set = resolve_edges(cell.edges, &street_map)?;
            let mut nodes: Vec<NodeIndex> = edge_set_nodes(network, &edge_set).into_iter().collect();
            nodes.sort_unstable();
            let members: Vec<JunctionId> = nodes
                .into_iter()
                .filter(|&node| {
                    degree_within(network, &edge_set, node) >= 2
                        && !sparsified_nodes.contains(&node)
                })
                .map(|node| network.graph[node].id)
                .collect();
            interiors.push((cell.name.to_string(), members));
        }
        Ok(interiors)
    }

    /// The canonical node ordering, frozen by `run`: cells by descending
    /// interior count, interiors concatenated (first occurrence wins), then
    /// every remaining junction in graph iteration order. Stable for the
    /// lifetime of the decomposition, and serialized with it, so distance
    /// matrices computed at different times stay index-comparable.
    pub fn ordered_junctions(&self) -> LtnResult<&[JunctionId]> {
        self.node_order.as_deref().ok_or_else(|| {
            LtnError::Precondition(
                "canonical node ordering is frozen by run; run the decomposition first".into(),
            )
        })
    }

    fn freeze_node_order(&mut self, network: &StreetNetwork) -> LtnResult<()> {
        let interiors = self.interior_junctions(network)?;
        let mut groups: Vec<&(String, Vec<JunctionId>)> = interiors.iter().collect();
        groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        let mut seen: HashSet<JunctionId> = HashSet::new();
        let mut order: Vec<JunctionId> = Vec::with_capacity(network.num_junctions());
        for (_, members) in groups {
            for &id in members {
                if seen.insert(id) {
                    order.push(id);
                }
            }
        }
        for node in network.graph.node_indices() {
            let id = network.graph[node].id;
            if seen.insert(id) {
                order.push(id);
            }
        }
        self.node_order = Some(order);
        Ok(())
    }

    /// Structural consistency check: every street classified exactly once
    /// across the surviving cells and the skeleton, and every component's
    /// `ignore` flag agreeing with the thresholds. Violations are warnings —
    /// callers may proceed, metrics just become numerically suspect.
    pub fn verify(&self, network: &StreetNetwork) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        let cells = match self.cells() {
            Ok(cells) => cells,
            Err(_) => {
                diagnostics.add_error("consistency", "decomposition has not run");
                return diagnostics;
            }
        };

        let graph_ids: HashSet<StreetId> =
            network.graph.edge_weights().map(|street| street.id).collect();
        let mut counts: HashMap<StreetId, usize> =
            graph_ids.iter().map(|&id| (id, 0usize)).collect();

        fn classify(
            counts: &mut HashMap<StreetId, usize>,
            diagnostics: &mut Diagnostics,
            owner: &str,
            ids: &[StreetId],
        ) {
            for id in ids {
                match counts.get_mut(id) {
                    Some(count) => *count += 1,
                    None => diagnostics.add_warning_with_entity(
                        "consistency",
                        "classified street id is not in the graph",
                        &format!("{} in {}", id.value(), owner),
                    ),
                }
            }
        }

        for cell in &cells {
            classify(&mut counts, &mut diagnostics, cell.name, cell.edges);
        }
        match &self.sparsified {
            Some(view) => classify(&mut counts, &mut diagnostics, "sparsified", &view.edges),
            None => diagnostics.add_warning("consistency", "sparsified complement not derived"),
        }

        let mut unclassified: Vec<StreetId> = Vec::new();
        let mut multiple: Vec<StreetId> = Vec::new();
        for (&id, &count) in &counts {
            match count {
                0 => unclassified.push(id),
                1 => {}
                _ => multiple.push(id),
            }
        }
        unclassified.sort_unstable();
        multiple.sort_unstable();
        for id in unclassified {
            diagnostics.add_warning_with_entity(
                "consistency",
                "street is classified by no cell and not sparsified",
                &format!("street {}", id.value()),
            );
        }
        for id in multiple {
            diagnostics.add_warning_with_entity(
                "consistency",
                "street is classified more than once",
                &format!("street {}", id.value()),
            );
        }

        if let Some(components) = &self.components {
            for component in components {
                let expected = component.num_edges < self.options.min_edge_count
                    || component.length_total < self.options.min_length;
                if component.ignore != expected {
                    diagnostics.add_warning_with_entity(
                        "consistency",
                        "ignore flag does not match the configured thresholds",
                        &component.name,
                    );
                }
            }
        }

        diagnostics
    }

    /// Reattachment check after loading from disk: every stored street id
    /// must resolve in the (freshly loaded) graph.
    pub fn check_against(&self, network: &StreetNetwork) -> LtnResult<()> {
        let street_map = network.street_index_map();
        let check = |ids: &[StreetId]| -> LtnResult<()> {
            resolve_edges(ids, &street_map).map(|_| ())
        };
        for partition in &self.partitions {
            check(&partition.edges)?;
        }
        if let Some(components) = &self.components {
            for component in components {
                check(&component.edges)?;
            }
        }
        if let Some(view) = &self.sparsified {
            check(&view.edges)?;
        }
        Ok(())
    }
}

/// Validate and apply a proposed labeling: every street id must resolve
/// before any label is touched, then all labels are cleared and the proposal
/// applied.
fn apply_labels(network: &mut StreetNetwork, assignments: &[(StreetId, String)]) -> LtnResult<()> {
    let street_map = network.street_index_map();
    let resolved: Vec<(EdgeIndex, &String)> = assignments
        .iter()
        .map(|(id, value)| {
            street_map
                .get(id)
                .copied()
                .map(|edge| (edge, value))
                .ok_or_else(|| {
                    LtnError::Validation(format!(
                        "partitioner assigned unknown street id {}",
                        id.value()
                    ))
                })
        })
        .collect::<LtnResult<_>>()?;

    for street in network.graph.edge_weights_mut() {
        street.label = None;
    }
    for (edge, value) in resolved {
        network.graph[edge].label = Some(value.clone());
    }
    debug!(streets = assignments.len(), "applied partition labels");
    Ok(())
}

/// Resolve stored street ids against the live graph.
pub(crate) fn resolve_edges(
    ids: &[StreetId],
    street_map: &HashMap<StreetId, EdgeIndex>,
) -> LtnResult<HashSet<EdgeIndex>> {
    ids.iter()
        .map(|id| {
            street_map.get(id).copied().ok_or_else(|| {
                LtnError::Network(format!(
                    "street id {} does not resolve in the graph",
                    id.value()
                ))
            })
        })
        .collect()
}
