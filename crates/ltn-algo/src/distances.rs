//! Pairwise distance matrices over the street network.
//!
//! Four flavours, all indexed by one fixed node ordering so they can be
//! compared elementwise:
//!
//! | Kind | Meaning |
//! |------|---------|
//! | E (projected)  | Planar Euclidean norm between projected coordinates |
//! | E (haversine)  | Great-circle distance between geographic coordinates |
//! | S              | Shortest path over the full network |
//! | N              | Shortest path with through-traffic banned from cell interiors |
//!
//! The shortest-path kinds run one Dijkstra per source node over read-only
//! graph state. Sources are grouped into chunks and dispatched across a
//! bounded rayon pool; each task returns its rows tagged with their fixed
//! index, so the merged matrix is deterministic regardless of completion
//! order. Unreachable pairs get [`f64::INFINITY`], never an error.

use ltn_core::{JunctionId, LtnError, LtnResult, Street, StreetNetwork};
use petgraph::algo::dijkstra;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::{EdgeFiltered, EdgeRef};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::decompose::{resolve_edges, Decomposition};
use crate::overlap::has_pairwise_overlap;

/// Mean earth radius in metres, for the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_009.0;

/// Default number of source nodes per scheduled batch. Larger batches
/// amortize per-task overhead; above roughly this value the returns diminish.
pub const DEFAULT_CHUNK_SIZE: usize = 3;

/// Edge weight used by the shortest-path kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeWeight {
    /// Street length in metres. Validated non-negative before any search runs.
    Length,
    /// Unit hop count.
    Unit,
}

/// Batch-computation knobs, passed explicitly per call.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixOptions {
    /// Source nodes (or cell pairs, for the restricted kind) per batch.
    pub chunk_size: usize,
    /// Worker pool size; defaults to `min(32, cores + 4)`.
    pub num_workers: Option<usize>,
    /// Check cell interiors for overlap before the restricted computation.
    pub check_overlap: bool,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            num_workers: None,
            check_overlap: true,
        }
    }
}

/// Worker pool bound when none is configured: `min(32, cores + 4)`.
pub fn default_workers() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores + 4).min(32)
}

fn worker_pool(num_workers: Option<usize>) -> LtnResult<rayon::ThreadPool> {
    let workers = num_workers.unwrap_or_else(default_workers).max(1);
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|err| LtnError::Other(format!("failed to build worker pool: {err}")))
}

/// A square distance matrix indexed by a fixed junction ordering.
///
/// Values are row-major; entry (i, j) is the distance from `order[i]` to
/// `order[j]`. `f64::INFINITY` is the unreachable sentinel. Serialization
/// stores the flat value array with non-finite entries encoded as nulls,
/// plus the ordering used to build it, so a round trip restores the matrix
/// field-for-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    order: Vec<JunctionId>,
    #[serde(with = "finite_or_null")]
    values: Vec<f64>,
}

impl DistanceMatrix {
    fn filled(order: Vec<JunctionId>, fill: f64) -> Self {
        let n = order.len();
        Self {
            order,
            values: vec![fill; n * n],
        }
    }

    /// Build a matrix from a flat row-major value array.
    pub fn from_values(order: Vec<JunctionId>, values: Vec<f64>) -> LtnResult<Self> {
        if values.len() != order.len() * order.len() {
            return Err(LtnError::Validation(format!(
                "expected {} matrix entries for {} junctions, got {}",
                order.len() * order.len(),
                order.len(),
                values.len()
            )));
        }
        Ok(Self { order, values })
    }

    /// Matrix dimension (number of junctions in the ordering).
    pub fn n(&self) -> usize {
        self.order.len()
    }

    /// The junction ordering the matrix is indexed by.
    pub fn order(&self) -> &[JunctionId] {
        &self.order
    }

    /// Flat row-major values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.order.len() + j]
    }

    #[inline]
    fn set(&mut self, i: usize, j: usize, value: f64) {
        self.values[i * self.order.len() + j] = value;
    }

    /// Elementwise symmetry within a tolerance; infinite entries must match
    /// exactly.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        let n = self.n();
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (self.get(i, j), self.get(j, i));
                let matches = if a.is_finite() && b.is_finite() {
                    (a - b).abs() <= tol
                } else {
                    a == b
                };
                if !matches {
                    return false;
                }
            }
        }
        true
    }
}

/// Encodes non-finite entries as JSON nulls and restores them as the
/// unreachable sentinel on the way back in.
mod finite_or_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<Option<f64>> = values
            .iter()
            .map(|&value| value.is_finite().then_some(value))
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let encoded = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(encoded
            .into_iter()
            .map(|value| value.unwrap_or(f64::INFINITY))
            .collect())
    }
}

fn resolve_order(network: &StreetNetwork, order: Option<&[JunctionId]>) -> Vec<JunctionId> {
    match order {
        Some(order) => order.to_vec(),
        None => network.junction_ids(),
    }
}

fn order_nodes(network: &StreetNetwork, order: &[JunctionId]) -> LtnResult<Vec<NodeIndex>> {
    let junction_map = network.junction_index_map();
    order
        .iter()
        .map(|id| {
            junction_map.get(id).copied().ok_or_else(|| {
                LtnError::Validation(format!("junction id {} is not in the graph", id.value()))
            })
        })
        .collect()
}

fn require_finite(value: Option<f64>, axis: &str, id: JunctionId) -> LtnResult<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(LtnError::Validation(format!(
            "junction {} has non-finite {axis} coordinate {v}",
            id.value()
        ))),
        None => Err(LtnError::Validation(format!(
            "junction {} is missing its {axis} coordinate",
            id.value()
        ))),
    }
}

fn require_in_range(
    value: Option<f64>,
    axis: &str,
    min: f64,
    max: f64,
    id: JunctionId,
) -> LtnResult<f64> {
    let v = require_finite(value, axis, id)?;
    if v < min || v > max {
        return Err(LtnError::Validation(format!(
            "junction {} has {axis} {v} outside [{min}, {max}]",
            id.value()
        )));
    }
    Ok(v)
}

/// Planar Euclidean distance matrix from projected coordinates.
///
/// Fails with a validation error if the network carries no Cartesian
/// projection, or any participating junction's x/y is missing or non-finite.
pub fn euclidean_distance_matrix_projected(
    network: &StreetNetwork,
    order: Option<&[JunctionId]>,
) -> LtnResult<DistanceMatrix> {
    if !network.is_projected() {
        return Err(LtnError::Validation(
            "network carries no Cartesian projection; project it before computing planar distances"
                .into(),
        ));
    }
    let order = resolve_order(network, order);
    let nodes = order_nodes(network, &order)?;
    let coords: Vec<(f64, f64)> = nodes
        .iter()
        .map(|&node| {
            let junction = &network.graph[node];
            Ok((
                require_finite(junction.x, "x", junction.id)?,
                require_finite(junction.y, "y", junction.id)?,
            ))
        })
        .collect::<LtnResult<_>>()?;

    let n = order.len();
    let mut matrix = DistanceMatrix::filled(order, 0.0);
    for i in 0..n {
        for j in (i + 1)..n {
            let (dx, dy) = (coords[i].0 - coords[j].0, coords[i].1 - coords[j].1);
            let d = dx.hypot(dy);
            matrix.set(i, j, d);
            matrix.set(j, i, d);
        }
    }
    Ok(matrix)
}

fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}

/// Great-circle distance matrix from geographic coordinates.
///
/// Fails with a validation error if any participating junction's lat/lon is
/// missing, non-finite, or outside [−90, 90] / [−180, 180].
pub fn euclidean_distance_matrix_haversine(
    network: &StreetNetwork,
    order: Option<&[JunctionId]>,
) -> LtnResult<DistanceMatrix> {
    let order = resolve_order(network, order);
    let nodes = order_nodes(network, &order)?;
    let coords: Vec<(f64, f64)> = nodes
        .iter()
        .map(|&node| {
            let junction = &network.graph[node];
            Ok((
                require_in_range(junction.lat, "latitude", -90.0, 90.0, junction.id)?,
                require_in_range(junction.lon, "longitude", -180.0, 180.0, junction.id)?,
            ))
        })
        .collect::<LtnResult<_>>()?;

    let n = order.len();
    let mut matrix = DistanceMatrix::filled(order, 0.0);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = haversine_m(coords[i].0, coords[i].1, coords[j].0, coords[j].1);
            matrix.set(i, j, d);
            matrix.set(j, i, d);
        }
    }
    Ok(matrix)
}

#[inline]
fn edge_cost(street: &Street, weight: EdgeWeight) -> f64 {
    match weight {
        EdgeWeight::Length => street.length,
        EdgeWeight::Unit => 1.0,
    }
}

/// Dijkstra's precondition: no negative weights anywhere, checked up front so
/// a bad edge is a typed failure instead of a silently wrong matrix.
fn validate_lengths(network: &StreetNetwork, weight: EdgeWeight) -> LtnResult<()> {
    if weight == EdgeWeight::Length {
        for street in network.graph.edge_weights() {
            if street.length < 0.0 {
                return Err(LtnError::Validation(format!(
                    "street {} has negative length {}",
                    street.id.value(),
                    street.length
                )));
            }
        }
    }
    Ok(())
}

/// Unrestricted shortest-path distance matrix over the full network.
///
/// One Dijkstra per source node, batched across the worker pool; rows merge
/// by fixed index. Unreachable pairs get the infinity sentinel.
pub fn shortest_path_distance_matrix(
    network: &StreetNetwork,
    weight: EdgeWeight,
    order: Option<&[JunctionId]>,
    options: &MatrixOptions,
) -> LtnResult<DistanceMatrix> {
    validate_lengths(network, weight)?;
    let order = resolve_order(network, order);
    let nodes = order_nodes(network, &order)?;
    let n = order.len();
    let position: HashMap<NodeIndex, usize> =
        nodes.iter().copied().enumerate().map(|(i, node)| (node, i)).collect();

    debug!(
        sources = n,
        chunk_size = options.chunk_size,
        "computing shortest-path distance matrix"
    );
    let sources: Vec<(usize, NodeIndex)> = nodes.iter().copied().enumerate().collect();
    let pool = worker_pool(options.num_workers)?;
    let rows: Vec<(usize, Vec<f64>)> = pool.install(|| {
        sources
            .par_chunks(options.chunk_size.max(1))
            .flat_map_iter(|chunk| {
                chunk
                    .iter()
                    .map(|&(row, source)| {
                        let reached =
                            dijkstra(&network.graph, source, None, |edge| {
                                edge_cost(edge.weight(), weight)
                            });
                        let mut values = vec![f64::INFINITY; n];
                        for (node, distance) in reached {
                            if let Some(&column) = position.get(&node) {
                                values[column] = distance;
                            }
                        }
                        values[row] = 0.0;
                        (row, values)
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    });

    let mut matrix = DistanceMatrix::filled(order, f64::INFINITY);
    for (row, values) in rows {
        for (column, value) in values.into_iter().enumerate() {
            matrix.set(row, column, value);
        }
    }
    Ok(matrix)
}

/// Restricted ("no through-traffic") shortest-path distance matrix.
///
/// Routing through a cell interior between two different boundary points is
/// banned; travel staying inside one cell, or on the sparsified skeleton, is
/// unrestricted. The work is decomposed into cell pairs: for the pair
/// (a, b) the admissible edge set is the skeleton plus the two cells' own
/// streets, so a search can enter a cell only when one of its endpoints
/// lives there. The pairs of the rest group (skeleton nodes) route over the
/// skeleton alone. Pair blocks are batched across the worker pool and merged
/// by fixed index.
///
/// When `check_overlap` is set, the cells' interior node sets are validated
/// to be pairwise disjoint first — with shared interiors "through" is
/// ambiguous, and the computation fails with a validation error.
pub fn restricted_distance_matrix(
    network: &StreetNetwork,
    decomposition: &Decomposition,
    weight: EdgeWeight,
    order: Option<&[JunctionId]>,
    options: &MatrixOptions,
) -> LtnResult<DistanceMatrix> {
    validate_lengths(network, weight)?;

    let interiors = decomposition.interior_junctions(network)?;
    if options.check_overlap && !interiors.is_empty() {
        let groups: Vec<Vec<JunctionId>> =
            interiors.iter().map(|(_, members)| members.clone()).collect();
        let overlap = has_pairwise_overlap(&groups)?;
        for i in 0..overlap.len() {
            for j in (i + 1)..overlap.len() {
                if overlap[i][j] {
                    return Err(LtnError::Validation(format!(
                        "interior node sets of {} and {} overlap; through-traffic restriction is ambiguous",
                        interiors[i].0, interiors[j].0
                    )));
                }
            }
        }
    }

    let order = match order {
        Some(order) => order.to_vec(),
        None => decomposition.ordered_junctions()?.to_vec(),
    };
    let nodes = order_nodes(network, &order)?;
    let n = order.len();
    let position_of: HashMap<JunctionId, usize> =
        order.iter().copied().enumerate().map(|(i, id)| (id, i)).collect();

    let street_map = network.street_index_map();
    let sparsified_view = decomposition.sparsified.as_ref().ok_or_else(|| {
        LtnError::Precondition("sparsified skeleton not derived before restricted distances".into())
    })?;
    let sparsified_edges = resolve_edges(&sparsified_view.edges, &street_map)?;
    let cell_edges: Vec<HashSet<EdgeIndex>> = decomposition
        .cells()?
        .iter()
        .map(|cell| resolve_edges(cell.edges, &street_map))
        .collect::<LtnResult<_>>()?;

    // matrix positions per cell interior, plus one rest group (the skeleton)
    let mut group_positions: Vec<Vec<usize>> = interiors
        .iter()
        .map(|(_, members)| {
            members
                .iter()
                .filter_map(|id| position_of.get(id).copied())
                .collect()
        })
        .collect();
    let mut grouped = vec![false; n];
    for positions in &group_positions {
        for &p in positions {
            grouped[p] = true;
        }
    }
    group_positions.push((0..n).filter(|&p| !grouped[p]).collect());

    let m = group_positions.len();
    let pairs: Vec<(usize, usize)> = (0..m)
        .flat_map(|a| (a..m).map(move |b| (a, b)))
        .collect();
    debug!(
        cells = cell_edges.len(),
        pair_blocks = pairs.len(),
        chunk_size = options.chunk_size,
        "computing restricted distance matrix"
    );

    let pool = worker_pool(options.num_workers)?;
    let partials: Vec<(usize, Vec<(usize, f64)>)> = pool.install(|| {
        pairs
            .par_chunks(options.chunk_size.max(1))
            .flat_map_iter(|chunk| {
                let mut out: Vec<(usize, Vec<(usize, f64)>)> = Vec::new();
                for &(a, b) in chunk {
                    let mut allowed = sparsified_edges.clone();
                    if let Some(edges) = cell_edges.get(a) {
                        allowed.extend(edges);
                    }
                    if b != a {
                        if let Some(edges) = cell_edges.get(b) {
                            allowed.extend(edges);
                        }
                    }
                    let filtered =
                        EdgeFiltered::from_fn(&network.graph, |edge| allowed.contains(&edge.id()));
                    // one directed block: Dijkstra from every source position,
                    // keeping the distances to the target positions
                    let mut block = |source_positions: &[usize], target_positions: &[usize]| {
                        for &source in source_positions {
                            let reached = dijkstra(&filtered, nodes[source], None, |edge| {
                                edge_cost(edge.weight(), weight)
                            });
                            let entries: Vec<(usize, f64)> = target_positions
                                .iter()
                                .filter_map(|&target| {
                                    reached.get(&nodes[target]).map(|&d| (target, d))
                                })
                                .collect();
                            out.push((source, entries));
                        }
                    };
                    block(&group_positions[a], &group_positions[b]);
                    if a != b {
                        block(&group_positions[b], &group_positions[a]);
                    }
                }
                out
            })
            .collect()
    });

    let mut matrix = DistanceMatrix::filled(order, f64::INFINITY);
    for i in 0..n {
        matrix.set(i, i, 0.0);
    }
    for (row, entries) in partials {
        for (column, value) in entries {
            matrix.set(row, column, value);
        }
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompose::{DecomposeOptions, Decomposition};
    use crate::partition::LabelPartitioner;
    use crate::test_utils::{overlapping_cells, spine_and_cells, square_network};
    use ltn_core::{Junction, Street, StreetId};

    fn positions(matrix: &DistanceMatrix) -> HashMap<JunctionId, usize> {
        matrix
            .order()
            .iter()
            .copied()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect()
    }

    fn run_decomposition(network: &mut StreetNetwork) -> Decomposition {
        let mut decomposition = Decomposition::new("test");
        decomposition
            .run(network, &LabelPartitioner, &DecomposeOptions::default())
            .unwrap();
        decomposition
    }

    #[test]
    fn test_projected_matrix_three_four_five() {
        let mut network = StreetNetwork::with_crs("EPSG:32633");
        let a = network.add_junction(Junction::new(JunctionId::new(0)).with_projected(0.0, 0.0));
        let b = network.add_junction(Junction::new(JunctionId::new(1)).with_projected(3.0, 4.0));
        network.add_street(a, b, Street::new(StreetId::new(0), 5.0));

        let matrix = euclidean_distance_matrix_projected(&network, None).unwrap();
        assert_eq!(matrix.get(0, 1), 5.0);
        assert_eq!(matrix.get(0, 0), 0.0);
        assert!(matrix.is_symmetric(1e-12));
    }

    #[test]
    fn test_projected_matrix_respects_explicit_order() {
        let network = spine_and_cells();
        let mut order = network.junction_ids();
        order.reverse();
        let matrix = euclidean_distance_matrix_projected(&network, Some(&order)).unwrap();
        assert_eq!(matrix.order(), &order[..]);
        // s0 and s2 are 200 m apart regardless of where they sit in the order.
        let pos = positions(&matrix);
        assert_eq!(
            matrix.get(pos[&JunctionId::new(0)], pos[&JunctionId::new(2)]),
            200.0
        );
    }

    #[test]
    fn test_projected_requires_projection_marker() {
        let mut network = spine_and_cells();
        network.crs = Some("EPSG:4326".into());
        assert!(matches!(
            euclidean_distance_matrix_projected(&network, None),
            Err(LtnError::Validation(_))
        ));
        network.crs = None;
        assert!(matches!(
            euclidean_distance_matrix_projected(&network, None),
            Err(LtnError::Validation(_))
        ));
    }

    #[test]
    fn test_projected_rejects_faulty_coordinates() {
        for (x, y) in [
            (None, Some(0.0)),
            (Some(0.0), None),
            (Some(f64::INFINITY), Some(0.0)),
            (Some(0.0), Some(f64::NEG_INFINITY)),
            (Some(f64::NAN), Some(0.0)),
        ] {
            let mut network = spine_and_cells();
            let first = network.graph.node_indices().next().unwrap();
            network.graph[first].x = x;
            network.graph[first].y = y;
            assert!(
                matches!(
                    euclidean_distance_matrix_projected(&network, None),
                    Err(LtnError::Validation(_))
                ),
                "x={x:?} y={y:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_haversine_quarter_meridian() {
        let mut network = StreetNetwork::new();
        let a = network.add_junction(Junction::new(JunctionId::new(0)).with_geographic(0.0, 0.0));
        let b = network.add_junction(Junction::new(JunctionId::new(1)).with_geographic(0.0, 90.0));
        network.add_street(a, b, Street::new(StreetId::new(0), 1.0));

        let matrix = euclidean_distance_matrix_haversine(&network, None).unwrap();
        let quarter = std::f64::consts::FRAC_PI_2 * EARTH_RADIUS_M;
        assert!((matrix.get(0, 1) - quarter).abs() < 1.0);
        assert!(matrix.is_symmetric(1e-9));
    }

    #[test]
    fn test_haversine_rejects_faulty_coordinates() {
        for (lat, lon) in [
            (None, Some(0.0)),
            (Some(0.0), None),
            (Some(90.1), Some(0.0)),
            (Some(-90.1), Some(0.0)),
            (Some(0.0), Some(180.1)),
            (Some(0.0), Some(-180.1)),
            (Some(f64::INFINITY), Some(0.0)),
            (Some(0.0), Some(f64::NEG_INFINITY)),
        ] {
            let mut network = spine_and_cells();
            let first = network.graph.node_indices().next().unwrap();
            network.graph[first].lat = lat;
            network.graph[first].lon = lon;
            assert!(
                matches!(
                    euclidean_distance_matrix_haversine(&network, None),
                    Err(LtnError::Validation(_))
                ),
                "lat={lat:?} lon={lon:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_shortest_path_square_cycle() {
        let network = square_network();
        let matrix =
            shortest_path_distance_matrix(&network, EdgeWeight::Length, None, &MatrixOptions::default())
                .unwrap();
        // one-way cycle: 0→3 takes three hops, 3→0 one
        assert_eq!(matrix.get(0, 3), 3.0);
        assert_eq!(matrix.get(3, 0), 1.0);
        assert_eq!(matrix.get(0, 0), 0.0);
    }

    #[test]
    fn test_shortest_path_unit_weight_counts_hops() {
        let mut network = spine_and_cells();
        // make one spine street long; hop counting must ignore that
        let edge = network.street_index_map()[&StreetId::new(0)];
        network.graph[edge].length = 500.0;
        let matrix =
            shortest_path_distance_matrix(&network, EdgeWeight::Unit, None, &MatrixOptions::default())
                .unwrap();
        assert_eq!(matrix.get(0, 1), 1.0);
        assert_eq!(matrix.get(0, 2), 2.0);
    }

    #[test]
    fn test_shortest_path_unreachable_is_sentinel() {
        let mut network = StreetNetwork::new();
        let a = network.add_junction(Junction::new(JunctionId::new(0)));
        let b = network.add_junction(Junction::new(JunctionId::new(1)));
        let c = network.add_junction(Junction::new(JunctionId::new(2)));
        network.add_street(a, b, Street::new(StreetId::new(0), 1.0));
        let _ = c;

        let matrix =
            shortest_path_distance_matrix(&network, EdgeWeight::Length, None, &MatrixOptions::default())
                .unwrap();
        assert_eq!(matrix.get(0, 1), 1.0);
        assert!(matrix.get(1, 0).is_infinite());
        assert!(matrix.get(0, 2).is_infinite());
    }

    #[test]
    fn test_shortest_path_rejects_negative_weight() {
        let mut network = spine_and_cells();
        let edge = network.street_index_map()[&StreetId::new(0)];
        network.graph[edge].length = -1.0;
        assert!(matches!(
            shortest_path_distance_matrix(&network, EdgeWeight::Length, None, &MatrixOptions::default()),
            Err(LtnError::Validation(_))
        ));
    }

    #[test]
    fn test_shortest_path_batching_is_deterministic() {
        let network = spine_and_cells();
        let sequential = shortest_path_distance_matrix(
            &network,
            EdgeWeight::Length,
            None,
            &MatrixOptions {
                chunk_size: 1,
                num_workers: Some(1),
                check_overlap: true,
            },
        )
        .unwrap();
        let batched = shortest_path_distance_matrix(
            &network,
            EdgeWeight::Length,
            None,
            &MatrixOptions {
                chunk_size: 4,
                num_workers: Some(4),
                check_overlap: true,
            },
        )
        .unwrap();
        assert_eq!(sequential, batched);
    }

    #[test]
    fn test_triangle_inequality_where_finite() {
        let network = spine_and_cells();
        let matrix =
            shortest_path_distance_matrix(&network, EdgeWeight::Length, None, &MatrixOptions::default())
                .unwrap();
        let n = matrix.n();
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    let (ij, ik, kj) = (matrix.get(i, j), matrix.get(i, k), matrix.get(k, j));
                    if ij.is_finite() && ik.is_finite() && kj.is_finite() {
                        assert!(ij <= ik + kj + 1e-9);
                    }
                    assert!(matrix.get(i, j) >= 0.0);
                }
            }
        }
    }

    #[test]
    fn test_restricted_bans_through_traffic() {
        let mut network = spine_and_cells();
        let decomposition = run_decomposition(&mut network);
        let restricted = restricted_distance_matrix(
            &network,
            &decomposition,
            EdgeWeight::Length,
            None,
            &MatrixOptions::default(),
        )
        .unwrap();
        let shortest =
            shortest_path_distance_matrix(&network, EdgeWeight::Length, None, &MatrixOptions::default())
                .unwrap();

        let pos = positions(&restricted);
        let (s0, s2, a) = (
            pos[&JunctionId::new(0)],
            pos[&JunctionId::new(2)],
            pos[&JunctionId::new(3)],
        );
        let shortest_pos = positions(&shortest);

        // Unrestricted routing cuts through cell A's interior; banned, the
        // route falls back to the spine.
        assert_eq!(
            shortest.get(shortest_pos[&JunctionId::new(0)], shortest_pos[&JunctionId::new(2)]),
            1.0
        );
        assert_eq!(restricted.get(s0, s2), 2.0);

        // Entering a cell to reach its interior stays allowed.
        assert_eq!(restricted.get(s0, a), 0.5);

        // Cross-cell trips route interior → skeleton → interior.
        let b1 = pos[&JunctionId::new(4)];
        assert_eq!(restricted.get(b1, a), 2.5);

        // The ban never shortens a trip.
        for i in 0..restricted.n() {
            for j in 0..restricted.n() {
                let (id_a, id_b) = (restricted.order()[i], restricted.order()[j]);
                let s = shortest.get(shortest_pos[&id_a], shortest_pos[&id_b]);
                assert!(restricted.get(i, j) + 1e-9 >= s);
            }
        }
    }

    #[test]
    fn test_restricted_default_order_is_canonical() {
        let mut network = spine_and_cells();
        let decomposition = run_decomposition(&mut network);
        let matrix = restricted_distance_matrix(
            &network,
            &decomposition,
            EdgeWeight::Length,
            None,
            &MatrixOptions::default(),
        )
        .unwrap();
        assert_eq!(matrix.order(), decomposition.ordered_junctions().unwrap());
    }

    #[test]
    fn test_restricted_rejects_overlapping_interiors() {
        let mut network = overlapping_cells();
        let decomposition = run_decomposition(&mut network);
        let result = restricted_distance_matrix(
            &network,
            &decomposition,
            EdgeWeight::Length,
            None,
            &MatrixOptions::default(),
        );
        assert!(matches!(result, Err(LtnError::Validation(_))));
    }

    #[test]
    fn test_restricted_overlap_check_can_be_skipped() {
        let mut network = overlapping_cells();
        let decomposition = run_decomposition(&mut network);
        let result = restricted_distance_matrix(
            &network,
            &decomposition,
            EdgeWeight::Length,
            None,
            &MatrixOptions {
                check_overlap: false,
                ..MatrixOptions::default()
            },
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_matrix_round_trip_with_unreachable_entries() {
        let order = vec![JunctionId::new(0), JunctionId::new(1)];
        let matrix =
            DistanceMatrix::from_values(order, vec![0.0, f64::INFINITY, 2.5, 0.0]).unwrap();
        let json = serde_json::to_string(&matrix).unwrap();
        assert!(json.contains("null"));
        let back: DistanceMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(matrix, back);
    }

    #[test]
    fn test_from_values_checks_dimensions() {
        assert!(matches!(
            DistanceMatrix::from_values(vec![JunctionId::new(0)], vec![0.0, 1.0]),
            Err(LtnError::Validation(_))
        ));
    }
}
