//! Metric aggregation over a decomposition and its distance matrices.
//!
//! [`Metric`] is the persisted unit of one analysis run: coverage, component
//! counts, average path lengths per distance kind, and the
//! directness/efficiency ratios between kinds, together with the distance
//! matrices themselves. Every field starts in an unset sentinel state and is
//! populated exactly once per [`Metric::calculate_all`] call; recomputation
//! overwrites the whole struct, never parts of it.
//!
//! Kind letters follow the usual shorthand: E = straight-line (Euclidean),
//! S = unrestricted shortest path, N = shortest path with through-traffic
//! banned.

use ltn_core::{JunctionId, LtnError, LtnResult, StreetNetwork};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::decompose::Decomposition;
use crate::distances::{
    euclidean_distance_matrix_haversine, euclidean_distance_matrix_projected,
    restricted_distance_matrix, shortest_path_distance_matrix, DistanceMatrix, EdgeWeight,
    MatrixOptions,
};

/// Mean path length per distance kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathLengths {
    pub e: Option<f64>,
    pub s: Option<f64>,
    pub n: Option<f64>,
}

/// Mean detour-factor ratios between kind pairs: values near 1 mean the two
/// distance notions agree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Directness {
    /// E / S
    pub es: Option<f64>,
    /// E / N
    pub en: Option<f64>,
    /// S / N
    pub sn: Option<f64>,
}

/// Inverse-distance efficiency ratios between kind pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyRatios {
    /// inv(S) / inv(E)
    pub se: Option<f64>,
    /// inv(N) / inv(E)
    pub ne: Option<f64>,
    /// inv(N) / inv(S)
    pub ns: Option<f64>,
}

/// The four distance matrices of one run, all over the same node ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrices {
    /// Planar Euclidean, when the network is projected
    pub euclidean_projected: Option<DistanceMatrix>,
    /// Great-circle, when geographic coordinates are present
    pub euclidean_haversine: Option<DistanceMatrix>,
    /// Unrestricted shortest path (S)
    pub shortest_path: DistanceMatrix,
    /// Through-traffic-banned shortest path (N)
    pub restricted: DistanceMatrix,
}

impl DistanceMatrices {
    /// The straight-line matrix the E-kind metrics use: projected when
    /// available, great-circle otherwise.
    pub fn euclidean(&self) -> Option<&DistanceMatrix> {
        self.euclidean_projected
            .as_ref()
            .or(self.euclidean_haversine.as_ref())
    }
}

/// Aggregated metrics of one analysis run.
///
/// Serializes independently of the decomposition and the live graph; the
/// matrices carry their own node ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Fraction of total network length contained in surviving cells
    pub coverage: Option<f64>,
    /// Number of weakly-connected components found during splitting
    pub num_components: Option<usize>,
    pub avg_path_length: PathLengths,
    pub directness: Directness,
    pub global_efficiency: EfficiencyRatios,
    pub local_efficiency: EfficiencyRatios,
    pub matrices: Option<DistanceMatrices>,
}

impl Metric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the four distance matrices and every derived metric, replacing
    /// any previous contents wholesale.
    ///
    /// The matrices are indexed by the decomposition's canonical node
    /// ordering. At least one Euclidean flavour must be computable: the
    /// projected matrix when the network carries a projection, the
    /// great-circle matrix when every junction has geographic coordinates.
    pub fn calculate_all(
        &mut self,
        network: &StreetNetwork,
        decomposition: &Decomposition,
        options: &MatrixOptions,
    ) -> LtnResult<()> {
        let order = decomposition.ordered_junctions()?.to_vec();

        let euclidean_projected = network
            .is_projected()
            .then(|| euclidean_distance_matrix_projected(network, Some(&order)))
            .transpose()?;
        let has_geographic = network.num_junctions() > 0
            && network
                .graph
                .node_weights()
                .all(|junction| junction.lat.is_some() && junction.lon.is_some());
        let euclidean_haversine = has_geographic
            .then(|| euclidean_distance_matrix_haversine(network, Some(&order)))
            .transpose()?;
        if euclidean_projected.is_none() && euclidean_haversine.is_none() {
            return Err(LtnError::Validation(
                "no usable coordinates: the network is unprojected and lacks geographic coordinates"
                    .into(),
            ));
        }

        let shortest_path =
            shortest_path_distance_matrix(network, EdgeWeight::Length, Some(&order), options)?;
        let restricted =
            restricted_distance_matrix(network, decomposition, EdgeWeight::Length, Some(&order), options)?;

        let matrices = DistanceMatrices {
            euclidean_projected,
            euclidean_haversine,
            shortest_path,
            restricted,
        };
        let euclidean = matrices.euclidean().ok_or_else(|| {
            LtnError::Validation("no Euclidean distance matrix available".into())
        })?;
        let shortest = &matrices.shortest_path;
        let banned = &matrices.restricted;

        let coverage = coverage(network, decomposition)?;

        *self = Metric {
            coverage: Some(coverage),
            num_components: decomposition.num_components(),
            avg_path_length: PathLengths {
                e: mean_path_length(euclidean),
                s: mean_path_length(shortest),
                n: mean_path_length(banned),
            },
            directness: Directness {
                es: directness_ratio(euclidean, shortest),
                en: directness_ratio(euclidean, banned),
                sn: directness_ratio(shortest, banned),
            },
            global_efficiency: EfficiencyRatios {
                se: efficiency_ratio(shortest, euclidean),
                ne: efficiency_ratio(banned, euclidean),
                ns: efficiency_ratio(banned, shortest),
            },
            local_efficiency: EfficiencyRatios {
                se: local_efficiency_ratio(network, shortest, euclidean)?,
                ne: local_efficiency_ratio(network, banned, euclidean)?,
                ns: local_efficiency_ratio(network, banned, shortest)?,
            },
            matrices: Some(matrices),
        };
        info!(
            coverage,
            components = self.num_components,
            "aggregated metrics"
        );
        Ok(())
    }
}

impl std::fmt::Display for Metric {
    /// Compact "key: value; " summary of the populated scalar fields.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn kinds(entries: [(&str, Option<f64>); 3]) -> Option<String> {
            let set: Vec<String> = entries
                .iter()
                .filter_map(|&(kind, value)| value.map(|v| format!("{kind}: {v}")))
                .collect();
            (!set.is_empty()).then(|| set.join(", "))
        }

        if let Some(coverage) = self.coverage {
            write!(f, "coverage: {coverage}; ")?;
        }
        if let Some(num_components) = self.num_components {
            write!(f, "num_components: {num_components}; ")?;
        }
        let path = &self.avg_path_length;
        if let Some(set) = kinds([("E", path.e), ("S", path.s), ("N", path.n)]) {
            write!(f, "avg_path_length: {set}; ")?;
        }
        let d = &self.directness;
        if let Some(set) = kinds([("ES", d.es), ("EN", d.en), ("SN", d.sn)]) {
            write!(f, "directness: {set}; ")?;
        }
        let g = &self.global_efficiency;
        if let Some(set) = kinds([("SE", g.se), ("NE", g.ne), ("NS", g.ns)]) {
            write!(f, "global_efficiency: {set}; ")?;
        }
        let l = &self.local_efficiency;
        if let Some(set) = kinds([("SE", l.se), ("NE", l.ne), ("NS", l.ns)]) {
            write!(f, "local_efficiency: {set}; ")?;
        }
        Ok(())
    }
}

/// Fraction of total network length contained in the surviving cells.
pub fn coverage(network: &StreetNetwork, decomposition: &Decomposition) -> LtnResult<f64> {
    let total = network.total_length();
    if total <= 0.0 {
        return Err(LtnError::Validation(
            "network has zero total length; coverage is undefined".into(),
        ));
    }
    let cells = decomposition.cells()?;
    Ok(cells.iter().map(|cell| cell.length_total).sum::<f64>() / total)
}

/// Arithmetic mean of all finite off-diagonal entries; unreachable pairs are
/// excluded from the mean, not treated as zero. `None` when no pair is finite.
pub fn mean_path_length(matrix: &DistanceMatrix) -> Option<f64> {
    let n = matrix.n();
    let mut sum = 0.0;
    let mut count = 0usize;
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let d = matrix.get(i, j);
            if d.is_finite() {
                sum += d;
                count += 1;
            }
        }
    }
    (count > 0).then(|| sum / count as f64)
}

/// Mean of `numerator / denominator` over off-diagonal pairs where both
/// entries are finite and the denominator positive.
pub fn directness_ratio(numerator: &DistanceMatrix, denominator: &DistanceMatrix) -> Option<f64> {
    if numerator.n() != denominator.n() {
        return None;
    }
    let n = numerator.n();
    let mut sum = 0.0;
    let mut count = 0usize;
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let (x, y) = (numerator.get(i, j), denominator.get(i, j));
            if x.is_finite() && y.is_finite() && y > 0.0 {
                sum += x / y;
                count += 1;
            }
        }
    }
    (count > 0).then(|| sum / count as f64)
}

#[inline]
fn inverse_distance(d: f64) -> f64 {
    if d.is_finite() && d > 0.0 {
        1.0 / d
    } else {
        0.0
    }
}

/// Mean of `inv(numerator) / inv(denominator)` over off-diagonal pairs.
///
/// An unreachable numerator entry contributes zero efficiency rather than
/// being excluded — efficiency is defined via inverse distance. Pairs whose
/// denominator inverse is zero are skipped (the ratio is undefined there).
pub fn efficiency_ratio(numerator: &DistanceMatrix, denominator: &DistanceMatrix) -> Option<f64> {
    if numerator.n() != denominator.n() {
        return None;
    }
    let n = numerator.n();
    let mut sum = 0.0;
    let mut count = 0usize;
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let inv_den = inverse_distance(denominator.get(i, j));
            if inv_den == 0.0 {
                continue;
            }
            sum += inverse_distance(numerator.get(i, j)) / inv_den;
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f64)
}

/// Per-node efficiency ratio over the node's immediate neighbourhood, then
/// averaged across nodes.
///
/// For each junction the inverse distances to its graph neighbours are
/// summed for both kinds and the sums' ratio taken; junctions whose
/// denominator sum is zero are skipped. This captures how cell-local, rather
/// than network-wide, the efficiency loss is.
pub fn local_efficiency_ratio(
    network: &StreetNetwork,
    numerator: &DistanceMatrix,
    denominator: &DistanceMatrix,
) -> LtnResult<Option<f64>> {
    if numerator.n() != denominator.n() || numerator.order() != denominator.order() {
        return Ok(None);
    }
    let junction_map = network.junction_index_map();
    let position_of: HashMap<JunctionId, usize> = numerator
        .order()
        .iter()
        .copied()
        .enumerate()
        .map(|(i, id)| (id, i))
        .collect();

    let mut sum = 0.0;
    let mut count = 0usize;
    for (i, id) in numerator.order().iter().enumerate() {
        let node = junction_map.get(id).copied().ok_or_else(|| {
            LtnError::Validation(format!("junction id {} is not in the graph", id.value()))
        })?;
        let mut neighbour_positions: Vec<usize> = network
            .graph
            .neighbors_undirected(node)
            .filter_map(|neighbour| position_of.get(&network.graph[neighbour].id).copied())
            .filter(|&j| j != i)
            .collect();
        neighbour_positions.sort_unstable();
        neighbour_positions.dedup();

        let mut num_sum = 0.0;
        let mut den_sum = 0.0;
        for &j in &neighbour_positions {
            num_sum += inverse_distance(numerator.get(i, j));
            den_sum += inverse_distance(denominator.get(i, j));
        }
        if den_sum > 0.0 {
            sum += num_sum / den_sum;
            count += 1;
        }
    }
    Ok((count > 0).then(|| sum / count as f64))
}
