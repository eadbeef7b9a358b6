//! Portable network records.
//!
//! A [`NetworkRecord`] is the flat, serde-friendly form of a
//! [`StreetNetwork`]: junction and street rows referencing each other by
//! stable ID, never by graph index. Graph indices are positional and die
//! with the in-memory graph, so everything on disk goes through this form
//! and is re-bound on load.

use ltn_core::{Junction, JunctionId, LtnError, LtnResult, Street, StreetId, StreetNetwork};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionRecord {
    pub id: JunctionId,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetRecord {
    pub id: StreetId,
    pub from: JunctionId,
    pub to: JunctionId,
    pub length: f64,
    pub label: Option<String>,
}

/// Flat form of a street network for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub crs: Option<String>,
    pub junctions: Vec<JunctionRecord>,
    pub streets: Vec<StreetRecord>,
}

impl NetworkRecord {
    pub fn from_network(network: &StreetNetwork) -> Self {
        let junctions = network
            .graph
            .node_weights()
            .map(|junction| JunctionRecord {
                id: junction.id,
                x: junction.x,
                y: junction.y,
                lat: junction.lat,
                lon: junction.lon,
            })
            .collect();
        let streets = network
            .graph
            .edge_references()
            .map(|edge| StreetRecord {
                id: edge.weight().id,
                from: network.graph[edge.source()].id,
                to: network.graph[edge.target()].id,
                length: edge.weight().length,
                label: edge.weight().label.clone(),
            })
            .collect();
        Self {
            crs: network.crs.clone(),
            junctions,
            streets,
        }
    }

    /// Rebuild the in-memory graph. Duplicate junction IDs and dangling
    /// street endpoints are validation errors.
    pub fn to_network(&self) -> LtnResult<StreetNetwork> {
        let mut network = StreetNetwork {
            graph: Default::default(),
            crs: self.crs.clone(),
        };
        let mut nodes: HashMap<JunctionId, NodeIndex> =
            HashMap::with_capacity(self.junctions.len());
        for record in &self.junctions {
            if nodes.contains_key(&record.id) {
                return Err(LtnError::Validation(format!(
                    "duplicate junction id {}",
                    record.id.value()
                )));
            }
            let node = network.add_junction(Junction {
                id: record.id,
                x: record.x,
                y: record.y,
                lat: record.lat,
                lon: record.lon,
            });
            nodes.insert(record.id, node);
        }
        for record in &self.streets {
            let endpoint = |id: JunctionId| {
                nodes.get(&id).copied().ok_or_else(|| {
                    LtnError::Validation(format!(
                        "street {} references unknown junction {}",
                        record.id.value(),
                        id.value()
                    ))
                })
            };
            let (from, to) = (endpoint(record.from)?, endpoint(record.to)?);
            let mut street = Street::new(record.id, record.length);
            street.label = record.label.clone();
            network.add_street(from, to, street);
        }
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltn_algo::test_utils::spine_and_cells;

    #[test]
    fn test_network_record_round_trip() {
        let network = spine_and_cells();
        let record = NetworkRecord::from_network(&network);
        let rebuilt = record.to_network().unwrap();
        assert_eq!(NetworkRecord::from_network(&rebuilt), record);
        assert_eq!(rebuilt.num_junctions(), network.num_junctions());
        assert_eq!(rebuilt.total_length(), network.total_length());
        assert!(rebuilt.is_projected());
    }

    #[test]
    fn test_dangling_endpoint_rejected() {
        let mut record = NetworkRecord::from_network(&spine_and_cells());
        record.streets[0].to = JunctionId::new(999);
        assert!(matches!(
            record.to_network(),
            Err(LtnError::Validation(_))
        ));
    }

    #[test]
    fn test_duplicate_junction_rejected() {
        let mut record = NetworkRecord::from_network(&spine_and_cells());
        let duplicate = record.junctions[0].clone();
        record.junctions.push(duplicate);
        assert!(matches!(
            record.to_network(),
            Err(LtnError::Validation(_))
        ));
    }
}
