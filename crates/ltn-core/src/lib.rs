//! # ltn-core: Street Network Modeling Core
//!
//! Provides the fundamental data structures and graph-based network model for
//! low-traffic-neighbourhood (superblock) analysis.
//!
//! ## Design Philosophy
//!
//! Street networks are modeled as **directed multigraphs** where:
//! - **Nodes**: Junctions with optional projected (x, y) and geographic
//!   (lat, lon) coordinates
//! - **Edges**: Streets with a non-negative length and an optional cell label
//!
//! This graph-based approach enables:
//! - Fast topological queries (connectivity, component detection)
//! - Efficient parallel analysis using rayon in `ltn-algo`
//! - Type-safe element access with newtype IDs
//! - Support for multiple parallel streets between the same junction pair
//!
//! ## Quick Start
//!
//! ```rust
//! use ltn_core::{Junction, JunctionId, Street, StreetId, StreetNetwork};
//!
//! let mut network = StreetNetwork::with_crs("EPSG:32633");
//!
//! let a = network.add_junction(
//!     Junction::new(JunctionId::new(0))
//!         .with_projected(0.0, 0.0)
//!         .with_geographic(48.13, 11.57),
//! );
//! let b = network.add_junction(
//!     Junction::new(JunctionId::new(1))
//!         .with_projected(120.0, 0.0)
//!         .with_geographic(48.13, 11.58),
//! );
//!
//! network.add_street(a, b, Street::new(StreetId::new(0), 120.0).with_label("residential"));
//!
//! assert_eq!(network.num_streets(), 1);
//! assert_eq!(network.total_length(), 120.0);
//! ```
//!
//! ## Core Data Structures
//!
//! - [`StreetNetwork`] - The main network container (petgraph `DiGraph<Junction, Street>`)
//! - [`Junction`] - A node with coordinate attributes
//! - [`Street`] - An edge with length and partition-label attributes
//! - Type-safe IDs: [`JunctionId`], [`StreetId`]
//!
//! ## ID System
//!
//! Every element has a unique ID (newtype wrapper around `usize`). Graph
//! indices (`NodeIndex`/`EdgeIndex`) are positional and die with the in-memory
//! graph; IDs are the stable handles that survive persistence, so everything
//! written to disk references elements by ID and is re-bound to a freshly
//! loaded graph on reload.
//!
//! ## Modules
//!
//! - [`diagnostics`] - Non-fatal issue reporting (consistency warnings)
//! - [`error`] - Unified error type and result alias
//! - [`graph_utils`] - Topological analysis (components, degrees, stats)

use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod diagnostics;
pub mod error;
pub mod graph_utils;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{LtnError, LtnResult};
pub use graph_utils::*;
pub use petgraph::graph::{EdgeIndex, NodeIndex};

/// The geographic (unprojected) coordinate reference system. A network whose
/// CRS is this value, or that has no CRS at all, carries no Cartesian
/// projection and cannot be used for planar distance computations.
pub const GEOGRAPHIC_CRS: &str = "EPSG:4326";

// Newtype wrappers for IDs for type safety
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct JunctionId(usize);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StreetId(usize);

impl JunctionId {
    #[inline]
    pub fn new(value: usize) -> Self {
        JunctionId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl StreetId {
    #[inline]
    pub fn new(value: usize) -> Self {
        StreetId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

/// A junction (street intersection or dead end) with optional coordinates.
///
/// Projected coordinates (x, y) live in the network's CRS; geographic
/// coordinates are WGS84 latitude/longitude. Either pair may be absent —
/// the distance computations that need them validate presence per pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    pub id: JunctionId,
    /// Projected easting, metres
    pub x: Option<f64>,
    /// Projected northing, metres
    pub y: Option<f64>,
    /// Geographic latitude, degrees
    pub lat: Option<f64>,
    /// Geographic longitude, degrees
    pub lon: Option<f64>,
}

impl Junction {
    pub fn new(id: JunctionId) -> Self {
        Self {
            id,
            x: None,
            y: None,
            lat: None,
            lon: None,
        }
    }

    pub fn with_projected(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_geographic(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }
}

/// A street segment with a length and an optional partition label.
///
/// `label` is the attribute the decomposition groups edges by; `None` is the
/// "unassigned" sentinel — such streets belong to no partition and end up in
/// the sparsified skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Street {
    pub id: StreetId,
    /// Segment length, metres. Non-negative by construction contract;
    /// shortest-path computations validate this before running.
    pub length: f64,
    /// Partition-assignment label; `None` means unassigned.
    pub label: Option<String>,
}

impl Street {
    pub fn new(id: StreetId, length: f64) -> Self {
        Self {
            id,
            length,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// The main street network container.
///
/// A directed multigraph: parallel streets between the same junction pair are
/// tracked independently, and a two-way street is represented as two directed
/// edges. The optional `crs` records the Cartesian projection the x/y
/// coordinates live in; [`GEOGRAPHIC_CRS`] (or no CRS) means unprojected.
#[derive(Debug, Default)]
pub struct StreetNetwork {
    pub graph: DiGraph<Junction, Street>,
    pub crs: Option<String>,
}

impl StreetNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crs(crs: impl Into<String>) -> Self {
        Self {
            graph: DiGraph::new(),
            crs: Some(crs.into()),
        }
    }

    /// True when the network carries a Cartesian projection marker.
    pub fn is_projected(&self) -> bool {
        matches!(&self.crs, Some(crs) if !crs.eq_ignore_ascii_case(GEOGRAPHIC_CRS))
    }

    pub fn add_junction(&mut self, junction: Junction) -> NodeIndex {
        self.graph.add_node(junction)
    }

    pub fn add_street(&mut self, from: NodeIndex, to: NodeIndex, street: Street) -> EdgeIndex {
        self.graph.add_edge(from, to, street)
    }

    pub fn num_junctions(&self) -> usize {
        self.graph.node_count()
    }

    pub fn num_streets(&self) -> usize {
        self.graph.edge_count()
    }

    /// Sum of all street lengths.
    pub fn total_length(&self) -> f64 {
        self.graph.edge_weights().map(|street| street.length).sum()
    }

    /// All junction IDs in graph iteration order.
    pub fn junction_ids(&self) -> Vec<JunctionId> {
        self.graph
            .node_indices()
            .map(|idx| self.graph[idx].id)
            .collect()
    }

    /// Lookup table from junction ID to graph index.
    pub fn junction_index_map(&self) -> HashMap<JunctionId, NodeIndex> {
        self.graph
            .node_indices()
            .map(|idx| (self.graph[idx].id, idx))
            .collect()
    }

    /// Lookup table from street ID to graph index.
    pub fn street_index_map(&self) -> HashMap<StreetId, EdgeIndex> {
        self.graph
            .edge_references()
            .map(|edge| (edge.weight().id, edge.id()))
            .collect()
    }
}
