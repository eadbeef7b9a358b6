//! # ltn-algo: Decomposition and Metric Algorithms for Street Networks
//!
//! This crate provides the analysis core for low-traffic-neighbourhood
//! (superblock) studies: decomposing a street network into traffic cells plus
//! a through-traffic skeleton, and quantifying how routing changes when
//! through-traffic is banned from the cell interiors.
//!
//! ## Pipeline
//!
//! | Stage | Entry point | What it does |
//! |-------|-------------|--------------|
//! | Partitioning | [`Partitioner`] | Strategy proposes a labeling or a skeleton |
//! | Decomposition | [`Decomposition::run`] | Partitions, components, sparsified complement |
//! | Overlap check | [`has_pairwise_overlap`] | Interior sets must be pairwise disjoint |
//! | Distances | [`shortest_path_distance_matrix`] and friends | Four matrix kinds over one node ordering |
//! | Metrics | [`Metric::calculate_all`] | Coverage, path lengths, directness, efficiency |
//!
//! ### Architecture
//!
//! Partitioning quality is pluggable behind the single-method [`Partitioner`]
//! strategy trait; the orchestration in [`Decomposition::run`] is a fixed
//! pipeline that calls the strategy exactly once. The decomposition holds no
//! live graph reference — every subgraph is an edge-id set plus summaries —
//! so its state and the [`Metric`] aggregate serialize independently and
//! re-bind to a freshly loaded graph.
//!
//! ### Parallelism
//!
//! Only the distance-matrix computations are parallel: source-node chunks
//! (unrestricted) and cell-pair blocks (restricted) are dispatched over a
//! bounded rayon pool, each worker reading shared state and returning
//! index-tagged slices that merge deterministically. Everything else is
//! single-threaded and synchronous.
//!
//! ## Example
//!
//! ```ignore
//! use ltn_algo::{DecomposeOptions, Decomposition, LabelPartitioner, MatrixOptions, Metric};
//!
//! let mut decomposition = Decomposition::new("munich_residential");
//! let diagnostics = decomposition.run(&mut network, &LabelPartitioner, &DecomposeOptions::default())?;
//! if diagnostics.has_warnings() {
//!     eprintln!("{diagnostics}");
//! }
//!
//! let mut metric = Metric::new();
//! metric.calculate_all(&network, &decomposition, &MatrixOptions::default())?;
//! println!("coverage: {:?}", metric.coverage);
//! ```

pub mod decompose;
pub mod distances;
pub mod metrics;
pub mod overlap;
pub mod partition;
pub mod test_utils;

pub use decompose::{DecomposeOptions, Decomposition};
pub use distances::{
    default_workers, euclidean_distance_matrix_haversine, euclidean_distance_matrix_projected,
    restricted_distance_matrix, shortest_path_distance_matrix, DistanceMatrix, EdgeWeight,
    MatrixOptions, DEFAULT_CHUNK_SIZE, EARTH_RADIUS_M,
};
pub use metrics::{
    coverage, directness_ratio, efficiency_ratio, local_efficiency_ratio, mean_path_length,
    Directness, DistanceMatrices, EfficiencyRatios, Metric, PathLengths,
};
pub use overlap::has_pairwise_overlap;
pub use partition::{
    CellRef, Component, LabelPartitioner, Partition, PartitionOutcome, Partitioner,
    SkeletonPartitioner, SubgraphView,
};
