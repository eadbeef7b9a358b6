//! # ltn-io: Run Persistence for Street Network Analysis
//!
//! Persists analysis runs produced by `ltn-algo` and round-trips street
//! networks through a portable record form.
//!
//! ## Layout
//!
//! One directory per named run under an explicit store root:
//!
//! ```text
//! <root>/<run-name>/manifest.json        run summary and timestamp
//! <root>/<run-name>/metric.json          the Metric aggregate
//! <root>/<run-name>/decomposition.json   decomposition state (edge-id sets)
//! <root>/<run-name>/network.json         optional portable network copy
//! ```
//!
//! The decomposition record never embeds the live graph. On reload, its
//! edge-id sets are re-bound against a freshly loaded network and verified
//! to resolve (see [`RunStore::load_decomposition_for`]).

pub mod record;
pub mod store;

pub use record::{JunctionRecord, NetworkRecord, StreetRecord};
pub use store::{RunManifest, RunStore};
