//! scalar-api: Client for the Scalar explore/statistics REST API
//!
//! Listing and statistics queries go through the generic `POST /api/x` envelope.
//! Asynchronously processed cross-chain commands are awaited with [`poll_until`].

pub mod client;
pub mod dto;
pub mod poller;

pub use client::{ScalarClient, ScalarResource};
pub use dto::{
    CrossChainStatus, CrossChainTx, ListParams, Paged, QueryEnvelope, StatMetric, StatPoint,
    StatParams,
};
pub use poller::{poll_json, poll_until, PollConfig, ResourceFetcher};
