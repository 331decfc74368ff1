//! Public types for the Huginn API.

mod backend;
mod record;

pub use backend::{BackendConfiguration, SpeculativeDecoding};
pub use record::{ModelData, RequestMetadata, RequestResponsePair, RunnerSummary};
