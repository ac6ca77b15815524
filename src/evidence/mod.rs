//! Evidence resolution and retrieval.

pub mod fetcher;
pub mod locator;

pub use fetcher::{EvidenceSource, FetchPolicy, GatewayFetcher};
pub use locator::{ContentLocator, ResolvedEvidence};
