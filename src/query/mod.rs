//! Query federation over the document and graph stores
//!
//! Accepts composite queries (document field predicates plus relationship
//! constraints), plans which store answers which predicate, and merges
//! results into enriched entities.

mod federator;
mod types;

pub use federator::QueryFederator;
pub use types::{EnrichedEntity, FederatedQuery, DEFAULT_LIMIT};
