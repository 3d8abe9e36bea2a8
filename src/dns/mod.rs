//! DNS layer: per-run resolution cache, resolver capability and wildcard
//! detection.

mod cache;
pub mod resolver;
pub mod wildcard;

pub use cache::DnsCache;
pub use resolver::{filter_active, resolve_cached, DnsResolver, FnResolver, HickoryResolver};
