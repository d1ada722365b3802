//! Domain types for the proxywatch lifecycle manager.
//!
//! This module contains the core data structures:
//! - ProxyLink: opaque MTProto proxy link token
//! - extract_proxy_links: pure text-to-links extraction

pub mod link;

// Re-export commonly used types
pub use link::{extract_proxy_links, ProxyLink};
