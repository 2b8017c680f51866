//! Chain module - destination chain allow-list
//!
//! The registry is owned by a single bridge instance and only changes through
//! administrator calls. Lookups are pure.

mod registry;

pub use registry::{ChainConfig, ChainRegistry};
