//! Data models for the SEO publisher.
//!
//! Serialized field names are camelCase on the operator API.

mod audit;
mod generation;
mod post;

pub use audit::*;
pub use generation::*;
pub use post::*;
