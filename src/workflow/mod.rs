//! Operator workflows over the generators and both content stores.
//!
//! Every workflow ends in a reported outcome; generation, publish and import
//! paths also leave an audit entry (see [`crate::audit`]).

mod generate;
mod publish;
mod transfer;

pub use generate::*;
pub use publish::*;
pub use transfer::*;
