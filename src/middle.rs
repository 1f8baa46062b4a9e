//! The middle stage: locating the snippet and building its control-flow
//! graph.

pub mod cfg;
pub mod snippet;

pub use cfg::Cfg;
pub use snippet::{Bounds, Escape, Outcome};
