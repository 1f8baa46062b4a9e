//! Common definitions shared between the front/middle/back stages.

// Use a sorted set so the final exposed-register list and any other
// register-set output is deterministic without an explicit sort step.
pub use std::collections::BTreeSet as Set;
