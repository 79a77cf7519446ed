//! Layer merge rules for the persisted configuration.

pub mod merge_policy;
