//! Property-based tests for merge invariants

mod merge_properties;
