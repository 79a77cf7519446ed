//! Property tests entry point
//!
//! Includes all property test modules from the property/ subdirectory.

mod property;
