//! Script Synthesizer
//!
//! Orchestrates specification resolution and job script rendering.

pub mod builder;
pub mod flags;
pub mod template;

pub use builder::JobScriptBuilder;
pub use flags::JobFlags;
