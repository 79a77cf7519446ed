//! Integration tests for sendscript job script synthesis

mod config_integration;
mod directive_files;
mod end_to_end;
mod logging_default;
mod test_utils;
