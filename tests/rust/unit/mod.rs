//! Unit tests - public API of single components, no end-to-end compilation

mod analyzer_tests;
mod step_catalogue_tests;
