//! Integration tests - whole traversals compiled and lowered through the public API
//!
//! These tests verify that dispatch, scopes, lowering and the analyses work together.

mod nested_scope_tests;
mod traversal_compilation_tests;
