//! Tests for the CLI runtime.

mod backend;
