//! Role Manager Test Suite
//!
//! Exercises the authorization gate end to end against an in-memory
//! directory: effective rights through nested groups, role satisfaction,
//! role grants, catalog reloads and behavior while the directory is down.

pub mod concurrency_tests;

pub use test_utils::*;
