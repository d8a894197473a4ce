//! Property-based tests for the block editor and the rewriters built on it.
