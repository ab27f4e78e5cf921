//! Tests for tracing functionality
//!
//! These tests verify that the harness emits events with a subscriber installed when the
//! feature is enabled, and that everything works without it.

mod without_tracing;
