//! Tests for the engine
//!
//! Organized by concern: in-frame transitions, sub-machine composition,
//! suspension/resume, failure handling, observers, and transition resolution.

mod helpers;

mod transition_tests;
