//! Integration tests for spark-ui-router
//!
//! These tests require a Kubernetes cluster (kind) to run and tell the story
//! of a Spark job's driver UI being exposed and cleaned up.
//!
//! # Test Organization
//!
//! - `route_lifecycle`: Stories about Routes appearing for driver Services,
//!   being repaired after manual deletion, and disappearing with the Service
//!
//! # Running These Tests
//!
//! ```bash
//! cargo test --test kind -- --ignored --nocapture
//! ```

mod helpers;
mod route_lifecycle;
