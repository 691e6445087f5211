//! Common test utilities for rasteroverlay.
//!
//! This module provides shared fixtures and image helpers for the
//! integration tests.

// Re-export all common test utilities
pub mod image_utils;
pub mod test_data;
