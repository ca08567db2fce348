//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Domain fixtures and fast test configuration
//! - A scripted remote client double with call recording


// Re-export commonly used utilities
pub use fixtures::*;
pub use mock_remote::*;
