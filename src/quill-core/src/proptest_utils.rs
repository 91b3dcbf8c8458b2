//! Property-based testing utilities for quill-core.
//!
//! This module provides strategies for core types to enable property-based
//! testing with proptest.
