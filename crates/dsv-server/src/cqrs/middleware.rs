//! Marker traits separating write operations from read operations
//!
//! Commands change a mapping and are logged at `info` when they succeed;
//! queries only read.

/// A write operation
pub trait Command {}

/// A read-only operation
pub trait Query {}
