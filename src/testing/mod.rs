//! Test support.

pub mod host;

pub use host::MockHost;
