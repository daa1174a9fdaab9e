//! Generic test harnesses shared across set implementations.
//!
//! Exposed as a normal (non-`#[cfg(test)]`-only) module behind the
//! `test-util` feature, the same way `crate::adt` exposes the trait
//! contracts these harnesses are generic over, so downstream integration
//! tests can reuse them.

pub mod adt;

pub use rand_gen::RandGen;
