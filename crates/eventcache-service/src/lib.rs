//! The background caching and scheduled-refresh engine of the eventcache server.
//!
//! This crate contains the two subsystems the rest of the server builds on:
//!
//! - [`caching`]: a lazily populated, sliding-expiration cache with an optional
//!   remote backend and a registry that drives background keep-warm refreshes.
//! - [`jobs`]: a non-overlapping periodic job scheduler together with the
//!   standard maintenance jobs that run on it.
//!
//! Everything else (configuration, logging and metrics plumbing) exists in
//! service of those two.

#[macro_use]
pub mod metrics;

pub mod caching;
pub mod config;
pub mod jobs;
pub mod logging;
