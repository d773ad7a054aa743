//! Eventcache.
//!
//! Eventcache is a standalone service that keeps expensive lookups of an
//! event-management backend warm. It serves cacheable computations through a
//! configurable cache provider and runs the periodic background jobs that
//! refresh caches, recompute the leaderboard and clean up archived records.

mod cli;
mod server;

fn main() {
    match cli::execute() {
        Ok(()) => std::process::exit(0),
        Err(error) => {
            eventcache_service::logging::ensure_log_error(&error);
            std::process::exit(1);
        }
    }
}
