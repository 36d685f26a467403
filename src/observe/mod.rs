//! Observation Module
//!
//! The [`Cache`] decorator and the observers that receive its events.

mod cache;
mod events;
mod stats;

pub use cache::{Cache, CacheObserver};
pub use events::CacheEvent;
pub use stats::{CacheStats, StatsObserver, TracingObserver};
