pub mod cache;
pub mod config;
pub mod error;

pub use cache::{Restaurant, RestaurantCacheOperations, SyncOutcome};
pub use error::{CacheUnavailable, MalformedEntry, SyncError};
