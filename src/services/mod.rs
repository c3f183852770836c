// Service exports
pub mod appwrite;
pub mod cache;
pub mod store;

pub use appwrite::{AppwriteClient, AppwriteCollections};
pub use cache::{CacheError, CacheKey, CacheManager, CacheStats, CachedRideStore};
pub use store::{with_deadline, RideStore, StoreError};
