// Cache-aside helper over a Redis-compatible store.

mod aside;
pub mod keys;
mod memory;
mod store;

pub use aside::{Cache, CacheOptions, CacheStatus, Cached, DEFAULT_TTL};
pub use memory::MemoryStore;
pub use store::{CacheError, CacheStore, RedisStore};
