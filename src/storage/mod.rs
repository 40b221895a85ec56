mod file_cache;

pub use file_cache::{cache_key, CacheError, FileCache};
