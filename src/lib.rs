//! Fetches a remote IPTV channel listing, caches the raw text on disk, parses
//! it with the first matching format parser, and optionally reduces the
//! resulting catalog to mainstream channels.
//!
//! ```no_run
//! use iptv_catalog::{FileCache, IptvRepository};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), iptv_catalog::IptvError> {
//! let repo = IptvRepository::new(
//!     "https://example.com/live.m3u",
//!     reqwest::Client::new(),
//!     FileCache::new("/tmp/iptv-cache"),
//! );
//! let groups = repo
//!     .get_channel_group_list(Duration::from_secs(3600), true)
//!     .await?;
//! for group in &groups {
//!     println!("{} ({} channels)", group.name, group.channels.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod parser;
pub mod repository;
pub mod source;
pub mod storage;
pub mod util;

pub use catalog::{Channel, ChannelGroup, ChannelGroupList};
pub use repository::{IptvError, IptvErrorKind, IptvRepository};
pub use storage::FileCache;
