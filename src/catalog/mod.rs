//! Channel catalog types and the synchronous transforms applied to them.
//!
//! - [`types`] - `Channel`, `ChannelGroup`, `ChannelGroupList`
//! - [`builder`] - parser selection plus parsing, with summary logging
//! - [`simplify`] - predicate-based reduction of a catalog

mod builder;
mod simplify;
mod types;

pub use builder::{build_catalog, BuildError};
pub use simplify::{mainstream_channels, simplify, SimplifyRule};
pub use types::{Channel, ChannelGroup, ChannelGroupList};
