//! Playlist format parsers and the ordered registry that selects one.
//!
//! Each format is a variant of [`IptvParser`] exposing a cheap
//! [`supports`](IptvParser::supports) probe and a [`parse`](IptvParser::parse)
//! step. A [`ParserRegistry`] holds an ordered list of them; the first parser
//! whose probe accepts the URL and content wins, so specific formats must be
//! registered before generic ones.
//!
//! ```
//! use iptv_catalog::parser::ParserRegistry;
//!
//! let registry = ParserRegistry::default();
//! let parser = registry
//!     .select("https://example.com/tv", "#EXTM3U\n#EXTINF:-1,CCTV1\nhttp://a/1\n")
//!     .unwrap();
//! assert_eq!(parser.name(), "m3u");
//! ```

mod m3u;
mod txt;

use std::collections::HashMap;

use thiserror::Error;

use crate::catalog::{Channel, ChannelGroup, ChannelGroupList};

/// Group used for channels the source did not assign to any group.
pub const DEFAULT_GROUP_NAME: &str = "其他";

/// No registered parser recognized the source. Permanent for this input.
#[derive(Debug, Error)]
#[error("no parser supports source {url}")]
pub struct NoParserError {
    pub url: String,
}

/// A parser rejected content it claimed to support.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// An `#EXTINF` line has no comma separating attributes from the title.
    #[error("line {line}: #EXTINF entry has no title")]
    MissingTitle { line: usize },
    /// A `,#genre#` line with nothing before the comma.
    #[error("line {line}: group header has an empty name")]
    EmptyGroupName { line: usize },
}

/// The closed set of supported playlist formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IptvParser {
    /// Extended M3U (`#EXTM3U` / `#EXTINF`)
    M3u,
    /// Plain text `name,url` lists with `group,#genre#` headers
    Txt,
}

impl IptvParser {
    /// Short identifier used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            IptvParser::M3u => "m3u",
            IptvParser::Txt => "txt",
        }
    }

    /// Side-effect-free check whether this parser handles the source.
    pub fn supports(&self, url: &str, content: &str) -> bool {
        match self {
            IptvParser::M3u => m3u::supports(url, content),
            IptvParser::Txt => txt::supports(url, content),
        }
    }

    /// Parses raw source text into groups.
    pub fn parse(&self, content: &str) -> Result<ChannelGroupList, ParseError> {
        match self {
            IptvParser::M3u => m3u::parse(content),
            IptvParser::Txt => txt::parse(content),
        }
    }
}

/// Ordered list of parsers, fixed once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserRegistry {
    parsers: Vec<IptvParser>,
}

impl ParserRegistry {
    /// Creates a registry that tries `parsers` in the given order.
    pub fn new(parsers: Vec<IptvParser>) -> Self {
        Self { parsers }
    }

    pub fn parsers(&self) -> &[IptvParser] {
        &self.parsers
    }

    /// Returns the first registered parser that supports `url` and `content`.
    ///
    /// # Errors
    ///
    /// [`NoParserError`] when no parser accepts the input.
    pub fn select(&self, url: &str, content: &str) -> Result<IptvParser, NoParserError> {
        self.parsers
            .iter()
            .copied()
            .find(|p| p.supports(url, content))
            .ok_or_else(|| NoParserError {
                url: url.to_string(),
            })
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new(vec![IptvParser::M3u, IptvParser::Txt])
    }
}

/// One stream entry as read from a source, before merging by name.
#[derive(Debug)]
struct SourceEntry {
    group: String,
    name: String,
    epg_name: String,
    url: String,
    logo: Option<String>,
}

/// Collects entries and merges same-named channels within a group,
/// keeping first-appearance order for groups and channels.
#[derive(Debug, Default)]
struct GroupAccumulator {
    groups: Vec<ChannelGroup>,
    group_index: HashMap<String, usize>,
    channel_index: HashMap<(usize, String), usize>,
}

impl GroupAccumulator {
    fn push(&mut self, entry: SourceEntry) {
        let group_idx = match self.group_index.get(&entry.group) {
            Some(&idx) => idx,
            None => {
                let idx = self.groups.len();
                self.groups.push(ChannelGroup {
                    name: entry.group.clone(),
                    channels: Vec::new(),
                });
                self.group_index.insert(entry.group, idx);
                idx
            }
        };

        let channels = &mut self.groups[group_idx].channels;
        match self.channel_index.get(&(group_idx, entry.name.clone())) {
            Some(&idx) => {
                let channel = &mut channels[idx];
                channel.urls.push(entry.url);
                if channel.logo.is_none() {
                    channel.logo = entry.logo;
                }
            }
            None => {
                self.channel_index
                    .insert((group_idx, entry.name.clone()), channels.len());
                channels.push(Channel {
                    name: entry.name,
                    epg_name: entry.epg_name,
                    urls: vec![entry.url],
                    logo: entry.logo,
                });
            }
        }
    }

    fn finish(self) -> ChannelGroupList {
        ChannelGroupList::from(self.groups)
    }
}

/// Strips a UTF-8 byte order mark.
fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}
