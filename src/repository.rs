//! Channel list retrieval for one IPTV source.
//!
//! [`IptvRepository`] ties the pipeline together:
//!
//! 1. Resolve raw text through the [`FileCache`], fetching on a miss
//! 2. Select a parser from the [`ParserRegistry`] and build the catalog
//! 3. Optionally reduce the catalog with the simplify rule
//!
//! Every stage failure reaches the caller as one [`IptvError`] whose
//! [`kind`](IptvError::kind) says which stage failed and whose source chain
//! keeps the original cause.

use std::time::Duration;
use thiserror::Error;

use crate::catalog::{
    self, build_catalog, mainstream_channels, BuildError, ChannelGroupList, SimplifyRule,
};
use crate::parser::{NoParserError, ParseError, ParserRegistry};
use crate::source::{fetch_source, FetchError, DEFAULT_FETCH_TIMEOUT};
use crate::storage::{cache_key, CacheError, FileCache};

/// The stage at which loading a channel list failed.
#[derive(Debug, Error)]
pub enum IptvErrorKind {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    NoParser(#[from] NoParserError),
    #[error("{parser} parser failed")]
    Parse {
        parser: &'static str,
        #[source]
        source: ParseError,
    },
}

impl From<BuildError> for IptvErrorKind {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::NoParser(e) => IptvErrorKind::NoParser(e),
            BuildError::Parse { parser, source } => IptvErrorKind::Parse { parser, source },
        }
    }
}

/// Failure to load the channel list of a source.
#[derive(Debug, Error)]
#[error("failed to load channel list from {url}")]
pub struct IptvError {
    url: String,
    #[source]
    kind: IptvErrorKind,
}

impl IptvError {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> &IptvErrorKind {
        &self.kind
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self.kind, IptvErrorKind::Fetch(_))
    }

    pub fn is_no_parser(&self) -> bool {
        matches!(self.kind, IptvErrorKind::NoParser(_))
    }

    pub fn is_parse(&self) -> bool {
        matches!(self.kind, IptvErrorKind::Parse { .. })
    }
}

/// Fetches, caches, and parses the channel list of one source URL.
///
/// The HTTP client is injected so callers control TLS, proxies, user agent,
/// and so tests can point it at a fake server.
#[derive(Clone)]
pub struct IptvRepository {
    source_url: String,
    client: reqwest::Client,
    cache: FileCache,
    registry: ParserRegistry,
    simplify_rule: SimplifyRule,
    timeout: Duration,
}

impl std::fmt::Debug for IptvRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IptvRepository")
            .field("source_url", &self.source_url)
            .field("cache_dir", &self.cache.dir())
            .field("registry", &self.registry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl IptvRepository {
    pub fn new(source_url: impl Into<String>, client: reqwest::Client, cache: FileCache) -> Self {
        Self {
            source_url: source_url.into(),
            client,
            cache,
            registry: ParserRegistry::default(),
            simplify_rule: mainstream_channels,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Replaces the default parser order.
    pub fn with_registry(mut self, registry: ParserRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the rule used when `simplify` is requested.
    pub fn with_simplify_rule(mut self, rule: SimplifyRule) -> Self {
        self.simplify_rule = rule;
        self
    }

    /// Sets the bound on the whole fetch, response body included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Cache file name for this source.
    pub fn cache_key(&self) -> String {
        cache_key(&self.source_url)
    }

    /// Returns the source's channel groups.
    ///
    /// # Arguments
    ///
    /// * `cache_time` - Maximum age of cached source text; zero always refetches
    /// * `simplify` - Keep only channels accepted by the simplify rule
    ///
    /// # Errors
    ///
    /// An [`IptvError`] whose kind is `Fetch`, `NoParser`, or `Parse`. A failed
    /// fetch never overwrites a previously cached entry, and no partial
    /// catalog is returned.
    pub async fn get_channel_group_list(
        &self,
        cache_time: Duration,
        simplify: bool,
    ) -> Result<ChannelGroupList, IptvError> {
        self.load(cache_time, simplify).await.map_err(|kind| {
            tracing::error!(url = %self.source_url, error = %kind, "Failed to load channel list");
            IptvError {
                url: self.source_url.clone(),
                kind,
            }
        })
    }

    /// Deletes the cached source text, forcing the next call to fetch.
    pub async fn clear_cache(&self) -> Result<(), CacheError> {
        self.cache.remove(&self.cache_key()).await
    }

    async fn load(
        &self,
        cache_time: Duration,
        simplify: bool,
    ) -> Result<ChannelGroupList, IptvErrorKind> {
        let raw = self
            .cache
            .get_or_refresh(&self.cache_key(), cache_time, || {
                fetch_source(&self.client, &self.source_url, self.timeout)
            })
            .await?;

        let content = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
        let groups = build_catalog(&self.registry, &self.source_url, content)?;

        if !simplify {
            return Ok(groups);
        }

        let simplified = catalog::simplify(groups, self.simplify_rule);
        tracing::debug!(
            url = %self.source_url,
            groups = simplified.len(),
            channels = simplified.channel_count(),
            "Simplified channel list"
        );
        Ok(simplified)
    }
}
