use thiserror::Error;

use super::ChannelGroupList;
use crate::parser::{NoParserError, ParseError, ParserRegistry};

/// Failure while turning raw source text into a catalog.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    NoParser(#[from] NoParserError),
    #[error("{parser} parser failed")]
    Parse {
        parser: &'static str,
        #[source]
        source: ParseError,
    },
}

/// Selects a parser for `raw` and parses it into a catalog.
///
/// Logs the group and channel counts of the result. No partial catalog is
/// ever returned: a parser failure discards everything parsed so far.
///
/// # Errors
///
/// - [`BuildError::NoParser`] if no registered parser supports the source
/// - [`BuildError::Parse`] if the selected parser rejects the content
pub fn build_catalog(
    registry: &ParserRegistry,
    url: &str,
    raw: &str,
) -> Result<ChannelGroupList, BuildError> {
    let parser = registry.select(url, raw)?;

    let groups = parser.parse(raw).map_err(|source| BuildError::Parse {
        parser: parser.name(),
        source,
    })?;

    tracing::info!(
        url = %url,
        parser = parser.name(),
        groups = groups.len(),
        channels = groups.channel_count(),
        "Parsed channel list"
    );

    Ok(groups)
}
