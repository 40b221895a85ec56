//! Extended M3U playlists.
//!
//! ```text
//! #EXTM3U x-tvg-url="..."
//! #EXTINF:-1 tvg-name="CCTV1" tvg-logo="http://..." group-title="央视;高清",CCTV-1 综合
//! http://example.com/cctv1.m3u8
//! ```

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use super::txt::GENRE_MARKER;
use super::{strip_bom, GroupAccumulator, ParseError, SourceEntry, DEFAULT_GROUP_NAME};
use crate::catalog::ChannelGroupList;
use crate::util::url_path_has_suffix;

const HEADER: &str = "#EXTM3U";
const EXTINF: &str = "#EXTINF:";

/// Matches `key="value"` attribute pairs (tvg-id, tvg-name, group-title, ...)
fn attr_regex() -> &'static Regex {
    static ATTR_REGEX: OnceLock<Regex> = OnceLock::new();
    ATTR_REGEX.get_or_init(|| Regex::new(r#"([\w-]+)="([^"]*)""#).expect("valid attribute regex"))
}

pub(super) fn supports(url: &str, content: &str) -> bool {
    let body = strip_bom(content).trim_start();
    if body.starts_with(HEADER) {
        return true;
    }
    // A genre list served under an .m3u name is still a text list
    url_path_has_suffix(url, &[".m3u", ".m3u8"]) && !body.contains(GENRE_MARKER)
}

/// Parsed `#EXTINF` header waiting for its URL line.
#[derive(Debug)]
struct Extinf {
    title: String,
    attributes: HashMap<String, String>,
}

pub(super) fn parse(content: &str) -> Result<ChannelGroupList, ParseError> {
    let mut acc = GroupAccumulator::default();
    let mut pending: Option<Extinf> = None;

    for (idx, raw) in strip_bom(content).lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix(EXTINF) {
            if pending.is_some() {
                tracing::debug!(line = idx + 1, "#EXTINF without stream URL dropped");
            }
            pending = Some(parse_extinf(rest).ok_or(ParseError::MissingTitle { line: idx + 1 })?);
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        // A URL with no preceding #EXTINF carries no name, skip it
        let Some(extinf) = pending.take() else {
            continue;
        };

        push_entries(&mut acc, extinf, line);
    }

    Ok(acc.finish())
}

/// Splits `-1 key="v",Title` at the first comma outside quoted values.
fn parse_extinf(rest: &str) -> Option<Extinf> {
    let mut in_quotes = false;
    let comma = rest.char_indices().find_map(|(i, c)| match c {
        '"' => {
            in_quotes = !in_quotes;
            None
        }
        ',' if !in_quotes => Some(i),
        _ => None,
    })?;

    let header = &rest[..comma];
    let title = rest[comma + 1..].trim().to_string();

    let attributes = attr_regex()
        .captures_iter(header)
        .map(|caps| (caps[1].to_ascii_lowercase(), caps[2].trim().to_string()))
        .collect();

    Some(Extinf { title, attributes })
}

fn push_entries(acc: &mut GroupAccumulator, extinf: Extinf, url: &str) {
    let Extinf { title, attributes } = extinf;

    let name = if title.is_empty() {
        attributes
            .get("tvg-name")
            .filter(|n| !n.is_empty())
            .cloned()
            .unwrap_or_default()
    } else {
        title
    };
    if name.is_empty() {
        return;
    }

    let epg_name = attributes
        .get("tvg-name")
        .filter(|n| !n.is_empty())
        .cloned()
        .unwrap_or_else(|| name.clone());
    let logo = attributes.get("tvg-logo").filter(|l| !l.is_empty()).cloned();

    let mut groups: Vec<&str> = attributes
        .get("group-title")
        .map(|g| g.split(';').map(str::trim).filter(|g| !g.is_empty()).collect())
        .unwrap_or_default();
    if groups.is_empty() {
        groups.push(DEFAULT_GROUP_NAME);
    }

    for group in groups {
        acc.push(SourceEntry {
            group: group.to_string(),
            name: name.clone(),
            epg_name: epg_name.clone(),
            url: url.to_string(),
            logo: logo.clone(),
        });
    }
}
