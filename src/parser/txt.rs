//! Plain text channel lists.
//!
//! ```text
//! 央视,#genre#
//! CCTV1,http://example.com/cctv1.m3u8#http://backup.example.com/cctv1.m3u8
//! 卫视,#genre#
//! 湖南卫视,http://example.com/hunan.m3u8
//! ```

use super::{strip_bom, GroupAccumulator, ParseError, SourceEntry, DEFAULT_GROUP_NAME};
use crate::catalog::ChannelGroupList;
use crate::util::url_path_has_suffix;

pub(super) const GENRE_MARKER: &str = "#genre#";

pub(super) fn supports(url: &str, content: &str) -> bool {
    url_path_has_suffix(url, &[".txt"]) || content.contains(GENRE_MARKER)
}

pub(super) fn parse(content: &str) -> Result<ChannelGroupList, ParseError> {
    let mut acc = GroupAccumulator::default();
    let mut group = DEFAULT_GROUP_NAME.to_string();

    for (idx, raw) in strip_bom(content).lines().enumerate() {
        let line = raw.trim();
        let Some((name, value)) = line.split_once(',') else {
            continue;
        };
        let (name, value) = (name.trim(), value.trim());

        if value.contains(GENRE_MARKER) {
            if name.is_empty() {
                return Err(ParseError::EmptyGroupName { line: idx + 1 });
            }
            group = name.to_string();
            continue;
        }

        if name.is_empty() {
            continue;
        }

        for url in value.split('#').map(str::trim).filter(|u| !u.is_empty()) {
            acc.push(SourceEntry {
                group: group.clone(),
                name: name.to_string(),
                epg_name: name.to_string(),
                url: url.to_string(),
                logo: None,
            });
        }
    }

    Ok(acc.finish())
}
