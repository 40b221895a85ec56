use serde::{Deserialize, Serialize};

/// A single playable channel.
///
/// A channel carries every stream reference a source listed under its name
/// within one group, in order of appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Display name as written in the source
    pub name: String,
    /// Name used to look the channel up in an EPG (falls back to `name`)
    pub epg_name: String,
    /// Stream URLs or addresses, never empty when produced by a parser
    pub urls: Vec<String>,
    /// Logo URL, if the source provided one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// A named, ordered collection of channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelGroup {
    pub name: String,
    pub channels: Vec<Channel>,
}

/// One complete parsed catalog: groups in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelGroupList(Vec<ChannelGroup>);

impl ChannelGroupList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of channels across all groups.
    pub fn channel_count(&self) -> usize {
        self.0.iter().map(|g| g.channels.len()).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChannelGroup> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ChannelGroup] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<ChannelGroup> {
        self.0
    }
}

impl From<Vec<ChannelGroup>> for ChannelGroupList {
    fn from(groups: Vec<ChannelGroup>) -> Self {
        Self(groups)
    }
}

impl FromIterator<ChannelGroup> for ChannelGroupList {
    fn from_iter<I: IntoIterator<Item = ChannelGroup>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ChannelGroupList {
    type Item = ChannelGroup;
    type IntoIter = std::vec::IntoIter<ChannelGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChannelGroupList {
    type Item = &'a ChannelGroup;
    type IntoIter = std::slice::Iter<'a, ChannelGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(name: &str) -> Channel {
        Channel {
            name: name.to_string(),
            epg_name: name.to_string(),
            urls: vec![format!("http://example.com/{name}.m3u8")],
            logo: None,
        }
    }

    #[test]
    fn test_channel_count_sums_groups() {
        let list = ChannelGroupList::from(vec![
            ChannelGroup {
                name: "央视".into(),
                channels: vec![channel("CCTV1"), channel("CCTV2")],
            },
            ChannelGroup {
                name: "卫视".into(),
                channels: vec![channel("湖南卫视")],
            },
        ]);

        assert_eq!(list.len(), 2);
        assert_eq!(list.channel_count(), 3);
        assert!(!list.is_empty());
    }

    #[test]
    fn test_empty_list() {
        let list = ChannelGroupList::new();
        assert!(list.is_empty());
        assert_eq!(list.channel_count(), 0);
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let list = ChannelGroupList::from(vec![ChannelGroup {
            name: "News".into(),
            channels: vec![channel("CNN")],
        }]);

        let json = serde_json::to_value(&list).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["name"], "News");
        assert_eq!(json[0]["channels"][0]["epg_name"], "CNN");
        assert!(json[0]["channels"][0].get("logo").is_none());
    }
}
