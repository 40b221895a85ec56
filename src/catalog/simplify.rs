use super::{Channel, ChannelGroup, ChannelGroupList};

/// Decides whether a channel survives simplification.
///
/// Receives the owning group so group-scoped rules are possible.
pub type SimplifyRule = fn(&ChannelGroup, &Channel) -> bool;

/// Keeps CCTV channels and provincial satellite ("卫视") channels.
pub fn mainstream_channels(_group: &ChannelGroup, channel: &Channel) -> bool {
    channel.name.to_lowercase().starts_with("cctv") || channel.name.ends_with("卫视")
}

/// Filters every group's channels through `predicate`.
///
/// Groups left without channels are dropped. Surviving groups and channels
/// keep their relative order.
pub fn simplify<P>(groups: ChannelGroupList, predicate: P) -> ChannelGroupList
where
    P: Fn(&ChannelGroup, &Channel) -> bool,
{
    groups
        .into_iter()
        .filter_map(|group| {
            let channels: Vec<Channel> = group
                .channels
                .iter()
                .filter(|channel| predicate(&group, *channel))
                .cloned()
                .collect();

            if channels.is_empty() {
                None
            } else {
                Some(ChannelGroup {
                    name: group.name,
                    channels,
                })
            }
        })
        .collect()
}
