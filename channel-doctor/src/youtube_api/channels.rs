//! YouTube Channels API types.

use crate::youtube_api::types::{PageInfo, parse_count};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Response structure for the `channels.list` API call.
///
/// `items` is omitted entirely by the API when nothing matched, so it defaults to empty.
///
/// See: <https://developers.google.com/youtube/v3/docs/channels/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelListResponse<C = Channel> {
    #[serde(default)]
    pub kind: String,
    #[serde(default = "Vec::new")]
    pub items: Vec<C>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
}

/// A channel resource as returned for `part=id` lookups.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelId {
    pub id: String,
}

/// How to look a channel up when we don't have its ID yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFilter<'a> {
    /// `forHandle`, e.g. `@GoogleDevelopers`.
    Handle(&'a str),
    /// `forUsername`, the legacy `/user/<name>` form.
    Username(&'a str),
}

impl ChannelFilter<'_> {
    pub(crate) fn query_param(&self) -> (&'static str, &str) {
        match *self {
            ChannelFilter::Handle(handle) => ("forHandle", handle),
            ChannelFilter::Username(name) => ("forUsername", name),
        }
    }
}

/// A `channel` resource with the `snippet`, `statistics` and `contentDetails` parts.
///
/// See: <https://developers.google.com/youtube/v3/docs/channels#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub snippet: ChannelSnippet,
    #[serde(default)]
    pub statistics: ChannelStatistics,
    #[serde(rename = "contentDetails")]
    pub content_details: ChannelContentDetails,
}

impl Channel {
    /// ID of the playlist holding every public upload of the channel.
    pub fn uploads_playlist(&self) -> &str {
        &self.content_details.related_playlists.uploads
    }
}

/// See: <https://developers.google.com/youtube/v3/docs/channels#snippet>
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelSnippet {
    pub title: String,
    /// The channel's `@handle`, when it has one.
    #[serde(rename = "customUrl", skip_serializing_if = "Option::is_none")]
    pub custom_url: Option<String>,
    #[serde(rename = "publishedAt", skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,
}

/// String-encoded channel counters.
///
/// See: <https://developers.google.com/youtube/v3/docs/channels#statistics>
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChannelStatistics {
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
    /// Absent when `hidden_subscriber_count` is true.
    #[serde(rename = "subscriberCount")]
    pub subscriber_count: Option<String>,
    #[serde(rename = "hiddenSubscriberCount", default)]
    pub hidden_subscriber_count: bool,
    #[serde(rename = "videoCount")]
    pub video_count: Option<String>,
}

impl ChannelStatistics {
    pub fn views(&self) -> u64 {
        parse_count(self.view_count.as_deref())
    }

    pub fn subscribers(&self) -> u64 {
        parse_count(self.subscriber_count.as_deref())
    }

    pub fn videos(&self) -> u64 {
        parse_count(self.video_count.as_deref())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelContentDetails {
    #[serde(rename = "relatedPlaylists")]
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RelatedPlaylists {
    pub uploads: String,
}
