//! YouTube Videos and PlaylistItems API types.

use crate::youtube_api::types::{PageInfo, parse_count};
use jiff::{SignedDuration, Span, SpanRelativeTo, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Response structure for the `videos.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub items: Vec<Video>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
}

/// A `video` resource with the `snippet`, `statistics` and `contentDetails` parts.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub snippet: VideoSnippet,
    #[serde(default)]
    pub statistics: VideoStatistics,
    #[serde(rename = "contentDetails", skip_serializing_if = "Option::is_none")]
    pub content_details: Option<VideoContentDetails>,
}

impl Video {
    /// Playback length, if the video has one.
    ///
    /// Long streams carry a day component (`P1DT2H`), counted as 24 hours. Live and upcoming
    /// videos report `P0D`, which comes back as `None`.
    pub fn duration(&self) -> Option<SignedDuration> {
        let raw = self.content_details.as_ref()?.duration.as_deref()?;
        let span: Span = raw.parse().ok()?;
        let duration = span
            .to_duration(SpanRelativeTo::days_are_24_hours())
            .ok()?;
        (!duration.is_zero()).then_some(duration)
    }
}

/// See: <https://developers.google.com/youtube/v3/docs/videos#snippet>
#[derive(Debug, Serialize, Deserialize)]
pub struct VideoSnippet {
    pub title: String,
    #[serde(rename = "publishedAt")]
    pub published_at: Timestamp,
    #[serde(rename = "channelId", skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

/// Statistics about the video.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#statistics>
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VideoStatistics {
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
    /// Absent when the owner hides likes.
    #[serde(rename = "likeCount")]
    pub like_count: Option<String>,
    /// Absent when comments are disabled.
    #[serde(rename = "commentCount")]
    pub comment_count: Option<String>,
}

impl VideoStatistics {
    pub fn views(&self) -> u64 {
        parse_count(self.view_count.as_deref())
    }

    pub fn likes(&self) -> u64 {
        parse_count(self.like_count.as_deref())
    }

    pub fn comments(&self) -> u64 {
        parse_count(self.comment_count.as_deref())
    }
}

/// See: <https://developers.google.com/youtube/v3/docs/videos#contentDetails>
#[derive(Debug, Serialize, Deserialize)]
pub struct VideoContentDetails {
    /// ISO 8601 duration, e.g. `PT4M13S`.
    pub duration: Option<String>,
}

/// Response structure for the `playlistItems.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlistItems/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistItemListResponse {
    #[serde(default)]
    pub kind: String,
    /// Absent, rather than empty, once the playlist has nothing more to give.
    pub items: Option<VecDeque<PlaylistItem>>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistItem {
    #[serde(rename = "contentDetails")]
    pub content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistItemContentDetails {
    #[serde(rename = "videoId")]
    pub video_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn video(duration: Option<&str>) -> Video {
        let details = duration
            .map(|d| format!(r#", "contentDetails": {{"duration": "{d}"}}"#))
            .unwrap_or_default();
        serde_json::from_str(&format!(
            r#"{{
                "id": "abc",
                "snippet": {{"title": "t", "publishedAt": "2024-05-01T12:00:00Z"}},
                "statistics": {{"viewCount": "10", "commentCount": "2"}}
                {details}
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn missing_like_count_reads_as_zero() {
        let v = video(None);
        assert_eq!(v.statistics.views(), 10);
        assert_eq!(v.statistics.likes(), 0);
        assert_eq!(v.statistics.comments(), 2);
    }

    #[test]
    fn durations() {
        assert_eq!(
            video(Some("PT1H2M3S")).duration(),
            Some(SignedDuration::from_secs(3723))
        );
        assert_eq!(
            video(Some("PT4M13S")).duration(),
            Some(SignedDuration::from_secs(253))
        );
        assert_eq!(
            video(Some("P1DT2H")).duration(),
            Some(SignedDuration::from_hours(26))
        );
        assert_eq!(video(Some("P0D")).duration(), None);
        assert_eq!(video(None).duration(), None);
    }

    #[test]
    fn playlist_page() {
        let body = r#"{
            "kind": "youtube#playlistItemListResponse",
            "nextPageToken": "EAAaBlBUOkNESQ",
            "items": [
                {"contentDetails": {"videoId": "v1", "videoPublishedAt": "2024-05-01T12:00:00Z"}},
                {"contentDetails": {"videoId": "v2"}}
            ],
            "pageInfo": {"totalResults": 120, "resultsPerPage": 50}
        }"#;
        let resp: PlaylistItemListResponse = serde_json::from_str(body).unwrap();
        let ids: Vec<_> = resp
            .items
            .iter()
            .flatten()
            .map(|i| i.content_details.video_id.as_str())
            .collect();
        assert_eq!(ids, ["v1", "v2"]);
        assert_eq!(resp.next_page_token.as_deref(), Some("EAAaBlBUOkNESQ"));
        assert_eq!(resp.page_info.total_results, 120);
    }
}
