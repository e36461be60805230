//! Derived per-video metrics and the rankings the dashboard shows.

use crate::youtube_api::{Channel, Video};
use jiff::Timestamp;
use serde::Serialize;

/// The channel-level numbers shown at the top of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub id: String,
    pub title: String,
    /// The channel's `@handle`, when it has one.
    pub handle: Option<String>,
    pub created_at: Option<Timestamp>,
    pub view_count: u64,
    /// Zero when the channel hides its subscriber count.
    pub subscriber_count: u64,
    pub subscribers_hidden: bool,
    pub video_count: u64,
    pub uploads_playlist: String,
}

impl From<&Channel> for ChannelSummary {
    fn from(channel: &Channel) -> Self {
        Self {
            id: channel.id.clone(),
            title: channel.snippet.title.clone(),
            handle: channel.snippet.custom_url.clone(),
            created_at: channel.snippet.published_at,
            view_count: channel.statistics.views(),
            subscriber_count: channel.statistics.subscribers(),
            subscribers_hidden: channel.statistics.hidden_subscriber_count,
            video_count: channel.statistics.videos(),
            uploads_playlist: channel.uploads_playlist().to_string(),
        }
    }
}

/// One video with its raw counters and derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoRow {
    pub video_id: String,
    pub title: String,
    pub published_at: Timestamp,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    /// Playback length in whole seconds, when known.
    pub duration_secs: Option<i64>,
    /// Average views per hour since publication, rounded to two decimals.
    pub views_per_hour: f64,
    /// Likes per view, between 0 and 1 in practice.
    pub like_ratio: f64,
}

impl VideoRow {
    /// Computes the row for `video` as seen at `now`.
    pub fn from_video(video: &Video, now: Timestamp) -> Self {
        let views = video.statistics.views();
        let likes = video.statistics.likes();
        Self {
            video_id: video.id.clone(),
            title: video.snippet.title.clone(),
            published_at: video.snippet.published_at,
            views,
            likes,
            comments: video.statistics.comments(),
            duration_secs: video.duration().map(|d| d.as_secs()),
            views_per_hour: views_per_hour(views, video.snippet.published_at, now),
            like_ratio: like_ratio(likes, views),
        }
    }
}

/// Views divided by hours since publication, rounded to two decimals.
///
/// Zero for videos that are not yet published as of `now` (premieres, clock skew).
pub fn views_per_hour(views: u64, published_at: Timestamp, now: Timestamp) -> f64 {
    let age_ms = now.as_millisecond() - published_at.as_millisecond();
    if age_ms <= 0 {
        return 0.0;
    }
    let age_hours = age_ms as f64 / 3_600_000.0;
    round2(views as f64 / age_hours)
}

/// Likes per view; zero when there are no views.
pub fn like_ratio(likes: u64, views: u64) -> f64 {
    if views == 0 {
        0.0
    } else {
        likes as f64 / views as f64
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Median of the view counts; the mean of the two middle values for an even count.
pub fn median_views(rows: &[VideoRow]) -> Option<f64> {
    let mut views: Vec<u64> = rows.iter().map(|r| r.views).collect();
    views.sort_unstable();
    let mid = views.len() / 2;
    match views.len() {
        0 => None,
        n if n % 2 == 1 => Some(views[mid] as f64),
        _ => Some((views[mid - 1] as f64 + views[mid] as f64) / 2.0),
    }
}

/// The `n` most viewed videos, most views first. Ties keep fetch order.
pub fn top_by_views(rows: &[VideoRow], n: usize) -> Vec<&VideoRow> {
    let mut sorted: Vec<&VideoRow> = rows.iter().collect();
    sorted.sort_by(|a, b| b.views.cmp(&a.views));
    sorted.truncate(n);
    sorted
}

/// The `n` fastest-growing videos by views per hour. Ties keep fetch order.
pub fn top_by_views_per_hour(rows: &[VideoRow], n: usize) -> Vec<&VideoRow> {
    let mut sorted: Vec<&VideoRow> = rows.iter().collect();
    sorted.sort_by(|a, b| b.views_per_hour.total_cmp(&a.views_per_hour));
    sorted.truncate(n);
    sorted
}

/// Videos with strictly fewer views than the median, fewest views first, at most `n`.
pub fn underperformers(rows: &[VideoRow], n: usize) -> Vec<&VideoRow> {
    let Some(median) = median_views(rows) else {
        return Vec::new();
    };
    let mut below: Vec<&VideoRow> = rows.iter().filter(|r| (r.views as f64) < median).collect();
    below.sort_by_key(|r| r.views);
    below.truncate(n);
    below
}

/// All videos, oldest first.
pub fn chronological(rows: &[VideoRow]) -> Vec<&VideoRow> {
    let mut sorted: Vec<&VideoRow> = rows.iter().collect();
    sorted.sort_by_key(|r| r.published_at);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn row(id: &str, views: u64, vph: f64, published: &str) -> VideoRow {
        VideoRow {
            video_id: id.to_string(),
            title: format!("video {id}"),
            published_at: ts(published),
            views,
            likes: views / 10,
            comments: 0,
            duration_secs: None,
            views_per_hour: vph,
            like_ratio: like_ratio(views / 10, views),
        }
    }

    fn ids(rows: &[&VideoRow]) -> Vec<String> {
        rows.iter().map(|r| r.video_id.clone()).collect()
    }

    #[test]
    fn views_per_hour_over_age() {
        let now = ts("2024-05-02T12:00:00Z");
        assert_eq!(views_per_hour(2400, ts("2024-05-01T12:00:00Z"), now), 100.0);
        assert_eq!(views_per_hour(1000, ts("2024-05-02T09:00:00Z"), now), 333.33);
        assert_eq!(views_per_hour(0, ts("2024-05-01T12:00:00Z"), now), 0.0);
    }

    #[test]
    fn views_per_hour_is_zero_for_future_or_same_instant() {
        let now = ts("2024-05-02T12:00:00Z");
        assert_eq!(views_per_hour(500, now, now), 0.0);
        assert_eq!(views_per_hour(500, ts("2024-05-03T12:00:00Z"), now), 0.0);
    }

    #[test]
    fn like_ratios() {
        assert_eq!(like_ratio(5, 100), 0.05);
        assert_eq!(like_ratio(5, 0), 0.0);
    }

    #[test]
    fn medians() {
        let t = "2024-01-01T00:00:00Z";
        assert_eq!(median_views(&[]), None);
        assert_eq!(median_views(&[row("a", 7, 0.0, t)]), Some(7.0));
        assert_eq!(
            median_views(&[row("a", 30, 0.0, t), row("b", 10, 0.0, t), row("c", 20, 0.0, t)]),
            Some(20.0)
        );
        assert_eq!(
            median_views(&[row("a", 40, 0.0, t), row("b", 10, 0.0, t), row("c", 25, 0.0, t), row("d", 5, 0.0, t)]),
            Some(17.5)
        );
    }

    #[test]
    fn rankings() {
        let rows = vec![
            row("a", 100, 1.0, "2024-01-03T00:00:00Z"),
            row("b", 500, 0.5, "2024-01-01T00:00:00Z"),
            row("c", 100, 9.0, "2024-01-02T00:00:00Z"),
            row("d", 10, 3.0, "2024-01-04T00:00:00Z"),
        ];
        assert_eq!(ids(&top_by_views(&rows, 3)), ["b", "a", "c"]);
        assert_eq!(ids(&top_by_views_per_hour(&rows, 2)), ["c", "d"]);
        assert_eq!(ids(&chronological(&rows)), ["b", "c", "a", "d"]);
    }

    #[test]
    fn underperformers_are_strictly_below_median() {
        let t = "2024-01-01T00:00:00Z";
        let rows = vec![
            row("a", 100, 0.0, t),
            row("b", 40, 0.0, t),
            row("c", 100, 0.0, t),
            row("d", 10, 0.0, t),
            row("e", 100, 0.0, t),
        ];
        // median is 100; videos at the median are not underperforming
        assert_eq!(ids(&underperformers(&rows, 10)), ["d", "b"]);
        assert_eq!(ids(&underperformers(&rows, 1)), ["d"]);
        assert!(underperformers(&[], 10).is_empty());
    }

    #[test]
    fn row_from_video() {
        let video: Video = serde_json::from_str(
            r#"{
                "id": "vid1",
                "snippet": {"title": "Launch", "publishedAt": "2024-05-01T00:00:00Z"},
                "statistics": {"viewCount": "4800", "likeCount": "240", "commentCount": "12"},
                "contentDetails": {"duration": "PT10M"}
            }"#,
        )
        .unwrap();
        let r = VideoRow::from_video(&video, ts("2024-05-03T00:00:00Z"));
        assert_eq!(r.views_per_hour, 100.0);
        assert_eq!(r.like_ratio, 0.05);
        assert_eq!(r.comments, 12);
        assert_eq!(r.duration_secs, Some(600));
    }
}
