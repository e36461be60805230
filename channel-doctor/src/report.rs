//! The fetch pipeline: channel reference in, [`ChannelReport`] out.

use crate::analytics::GeographyReport;
use crate::metrics::{ChannelSummary, VideoRow};
use crate::resolve::resolve_channel_id;
use crate::youtube_api::YouTubeClient;
use eyre::Context;
use jiff::Timestamp;
use serde::Serialize;
use tokio_stream::StreamExt;
use tracing::instrument;

/// Everything one run of the doctor produced.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelReport {
    pub channel: ChannelSummary,
    /// Most recent uploads first, as the uploads playlist lists them.
    pub videos: Vec<VideoRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geography: Option<GeographyReport>,
    pub generated_at: Timestamp,
}

/// Resolves `input`, fetches the channel and its `max_videos` most recent uploads, and computes
/// the per-video metrics relative to `now`.
#[instrument(skip(client))]
pub async fn fetch_channel_report(
    client: &YouTubeClient,
    input: &str,
    max_videos: usize,
    now: Timestamp,
) -> eyre::Result<ChannelReport> {
    let channel_id = resolve_channel_id(client, input).await?;

    let Some(channel) = client
        .get_channel(&channel_id)
        .await
        .context("fetch channel details")?
    else {
        eyre::bail!("channel {} not found or API key is wrong", channel_id);
    };
    let channel = ChannelSummary::from(&channel);
    tracing::info!(
        title = channel.title,
        videos = channel.video_count,
        "fetched channel"
    );

    let video_ids: Vec<String> = client
        .list_playlist_video_ids(&channel.uploads_playlist)
        .take(max_videos)
        .collect::<eyre::Result<_>>()
        .await
        .context("list uploaded videos")?;
    tracing::debug!(count = video_ids.len(), "collected upload IDs");

    let videos = client
        .get_videos(&video_ids)
        .await
        .context("fetch video details")?;
    let videos: Vec<VideoRow> = videos
        .iter()
        .map(|video| VideoRow::from_video(video, now))
        .collect();
    tracing::info!(count = videos.len(), "computed video metrics");

    Ok(ChannelReport {
        channel,
        videos,
        geography: None,
        generated_at: now,
    })
}
