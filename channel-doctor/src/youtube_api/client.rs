//! Core YouTube Data API client functionality.

use crate::oauth::OAuthSession;
use crate::youtube_api::{
    channels::{Channel, ChannelFilter, ChannelId, ChannelListResponse},
    types::PagedStream,
    videos::{PlaylistItemListResponse, Video, VideoListResponse},
};
use eyre::Context;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use tokio_stream::Stream;
use tracing::instrument;

/// Base URL of the YouTube Data API v3.
pub const DATA_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// The largest page (and `id=` batch) the Data API accepts.
pub const MAX_PAGE_SIZE: usize = 50;

/// How requests prove who they are.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A project API key, sent as the `key` query parameter. Enough for public data.
    ApiKey(String),
    /// An end-user OAuth token, sent as a bearer token.
    OAuth(OAuthSession),
}

/// Client for the public parts of the YouTube Data API v3.
///
/// Every method issues plain `GET` requests and turns non-2xx responses into errors that carry
/// the status and the API's error body.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    credentials: Credentials,
    base_url: String,
    client: reqwest::Client,
}

impl YouTubeClient {
    /// Creates a client against the production API.
    ///
    /// # Arguments
    ///
    /// * `credentials` - An API key or an OAuth session
    /// * `client` - Shared HTTP client for making API requests
    pub fn new(credentials: Credentials, client: reqwest::Client) -> Self {
        Self {
            credentials,
            base_url: DATA_API_BASE.to_string(),
            client,
        }
    }

    /// Points the client at a different API root, e.g. a local mock.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sends an authenticated `GET` to `<base>/<resource>` and parses the JSON body.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        query_params: &[(&str, &str)],
    ) -> eyre::Result<T> {
        let url = format!("{}/{}", self.base_url, resource);
        let mut request = self.client.get(&url).query(query_params);
        request = match &self.credentials {
            Credentials::ApiKey(key) => request.query(&[("key", key.as_str())]),
            Credentials::OAuth(session) => {
                let access_token = session.fresh_access_token().await?;
                request.bearer_auth(access_token)
            }
        };

        let response = request
            .send()
            .await
            .with_context(|| format!("send GET request to YouTube API: {}", url))?;

        let status_code = response.status();
        if !status_code.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            eyre::bail!(
                "YouTube API {} request failed with status {}: {}",
                resource,
                status_code,
                error_text
            );
        }

        response
            .json()
            .await
            .with_context(|| format!("parse YouTube {} API response as JSON", resource))
    }

    /// Finds the ID of the channel matching a handle or legacy username.
    ///
    /// Returns `Ok(None)` when the API knows no such channel.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/channels/list>
    #[instrument(skip(self), ret)]
    pub async fn find_channel_id(&self, filter: ChannelFilter<'_>) -> eyre::Result<Option<String>> {
        let (param, value) = filter.query_param();
        let channels: ChannelListResponse<ChannelId> = self
            .get_json("channels", &[("part", "id"), (param, value)])
            .await?;

        tracing::debug!(
            returned_items = channels.items.len(),
            "looked up channel by {}",
            param
        );

        Ok(channels.items.into_iter().next().map(|c| c.id))
    }

    /// Returns the ID of the channel owned by the authorized user, if they have one.
    ///
    /// Only meaningful with [`Credentials::OAuth`]; the API rejects `mine=true` with an API key.
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/youtube.readonly`
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/channels/list>
    #[instrument(skip(self), ret)]
    pub async fn find_my_channel_id(&self) -> eyre::Result<Option<String>> {
        let channels: ChannelListResponse<ChannelId> = self
            .get_json("channels", &[("part", "id"), ("mine", "true")])
            .await?;
        Ok(channels.items.into_iter().next().map(|c| c.id))
    }

    /// Fetches a channel's snippet, statistics and uploads playlist.
    ///
    /// Returns `Ok(None)` if no channel has this ID. Note that an invalid API key is reported
    /// by the API as an error status, not as an empty result.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/channels/list>
    #[instrument(skip(self))]
    pub async fn get_channel(&self, channel_id: &str) -> eyre::Result<Option<Channel>> {
        let channels: ChannelListResponse = self
            .get_json(
                "channels",
                &[
                    ("part", "contentDetails,snippet,statistics"),
                    ("id", channel_id),
                ],
            )
            .await?;

        let channel = channels.items.into_iter().next();
        if let Some(channel) = &channel {
            tracing::debug!(
                title = channel.snippet.title,
                uploads = channel.uploads_playlist(),
                "fetched channel"
            );
        }
        Ok(channel)
    }

    /// Returns a paginated stream of the video IDs in a playlist, in playlist order.
    ///
    /// For a channel's uploads playlist that is newest first, so `.take(n)` yields the `n` most
    /// recent uploads and requests only as many pages as that needs.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/playlistItems/list>
    #[instrument(skip(self))]
    pub fn list_playlist_video_ids(
        &self,
        playlist_id: &str,
    ) -> impl Stream<Item = eyre::Result<String>> + use<'_> {
        let playlist_id = playlist_id.to_string();
        PagedStream::new(move |page_token| {
            let playlist_id = playlist_id.clone();
            async move {
                let response = self
                    .list_playlist_items_internal(&playlist_id, page_token)
                    .await?;
                let Some(items) = response.items else {
                    return Ok((VecDeque::new(), None));
                };
                let ids = items
                    .into_iter()
                    .map(|item| item.content_details.video_id)
                    .collect();
                Ok((ids, response.next_page_token))
            }
        })
    }

    /// Fetches snippet, statistics and contentDetails for the given videos.
    ///
    /// IDs are sent in batches of [`MAX_PAGE_SIZE`]; results keep the order the API returns
    /// them in, batch by batch. Unknown or private videos are simply absent from the result.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/list>
    #[instrument(skip(self, video_ids), fields(count = video_ids.len()))]
    pub async fn get_videos(&self, video_ids: &[String]) -> eyre::Result<Vec<Video>> {
        let mut videos = Vec::with_capacity(video_ids.len());
        for batch in video_ids.chunks(MAX_PAGE_SIZE) {
            let ids = batch.join(",");
            let response: VideoListResponse = self
                .get_json(
                    "videos",
                    &[("part", "snippet,statistics,contentDetails"), ("id", ids.as_str())],
                )
                .await?;

            tracing::debug!(
                requested = batch.len(),
                returned_items = response.items.len(),
                "fetched video batch"
            );
            videos.extend(response.items);
        }
        Ok(videos)
    }

    async fn list_playlist_items_internal(
        &self,
        playlist_id: &str,
        page_token: Option<String>,
    ) -> eyre::Result<PlaylistItemListResponse> {
        let max_results = MAX_PAGE_SIZE.to_string();
        let mut query_params = vec![
            ("part", "contentDetails"),
            ("playlistId", playlist_id),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(ref token) = page_token {
            query_params.push(("pageToken", token.as_str()));
        }

        let items: PlaylistItemListResponse = self.get_json("playlistItems", &query_params).await?;

        tracing::debug!(
            total_results = items.page_info.total_results,
            returned_items = items.items.as_ref().map_or(0, VecDeque::len),
            has_next_page = items.next_page_token.is_some(),
            "fetched playlist items"
        );

        Ok(items)
    }
}
