//! YouTube Data API v3 client library.
//!
//! Covers the read-only calls the channel report needs:
//!
//! - `channels.list` to resolve handles and fetch a channel's statistics and uploads playlist,
//! - `playlistItems.list` to page through the uploads playlist,
//! - `videos.list` to batch-fetch per-video snippet, statistics and content details.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use channel_doctor::youtube_api::{Credentials, YouTubeClient};
//! use tokio_stream::StreamExt;
//!
//! # async fn example() -> eyre::Result<()> {
//! let client = YouTubeClient::new(
//!     Credentials::ApiKey("AIza...".to_string()),
//!     reqwest::Client::new(),
//! );
//!
//! let channel = client
//!     .get_channel("UC_x5XG1OV2P6uZZ5FSM9Ttw")
//!     .await?
//!     .expect("channel exists");
//! let uploads = client.list_playlist_video_ids(channel.uploads_playlist()).take(10);
//! let ids: Vec<String> = uploads.collect::<eyre::Result<_>>().await?;
//! for video in client.get_videos(&ids).await? {
//!     println!("{}: {} views", video.snippet.title, video.statistics.views());
//! }
//! # Ok(())
//! # }
//! ```

pub mod channels;
pub mod client;
pub mod types;
pub mod videos;

pub use client::{Credentials, DATA_API_BASE, MAX_PAGE_SIZE, YouTubeClient};
pub use types::{PageInfo, PagedStream};

pub use channels::{Channel, ChannelFilter, ChannelSnippet, ChannelStatistics};
pub use videos::{Video, VideoSnippet, VideoStatistics};
