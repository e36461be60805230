//! Turning whatever the user typed into a canonical channel ID.
//!
//! Accepted forms:
//!
//! - a channel ID: `UC_x5XG1OV2P6uZZ5FSM9Ttw`
//! - a handle: `@GoogleDevelopers`
//! - a channel URL: `https://www.youtube.com/channel/UC...`, `https://youtube.com/@handle/videos`,
//!   or the legacy `https://www.youtube.com/user/<name>`

use crate::youtube_api::{ChannelFilter, YouTubeClient};
use eyre::Context;

/// A channel reference that has been recognized but not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// Already a channel ID; needs no API call.
    Id(String),
    /// A handle, including its leading `@`.
    Handle(String),
    /// A legacy username from a `/user/` URL.
    Username(String),
}

impl ChannelRef {
    /// Recognizes a channel ID, handle or channel URL.
    ///
    /// Returns `None` for anything else, including custom `/c/` URLs, which the API cannot
    /// resolve.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.starts_with("UC") {
            return non_empty(leading_segment(input)).map(|id| Self::Id(id.to_string()));
        }
        if let Some(handle) = input.strip_prefix('@') {
            return non_empty(leading_segment(handle)).map(|h| Self::Handle(format!("@{h}")));
        }
        if input.contains("youtube.com") {
            if let Some((_, rest)) = input.split_once("/channel/") {
                return non_empty(leading_segment(rest)).map(|id| Self::Id(id.to_string()));
            }
            if let Some((_, rest)) = input.split_once("/@") {
                return non_empty(leading_segment(rest)).map(|h| Self::Handle(format!("@{h}")));
            }
            if let Some((_, rest)) = input.split_once("/user/") {
                return non_empty(leading_segment(rest)).map(|u| Self::Username(u.to_string()));
            }
        }
        None
    }
}

/// The part of `s` before the first path, query or fragment delimiter.
fn leading_segment(s: &str) -> &str {
    s.find(['/', '?', '#']).map_or(s, |end| &s[..end])
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

/// Resolves user input to a channel ID, asking the API only for handles and usernames.
///
/// Fails if the input is not a recognizable channel reference, or if the API has no channel
/// for the given handle or username.
pub async fn resolve_channel_id(client: &YouTubeClient, input: &str) -> eyre::Result<String> {
    let Some(channel_ref) = ChannelRef::parse(input) else {
        eyre::bail!("could not find a channel ID from input {:?}", input);
    };

    let found = match &channel_ref {
        ChannelRef::Id(id) => return Ok(id.clone()),
        ChannelRef::Handle(handle) => client
            .find_channel_id(ChannelFilter::Handle(handle))
            .await
            .with_context(|| format!("look up handle {}", handle))?,
        ChannelRef::Username(name) => client
            .find_channel_id(ChannelFilter::Username(name))
            .await
            .with_context(|| format!("look up username {}", name))?,
    };

    match found {
        Some(id) => {
            tracing::info!(input, channel_id = id, "resolved channel");
            Ok(id)
        }
        None => eyre::bail!("could not find a channel ID from input {:?}", input),
    }
}
