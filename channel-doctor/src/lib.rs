use crate::analytics::{AnalyticsClient, GeographyReport};
use crate::config::{GeographySettings, Settings};
use crate::report::ChannelReport;
use crate::youtube_api::{Credentials, YouTubeClient};
use eyre::Context;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use jiff::{Timestamp, ToSpan};
use tracing::instrument;

pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod metrics;
pub mod oauth;
pub mod report;
pub mod resolve;
pub mod youtube_api;

/// Maximum number of countries requested for the geography report.
pub const GEOGRAPHY_COUNTRIES: u32 = 25;

/// Runs the whole pipeline for one channel: the public report, plus the audience geography
/// when it was asked for.
///
/// The geography step needs the channel owner's OAuth consent, so it may open a browser.
pub async fn generate_report(
    settings: &Settings,
    http: reqwest::Client,
) -> eyre::Result<ChannelReport> {
    let now = Timestamp::now();
    let youtube = YouTubeClient::new(Credentials::ApiKey(settings.api_key.clone()), http.clone());

    let mut report = report::fetch_channel_report(
        &youtube,
        &settings.channel,
        settings.max_videos,
        now,
    )
    .await?;

    if let Some(geo) = &settings.geography {
        let (owner, analytics) = setup_owner_clients(geo, http)
            .await
            .context("authorize YouTube Analytics access")?;
        let (start, end) = geography_window(now, geo.days)?;
        report.geography = Some(
            fetch_audience_geography(&owner, &analytics, &report.channel.id, start, end).await?,
        );
    }

    Ok(report)
}

/// Obtains an OAuth session (stored, refreshed, or freshly authorized) and builds the two
/// clients that act as the signed-in user: one for the Data API, one for Analytics.
pub async fn setup_owner_clients(
    geo: &GeographySettings,
    http: reqwest::Client,
) -> eyre::Result<(YouTubeClient, AnalyticsClient)> {
    let oauth_manager =
        oauth::OAuthManager::new(geo.oauth.client_id.clone(), geo.oauth.client_secret.clone());
    let store = oauth::TokenStore::new(geo.token_file.clone());
    let session = oauth::authorize(oauth_manager, &store).await?;
    Ok((
        YouTubeClient::new(Credentials::OAuth(session.clone()), http.clone()),
        AnalyticsClient::new(session, http),
    ))
}

/// Fetches the audience geography of `channel_id` between `start` and `end`.
///
/// Analytics only reports on channels the signed-in user owns, so this first asks the Data API
/// which channel that is and refuses to go on if it isn't `channel_id`.
#[instrument(skip(owner, analytics))]
pub async fn fetch_audience_geography(
    owner: &YouTubeClient,
    analytics: &AnalyticsClient,
    channel_id: &str,
    start: Date,
    end: Date,
) -> eyre::Result<GeographyReport> {
    let mine = owner
        .find_my_channel_id()
        .await
        .context("look up the authorized user's channel")?;
    match mine {
        Some(mine) if mine == channel_id => {}
        Some(mine) => eyre::bail!(
            "audience geography for channel {} needs its owner's authorization, but the signed-in account owns channel {}",
            channel_id,
            mine
        ),
        None => eyre::bail!(
            "audience geography for channel {} needs its owner's authorization, but the signed-in account has no channel",
            channel_id
        ),
    }

    analytics
        .audience_geography(channel_id, start, end, GEOGRAPHY_COUNTRIES)
        .await
        .context("fetch audience geography report")
}

/// The `days`-long date range ending yesterday (UTC). Analytics data for today is incomplete.
pub fn geography_window(now: Timestamp, days: u16) -> eyre::Result<(Date, Date)> {
    let today = now.to_zoned(TimeZone::UTC).date();
    let end = today.yesterday().context("compute report end date")?;
    let start = end
        .checked_sub(i64::from(days.saturating_sub(1)).days())
        .context("compute report start date")?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;
    use pretty_assertions::assert_eq;

    #[test]
    fn window_ends_yesterday() {
        let now: Timestamp = "2024-03-01T08:00:00Z".parse().unwrap();
        assert_eq!(
            geography_window(now, 28).unwrap(),
            (date(2024, 2, 2), date(2024, 2, 29))
        );
        assert_eq!(
            geography_window(now, 1).unwrap(),
            (date(2024, 2, 29), date(2024, 2, 29))
        );
    }
}
