//! YouTube Analytics API v2: the audience-geography report.
//!
//! Analytics reports belong to the channel owner, so unlike the Data API calls these always
//! need an OAuth session with the `yt-analytics.readonly` scope. Reports come back as a
//! generic result table: a list of column headers and rows of positional values.

use crate::oauth::OAuthSession;
use eyre::Context;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Base URL of the YouTube Analytics API v2.
pub const ANALYTICS_API_BASE: &str = "https://youtubeanalytics.googleapis.com/v2";

/// A generic `reports.query` result table.
///
/// See: <https://developers.google.com/youtube/analytics/reference/reports/query#response>
#[derive(Debug, Deserialize)]
pub struct ResultTable {
    #[serde(rename = "columnHeaders", default)]
    pub column_headers: Vec<ColumnHeader>,
    /// Omitted by the API when the report has no data.
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub struct ColumnHeader {
    pub name: String,
}

impl ResultTable {
    fn column(&self, name: &str) -> eyre::Result<usize> {
        self.column_headers
            .iter()
            .position(|h| h.name == name)
            .ok_or_else(|| eyre::eyre!("analytics report has no '{}' column", name))
    }
}

/// Views and watch time from one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryRow {
    /// ISO 3166-1 alpha-2 code.
    pub country: String,
    pub views: u64,
    pub minutes_watched: u64,
}

/// Where a channel's audience watched from over a date range, most views first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeographyReport {
    pub start: Date,
    pub end: Date,
    pub rows: Vec<CountryRow>,
}

impl GeographyReport {
    pub fn total_views(&self) -> u64 {
        self.rows.iter().map(|r| r.views).sum()
    }

    fn from_table(start: Date, end: Date, table: &ResultTable) -> eyre::Result<Self> {
        let country = table.column("country")?;
        let views = table.column("views")?;
        let minutes = table.column("estimatedMinutesWatched")?;

        let rows = table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let cell = |idx: usize| {
                    row.get(idx)
                        .ok_or_else(|| eyre::eyre!("analytics row {} is missing column {}", i, idx))
                };
                Ok(CountryRow {
                    country: cell(country)?
                        .as_str()
                        .ok_or_else(|| eyre::eyre!("analytics row {} has a non-string country", i))?
                        .to_string(),
                    views: metric(cell(views)?),
                    minutes_watched: metric(cell(minutes)?),
                })
            })
            .collect::<eyre::Result<Vec<_>>>()?;

        Ok(Self { start, end, rows })
    }
}

/// Metric cells are JSON numbers, integral or not.
fn metric(value: &serde_json::Value) -> u64 {
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|f| f.max(0.0).round() as u64))
        .unwrap_or(0)
}

/// Client for the YouTube Analytics API.
#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    session: OAuthSession,
    base_url: String,
    client: reqwest::Client,
}

impl AnalyticsClient {
    pub fn new(session: OAuthSession, client: reqwest::Client) -> Self {
        Self {
            session,
            base_url: ANALYTICS_API_BASE.to_string(),
            client,
        }
    }

    /// Points the client at a different API root, e.g. a local mock.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Views and estimated minutes watched per country for `channel_id`, sorted by views, at
    /// most `limit` countries. The authorized user must own the channel.
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/yt-analytics.readonly`
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/analytics/channel_reports#geographic-reports>
    #[instrument(skip(self))]
    pub async fn audience_geography(
        &self,
        channel_id: &str,
        start: Date,
        end: Date,
        limit: u32,
    ) -> eyre::Result<GeographyReport> {
        if start > end {
            eyre::bail!("report start date {} is after end date {}", start, end);
        }

        let url = format!("{}/reports", self.base_url);
        let ids = format!("channel=={channel_id}");
        let (start_date, end_date, max_results) =
            (start.to_string(), end.to_string(), limit.to_string());
        let query_params = [
            ("ids", ids.as_str()),
            ("startDate", start_date.as_str()),
            ("endDate", end_date.as_str()),
            ("dimensions", "country"),
            ("metrics", "views,estimatedMinutesWatched"),
            ("sort", "-views"),
            ("maxResults", max_results.as_str()),
        ];

        let access_token = self.session.fresh_access_token().await?;
        let response = self
            .client
            .get(&url)
            .query(&query_params)
            .bearer_auth(access_token)
            .send()
            .await
            .with_context(|| format!("send GET request to YouTube Analytics API: {}", url))?;

        let status_code = response.status();
        if !status_code.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            eyre::bail!(
                "YouTube Analytics report request failed with status {}: {}",
                status_code,
                error_text
            );
        }

        let table: ResultTable = response
            .json()
            .await
            .context("parse YouTube Analytics report as JSON")?;

        let report = GeographyReport::from_table(start, end, &table)?;
        tracing::debug!(
            countries = report.rows.len(),
            total_views = report.total_views(),
            "fetched audience geography"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;
    use pretty_assertions::assert_eq;

    fn table(json: &str) -> ResultTable {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn decodes_rows_by_header_name() {
        let t = table(
            r#"{
                "kind": "youtubeAnalytics#resultTable",
                "columnHeaders": [
                    {"name": "views", "columnType": "METRIC", "dataType": "INTEGER"},
                    {"name": "country", "columnType": "DIMENSION", "dataType": "STRING"},
                    {"name": "estimatedMinutesWatched", "columnType": "METRIC", "dataType": "INTEGER"}
                ],
                "rows": [[1200, "US", 5400], [300, "ID", 810.6]]
            }"#,
        );
        let report =
            GeographyReport::from_table(date(2024, 1, 1), date(2024, 1, 28), &t).unwrap();
        assert_eq!(
            report.rows,
            vec![
                CountryRow {
                    country: "US".into(),
                    views: 1200,
                    minutes_watched: 5400
                },
                CountryRow {
                    country: "ID".into(),
                    views: 300,
                    minutes_watched: 811
                },
            ]
        );
        assert_eq!(report.total_views(), 1500);
    }

    #[test]
    fn no_rows_is_an_empty_report() {
        let t = table(
            r#"{"columnHeaders": [
                {"name": "country", "columnType": "DIMENSION", "dataType": "STRING"},
                {"name": "views", "columnType": "METRIC", "dataType": "INTEGER"},
                {"name": "estimatedMinutesWatched", "columnType": "METRIC", "dataType": "INTEGER"}
            ]}"#,
        );
        let report =
            GeographyReport::from_table(date(2024, 1, 1), date(2024, 1, 28), &t).unwrap();
        assert!(report.rows.is_empty());
    }

    #[test]
    fn missing_column_is_an_error() {
        let t = table(
            r#"{"columnHeaders": [{"name": "country", "columnType": "DIMENSION", "dataType": "STRING"}], "rows": [["US"]]}"#,
        );
        let err = GeographyReport::from_table(date(2024, 1, 1), date(2024, 1, 2), &t).unwrap_err();
        assert!(err.to_string().contains("'views'"), "{err}");
    }
}
