//! CSV and JSON export of a report.

use crate::metrics::VideoRow;
use crate::report::ChannelReport;
use eyre::Context;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// File name used when the user asks for CSV without naming a file.
pub const DEFAULT_CSV_NAME: &str = "channel_analysis.csv";

#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    #[serde(rename = "VideoID")]
    video_id: &'a str,
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Published")]
    published: String,
    #[serde(rename = "Views")]
    views: u64,
    #[serde(rename = "Likes")]
    likes: u64,
    #[serde(rename = "Comments")]
    comments: u64,
    #[serde(rename = "VPH")]
    views_per_hour: f64,
    #[serde(rename = "LikeRatio")]
    like_ratio: String,
    #[serde(rename = "DurationSecs")]
    duration_secs: Option<i64>,
}

impl<'a> From<&'a VideoRow> for CsvRecord<'a> {
    fn from(row: &'a VideoRow) -> Self {
        Self {
            video_id: &row.video_id,
            title: &row.title,
            published: row.published_at.to_string(),
            views: row.views,
            likes: row.likes,
            comments: row.comments,
            views_per_hour: row.views_per_hour,
            like_ratio: format!("{:.4}", row.like_ratio),
            duration_secs: row.duration_secs,
        }
    }
}

/// Writes one CSV line per video, with a header row, in the order given.
pub fn write_csv<W: Write>(rows: &[VideoRow], writer: W) -> eyre::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(CsvRecord::from(row))
            .with_context(|| format!("write CSV record for video {}", row.video_id))?;
    }
    csv.flush().context("flush CSV output")?;
    Ok(())
}

pub fn write_csv_file(rows: &[VideoRow], path: &Path) -> eyre::Result<()> {
    let file =
        File::create(path).with_context(|| format!("create CSV file {}", path.display()))?;
    write_csv(rows, BufWriter::new(file))?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote CSV export");
    Ok(())
}

pub fn write_json_file(report: &ChannelReport, path: &Path) -> eyre::Result<()> {
    let file =
        File::create(path).with_context(|| format!("create JSON file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).context("serialize report as JSON")?;
    writer.flush().context("flush JSON output")?;
    tracing::info!(path = %path.display(), "wrote JSON export");
    Ok(())
}
