//! Plain-text rendering of a [`ChannelReport`] for the terminal.

use crate::analytics::GeographyReport;
use crate::metrics::{self, VideoRow};
use crate::report::ChannelReport;
use std::io::{self, Write};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const TITLE_WIDTH: usize = 40;
const BAR_WIDTH: usize = 40;

/// Writes the whole dashboard: channel header, rankings, views chart and, if present, the
/// audience geography.
pub fn render<W: Write>(out: &mut W, report: &ChannelReport, top: usize) -> io::Result<()> {
    let channel = &report.channel;
    writeln!(out, "Channel analysis: {} ({})", channel.title, channel.id)?;
    writeln!(out)?;
    if let Some(handle) = &channel.handle {
        writeln!(out, "  Handle        {:>15}", handle)?;
    }
    if let Some(created_at) = channel.created_at {
        writeln!(out, "  Created       {:>15}", created_at.strftime("%Y-%m-%d"))?;
    }
    writeln!(out, "  Total views   {:>15}", group_thousands(channel.view_count))?;
    if channel.subscribers_hidden {
        writeln!(out, "  Subscribers   {:>15}", "hidden")?;
    } else {
        writeln!(
            out,
            "  Subscribers   {:>15}",
            group_thousands(channel.subscriber_count)
        )?;
    }
    writeln!(out, "  Total videos  {:>15}", group_thousands(channel.video_count))?;
    writeln!(out)?;

    if report.videos.is_empty() {
        writeln!(out, "No public uploads found.")?;
        return Ok(());
    }

    section(out, &format!("Top {top} videos by views"))?;
    video_table(out, &metrics::top_by_views(&report.videos, top))?;

    section(out, &format!("Top {top} videos by views per hour"))?;
    video_table(out, &metrics::top_by_views_per_hour(&report.videos, top))?;

    let median = metrics::median_views(&report.videos).unwrap_or_default();
    section(
        out,
        &format!("Underperforming videos (below median of {} views)", group_float(median)),
    )?;
    let under = metrics::underperformers(&report.videos, top);
    if under.is_empty() {
        writeln!(out, "  none")?;
    } else {
        video_table(out, &under)?;
    }

    section(out, "Views per video (chronological)")?;
    views_chart(out, &metrics::chronological(&report.videos))?;

    if let Some(geography) = &report.geography {
        section(
            out,
            &format!("Audience geography ({} to {})", geography.start, geography.end),
        )?;
        geography_table(out, geography)?;
    }

    Ok(())
}

fn section<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "-".repeat(title.width()))
}

fn video_table<W: Write>(out: &mut W, rows: &[&VideoRow]) -> io::Result<()> {
    writeln!(
        out,
        "  {:<11}  {}  {:<10}  {:>13}  {:>10}  {:>9}  {:>11}  {:>6}",
        "Video",
        pad("Title", TITLE_WIDTH),
        "Published",
        "Views",
        "Likes",
        "Comments",
        "VPH",
        "Likes%"
    )?;
    for row in rows {
        writeln!(
            out,
            "  {:<11}  {}  {:<10}  {:>13}  {:>10}  {:>9}  {:>11.2}  {:>5.1}%",
            row.video_id,
            pad(&truncate(&row.title, TITLE_WIDTH), TITLE_WIDTH),
            row.published_at.strftime("%Y-%m-%d"),
            group_thousands(row.views),
            group_thousands(row.likes),
            group_thousands(row.comments),
            row.views_per_hour,
            row.like_ratio * 100.0,
        )?;
    }
    Ok(())
}

fn views_chart<W: Write>(out: &mut W, rows: &[&VideoRow]) -> io::Result<()> {
    let max = rows.iter().map(|r| r.views).max().unwrap_or(0);
    for row in rows {
        writeln!(
            out,
            "  {}  {:<width$}  {}",
            row.published_at.strftime("%Y-%m-%d"),
            bar(row.views, max, BAR_WIDTH),
            group_thousands(row.views),
            width = BAR_WIDTH,
        )?;
    }
    Ok(())
}

fn geography_table<W: Write>(out: &mut W, report: &GeographyReport) -> io::Result<()> {
    if report.rows.is_empty() {
        return writeln!(out, "  no data for this period");
    }
    let total = report.total_views().max(1) as f64;
    writeln!(
        out,
        "  {:<7}  {:>13}  {:>7}  {:>15}",
        "Country", "Views", "Share", "Minutes watched"
    )?;
    for row in &report.rows {
        writeln!(
            out,
            "  {:<7}  {:>13}  {:>6.1}%  {:>15}",
            row.country,
            group_thousands(row.views),
            row.views as f64 / total * 100.0,
            group_thousands(row.minutes_watched),
        )?;
    }
    Ok(())
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Medians of integer counts are whole or end in `.5`.
fn group_float(x: f64) -> String {
    if x.fract() == 0.0 {
        group_thousands(x as u64)
    } else {
        format!("{}.5", group_thousands(x.trunc() as u64))
    }
}

/// A bar of `width * value / max` block characters.
fn bar(value: u64, max: u64, width: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (value as f64 / max as f64 * width as f64).round() as usize;
    "█".repeat(len.max(usize::from(value > 0)))
}

/// Cuts `s` to at most `width` terminal columns, marking the cut with an ellipsis.
fn truncate(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Pads `s` with spaces to `width` terminal columns. `format!`'s own padding counts chars,
/// which misaligns wide (e.g. CJK) titles.
fn pad(s: &str, width: usize) -> String {
    let w = s.width();
    format!("{s}{}", " ".repeat(width.saturating_sub(w)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::CountryRow;
    use crate::metrics::ChannelSummary;
    use jiff::civil::date;
    use pretty_assertions::assert_eq;

    fn report(videos: Vec<VideoRow>) -> ChannelReport {
        ChannelReport {
            channel: ChannelSummary {
                id: "UCtest".into(),
                title: "Test Channel".into(),
                handle: Some("@testchannel".into()),
                created_at: Some("2011-04-09T17:00:00Z".parse().unwrap()),
                view_count: 1_234_567,
                subscriber_count: 0,
                subscribers_hidden: true,
                video_count: 42,
                uploads_playlist: "UUtest".into(),
            },
            videos,
            geography: None,
            generated_at: "2024-06-01T00:00:00Z".parse().unwrap(),
        }
    }

    fn video(id: &str, title: &str, views: u64, published: &str) -> VideoRow {
        VideoRow {
            video_id: id.into(),
            title: title.into(),
            published_at: published.parse().unwrap(),
            views,
            likes: views / 20,
            comments: 1,
            duration_secs: Some(60),
            views_per_hour: views as f64 / 100.0,
            like_ratio: 0.05,
        }
    }

    fn rendered(report: &ChannelReport) -> String {
        let mut out = Vec::new();
        render(&mut out, report, 10).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_float(17.5), "17.5");
        assert_eq!(group_float(2000.0), "2,000");
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly 10", 10), "exactly 10");
        assert_eq!(truncate("a much longer title", 10), "a much lo…");
        // each ideograph is two columns wide
        assert_eq!(truncate("日本語のタイトルです", 7), "日本語…");
        assert_eq!(pad("日本", 6), "日本  ");
    }

    #[test]
    fn bars_scale_to_max() {
        assert_eq!(bar(100, 100, 4), "████");
        assert_eq!(bar(50, 100, 4), "██");
        assert_eq!(bar(1, 1000, 4), "█");
        assert_eq!(bar(0, 1000, 4), "");
        assert_eq!(bar(0, 0, 4), "");
    }

    #[test]
    fn header_and_sections() {
        let out = rendered(&report(vec![
            video("aaaaaaaaaaa", "First", 1000, "2024-05-01T00:00:00Z"),
            video("bbbbbbbbbbb", "Second", 10, "2024-05-02T00:00:00Z"),
            video("ccccccccccc", "Third", 500, "2024-05-03T00:00:00Z"),
        ]));
        assert!(out.starts_with("Channel analysis: Test Channel (UCtest)\n"));
        assert!(out.contains("Handle           @testchannel"), "{out}");
        assert!(out.contains("Created            2011-04-09"), "{out}");
        assert!(out.contains("Total views         1,234,567"), "{out}");
        assert!(out.contains("Subscribers            hidden"), "{out}");
        assert!(out.contains("Top 10 videos by views\n"));
        assert!(out.contains("Underperforming videos (below median of 500 views)"));

        let under = out
            .split("Underperforming")
            .nth(1)
            .unwrap()
            .split("Views per video")
            .next()
            .unwrap();
        assert!(under.contains("bbbbbbbbbbb"));
        assert!(!under.contains("aaaaaaaaaaa"));

        let chart = out.split("(chronological)").nth(1).unwrap();
        let first = chart.find("2024-05-01").unwrap();
        let third = chart.find("2024-05-03").unwrap();
        assert!(first < third);
        assert!(!out.contains("Audience geography"));
    }

    #[test]
    fn empty_channel() {
        let out = rendered(&report(vec![]));
        assert!(out.contains("No public uploads found."));
        assert!(!out.contains("Top 10"));
    }

    #[test]
    fn geography_section() {
        let mut r = report(vec![video("aaaaaaaaaaa", "Only", 10, "2024-05-01T00:00:00Z")]);
        r.geography = Some(GeographyReport {
            start: date(2024, 5, 1),
            end: date(2024, 5, 28),
            rows: vec![
                CountryRow {
                    country: "US".into(),
                    views: 750,
                    minutes_watched: 3000,
                },
                CountryRow {
                    country: "ID".into(),
                    views: 250,
                    minutes_watched: 1200,
                },
            ],
        });
        let out = rendered(&r);
        assert!(out.contains("Audience geography (2024-05-01 to 2024-05-28)"));
        assert!(out.contains("  US                 750    75.0%            3,000"), "{out}");
        assert!(out.contains("  ID                 250    25.0%            1,200"), "{out}");
    }
}
