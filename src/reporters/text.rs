//! Text (terminal) reporter with colors and formatting

use crate::models::Edit;
use crate::pipeline::AnalysisReport;
use crate::profile::{AccountProfile, HourHistogram, WordCount};
use anyhow::Result;

/// Reset ANSI color
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";

/// Rows of the score table shown before truncating
const MAX_TABLE_ROWS: usize = 25;

/// z-score color by distance from the batch mean
fn z_color(z: f64, marker: f64) -> &'static str {
    if z.abs() > marker {
        RED
    } else if z.abs() > marker / 2.0 {
        YELLOW
    } else {
        ""
    }
}

/// Truncate to `max` chars, marking the cut with `...`
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

/// Render report as formatted terminal output
pub fn render(report: &AnalysisReport) -> Result<String> {
    let mut out = String::new();

    // Header
    out.push_str(&format!("\n{BOLD}revsleuth analysis{RESET}\n"));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    out.push_str(&format!(
        "Edit sets: {}  Edits: {}  Marker: |z| > {}  Outliers: {}\n\n",
        report.sets.len(),
        report.total_edits(),
        report.marker,
        report.outlier_count()
    ));

    // Metric summaries
    out.push_str(&format!("{BOLD}METRICS{RESET}\n"));
    for metric in &report.metrics {
        let summary = report.table.summaries.get(&metric.name);
        let stats = summary
            .map(|s| format!("mean {:.3}  sd {:.3}", s.mean, s.std_dev))
            .unwrap_or_default();
        out.push_str(&format!(
            "  {BOLD}{:<12}{RESET} {DIM}{:<48}{RESET} {}\n",
            metric.name,
            truncate(&metric.description, 48),
            stats
        ));
    }
    out.push('\n');

    // z-score table
    if !report.table.rows.is_empty() {
        out.push_str(&format!("{BOLD}Z-SCORES{RESET}\n"));
        let mut header = format!("  {:<40} {:>6}", "EDIT SET", "EDITS");
        for metric in &report.metrics {
            header.push_str(&format!(" {:>10}", truncate(&metric.name, 10)));
        }
        out.push_str(&format!("{DIM}{}{RESET}\n", header));

        for (key, scores) in report.table.rows.iter().take(MAX_TABLE_ROWS) {
            let edits = report.sets.get(key).copied().unwrap_or(0);
            out.push_str(&format!(
                "  {:<40} {:>6}",
                truncate(&key.to_string(), 40),
                edits
            ));
            for metric in &report.metrics {
                match scores.get(&metric.name) {
                    Some(z) => {
                        let color = z_color(*z, report.marker);
                        out.push_str(&format!(" {color}{:>10.3}{RESET}", z));
                    }
                    None => out.push_str(&format!(" {:>10}", "-")),
                }
            }
            out.push('\n');
        }

        let remaining = report.table.rows.len().saturating_sub(MAX_TABLE_ROWS);
        if remaining > 0 {
            out.push_str(&format!(
                "\n  {DIM}...and {} more (use --format json for the full table){RESET}\n",
                remaining
            ));
        }
        out.push('\n');
    }

    // Outliers
    out.push_str(&format!(
        "{BOLD}OUTLIERS{RESET} ({} total)\n",
        report.outlier_count()
    ));
    if report.outlier_count() == 0 {
        out.push_str(&format!("  {GREEN}No edit set exceeds the marker.{RESET}\n"));
    }
    for (metric, sets) in &report.outliers {
        if sets.is_empty() {
            continue;
        }
        out.push_str(&format!("  {BOLD}{}{RESET}\n", metric));
        for (key, z) in sets {
            let users = report
                .suspicious_users
                .get(metric)
                .map(|u| u.len())
                .unwrap_or(0);
            out.push_str(&format!(
                "    {RED}{:>+7.3}{RESET}  {}  {DIM}({} user(s) for this metric){RESET}\n",
                z, key, users
            ));
        }
    }
    out.push('\n');

    // Users
    if !report.all_users.is_empty() {
        out.push_str(&format!(
            "{BOLD}SUSPICIOUS USERS{RESET} ({} total)\n",
            report.all_users.len()
        ));
        for (user, sets) in report.flagged_accounts.iter() {
            let sets: Vec<&str> = sets.iter().map(String::as_str).collect();
            out.push_str(&format!("  {:<30} {DIM}{}{RESET}\n", user, sets.join(", ")));
        }
        out.push('\n');
        out.push_str(&format!(
            "{DIM}Run `revsleuth profile --flagged <file>` to profile these accounts.{RESET}\n"
        ));
    }

    Ok(out)
}

/// Render the edits of one page, newest first
pub fn render_edits(title: &str, edits: &[Edit]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{BOLD}{}{RESET} {DIM}({} edits){RESET}\n",
        title,
        edits.len()
    ));
    for edit in edits {
        let delta_color = if edit.size_delta < 0 { RED } else { GREEN };
        let user = if edit.user.is_empty() {
            "(hidden)"
        } else {
            edit.user.as_str()
        };
        out.push_str(&format!(
            "  {DIM}{}{RESET}  {delta_color}{:>+7}{RESET}  {:<24} {}\n",
            edit.timestamp.format("%Y-%m-%d %H:%M"),
            edit.size_delta,
            truncate(user, 24),
            truncate(&edit.comment, 60)
        ));
    }
    out
}

/// Single-line sparkline of an hour histogram
fn sparkline(hours: &HourHistogram) -> String {
    const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    let max = hours.iter().copied().max().unwrap_or(0);
    hours
        .iter()
        .map(|&h| {
            if h == 0 {
                ' '
            } else {
                let idx = (h * (BARS.len() - 1)) / max.max(1);
                BARS[idx.min(BARS.len() - 1)]
            }
        })
        .collect()
}

fn word_list(words: &[WordCount]) -> String {
    words
        .iter()
        .map(|w| format!("{} ({})", w.word, w.count))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render account profiles
pub fn render_profiles(profiles: &[AccountProfile]) -> String {
    let mut out = String::new();
    for profile in profiles {
        let registered = profile
            .registration
            .map(|r| r.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let status = if profile.flagged_sets.is_empty() {
            format!("{DIM}not flagged{RESET}")
        } else {
            format!("{RED}flagged{RESET}")
        };
        out.push_str(&format!(
            "\n{BOLD}{}{RESET}  registered {}  edits {}  {}\n",
            profile.username,
            registered,
            profile
                .edit_count
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            status
        ));
        if !profile.groups.is_empty() {
            out.push_str(&format!("  groups: {}\n", profile.groups.join(", ")));
        }
        if !profile.flagged_sets.is_empty() {
            out.push_str(&format!("  flagged in: {}\n", profile.flagged_sets.join(", ")));
        }
        out.push_str(&format!(
            "  {DIM}hour (UTC)   0         6           12          18        23{RESET}\n"
        ));
        out.push_str(&format!(
            "  non-mobile  |{}|\n",
            sparkline(&profile.hours.non_mobile)
        ));
        out.push_str(&format!("  mobile      |{}|\n", sparkline(&profile.hours.mobile)));
        out.push_str(&format!(
            "  {GREEN}added{RESET}:   {}\n",
            word_list(&profile.top_added)
        ));
        out.push_str(&format!(
            "  {RED}removed{RESET}: {}\n",
            word_list(&profile.top_removed)
        ));
        out.push_str(&format!(
            "  {DIM}{} contribution(s) examined{RESET}\n",
            profile.contributions
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::edit;
    use crate::reporters::tests::test_report;

    #[test]
    fn test_render_report_sections() {
        let out = render(&test_report()).unwrap();
        assert!(out.contains("revsleuth analysis"));
        assert!(out.contains("Hot page"));
        assert!(out.contains("OUTLIERS"));
        assert!(out.contains("192.0.2.1"));
        assert!(out.contains("+2.500"));
    }

    #[test]
    fn test_render_edits() {
        let mut e = edit(1, "", 0);
        e.size_delta = -42;
        e.comment = "rv".into();
        let out = render_edits("Page", &[e]);
        assert!(out.contains("(hidden)"));
        assert!(out.contains("-42"));
        assert!(out.contains("(1 edits)"));
    }

    #[test]
    fn test_sparkline_scales_to_max() {
        let mut hours = [0usize; 24];
        hours[0] = 8;
        hours[12] = 1;
        let line = sparkline(&hours);
        assert_eq!(line.chars().count(), 24);
        assert_eq!(line.chars().next(), Some('█'));
        assert_eq!(line.chars().nth(1), Some(' '));
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ünïcödé-title", 8), "ünïcö...");
    }
}
