//! Console rendering of records and reports, plus the CSV export.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use engtrack_core::{Engagement, MetricsReport};

pub fn print_engagement(out: &mut impl Write, e: &Engagement) -> Result<()> {
    writeln!(out, "--- {} ---", e.client_name)?;
    writeln!(out, "  created:        {}", e.date)?;
    if !e.engagement_type.is_empty() {
        writeln!(out, "  types:          {}", e.engagement_type.join(", "))?;
    }
    writeln!(out, "  domain admin:   {}", yes_no(e.domain_admin_obtained))?;
    writeln!(out, "  users:          {}", e.number_of_users)?;
    writeln!(out, "  live hosts:     {}", e.number_of_live_hosts)?;
    writeln!(out, "  compromised:    {}", e.compromised_users_count)?;
    writeln!(out, "  sensitive data: {}", yes_no(e.sensitive_data_obtained))?;
    if let Some(rating) = e.client_rating {
        writeln!(out, "  rating:         {rating}/5")?;
    }
    if let (Some(projected), Some(spent)) = (e.projected_hours, e.hours_spent) {
        writeln!(
            out,
            "  hours:          {spent} spent / {projected} projected ({:+})",
            e.hours_difference.unwrap_or(spent - projected)
        )?;
    }
    if let (Some(start), Some(end)) = (&e.start_date, &e.end_date) {
        writeln!(
            out,
            "  dates:          {start} - {end} ({} business days)",
            e.business_days_count
        )?;
    }
    if !e.client_feedback_questions.is_empty() {
        writeln!(out, "  feedback:")?;
        for fb in &e.client_feedback_questions {
            writeln!(out, "    Q: {}", fb.question)?;
            writeln!(out, "    A: {}", fb.answer)?;
        }
    }
    writeln!(out)?;
    Ok(())
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

pub fn print_report(out: &mut impl Write, title: &str, report: &MetricsReport) -> Result<()> {
    writeln!(out, "=== {title} ===")?;
    for line in report.render_aligned() {
        writeln!(out, "{line}")?;
    }
    for diag in &report.diagnostics {
        writeln!(out, "[debug] {diag}")?;
    }
    Ok(())
}

pub fn print_ratings(out: &mut impl Write, lines: &[String]) -> Result<()> {
    if lines.is_empty() {
        writeln!(out, "No engagements recorded yet.")?;
        return Ok(());
    }
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// Overwrite `path` with the report as `Label,Value` CSV.
pub fn write_csv(path: &Path, report: &MetricsReport) -> Result<()> {
    std::fs::write(path, report.to_csv())
        .with_context(|| format!("cannot write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use engtrack_core::{FeedbackAnswer, MetricsEngine, MetricsOptions};
    use tempfile::TempDir;

    #[test]
    fn test_print_engagement_shows_derived_fields() {
        let mut e = Engagement {
            client_name: "Acme".into(),
            engagement_type: vec!["Internal".into()],
            client_feedback_questions: vec![FeedbackAnswer::new("Q1", "Great")],
            ..Engagement::default()
        };
        e.set_hours(40, 44);
        e.set_dates(
            chrono::NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
        );

        let mut out = Vec::new();
        print_engagement(&mut out, &e).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("--- Acme ---"));
        assert!(text.contains("44 spent / 40 projected (+4)"));
        assert!(text.contains("03/04/24 - 03/08/24 (5 business days)"));
        assert!(text.contains("A: Great"));
    }

    #[test]
    fn test_write_csv_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics_report.csv");
        std::fs::write(&path, "stale").unwrap();

        let report = MetricsEngine::new(MetricsOptions::default()).complete_report(&[]);
        write_csv(&path, &report).unwrap();

        let csv = std::fs::read_to_string(&path).unwrap();
        assert!(csv.starts_with("Label,Value\nTotal Engagements,0\n"));
        assert!(!csv.contains("stale"));
    }

    #[test]
    fn test_print_report_includes_diagnostics() {
        let report = MetricsReport {
            rows: vec![("A".into(), "1".into())],
            diagnostics: vec!["note".into()],
        };
        let mut out = Vec::new();
        print_report(&mut out, "Metrics", &report).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("=== Metrics ==="));
        assert!(text.contains("[debug] note"));
    }
}
