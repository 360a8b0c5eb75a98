//! Aggregate metrics over the engagement collection.
//!
//! Every metric is an independent reduction with its own qualifying subset,
//! so a record missing one input never disturbs another metric.

use tracing::debug;

use crate::engagement::Engagement;

pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_INTERNAL: &str = "No internal engagements";

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsOptions {
    /// Emit extra diagnostics for the single-internal-engagement case.
    pub debug: bool,
}

/// Ordered `(label, value)` rows plus optional diagnostic lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsReport {
    pub rows: Vec<(String, String)>,
    pub diagnostics: Vec<String>,
}

impl MetricsReport {
    fn push(&mut self, label: &str, value: impl Into<String>) {
        self.rows.push((label.to_string(), value.into()));
    }

    pub fn value(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// One line per row, labels padded to the longest label.
    pub fn render_aligned(&self) -> Vec<String> {
        let width = self
            .rows
            .iter()
            .map(|(l, _)| l.chars().count())
            .max()
            .unwrap_or(0);
        self.rows
            .iter()
            .map(|(label, value)| format!("{label:<width$} : {value}"))
            .collect()
    }

    /// `Label,Value` CSV with a header row.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("Label,Value\n");
        for (label, value) in &self.rows {
            out.push_str(&csv_field(label));
            out.push(',');
            out.push_str(&csv_field(value));
            out.push('\n');
        }
        out
    }
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct MetricsEngine {
    options: MetricsOptions,
}

impl MetricsEngine {
    pub fn new(options: MetricsOptions) -> Self {
        Self { options }
    }

    pub fn complete_report(&self, engagements: &[Engagement]) -> MetricsReport {
        let mut report = MetricsReport::default();
        report.push("Total Engagements", engagements.len().to_string());
        report.push(
            "Internal Engagements with Domain Admin",
            format_internal_da_rate(internal_da_rate(engagements)),
        );
        report.push(
            "Average Compromised Users",
            average_compromised_pct(engagements)
                .map_or_else(|| NOT_AVAILABLE.to_string(), |p| format!("{p:.2}%")),
        );
        report.push(
            "Average Hours Variance",
            average_hours_variance(engagements)
                .map_or_else(|| NOT_AVAILABLE.to_string(), format_hours_variance),
        );
        report.push(
            "Average Project Length",
            average_project_length(engagements)
                .map_or_else(|| NOT_AVAILABLE.to_string(), format_project_length),
        );
        report.push(
            "Average Client Rating",
            average_rating(engagements)
                .map_or_else(|| NOT_AVAILABLE.to_string(), |r| format!("{r:.2}")),
        );

        if self.options.debug {
            report.diagnostics = single_internal_diagnostics(engagements);
        }
        report
    }

    /// Plain averages with no qualifying filter; empty input yields `N/A`.
    pub fn averages_report(&self, engagements: &[Engagement]) -> MetricsReport {
        let mut report = MetricsReport::default();
        let fields: [(&str, fn(&Engagement) -> u32); 3] = [
            ("Average Number of Users", |e| e.number_of_users),
            ("Average Live Hosts", |e| e.number_of_live_hosts),
            ("Average Compromised Users", |e| e.compromised_users_count),
        ];
        for (label, field) in fields {
            let avg = mean(engagements.iter().map(|e| f64::from(field(e))));
            report.push(
                label,
                avg.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.2}")),
            );
        }
        report
    }

    /// `Client: NAME, Rating: R/5`, sorted by client name.
    pub fn ratings_listing(&self, engagements: &[Engagement]) -> Vec<String> {
        let mut sorted: Vec<&Engagement> = engagements.iter().collect();
        sorted.sort_by(|a, b| a.client_name.cmp(&b.client_name));
        sorted
            .into_iter()
            .map(|e| {
                let rating = e
                    .client_rating
                    .map_or_else(|| NOT_AVAILABLE.to_string(), |r| r.to_string());
                format!("Client: {}, Rating: {rating}/5", e.client_name)
            })
            .collect()
    }
}

fn single_internal_diagnostics(engagements: &[Engagement]) -> Vec<String> {
    let internal: Vec<&Engagement> = engagements.iter().filter(|e| e.is_internal()).collect();
    let [only] = internal.as_slice() else {
        return Vec::new();
    };
    debug!(client = %only.client_name, "single internal engagement in metrics");
    vec![
        format!(
            "exactly one internal engagement: {} (types: {})",
            only.client_name,
            only.engagement_type.join(", ")
        ),
        format!("domainAdminObtained = {}", only.domain_admin_obtained),
    ]
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// `(percent, with_domain_admin, internal_total)` over internal engagements.
pub fn internal_da_rate(engagements: &[Engagement]) -> Option<(f64, usize, usize)> {
    let internal: Vec<&Engagement> = engagements.iter().filter(|e| e.is_internal()).collect();
    if internal.is_empty() {
        return None;
    }
    let with_da = internal.iter().filter(|e| e.domain_admin_obtained).count();
    let pct = with_da as f64 / internal.len() as f64 * 100.0;
    Some((round2(pct), with_da, internal.len()))
}

pub fn format_internal_da_rate(rate: Option<(f64, usize, usize)>) -> String {
    match rate {
        Some((pct, d, n)) => format!("{pct:.2}% ({d}/{n})"),
        None => NO_INTERNAL.to_string(),
    }
}

/// Mean compromised-user percentage over records with at least one user.
pub fn average_compromised_pct(engagements: &[Engagement]) -> Option<f64> {
    mean(engagements.iter().filter_map(Engagement::compromised_pct)).map(round2)
}

/// Mean of `hoursSpent - projectedHours` over records with both hours set
/// and non-negative.
pub fn average_hours_variance(engagements: &[Engagement]) -> Option<f64> {
    mean(
        engagements
            .iter()
            .filter_map(|e| match (e.projected_hours, e.hours_spent) {
                (Some(p), Some(s)) if p >= 0 && s >= 0 => Some((s - p) as f64),
                _ => None,
            }),
    )
    .map(round2)
}

pub fn format_hours_variance(variance: f64) -> String {
    if variance > 0.0 {
        format!("Over by {variance:.2}h")
    } else if variance < 0.0 {
        format!("Under by {:.2}h", variance.abs())
    } else {
        "Exactly on target!".to_string()
    }
}

/// Mean business-day length, rounded to whole days, over records with a
/// positive `businessDaysCount`.
pub fn average_project_length(engagements: &[Engagement]) -> Option<u32> {
    mean(
        engagements
            .iter()
            .filter(|e| e.business_days_count > 0)
            .map(|e| f64::from(e.business_days_count)),
    )
    .map(|d| d.round() as u32)
}

pub fn format_project_length(days: u32) -> String {
    format!("{days} days ({} wks, {} days)", days / 5, days % 5)
}

pub fn average_rating(engagements: &[Engagement]) -> Option<f64> {
    mean(engagements.iter().filter_map(|e| e.client_rating)).map(round2)
}
