//! Analytics report rendering (CSV and Markdown)

use super::AnalyticsSummary;
use crate::error::BalanceError;
use crate::export::finish_csv;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

/// Output format for an analytics report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Csv,
    Markdown,
    Json,
}

/// Render a summary in the requested format
pub fn render(summary: &AnalyticsSummary, format: ReportFormat) -> Result<String, BalanceError> {
    match format {
        ReportFormat::Csv => to_csv(summary),
        ReportFormat::Markdown => Ok(to_markdown(summary)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn md_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "—".to_string())
}

/// Descriptives block, blank line, then correlations block
pub fn to_csv(summary: &AnalyticsSummary) -> Result<String, BalanceError> {
    let mut descriptives = csv::Writer::from_writer(Vec::new());
    descriptives.write_record(["section", "key", "n", "mean", "sd", "min", "max"])?;
    for d in &summary.descriptives {
        descriptives.write_record([
            "descriptive".to_string(),
            d.metric.as_str().to_string(),
            d.n.to_string(),
            cell(d.mean),
            cell(d.sd),
            cell(d.min),
            cell(d.max),
        ])?;
    }

    let mut correlations = csv::Writer::from_writer(Vec::new());
    correlations.write_record(["a", "b", "n", "r"])?;
    for row in &summary.correlations {
        correlations.write_record([
            row.a.as_str().to_string(),
            row.b.as_str().to_string(),
            row.n.to_string(),
            cell(row.r),
        ])?;
    }

    Ok(format!("{}\n{}", finish_csv(descriptives)?, finish_csv(correlations)?))
}

pub fn to_markdown(summary: &AnalyticsSummary) -> String {
    let mut md = vec![
        format!("# Analytics summary (last {} days)", summary.window_days),
        format!(
            "Generated: {}",
            summary.generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        ),
        String::new(),
        format!("- Days total: {}", summary.n_days_total),
        format!("- Days with LBI: {}", summary.n_days_with_index),
        format!("- Days with wearable: {}", summary.n_days_with_wearable),
        format!("- Days with check-ins: {}", summary.n_days_with_check_in),
        String::new(),
        "## Descriptives".to_string(),
        "| Metric | n | mean | sd | min | max |".to_string(),
        "|---|---:|---:|---:|---:|---:|".to_string(),
    ];
    for d in &summary.descriptives {
        md.push(format!(
            "| {} | {} | {} | {} | {} | {} |",
            d.metric.as_str(),
            d.n,
            md_cell(d.mean),
            md_cell(d.sd),
            md_cell(d.min),
            md_cell(d.max)
        ));
    }

    md.push(String::new());
    md.push("## Highlights".to_string());
    md.extend(summary.highlights.iter().map(|h| format!("- {h}")));

    md.push(String::new());
    md.push("## Correlations".to_string());
    md.push("| A | B | n | r |".to_string());
    md.push("|---|---|---:|---:|".to_string());
    for row in &summary.correlations {
        md.push(format!(
            "| {} | {} | {} | {} |",
            row.a.as_str(),
            row.b.as_str(),
            row.n,
            md_cell(row.r)
        ));
    }
    md.push(String::new());
    md.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::build_analytics_summary;
    use crate::analytics::tests::{fixed_time, make_test_history};

    #[test]
    fn test_csv_layout() {
        let summary = build_analytics_summary(&make_test_history(10), 30, fixed_time());
        let csv = to_csv(&summary).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "section,key,n,mean,sd,min,max");
        assert!(lines[1].starts_with("descriptive,index,10,"));
        assert_eq!(lines[8], "");
        assert_eq!(lines[9], "a,b,n,r");
        // Constant strain leaves r empty
        assert!(lines.contains(&"index,strain,10,"));
        assert_eq!(lines.len(), 22);
    }

    #[test]
    fn test_csv_render_matches_to_csv() {
        let summary = build_analytics_summary(&make_test_history(4), 30, fixed_time());
        assert_eq!(render(&summary, ReportFormat::Csv).unwrap(), to_csv(&summary).unwrap());
    }

    #[test]
    fn test_markdown_layout() {
        let summary = build_analytics_summary(&[], 30, fixed_time());
        let md = to_markdown(&summary);

        assert!(md.starts_with("# Analytics summary (last 30 days)\nGenerated: 2026-07-01T12:00:00.000Z\n"));
        assert!(md.contains("- Days total: 0"));
        assert!(md.contains("| index | 0 | — | — | — | — |"));
        assert!(md.contains("| index | recovery | 0 | — |"));
        assert!(md.contains("- Not enough data yet for robust correlations."));
    }

    #[test]
    fn test_json_render() {
        let summary = build_analytics_summary(&make_test_history(3), 30, fixed_time());
        let json = render(&summary, ReportFormat::Json).unwrap();
        assert!(json.contains("\"sleepHours\""));
    }
}
