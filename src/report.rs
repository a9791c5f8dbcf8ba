use std::fmt::Write;

use crate::models::{AnalysisContext, AnalysisTable, Mode};

fn mode_label(mode: Mode) -> &'static str {
    match mode {
        Mode::Retention => "retention",
        Mode::Churn => "churn",
    }
}

/// Plain-text table of the result rows, rates as fractions. Formatting for
/// charts and percentage labels is a consumer concern.
pub fn render_table(table: &AnalysisTable) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{:<16} {:<12} {:>6} {:>8} {:>12} {:>14}",
        "segment", "cohort", "period", "rate", "cohort_size", "retained_users"
    );
    for record in table.records() {
        let _ = writeln!(
            output,
            "{:<16} {:<12} {:>6} {:>8.4} {:>12} {:>14}",
            record.segment,
            record.cohort,
            record.period,
            record.rate,
            record.cohort_size,
            record.retained_users
        );
    }
    output
}

pub fn to_csv(table: &AnalysisTable) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in table.records() {
        writer.serialize(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing csv output: {e}"))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn to_json(table: &AnalysisTable) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(table)?)
}

/// Markdown summary of one analysis run.
pub fn build_report(ctx: &AnalysisContext, table: &AnalysisTable) -> String {
    let settings = ctx.settings();
    let range = ctx.date_range();
    let mut output = String::new();

    let _ = writeln!(output, "# Cohort Retention Report");
    let _ = writeln!(
        output,
        "{:?} {} for `{}` cohorts measured by `{}` ({} to {})",
        settings.granularity,
        mode_label(settings.mode),
        settings.basis_event_type,
        settings.retention_event_type,
        range.start(),
        range.end()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Cohorts");

    if table.is_empty() {
        let _ = writeln!(
            output,
            "No cohort reached positive size in this window. Not enough data to analyze."
        );
        return output;
    }

    for segment in ctx.segments() {
        let _ = writeln!(output);
        let _ = writeln!(output, "### Segment: {segment}");
        let rows: Vec<_> = table
            .records()
            .iter()
            .filter(|r| &r.segment == segment)
            .collect();
        if rows.is_empty() {
            let _ = writeln!(output, "No cohorts in this segment.");
            continue;
        }
        // One line per cohort: size plus the early-period rates, the part of
        // the curve people actually read first.
        let mut cohorts: Vec<&str> = rows.iter().map(|r| r.cohort.as_str()).collect();
        cohorts.dedup();
        for cohort in cohorts {
            let cohort_rows: Vec<_> = rows.iter().filter(|r| r.cohort == cohort).collect();
            let size = cohort_rows.first().map_or(0, |r| r.cohort_size);
            let early: Vec<String> = cohort_rows
                .iter()
                .take(4)
                .map(|r| format!("p{} {:.0}%", r.period, r.rate * 100.0))
                .collect();
            let _ = writeln!(
                output,
                "- {cohort}: {size} customers, {} {}",
                mode_label(settings.mode),
                early.join(" / ")
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Table: {} rows across {} segment(s), periods 0-12.",
        table.len(),
        ctx.segments().len()
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::run_analysis;
    use crate::models::{CohortSettings, DateRange, Event, EventLog, ALL_SEGMENTS};
    use crate::periods::Granularity;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_context(log: &EventLog) -> AnalysisContext<'_> {
        AnalysisContext::new(
            log,
            CohortSettings {
                basis_event_type: "signup".to_string(),
                granularity: Granularity::Daily,
                retention_event_type: "purchase".to_string(),
                mode: Mode::Retention,
            },
            DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap(),
            vec![ALL_SEGMENTS.to_string()],
        )
        .unwrap()
    }

    fn sample_log() -> EventLog {
        EventLog::new(vec![
            Event {
                customer_id: "a".to_string(),
                date: date(2024, 1, 1),
                event_type: "signup".to_string(),
                segment: None,
            },
            Event {
                customer_id: "a".to_string(),
                date: date(2024, 1, 2),
                event_type: "purchase".to_string(),
                segment: None,
            },
        ])
    }

    #[test]
    fn report_lists_cohorts_with_sizes() {
        let log = sample_log();
        let ctx = sample_context(&log);
        let table = run_analysis(&ctx).unwrap();
        let report = build_report(&ctx, &table);

        assert!(report.contains("# Cohort Retention Report"));
        assert!(report.contains("### Segment: All"));
        assert!(report.contains("2024-01-01: 1 customers"));
        assert!(report.contains("13 rows across 1 segment(s)"));
    }

    #[test]
    fn empty_table_reports_insufficient_data() {
        let log = sample_log();
        let ctx = sample_context(&log);
        let report = build_report(&ctx, &AnalysisTable::default());
        assert!(report.contains("Not enough data to analyze."));
    }

    #[test]
    fn csv_output_carries_the_contract_columns() {
        let log = sample_log();
        let ctx = sample_context(&log);
        let table = run_analysis(&ctx).unwrap();
        let csv = to_csv(&table).unwrap();

        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("segment,cohort,period,rate,cohort_size,retained_users")
        );
        assert_eq!(lines.count(), 13);
    }

    #[test]
    fn json_output_is_a_flat_record_array() {
        let log = sample_log();
        let ctx = sample_context(&log);
        let table = run_analysis(&ctx).unwrap();
        let json = to_json(&table).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 13);
        assert_eq!(parsed[1]["rate"], 1.0);
    }
}
