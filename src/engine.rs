use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::cohort;
use crate::error::AnalysisError;
use crate::models::{AnalysisContext, AnalysisTable, Mode, RetentionRecord};
use crate::periods::PeriodWindows;

/// Runs one cohort analysis: assigns cohorts, walks each requested segment's
/// cohorts in ascending key order, counts distinct retained customers across
/// the 13 period windows, and returns the flat ordered table.
///
/// A run that finds no cohorts returns an empty table; only malformed
/// intermediate state is an error.
pub fn run_analysis(ctx: &AnalysisContext) -> Result<AnalysisTable, AnalysisError> {
    let settings = ctx.settings();
    let membership = cohort::assign_cohorts(
        ctx.events(),
        ctx.date_range(),
        &settings.basis_event_type,
        settings.granularity,
    )?;

    // Retention event dates per customer, indexed once for the whole run.
    let mut retention_dates: HashMap<&str, Vec<NaiveDate>> = HashMap::new();
    for event in ctx.events().events() {
        if event.event_type == settings.retention_event_type {
            retention_dates
                .entry(event.customer_id.as_str())
                .or_default()
                .push(event.date);
        }
    }

    let mut records = Vec::new();
    for segment in ctx.segments() {
        let population = cohort::segment_customers(ctx.events(), segment);

        // BTreeMap keeps cohorts in chronological key order. Membership is
        // filtered to the segment here, before sizing.
        let mut cohorts: BTreeMap<&str, (NaiveDate, Vec<&str>)> = BTreeMap::new();
        for (customer_id, assignment) in &membership {
            if population.contains(customer_id) {
                cohorts
                    .entry(assignment.key.as_str())
                    .or_insert_with(|| (assignment.start, Vec::new()))
                    .1
                    .push(customer_id.as_str());
            }
        }

        for (key, (start, members)) in cohorts {
            if members.is_empty() {
                continue;
            }
            let cohort_size = members.len();

            for window in PeriodWindows::new(settings.granularity, start) {
                let window = window?;
                // Members are distinct by construction, so this is a count
                // of distinct retained customers.
                let retained_users = members
                    .iter()
                    .filter(|customer_id| {
                        retention_dates
                            .get(**customer_id)
                            .is_some_and(|dates| dates.iter().any(|d| window.contains(*d)))
                    })
                    .count();

                let retention_rate = retained_users as f64 / cohort_size as f64;
                let rate = match settings.mode {
                    Mode::Retention => retention_rate,
                    Mode::Churn => 1.0 - retention_rate,
                };

                records.push(RetentionRecord {
                    segment: segment.clone(),
                    cohort: key.to_string(),
                    period: window.index,
                    rate,
                    cohort_size,
                    retained_users,
                });
            }
        }
    }

    Ok(AnalysisTable::new(records))
}
