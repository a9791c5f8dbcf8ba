use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::error::AnalysisError;
use crate::models::{DateRange, EventLog, ALL_SEGMENTS};
use crate::periods::Granularity;

/// A customer's cohort: sortable key plus the bucket's first day, which
/// anchors the period windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortAssignment {
    pub key: String,
    pub start: NaiveDate,
}

/// Maps every customer with at least one basis-type event inside the date
/// range (inclusive) to the cohort of their earliest such event. Customers
/// without a qualifying event do not appear at all.
pub fn assign_cohorts(
    events: &EventLog,
    range: DateRange,
    basis_event_type: &str,
    granularity: Granularity,
) -> Result<HashMap<String, CohortAssignment>, AnalysisError> {
    let mut anchors: HashMap<&str, NaiveDate> = HashMap::new();
    for event in events.events() {
        if event.event_type != basis_event_type || !range.contains(event.date) {
            continue;
        }
        anchors
            .entry(event.customer_id.as_str())
            .and_modify(|anchor| *anchor = (*anchor).min(event.date))
            .or_insert(event.date);
    }

    let mut membership = HashMap::with_capacity(anchors.len());
    for (customer_id, anchor) in anchors {
        let start = granularity.bucket_start(anchor).ok_or_else(|| {
            AnalysisError::Computation(format!(
                "no bucket start for anchor {anchor} at {granularity:?} granularity"
            ))
        })?;
        membership.insert(
            customer_id.to_string(),
            CohortAssignment {
                key: granularity.label(anchor),
                start,
            },
        );
    }

    Ok(membership)
}

/// Customers belonging to `segment`: anyone with at least one event carrying
/// that label, or the whole population for the `All` sentinel. Applied to
/// cohort membership before sizing, so cohort sizes are segment-dependent.
pub fn segment_customers(events: &EventLog, segment: &str) -> HashSet<String> {
    events
        .events()
        .iter()
        .filter(|e| segment == ALL_SEGMENTS || e.segment.as_deref() == Some(segment))
        .map(|e| e.customer_id.clone())
        .collect()
}
