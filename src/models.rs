use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::periods::Granularity;

/// Sentinel segment label meaning "no segment filtering".
pub const ALL_SEGMENTS: &str = "All";

/// One row of the input table. Deserialized straight from CSV; an empty
/// segment field becomes `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub customer_id: String,
    pub date: NaiveDate,
    pub event_type: String,
    #[serde(default)]
    pub segment: Option<String>,
}

/// Immutable, validated event collection for one analysis run.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Earliest and latest event dates, or `None` for an empty log.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.events.first()?.date;
        Some(self.events.iter().fold((first, first), |(min, max), e| {
            (min.min(e.date), max.max(e.date))
        }))
    }

    pub fn customer_count(&self) -> usize {
        self.events
            .iter()
            .map(|e| e.customer_id.as_str())
            .collect::<std::collections::HashSet<_>>()
            .len()
    }

    /// Distinct event types, sorted.
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .events
            .iter()
            .map(|e| e.event_type.clone())
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        types.sort();
        types
    }

    /// Distinct segment labels, sorted. Empty when the data carries none.
    pub fn segments(&self) -> Vec<String> {
        let mut segments: Vec<String> = self
            .events
            .iter()
            .filter_map(|e| e.segment.clone())
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        segments.sort();
        segments
    }
}

/// Output polarity: retention rate as computed, or its churn complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Retention,
    Churn,
}

/// Configuration for one run; read-only once assembled.
#[derive(Debug, Clone)]
pub struct CohortSettings {
    pub basis_event_type: String,
    pub granularity: Granularity,
    pub retention_event_type: String,
    pub mode: Mode,
}

/// Inclusive date window deciding which basis events qualify a customer for
/// cohort membership. Period windows are not clipped to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AnalysisError> {
        if start > end {
            return Err(AnalysisError::IncompleteConfiguration(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Everything the engine needs for one run, assembled once and passed as a
/// single immutable argument. Validation happens here so the engine can
/// assume a well-formed configuration.
#[derive(Debug, Clone)]
pub struct AnalysisContext<'a> {
    events: &'a EventLog,
    settings: CohortSettings,
    date_range: DateRange,
    segments: Vec<String>,
}

impl<'a> AnalysisContext<'a> {
    /// The segment list may be any length; the five-segment limit in some
    /// front ends is guidance for them to enforce, not an engine rule.
    pub fn new(
        events: &'a EventLog,
        settings: CohortSettings,
        date_range: DateRange,
        segments: Vec<String>,
    ) -> Result<Self, AnalysisError> {
        if segments.is_empty() {
            return Err(AnalysisError::IncompleteConfiguration(
                "no segments selected".to_string(),
            ));
        }
        let observed = events.event_types();
        for event_type in [&settings.basis_event_type, &settings.retention_event_type] {
            if !observed.iter().any(|t| t == event_type) {
                return Err(AnalysisError::IncompleteConfiguration(format!(
                    "event type `{event_type}` does not occur in the data"
                )));
            }
        }
        Ok(Self {
            events,
            settings,
            date_range,
            segments,
        })
    }

    pub fn events(&self) -> &EventLog {
        self.events
    }

    pub fn settings(&self) -> &CohortSettings {
        &self.settings
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

/// One output row. Field order matches the downstream table contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionRecord {
    pub segment: String,
    pub cohort: String,
    pub period: u32,
    pub rate: f64,
    pub cohort_size: usize,
    pub retained_users: usize,
}

/// Flat result table ordered by (segment, cohort, period). An empty table is
/// a successful "insufficient data" outcome, not a failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnalysisTable {
    records: Vec<RetentionRecord>,
}

impl AnalysisTable {
    pub fn new(records: Vec<RetentionRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[RetentionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
