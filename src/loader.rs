use std::path::Path;

use crate::error::AnalysisError;
use crate::models::{Event, EventLog};

const REQUIRED_COLUMNS: [&str; 3] = ["customer_id", "date", "event_type"];

/// Reads an event CSV into a validated `EventLog`. Missing required columns
/// and unparseable rows (dates in particular) are rejected here, before the
/// engine ever sees the data.
pub fn load_events(path: &Path) -> Result<EventLog, AnalysisError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| AnalysisError::InvalidInput(format!("cannot open {}: {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| AnalysisError::InvalidInput(format!("cannot read header row: {e}")))?
        .clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(AnalysisError::InvalidInput(format!(
                "missing required column `{column}` (need customer_id, date, event_type)"
            )));
        }
    }

    let mut events = Vec::new();
    for (index, row) in reader.deserialize::<Event>().enumerate() {
        // Line 1 is the header, so data row N sits on line N + 1.
        let event =
            row.map_err(|e| AnalysisError::InvalidInput(format!("line {}: {e}", index + 2)))?;
        events.push(event);
    }

    Ok(EventLog::new(events))
}
