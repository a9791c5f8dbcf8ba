use thiserror::Error;

/// Failures the analysis pipeline can report to a caller.
///
/// An empty result table is not represented here: a run over data that
/// produces no cohorts succeeds with an empty `AnalysisTable`, so callers can
/// tell "insufficient data" apart from an actual failure.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The input file is malformed: required columns missing, dates that do
    /// not parse, or unreadable rows. Raised at the boundary, before the
    /// engine runs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The run is not fully configured yet: an event type that does not occur
    /// in the data, an empty segment list, or an inverted date range.
    #[error("analysis not ready: {0}")]
    IncompleteConfiguration(String),

    /// The engine hit a malformed intermediate state, e.g. date arithmetic
    /// leaving the supported calendar range. Always propagated with its
    /// cause, never collapsed into an empty table.
    #[error("cohort computation failed: {0}")]
    Computation(String),
}
