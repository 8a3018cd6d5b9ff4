use std::{collections::BTreeMap, fmt};

/// Kind of per-unit failure, following the error taxonomy of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailureKind {
    /// A polygon or polygon pair that could not be repaired or measured.
    Geometry,
    /// A unit with no matching counterpart (precinct without tally, block without district).
    MissingJoin,
    /// A unit whose statistics divide by a zero total.
    DegenerateDenominator,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Geometry => "geometry",
            FailureKind::MissingJoin => "missing-join",
            FailureKind::DegenerateDenominator => "degenerate-denominator",
        })
    }
}

/// Counts of processed and failed units for one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    stage: &'static str,
    processed: usize,
    failures: BTreeMap<FailureKind, usize>,
}

impl StageReport {
    pub fn new(stage: &'static str) -> Self {
        Self { stage, processed: 0, failures: BTreeMap::new() }
    }

    #[inline] pub fn stage(&self) -> &'static str { self.stage }

    /// Units that completed the stage.
    #[inline] pub fn processed(&self) -> usize { self.processed }

    pub(crate) fn add_processed(&mut self, count: usize) { self.processed += count }

    pub(crate) fn add_failures(&mut self, kind: FailureKind, count: usize) {
        if count > 0 { *self.failures.entry(kind).or_default() += count }
    }

    /// Failures of one kind.
    pub fn failures(&self, kind: FailureKind) -> usize {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    /// Units skipped by a failure of any kind.
    pub fn skipped(&self) -> usize { self.failures.values().sum() }

    /// Emit the report through `tracing`.
    pub fn log(&self) {
        if self.failures.is_empty() {
            tracing::info!(stage = self.stage, processed = self.processed, "stage complete");
        } else {
            tracing::warn!(stage = self.stage, processed = self.processed, failures = %self, "stage complete with failures");
        }
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} processed", self.stage, self.processed)?;
        for (kind, count) in &self.failures {
            write!(f, ", {count} {kind}")?;
        }
        Ok(())
    }
}
