use serde::Serialize;

/// The three generation stages of a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    BatchSummary,
    Architecture,
    Readme,
}

impl Task {
    pub fn as_str(self) -> &'static str {
        match self {
            Task::BatchSummary => "batch_summary",
            Task::Architecture => "architecture",
            Task::Readme => "readme",
        }
    }
}
