use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::scan::ScanStats;

/// Final output of a digest run; this is what gets cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestResult {
    pub repo: String,
    pub languages: Vec<String>,
    pub selected_files: Vec<String>,
    pub batch_count: usize,
    pub batch_summaries: Vec<String>,
    pub architecture: String,
    pub readme: String,
    pub scan: ScanStats,
}

/// Streamed status updates, one JSON object per line on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ProgressEvent {
    Cache {
        message: String,
    },
    Clone {
        message: String,
    },
    Read {
        message: String,
        files_accepted: usize,
        files_selected: usize,
    },
    Pack {
        batches: usize,
    },
    Analyze {
        progress: String,
        completed: usize,
        total: usize,
    },
    Architecture {
        message: String,
    },
    Readme {
        message: String,
    },
    Done {
        message: String,
    },
}

/// Sending half of the progress stream. A disabled or abandoned stream
/// silently drops events.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl Progress {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_step_tag() {
        let json = serde_json::to_string(&ProgressEvent::Analyze {
            progress: "Batch 2/4".to_string(),
            completed: 2,
            total: 4,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"step":"analyze","progress":"Batch 2/4","completed":2,"total":4}"#
        );
    }

    #[test]
    fn dropped_receiver_does_not_fail_emit() {
        let (progress, rx) = Progress::channel();
        drop(rx);
        progress.emit(ProgressEvent::Pack { batches: 1 });
        Progress::disabled().emit(ProgressEvent::Pack { batches: 1 });
    }
}
