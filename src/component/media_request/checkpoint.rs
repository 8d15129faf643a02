//! 進度檢查點
//!
//! 核心只產生資料，格式化與輸出交給呼叫端。

use super::media_source::SourceKind;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Checkpoint {
    Started {
        source: String,
        kind: SourceKind,
        mode: String,
        dry_run: bool,
    },
    PlanResolved {
        frames: usize,
        duration_sec: f64,
    },
    FrameEncoded {
        index: usize,
        total: usize,
        timestamp: f64,
        bytes: usize,
    },
    AudioExtracted {
        duration_sec: f64,
        bytes: usize,
    },
    AudioSkipped {
        reason: String,
    },
    CostSummary {
        total_tokens: u64,
        cost_usd: f64,
        model: String,
    },
    Completed {
        frames: usize,
        total_bytes: u64,
        fits: bool,
    },
}

/// 檢查點接收端；影格編碼時會從多個執行緒呼叫
pub trait CheckpointSink: Sync {
    fn record(&self, checkpoint: &Checkpoint);
}

/// 不做任何事的接收端
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl CheckpointSink for NoopSink {
    fn record(&self, _checkpoint: &Checkpoint) {}
}

/// 收集所有檢查點
#[derive(Debug, Default)]
pub struct CheckpointLog {
    entries: Mutex<Vec<Checkpoint>>,
}

impl CheckpointLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<Checkpoint> {
        self.entries
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Checkpoint> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CheckpointSink for CheckpointLog {
    fn record(&self, checkpoint: &Checkpoint) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(checkpoint.clone());
    }
}

/// 同時寫入內部記錄與外部接收端
pub(crate) struct Recorder<'a> {
    sink: &'a dyn CheckpointSink,
    log: CheckpointLog,
}

impl<'a> Recorder<'a> {
    pub(crate) fn new(sink: &'a dyn CheckpointSink) -> Self {
        Self {
            sink,
            log: CheckpointLog::new(),
        }
    }

    pub(crate) fn emit(&self, checkpoint: Checkpoint) {
        log::debug!("checkpoint: {checkpoint:?}");
        self.sink.record(&checkpoint);
        self.log.record(&checkpoint);
    }

    pub(crate) fn finish(self) -> Vec<Checkpoint> {
        self.log.into_entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_forwards_and_keeps() {
        let external = CheckpointLog::new();
        let recorder = Recorder::new(&external);

        recorder.emit(Checkpoint::PlanResolved {
            frames: 3,
            duration_sec: 1.5,
        });
        recorder.emit(Checkpoint::AudioSkipped {
            reason: "audio disabled".to_string(),
        });

        assert_eq!(external.snapshot().len(), 2);
        assert_eq!(recorder.finish().len(), 2);
    }

    #[test]
    fn test_checkpoint_serializes_with_stage_tag() {
        let json = serde_json::to_value(Checkpoint::CostSummary {
            total_tokens: 1548,
            cost_usd: 0.0,
            model: "gemini-2.5-flash".to_string(),
        })
        .unwrap();

        assert_eq!(json["stage"], "cost_summary");
        assert_eq!(json["total_tokens"], 1548);
    }
}
