//! 只追加的生成历史
//!
//! 记录一经追加即不可变（Arc 共享，只读访问）；日志只提供 append，没有修改或删除入口。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::intent::Intent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Generation,
    Evolution,
}

/// 产物快照
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultSnapshot {
    pub source: String,
    /// 渲染出的标记；绘制失败时为 None
    pub markup: Option<String>,
    /// `synthesized` 或 `fallback:<category>`
    pub origin: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub id: String,
    pub kind: HistoryKind,
    pub intent_snapshot: Intent,
    pub result_snapshot: ResultSnapshot,
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(kind: HistoryKind, intent: Intent, result: ResultSnapshot) -> Self {
        Self {
            id: format!("rec_{}", uuid::Uuid::new_v4().simple()),
            kind,
            intent_snapshot: intent,
            result_snapshot: result,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
pub struct HistoryLog {
    records: Vec<Arc<HistoryRecord>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: HistoryRecord) -> Arc<HistoryRecord> {
        let record = Arc::new(record);
        self.records.push(Arc::clone(&record));
        record
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Arc<HistoryRecord>] {
        &self.records
    }

    pub fn last(&self) -> Option<&Arc<HistoryRecord>> {
        self.records.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(source: &str) -> ResultSnapshot {
        ResultSnapshot {
            source: source.to_string(),
            markup: Some(format!("<p>{}</p>", source)),
            origin: "synthesized".to_string(),
        }
    }

    #[test]
    fn test_append_preserves_earlier_records() {
        let mut log = HistoryLog::new();
        let first = log.append(HistoryRecord::new(
            HistoryKind::Generation,
            Intent::named("One"),
            snapshot("a"),
        ));
        let before = (*first).clone();

        log.append(HistoryRecord::new(
            HistoryKind::Evolution,
            Intent::named("One"),
            snapshot("b"),
        ));

        assert_eq!(log.len(), 2);
        assert_eq!(*log.records()[0], before);
        assert_ne!(log.records()[0].id, log.records()[1].id);
        assert_eq!(log.last().map(|r| r.kind), Some(HistoryKind::Evolution));
    }

    #[test]
    fn test_record_serializes_with_lowercase_kind() {
        let record = HistoryRecord::new(HistoryKind::Generation, Intent::named("X"), snapshot("s"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "generation");
        assert_eq!(json["intent_snapshot"]["name"], "X");
        assert!(json["id"].as_str().unwrap().starts_with("rec_"));
    }
}
