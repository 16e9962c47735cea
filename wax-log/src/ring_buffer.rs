//! 最近日志的环形缓冲区
//!
//! 渲染失败时转储，或在测试里断言引擎经过了哪些阶段。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use wax_config::Phase;

use crate::logger::LogSink;
use crate::record::Record;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RingBufferStats {
    pub record_count: usize,
    /// 被新记录挤出的条数
    pub dropped_count: usize,
    pub capacity: usize,
}

/// 容量满时丢弃最旧的记录
pub struct LogRingBuffer {
    records: Mutex<VecDeque<Record>>,
    capacity: usize,
    dropped: AtomicUsize,
}

impl LogRingBuffer {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(LogRingBuffer {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicUsize::new(0),
        })
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Record>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, record: &Record) {
        if self.capacity == 0 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let mut records = self.lock();
        if records.len() == self.capacity {
            records.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        records.push_back(record.clone());
    }

    /// 按写入顺序
    pub fn dump_records(&self) -> Vec<Record> {
        self.lock().iter().cloned().collect()
    }

    /// 某个渲染阶段的记录
    pub fn phase_records(&self, phase: Phase) -> Vec<Record> {
        self.lock()
            .iter()
            .filter(|record| record.phase() == Some(phase))
            .cloned()
            .collect()
    }

    /// 每行一条，格式同 [`Record::format`]
    pub fn dump(&self) -> String {
        let records = self.lock();
        let mut out = String::new();
        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&record.format());
        }
        out
    }

    pub fn clear(&self) {
        self.lock().clear();
        self.dropped.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> RingBufferStats {
        RingBufferStats {
            record_count: self.len(),
            dropped_count: self.dropped.load(Ordering::Relaxed),
            capacity: self.capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for Arc<LogRingBuffer> {
    fn write(&self, record: &Record) {
        self.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;

    fn record(target: &'static str, message: &str) -> Record {
        Record::new(Level::Info, target, message)
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let ring = LogRingBuffer::new(2);
        ring.write(&record("wax::load", "1"));
        ring.write(&record("wax::load", "2"));
        ring.write(&record("wax::load", "3"));

        let messages: Vec<_> = ring.dump_records().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["2", "3"]);
        assert_eq!(
            ring.stats(),
            RingBufferStats {
                record_count: 2,
                dropped_count: 1,
                capacity: 2,
            }
        );
    }

    #[test]
    fn test_zero_capacity() {
        let ring = LogRingBuffer::new(0);
        ring.write(&record("wax::load", "lost"));
        assert!(ring.is_empty());
        assert_eq!(ring.stats().dropped_count, 1);
    }

    #[test]
    fn test_phase_records() {
        let ring = LogRingBuffer::new(8);
        ring.write(&record("wax::load", "render view 'View'"));
        ring.write(&record("wax::compile", "compiled /View.jsx"));
        ring.write(&record("wax::execute", "linked /View.jsx"));

        let compile = ring.phase_records(Phase::Compile);
        assert_eq!(compile.len(), 1);
        assert_eq!(compile[0].message, "compiled /View.jsx");
    }

    #[test]
    fn test_dump_and_clear() {
        let ring = LogRingBuffer::new(8);
        ring.write(&record("wax::load", "first"));
        ring.write(&record("wax::execute", "second"));

        let dump = ring.dump();
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("INFO  wax::load: first"));
        assert!(lines[1].ends_with("INFO  wax::execute: second"));

        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.dump(), "");
    }
}
