//! Perfdata sink (spec.md overview: "perfdata sink"): ships the parsed
//! `label=value[unit];warn;crit;min;max` points a check result carries to
//! a time-series backend the core doesn't otherwise know about.

use parking_lot::Mutex;

use clustermon_types::{CheckableId, PerfDataPoint};

pub trait PerfdataSink: Send + Sync {
    fn emit(&self, checkable: &CheckableId, ts: f64, points: &[PerfDataPoint]);
}

#[derive(Debug, Clone)]
pub struct RecordedPerfdata {
    pub checkable: CheckableId,
    pub ts: f64,
    pub points: Vec<PerfDataPoint>,
}

#[derive(Default)]
pub struct RecordingPerfdataSink {
    batches: Mutex<Vec<RecordedPerfdata>>,
}

impl RecordingPerfdataSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<RecordedPerfdata> {
        self.batches.lock().clone()
    }
}

impl PerfdataSink for RecordingPerfdataSink {
    fn emit(&self, checkable: &CheckableId, ts: f64, points: &[PerfDataPoint]) {
        self.batches.lock().push(RecordedPerfdata { checkable: checkable.clone(), ts, points: points.to_vec() });
    }
}

pub struct NullPerfdataSink;

impl PerfdataSink for NullPerfdataSink {
    fn emit(&self, _checkable: &CheckableId, _ts: f64, _points: &[PerfDataPoint]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(label: &str, value: f64) -> PerfDataPoint {
        PerfDataPoint { label: label.to_string(), value, unit: String::new(), warn: None, crit: None, min: None, max: None }
    }

    #[test]
    fn recording_sink_keeps_batches_in_order() {
        let sink = RecordingPerfdataSink::new();
        let id = CheckableId::host("web1");
        sink.emit(&id, 100.0, &[point("rta", 1.2)]);
        sink.emit(&id, 160.0, &[point("rta", 1.5)]);

        let batches = sink.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].ts, 100.0);
        assert_eq!(batches[1].points[0].value, 1.5);
    }
}
