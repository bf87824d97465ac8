//! The fixed-size wire record for a single metric observation:
//! `(timestamp_ticks, type, metric_id, value, label_set_id)` packed into 24
//! bytes with one reserved byte.

use crate::error::{MetricsError, Result};

pub const ENTRY_SIZE: usize = 24;

/// Tag identifying which primitive produced a [`MetricEntry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MetricKind {
    Counter = 0,
    Gauge = 1,
    Histogram = 2,
    LabeledCounter = 3,
    RateCounter = 4,
}

impl MetricKind {
    fn from_u8(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => MetricKind::Counter,
            1 => MetricKind::Gauge,
            2 => MetricKind::Histogram,
            3 => MetricKind::LabeledCounter,
            4 => MetricKind::RateCounter,
            other => return Err(MetricsError::MalformedEntry(format!("unknown metric kind tag {other}"))),
        })
    }
}

/// Layout (little-endian): `timestamp_ticks: u64` @0, `kind: u8` @8,
/// reserved @9, `metric_id: u32` @10, `value: f64` @14, `label_set_id: u16`
/// @22. Total 24 bytes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricEntry {
    pub timestamp_ticks: u64,
    pub kind: MetricKind,
    pub metric_id: u32,
    pub value: f64,
    pub label_set_id: u16,
}

impl MetricEntry {
    pub const SIZE: usize = ENTRY_SIZE;

    pub fn to_bytes(&self) -> [u8; ENTRY_SIZE] {
        let mut buf = [0u8; ENTRY_SIZE];
        buf[0..8].copy_from_slice(&self.timestamp_ticks.to_le_bytes());
        buf[8] = self.kind as u8;
        buf[9] = 0;
        buf[10..14].copy_from_slice(&self.metric_id.to_le_bytes());
        buf[14..22].copy_from_slice(&self.value.to_le_bytes());
        buf[22..24].copy_from_slice(&self.label_set_id.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() != ENTRY_SIZE {
            return Err(MetricsError::MalformedEntry(format!(
                "expected {ENTRY_SIZE} bytes, got {}",
                buf.len()
            )));
        }
        let timestamp_ticks = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let kind = MetricKind::from_u8(buf[8])?;
        let metric_id = u32::from_le_bytes(buf[10..14].try_into().unwrap());
        let value = f64::from_le_bytes(buf[14..22].try_into().unwrap());
        let label_set_id = u16::from_le_bytes(buf[22..24].try_into().unwrap());
        Ok(Self { timestamp_ticks, kind, metric_id, value, label_set_id })
    }
}
