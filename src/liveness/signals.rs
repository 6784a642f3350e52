//! Inbound liveness signals.

use std::fmt;

/// Value carried by a control or data tag update.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Bool(v) => write!(f, "{v}"),
            TagValue::Int(v) => write!(f, "{v}"),
            TagValue::Float(v) => write!(f, "{v}"),
            TagValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for TagValue {
    fn from(v: bool) -> Self {
        TagValue::Bool(v)
    }
}

impl From<i64> for TagValue {
    fn from(v: i64) -> Self {
        TagValue::Int(v)
    }
}

impl From<f64> for TagValue {
    fn from(v: f64) -> Self {
        TagValue::Float(v)
    }
}

impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        TagValue::Text(v.to_owned())
    }
}

impl From<String> for TagValue {
    fn from(v: String) -> Self {
        TagValue::Text(v)
    }
}

/// Periodic "I am alive" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliveSignal {
    pub alive_tag_id: u64,
    /// Source timestamp of the marker (millis).
    pub signal_ts: u64,
    /// Server arrival time (millis).
    pub arrival_ts: u64,
}

/// Update of a communication-fault indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct CommFaultSignal {
    pub comm_fault_tag_id: u64,
    pub value: TagValue,
    pub value_description: String,
    pub signal_ts: u64,
}

/// Raw update of a control tag, before it is classified as alive or comm-fault.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlTagUpdate {
    pub tag_id: u64,
    pub value: TagValue,
    pub value_description: String,
    /// Timestamp set by the equipment, if any.
    pub source_ts: Option<u64>,
    /// Timestamp set by the acquisition process, if any.
    pub daq_ts: Option<u64>,
}

impl ControlTagUpdate {
    pub fn new(tag_id: u64, value: impl Into<TagValue>) -> Self {
        Self {
            tag_id,
            value: value.into(),
            value_description: String::new(),
            source_ts: None,
            daq_ts: None,
        }
    }

    #[must_use]
    pub fn with_source_ts(mut self, ts: u64) -> Self {
        self.source_ts = Some(ts);
        self
    }

    #[must_use]
    pub fn with_daq_ts(mut self, ts: u64) -> Self {
        self.daq_ts = Some(ts);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.value_description = description.into();
        self
    }

    /// Earliest timestamp present; `fallback` when neither is set.
    pub fn effective_timestamp(&self, fallback: u64) -> u64 {
        match (self.source_ts, self.daq_ts) {
            (Some(s), Some(d)) => s.min(d),
            (Some(t), None) | (None, Some(t)) => t,
            (None, None) => fallback,
        }
    }

    pub(crate) fn into_alive(self, arrival_ts: u64) -> AliveSignal {
        AliveSignal {
            alive_tag_id: self.tag_id,
            signal_ts: self.effective_timestamp(arrival_ts),
            arrival_ts,
        }
    }

    pub(crate) fn into_comm_fault(self, arrival_ts: u64) -> CommFaultSignal {
        CommFaultSignal {
            comm_fault_tag_id: self.tag_id,
            signal_ts: self.effective_timestamp(arrival_ts),
            value: self.value,
            value_description: self.value_description,
        }
    }
}
