use std::fmt::{Display, Formatter};

/// REALTIME_NS is the name of the distinguished nanosecond timestamp field.
pub const REALTIME_NS: &'static str = "realtime_ns";

/// FieldValue is the value of one non-timestamp field of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Uint32(u32),
    Float(f32),
}

impl FieldValue {
    /// bit_eq compares two values by their encoded bits, so NaN payloads and
    /// signed zeros are distinguished.
    pub fn bit_eq(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Uint32(a), FieldValue::Uint32(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Uint32(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Sample is one row of telemetry: the `realtime_ns` timestamp followed by
/// the remaining fields in source column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub realtime_ns: u64,
    pub fields: Vec<(String, FieldValue)>,
}

impl Sample {
    pub fn new(realtime_ns: u64) -> Self {
        Self {
            realtime_ns,
            fields: vec![],
        }
    }

    pub fn with_fields(realtime_ns: u64, fields: Vec<(String, FieldValue)>) -> Self {
        Self {
            realtime_ns,
            fields,
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.push((name.into(), value));
    }

    pub fn uint32(mut self, name: impl Into<String>, value: u32) -> Self {
        self.push(name, FieldValue::Uint32(value));
        self
    }

    pub fn float(mut self, name: impl Into<String>, value: f32) -> Self {
        self.push(name, FieldValue::Float(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use crate::sample::{FieldValue, Sample};

    #[test]
    fn test_sample_builder() {
        let s = Sample::new(1000).uint32("rpm", 4000).float("map", 97.5);
        assert_eq!(s.get("rpm"), Some(FieldValue::Uint32(4000)));
        assert_eq!(s.get("map"), Some(FieldValue::Float(97.5)));
        assert_eq!(s.get("ego"), None);
    }

    #[test]
    fn test_bit_eq() {
        let nan = FieldValue::Float(f32::NAN);
        assert!(nan.bit_eq(&nan));
        assert!(!FieldValue::Float(0.0).bit_eq(&FieldValue::Float(-0.0)));
        assert!(!FieldValue::Uint32(1).bit_eq(&FieldValue::Float(1.0)));
    }
}
