//! Capture record types and their JSON representation.
//!
//! ```json
//! {"type": "mem", "start": {"sym": "buf", "value": 4096},
//!  "length": {"sym": "16", "value": 16}, "data": "aGkA...",
//!  "flags": ["str"], "info": ["unterminated_str"], "ts": 1700000000.25}
//! ```

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;

/// An expression as typed by the user together with what it resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operand {
    pub sym: String,
    /// Signed or unsigned 64-bit value, written as a plain JSON integer
    #[serde(with = "wide_int")]
    pub value: i128,
}

impl Operand {
    pub fn new(sym: impl Into<String>, value: impl Into<i128>) -> Self {
        Self {
            sym: sym.into(),
            value: value.into(),
        }
    }
}

/// Requested post-processing of a memory capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureFlag {
    /// Payload is a zero-terminated string
    Str,
}

impl CaptureFlag {
    pub const ALL: &'static [CaptureFlag] = &[CaptureFlag::Str];

    pub fn label(self) -> &'static str {
        match self {
            CaptureFlag::Str => "str",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.label() == label)
    }
}

/// Facts derived while building a memory capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureInfo {
    /// `str` was requested but the payload holds no zero byte
    UnterminatedStr,
}

impl CaptureInfo {
    pub fn label(self) -> &'static str {
        match self {
            CaptureInfo::UnterminatedStr => "unterminated_str",
        }
    }
}

/// `val` record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCapture {
    pub expr: Operand,
    pub ts: f64,
}

/// `mem` record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryCapture {
    pub start: Operand,
    pub length: Operand,
    #[serde(with = "base64_payload")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "BTreeSet::is_empty",
        serialize_with = "sorted_flags"
    )]
    pub flags: BTreeSet<CaptureFlag>,
    #[serde(
        default,
        skip_serializing_if = "BTreeSet::is_empty",
        serialize_with = "sorted_info"
    )]
    pub info: BTreeSet<CaptureInfo>,
    pub ts: f64,
}

/// One entry of the capture log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CaptureRecord {
    Val(ValueCapture),
    Mem(MemoryCapture),
}

impl CaptureRecord {
    /// Wrap a resolved expression. The timestamp is filled in on append.
    pub fn build_value(expr: Operand) -> Self {
        CaptureRecord::Val(ValueCapture { expr, ts: 0.0 })
    }

    /// Build a memory capture, applying flag post-processing to `data`.
    ///
    /// With [`CaptureFlag::Str`] the payload is cut at the first zero byte;
    /// if there is none it is kept whole and
    /// [`CaptureInfo::UnterminatedStr`] is recorded.
    pub fn build_memory(
        start: Operand,
        length: Operand,
        mut data: Vec<u8>,
        comment: Option<String>,
        flags: BTreeSet<CaptureFlag>,
    ) -> Self {
        let mut info = BTreeSet::new();
        if flags.contains(&CaptureFlag::Str) {
            match data.iter().position(|&b| b == 0) {
                Some(end) => data.truncate(end),
                None => {
                    info.insert(CaptureInfo::UnterminatedStr);
                }
            }
        }

        CaptureRecord::Mem(MemoryCapture {
            start,
            length,
            data,
            comment,
            flags,
            info,
            ts: 0.0,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CaptureRecord::Val(_) => "val",
            CaptureRecord::Mem(_) => "mem",
        }
    }

    pub fn timestamp(&self) -> f64 {
        match self {
            CaptureRecord::Val(v) => v.ts,
            CaptureRecord::Mem(m) => m.ts,
        }
    }

    pub(crate) fn set_timestamp(&mut self, ts: f64) {
        match self {
            CaptureRecord::Val(v) => v.ts = ts,
            CaptureRecord::Mem(m) => m.ts = ts,
        }
    }
}

fn sorted_labels<S: Serializer>(mut labels: Vec<&'static str>, serializer: S) -> Result<S::Ok, S::Error> {
    labels.sort_unstable();
    labels.serialize(serializer)
}

fn sorted_flags<S: Serializer>(flags: &BTreeSet<CaptureFlag>, serializer: S) -> Result<S::Ok, S::Error> {
    sorted_labels(flags.iter().map(|f| f.label()).collect(), serializer)
}

fn sorted_info<S: Serializer>(info: &BTreeSet<CaptureInfo>, serializer: S) -> Result<S::Ok, S::Error> {
    sorted_labels(info.iter().map(|i| i.label()).collect(), serializer)
}

/// `i128` restricted to `i64::MIN..=u64::MAX`, encoded as a JSON `i64`
/// or `u64` so it survives buffering inside the tagged record enum.
mod wide_int {
    use serde::{de, ser, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &i128, serializer: S) -> Result<S::Ok, S::Error> {
        if let Ok(v) = i64::try_from(*value) {
            serializer.serialize_i64(v)
        } else if let Ok(v) = u64::try_from(*value) {
            serializer.serialize_u64(v)
        } else {
            Err(ser::Error::custom(format!("{} does not fit in 64 bits", value)))
        }
    }

    struct WideIntVisitor;

    impl<'de> de::Visitor<'de> for WideIntVisitor {
        type Value = i128;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a 64-bit signed or unsigned integer")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i128, E> {
            Ok(i128::from(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i128, E> {
            Ok(i128::from(v))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i128, D::Error> {
        deserializer.deserialize_any(WideIntVisitor)
    }
}

/// Standard alphabet, padded, no line wrapping.
mod base64_payload {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn str_flags() -> BTreeSet<CaptureFlag> {
        BTreeSet::from([CaptureFlag::Str])
    }

    fn mem(data: &[u8], flags: BTreeSet<CaptureFlag>) -> MemoryCapture {
        let record = CaptureRecord::build_memory(
            Operand::new("buf", 0x1000),
            Operand::new("8", 8),
            data.to_vec(),
            None,
            flags,
        );
        match record {
            CaptureRecord::Mem(m) => m,
            other => panic!("expected mem record, got {:?}", other),
        }
    }

    #[test]
    fn test_str_flag_truncates_at_zero() {
        let m = mem(b"hi\x00junk", str_flags());
        assert_eq!(m.data, b"hi");
        assert!(m.info.is_empty());
    }

    #[test]
    fn test_str_flag_without_terminator() {
        let m = mem(b"hi", str_flags());
        assert_eq!(m.data, b"hi");
        assert_eq!(m.info, BTreeSet::from([CaptureInfo::UnterminatedStr]));
    }

    #[test]
    fn test_no_flags_keeps_zero_bytes() {
        let m = mem(b"a\x00b", BTreeSet::new());
        assert_eq!(m.data, b"a\x00b");
        assert!(m.info.is_empty());
    }

    #[test]
    fn test_value_record_json_shape() {
        let mut record = CaptureRecord::build_value(Operand::new("counter", 26));
        record.set_timestamp(12.5);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"type": "val", "expr": {"sym": "counter", "value": 26}, "ts": 12.5})
        );
    }

    #[test]
    fn test_memory_record_json_shape() {
        let record = CaptureRecord::build_memory(
            Operand::new("buf", 4096),
            Operand::new("0x10", 16),
            b"hi".to_vec(),
            Some("greeting".into()),
            str_flags(),
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "mem");
        assert_eq!(value["start"], json!({"sym": "buf", "value": 4096}));
        assert_eq!(value["length"], json!({"sym": "0x10", "value": 16}));
        assert_eq!(value["data"], "aGk=");
        assert_eq!(value["comment"], "greeting");
        assert_eq!(value["flags"], json!(["str"]));
        assert_eq!(value["info"], json!(["unterminated_str"]));
        assert!(value["ts"].is_f64());
    }

    #[test]
    fn test_memory_record_omits_empty_optionals() {
        let record = CaptureRecord::Mem(mem(b"\x00\x01", BTreeSet::new()));
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("comment"));
        assert!(!object.contains_key("flags"));
        assert!(!object.contains_key("info"));
        assert_eq!(object["data"], Value::from("AAE="));
    }

    #[test]
    fn test_decode_from_json() {
        let text = r#"{"type":"mem","start":{"sym":"p","value":1},"length":{"sym":"3","value":3},
                       "data":"AP8A","flags":["str"],"ts":3.0}"#;
        let record: CaptureRecord = serde_json::from_str(text).unwrap();
        match record {
            CaptureRecord::Mem(m) => {
                assert_eq!(m.data, vec![0x00, 0xff, 0x00]);
                assert_eq!(m.flags, str_flags());
                assert!(m.info.is_empty());
                assert_eq!(m.comment, None);
            }
            other => panic!("expected mem record, got {:?}", other),
        }
    }

    #[test]
    fn test_operand_values_span_signed_and_unsigned() {
        let low = Operand::new("delta", -10);
        let high = Operand::new("kernel", 0xffff_ffff_8100_0000u64);
        assert_eq!(serde_json::to_value(&low).unwrap(), json!({"sym": "delta", "value": -10}));
        assert_eq!(
            serde_json::to_value(&high).unwrap(),
            json!({"sym": "kernel", "value": 0xffff_ffff_8100_0000u64})
        );

        let text = r#"{"type":"val","expr":{"sym":"x","value":-10},"ts":1.0}"#;
        match serde_json::from_str::<CaptureRecord>(text).unwrap() {
            CaptureRecord::Val(val) => assert_eq!(val.expr, Operand::new("x", -10)),
            other => panic!("expected val record, got {:?}", other),
        }

        let text = r#"{"type":"val","expr":{"sym":"x","value":18446744073709551615},"ts":1.0}"#;
        match serde_json::from_str::<CaptureRecord>(text).unwrap() {
            CaptureRecord::Val(val) => assert_eq!(val.expr.value, i128::from(u64::MAX)),
            other => panic!("expected val record, got {:?}", other),
        }
    }

    #[test]
    fn test_operand_value_rejects_non_integers() {
        let text = r#"{"type":"val","expr":{"sym":"x","value":1.5},"ts":1.0}"#;
        assert!(serde_json::from_str::<CaptureRecord>(text).is_err());
        assert!(serde_json::to_value(Operand::new("x", i128::MAX)).is_err());
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let text = r#"{"type":"mem","start":{"sym":"p","value":1},"length":{"sym":"1","value":1},
                       "data":"not base64!","ts":1.0}"#;
        assert!(serde_json::from_str::<CaptureRecord>(text).is_err());
    }

    #[test]
    fn test_flag_labels() {
        assert_eq!(CaptureFlag::from_label("str"), Some(CaptureFlag::Str));
        assert_eq!(CaptureFlag::from_label("utf16"), None);
    }
}
