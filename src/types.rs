use std::fmt;

use chrono::NaiveDateTime;
use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, Serializer};
use serde_json::Value as JsonValue;

/// Text layout used when a timestamp has to travel as a string.
///
/// Matches what `chrono` accepts when deserializing a `NaiveDateTime`.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Newtype name wrapped around serialized timestamps so the parameter binder can
/// tell them apart from text. Formats such as JSON see only the inner string.
pub(crate) const TIMESTAMP_NEWTYPE: &str = "$spanner_middleware::Timestamp";

/// Values that can be stored in a database row or used as query parameters.
///
/// The same enum is used for bound statement parameters and for the columns of
/// returned rows:
/// ```rust
/// use spanner_middleware::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S.%3f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Map a JSON value onto the closest scalar variant.
    ///
    /// Integers that fit in `i64` become `Int`, other numbers `Float`; arrays and
    /// objects stay wrapped as `JSON`.
    #[must_use]
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => RowValues::Null,
            JsonValue::Bool(b) => RowValues::Bool(b),
            JsonValue::String(s) => RowValues::Text(s),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => RowValues::Int(i),
                None => n.as_f64().map_or(RowValues::Null, RowValues::Float),
            },
            other @ (JsonValue::Array(_) | JsonValue::Object(_)) => RowValues::JSON(other),
        }
    }
}

impl fmt::Display for RowValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValues::Int(i) => write!(f, "{i}"),
            RowValues::Float(v) => write!(f, "{v}"),
            RowValues::Text(s) => write!(f, "{s:?}"),
            RowValues::Bool(b) => write!(f, "{b}"),
            RowValues::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            RowValues::Null => f.write_str("NULL"),
            RowValues::JSON(v) => write!(f, "{v}"),
            RowValues::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

macro_rules! impl_from_for_row_values {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for RowValues {
                fn from(value: $ty) -> Self {
                    RowValues::$variant(value.into())
                }
            }
        )*
    };
}

impl_from_for_row_values! {
    i64 => Int,
    i32 => Int,
    i16 => Int,
    u32 => Int,
    f64 => Float,
    f32 => Float,
    bool => Bool,
    String => Text,
    &str => Text,
    NaiveDateTime => Timestamp,
    Vec<u8> => Blob,
    JsonValue => JSON,
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

impl Serialize for RowValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RowValues::Int(i) => serializer.serialize_i64(*i),
            RowValues::Float(v) => serializer.serialize_f64(*v),
            RowValues::Text(s) => serializer.serialize_str(s),
            RowValues::Bool(b) => serializer.serialize_bool(*b),
            RowValues::Timestamp(ts) => serializer.serialize_newtype_struct(
                TIMESTAMP_NEWTYPE,
                &ts.format(TIMESTAMP_FORMAT).to_string(),
            ),
            RowValues::Null => serializer.serialize_none(),
            RowValues::JSON(v) => v.serialize(serializer),
            RowValues::Blob(bytes) => serializer.serialize_bytes(bytes),
        }
    }
}

struct RowValuesVisitor;

impl<'de> Visitor<'de> for RowValuesVisitor {
    type Value = RowValues;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a column value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<RowValues, E> {
        Ok(RowValues::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RowValues, E> {
        Ok(RowValues::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RowValues, E> {
        // u64 values beyond i64::MAX only survive as floats
        #[allow(clippy::cast_precision_loss)]
        let as_float = v as f64;
        Ok(i64::try_from(v).map_or(RowValues::Float(as_float), RowValues::Int))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RowValues, E> {
        Ok(RowValues::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RowValues, E> {
        Ok(RowValues::Text(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<RowValues, E> {
        Ok(RowValues::Text(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<RowValues, E> {
        Ok(RowValues::Blob(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<RowValues, E> {
        Ok(RowValues::Blob(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<RowValues, E> {
        Ok(RowValues::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<RowValues, E> {
        Ok(RowValues::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<RowValues, D::Error> {
        RowValues::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<RowValues, A::Error> {
        JsonValue::deserialize(SeqAccessDeserializer::new(seq)).map(RowValues::JSON)
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<RowValues, A::Error> {
        JsonValue::deserialize(MapAccessDeserializer::new(map)).map(RowValues::JSON)
    }
}

impl<'de> Deserialize<'de> for RowValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RowValuesVisitor)
    }
}
