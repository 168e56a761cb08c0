use serde::de::value::SeqDeserializer;
use serde::de::{self, Deserializer, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;

use crate::error::SpannerMiddlewareError;
use crate::types::{RowValues, TIMESTAMP_FORMAT};

/// Deserializer over a single column value.
pub(crate) struct ValueDeserializer<'v> {
    value: &'v RowValues,
}

impl<'v> ValueDeserializer<'v> {
    pub(crate) fn new(value: &'v RowValues) -> Self {
        Self { value }
    }
}

impl<'de> Deserializer<'de> for ValueDeserializer<'_> {
    type Error = SpannerMiddlewareError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            RowValues::Int(i) => visitor.visit_i64(*i),
            RowValues::Float(f) => visitor.visit_f64(*f),
            RowValues::Text(s) => visitor.visit_str(s),
            RowValues::Bool(b) => visitor.visit_bool(*b),
            RowValues::Timestamp(ts) => visitor.visit_string(ts.format(TIMESTAMP_FORMAT).to_string()),
            RowValues::Null => visitor.visit_unit(),
            RowValues::JSON(v) => v.clone().deserialize_any(visitor).map_err(Into::into),
            RowValues::Blob(bytes) => visitor.visit_bytes(bytes),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            RowValues::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value.as_bool() {
            Some(b) => visitor.visit_bool(*b),
            None => self.deserialize_any(visitor),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            RowValues::Blob(bytes) => {
                SeqDeserializer::<_, SpannerMiddlewareError>::new(bytes.iter().copied())
                    .deserialize_any(visitor)
            }
            RowValues::JSON(v) => v.clone().deserialize_seq(visitor).map_err(Into::into),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            RowValues::JSON(v) => v.clone().deserialize_map(visitor).map_err(Into::into),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.value {
            RowValues::JSON(v) => v
                .clone()
                .deserialize_struct(name, fields, visitor)
                .map_err(Into::into),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.value {
            RowValues::Text(s) => visitor.visit_enum(s.as_str().into_deserializer()),
            RowValues::JSON(v) => v
                .clone()
                .deserialize_enum(name, variants, visitor)
                .map_err(Into::into),
            other => Err(de::Error::invalid_type(unexpected(other), &visitor)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    forward_to_deserialize_any! {
        i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct tuple tuple_struct identifier ignored_any
    }
}

fn unexpected(value: &RowValues) -> de::Unexpected<'_> {
    match value {
        RowValues::Int(i) => de::Unexpected::Signed(*i),
        RowValues::Float(f) => de::Unexpected::Float(*f),
        RowValues::Text(s) => de::Unexpected::Str(s),
        RowValues::Bool(b) => de::Unexpected::Bool(*b),
        RowValues::Timestamp(_) => de::Unexpected::Other("timestamp"),
        RowValues::Null => de::Unexpected::Unit,
        RowValues::JSON(_) => de::Unexpected::Other("JSON value"),
        RowValues::Blob(bytes) => de::Unexpected::Bytes(bytes),
    }
}
