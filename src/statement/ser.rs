use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::ser::{
    Impossible, Serialize, SerializeMap, SerializeSeq, SerializeStruct, SerializeStructVariant,
    SerializeTuple, SerializeTupleStruct, SerializeTupleVariant, Serializer,
};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use crate::error::SpannerMiddlewareError;
use crate::types::{RowValues, TIMESTAMP_FORMAT, TIMESTAMP_NEWTYPE};

type Params = IndexMap<String, RowValues>;
type Error = SpannerMiddlewareError;

fn rejected(msg: impl Into<String>) -> Error {
    SpannerMiddlewareError::ParameterError(msg.into())
}

fn not_structured(kind: &str) -> Error {
    rejected(format!(
        "structured argument must be a map or record, got {kind}"
    ))
}

/// Top-level serializer for structured arguments: accepts maps and records only.
pub(super) struct ParamsSerializer;

macro_rules! reject_params {
    ($($method:ident($($arg:ty),*) => $kind:literal;)*) => {
        $(
            fn $method(self $(, _: $arg)*) -> Result<Params, Error> {
                Err(not_structured($kind))
            }
        )*
    };
}

impl Serializer for ParamsSerializer {
    type Ok = Params;
    type Error = Error;
    type SerializeSeq = Impossible<Params, Error>;
    type SerializeTuple = Impossible<Params, Error>;
    type SerializeTupleStruct = Impossible<Params, Error>;
    type SerializeTupleVariant = Impossible<Params, Error>;
    type SerializeMap = ParamsMap;
    type SerializeStruct = ParamsMap;
    type SerializeStructVariant = Impossible<Params, Error>;

    reject_params! {
        serialize_bool(bool) => "a boolean";
        serialize_i8(i8) => "a number";
        serialize_i16(i16) => "a number";
        serialize_i32(i32) => "a number";
        serialize_i64(i64) => "a number";
        serialize_u8(u8) => "a number";
        serialize_u16(u16) => "a number";
        serialize_u32(u32) => "a number";
        serialize_u64(u64) => "a number";
        serialize_f32(f32) => "a number";
        serialize_f64(f64) => "a number";
        serialize_char(char) => "a string";
        serialize_str(&str) => "a string";
        serialize_bytes(&[u8]) => "bytes";
        serialize_none() => "null";
        serialize_unit() => "a unit";
        serialize_unit_struct(&'static str) => "a unit";
        serialize_unit_variant(&'static str, u32, &'static str) => "an enum variant";
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Params, Error> {
        value.serialize(self)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Params, Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Params, Error> {
        Err(not_structured("an enum variant"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Error> {
        Err(not_structured("a sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Error> {
        Err(not_structured("a sequence"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Error> {
        Err(not_structured("a sequence"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Error> {
        Err(not_structured("an enum variant"))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<ParamsMap, Error> {
        Ok(ParamsMap::new(len.unwrap_or(0)))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<ParamsMap, Error> {
        Ok(ParamsMap::new(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Error> {
        Err(not_structured("an enum variant"))
    }
}

pub(super) struct ParamsMap {
    params: Params,
    key: Option<String>,
}

impl ParamsMap {
    fn new(len: usize) -> Self {
        Self {
            params: IndexMap::with_capacity(len),
            key: None,
        }
    }
}

impl SerializeMap for ParamsMap {
    type Ok = Params;
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), Error> {
        self.key = Some(key_string(key)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        let key = self
            .key
            .take()
            .ok_or_else(|| rejected("map value serialized before its key"))?;
        self.params.insert(key, value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Params, Error> {
        Ok(self.params)
    }
}

impl SerializeStruct for ParamsMap {
    type Ok = Params;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        self.params
            .insert(key.to_string(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Params, Error> {
        Ok(self.params)
    }
}

fn key_string<T: ?Sized + Serialize>(key: &T) -> Result<String, Error> {
    match key.serialize(ValueSerializer)? {
        RowValues::Text(name) => Ok(name),
        RowValues::Int(i) => Ok(i.to_string()),
        RowValues::Bool(b) => Ok(b.to_string()),
        other => Err(rejected(format!(
            "parameter names must be strings, got {other}"
        ))),
    }
}

/// Serializes one parameter value into the closest `RowValues` variant.
///
/// Values without a lossless mapping are rejected: integers outside `i64` and
/// non-finite floats. Sequences, nested maps and data-carrying enum variants
/// become `JSON`.
pub(super) struct ValueSerializer;

impl ValueSerializer {
    fn int<I: TryInto<i64> + std::fmt::Display + Copy>(v: I) -> Result<RowValues, Error> {
        v.try_into().map(RowValues::Int).map_err(|_| {
            rejected(format!("{v} does not fit a 64-bit signed integer"))
        })
    }
}

impl Serializer for ValueSerializer {
    type Ok = RowValues;
    type Error = Error;
    type SerializeSeq = JsonSeq;
    type SerializeTuple = JsonSeq;
    type SerializeTupleStruct = JsonSeq;
    type SerializeTupleVariant = JsonSeq;
    type SerializeMap = JsonObject;
    type SerializeStruct = JsonObject;
    type SerializeStructVariant = JsonObject;

    fn serialize_bool(self, v: bool) -> Result<RowValues, Error> {
        Ok(RowValues::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<RowValues, Error> {
        Ok(RowValues::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<RowValues, Error> {
        Ok(RowValues::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<RowValues, Error> {
        Ok(RowValues::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<RowValues, Error> {
        Ok(RowValues::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<RowValues, Error> {
        Self::int(v)
    }

    fn serialize_u8(self, v: u8) -> Result<RowValues, Error> {
        Ok(RowValues::Int(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<RowValues, Error> {
        Ok(RowValues::Int(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<RowValues, Error> {
        Ok(RowValues::Int(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<RowValues, Error> {
        Self::int(v)
    }

    fn serialize_u128(self, v: u128) -> Result<RowValues, Error> {
        Self::int(v)
    }

    fn serialize_f32(self, v: f32) -> Result<RowValues, Error> {
        self.serialize_f64(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<RowValues, Error> {
        if v.is_finite() {
            Ok(RowValues::Float(v))
        } else {
            Err(rejected(format!("{v} is not a finite number")))
        }
    }

    fn serialize_char(self, v: char) -> Result<RowValues, Error> {
        Ok(RowValues::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<RowValues, Error> {
        Ok(RowValues::Text(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<RowValues, Error> {
        Ok(RowValues::Blob(v.to_vec()))
    }

    fn serialize_none(self) -> Result<RowValues, Error> {
        Ok(RowValues::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<RowValues, Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<RowValues, Error> {
        Ok(RowValues::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<RowValues, Error> {
        Ok(RowValues::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<RowValues, Error> {
        Ok(RowValues::Text(variant.to_owned()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<RowValues, Error> {
        let inner = value.serialize(self)?;
        if name != TIMESTAMP_NEWTYPE {
            return Ok(inner);
        }
        match inner {
            RowValues::Text(text) => NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT)
                .map(RowValues::Timestamp)
                .map_err(|err| rejected(format!("invalid timestamp {text}: {err}"))),
            other => Ok(other),
        }
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<RowValues, Error> {
        let inner = into_json(value.serialize(self)?)?;
        Ok(RowValues::JSON(tagged(Some(variant), inner)))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<JsonSeq, Error> {
        Ok(JsonSeq::new(len.unwrap_or(0), None))
    }

    fn serialize_tuple(self, len: usize) -> Result<JsonSeq, Error> {
        Ok(JsonSeq::new(len, None))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<JsonSeq, Error> {
        Ok(JsonSeq::new(len, None))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<JsonSeq, Error> {
        Ok(JsonSeq::new(len, Some(variant)))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<JsonObject, Error> {
        Ok(JsonObject::new(None))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<JsonObject, Error> {
        Ok(JsonObject::new(None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<JsonObject, Error> {
        Ok(JsonObject::new(Some(variant)))
    }
}

fn into_json(value: RowValues) -> Result<JsonValue, Error> {
    Ok(match value {
        RowValues::Int(i) => JsonValue::from(i),
        RowValues::Float(f) => Number::from_f64(f)
            .map(JsonValue::Number)
            .ok_or_else(|| rejected(format!("{f} is not a finite number")))?,
        RowValues::Text(s) => JsonValue::String(s),
        RowValues::Bool(b) => JsonValue::Bool(b),
        RowValues::Timestamp(ts) => JsonValue::String(ts.format(TIMESTAMP_FORMAT).to_string()),
        RowValues::Null => JsonValue::Null,
        RowValues::JSON(v) => v,
        RowValues::Blob(bytes) => JsonValue::Array(bytes.into_iter().map(JsonValue::from).collect()),
    })
}

fn tagged(variant: Option<&'static str>, value: JsonValue) -> JsonValue {
    match variant {
        Some(variant) => {
            let mut object = JsonMap::with_capacity(1);
            object.insert(variant.to_owned(), value);
            JsonValue::Object(object)
        }
        None => value,
    }
}

/// Sequence or tuple collected as a JSON array.
pub(super) struct JsonSeq {
    items: Vec<JsonValue>,
    variant: Option<&'static str>,
}

impl JsonSeq {
    fn new(len: usize, variant: Option<&'static str>) -> Self {
        Self {
            items: Vec::with_capacity(len),
            variant,
        }
    }

    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.items.push(into_json(value.serialize(ValueSerializer)?)?);
        Ok(())
    }

    fn finish(self) -> RowValues {
        RowValues::JSON(tagged(self.variant, JsonValue::Array(self.items)))
    }
}

impl SerializeSeq for JsonSeq {
    type Ok = RowValues;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.push(value)
    }

    fn end(self) -> Result<RowValues, Error> {
        Ok(self.finish())
    }
}

impl SerializeTuple for JsonSeq {
    type Ok = RowValues;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.push(value)
    }

    fn end(self) -> Result<RowValues, Error> {
        Ok(self.finish())
    }
}

impl SerializeTupleStruct for JsonSeq {
    type Ok = RowValues;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.push(value)
    }

    fn end(self) -> Result<RowValues, Error> {
        Ok(self.finish())
    }
}

impl SerializeTupleVariant for JsonSeq {
    type Ok = RowValues;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.push(value)
    }

    fn end(self) -> Result<RowValues, Error> {
        Ok(self.finish())
    }
}

/// Nested map or record collected as a JSON object.
pub(super) struct JsonObject {
    object: JsonMap<String, JsonValue>,
    key: Option<String>,
    variant: Option<&'static str>,
}

impl JsonObject {
    fn new(variant: Option<&'static str>) -> Self {
        Self {
            object: JsonMap::new(),
            key: None,
            variant,
        }
    }

    fn insert<T: ?Sized + Serialize>(&mut self, key: String, value: &T) -> Result<(), Error> {
        let value = into_json(value.serialize(ValueSerializer)?)?;
        self.object.insert(key, value);
        Ok(())
    }

    fn finish(self) -> RowValues {
        RowValues::JSON(tagged(self.variant, JsonValue::Object(self.object)))
    }
}

impl SerializeMap for JsonObject {
    type Ok = RowValues;
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), Error> {
        self.key = Some(key_string(key)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        let key = self
            .key
            .take()
            .ok_or_else(|| rejected("map value serialized before its key"))?;
        self.insert(key, value)
    }

    fn end(self) -> Result<RowValues, Error> {
        Ok(self.finish())
    }
}

impl SerializeStruct for JsonObject {
    type Ok = RowValues;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        self.insert(key.to_owned(), value)
    }

    fn end(self) -> Result<RowValues, Error> {
        Ok(self.finish())
    }
}

impl SerializeStructVariant for JsonObject {
    type Ok = RowValues;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        self.insert(key.to_owned(), value)
    }

    fn end(self) -> Result<RowValues, Error> {
        Ok(self.finish())
    }
}
