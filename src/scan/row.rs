use serde::de::{
    DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, SeqAccess, Visitor,
};

use super::value::ValueDeserializer;
use crate::error::SpannerMiddlewareError;
use crate::results::CustomDbRow;

/// Deserializer over a whole row.
///
/// The destination type decides how the row is read: records by column name,
/// maps with every column, tuples and sequences by position, scalars from the only
/// column.
pub(crate) struct RowDeserializer<'r> {
    row: &'r CustomDbRow,
}

impl<'r> RowDeserializer<'r> {
    pub(crate) fn new(row: &'r CustomDbRow) -> Self {
        Self { row }
    }

    fn single_column(&self) -> Result<ValueDeserializer<'r>, SpannerMiddlewareError> {
        self.expect_columns(1)?;
        Ok(ValueDeserializer::new(&self.row.rows[0]))
    }

    fn expect_columns(&self, expected: usize) -> Result<(), SpannerMiddlewareError> {
        let found = self.row.column_count();
        if found == expected {
            Ok(())
        } else {
            Err(SpannerMiddlewareError::ColumnCountMismatch { expected, found })
        }
    }

    fn invalid(what: &str) -> SpannerMiddlewareError {
        SpannerMiddlewareError::InvalidDestination(format!("{what} cannot receive row data"))
    }
}

macro_rules! forward_to_single_column {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                self.single_column()?.$method(visitor)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for RowDeserializer<'_> {
    type Error = SpannerMiddlewareError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_map(ColumnAccess::new(self.row, None))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_map(ColumnAccess::new(self.row, Some(fields)))
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_seq(ColumnSeq::new(self.row))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.expect_columns(len)?;
        visitor.visit_seq(ColumnSeq::new(self.row))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        // Only a one-column NULL row reads as `None`.
        if self.row.column_count() == 1 && self.row.rows[0].is_null() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.single_column()?
            .deserialize_enum(name, variants, visitor)
    }

    fn deserialize_unit<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(Self::invalid("unit type"))
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(Self::invalid(&format!("unit struct `{name}`")))
    }

    fn deserialize_identifier<V: Visitor<'de>>(
        self,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(Self::invalid("identifier"))
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    forward_to_single_column! {
        deserialize_bool
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 deserialize_i128
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 deserialize_u128
        deserialize_f32 deserialize_f64 deserialize_char
        deserialize_str deserialize_string deserialize_bytes deserialize_byte_buf
    }
}

/// Columns as map entries, keyed by column name.
///
/// For records the key is the declared field that matches the column name, exactly
/// or ignoring ASCII case.
struct ColumnAccess<'r> {
    row: &'r CustomDbRow,
    fields: Option<&'static [&'static str]>,
    next: usize,
}

impl<'r> ColumnAccess<'r> {
    fn new(row: &'r CustomDbRow, fields: Option<&'static [&'static str]>) -> Self {
        Self {
            row,
            fields,
            next: 0,
        }
    }

    fn len(&self) -> usize {
        self.row.column_names.len().min(self.row.rows.len())
    }

    fn key_for(&self, column: &'r str) -> &'r str {
        let Some(fields) = self.fields else {
            return column;
        };
        if fields.iter().any(|field| *field == column) {
            return column;
        }
        let matched: Option<&'r str> = fields
            .iter()
            .copied()
            .find(|field| field.eq_ignore_ascii_case(column));
        matched.unwrap_or(column)
    }
}

impl<'de> MapAccess<'de> for ColumnAccess<'_> {
    type Error = SpannerMiddlewareError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        if self.next >= self.len() {
            return Ok(None);
        }
        let key = self.key_for(&self.row.column_names[self.next]);
        seed.deserialize(key.into_deserializer()).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        let idx = self.next;
        let value = self.row.rows.get(idx).ok_or_else(|| {
            SpannerMiddlewareError::RowMapping(format!("no value for column {idx}"))
        })?;
        self.next += 1;
        seed.deserialize(ValueDeserializer::new(value))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.len().saturating_sub(self.next))
    }
}

/// Columns as a sequence, in row order.
struct ColumnSeq<'r> {
    row: &'r CustomDbRow,
    next: usize,
}

impl<'r> ColumnSeq<'r> {
    fn new(row: &'r CustomDbRow) -> Self {
        Self { row, next: 0 }
    }
}

impl<'de> SeqAccess<'de> for ColumnSeq<'_> {
    type Error = SpannerMiddlewareError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        let Some(value) = self.row.rows.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        seed.deserialize(ValueDeserializer::new(value)).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.row.rows.len().saturating_sub(self.next))
    }
}
