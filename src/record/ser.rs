//! [`serde::Serializer`]s walking a [`Record`] into its name and [`Labels`].
//!
//! [`Record`]: super::Record

use serde::ser::{self, Impossible, Serialize};

use crate::error::IntrospectionError;

use super::Labels;

/// Name and [`Labels`] of a serialized [`Record`].
///
/// [`Record`]: super::Record
#[derive(Debug)]
pub(super) struct Shape {
    pub(super) name: &'static str,
    pub(super) labels: Labels,
}

/// Generates [`ser::Serializer`] methods rejecting the value they receive.
macro_rules! reject {
    ($($method:ident($($ty:ty)?) -> $ok:ty => $found:literal,)*) => {$(
        fn $method(self $(, _: $ty)?) -> Result<$ok, Self::Error> {
            Err(self.reject($found))
        }
    )*};
}

/// [`ser::Serializer`] accepting only structs with named fields, whose values
/// are serialized with a [`LabelValue`].
pub(super) struct RecordSerializer;

impl RecordSerializer {
    #[allow(clippy::unused_self)] // for uniformity with `LabelValue`
    const fn reject(&self, found: &'static str) -> IntrospectionError {
        IntrospectionError::NotAStruct(found)
    }
}

impl ser::Serializer for RecordSerializer {
    type Ok = Shape;
    type Error = IntrospectionError;

    type SerializeSeq = Impossible<Shape, IntrospectionError>;
    type SerializeTuple = Impossible<Shape, IntrospectionError>;
    type SerializeTupleStruct = Impossible<Shape, IntrospectionError>;
    type SerializeTupleVariant = Impossible<Shape, IntrospectionError>;
    type SerializeMap = Impossible<Shape, IntrospectionError>;
    type SerializeStruct = Fields;
    type SerializeStructVariant = Impossible<Shape, IntrospectionError>;

    reject! {
        serialize_bool(bool) -> Shape => "a boolean",
        serialize_i8(i8) -> Shape => "a number",
        serialize_i16(i16) -> Shape => "a number",
        serialize_i32(i32) -> Shape => "a number",
        serialize_i64(i64) -> Shape => "a number",
        serialize_i128(i128) -> Shape => "a number",
        serialize_u8(u8) -> Shape => "a number",
        serialize_u16(u16) -> Shape => "a number",
        serialize_u32(u32) -> Shape => "a number",
        serialize_u64(u64) -> Shape => "a number",
        serialize_u128(u128) -> Shape => "a number",
        serialize_f32(f32) -> Shape => "a number",
        serialize_f64(f64) -> Shape => "a number",
        serialize_char(char) -> Shape => "a char",
        serialize_str(&str) -> Shape => "a string",
        serialize_bytes(&[u8]) -> Shape => "bytes",
        serialize_none() -> Shape => "an option",
        serialize_unit() -> Shape => "a unit",
        serialize_seq(Option<usize>) -> Self::SerializeSeq => "a sequence",
        serialize_tuple(usize) -> Self::SerializeTuple => "a tuple",
        serialize_map(Option<usize>) -> Self::SerializeMap => "a map",
    }

    fn serialize_some<T>(self, _: &T) -> Result<Shape, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        Err(self.reject("an option"))
    }

    fn serialize_unit_struct(
        self,
        name: &'static str,
    ) -> Result<Shape, Self::Error> {
        Ok(Shape { name, labels: Labels::default() })
    }

    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
    ) -> Result<Shape, Self::Error> {
        Err(self.reject("an enum"))
    }

    fn serialize_newtype_struct<T>(
        self,
        _: &'static str,
        _: &T,
    ) -> Result<Shape, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        Err(self.reject("a newtype struct"))
    }

    fn serialize_newtype_variant<T>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<Shape, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        Err(self.reject("an enum"))
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Err(self.reject("a tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(self.reject("an enum"))
    }

    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Fields, Self::Error> {
        Ok(Fields { name, labels: Labels::with_capacity(len) })
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(self.reject("an enum"))
    }
}

/// Fields of a [`Record`] being collected into [`Labels`].
///
/// [`Record`]: super::Record
pub(super) struct Fields {
    name: &'static str,
    labels: Labels,
}

impl ser::SerializeStruct for Fields {
    type Ok = Shape;
    type Error = IntrospectionError;

    fn serialize_field<T>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let value = value.serialize(LabelValue { field: key })?;
        self.labels.push(key, value);
        Ok(())
    }

    fn end(self) -> Result<Shape, Self::Error> {
        Ok(Shape { name: self.name, labels: self.labels })
    }
}

/// [`ser::Serializer`] rendering a scalar field value as a label value.
struct LabelValue {
    /// Name of the field being rendered.
    field: &'static str,
}

impl LabelValue {
    const fn reject(&self, found: &'static str) -> IntrospectionError {
        IntrospectionError::NonScalarLabel { field: self.field, found }
    }
}

impl ser::Serializer for LabelValue {
    type Ok = String;
    type Error = IntrospectionError;

    type SerializeSeq = Impossible<String, IntrospectionError>;
    type SerializeTuple = Impossible<String, IntrospectionError>;
    type SerializeTupleStruct = Impossible<String, IntrospectionError>;
    type SerializeTupleVariant = Impossible<String, IntrospectionError>;
    type SerializeMap = Impossible<String, IntrospectionError>;
    type SerializeStruct = Impossible<String, IntrospectionError>;
    type SerializeStructVariant = Impossible<String, IntrospectionError>;

    reject! {
        serialize_bytes(&[u8]) -> String => "bytes",
        serialize_unit() -> String => "a unit",
        serialize_seq(Option<usize>) -> Self::SerializeSeq => "a sequence",
        serialize_tuple(usize) -> Self::SerializeTuple => "a tuple",
        serialize_map(Option<usize>) -> Self::SerializeMap => "a map",
    }

    fn serialize_bool(self, v: bool) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_i128(self, v: i128) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_u128(self, v: u128) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, v: f32) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_f64(self, v: f64) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String, Self::Error> {
        Ok(v.to_owned())
    }

    fn serialize_none(self) -> Result<String, Self::Error> {
        Ok(String::new())
    }

    fn serialize_some<T>(self, value: &T) -> Result<String, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit_struct(
        self,
        _: &'static str,
    ) -> Result<String, Self::Error> {
        Err(self.reject("a unit struct"))
    }

    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
    ) -> Result<String, Self::Error> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<String, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<String, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        Err(self.reject("an enum variant with data"))
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Err(self.reject("a tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(self.reject("an enum variant with data"))
    }

    fn serialize_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Err(self.reject("a struct"))
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(self.reject("an enum variant with data"))
    }
}
