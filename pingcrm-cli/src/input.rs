//! Turns `--set field=value` arguments into create and update inputs.

use crate::CliError;
use serde::{
    de::{
        value::{Error, MapDeserializer},
        DeserializeOwned, Error as _, IntoDeserializer, Unexpected, Visitor
    },
    forward_to_deserialize_any, Deserializer
};

/// Parse a single `field=value` argument.
pub fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    let (field, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got {:?}", arg))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in {:?}", arg));
    }
    Ok((field.replace('-', "_"), value.to_string()))
}

/// Build an input from assignments. Each value is read as whatever the target field expects,
/// so `true` is a boolean for `owner` but stays text for `first_name`.
pub fn from_assignments<T: DeserializeOwned>(
    assignments: &[(String, String)]
) -> Result<T, CliError> {
    let fields = assignments
        .iter()
        .map(|(field, value)| (field.as_str(), Text(value.as_str())));
    T::deserialize(MapDeserializer::<_, Error>::new(fields))
        .map_err(|e| CliError::Input(e.to_string()))
}

/// A command line value that hasn't been given a type yet.
struct Text<'a>(&'a str);

impl<'de, 'a> IntoDeserializer<'de, Error> for Text<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de, 'a> Deserializer<'de> for Text<'a> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_str(self.0)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            "true" => visitor.visit_bool(true),
            "false" => visitor.visit_bool(false),
            other => Err(Error::invalid_value(Unexpected::Str(other), &visitor))
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_some(self)
    }

    forward_to_deserialize_any! {
        i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}
