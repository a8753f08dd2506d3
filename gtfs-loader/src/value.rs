//! Typed values held by entities, and the keys entities are indexed by
use crate::field::EnumDef;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Format of [Value::Date] in feed files
pub const DATE_FORMAT: &str = "%Y%m%d";

/// A member of an integer-backed enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    /// The enumeration this value belongs to
    pub def: &'static EnumDef,
    /// Integer code, as written in the feed
    pub code: i64,
}

impl EnumValue {
    /// Name of the member, `"?"` if the code is not a member
    pub fn name(&self) -> &'static str {
        self.def.name_of(self.code).unwrap_or("?")
    }
}

/// A typed field value
///
/// Null is the value of an absent optional field. It is written back as an empty cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value
    Null,
    /// Text
    Str(String),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Boolean, written as `0` or `1`
    Bool(bool),
    /// Calendar date, written as `YYYYMMDD`
    Date(NaiveDate),
    /// Seconds since local midnight, written as `HH:MM:SS`. May exceed 24 hours.
    Time(u32),
    /// Member of an integer-backed enumeration
    Enum(EnumValue),
    /// Ordered sequence, written as an embedded JSON array in tabular files
    List(Vec<Value>),
    /// Opaque JSON, kept as read
    Json(serde_json::Value),
    /// Nested record of a tree document
    Record(Entity),
}

impl Value {
    /// Is this [Value::Null]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The text of a [Value::Str]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer of a [Value::Int]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The number of a [Value::Float], integers are widened
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The flag of a [Value::Bool]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The date of a [Value::Date]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// The seconds of a [Value::Time]
    pub fn as_time(&self) -> Option<u32> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// The member of a [Value::Enum]
    pub fn as_enum(&self) -> Option<EnumValue> {
        match self {
            Value::Enum(e) => Some(*e),
            _ => None,
        }
    }

    /// The items of a [Value::List]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The entity of a [Value::Record]
    pub fn as_record(&self) -> Option<&Entity> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Builds a value from a JSON literal without any schema
    ///
    /// Used for the items of embedded lists, whose JSON kinds already are the scalar kinds needed
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(_) => Value::Json(json.clone()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

pub(crate) fn format_time(time: u32) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        time / 3600,
        time % 3600 / 60,
        time % 60
    )
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    // integral floats keep a decimal so that they read back as floats
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        write!(f, "{:.1}", v)
    } else {
        write!(f, "{}", v)
    }
}

/// The text of the value in a tabular cell
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write_float(f, *v),
            Value::Bool(b) => write!(f, "{}", u8::from(*b)),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Time(t) => f.write_str(&format_time(*t)),
            Value::Enum(e) => write!(f, "{}", e.code),
            Value::List(_) | Value::Record(_) => {
                let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&text)
            }
            Value::Json(json) => write!(f, "{}", json),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Date(d) => serializer.serialize_str(&d.format(DATE_FORMAT).to_string()),
            Value::Time(t) => serializer.serialize_str(&format_time(*t)),
            Value::Enum(e) => serializer.serialize_i64(e.code),
            Value::List(items) => items.serialize(serializer),
            Value::Json(json) => json.serialize(serializer),
            Value::Record(entity) => entity.serialize(serializer),
        }
    }
}

/// Ordering key of an entity within its collection
///
/// Variants order before one another in declaration order; within a variant the natural order applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Absent key value
    Null,
    /// Integer, boolean, enum or time keys
    Int(i64),
    /// Date keys
    Date(NaiveDate),
    /// Text keys, and the text of any other value
    Str(String),
}

impl From<&Value> for Key {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Key::Null,
            Value::Str(s) => Key::Str(s.clone()),
            Value::Int(i) => Key::Int(*i),
            Value::Bool(b) => Key::Int(i64::from(*b)),
            Value::Enum(e) => Key::Int(e.code),
            Value::Time(t) => Key::Int(i64::from(*t)),
            Value::Date(d) => Key::Date(*d),
            other => Key::Str(other.to_string()),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<NaiveDate> for Key {
    fn from(d: NaiveDate) -> Self {
        Key::Date(d)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Null => Ok(()),
            Key::Int(i) => write!(f, "{}", i),
            Key::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Key::Str(s) => f.write_str(s),
        }
    }
}

/// A typed record: field names mapped to values, in the order of the collection's fields
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entity {
    values: IndexMap<String, Value>,
}

impl Entity {
    /// An entity without any field
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Mutable value of a field
    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.values.get_mut(field)
    }

    /// Sets a field, returning its previous value. New fields are appended.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(field.into(), value)
    }

    /// Does the entity hold this field
    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Field names, in order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Fields and values, in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Has the entity no field at all
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Key built from the value of a field, [Key::Null] if absent
    pub fn key(&self, field: &str) -> Key {
        self.get(field).map(Key::from).unwrap_or(Key::Null)
    }

    /// Text value of a field
    pub fn str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Integer value of a field
    pub fn int(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_int)
    }

    /// Floating point value of a field
    pub fn float(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_float)
    }

    /// Boolean value of a field
    pub fn bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    /// Date value of a field
    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        self.get(field).and_then(Value::as_date)
    }

    /// Time value of a field, in seconds since midnight
    pub fn time(&self, field: &str) -> Option<u32> {
        self.get(field).and_then(Value::as_time)
    }

    /// Enumeration code of a field
    pub fn enum_code(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_enum).map(|e| e.code)
    }
}

impl FromIterator<(String, Value)> for Entity {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Entity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_text() {
        assert_eq!("", Value::Null.to_string());
        assert_eq!("1", Value::Bool(true).to_string());
        assert_eq!("-1.0", Value::Float(-1.0).to_string());
        assert_eq!("43.6532", Value::Float(43.6532).to_string());
        assert_eq!("25:01:05", Value::Time(25 * 3600 + 65).to_string());
        assert_eq!(
            "[1,2,3]",
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]).to_string()
        );
    }

    #[test]
    fn integer_keys_order_numerically() {
        let mut keys = vec![Key::from(10), Key::from(2), Key::from(1)];
        keys.sort();
        assert_eq!(vec![Key::Int(1), Key::Int(2), Key::Int(10)], keys);
    }
}
