//! Declarative description of feed files: which fields they hold, and how to convert them
use crate::error::{Error, Result};
use crate::value::{EnumValue, Value};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// The scalar kinds a field can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// Text, kept as is
    Str,
    /// Signed integer
    Int,
    /// Floating point number
    Float,
    /// `0` or `1`
    Bool,
    /// `YYYYMMDD` calendar date
    Date,
    /// `HH:MM:SS` time of day, hours may exceed 24
    Time,
    /// Any JSON literal, kept as read
    Json,
}

/// An integer-backed enumeration: the codes a field accepts and their names
#[derive(Debug, PartialEq, Eq)]
pub struct EnumDef {
    /// Name of the enumeration
    pub name: &'static str,
    /// `(code, member name)` pairs
    pub members: &'static [(i64, &'static str)],
}

impl EnumDef {
    /// Name of the member with this code
    pub fn name_of(&self, code: i64) -> Option<&'static str> {
        self.members
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| *name)
    }

    /// The member with this code, None if the code is out of range
    pub fn member(&'static self, code: i64) -> Option<EnumValue> {
        self.name_of(code).map(|_| EnumValue { def: self, code })
    }
}

/// The declared type of a field
///
/// This is a closed set: conversion dispatches on the variant, never on the data.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// A single scalar
    Scalar(ScalarType),
    /// An integer code mapped to an enumeration member
    Enum(&'static EnumDef),
    /// A nullable wrapper around exactly one scalar or enumeration
    Optional(Box<FieldType>),
    /// A sequence of scalars (an embedded JSON array in a tabular cell) or of nested records
    List(Box<FieldType>),
    /// A nested record of a tree document
    Nested(Arc<RecordSpec>),
}

impl FieldType {
    /// Text
    pub const STR: FieldType = FieldType::Scalar(ScalarType::Str);
    /// Integer
    pub const INT: FieldType = FieldType::Scalar(ScalarType::Int);
    /// Float
    pub const FLOAT: FieldType = FieldType::Scalar(ScalarType::Float);
    /// Boolean
    pub const BOOL: FieldType = FieldType::Scalar(ScalarType::Bool);
    /// Date
    pub const DATE: FieldType = FieldType::Scalar(ScalarType::Date);
    /// Time of day
    pub const TIME: FieldType = FieldType::Scalar(ScalarType::Time);
    /// Opaque JSON
    pub const JSON: FieldType = FieldType::Scalar(ScalarType::Json);

    /// Nullable `inner`
    pub fn optional(inner: FieldType) -> FieldType {
        FieldType::Optional(Box::new(inner))
    }

    /// Sequence of `inner`
    pub fn list(inner: FieldType) -> FieldType {
        FieldType::List(Box::new(inner))
    }

    /// Nested record
    pub fn nested(record: RecordSpec) -> FieldType {
        FieldType::Nested(Arc::new(record))
    }

    /// The concrete type once an optional wrapper is removed
    pub fn inner(&self) -> &FieldType {
        match self {
            FieldType::Optional(inner) => inner,
            other => other,
        }
    }

    fn is_concrete(&self) -> bool {
        matches!(self, FieldType::Scalar(_) | FieldType::Enum(_))
    }

    fn validate(&self, field: &str, tabular: bool) -> Result<()> {
        match self {
            FieldType::Scalar(_) | FieldType::Enum(_) => Ok(()),
            FieldType::Optional(inner) if inner.is_concrete() => Ok(()),
            FieldType::Optional(inner) => Err(Error::MisconfiguredSchema(format!(
                "field {}: optional must wrap exactly one scalar or enum type, not {}",
                field, inner
            ))),
            FieldType::List(inner) if inner.is_concrete() => Ok(()),
            FieldType::List(inner) => match inner.as_ref() {
                FieldType::Nested(record) if !tabular => record.validate(),
                _ => Err(Error::MisconfiguredSchema(format!(
                    "field {}: unsupported list item type {}",
                    field, inner
                ))),
            },
            FieldType::Nested(_) if tabular => Err(Error::MisconfiguredSchema(format!(
                "field {}: nested records cannot be stored in a tabular file",
                field
            ))),
            FieldType::Nested(record) => record.validate(),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Str => "text",
            ScalarType::Int => "integer",
            ScalarType::Float => "float",
            ScalarType::Bool => "boolean",
            ScalarType::Date => "date",
            ScalarType::Time => "time",
            ScalarType::Json => "json",
        };
        f.write_str(name)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(scalar) => write!(f, "{}", scalar),
            FieldType::Enum(def) => write!(f, "{}", def.name),
            FieldType::Optional(inner) => write!(f, "optional {}", inner),
            FieldType::List(inner) => write!(f, "list of {}", inner),
            FieldType::Nested(record) => write!(f, "{} record", record.name),
        }
    }
}

/// Type, presence and default of a single field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Declared type
    pub ty: FieldType,
    /// A required field must be present and non-empty
    pub required: bool,
    /// Value of an absent or empty optional field
    pub default: Value,
}

impl FieldSpec {
    /// A field that must always hold a value
    pub fn required(ty: FieldType) -> Self {
        Self {
            ty,
            required: true,
            default: Value::Null,
        }
    }

    /// A field that falls back to `default` when absent or empty
    pub fn optional(ty: FieldType, default: Value) -> Self {
        Self {
            ty,
            required: false,
            default,
        }
    }

    /// Spec of a column found in a file but not declared by its schema
    pub fn unknown() -> Self {
        Self::optional(FieldType::STR, Value::Str(String::new()))
    }

    fn validate(&self, field: &str, tabular: bool) -> Result<()> {
        self.ty.validate(field, tabular)?;
        if let Value::Enum(e) = &self.default {
            if e.def.name_of(e.code).is_none() {
                return Err(Error::MisconfiguredSchema(format!(
                    "field {}: default {} is not a member of {}",
                    field, e.code, e.def.name
                )));
            }
        }
        Ok(())
    }
}

/// Declared fields of a nested record type
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSpec {
    /// Name of the record type, used in error messages
    pub name: String,
    /// Declared fields, in output order
    pub fields: IndexMap<String, FieldSpec>,
}

impl RecordSpec {
    /// A record type without fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Adds a field. Returns Self and can be chained
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    fn validate(&self) -> Result<()> {
        self.fields
            .iter()
            .try_for_each(|(name, spec)| spec.validate(name, false))
    }
}

/// How a file is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Comma separated values with a header row
    Tabular,
    /// A single JSON document
    Tree,
}

impl FileKind {
    /// Extension used when a file spec does not override its file name
    pub fn default_extension(self) -> &'static str {
        match self {
            FileKind::Tabular => ".txt",
            FileKind::Tree => ".geojson",
        }
    }
}

/// Description of one logical file of a feed
#[derive(Debug, Clone, PartialEq)]
pub struct FileSpec {
    name: String,
    filename: String,
    kind: FileKind,
    id_key: String,
    group_key: Option<String>,
    nested_grouping: bool,
    required: bool,
    fields: IndexMap<String, FieldSpec>,
}

impl FileSpec {
    /// Starts the description of a comma separated file indexed by `id_key`
    pub fn tabular(name: impl Into<String>, id_key: impl Into<String>) -> FileSpecBuilder {
        FileSpecBuilder::new(name.into(), id_key.into(), FileKind::Tabular)
    }

    /// Starts the description of a JSON document
    pub fn tree(name: impl Into<String>, id_key: impl Into<String>) -> FileSpecBuilder {
        FileSpecBuilder::new(name.into(), id_key.into(), FileKind::Tree)
    }

    /// Logical name, the key of the collection in a [crate::Feed]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the file in the feed directory
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Encoding of the file
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Field whose value identifies an entity
    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    /// Field ordering entities sharing the same primary key
    pub fn group_key(&self) -> Option<&str> {
        self.group_key.as_deref()
    }

    /// Are groups maps keyed by the group key (instead of lists)
    pub fn nested_grouping(&self) -> bool {
        self.nested_grouping
    }

    /// Must the file be present in the feed
    pub fn required(&self) -> bool {
        self.required
    }

    /// Declared fields, in declaration order
    pub fn fields(&self) -> &IndexMap<String, FieldSpec> {
        &self.fields
    }

    /// The declared fields as the root record of a tree document
    pub fn record(&self) -> RecordSpec {
        RecordSpec {
            name: self.name.clone(),
            fields: self.fields.clone(),
        }
    }
}

/// Builds a validated [FileSpec]. See [FileSpec::tabular] and [FileSpec::tree]
pub struct FileSpecBuilder {
    spec: FileSpec,
}

impl FileSpecBuilder {
    fn new(name: String, id_key: String, kind: FileKind) -> Self {
        Self {
            spec: FileSpec {
                filename: format!("{}{}", name, kind.default_extension()),
                name,
                kind,
                id_key,
                group_key: None,
                nested_grouping: false,
                required: true,
                fields: IndexMap::new(),
            },
        }
    }

    /// Overrides the file name derived from the logical name
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.spec.filename = filename.into();
        self
    }

    /// Must the file be present in the feed (default: true)
    pub fn required(mut self, required: bool) -> Self {
        self.spec.required = required;
        self
    }

    /// Allows several entities per primary key, ordered by `group_key`
    pub fn group_by(mut self, group_key: impl Into<String>) -> Self {
        self.spec.group_key = Some(group_key.into());
        self
    }

    /// Index groups as maps keyed by the group key (default: false, groups are lists)
    pub fn nested_grouping(mut self, nested_grouping: bool) -> Self {
        self.spec.nested_grouping = nested_grouping;
        self
    }

    /// Declares a field. Returns Self and can be chained
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.spec.fields.insert(name.into(), spec);
        self
    }

    /// Checks the declaration is consistent
    pub fn build(self) -> Result<FileSpec> {
        let spec = self.spec;
        let tabular = spec.kind == FileKind::Tabular;
        for (name, field) in &spec.fields {
            field
                .validate(name, tabular)
                .map_err(|e| match e {
                    Error::MisconfiguredSchema(msg) => {
                        Error::MisconfiguredSchema(format!("{}: {}", spec.filename, msg))
                    }
                    other => other,
                })?;
        }
        if tabular {
            for key in std::iter::once(&spec.id_key).chain(spec.group_key.as_ref()) {
                if !spec.fields.contains_key(key) {
                    return Err(Error::MisconfiguredSchema(format!(
                        "{}: key {} is not a declared field",
                        spec.filename, key
                    )));
                }
            }
        }
        if spec.nested_grouping && spec.group_key.is_none() {
            return Err(Error::MisconfiguredSchema(format!(
                "{}: nested grouping requires a group key",
                spec.filename
            )));
        }
        Ok(spec)
    }
}

/// The set of files a feed is made of, in loading order
#[derive(Debug, Clone, Default)]
pub struct Schema {
    files: IndexMap<String, Arc<FileSpec>>,
}

impl Schema {
    /// Registers the given files under their logical names
    pub fn new(files: impl IntoIterator<Item = FileSpec>) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|f| (f.name.clone(), Arc::new(f)))
                .collect(),
        }
    }

    /// File spec of a logical name
    pub fn get(&self, name: &str) -> Option<&Arc<FileSpec>> {
        self.files.get(name)
    }

    /// All file specs, in loading order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FileSpec>> {
        self.files.values()
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Does the schema declare no file
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_types_display() {
        assert_eq!("text", FieldType::STR.to_string());
        assert_eq!("optional float", FieldType::optional(FieldType::FLOAT).to_string());
        let point = RecordSpec::new("Point").field("lat", FieldSpec::required(FieldType::FLOAT));
        assert_eq!(
            "list of Point record",
            FieldType::list(FieldType::nested(point)).to_string()
        );
    }

    #[test]
    fn nested_optional_is_misconfigured() {
        let res = FileSpec::tabular("stops", "stop_id")
            .field("stop_id", FieldSpec::required(FieldType::STR))
            .field(
                "stop_lat",
                FieldSpec::optional(
                    FieldType::optional(FieldType::optional(FieldType::FLOAT)),
                    Value::Null,
                ),
            )
            .build();
        assert!(matches!(res, Err(Error::MisconfiguredSchema(_))));
    }

    #[test]
    fn undeclared_group_key_is_misconfigured() {
        let res = FileSpec::tabular("stop_times", "trip_id")
            .group_by("stop_sequence")
            .field("trip_id", FieldSpec::required(FieldType::STR))
            .build();
        assert!(matches!(res, Err(Error::MisconfiguredSchema(_))));
    }

    #[test]
    fn file_name_follows_kind() {
        let spec = FileSpec::tree("locations", "id").build().unwrap();
        assert_eq!("locations.geojson", spec.filename());
        let spec = FileSpec::tabular("trips", "trip_id")
            .field("trip_id", FieldSpec::required(FieldType::STR))
            .build()
            .unwrap();
        assert_eq!("trips.txt", spec.filename());
    }
}
