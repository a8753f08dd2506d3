//! Recursive conversion of JSON documents against nested record specs
use crate::collection::Collection;
use crate::convert::convert_scalar;
use crate::error::{ConversionError, Error, Location, Result};
use crate::field::{FieldSpec, FieldType, FileSpec, RecordSpec, ScalarType};
use crate::value::{Entity, Value};
use serde_json::Value as Json;
use std::io::Read;
use std::sync::Arc;

const EXCERPT_LEN: usize = 60;

/// Reads a whole tree document into a single root entity
pub(crate) fn read_tree<R: Read>(reader: R, spec: &Arc<FileSpec>) -> Result<Collection> {
    let file_name = spec.filename();
    let document: Json = serde_json::from_reader(reader).map_err(|source| Error::JsonError {
        file_name: file_name.to_owned(),
        source,
    })?;

    let visitor = TreeVisitor { file_name };
    let root = match document {
        Json::Object(ref object) => visitor.visit_record(object, &spec.record(), "")?,
        ref other => return Err(visitor.mismatch("", "", other, "expected an object")),
    };

    let mut collection = Collection::empty(spec.clone());
    collection.insert(root);
    Ok(collection)
}

struct TreeVisitor<'a> {
    file_name: &'a str,
}

impl TreeVisitor<'_> {
    fn visit(
        &self,
        raw: &Json,
        ty: &FieldType,
        field: Option<&FieldSpec>,
        name: &str,
        path: &str,
    ) -> Result<Value> {
        match (raw, ty.inner()) {
            (Json::Null, _) => self.visit_null(ty, field, name, path),
            (_, FieldType::Scalar(ScalarType::Json)) => Ok(Value::Json(raw.clone())),
            (Json::Object(object), FieldType::Nested(record)) => self
                .visit_record(object, record, path)
                .map(Value::Record),
            (Json::Array(items), FieldType::List(item_ty)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.visit(item, item_ty, None, name, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            (Json::Object(_), other) | (Json::Array(_), other) => Err(self.mismatch(
                name,
                path,
                raw,
                &format!("expected {}", other),
            )),
            (leaf, inner) => {
                let text = match leaf {
                    Json::String(s) => s.clone(),
                    Json::Bool(b) => u8::from(*b).to_string(),
                    other => other.to_string(),
                };
                convert_scalar(inner, &text)
                    .map_err(|e| Error::conversion(self.file_name, location(path), name, e))
            }
        }
    }

    /// Declared fields in declaration order, then unknown keys as untyped JSON
    fn visit_record(
        &self,
        object: &serde_json::Map<String, Json>,
        record: &RecordSpec,
        path: &str,
    ) -> Result<Entity> {
        let mut entity = Entity::new();
        for (name, field) in &record.fields {
            let raw = object.get(name).unwrap_or(&Json::Null);
            if field.required && raw.is_null() {
                return Err(Error::MissingRequiredField {
                    file_name: self.file_name.to_owned(),
                    location: location(path),
                    field: name.clone(),
                });
            }
            let value = self.visit(raw, &field.ty, Some(field), name, &join(path, name))?;
            entity.set(name.clone(), value);
        }
        for (name, raw) in object {
            if !record.fields.contains_key(name) {
                entity.set(name.clone(), Value::Json(raw.clone()));
            }
        }
        Ok(entity)
    }

    fn visit_null(
        &self,
        ty: &FieldType,
        field: Option<&FieldSpec>,
        name: &str,
        path: &str,
    ) -> Result<Value> {
        match field {
            Some(field) if !field.required => Ok(field.default.clone()),
            _ if matches!(ty, FieldType::Optional(_)) => Ok(Value::Null),
            _ => Err(self.mismatch(name, path, &Json::Null, "unexpected null")),
        }
    }

    fn mismatch(&self, name: &str, path: &str, raw: &Json, reason: &str) -> Error {
        let mut excerpt = raw.to_string();
        if excerpt.len() > EXCERPT_LEN {
            let end = (0..=EXCERPT_LEN).rev().find(|i| excerpt.is_char_boundary(*i)).unwrap_or(0);
            excerpt.truncate(end);
            excerpt.push_str("...");
        }
        Error::conversion(self.file_name, location(path), name, ConversionError::new(excerpt, reason))
    }
}

fn location(path: &str) -> Location {
    Location::Path(path.to_owned())
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_owned()
    } else {
        format!("{}.{}", path, name)
    }
}
