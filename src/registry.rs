//! Named record and enum types, and the JSON schema-file format that
//! declares them.
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::annotation::{self, NameResolver};
use crate::decode::Decoder;
use crate::engine::Validator;
use crate::error::{Error, Result};
use crate::ir::{Field, Kind, Ty};
use crate::record::Schema;

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA FILE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaFile {
    /// Enum name -> variant names.
    #[serde(default)]
    pub enums: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub records: Vec<RecordDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDecl {
    pub name: String,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub annotation: String,
    /// `Some(Null)` is an explicit `null` default; `None` means no default.
    #[serde(default, deserialize_with = "present")]
    pub default: Option<serde_json::Value>,
}

fn present<'de, D: Deserializer<'de>>(de: D) -> Result<Option<serde_json::Value>, D::Error> {
    serde_json::Value::deserialize(de).map(Some)
}

fn contains_object(json: &serde_json::Value) -> bool {
    match json {
        serde_json::Value::Object(_) => true,
        serde_json::Value::Array(xs) => xs.iter().any(contains_object),
        _ => false,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// REGISTRY
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default)]
pub struct Registry {
    enums: IndexMap<String, Vec<String>>,
    schemas: IndexMap<String, Arc<Schema>>,
}

/// Resolves names while a schema file is still being loaded: records that
/// are declared but not yet built still resolve as `Structured`.
struct Declared<'a> {
    enums: &'a IndexMap<String, Vec<String>>,
    records: &'a HashSet<String>,
}

impl NameResolver for Declared<'_> {
    fn resolve(&self, name: &str) -> Option<Ty> {
        if self.enums.contains_key(name) {
            Some(Ty::Simple(Kind::Enum(name.to_owned())))
        } else if self.records.contains(name) {
            Some(Ty::structured(name))
        } else {
            None
        }
    }
}

impl NameResolver for Registry {
    fn resolve(&self, name: &str) -> Option<Ty> {
        if self.enums.contains_key(name) {
            Some(Ty::Simple(Kind::Enum(name.to_owned())))
        } else if self.schemas.contains_key(name) {
            Some(Ty::structured(name))
        } else {
            None
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let file: SchemaFile = crate::path_de::from_slice_with_path(&bytes, &path.to_string_lossy())?;
        Self::from_file(file)
    }

    pub fn from_json_str(src: &str, origin: &str) -> Result<Self> {
        let file: SchemaFile = crate::path_de::from_str_with_path(src, origin)?;
        Self::from_file(file)
    }

    /// Build every declared enum and record. Records may reference each
    /// other in any order; a record is built after the record it extends.
    pub fn from_file(file: SchemaFile) -> Result<Self> {
        let mut registry = Registry::new();
        for (name, variants) in file.enums {
            registry.add_enum(name, variants)?;
        }

        let mut declared = HashSet::new();
        for decl in &file.records {
            if registry.enums.contains_key(&decl.name) || !declared.insert(decl.name.clone()) {
                return Err(Error::DuplicateType(decl.name.clone()));
            }
        }

        let names = Declared { enums: &registry.enums, records: &declared };
        let mut pending = Vec::with_capacity(file.records.len());
        for decl in file.records {
            let tys = decl
                .fields
                .iter()
                .map(|f| annotation::parse(&f.annotation, &names))
                .collect::<Result<Vec<_>>>()?;
            pending.push((decl, tys));
        }

        // Record name -> record names its fields mention.
        let mentions: IndexMap<String, Vec<String>> = pending
            .iter()
            .map(|(decl, tys)| {
                let names = tys
                    .iter()
                    .flat_map(Ty::structured_names)
                    .map(str::to_owned)
                    .collect();
                (decl.name.clone(), names)
            })
            .collect();

        // Build in passes until every base, and every record a default
        // decodes into, is available.
        let validator = Validator::default();
        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for (decl, tys) in pending {
                let parent = match decl.extends.clone() {
                    None => None,
                    Some(base) => match registry.schemas.get(&base) {
                        Some(parent) => Some(Arc::clone(parent)),
                        None if declared.contains(&base) => {
                            deferred.push((decl, tys));
                            continue;
                        }
                        None => return Err(Error::UnknownBase { record: decl.name, base }),
                    },
                };
                if registry.unbuilt_default_dependency(&decl, &tys, &mentions).is_some() {
                    deferred.push((decl, tys));
                    continue;
                }
                let schema = registry.build_schema(&validator, decl, tys, parent.as_deref())?;
                registry.add_schema(schema)?;
            }
            if deferred.len() == before {
                let (decl, tys) = &deferred[0];
                if let Some((field, needs)) = registry.unbuilt_default_dependency(decl, tys, &mentions) {
                    return Err(Error::UnresolvedDefault {
                        record: decl.name.clone(),
                        field,
                        needs,
                    });
                }
                // Otherwise only a cycle through `extends` is left.
                return Err(Error::UnknownBase {
                    record: decl.name.clone(),
                    base: decl.extends.clone().unwrap_or_default(),
                });
            }
            pending = deferred;
        }

        debug!(
            enums = registry.enums.len(),
            records = registry.schemas.len(),
            "loaded schema registry"
        );
        Ok(registry)
    }

    /// The first field default of `decl` that would decode into a record
    /// type not built yet, directly or through that type's own fields.
    /// `decl` itself never counts.
    fn unbuilt_default_dependency(
        &self,
        decl: &RecordDecl,
        tys: &[Ty],
        mentions: &IndexMap<String, Vec<String>>,
    ) -> Option<(String, String)> {
        for (field, ty) in decl.fields.iter().zip(tys) {
            // Only a JSON object decodes into a record.
            if !field.default.as_ref().is_some_and(contains_object) {
                continue;
            }
            let mut seen = HashSet::new();
            let mut stack: Vec<&str> = ty.structured_names();
            while let Some(name) = stack.pop() {
                if name == decl.name || !seen.insert(name) {
                    continue;
                }
                if !self.schemas.contains_key(name) {
                    return Some((field.name.clone(), name.to_owned()));
                }
                if let Some(more) = mentions.get(name) {
                    stack.extend(more.iter().map(String::as_str));
                }
            }
        }
        None
    }

    fn build_schema(
        &self,
        validator: &Validator,
        decl: RecordDecl,
        tys: Vec<Ty>,
        parent: Option<&Schema>,
    ) -> Result<Schema> {
        let decoder = Decoder::new(self, validator);
        let mut fields = Vec::with_capacity(decl.fields.len());
        for (field, ty) in decl.fields.into_iter().zip(tys) {
            let default = match &field.default {
                Some(raw) => Some(decoder.lift(raw, &ty)?),
                None => None,
            };
            fields.push(Field { name: field.name, ty, default });
        }
        match parent {
            Some(parent) => Schema::extend(parent, decl.name, fields),
            None => Schema::new(decl.name, fields),
        }
    }

    pub fn add_enum(&mut self, name: impl Into<String>, variants: Vec<String>) -> Result<()> {
        let name = name.into();
        if self.enums.contains_key(&name) || self.schemas.contains_key(&name) {
            return Err(Error::DuplicateType(name));
        }
        self.enums.insert(name, variants);
        Ok(())
    }

    pub fn add_schema(&mut self, schema: Schema) -> Result<Arc<Schema>> {
        let name = schema.name().to_owned();
        if self.enums.contains_key(&name) || self.schemas.contains_key(&name) {
            return Err(Error::DuplicateType(name));
        }
        let schema = Arc::new(schema);
        self.schemas.insert(name, Arc::clone(&schema));
        Ok(schema)
    }

    /// Parse an annotation against the names registered so far.
    pub fn parse(&self, annotation: &str) -> Result<Ty> {
        annotation::parse(annotation, self)
    }

    pub fn schema(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Arc<Schema>> {
        self.schema(name)
            .ok_or_else(|| Error::UnknownRecord(name.to_owned()))
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemas.values()
    }

    pub fn enum_variants(&self, name: &str) -> Option<&[String]> {
        self.enums.get(name).map(Vec::as_slice)
    }

    pub fn enums(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.enums.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    const SCHEMA: &str = r#"{
        "enums": { "Status": ["ACTIVE", "INACTIVE"] },
        "records": [
            { "name": "Child", "extends": "Model", "fields": [
                { "name": "additional_info", "type": "str" }
            ] },
            { "name": "Model", "fields": [
                { "name": "id", "type": "int" },
                { "name": "status", "type": "Status" },
                { "name": "info", "type": "Optional[Info]", "default": null }
            ] },
            { "name": "Info", "fields": [
                { "name": "id", "type": "int" }
            ] }
        ]
    }"#;

    #[test]
    fn loads_records_in_dependency_order() {
        let registry = Registry::from_json_str(SCHEMA, "inline").unwrap();
        let names: Vec<_> = registry.schemas().map(|s| s.name().to_owned()).collect();
        assert_eq!(names, ["Model", "Info", "Child"]);

        let child = registry.require("Child").unwrap();
        let fields: Vec<_> = child.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, ["id", "status", "info", "additional_info"]);
        assert!(child.is_a("Model"));

        let model = registry.require("Model").unwrap();
        assert_eq!(model.field("status").map(|f| &f.ty), Some(&Ty::Simple(Kind::Enum("Status".into()))));
        assert_eq!(model.field("info").and_then(|f| f.default.clone()), Some(Value::None));
        assert_eq!(model.field("id").and_then(|f| f.default.clone()), None);
    }

    #[test]
    fn defaults_wait_for_the_records_they_decode_into() {
        let src = r#"{ "records": [
            { "name": "Holder", "fields": [
                { "name": "info", "type": "Info", "default": { "id": 1, "tag": { "label": "t" } } }
            ] },
            { "name": "Info", "fields": [
                { "name": "id", "type": "int" },
                { "name": "tag", "type": "Optional[Tag]", "default": null }
            ] },
            { "name": "Tag", "fields": [ { "name": "label", "type": "str" } ] }
        ] }"#;
        let registry = Registry::from_json_str(src, "inline").unwrap();
        let names: Vec<_> = registry.schemas().map(|s| s.name().to_owned()).collect();
        assert_eq!(names, ["Info", "Tag", "Holder"]);

        let holder = registry.require("Holder").unwrap();
        let default = holder.field("info").and_then(|f| f.default.clone());
        assert!(matches!(default, Some(Value::Record(r)) if r.type_name() == "Info"));
    }

    #[test]
    fn null_defaults_never_wait() {
        let src = r#"{ "records": [
            { "name": "A", "fields": [ { "name": "b", "type": "Optional[B]", "default": null } ] },
            { "name": "B", "fields": [ { "name": "a", "type": "Optional[A]", "default": null } ] }
        ] }"#;
        let registry = Registry::from_json_str(src, "inline").unwrap();
        let names: Vec<_> = registry.schemas().map(|s| s.name().to_owned()).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn mutually_dependent_defaults_are_reported() {
        let src = r#"{ "records": [
            { "name": "A", "fields": [ { "name": "b", "type": "Optional[B]", "default": { "a": null } } ] },
            { "name": "B", "fields": [ { "name": "a", "type": "Optional[A]", "default": { "b": null } } ] }
        ] }"#;
        let err = Registry::from_json_str(src, "inline").unwrap_err();
        assert!(matches!(err, Error::UnresolvedDefault { ref record, ref needs, .. } if record == "A" && needs == "B"));
    }

    #[test]
    fn unknown_base_is_reported() {
        let src = r#"{ "records": [ { "name": "A", "extends": "Missing", "fields": [] } ] }"#;
        let err = Registry::from_json_str(src, "inline").unwrap_err();
        assert!(matches!(err, Error::UnknownBase { ref base, .. } if base == "Missing"));
    }

    #[test]
    fn extends_cycle_is_reported() {
        let src = r#"{ "records": [
            { "name": "A", "extends": "B" },
            { "name": "B", "extends": "A" }
        ] }"#;
        let err = Registry::from_json_str(src, "inline").unwrap_err();
        assert!(matches!(err, Error::UnknownBase { .. }));
    }

    #[test]
    fn duplicate_names_rejected() {
        let src = r#"{ "enums": { "A": [] }, "records": [ { "name": "A" } ] }"#;
        let err = Registry::from_json_str(src, "inline").unwrap_err();
        assert!(matches!(err, Error::DuplicateType(ref name) if name == "A"));
    }

    #[test]
    fn schema_errors_carry_json_path() {
        let src = r#"{ "records": [ { "name": "A", "fields": [ { "name": "x" } ] } ] }"#;
        let err = Registry::from_json_str(src, "schema.json").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("schema load error for 'schema.json'"), "{message}");
        assert!(message.contains("records[0].fields[0]"), "{message}");
    }

    #[test]
    fn parse_uses_registered_names() {
        let mut registry = Registry::new();
        registry.add_enum("Color", vec!["RED".into()]).unwrap();
        assert_eq!(
            registry.parse("List[Color]").unwrap(),
            Ty::list(Ty::Simple(Kind::Enum("Color".into())))
        );
        assert_eq!(registry.parse("Info").unwrap(), Ty::Opaque("Info".into()));
    }
}
