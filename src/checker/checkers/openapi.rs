//! OpenAPI / Swagger specification checker with structural diffing

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::checker::error::CheckError;
use crate::checker::hash::{canonical_json, sha256_hex};
use crate::checker::http::{build_client, check_response, content_type};
use crate::checker::traits::{Checker, CheckerMetadata};
use crate::checker::types::{
    ACCESS_METHOD_OPENAPI, AccessConfig, ApiSpecMetadata, ChangeDetection, ChangeKind,
    DependencySnapshot, KeyChanges, SnapshotMetadata, SpecFormat, StructuralDiff,
};

/// Accept header preferring JSON, then YAML
const ACCEPT: &str = "application/json, application/yaml;q=0.9, text/yaml;q=0.9, */*;q=0.8";

/// Operation keys of an OpenAPI path item
const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Parse a specification body as JSON or YAML
pub fn parse_document(
    body: &str,
    content_type: Option<&str>,
) -> Result<(Value, SpecFormat), CheckError> {
    let is_json = content_type.is_some_and(|ct| ct.contains("json"))
        || body.trim_start().starts_with('{');

    let (document, format) = if is_json {
        let document = serde_json::from_str::<Value>(body)
            .map_err(|e| CheckError::Parse(format!("invalid JSON specification: {}", e)))?;
        (document, SpecFormat::Json)
    } else {
        let document = serde_yaml::from_str::<Value>(body)
            .map_err(|e| CheckError::Parse(format!("invalid YAML specification: {}", e)))?;
        (document, SpecFormat::Yaml)
    };

    let is_spec = document
        .as_object()
        .is_some_and(|o| o.contains_key("openapi") || o.contains_key("swagger") || o.contains_key("paths"));

    if !is_spec {
        return Err(CheckError::Parse(
            "document is not an OpenAPI or Swagger specification".to_string(),
        ));
    }

    Ok((document, format))
}

fn extract_endpoints(document: &Value) -> BTreeMap<String, Vec<String>> {
    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        return BTreeMap::new();
    };

    paths
        .iter()
        .map(|(path, item)| {
            let methods: BTreeSet<String> = item
                .as_object()
                .into_iter()
                .flat_map(|operations| operations.keys())
                .filter(|key| HTTP_METHODS.contains(&key.to_ascii_lowercase().as_str()))
                .map(|key| key.to_ascii_uppercase())
                .collect();
            (path.clone(), methods.into_iter().collect())
        })
        .collect()
}

fn extract_schemas(document: &Value) -> BTreeMap<String, Value> {
    document
        .pointer("/components/schemas")
        .or_else(|| document.get("definitions"))
        .and_then(Value::as_object)
        .map(|schemas| {
            schemas
                .iter()
                .map(|(name, schema)| (name.clone(), schema.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Build a snapshot from a parsed specification document.
///
/// The state hash covers only the endpoint and schema projection, so key order
/// and formatting never affect it.
pub fn snapshot_from_document(document: &Value, format: SpecFormat) -> DependencySnapshot {
    let endpoints = extract_endpoints(document);
    let schemas = extract_schemas(document);
    let version = scalar_string(document.pointer("/info/version"));
    let title = scalar_string(document.pointer("/info/title"));

    let projection = json!({ "endpoints": endpoints, "schemas": schemas });
    let state_hash = sha256_hex(&canonical_json(&projection));

    DependencySnapshot::new(state_hash, version).with_metadata(SnapshotMetadata::ApiSpec(
        ApiSpecMetadata {
            title,
            format,
            endpoints,
            schemas,
        },
    ))
}

fn key_changes<V: PartialEq>(old: &BTreeMap<String, V>, new: &BTreeMap<String, V>) -> KeyChanges {
    let added = new
        .keys()
        .filter(|key| !old.contains_key(*key))
        .cloned()
        .collect();
    let removed = old
        .keys()
        .filter(|key| !new.contains_key(*key))
        .cloned()
        .collect();
    let modified = old
        .iter()
        .filter(|(key, value)| new.get(*key).is_some_and(|v| v != *value))
        .map(|(key, _)| key.clone())
        .collect();

    KeyChanges {
        added,
        removed,
        modified,
    }
}

fn property_names(schema: &Value) -> BTreeSet<&str> {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

fn required_names(schema: &Value) -> BTreeSet<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// A schema change existing clients can't consume: type changed, a property
/// removed, or a new required property
pub fn is_incompatible_schema_change(old: &Value, new: &Value) -> bool {
    if let (Some(old_type), Some(new_type)) = (old.get("type"), new.get("type")) {
        if old_type != new_type {
            return true;
        }
    }

    let new_properties = property_names(new);
    if property_names(old)
        .iter()
        .any(|name| !new_properties.contains(name))
    {
        return true;
    }

    let old_required = required_names(old);
    required_names(new)
        .iter()
        .any(|name| !old_required.contains(name))
}

/// Structural diff of endpoint and schema maps
pub fn structural_diff(old: &ApiSpecMetadata, new: &ApiSpecMetadata) -> StructuralDiff {
    let endpoints = key_changes(&old.endpoints, &new.endpoints);
    let schemas = key_changes(&old.schemas, &new.schemas);
    let incompatible_schemas = schemas
        .modified
        .iter()
        .filter(|name| is_incompatible_schema_change(&old.schemas[*name], &new.schemas[*name]))
        .cloned()
        .collect();

    StructuralDiff {
        endpoints,
        schemas,
        incompatible_schemas,
    }
}

fn change_kinds(diff: &StructuralDiff) -> Vec<ChangeKind> {
    [
        (!diff.endpoints.added.is_empty(), ChangeKind::EndpointsAdded),
        (!diff.endpoints.removed.is_empty(), ChangeKind::EndpointsRemoved),
        (!diff.endpoints.modified.is_empty(), ChangeKind::EndpointsModified),
        (!diff.schemas.added.is_empty(), ChangeKind::SchemasAdded),
        (!diff.schemas.removed.is_empty(), ChangeKind::SchemasRemoved),
        (!diff.schemas.modified.is_empty(), ChangeKind::SchemasModified),
        (!diff.incompatible_schemas.is_empty(), ChangeKind::SchemasIncompatible),
    ]
    .into_iter()
    .filter_map(|(present, kind)| present.then_some(kind))
    .collect()
}

/// Checker implementation for OpenAPI 3 and Swagger 2 documents
pub struct OpenApiChecker {
    client: reqwest::Client,
}

impl OpenApiChecker {
    pub fn new() -> Self {
        Self {
            client: build_client(),
        }
    }
}

impl Default for OpenApiChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Checker for OpenApiChecker {
    fn metadata(&self) -> CheckerMetadata {
        CheckerMetadata::new("openapi-spec", env!("CARGO_PKG_VERSION"), ACCESS_METHOD_OPENAPI)
            .with_description("Structural diff of OpenAPI/Swagger endpoints and schemas")
    }

    async fn fetch(&self, config: &AccessConfig) -> Result<DependencySnapshot, CheckError> {
        let request = self.client.get(&config.url).header("Accept", ACCEPT);
        let response = config.authorize(request).send().await?;
        let response = check_response(response, &config.url)?;

        let content_type = content_type(&response);
        let body = response.text().await?;

        let (document, format) = parse_document(&body, content_type.as_deref()).inspect_err(|e| {
            warn!("Failed to parse specification from {}: {}", config.url, e);
        })?;

        Ok(snapshot_from_document(&document, format))
    }

    fn compare(
        &self,
        previous: &DependencySnapshot,
        current: &DependencySnapshot,
    ) -> ChangeDetection {
        let mut changes = Vec::new();
        let mut diff = None;

        if let (Some(old), Some(new)) = (&previous.version, &current.version) {
            if old != new {
                changes.push(ChangeKind::Version);
            }
        }

        if previous.state_hash != current.state_hash {
            match (&previous.metadata, &current.metadata) {
                (SnapshotMetadata::ApiSpec(old), SnapshotMetadata::ApiSpec(new)) => {
                    let structural = structural_diff(old, new);
                    if structural.is_empty() {
                        changes.push(ChangeKind::StateHash);
                    } else {
                        changes.extend(change_kinds(&structural));
                        diff = Some(structural);
                    }
                }
                _ => {
                    debug!("No prior structural data, comparing specification hashes only");
                    changes.push(ChangeKind::StateHash);
                }
            }
        }

        let detection = ChangeDetection::from_changes(
            changes,
            previous.version.as_deref(),
            current.version.as_deref(),
        );

        match diff {
            Some(diff) => detection.with_diff(diff),
            None => detection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::error::FetchError;
    use crate::checker::severity::classify;
    use crate::checker::types::Severity;
    use mockito::Server;

    const PETSTORE_JSON: &str = r#"{
        "openapi": "3.0.0",
        "info": {"title": "Petstore", "version": "1.0.0"},
        "paths": {
            "/pets": {"get": {"summary": "List"}, "post": {"summary": "Create"}, "parameters": []},
            "/pets/{id}": {"get": {"summary": "Show"}}
        },
        "components": {"schemas": {"Pet": {"type": "object", "properties": {"id": {"type": "integer"}}}}}
    }"#;

    const PETSTORE_YAML: &str = r#"
openapi: 3.0.0
info:
  version: 1.0.0
  title: Petstore
components:
  schemas:
    Pet:
      properties:
        id:
          type: integer
      type: object
paths:
  /pets/{id}:
    get:
      summary: Show
  /pets:
    post:
      summary: Create
    get:
      summary: List
"#;

    fn api_snapshot(endpoints: &[(&str, Vec<&str>)], schemas: &[(&str, Value)]) -> DependencySnapshot {
        let document = json!({
            "openapi": "3.0.0",
            "info": {"version": "1.0.0"},
            "paths": endpoints
                .iter()
                .map(|(path, methods)| {
                    let ops: serde_json::Map<String, Value> = methods
                        .iter()
                        .map(|m| (m.to_lowercase(), json!({})))
                        .collect();
                    (path.to_string(), Value::Object(ops))
                })
                .collect::<serde_json::Map<String, Value>>(),
            "components": {"schemas": schemas
                .iter()
                .map(|(name, schema)| (name.to_string(), schema.clone()))
                .collect::<serde_json::Map<String, Value>>()},
        });
        snapshot_from_document(&document, SpecFormat::Json)
    }

    #[test]
    fn snapshot_extracts_sorted_endpoints_and_schemas() {
        let (document, format) = parse_document(PETSTORE_JSON, Some("application/json")).unwrap();
        let snapshot = snapshot_from_document(&document, format);

        assert_eq!(snapshot.version.as_deref(), Some("1.0.0"));
        let SnapshotMetadata::ApiSpec(metadata) = snapshot.metadata else {
            panic!("expected api spec metadata");
        };
        assert_eq!(metadata.title.as_deref(), Some("Petstore"));
        assert_eq!(
            metadata.endpoints,
            BTreeMap::from([
                ("/pets".to_string(), vec!["GET".to_string(), "POST".to_string()]),
                ("/pets/{id}".to_string(), vec!["GET".to_string()]),
            ])
        );
        assert_eq!(metadata.schemas.keys().collect::<Vec<_>>(), vec!["Pet"]);
    }

    #[test]
    fn state_hash_ignores_ordering_and_format() {
        let (json_doc, _) = parse_document(PETSTORE_JSON, None).unwrap();
        let (yaml_doc, yaml_format) = parse_document(PETSTORE_YAML, Some("application/yaml")).unwrap();

        assert_eq!(yaml_format, SpecFormat::Yaml);
        assert_eq!(
            snapshot_from_document(&json_doc, SpecFormat::Json).state_hash,
            snapshot_from_document(&yaml_doc, SpecFormat::Yaml).state_hash
        );
    }

    #[test]
    fn swagger_definitions_are_extracted_as_schemas() {
        let (document, _) = parse_document(
            r#"{"swagger": "2.0", "paths": {}, "definitions": {"User": {"type": "object"}}}"#,
            None,
        )
        .unwrap();

        let SnapshotMetadata::ApiSpec(metadata) =
            snapshot_from_document(&document, SpecFormat::Json).metadata
        else {
            panic!("expected api spec metadata");
        };
        assert!(metadata.schemas.contains_key("User"));
    }

    #[test]
    fn parse_document_rejects_malformed_body() {
        let result = parse_document("{ not json", Some("application/json"));
        assert!(matches!(result, Err(CheckError::Parse(_))));
    }

    #[test]
    fn parse_document_rejects_non_specification() {
        let result = parse_document("name: not-a-spec\n", Some("text/yaml"));
        assert!(matches!(result, Err(CheckError::Parse(_))));
    }

    #[test]
    fn added_endpoint_is_reported_and_classified_minor() {
        let checker = OpenApiChecker::new();
        let previous = api_snapshot(&[("/users", vec!["GET"])], &[]);
        let current = api_snapshot(&[("/users", vec!["GET"]), ("/items", vec!["GET", "POST"])], &[]);

        let result = checker.compare(&previous, &current);

        assert!(result.has_changed);
        assert_eq!(result.changes, vec![ChangeKind::EndpointsAdded]);
        assert_eq!(result.diff.as_ref().unwrap().endpoints.added, vec!["/items"]);
        assert_eq!(classify(&result), Severity::Minor);
    }

    #[test]
    fn removed_endpoint_is_reported_and_classified_breaking() {
        let checker = OpenApiChecker::new();
        let previous = api_snapshot(&[("/users", vec!["GET"])], &[]);
        let current = api_snapshot(&[("/items", vec!["GET", "POST"])], &[]);

        let result = checker.compare(&previous, &current);

        let diff = result.diff.as_ref().unwrap();
        assert_eq!(diff.endpoints.removed, vec!["/users"]);
        assert_eq!(diff.endpoints.added, vec!["/items"]);
        assert!(result.has(ChangeKind::EndpointsRemoved));
        assert_eq!(classify(&result), Severity::Breaking);
    }

    #[test]
    fn modified_endpoint_methods_are_major() {
        let checker = OpenApiChecker::new();
        let previous = api_snapshot(&[("/users", vec!["GET"])], &[]);
        let current = api_snapshot(&[("/users", vec!["GET", "POST"])], &[]);

        let result = checker.compare(&previous, &current);

        assert_eq!(result.changes, vec![ChangeKind::EndpointsModified]);
        assert_eq!(classify(&result), Severity::Major);
    }

    #[test]
    fn compatible_schema_change_is_modified_only() {
        let checker = OpenApiChecker::new();
        let previous = api_snapshot(&[], &[("User", json!({"type": "object", "properties": {"id": {}}}))]);
        let current = api_snapshot(
            &[],
            &[("User", json!({"type": "object", "properties": {"id": {}, "email": {}}}))],
        );

        let result = checker.compare(&previous, &current);

        assert_eq!(result.changes, vec![ChangeKind::SchemasModified]);
        assert_eq!(classify(&result), Severity::Major);
    }

    #[test]
    fn removed_schema_property_is_incompatible() {
        let checker = OpenApiChecker::new();
        let previous = api_snapshot(
            &[],
            &[("User", json!({"type": "object", "properties": {"id": {}, "email": {}}}))],
        );
        let current = api_snapshot(&[], &[("User", json!({"type": "object", "properties": {"id": {}}}))]);

        let result = checker.compare(&previous, &current);

        assert_eq!(
            result.changes,
            vec![ChangeKind::SchemasModified, ChangeKind::SchemasIncompatible]
        );
        assert_eq!(result.diff.as_ref().unwrap().incompatible_schemas, vec!["User"]);
        assert_eq!(classify(&result), Severity::Breaking);
    }

    #[test]
    fn is_incompatible_schema_change_detects_type_and_required_changes() {
        assert!(is_incompatible_schema_change(
            &json!({"type": "string"}),
            &json!({"type": "integer"})
        ));
        assert!(is_incompatible_schema_change(
            &json!({"type": "object", "required": ["id"]}),
            &json!({"type": "object", "required": ["id", "name"]})
        ));
        assert!(!is_incompatible_schema_change(
            &json!({"type": "object", "required": ["id", "name"]}),
            &json!({"type": "object", "required": ["id"], "description": "x"})
        ));
    }

    #[test]
    fn missing_previous_metadata_skips_structural_diff() {
        let checker = OpenApiChecker::new();
        let current = api_snapshot(&[("/users", vec!["GET"])], &[]);
        let same_hash = DependencySnapshot::new(current.state_hash.clone(), current.version.clone());
        let other_hash = DependencySnapshot::new("old-hash", current.version.clone());

        let unchanged = checker.compare(&same_hash, &current);
        assert!(!unchanged.has_changed);
        assert_eq!(unchanged.diff, None);

        let changed = checker.compare(&other_hash, &current);
        assert_eq!(changed.changes, vec![ChangeKind::StateHash]);
        assert_eq!(changed.diff, None);
    }

    #[test]
    fn version_change_is_flagged_separately_from_structure() {
        let checker = OpenApiChecker::new();
        let previous = api_snapshot(&[("/users", vec!["GET"])], &[]);
        let current = DependencySnapshot {
            version: Some("2.0.0".to_string()),
            ..previous.clone()
        };

        let result = checker.compare(&previous, &current);

        assert_eq!(result.changes, vec![ChangeKind::Version]);
        assert_eq!(result.new_version.as_deref(), Some("2.0.0"));
        assert_eq!(classify(&result), Severity::Breaking);
    }

    #[tokio::test]
    async fn fetch_parses_yaml_specification() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/openapi.yaml")
            .with_status(200)
            .with_header("content-type", "application/yaml")
            .with_body(PETSTORE_YAML)
            .create_async()
            .await;

        let checker = OpenApiChecker::new();
        let url = format!("{}/openapi.yaml", server.url());
        let snapshot = checker
            .fetch(&AccessConfig::new(&url, ACCESS_METHOD_OPENAPI))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(snapshot.version.as_deref(), Some("1.0.0"));
        assert!(matches!(
            snapshot.metadata,
            SnapshotMetadata::ApiSpec(ApiSpecMetadata {
                format: SpecFormat::Yaml,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn fetch_returns_parse_error_for_invalid_document() {
        let mut server = Server::new_async().await;

        let _mock = server
            .mock("GET", "/openapi.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{\"openapi\": ")
            .create_async()
            .await;

        let checker = OpenApiChecker::new();
        let url = format!("{}/openapi.json", server.url());
        let result = checker.fetch(&AccessConfig::new(&url, ACCESS_METHOD_OPENAPI)).await;

        assert!(matches!(result, Err(CheckError::Parse(_))));
    }

    #[tokio::test]
    async fn fetch_returns_fetch_error_for_missing_document() {
        let mut server = Server::new_async().await;

        let _mock = server
            .mock("GET", "/openapi.json")
            .with_status(404)
            .create_async()
            .await;

        let checker = OpenApiChecker::new();
        let url = format!("{}/openapi.json", server.url());
        let result = checker.fetch(&AccessConfig::new(&url, ACCESS_METHOD_OPENAPI)).await;

        assert!(matches!(
            result,
            Err(CheckError::Fetch(FetchError::NotFound { .. }))
        ));
    }
}
