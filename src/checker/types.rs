//! Common types shared by every checker

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access method identifier for the repository-release checker
pub const ACCESS_METHOD_GITHUB: &str = "github";
/// Access method identifier for the API-specification checker
pub const ACCESS_METHOD_OPENAPI: &str = "openapi";
/// Access method identifier for the generic content checker
pub const ACCESS_METHOD_HTTP: &str = "http";
/// Access method identifier for the documentation-library checker
pub const ACCESS_METHOD_DOC_LIBRARY: &str = "doc_library";

/// How a resolved secret is presented to the remote host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    /// `Authorization: Bearer <secret>`
    Bearer,
    /// `Authorization: token <secret>` (GitHub personal access tokens)
    Token,
    /// `X-API-Key: <secret>`
    ApiKey,
}

/// Authentication descriptor with an already-resolved secret.
///
/// Never serialized. `Debug` output redacts the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Auth {
    pub kind: AuthKind,
    secret: String,
}

impl Auth {
    pub fn new(kind: AuthKind, secret: impl Into<String>) -> Self {
        Self {
            kind,
            secret: secret.into(),
        }
    }

    pub fn bearer(secret: impl Into<String>) -> Self {
        Self::new(AuthKind::Bearer, secret)
    }

    pub fn token(secret: impl Into<String>) -> Self {
        Self::new(AuthKind::Token, secret)
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Attach this credential to an outgoing request
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.kind {
            AuthKind::Bearer => request.bearer_auth(&self.secret),
            AuthKind::Token => request.header("Authorization", format!("token {}", self.secret)),
            AuthKind::ApiKey => request.header("X-API-Key", &self.secret),
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("kind", &self.kind)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Per-check input, constructed fresh for every fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    pub url: String,
    pub access_method: String,
    pub auth: Option<Auth>,
}

impl AccessConfig {
    pub fn new(url: impl Into<String>, access_method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            access_method: access_method.into(),
            auth: None,
        }
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Apply the configured credential (if any) to a request
    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(auth) => auth.apply(request),
            None => request,
        }
    }
}

/// Where a repository snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseSource {
    /// Latest published release
    Release,
    /// Most recent commit on the default branch (no releases published)
    Commit,
}

/// Structured data captured by the repository-release checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMetadata {
    pub source: ReleaseSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
}

/// Serialization format of a fetched API document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecFormat {
    Json,
    Yaml,
}

/// Semantic projection of an API specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSpecMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub format: SpecFormat,
    /// Path -> sorted uppercase HTTP methods
    pub endpoints: BTreeMap<String, Vec<String>>,
    /// Schema name -> raw definition
    pub schemas: BTreeMap<String, serde_json::Value>,
}

/// Structured data captured by the generic content checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub normalized_length: usize,
}

/// Where a documentation-library snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocSource {
    /// Documentation metadata service
    Service,
    /// Direct fetch of the documentation page
    DirectFetch,
}

/// Structured data captured by the documentation-library checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocLibraryMetadata {
    pub library_id: String,
    pub source: DocSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Checker-specific structured data attached to a snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotMetadata {
    /// No structured data (e.g. a snapshot rebuilt from manifest fields)
    #[default]
    None,
    Release(ReleaseMetadata),
    ApiSpec(ApiSpecMetadata),
    Content(ContentMetadata),
    DocLibrary(DocLibraryMetadata),
}

/// Point-in-time observation of a remote resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencySnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub state_hash: String,
    pub fetched_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: SnapshotMetadata,
}

impl DependencySnapshot {
    pub fn new(state_hash: impl Into<String>, version: Option<String>) -> Self {
        Self {
            version,
            state_hash: state_hash.into(),
            fetched_at: Utc::now(),
            metadata: SnapshotMetadata::None,
        }
    }

    pub fn with_metadata(mut self, metadata: SnapshotMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }
}

/// Kind of change detected between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Version,
    StateHash,
    Content,
    LastUpdated,
    EndpointsAdded,
    EndpointsRemoved,
    EndpointsModified,
    SchemasAdded,
    SchemasRemoved,
    SchemasModified,
    SchemasIncompatible,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Version => "version",
            ChangeKind::StateHash => "state_hash",
            ChangeKind::Content => "content",
            ChangeKind::LastUpdated => "last_updated",
            ChangeKind::EndpointsAdded => "endpoints_added",
            ChangeKind::EndpointsRemoved => "endpoints_removed",
            ChangeKind::EndpointsModified => "endpoints_modified",
            ChangeKind::SchemasAdded => "schemas_added",
            ChangeKind::SchemasRemoved => "schemas_removed",
            ChangeKind::SchemasModified => "schemas_modified",
            ChangeKind::SchemasIncompatible => "schemas_incompatible",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Impact tier of a detected change, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Major,
    Breaking,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Breaking => "breaking",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys added, removed, or modified between two structural maps
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyChanges {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl KeyChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Structural diff between two API specifications
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructuralDiff {
    pub endpoints: KeyChanges,
    pub schemas: KeyChanges,
    /// Modified schemas whose change cannot be consumed by existing clients
    pub incompatible_schemas: Vec<String>,
}

impl StructuralDiff {
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty() && self.schemas.is_empty() && self.incompatible_schemas.is_empty()
    }
}

/// Result of comparing a previous snapshot to a current one
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChangeDetection {
    pub has_changed: bool,
    pub changes: Vec<ChangeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<StructuralDiff>,
}

impl ChangeDetection {
    /// A detection with no changes
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// Build a detection from the list of recognized change kinds.
    ///
    /// `has_changed` is derived from `changes`. Versions are recorded only when
    /// a version change was flagged.
    pub fn from_changes(
        changes: Vec<ChangeKind>,
        old_version: Option<&str>,
        new_version: Option<&str>,
    ) -> Self {
        let version_changed = changes.contains(&ChangeKind::Version);
        Self {
            has_changed: !changes.is_empty(),
            old_version: old_version
                .filter(|_| version_changed)
                .map(str::to_string),
            new_version: new_version
                .filter(|_| version_changed)
                .map(str::to_string),
            changes,
            severity: None,
            diff: None,
        }
    }

    pub fn with_diff(mut self, diff: StructuralDiff) -> Self {
        self.diff = Some(diff);
        self
    }

    pub fn has(&self, kind: ChangeKind) -> bool {
        self.changes.contains(&kind)
    }
}
