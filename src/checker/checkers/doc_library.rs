//! Documentation library checker backed by a documentation metadata service
//!
//! Falls back to fetching the documentation page directly when the service
//! doesn't know the library, is failing, or returns an unexpected body.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::checker::error::CheckError;
use crate::checker::hash::{fingerprint, sha256_hex};
use crate::checker::http::{build_client, check_response};
use crate::checker::traits::{Checker, CheckerMetadata};
use crate::checker::types::{
    ACCESS_METHOD_DOC_LIBRARY, AccessConfig, ChangeDetection, ChangeKind, DependencySnapshot,
    DocLibraryMetadata, DocSource, SnapshotMetadata,
};

/// Default base URL for the documentation metadata service
const DEFAULT_BASE_URL: &str = "https://context7.com";

/// Version reported when a directly fetched page carries no recognizable version
pub const UNKNOWN_VERSION: &str = "unknown";

static PAGE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bv(?:ersion)?["']?\s*[:=]?\s*["']?(\d+\.\d+(?:\.\d+)?(?:-[0-9A-Za-z.]+)?)"#)
        .unwrap()
});

/// Response from the documentation metadata service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibraryInfo {
    id: String,
    name: String,
    version: String,
    last_updated: String,
    description: String,
    #[serde(default)]
    content_hash: Option<String>,
}

impl LibraryInfo {
    fn is_valid(&self) -> bool {
        !self.id.trim().is_empty() && !self.version.trim().is_empty()
    }
}

fn path_id(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    (!segments.is_empty()).then(|| format!("/{}", segments.join("/")))
}

/// Resolve a library identifier from a dependency URL.
///
/// - `/org/project` is used as-is
/// - URLs on the metadata service host use their path
/// - GitHub repository URLs map to `/owner/repo`
/// - any other URL maps to `/{host}/{first path segment}` (or `/{host}`)
pub fn resolve_library_id(url: &str, service_host: Option<&str>) -> Result<String, CheckError> {
    let invalid = || CheckError::InvalidUrl(url.to_string());
    let trimmed = url.trim();

    if trimmed.starts_with('/') {
        return path_id(trimmed).ok_or_else(invalid);
    }

    let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
    let host = parsed.host_str().ok_or_else(invalid)?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    if service_host.is_some_and(|service| service.strip_prefix("www.").unwrap_or(service) == host) {
        return path_id(parsed.path()).ok_or_else(invalid);
    }

    let mut segments = parsed.path().split('/').filter(|s| !s.is_empty());

    if host == "github.com" {
        return match (segments.next(), segments.next()) {
            (Some(owner), Some(repo)) => Ok(format!(
                "/{}/{}",
                owner,
                repo.strip_suffix(".git").unwrap_or(repo)
            )),
            _ => Err(invalid()),
        };
    }

    Ok(match segments.next() {
        Some(first) => format!("/{}/{}", host, first),
        None => format!("/{}", host),
    })
}

/// Best-effort version extraction from a documentation page
pub fn extract_page_version(body: &str) -> String {
    PAGE_VERSION
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
}

/// Checker implementation for documentation libraries
pub struct DocLibraryChecker {
    client: reqwest::Client,
    base_url: String,
}

impl DocLibraryChecker {
    /// Creates a new DocLibraryChecker with a custom metadata service base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn service_host(&self) -> Option<String> {
        Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    /// Query the metadata service.
    ///
    /// Returns `Ok(None)` when the service is unavailable for this library
    /// (not found, 5xx, or a body failing validation); other failures propagate.
    async fn query_service(
        &self,
        config: &AccessConfig,
        library_id: &str,
    ) -> Result<Option<LibraryInfo>, CheckError> {
        let url = format!("{}/api/v1{}", self.base_url, library_id);
        let request = self.client.get(&url).header("Accept", "application/json");
        let response = config.authorize(request).send().await?;

        let response = match check_response(response, &url) {
            Ok(response) => response,
            Err(e) if e.is_unavailable() => {
                warn!("Documentation service unavailable for {}: {}", library_id, e);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let body = response.text().await?;
        match serde_json::from_str::<LibraryInfo>(&body) {
            Ok(info) if info.is_valid() => Ok(Some(info)),
            Ok(_) => {
                warn!("Documentation service returned empty id or version for {}", library_id);
                Ok(None)
            }
            Err(e) => {
                warn!("Documentation service response for {} failed validation: {}", library_id, e);
                Ok(None)
            }
        }
    }

    async fn fetch_direct(
        &self,
        config: &AccessConfig,
        library_id: &str,
    ) -> Result<DependencySnapshot, CheckError> {
        let page_url = Url::parse(&config.url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| {
                CheckError::InvalidUrl(format!("{}: no page to fetch directly", config.url))
            })?;

        info!("Fetching {} directly for {}", page_url, library_id);

        let response = self.client.get(page_url.as_str()).send().await?;
        let response = check_response(response, &config.url)?;
        let body = response.text().await?;

        Ok(
            DependencySnapshot::new(sha256_hex(&body), Some(extract_page_version(&body)))
                .with_metadata(SnapshotMetadata::DocLibrary(DocLibraryMetadata {
                    library_id: library_id.to_string(),
                    source: DocSource::DirectFetch,
                    name: None,
                    description: None,
                    last_updated: None,
                })),
        )
    }

    fn service_snapshot(info: LibraryInfo) -> DependencySnapshot {
        let state_hash = info.content_hash.clone().unwrap_or_else(|| {
            fingerprint(&[
                Some(info.id.as_str()),
                Some(info.version.as_str()),
                Some(info.last_updated.as_str()),
            ])
        });

        DependencySnapshot::new(state_hash, Some(info.version)).with_metadata(
            SnapshotMetadata::DocLibrary(DocLibraryMetadata {
                library_id: info.id,
                source: DocSource::Service,
                name: Some(info.name),
                description: Some(info.description),
                last_updated: Some(info.last_updated),
            }),
        )
    }
}

impl Default for DocLibraryChecker {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl Checker for DocLibraryChecker {
    fn metadata(&self) -> CheckerMetadata {
        CheckerMetadata::new("doc-library", env!("CARGO_PKG_VERSION"), ACCESS_METHOD_DOC_LIBRARY)
            .with_description("Documentation library version and content via metadata service")
    }

    async fn fetch(&self, config: &AccessConfig) -> Result<DependencySnapshot, CheckError> {
        let library_id = resolve_library_id(&config.url, self.service_host().as_deref())?;

        match self.query_service(config, &library_id).await? {
            Some(info) => Ok(Self::service_snapshot(info)),
            None => self.fetch_direct(config, &library_id).await,
        }
    }

    fn compare(
        &self,
        previous: &DependencySnapshot,
        current: &DependencySnapshot,
    ) -> ChangeDetection {
        let mut changes = Vec::new();

        if let (Some(old), Some(new)) = (&previous.version, &current.version) {
            if old != new {
                changes.push(ChangeKind::Version);
            }
        }

        if previous.state_hash != current.state_hash && !changes.contains(&ChangeKind::Version) {
            changes.push(ChangeKind::Content);
        }

        if let (SnapshotMetadata::DocLibrary(old), SnapshotMetadata::DocLibrary(new)) =
            (&previous.metadata, &current.metadata)
        {
            if let (Some(old), Some(new)) = (&old.last_updated, &new.last_updated) {
                if old != new {
                    changes.push(ChangeKind::LastUpdated);
                }
            }
        }

        ChangeDetection::from_changes(
            changes,
            previous.version.as_deref(),
            current.version.as_deref(),
        )
    }
}
