//! GitHub repository release checker with latest-commit fallback

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use url::Url;

use crate::checker::error::{CheckError, FetchError};
use crate::checker::hash::fingerprint;
use crate::checker::http::{build_client, check_response};
use crate::checker::rate_limit::{RateLimitStatus, RateLimitTracker};
use crate::checker::traits::{Checker, CheckerMetadata};
use crate::checker::types::{
    ACCESS_METHOD_GITHUB, AccessConfig, ChangeDetection, ChangeKind, DependencySnapshot,
    ReleaseMetadata, ReleaseSource, SnapshotMetadata,
};

/// Default base URL for GitHub API
const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Requests kept in hand before the advisory budget reports "not safe"
const RATE_LIMIT_RESERVE: u64 = 5;

/// Response from GitHub "latest release" API
#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    name: Option<String>,
    published_at: Option<String>,
}

/// Element of the GitHub commits list
#[derive(Debug, Deserialize)]
struct Commit {
    sha: String,
    commit: Option<CommitDetail>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    committer: Option<CommitSignature>,
}

#[derive(Debug, Deserialize)]
struct CommitSignature {
    date: Option<String>,
}

fn is_github_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("github.com") || host.eq_ignore_ascii_case("www.github.com")
}

/// Resolve `(owner, repo)` from a repository URL.
///
/// Accepts `https://github.com/owner/repo[.git][/...]`, `git@github.com:owner/repo.git`
/// and the `owner/repo` shorthand.
pub fn parse_repository(url: &str) -> Result<(String, String), CheckError> {
    let invalid = || CheckError::InvalidUrl(url.to_string());
    let trimmed = url.trim();

    let path = if let Some(rest) = trimmed.strip_prefix("git@") {
        rest.split_once(':')
            .filter(|(host, _)| is_github_host(host))
            .map(|(_, path)| path.to_string())
    } else if let Ok(parsed) = Url::parse(trimmed) {
        parsed
            .host_str()
            .filter(|host| is_github_host(host))
            .map(|_| parsed.path().to_string())
    } else if !trimmed.contains("://") && trimmed.matches('/').count() == 1 {
        Some(trimmed.to_string())
    } else {
        None
    };
    let path = path.ok_or_else(invalid)?;

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next().ok_or_else(invalid)?;
    let repo = segments.next().ok_or_else(invalid)?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);

    if owner.is_empty() || repo.is_empty() {
        return Err(invalid());
    }

    Ok((owner.to_string(), repo.to_string()))
}

/// Checker implementation for GitHub repositories
pub struct GitHubReleaseChecker {
    client: reqwest::Client,
    base_url: String,
    rate_limits: RateLimitTracker,
}

impl GitHubReleaseChecker {
    /// Creates a new GitHubReleaseChecker with a custom API base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limits: RateLimitTracker::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        config: &AccessConfig,
    ) -> Result<T, CheckError> {
        let request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        let response = config.authorize(request).send().await?;

        self.rate_limits.record_headers(&response);
        let response = check_response(response, url)?;

        response.json().await.map_err(|e| {
            warn!("Failed to parse GitHub response from {}: {}", url, e);
            CheckError::Parse(e.to_string())
        })
    }

    fn release_snapshot(release: Release) -> DependencySnapshot {
        let state_hash = fingerprint(&[
            Some(release.tag_name.as_str()),
            release.name.as_deref(),
            release.published_at.as_deref(),
        ]);

        DependencySnapshot::new(state_hash, Some(release.tag_name.clone())).with_metadata(
            SnapshotMetadata::Release(ReleaseMetadata {
                source: ReleaseSource::Release,
                tag_name: Some(release.tag_name),
                name: release.name,
                published_at: release.published_at,
                commit_sha: None,
            }),
        )
    }

    async fn fetch_latest_commit(
        &self,
        config: &AccessConfig,
        owner: &str,
        repo: &str,
    ) -> Result<DependencySnapshot, CheckError> {
        let url = format!("{}/repos/{}/{}/commits?per_page=1", self.base_url, owner, repo);
        let commits: Vec<Commit> = self.get_json(&url, config).await?;

        let commit = commits
            .into_iter()
            .next()
            .ok_or(FetchError::NotFound { url })?;

        let committed_at = commit
            .commit
            .and_then(|c| c.committer)
            .and_then(|c| c.date);

        Ok(DependencySnapshot::new(commit.sha.clone(), None).with_metadata(
            SnapshotMetadata::Release(ReleaseMetadata {
                source: ReleaseSource::Commit,
                tag_name: None,
                name: None,
                published_at: committed_at,
                commit_sha: Some(commit.sha),
            }),
        ))
    }
}

impl Default for GitHubReleaseChecker {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl Checker for GitHubReleaseChecker {
    fn metadata(&self) -> CheckerMetadata {
        CheckerMetadata::new("github-release", env!("CARGO_PKG_VERSION"), ACCESS_METHOD_GITHUB)
            .with_description("Latest GitHub release, falling back to the latest commit")
    }

    async fn fetch(&self, config: &AccessConfig) -> Result<DependencySnapshot, CheckError> {
        let (owner, repo) = parse_repository(&config.url)?;
        let url = format!("{}/repos/{}/{}/releases/latest", self.base_url, owner, repo);

        match self.get_json::<Release>(&url, config).await {
            Ok(release) => Ok(Self::release_snapshot(release)),
            Err(CheckError::Fetch(FetchError::NotFound { .. })) => {
                info!(
                    "No releases for {}/{}, falling back to latest commit",
                    owner, repo
                );
                self.fetch_latest_commit(config, &owner, &repo).await
            }
            Err(e) => Err(e),
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

        if previous.state_hash != current.state_hash {
            changes.push(ChangeKind::StateHash);
        }

        ChangeDetection::from_changes(
            changes,
            previous.version.as_deref(),
            current.version.as_deref(),
        )
    }

    fn rate_limit_status(&self, now: DateTime<Utc>) -> Option<RateLimitStatus> {
        self.rate_limits
            .budget()
            .map(|_| self.rate_limits.status(now, RATE_LIMIT_RESERVE))
    }
}
