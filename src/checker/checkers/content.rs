//! Generic HTTP content checker

use crate::checker::error::CheckError;
use crate::checker::hash::sha256_hex;
use crate::checker::http::{build_client, check_response, content_type};
use crate::checker::normalizer::normalize;
use crate::checker::traits::{Checker, CheckerMetadata};
use crate::checker::types::{
    ACCESS_METHOD_HTTP, AccessConfig, ContentMetadata, DependencySnapshot, SnapshotMetadata,
};

/// Checker implementation hashing normalized page content
pub struct ContentChecker {
    client: reqwest::Client,
}

impl ContentChecker {
    pub fn new() -> Self {
        Self {
            client: build_client(),
        }
    }
}

impl Default for ContentChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Checker for ContentChecker {
    fn metadata(&self) -> CheckerMetadata {
        CheckerMetadata::new("http-content", env!("CARGO_PKG_VERSION"), ACCESS_METHOD_HTTP)
            .with_description("Hash of normalized page content")
    }

    async fn fetch(&self, config: &AccessConfig) -> Result<DependencySnapshot, CheckError> {
        let request = self.client.get(&config.url);
        let response = config.authorize(request).send().await?;
        let response = check_response(response, &config.url)?;

        let content_type = content_type(&response);
        let body = response.text().await?;
        let normalized = normalize(&body);

        Ok(DependencySnapshot::new(sha256_hex(&normalized), None).with_metadata(
            SnapshotMetadata::Content(ContentMetadata {
                content_type,
                normalized_length: normalized.len(),
            }),
        ))
    }
}
