//! Checker test utilities

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use depwatch::checker::error::{CheckError, FetchError};
use depwatch::checker::traits::{Checker, CheckerMetadata};
use depwatch::checker::types::{AccessConfig, DependencySnapshot};

/// Scripted checker returning canned snapshots or errors per URL
pub struct FakeChecker {
    access_method: String,
    name: String,
    version: String,
    responses: HashMap<String, Result<DependencySnapshot, String>>,
    fail_initialize: bool,
    teardowns: Arc<AtomicUsize>,
}

impl FakeChecker {
    pub fn new(access_method: &str) -> Self {
        Self {
            access_method: access_method.to_string(),
            name: format!("fake-{}", access_method),
            version: "1.0.0".to_string(),
            responses: HashMap::new(),
            fail_initialize: false,
            teardowns: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_metadata(mut self, name: &str, version: &str) -> Self {
        self.name = name.to_string();
        self.version = version.to_string();
        self
    }

    pub fn with_snapshot(mut self, url: &str, snapshot: DependencySnapshot) -> Self {
        self.responses.insert(url.to_string(), Ok(snapshot));
        self
    }

    pub fn with_error(mut self, url: &str, message: &str) -> Self {
        self.responses.insert(url.to_string(), Err(message.to_string()));
        self
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Counter incremented each time `teardown` runs
    pub fn teardown_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.teardowns)
    }
}

#[async_trait]
impl Checker for FakeChecker {
    fn metadata(&self) -> CheckerMetadata {
        CheckerMetadata::new(&self.name, &self.version, &self.access_method)
    }

    async fn fetch(&self, config: &AccessConfig) -> Result<DependencySnapshot, CheckError> {
        match self.responses.get(&config.url) {
            Some(Ok(snapshot)) => Ok(snapshot.clone()),
            Some(Err(message)) => Err(CheckError::Parse(message.clone())),
            None => Err(FetchError::NotFound {
                url: config.url.clone(),
            }
            .into()),
        }
    }

    fn initialize(&self) -> Result<(), CheckError> {
        if self.fail_initialize {
            return Err(CheckError::Parse("credentials missing".to_string()));
        }
        Ok(())
    }

    fn teardown(&self) {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Snapshot with the given hash and optional version
pub fn snapshot(state_hash: &str, version: Option<&str>) -> DependencySnapshot {
    DependencySnapshot::new(state_hash, version.map(str::to_string))
}
