//! Access method to checker mapping

use std::sync::{Arc, LazyLock, RwLock};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::checker::checkers::{
    ContentChecker, DocLibraryChecker, GitHubReleaseChecker, OpenApiChecker,
};
use crate::checker::error::RegistryError;
use crate::checker::traits::Checker;

/// Insertion-ordered set of checkers keyed by access method
///
/// Cloning shares the underlying checker instances.
#[derive(Clone, Default)]
pub struct CheckerRegistry {
    checkers: IndexMap<String, Arc<dyn Checker>>,
}

impl CheckerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a checker under its access method
    ///
    /// # Returns
    /// * `Ok(())` - The checker is now bound to its access method
    /// * `Err(RegistryError::DuplicateRegistration)` - The access method is already bound
    pub fn register(&mut self, checker: Arc<dyn Checker>) -> Result<(), RegistryError> {
        let access_method = checker.access_method();
        if self.checkers.contains_key(&access_method) {
            return Err(RegistryError::DuplicateRegistration(access_method));
        }

        info!("Registered checker for access method: {}", access_method);
        self.checkers.insert(access_method, checker);
        Ok(())
    }

    /// Remove the checker bound to `access_method`, running its teardown hook first.
    ///
    /// Returns false if nothing was registered.
    pub fn unregister(&mut self, access_method: &str) -> bool {
        let Some(checker) = self.checkers.get(access_method) else {
            return false;
        };

        checker.teardown();
        self.checkers.shift_remove(access_method);
        debug!("Unregistered checker for access method: {}", access_method);
        true
    }

    pub fn get(&self, access_method: &str) -> Option<Arc<dyn Checker>> {
        self.checkers.get(access_method).cloned()
    }

    pub fn contains(&self, access_method: &str) -> bool {
        self.checkers.contains_key(access_method)
    }

    /// Registered access methods in registration order
    pub fn access_methods(&self) -> Vec<String> {
        self.checkers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }
}

impl std::fmt::Debug for CheckerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckerRegistry")
            .field("access_methods", &self.access_methods())
            .finish()
    }
}

/// Create a fresh, empty registry
pub fn create_registry() -> CheckerRegistry {
    CheckerRegistry::new()
}

/// Create a fresh registry holding the built-in checkers
pub fn create_default_registry() -> CheckerRegistry {
    let builtins: [Arc<dyn Checker>; 4] = [
        Arc::new(GitHubReleaseChecker::default()),
        Arc::new(OpenApiChecker::default()),
        Arc::new(ContentChecker::default()),
        Arc::new(DocLibraryChecker::default()),
    ];

    let mut registry = CheckerRegistry::new();
    for checker in builtins {
        registry.checkers.insert(checker.access_method(), checker);
    }
    registry
}

static DEFAULT_REGISTRY: LazyLock<RwLock<CheckerRegistry>> =
    LazyLock::new(|| RwLock::new(create_default_registry()));

/// Process-wide registry seeded with the built-in checkers
pub fn default_registry() -> &'static RwLock<CheckerRegistry> {
    &DEFAULT_REGISTRY
}

/// Clone the current contents of the process-wide registry
pub fn default_registry_snapshot() -> Result<CheckerRegistry, RegistryError> {
    default_registry()
        .read()
        .map(|registry| registry.clone())
        .map_err(|_| RegistryError::LockPoisoned)
}
