//! Plugin validation and initialization
//!
//! Third-party checkers pass through the loader before registration so that
//! a malformed plugin is rejected at configuration time, not mid-check.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::info;

use crate::checker::error::{PluginViolation, RegistryError};
use crate::checker::registry::CheckerRegistry;
use crate::checker::traits::Checker;

static ACCESS_METHOD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]*$").unwrap());

/// Whether `access_method` is a valid access method identifier
pub fn is_valid_access_method(access_method: &str) -> bool {
    ACCESS_METHOD_PATTERN.is_match(access_method)
}

/// Validates and optionally initializes checker plugins
#[derive(Debug, Clone)]
pub struct PluginLoader {
    auto_initialize: bool,
}

impl PluginLoader {
    pub fn new(auto_initialize: bool) -> Self {
        Self { auto_initialize }
    }

    /// Check a checker's declared metadata against the plugin schema
    pub fn validate(&self, checker: &dyn Checker) -> Result<(), RegistryError> {
        let metadata = checker.metadata();
        let plugin = if metadata.name.trim().is_empty() {
            metadata.access_method.clone()
        } else {
            metadata.name.clone()
        };
        let invalid = |violation| RegistryError::InvalidPlugin {
            plugin: plugin.clone(),
            violation,
        };

        if metadata.name.trim().is_empty() {
            return Err(invalid(PluginViolation::MissingField("name")));
        }
        if metadata.version.trim().is_empty() {
            return Err(invalid(PluginViolation::MissingField("version")));
        }
        if ::semver::Version::parse(&metadata.version).is_err() {
            return Err(invalid(PluginViolation::InvalidVersion(metadata.version)));
        }
        if metadata.access_method.is_empty() {
            return Err(invalid(PluginViolation::MissingField("access_method")));
        }
        if !is_valid_access_method(&metadata.access_method) {
            return Err(invalid(PluginViolation::InvalidAccessMethod(
                metadata.access_method,
            )));
        }

        let actual = checker.access_method();
        if actual != metadata.access_method {
            return Err(invalid(PluginViolation::AccessMethodMismatch {
                declared: metadata.access_method,
                actual,
            }));
        }

        Ok(())
    }

    /// Validate a checker, then run its initialization hook if auto-initialization is on
    pub fn load(&self, checker: Arc<dyn Checker>) -> Result<Arc<dyn Checker>, RegistryError> {
        self.validate(checker.as_ref())?;

        if self.auto_initialize {
            checker
                .initialize()
                .map_err(|e| RegistryError::InvalidPlugin {
                    plugin: checker.metadata().name,
                    violation: PluginViolation::Initialization(e.to_string()),
                })?;
        }

        info!(
            "Loaded checker plugin {} for access method {}",
            checker.metadata().name,
            checker.access_method()
        );
        Ok(checker)
    }

    /// Construct a checker from `args` with `ctor`, then load it
    pub fn instantiate<A, C, F>(&self, ctor: F, args: A) -> Result<Arc<dyn Checker>, RegistryError>
    where
        F: FnOnce(A) -> C,
        C: Checker + 'static,
    {
        self.load(Arc::new(ctor(args)))
    }

    /// Load a checker and register it
    pub fn load_into(
        &self,
        registry: &mut CheckerRegistry,
        checker: Arc<dyn Checker>,
    ) -> Result<(), RegistryError> {
        let checker = self.load(checker)?;
        registry.register(checker)
    }
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::checkers::GitHubReleaseChecker;
    use crate::checker::error::CheckError;
    use crate::checker::registry::create_registry;
    use crate::checker::traits::{CheckerMetadata, MockChecker};
    use rstest::rstest;

    fn mock_with(metadata: CheckerMetadata, actual_method: &str) -> MockChecker {
        let mut mock = MockChecker::new();
        let actual = actual_method.to_string();
        mock.expect_metadata().returning(move || metadata.clone());
        mock.expect_access_method()
            .returning(move || actual.clone());
        mock
    }

    fn valid_mock() -> MockChecker {
        mock_with(CheckerMetadata::new("custom", "1.0.0", "custom"), "custom")
    }

    #[rstest]
    #[case("custom")]
    #[case("doc_library")]
    #[case("my-api2")]
    fn is_valid_access_method_accepts_identifiers(#[case] method: &str) {
        assert!(is_valid_access_method(method));
    }

    #[rstest]
    #[case("")]
    #[case("Custom")]
    #[case("2fast")]
    #[case("has space")]
    #[case("-leading")]
    fn is_valid_access_method_rejects_malformed_identifiers(#[case] method: &str) {
        assert!(!is_valid_access_method(method));
    }

    #[test]
    fn validate_accepts_builtin_checker() {
        let loader = PluginLoader::default();

        assert!(loader.validate(&GitHubReleaseChecker::default()).is_ok());
    }

    #[rstest]
    #[case(CheckerMetadata::new("", "1.0.0", "custom"), "custom", "name")]
    #[case(CheckerMetadata::new("custom", "", "custom"), "custom", "version")]
    #[case(CheckerMetadata::new("custom", "1.0.0", ""), "", "access_method")]
    fn validate_rejects_missing_fields(
        #[case] metadata: CheckerMetadata,
        #[case] actual: &str,
        #[case] field: &str,
    ) {
        let loader = PluginLoader::default();

        let result = loader.validate(&mock_with(metadata, actual));

        assert!(matches!(
            result,
            Err(RegistryError::InvalidPlugin {
                violation: PluginViolation::MissingField(name),
                ..
            }) if name == field
        ));
    }

    #[rstest]
    #[case("1.0")]
    #[case("latest")]
    fn validate_rejects_non_semver_version(#[case] version: &str) {
        let loader = PluginLoader::default();
        let checker = mock_with(CheckerMetadata::new("custom", version, "custom"), "custom");

        assert!(matches!(
            loader.validate(&checker),
            Err(RegistryError::InvalidPlugin {
                violation: PluginViolation::InvalidVersion(_),
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_malformed_access_method() {
        let loader = PluginLoader::default();
        let checker = mock_with(CheckerMetadata::new("custom", "1.0.0", "Bad Method"), "Bad Method");

        assert!(matches!(
            loader.validate(&checker),
            Err(RegistryError::InvalidPlugin {
                violation: PluginViolation::InvalidAccessMethod(_),
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_mismatched_entry_point() {
        let loader = PluginLoader::default();
        let checker = mock_with(CheckerMetadata::new("custom", "1.0.0", "custom"), "other");

        let result = loader.validate(&checker);

        match result {
            Err(RegistryError::InvalidPlugin {
                plugin,
                violation: PluginViolation::AccessMethodMismatch { declared, actual },
            }) => {
                assert_eq!(plugin, "custom");
                assert_eq!(declared, "custom");
                assert_eq!(actual, "other");
            }
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[test]
    fn load_runs_initialize_when_auto_initialize_is_on() {
        let mut checker = valid_mock();
        checker.expect_initialize().times(1).returning(|| Ok(()));

        let result = PluginLoader::new(true).load(Arc::new(checker));

        assert!(result.is_ok());
    }

    #[test]
    fn load_skips_initialize_when_auto_initialize_is_off() {
        let mut checker = valid_mock();
        checker.expect_initialize().never();

        let result = PluginLoader::new(false).load(Arc::new(checker));

        assert!(result.is_ok());
    }

    #[test]
    fn load_reports_initialization_failure() {
        let mut checker = valid_mock();
        checker
            .expect_initialize()
            .returning(|| Err(CheckError::Parse("missing credentials".to_string())));

        let result = PluginLoader::default().load(Arc::new(checker));

        assert!(matches!(
            result,
            Err(RegistryError::InvalidPlugin {
                violation: PluginViolation::Initialization(message),
                ..
            }) if message.contains("missing credentials")
        ));
    }

    #[test]
    fn load_does_not_initialize_invalid_plugin() {
        let mut checker = mock_with(CheckerMetadata::new("custom", "x", "custom"), "custom");
        checker.expect_initialize().never();

        assert!(PluginLoader::default().load(Arc::new(checker)).is_err());
    }

    #[test]
    fn instantiate_constructs_and_loads() {
        let loader = PluginLoader::default();

        let checker = loader
            .instantiate(|base_url: &str| GitHubReleaseChecker::new(base_url), "http://localhost")
            .unwrap();

        assert_eq!(checker.access_method(), "github");
    }

    #[test]
    fn load_into_registers_valid_plugin() {
        let mut registry = create_registry();
        let mut checker = valid_mock();
        checker.expect_initialize().returning(|| Ok(()));

        PluginLoader::default()
            .load_into(&mut registry, Arc::new(checker))
            .unwrap();

        assert!(registry.contains("custom"));
    }

    #[test]
    fn load_into_leaves_registry_untouched_on_violation() {
        let mut registry = create_registry();
        let checker = mock_with(CheckerMetadata::new("custom", "1.0.0", "custom"), "other");

        let result = PluginLoader::default().load_into(&mut registry, Arc::new(checker));

        assert!(result.is_err());
        assert!(registry.is_empty());
    }
}
