//! Built-in checker implementations, one per access method

pub mod content;
pub mod doc_library;
pub mod github;
pub mod openapi;

pub use content::ContentChecker;
pub use doc_library::DocLibraryChecker;
pub use github::GitHubReleaseChecker;
pub use openapi::OpenApiChecker;
