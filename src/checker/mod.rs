//! Dependency checking layer
//!
//! Fetches the current state of a remote resource, reduces it to a
//! snapshot, and diffs snapshots to detect and classify changes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Loader    │────▶│  Registry   │────▶│   Checker   │
//! │ (validate)  │     │ (by method) │     │(fetch/diff) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                          ┌─────────────────────┼─────────────────────┐
//!                          ▼                     ▼                     ▼
//!                   ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!                   │ Normalizer  │       │ Comparator  │       │  Severity   │
//!                   │  (content)  │       │   (diff)    │       │ (classify)  │
//!                   └─────────────┘       └─────────────┘       └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`checkers`]: Built-in checkers (GitHub releases, OpenAPI, HTTP content, doc libraries)
//! - [`comparator`]: Default snapshot comparison
//! - [`error`]: Error types for fetches, checks and plugin registration
//! - [`hash`]: State hashing helpers
//! - [`http`]: Shared HTTP client and response status mapping
//! - [`loader`]: Plugin validation and initialization
//! - [`normalizer`]: Noise stripping for content hashing
//! - [`rate_limit`]: Advisory API quota tracking
//! - [`registry`]: Access method to checker mapping
//! - [`semver`]: Lenient version parsing and bump detection
//! - [`severity`]: Change severity classification
//! - [`traits`]: The `Checker` trait
//! - [`types`]: Snapshots, change detections and access configuration

pub mod checkers;
pub mod comparator;
pub mod error;
pub mod hash;
pub mod http;
pub mod loader;
pub mod normalizer;
pub mod rate_limit;
pub mod registry;
pub mod semver;
pub mod severity;
pub mod traits;
pub mod types;
