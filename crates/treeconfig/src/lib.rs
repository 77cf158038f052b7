//! treeconfig - CI config resolution over a source tree
//!
//! Resolves the effective CI pipeline definition for a repository change
//! event by discovering, validating, and merging config fragments
//! scattered across the tree:
//! - Picks a discovery strategy per event (ancestor walk over changed
//!   files, or a bounded recursive full scan)
//! - Optionally narrows discovery through a consider manifest
//! - Validates each candidate against a minimal schema
//! - Merges accepted fragments into one multi-document YAML stream, with
//!   dependency injection for a designated `finalize` fragment
//! - Caches the outcome per request fingerprint with a TTL
//!
//! Source-control backends are consumed through the [`scm::ScmClient`]
//! capability interface; transports and concrete network backends live
//! outside this crate.

pub mod allowlist;
pub mod cache;
pub mod combine;
pub mod consider;
mod discovery;
pub mod error;
pub mod fakes;
pub mod fragment;
pub mod request;
pub mod resolver;
pub mod scm;

// Re-export key types
pub use cache::{CacheKey, CachedOutcome, ResultCache};
pub use combine::Combiner;
pub use consider::ConsiderManifest;
pub use error::{ResolveError, ResolveResult, ScmError, ScmResult};
pub use fragment::{Candidate, LoadedFragment, FINALIZE_NAME};
pub use request::{Repo, ResolutionRequest, CRON_TRIGGER, ZERO_REVISION};
pub use resolver::{Resolver, ResolverConfig};
pub use scm::{EntryKind, FileEntry, ScmClient};
