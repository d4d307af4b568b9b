//! Latest released version lookup.
//!
//! [`VersionCache`] fronts a rate-limited remote API with a lazily refreshed
//! in-memory value. [`GithubTagsFetcher`] is the production source.

mod cache;
mod fetcher;

pub use cache::{CachedVersion, VersionCache, DEFAULT_TTL};
pub use fetcher::{
    parse_latest_tag, strip_version_prefix, FetchError, GithubTagsFetcher, VersionFetcher,
};
