//! Query cache with tag-based invalidation.
//!
//! This module provides a resource-agnostic caching mechanism that:
//! - Stores the last fetched result per query key
//! - Deduplicates concurrent fetches of the same key
//! - Invalidates every query sharing a tag when a mutation succeeds
//! - Keeps prior data visible while a refetch is pending or has failed

mod layer;
mod tags;
mod traits;

pub use layer::QueryCache;
pub use tags::Tag;
pub use traits::{EntrySnapshot, QueryKey, QueryStatus, SharedError};
