//! Inventory API client and its cached wrapper.

pub mod api_types;
mod cache;
mod cached_client;
mod client;
mod error;

pub use cache::ApiQueryKey;
pub use cached_client::CachedApiClient;
pub use client::{ApiClient, ApiRequest};
pub use error::ApiError;
