//! Query keys for the inventory API.

use crate::cache::{QueryKey, Tag};

/// Query key types for API reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiQueryKey {
  /// `GET /dashboard`
  DashboardMetrics,
  /// `GET /products`
  Products,
  /// `GET /transactions`
  Transactions,
}

impl QueryKey for ApiQueryKey {
  fn cache_key(&self) -> String {
    match self {
      Self::DashboardMetrics => "dashboard",
      Self::Products => "products",
      Self::Transactions => "transactions",
    }
    .to_string()
  }

  fn tags(&self) -> &'static [Tag] {
    match self {
      Self::DashboardMetrics => &[Tag::DashboardMetrics],
      Self::Products => &[Tag::Products],
      Self::Transactions => &[Tag::Transaction],
    }
  }

  fn description(&self) -> String {
    match self {
      Self::DashboardMetrics => "dashboard metrics",
      Self::Products => "product list",
      Self::Transactions => "transaction list",
    }
    .to_string()
  }
}
