//! Serde types matching the inventory API's JSON payloads.
//!
//! Field names follow the API's camelCase convention. Timestamps are RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Products
// ============================================================================

/// A catalog product as returned by `/products` and embedded elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub product_id: String,
  #[serde(default)]
  pub name: Option<String>,
  pub code: String,
  #[serde(default)]
  pub description: Option<String>,
  /// Shelf/row location label
  #[serde(default)]
  pub row: Option<String>,
  pub quantity: i64,
  pub created_at: DateTime<Utc>,
}

impl Product {
  /// Name for display, falling back to the product code.
  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or(&self.code)
  }
}

/// Body of `POST /products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
  pub product_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  pub code: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub row: Option<String>,
  pub quantity: i64,
  pub created_at: DateTime<Utc>,
}

/// Body of `PUT /products/{productId}`. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub row: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub quantity: Option<i64>,
}

// ============================================================================
// Transactions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
  /// Stock leaves the store for the shop
  Sale,
  /// Stock comes back to the store
  Return,
}

impl TransactionType {
  pub fn as_str(&self) -> &'static str {
    match self {
      TransactionType::Sale => "sale",
      TransactionType::Return => "return",
    }
  }

  /// Past-tense label used in activity lists
  pub fn verb(&self) -> &'static str {
    match self {
      TransactionType::Sale => "Sold",
      TransactionType::Return => "Returned",
    }
  }
}

impl fmt::Display for TransactionType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A recorded stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
  pub transaction_id: String,
  #[serde(default)]
  pub product_id: Option<String>,
  pub quantity: i64,
  pub transaction_type: TransactionType,
  pub date: DateTime<Utc>,
  #[serde(default)]
  pub remarks: Option<String>,
  /// Product as it was when the transaction was read. Missing once the
  /// product has been deleted.
  #[serde(default)]
  pub product: Option<Product>,
}

/// Body of `POST /transactions/AddtoShop` and `POST /transactions/AddtoStore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
  pub transaction_id: String,
  pub product_id: String,
  pub quantity: i64,
  pub transaction_type: TransactionType,
  pub date: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub remarks: Option<String>,
}

// ============================================================================
// Dashboard
// ============================================================================

/// Server-side quantity total for one transaction type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTotal {
  #[serde(rename = "type")]
  pub kind: String,
  pub quantity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
  #[serde(default)]
  pub low_products: Vec<Product>,
  #[serde(default)]
  pub last_transactions: Vec<Transaction>,
  #[serde(default)]
  pub total_transactions_quantity: Vec<TransactionTotal>,
  #[serde(default)]
  pub total_product_quantity: i64,
}
