//! Pure helpers that derive view data from fetched collections.

use crate::api::api_types::{Product, Transaction, TransactionTotal, TransactionType};

/// Products at or below this quantity count as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// Products below this quantity are highlighted as critical.
pub const CRITICAL_STOCK_THRESHOLD: i64 = 5;

/// Products with `quantity <= LOW_STOCK_THRESHOLD`, in input order.
pub fn low_stock(products: &[Product]) -> Vec<&Product> {
  products
    .iter()
    .filter(|p| p.quantity <= LOW_STOCK_THRESHOLD)
    .collect()
}

pub fn is_critical(product: &Product) -> bool {
  product.quantity < CRITICAL_STOCK_THRESHOLD
}

fn contains_ci(field: Option<&str>, needle: &str) -> bool {
  field
    .map(|value| value.to_lowercase().contains(needle))
    .unwrap_or(false)
}

pub fn product_matches(product: &Product, term: &str) -> bool {
  let needle = term.trim().to_lowercase();
  if needle.is_empty() {
    return true;
  }

  contains_ci(product.name.as_deref(), &needle)
    || contains_ci(Some(product.code.as_str()), &needle)
    || contains_ci(product.description.as_deref(), &needle)
}

/// Case-insensitive substring search over name, code and description.
///
/// An empty (or all-whitespace) term matches everything.
pub fn search_products<'a>(products: &'a [Product], term: &str) -> Vec<&'a Product> {
  products
    .iter()
    .filter(|p| product_matches(p, term))
    .collect()
}

pub fn transaction_matches(transaction: &Transaction, term: &str) -> bool {
  let needle = term.trim().to_lowercase();
  if needle.is_empty() {
    return true;
  }

  let product = transaction.product.as_ref();
  contains_ci(product.and_then(|p| p.name.as_deref()), &needle)
    || contains_ci(product.map(|p| p.code.as_str()), &needle)
    || contains_ci(Some(transaction.transaction_type.as_str()), &needle)
}

/// Search transactions by embedded product name or code, or by type.
pub fn search_transactions<'a>(
  transactions: &'a [Transaction],
  term: &str,
) -> Vec<&'a Transaction> {
  transactions
    .iter()
    .filter(|t| transaction_matches(t, term))
    .collect()
}

/// Quantity totals per transaction type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionTotals {
  pub sale: i64,
  pub returned: i64,
}

impl TransactionTotals {
  pub fn from_transactions(transactions: &[Transaction]) -> Self {
    transactions
      .iter()
      .fold(Self::default(), |mut totals, tx| {
        match tx.transaction_type {
          TransactionType::Sale => totals.sale = totals.sale.saturating_add(tx.quantity),
          TransactionType::Return => {
            totals.returned = totals.returned.saturating_add(tx.quantity)
          }
        }
        totals
      })
  }

  /// Totals from the dashboard's `{type, quantity}` list. Unknown types are ignored.
  pub fn from_metric_totals(totals: &[TransactionTotal]) -> Self {
    totals.iter().fold(Self::default(), |mut acc, total| {
      if total.kind.eq_ignore_ascii_case(TransactionType::Sale.as_str()) {
        acc.sale = acc.sale.saturating_add(total.quantity);
      } else if total.kind.eq_ignore_ascii_case(TransactionType::Return.as_str()) {
        acc.returned = acc.returned.saturating_add(total.quantity);
      }
      acc
    })
  }

  pub fn total(&self) -> i64 {
    self.sale.saturating_add(self.returned)
  }

  pub fn sale_percentage(&self) -> u32 {
    sale_percentage(self.sale, self.returned)
  }
}

/// `sale / (sale + returned) * 100`, rounded; 0 when both are zero.
pub fn sale_percentage(sale: i64, returned: i64) -> u32 {
  let total = sale.saturating_add(returned);
  if total <= 0 {
    return 0;
  }
  let pct = (sale as f64 / total as f64 * 100.0).round();
  pct.clamp(0.0, 100.0) as u32
}
