//! Client-side form checks. Every request body is built here, so nothing
//! reaches the network without passing these rules.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::api::api_types::{NewProduct, NewTransaction, Product, ProductPatch, TransactionType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("Product Code is required.")]
  MissingCode,

  #[error("Quantity must be a whole number.")]
  InvalidNumber,

  #[error("Quantity cannot be negative.")]
  NegativeQuantity,

  #[error("Quantity cannot be empty.")]
  EmptyQuantity,

  #[error("Please select a product.")]
  NoProductSelected,

  #[error("Quantity must be greater than 0.")]
  NonPositiveQuantity,

  #[error("Insufficient stock: only {available} available.")]
  InsufficientStock { available: i64 },
}

/// Raw text from the product form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductInput {
  pub name: String,
  pub code: String,
  pub description: String,
  pub row: String,
  pub quantity: String,
}

impl ProductInput {
  /// Prefill from an existing product for editing.
  pub fn from_product(product: &Product) -> Self {
    Self {
      name: product.name.clone().unwrap_or_default(),
      code: product.code.clone(),
      description: product.description.clone().unwrap_or_default(),
      row: product.row.clone().unwrap_or_default(),
      quantity: product.quantity.to_string(),
    }
  }
}

fn optional(value: &str) -> Option<String> {
  let trimmed = value.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn required_code(code: &str) -> Result<String, ValidationError> {
  optional(code).ok_or(ValidationError::MissingCode)
}

fn parse_quantity(value: &str) -> Result<i64, ValidationError> {
  value
    .trim()
    .parse::<i64>()
    .map_err(|_| ValidationError::InvalidNumber)
}

pub fn validate_new_product(input: &ProductInput) -> Result<NewProduct, ValidationError> {
  let code = required_code(&input.code)?;

  if input.quantity.trim().is_empty() {
    return Err(ValidationError::EmptyQuantity);
  }
  let quantity = parse_quantity(&input.quantity)?;
  if quantity < 0 {
    return Err(ValidationError::NegativeQuantity);
  }
  if quantity == 0 {
    return Err(ValidationError::EmptyQuantity);
  }

  Ok(NewProduct {
    product_id: Uuid::new_v4().to_string(),
    name: optional(&input.name),
    code,
    description: optional(&input.description),
    row: optional(&input.row),
    quantity,
    created_at: Utc::now(),
  })
}

/// Build a partial update holding only the fields that differ from `original`.
///
/// Clearing an optional field sends it as an empty string.
pub fn validate_product_edit(
  original: &Product,
  input: &ProductInput,
) -> Result<ProductPatch, ValidationError> {
  let code = required_code(&input.code)?;

  let changed = |new: &str, old: Option<&String>| -> Option<String> {
    let new = new.trim();
    let old = old.map(|s| s.as_str()).unwrap_or("");
    (new != old).then(|| new.to_string())
  };

  let quantity = match input.quantity.trim() {
    "" => None,
    raw => {
      let quantity = parse_quantity(raw)?;
      if quantity < 0 {
        return Err(ValidationError::NegativeQuantity);
      }
      (quantity != original.quantity).then_some(quantity)
    }
  };

  Ok(ProductPatch {
    name: changed(&input.name, original.name.as_ref()),
    code: (code != original.code).then_some(code),
    description: changed(&input.description, original.description.as_ref()),
    row: changed(&input.row, original.row.as_ref()),
    quantity,
  })
}

pub fn validate_transaction(
  transaction_type: TransactionType,
  product: Option<&Product>,
  quantity: &str,
  remarks: &str,
) -> Result<NewTransaction, ValidationError> {
  let product = product.ok_or(ValidationError::NoProductSelected)?;

  let quantity = match quantity.trim() {
    "" => return Err(ValidationError::NonPositiveQuantity),
    raw => parse_quantity(raw)?,
  };
  if quantity <= 0 {
    return Err(ValidationError::NonPositiveQuantity);
  }

  if transaction_type == TransactionType::Sale && quantity > product.quantity {
    return Err(ValidationError::InsufficientStock {
      available: product.quantity,
    });
  }

  Ok(NewTransaction {
    transaction_id: Uuid::new_v4().to_string(),
    product_id: product.product_id.clone(),
    quantity,
    transaction_type,
    date: Utc::now(),
    remarks: optional(remarks),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn input(code: &str, quantity: &str) -> ProductInput {
    ProductInput {
      code: code.to_string(),
      quantity: quantity.to_string(),
      ..Default::default()
    }
  }

  fn stocked(quantity: i64) -> Product {
    Product {
      product_id: "p-1".to_string(),
      name: Some("Pen".to_string()),
      code: "PEN".to_string(),
      description: None,
      row: Some("A3".to_string()),
      quantity,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn test_new_product_requires_code() {
    assert_eq!(
      validate_new_product(&input("   ", "5")),
      Err(ValidationError::MissingCode)
    );
  }

  #[test]
  fn test_new_product_quantity_rules() {
    assert_eq!(
      validate_new_product(&input("A1", "-1")),
      Err(ValidationError::NegativeQuantity)
    );
    assert_eq!(
      validate_new_product(&input("A1", "0")),
      Err(ValidationError::EmptyQuantity)
    );
    assert_eq!(
      validate_new_product(&input("A1", "")),
      Err(ValidationError::EmptyQuantity)
    );
    assert_eq!(
      validate_new_product(&input("A1", "five")),
      Err(ValidationError::InvalidNumber)
    );
  }

  #[test]
  fn test_new_product_body() {
    let mut form = input(" A1 ", "5");
    form.name = "  ".to_string();
    form.row = "B2".to_string();

    let product = validate_new_product(&form).unwrap();
    assert_eq!(product.code, "A1");
    assert_eq!(product.quantity, 5);
    assert_eq!(product.name, None);
    assert_eq!(product.row.as_deref(), Some("B2"));
    assert!(Uuid::parse_str(&product.product_id).is_ok());
  }

  #[test]
  fn test_edit_sends_only_changes() {
    let original = stocked(10);
    let mut form = ProductInput::from_product(&original);
    form.name = "Blue Pen".to_string();
    form.row = String::new();

    let patch = validate_product_edit(&original, &form).unwrap();
    assert_eq!(patch.name.as_deref(), Some("Blue Pen"));
    assert_eq!(patch.row.as_deref(), Some(""));
    assert_eq!(patch.code, None);
    assert_eq!(patch.description, None);
    assert_eq!(patch.quantity, None);
  }

  #[test]
  fn test_edit_rules() {
    let original = stocked(10);

    let mut form = ProductInput::from_product(&original);
    form.code = String::new();
    assert_eq!(
      validate_product_edit(&original, &form),
      Err(ValidationError::MissingCode)
    );

    let mut form = ProductInput::from_product(&original);
    form.quantity = "-4".to_string();
    assert_eq!(
      validate_product_edit(&original, &form),
      Err(ValidationError::NegativeQuantity)
    );

    let mut form = ProductInput::from_product(&original);
    form.quantity = "0".to_string();
    assert_eq!(validate_product_edit(&original, &form).unwrap().quantity, Some(0));
  }

  #[test]
  fn test_transaction_rules() {
    let product = stocked(2);

    assert_eq!(
      validate_transaction(TransactionType::Sale, None, "1", ""),
      Err(ValidationError::NoProductSelected)
    );
    assert_eq!(
      validate_transaction(TransactionType::Sale, Some(&product), "0", ""),
      Err(ValidationError::NonPositiveQuantity)
    );
    assert_eq!(
      validate_transaction(TransactionType::Sale, Some(&product), "3", ""),
      Err(ValidationError::InsufficientStock { available: 2 })
    );
    assert_eq!(
      validate_transaction(TransactionType::Return, Some(&product), "x", ""),
      Err(ValidationError::InvalidNumber)
    );
  }

  #[test]
  fn test_return_ignores_stock() {
    let product = stocked(0);
    let tx =
      validate_transaction(TransactionType::Return, Some(&product), "7", " damaged ").unwrap();
    assert_eq!(tx.quantity, 7);
    assert_eq!(tx.product_id, "p-1");
    assert_eq!(tx.transaction_type, TransactionType::Return);
    assert_eq!(tx.remarks.as_deref(), Some("damaged"));
  }
}
