//! Cached inventory client that routes reads and writes through the query cache.

use std::future::Future;
use std::sync::Arc;

use crate::cache::{QueryCache, SharedError, Tag};
use crate::query::Query;

use super::api_types::{
  DashboardMetrics, NewProduct, NewTransaction, Product, ProductPatch, Transaction,
};
use super::cache::ApiQueryKey;
use super::client::ApiClient;
use super::error::ApiError;

/// Inventory client with transparent caching support.
///
/// Reads are cached per endpoint. Writes invalidate the tags they touch once
/// they succeed, and every mounted `Query` built here picks that up on its
/// next poll.
#[derive(Clone, Debug)]
pub struct CachedApiClient {
  inner: ApiClient,
  cache: QueryCache,
}

impl CachedApiClient {
  pub fn new(inner: ApiClient, cache: QueryCache) -> Self {
    Self { inner, cache }
  }

  pub fn base_url(&self) -> &str {
    self.inner.base_url()
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  pub async fn dashboard_metrics(&self) -> Result<Arc<DashboardMetrics>, SharedError> {
    let inner = self.inner.clone();
    self
      .cache
      .query(&ApiQueryKey::DashboardMetrics, || async move {
        inner.get_dashboard_metrics().await
      })
      .await
  }

  pub async fn products(&self) -> Result<Arc<Vec<Product>>, SharedError> {
    let inner = self.inner.clone();
    self
      .cache
      .query(&ApiQueryKey::Products, || async move {
        inner.get_products().await
      })
      .await
  }

  pub async fn transactions(&self) -> Result<Arc<Vec<Transaction>>, SharedError> {
    let inner = self.inner.clone();
    self
      .cache
      .query(&ApiQueryKey::Transactions, || async move {
        inner.get_transactions().await
      })
      .await
  }

  // ==========================================================================
  // Subscriptions
  // ==========================================================================

  pub fn dashboard_query(&self) -> Query<DashboardMetrics> {
    self.subscribe(ApiQueryKey::DashboardMetrics, |api| async move {
      api.dashboard_metrics().await
    })
  }

  pub fn products_query(&self) -> Query<Vec<Product>> {
    self.subscribe(ApiQueryKey::Products, |api| async move {
      api.products().await
    })
  }

  pub fn transactions_query(&self) -> Query<Vec<Transaction>> {
    self.subscribe(ApiQueryKey::Transactions, |api| async move {
      api.transactions().await
    })
  }

  /// Build a query that reads `key` through the cache and refetches whenever
  /// the entry is invalidated.
  fn subscribe<T, F, Fut>(&self, key: ApiQueryKey, fetch: F) -> Query<T>
  where
    T: Send + Sync + 'static,
    F: Fn(CachedApiClient) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Arc<T>, SharedError>> + Send + 'static,
  {
    let api = self.clone();
    let cache = self.cache.clone();

    Query::new(move || {
      let pending = fetch(api.clone());
      async move { pending.await.map_err(|e| e.to_string()) }
    })
    .with_revision(move || cache.revision(&key))
  }

  // ==========================================================================
  // Writes
  // ==========================================================================

  pub async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
    self
      .cache
      .mutate(&[Tag::Products], || self.inner.create_product(product))
      .await
  }

  pub async fn edit_product(
    &self,
    product_id: &str,
    patch: &ProductPatch,
  ) -> Result<Product, ApiError> {
    self
      .cache
      .mutate(&[Tag::Products], || self.inner.edit_product(product_id, patch))
      .await
  }

  pub async fn delete_product(&self, product_id: &str) -> Result<(), ApiError> {
    self
      .cache
      .mutate(&[Tag::Products], || self.inner.delete_product(product_id))
      .await
  }

  pub async fn record_sale(&self, transaction: &NewTransaction) -> Result<Transaction, ApiError> {
    self
      .cache
      .mutate(&[Tag::Transaction], || self.inner.record_sale(transaction))
      .await
  }

  pub async fn record_return(
    &self,
    transaction: &NewTransaction,
  ) -> Result<Transaction, ApiError> {
    self
      .cache
      .mutate(&[Tag::Transaction], || self.inner.record_return(transaction))
      .await
  }

  // ==========================================================================
  // Cache control
  // ==========================================================================

  /// Mark every query providing `tags` as stale. Returns how many were marked.
  pub fn refresh(&self, tags: &[Tag]) -> usize {
    self.cache.invalidate(tags)
  }

  /// Forget all cached data (used on logout).
  pub fn clear_cache(&self) {
    self.cache.clear();
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::api_types::{TransactionTotal, TransactionType};
  use crate::derived::{self, TransactionTotals};
  use chrono::Utc;
  use std::collections::HashMap;
  use std::sync::Mutex;
  use std::time::Duration;
  use wiremock::matchers::any;
  use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

  /// In-memory stand-in for the inventory backend.
  #[derive(Default)]
  struct ShopState {
    products: Vec<Product>,
    transactions: Vec<Transaction>,
    reads: HashMap<String, usize>,
  }

  #[derive(Clone, Default)]
  struct FakeShop {
    state: Arc<Mutex<ShopState>>,
  }

  impl FakeShop {
    fn reads(&self, path: &str) -> usize {
      let state = self.state.lock().unwrap();
      state.reads.get(path).copied().unwrap_or(0)
    }

    fn dashboard(state: &ShopState) -> DashboardMetrics {
      let mut totals: Vec<TransactionTotal> = Vec::new();
      for tx in &state.transactions {
        match totals.iter_mut().find(|t| t.kind == tx.transaction_type.as_str()) {
          Some(total) => total.quantity += tx.quantity,
          None => totals.push(TransactionTotal {
            kind: tx.transaction_type.as_str().to_string(),
            quantity: tx.quantity,
          }),
        }
      }

      DashboardMetrics {
        low_products: state
          .products
          .iter()
          .filter(|p| p.quantity <= 5)
          .cloned()
          .collect(),
        last_transactions: state.transactions.iter().rev().cloned().collect(),
        total_transactions_quantity: totals,
        total_product_quantity: state.products.iter().map(|p| p.quantity).sum(),
      }
    }

    fn transact(state: &mut ShopState, request: &Request) -> ResponseTemplate {
      let Ok(mut tx) = request.body_json::<Transaction>() else {
        return ResponseTemplate::new(400).set_body_json(serde_json::json!({"message": "bad body"}));
      };
      let Some(product) = state
        .products
        .iter_mut()
        .find(|p| Some(&p.product_id) == tx.product_id.as_ref())
      else {
        return ResponseTemplate::new(404)
          .set_body_json(serde_json::json!({"message": "Product not found"}));
      };

      match tx.transaction_type {
        TransactionType::Sale if product.quantity < tx.quantity => {
          return ResponseTemplate::new(400)
            .set_body_json(serde_json::json!({"message": "Insufficient stock"}));
        }
        TransactionType::Sale => product.quantity -= tx.quantity,
        TransactionType::Return => product.quantity += tx.quantity,
      }

      tx.product = Some(product.clone());
      state.transactions.push(tx.clone());
      ResponseTemplate::new(201).set_body_json(&tx)
    }
  }

  impl Respond for FakeShop {
    fn respond(&self, request: &Request) -> ResponseTemplate {
      let mut state = self.state.lock().unwrap();
      let path = request.url.path().to_string();
      let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

      match (request.method.as_str(), segments.as_slice()) {
        ("GET", _) => {
          *state.reads.entry(path.clone()).or_default() += 1;
          match segments.as_slice() {
            ["dashboard"] => ResponseTemplate::new(200).set_body_json(Self::dashboard(&state)),
            ["products"] => ResponseTemplate::new(200).set_body_json(&state.products),
            ["transactions"] => ResponseTemplate::new(200).set_body_json(&state.transactions),
            _ => ResponseTemplate::new(404),
          }
        }
        ("POST", ["products"]) => match request.body_json::<Product>() {
          Ok(product) => {
            state.products.push(product.clone());
            ResponseTemplate::new(201).set_body_json(&product)
          }
          Err(_) => ResponseTemplate::new(400),
        },
        ("POST", ["transactions", "AddtoShop" | "AddtoStore"]) => {
          Self::transact(&mut state, request)
        }
        ("PUT", ["products", id]) => {
          let Ok(patch) = request.body_json::<ProductPatch>() else {
            return ResponseTemplate::new(400);
          };
          match state.products.iter_mut().find(|p| p.product_id == *id) {
            Some(product) => {
              if let Some(code) = patch.code {
                product.code = code;
              }
              if patch.name.is_some() {
                product.name = patch.name;
              }
              ResponseTemplate::new(200).set_body_json(&*product)
            }
            None => ResponseTemplate::new(404),
          }
        }
        ("DELETE", ["products", id]) => {
          let before = state.products.len();
          state.products.retain(|p| p.product_id != *id);
          if state.products.len() == before {
            ResponseTemplate::new(404)
              .set_body_json(serde_json::json!({"message": "Product not found"}))
          } else {
            ResponseTemplate::new(204)
          }
        }
        _ => ResponseTemplate::new(405),
      }
    }
  }

  async fn setup() -> (MockServer, FakeShop, CachedApiClient) {
    let server = MockServer::start().await;
    let shop = FakeShop::default();
    Mock::given(any())
      .respond_with(shop.clone())
      .mount(&server)
      .await;

    let inner = ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let client = CachedApiClient::new(inner, QueryCache::new());
    (server, shop, client)
  }

  fn new_product(code: &str, quantity: i64) -> NewProduct {
    NewProduct {
      product_id: uuid::Uuid::new_v4().to_string(),
      name: Some("Widget".to_string()),
      code: code.to_string(),
      description: None,
      row: None,
      quantity,
      created_at: Utc::now(),
    }
  }

  fn new_transaction(
    product_id: &str,
    quantity: i64,
    transaction_type: TransactionType,
  ) -> NewTransaction {
    NewTransaction {
      transaction_id: uuid::Uuid::new_v4().to_string(),
      product_id: product_id.to_string(),
      quantity,
      transaction_type,
      date: Utc::now(),
      remarks: None,
    }
  }

  #[tokio::test]
  async fn test_reads_are_cached() {
    let (_server, shop, client) = setup().await;

    client.products().await.unwrap();
    client.products().await.unwrap();
    assert_eq!(shop.reads("/products"), 1);
  }

  #[tokio::test]
  async fn test_create_then_sale_updates_every_view() {
    let (_server, shop, client) = setup().await;

    assert!(client.products().await.unwrap().is_empty());
    client.dashboard_metrics().await.unwrap();
    client.transactions().await.unwrap();

    let created = client.create_product(&new_product("A1", 5)).await.unwrap();

    let products = client.products().await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].code, "A1");
    assert_eq!(products[0].quantity, 5);

    client
      .record_sale(&new_transaction(&created.product_id, 3, TransactionType::Sale))
      .await
      .unwrap();

    let metrics = client.dashboard_metrics().await.unwrap();
    let low = derived::low_stock(&metrics.low_products);
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].quantity, 2);

    let totals = TransactionTotals::from_metric_totals(&metrics.total_transactions_quantity);
    assert_eq!(totals.sale, 3);
    assert_eq!(totals.returned, 0);

    let transactions = client.transactions().await.unwrap();
    assert_eq!(TransactionTotals::from_transactions(&transactions).sale, 3);

    assert_eq!(client.products().await.unwrap()[0].quantity, 2);
    assert_eq!(shop.reads("/dashboard"), 2);
    assert_eq!(shop.reads("/products"), 3);
  }

  #[tokio::test]
  async fn test_failed_mutation_keeps_cache() {
    let (_server, shop, client) = setup().await;
    client.products().await.unwrap();
    let revision = client.cache().revision(&ApiQueryKey::Products);

    let err = client.delete_product("missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));

    assert_eq!(client.cache().revision(&ApiQueryKey::Products), revision);
    client.products().await.unwrap();
    assert_eq!(shop.reads("/products"), 1);
  }

  #[tokio::test]
  async fn test_rejected_sale_does_not_invalidate() {
    let (_server, shop, client) = setup().await;
    let created = client.create_product(&new_product("B2", 1)).await.unwrap();
    client.products().await.unwrap();

    let err = client
      .record_sale(&new_transaction(&created.product_id, 4, TransactionType::Sale))
      .await
      .unwrap_err();
    assert!(err.to_string().contains("Insufficient stock"));

    client.products().await.unwrap();
    assert_eq!(shop.reads("/products"), 1);
  }

  #[tokio::test]
  async fn test_refresh_forces_refetch() {
    let (_server, shop, client) = setup().await;
    client.transactions().await.unwrap();

    assert_eq!(client.refresh(&[Tag::Transaction]), 1);
    client.transactions().await.unwrap();
    assert_eq!(shop.reads("/transactions"), 2);
  }

  #[tokio::test]
  async fn test_query_follows_invalidation() {
    let (_server, _shop, client) = setup().await;
    let mut query = client.products_query();
    query.fetch();

    tokio::time::sleep(Duration::from_millis(100)).await;
    query.poll();
    assert_eq!(query.data().map(|p| p.len()), Some(0));

    client.create_product(&new_product("C3", 9)).await.unwrap();
    assert!(query.poll());

    tokio::time::sleep(Duration::from_millis(100)).await;
    query.poll();
    assert_eq!(query.data().map(|p| p.len()), Some(1));
  }

  #[tokio::test]
  async fn test_dropped_write_still_invalidates() {
    use crate::query::Mutation;
    use wiremock::matchers::{method, path};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/products"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
      .mount(&server)
      .await;
    Mock::given(method("DELETE"))
      .and(path("/products/p-1"))
      .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(200)))
      .expect(1)
      .mount(&server)
      .await;

    let client = ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let api = CachedApiClient::new(client, QueryCache::new());
    api.products().await.unwrap();
    assert!(!api.cache().is_stale(&ApiQueryKey::Products));

    let mut delete: Mutation<()> = Mutation::default();
    let writer = api.clone();
    assert!(delete.start(async move {
      writer.delete_product("p-1").await.map_err(|e| e.to_string())
    }));

    // The view goes away while the request is on the wire
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(delete);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(api.cache().is_stale(&ApiQueryKey::Products));
  }
}
