use crate::api::api_types::{
  DashboardMetrics, NewProduct, NewTransaction, Product, ProductPatch, Transaction,
};
use crate::api::error::ApiError;
use crate::config::Config;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// A single request against the inventory API.
///
/// Paths are stored as segments so path parameters (product ids) are
/// percent-encoded individually when the URL is built.
#[derive(Debug, Clone)]
pub struct ApiRequest {
  method: Method,
  segments: Vec<String>,
  body: Option<Value>,
}

impl ApiRequest {
  fn new(method: Method, path: &str) -> Self {
    Self {
      method,
      segments: path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect(),
      body: None,
    }
  }

  pub fn get(path: &str) -> Self {
    Self::new(Method::GET, path)
  }

  pub fn delete(path: &str) -> Self {
    Self::new(Method::DELETE, path)
  }

  pub fn post<B: Serialize>(path: &str, body: &B) -> Result<Self, ApiError> {
    Self::new(Method::POST, path).with_body(body)
  }

  pub fn put<B: Serialize>(path: &str, body: &B) -> Result<Self, ApiError> {
    Self::new(Method::PUT, path).with_body(body)
  }

  /// Append a path parameter, e.g. a product id.
  pub fn with_param(mut self, param: &str) -> Self {
    self.segments.push(param.to_string());
    self
  }

  fn with_body<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
    let value = serde_json::to_value(body).map_err(|source| ApiError::Encode {
      path: self.path(),
      source,
    })?;
    self.body = Some(value);
    Ok(self)
  }

  pub fn method(&self) -> &Method {
    &self.method
  }

  /// Unencoded path, used for logging and error messages.
  pub fn path(&self) -> String {
    format!("/{}", self.segments.join("/"))
  }
}

/// Inventory REST API client
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
}

impl std::fmt::Debug for ApiClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ApiClient")
      .field("base_url", &self.base_url.as_str())
      .finish_non_exhaustive()
  }
}

impl ApiClient {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
    let invalid = |reason: String| ApiError::InvalidUrl {
      url: base_url.to_string(),
      reason,
    };

    let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    if parsed.cannot_be_a_base() {
      return Err(invalid("URL cannot carry a path".to_string()));
    }

    let http = reqwest::Client::builder()
      .user_agent(concat!("i9s/", env!("CARGO_PKG_VERSION")))
      .timeout(timeout)
      .build()
      .map_err(ApiError::Network)?;

    Ok(Self {
      http,
      base_url: parsed,
    })
  }

  pub fn from_config(config: &Config) -> Result<Self, ApiError> {
    Self::new(&config.api.base_url, config.api.timeout())
  }

  pub fn base_url(&self) -> &str {
    self.base_url.as_str()
  }

  /// Execute a request and parse the response body as `T`.
  pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
    let body = self.send(&request).await?;
    serde_json::from_str(&body).map_err(|source| ApiError::Decode {
      path: request.path(),
      source,
    })
  }

  /// Execute a request whose response body is ignored.
  pub async fn execute_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
    self.send(&request).await.map(|_| ())
  }

  async fn send(&self, request: &ApiRequest) -> Result<String, ApiError> {
    let url = self.url_for(&request.segments)?;
    debug!(method = %request.method, %url, "sending request");

    let mut builder = self.http.request(request.method.clone(), url);
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder.send().await.map_err(|e| {
      warn!(method = %request.method, path = %request.path(), error = %e, "request failed");
      ApiError::Network(e)
    })?;

    let status = response.status();
    let text = response.text().await.map_err(ApiError::Network)?;

    if !status.is_success() {
      warn!(
        method = %request.method,
        path = %request.path(),
        status = status.as_u16(),
        "request rejected"
      );
      return Err(ApiError::HttpStatus {
        status: status.as_u16(),
        message: error_message(&text, status.canonical_reason()),
      });
    }

    Ok(text)
  }

  fn url_for(&self, segments: &[String]) -> Result<Url, ApiError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| ApiError::InvalidUrl {
        url: self.base_url.to_string(),
        reason: "URL cannot carry a path".to_string(),
      })?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  // ==========================================================================
  // Endpoints
  // ==========================================================================

  pub async fn get_dashboard_metrics(&self) -> Result<DashboardMetrics, ApiError> {
    self.execute(ApiRequest::get("/dashboard")).await
  }

  pub async fn get_products(&self) -> Result<Vec<Product>, ApiError> {
    self.execute(ApiRequest::get("/products")).await
  }

  pub async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
    self
      .execute(ApiRequest::post("/products", product)?)
      .await
  }

  pub async fn edit_product(
    &self,
    product_id: &str,
    patch: &ProductPatch,
  ) -> Result<Product, ApiError> {
    self
      .execute(ApiRequest::put("/products", patch)?.with_param(product_id))
      .await
  }

  pub async fn delete_product(&self, product_id: &str) -> Result<(), ApiError> {
    self
      .execute_empty(ApiRequest::delete("/products").with_param(product_id))
      .await
  }

  pub async fn get_transactions(&self) -> Result<Vec<Transaction>, ApiError> {
    self.execute(ApiRequest::get("/transactions")).await
  }

  /// Record a sale (stock moves to the shop)
  pub async fn record_sale(&self, transaction: &NewTransaction) -> Result<Transaction, ApiError> {
    self
      .execute(ApiRequest::post("/transactions/AddtoShop", transaction)?)
      .await
  }

  /// Record a return (stock moves back to the store)
  pub async fn record_return(
    &self,
    transaction: &NewTransaction,
  ) -> Result<Transaction, ApiError> {
    self
      .execute(ApiRequest::post("/transactions/AddtoStore", transaction)?)
      .await
  }
}

/// Pull a readable message out of an error response body.
fn error_message(body: &str, reason: Option<&str>) -> String {
  if let Ok(value) = serde_json::from_str::<Value>(body) {
    for field in ["message", "error"] {
      if let Some(msg) = value.get(field).and_then(|v| v.as_str()) {
        return msg.to_string();
      }
    }
  }

  let trimmed = body.trim();
  if !trimmed.is_empty() {
    return trimmed.chars().take(200).collect();
  }

  reason.unwrap_or("unknown error").to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::api_types::TransactionType;
  use chrono::Utc;
  use serde_json::json;
  use wiremock::matchers::{body_partial_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
  }

  fn product_json(id: &str, code: &str, quantity: i64) -> Value {
    json!({
      "productId": id,
      "name": "Widget",
      "code": code,
      "quantity": quantity,
      "createdAt": "2024-05-01T10:00:00Z"
    })
  }

  #[test]
  fn test_request_path_segments() {
    let req = ApiRequest::get("/transactions/AddtoShop/");
    assert_eq!(req.path(), "/transactions/AddtoShop");
    assert_eq!(req.method(), &Method::GET);

    let req = ApiRequest::delete("/products").with_param("p-1");
    assert_eq!(req.path(), "/products/p-1");
  }

  #[test]
  fn test_unencodable_body_is_an_encode_error() {
    // JSON object keys must be strings
    let body: std::collections::BTreeMap<Vec<u8>, u8> = [(vec![1], 1)].into_iter().collect();

    match ApiRequest::post("/products", &body) {
      Err(ApiError::Encode { path, .. }) => assert_eq!(path, "/products"),
      other => panic!("expected an encode error, got {:?}", other.map(|r| r.path())),
    }
  }

  #[test]
  fn test_invalid_base_url() {
    let err = ApiClient::new("not a url", Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, ApiError::InvalidUrl { .. }));

    let err = ApiClient::new("mailto:shop@example.com", Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, ApiError::InvalidUrl { .. }));
  }

  #[test]
  fn test_url_keeps_base_path_prefix() {
    let client = ApiClient::new("http://localhost:8000/api/", Duration::from_secs(1)).unwrap();
    let url = client
      .url_for(&["products".to_string(), "p 1/2".to_string()])
      .unwrap();
    assert_eq!(url.as_str(), "http://localhost:8000/api/products/p%201%2F2");

    let client = ApiClient::new("http://localhost:8000", Duration::from_secs(1)).unwrap();
    let url = client.url_for(&["dashboard".to_string()]).unwrap();
    assert_eq!(url.as_str(), "http://localhost:8000/dashboard");
  }

  #[test]
  fn test_error_message_extraction() {
    assert_eq!(
      error_message(r#"{"message":"Product not found"}"#, Some("Not Found")),
      "Product not found"
    );
    assert_eq!(error_message(r#"{"error":"boom"}"#, None), "boom");
    assert_eq!(error_message("  plain text  ", None), "plain text");
    assert_eq!(error_message("", Some("Bad Gateway")), "Bad Gateway");
  }

  #[tokio::test]
  async fn test_get_products() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/products"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        product_json("p-1", "A1", 5),
        product_json("p-2", "B2", 12),
      ])))
      .expect(1)
      .mount(&server)
      .await;

    let products = client_for(&server).get_products().await.unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].code, "A1");
    assert_eq!(products[1].quantity, 12);
  }

  #[tokio::test]
  async fn test_http_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
      .and(path("/products/missing"))
      .respond_with(
        ResponseTemplate::new(404).set_body_json(json!({ "message": "Product not found" })),
      )
      .mount(&server)
      .await;

    let err = client_for(&server)
      .delete_product("missing")
      .await
      .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "server returned 404: Product not found");
  }

  #[tokio::test]
  async fn test_network_error_when_no_server() {
    let client = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
    let err = client.get_products().await.unwrap_err();
    assert!(err.is_network(), "expected network error, got {err:?}");
  }

  #[tokio::test]
  async fn test_decode_error_on_unexpected_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/dashboard"))
      .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
      .mount(&server)
      .await;

    let err = client_for(&server)
      .get_dashboard_metrics()
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Decode { ref path, .. } if path == "/dashboard"));
  }

  #[tokio::test]
  async fn test_record_sale_posts_to_shop_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/transactions/AddtoShop"))
      .and(body_partial_json(json!({
        "productId": "p-1",
        "quantity": 3,
        "transactionType": "sale"
      })))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({
        "transactionId": "t-1",
        "productId": "p-1",
        "quantity": 3,
        "transactionType": "sale",
        "date": "2024-05-01T10:00:00Z"
      })))
      .expect(1)
      .mount(&server)
      .await;

    let tx = client_for(&server)
      .record_sale(&NewTransaction {
        transaction_id: "t-1".to_string(),
        product_id: "p-1".to_string(),
        quantity: 3,
        transaction_type: TransactionType::Sale,
        date: Utc::now(),
        remarks: None,
      })
      .await
      .unwrap();
    assert_eq!(tx.transaction_id, "t-1");
    assert_eq!(tx.transaction_type, TransactionType::Sale);
  }

  #[tokio::test]
  async fn test_edit_product_puts_partial_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
      .and(path("/products/p-1"))
      .and(body_partial_json(json!({ "row": "R7" })))
      .respond_with(ResponseTemplate::new(200).set_body_json(product_json("p-1", "A1", 5)))
      .expect(1)
      .mount(&server)
      .await;

    let patch = ProductPatch {
      row: Some("R7".to_string()),
      ..Default::default()
    };
    let product = client_for(&server)
      .edit_product("p-1", &patch)
      .await
      .unwrap();
    assert_eq!(product.product_id, "p-1");
  }
}
