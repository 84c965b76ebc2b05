use std::future::Future;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use inventory_core::types::{CreateProductRequest, Product};

/// Operations of the query endpoint the page controller depends on.
pub trait ProductApi {
    /// Fetches the full current product set.
    fn list(&self) -> impl Future<Output = Result<Vec<Product>, ApiError>> + Send;

    /// Creates a product and returns the stored record.
    fn create(
        &self,
        request: &CreateProductRequest,
    ) -> impl Future<Output = Result<Product, ApiError>> + Send;
}

/// HTTP client for the inventory query endpoint.
///
/// `base_url` must end with a `/` so that endpoint paths are joined below it.
#[derive(Clone)]
pub struct InventoryClient {
    http: Client,
    base_url: Url,
}

impl InventoryClient {
    pub fn new(base_url: Url, http: Client) -> Self {
        Self { http, base_url }
    }

    /// Issues `GET api/get-products`.
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        let url = self.base_url.join("api/get-products")?;
        let response = self.http.get(url).send().await?;
        parse_json(response).await
    }

    /// Issues `POST api/create-product` with a JSON body.
    pub async fn create_product(
        &self,
        request: &CreateProductRequest,
    ) -> Result<Product, ApiError> {
        let url = self.base_url.join("api/create-product")?;
        let response = self.http.post(url).json(request).send().await?;
        parse_json(response).await
    }
}

impl ProductApi for InventoryClient {
    async fn list(&self) -> Result<Vec<Product>, ApiError> {
        self.list_products().await
    }

    async fn create(&self, request: &CreateProductRequest) -> Result<Product, ApiError> {
        self.create_product(request).await
    }
}

/// Errors produced by the inventory client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

async fn parse_json<T>(response: Response) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unavailable>"));
        return Err(ApiError::Status { status, body });
    }

    Ok(response.json().await?)
}
