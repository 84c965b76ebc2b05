use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use metrics::counter;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use inventory_core::types::{CreateProductRequest, Product};
use inventory_storage::ProductError;

use crate::problem::ProblemResponse;
use crate::router::AppState;

/// `GET /api/get-products`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ProblemResponse> {
    let products = load_products(&state, "list").await?;
    Ok(Json(products))
}

/// `GET /api/trpc/product.getAll`, the query-layer read of the whole store.
pub async fn get_all(State(state): State<AppState>) -> Result<Json<Value>, ProblemResponse> {
    let products = load_products(&state, "get_all").await?;
    Ok(Json(json!({ "result": { "data": products } })))
}

/// `POST /api/create-product`
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ProblemResponse> {
    let Json(request) = payload.map_err(|rejection| {
        record("create", "invalid_body");
        ProblemResponse::new(
            StatusCode::BAD_REQUEST,
            "invalid_body",
            rejection.body_text(),
        )
    })?;

    let product = create_product(&state, &request).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Validates and stores a create request, mapping each rejection to its problem.
pub async fn create_product(
    state: &AppState,
    request: &CreateProductRequest,
) -> Result<Product, ProblemResponse> {
    let new_product = request.validate().map_err(|err| {
        record("create", "invalid");
        warn!(stage = "api", name = %request.name, error = %err, "product rejected");
        ProblemResponse::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_product",
            err.to_string(),
        )
    })?;

    match state
        .storage()
        .products()
        .insert(&new_product, state.now())
        .await
    {
        Ok(product) => {
            record("create", "ok");
            info!(stage = "api", id = %product.id, name = %product.name, "product created");
            Ok(product)
        }
        Err(ProductError::DuplicateName(name)) => {
            record("create", "duplicate");
            Err(ProblemResponse::new(
                StatusCode::CONFLICT,
                "duplicate_product",
                format!("a product named '{name}' already exists"),
            ))
        }
        Err(err) => {
            record("create", "error");
            error!(stage = "storage", error = %err, "failed to insert product");
            Err(storage_problem())
        }
    }
}

/// Reads the whole product store, mapping failures to a problem response.
pub async fn load_products(
    state: &AppState,
    op: &'static str,
) -> Result<Vec<Product>, ProblemResponse> {
    match state.storage().products().list().await {
        Ok(products) => {
            record(op, "ok");
            Ok(products)
        }
        Err(err) => {
            record(op, "error");
            error!(stage = "storage", op, error = %err, "failed to list products");
            Err(storage_problem())
        }
    }
}

fn storage_problem() -> ProblemResponse {
    ProblemResponse::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "storage_error",
        "the product store is unavailable",
    )
}

fn record(op: &'static str, result: &'static str) {
    counter!("api_products_requests_total", "op" => op, "result" => result).increment(1);
}
