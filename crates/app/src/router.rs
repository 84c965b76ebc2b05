use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use inventory_storage::Database;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::{page, products, telemetry};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    storage: Database,
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, storage: Database) -> Self {
        Self {
            metrics,
            storage,
            clock: Arc::new(Utc::now),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn storage(&self) -> &Database {
        &self.storage
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(page::index).post(page::submit))
        .route("/cart", post(page::cart))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/api/get-products", get(products::list))
        .route("/api/create-product", post(products::create))
        .route("/api/trpc/product.getAll", get(products::get_all))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        Body::from(body),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Request};
    use axum::response::Response;
    use chrono::TimeZone;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use inventory_client::{InventoryClient, PageController};
    use inventory_core::draft::{DraftForm, ValidationPolicy};

    async fn setup_state() -> AppState {
        let metrics = telemetry::init_metrics().expect("metrics init");

        let database = Database::connect("sqlite::memory:?cache=shared")
            .await
            .expect("connect");
        database.run_migrations().await.expect("migrations");

        AppState::new(metrics, database).with_clock(Arc::new(|| {
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
                .single()
                .expect("valid timestamp")
        }))
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone()
            .oneshot(request)
            .await
            .expect("handler should respond")
    }

    fn create_request(body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/create-product")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn form_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        String::from_utf8(body_bytes(response).await).expect("utf-8")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .expect("body should read")
            .to_bytes()
            .to_vec()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).expect("json body")
    }

    fn gadget() -> Value {
        json!({ "name": "Gadget", "description": "x", "price": 19.99, "inventory": 3 })
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = app_router(setup_state().await);
        let response = send(&app, get_request("/healthz")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let app = app_router(setup_state().await);
        send(&app, get_request("/api/get-products")).await;

        let response = send(&app, get_request("/metrics")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = String::from_utf8(body_bytes(response).await).expect("utf-8");
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
        assert!(body.contains("api_products_requests_total"));
    }

    #[tokio::test]
    async fn get_products_is_empty_initially() {
        let app = app_router(setup_state().await);
        let response = send(&app, get_request("/api/get-products")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn create_then_list_returns_server_order() {
        let app = app_router(setup_state().await);

        let widget = json!({ "name": "Widget", "description": "A widget", "price": 9.99, "inventory": 5 });
        let response = send(&app, create_request(widget)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["name"], "Widget");
        assert_eq!(created["price"], json!(9.99));
        assert_eq!(created["created_at"], "2024-01-01T12:00:00Z");
        assert!(created["id"].as_str().is_some_and(|id| !id.is_empty()));

        let response = send(&app, create_request(gadget())).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let listed = body_json(send(&app, get_request("/api/get-products")).await).await;
        let names: Vec<_> = listed
            .as_array()
            .expect("array")
            .iter()
            .map(|product| product["name"].as_str().expect("name"))
            .collect();
        assert_eq!(names, ["Widget", "Gadget"]);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let app = app_router(setup_state().await);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/create-product")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\":"))
            .unwrap();

        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/problem+json"
        );
        assert_eq!(body_json(response).await["type"], "invalid_body");
    }

    #[tokio::test]
    async fn invalid_numbers_are_unprocessable() {
        let app = app_router(setup_state().await);

        let cases = [
            json!({ "name": "Gadget", "description": "x", "price": null, "inventory": 3 }),
            json!({ "name": "Gadget", "description": "x", "price": -1.5, "inventory": 3 }),
            json!({ "name": "Gadget", "description": "x", "price": 1.0, "inventory": -3 }),
            json!({ "name": " ", "description": "x", "price": 1.0, "inventory": 3 }),
        ];
        for body in cases {
            let response = send(&app, create_request(body)).await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(body_json(response).await["type"], "invalid_product");
        }

        let listed = body_json(send(&app, get_request("/api/get-products")).await).await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn duplicate_name_conflicts() {
        let app = app_router(setup_state().await);
        send(&app, create_request(gadget())).await;

        let response = send(&app, create_request(gadget())).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["type"], "duplicate_product");
    }

    #[tokio::test]
    async fn trpc_get_all_wraps_products() {
        let app = app_router(setup_state().await);
        send(&app, create_request(gadget())).await;

        let response = send(&app, get_request("/api/trpc/product.getAll")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["result"]["data"][0]["name"], "Gadget");
        assert_eq!(body["result"]["data"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn index_renders_initial_product_list() {
        let app = app_router(setup_state().await);

        let html = String::from_utf8(body_bytes(send(&app, get_request("/")).await).await)
            .expect("utf-8");
        assert!(html.contains("No products yet"));

        send(&app, create_request(gadget())).await;
        let response = send(&app, get_request("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(response).await).expect("utf-8");
        assert!(html.contains("<td>Gadget</td><td>$19.99</td><td>3</td>"));
        assert!(!html.contains("No products yet"));
    }

    #[tokio::test]
    async fn index_controls_post_to_live_routes() {
        let app = app_router(setup_state().await);
        send(&app, create_request(gadget())).await;

        let html = body_text(send(&app, get_request("/")).await).await;
        assert!(html.contains("<form id=\"create-product\" method=\"post\" action=\"/\">"));
        assert!(html.contains("<form method=\"post\" action=\"/cart\">"));
        assert!(!html.contains("data-endpoint"));
    }

    #[tokio::test]
    async fn form_submit_creates_and_rerenders() {
        let app = app_router(setup_state().await);

        let response = send(
            &app,
            form_request("/", "name=Widget&description=A+widget&price=9.99&inventory=5&cart="),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<td>Widget</td><td>$9.99</td><td>5</td>"));
        assert!(html.contains("name=\"name\" value=\"\""), "draft is reset");
        assert!(!html.contains("class=\"banner\""));

        let listed = body_json(send(&app, get_request("/api/get-products")).await).await;
        assert_eq!(listed[0]["name"], "Widget");
    }

    #[tokio::test]
    async fn form_submit_rejections_keep_the_draft() {
        let app = app_router(setup_state().await);

        let response = send(
            &app,
            form_request("/", "name=Gadget&description=x&price=abc&inventory=3"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("price &#39;abc&#39; is not a number"));
        assert!(html.contains("name=\"name\" value=\"Gadget\""));
        assert!(html.contains("No products yet"));

        send(&app, create_request(gadget())).await;
        let response = send(
            &app,
            form_request("/", "name=Gadget&description=x&price=1&inventory=3"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let html = body_text(response).await;
        assert!(html.contains("a product named &#39;Gadget&#39; already exists"));
        assert!(html.contains("name=\"price\" value=\"1\""));
    }

    #[tokio::test]
    async fn cart_form_adds_and_removes_entries() {
        let app = app_router(setup_state().await);
        let widget = body_json(
            send(
                &app,
                create_request(
                    json!({ "name": "Widget", "description": "A widget", "price": 9.99, "inventory": 5 }),
                ),
            )
            .await,
        )
        .await;
        let gadget = body_json(send(&app, create_request(gadget())).await).await;
        let widget_id = widget["id"].as_str().expect("widget id");
        let gadget_id = gadget["id"].as_str().expect("gadget id");

        let html = body_text(send(&app, form_request("/cart", &format!("cart=&add={widget_id}"))).await).await;
        assert!(html.contains("Total: $9.99"));
        assert!(html.contains(&format!("name=\"cart\" value=\"{widget_id}\"")));

        let both = format!("{widget_id},{gadget_id}");
        let html = body_text(
            send(&app, form_request("/cart", &format!("cart={widget_id}&add={gadget_id}"))).await,
        )
        .await;
        assert!(html.contains("Total: $29.98"));
        assert!(html.contains(&format!("name=\"cart\" value=\"{both}\"")));

        let html = body_text(
            send(&app, form_request("/cart", &format!("cart={both}&remove=0"))).await,
        )
        .await;
        assert!(html.contains("Total: $19.99"));
        assert!(html.contains(&format!("name=\"cart\" value=\"{gadget_id}\"")));

        let html = body_text(
            send(&app, form_request("/cart", &format!("cart={gadget_id}&remove=3"))).await,
        )
        .await;
        assert!(html.contains("cart position 3 is out of range"));
        assert!(html.contains("Total: $19.99"));
    }

    #[tokio::test]
    async fn controller_round_trip_over_http() {
        let state = setup_state().await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            axum::serve(listener, app_router(state))
                .await
                .expect("server");
        });

        let base = url::Url::parse(&format!("http://{addr}/")).expect("base url");
        let client = InventoryClient::new(base, reqwest::Client::new());
        client
            .create_product(&inventory_core::types::CreateProductRequest {
                name: "Widget".to_string(),
                description: "A widget".to_string(),
                price: Some(inventory_core::types::Price::from_cents(999)),
                inventory: Some(5),
            })
            .await
            .expect("seed widget");

        let controller = PageController::new(client, ValidationPolicy::Strict);
        controller.load_initial().await.expect("initial load");
        controller.update_draft(|draft| {
            draft.name = "Gadget".to_string();
            draft.description = "x".to_string();
            draft.price = "19.99".to_string();
            draft.inventory = "3".to_string();
        });
        controller.submit().await.expect("submit");

        let page = controller.snapshot();
        let names: Vec<_> = page.products().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Widget", "Gadget"]);
        assert_eq!(page.draft(), &DraftForm::default());

        for product in page.products().to_vec() {
            controller.add_to_cart(product).expect("cart total in range");
        }
        assert_eq!(controller.snapshot().cart().total().to_string(), "$29.98");
        controller.remove_from_cart(0).expect("remove widget");
        assert_eq!(controller.snapshot().cart().total().to_string(), "$19.99");

        server.abort();
    }
}
