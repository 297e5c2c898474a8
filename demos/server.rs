//! Mock gateway backend for manual settlement runs.
//!
//! Run with: `cargo run --example server`
//!
//! Implements the two endpoints the settlement engine depends on, with an
//! enforced per-transaction limit so the adaptive splitting path can be
//! exercised end to end:
//!
//! - `POST /payments/orders` - Mint a gateway order (rejects over-limit amounts)
//! - `POST /payments/verify` - Verify a completed checkout
//!
//! ## Example Usage
//!
//! ```bash
//! # Terminal 1: start the backend with a 15000 per-transaction limit
//! CHUNKPAY_GATEWAY_LIMIT=15000 cargo run --example server
//!
//! # Terminal 2: settle 60000 against it
//! cargo run -- --due 60000 --backend http://127.0.0.1:3000 --token demo --pacing-ms 0
//! ```

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use chunkpay::backend::{CreateOrderRequest, GatewayOrder, VerifyRequest};
use chunkpay::OrderId;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpListener;

// === Application State ===

/// Shared state: the order store plus the account's per-transaction limit.
#[derive(Clone)]
struct AppState {
    orders: Arc<DashMap<OrderId, Decimal>>,
    next_order: Arc<AtomicU64>,
    limit: Decimal,
}

// === Helpers ===

fn error_body(code: &str, description: &str) -> Json<Value> {
    Json(json!({
        "error": {
            "code": code,
            "description": description,
        }
    }))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

// === Handlers ===

/// POST /payments/orders - Mint a gateway order for one chunk.
async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateOrderRequest>,
) -> (StatusCode, Json<Value>) {
    if bearer_token(&headers).is_none() {
        return (
            StatusCode::UNAUTHORIZED,
            error_body("UNAUTHORIZED", "Missing bearer token"),
        );
    }
    if request.amount <= Decimal::ZERO {
        return (
            StatusCode::BAD_REQUEST,
            error_body("BAD_REQUEST_ERROR", "Order amount must be positive"),
        );
    }
    if request.amount > state.limit {
        // The same shape a live gateway uses for over-limit rejections.
        return (
            StatusCode::BAD_REQUEST,
            error_body(
                "BAD_REQUEST_ERROR",
                "Amount exceeds maximum amount allowed.",
            ),
        );
    }

    let n = state.next_order.fetch_add(1, Ordering::SeqCst) + 1;
    let order = GatewayOrder {
        order_id: OrderId(format!("order_demo_{n}")),
        amount: request.amount,
        currency: "INR".to_string(),
        key_id: "key_demo".to_string(),
    };
    state.orders.insert(order.order_id.clone(), order.amount);

    (StatusCode::OK, Json(serde_json::to_value(&order).unwrap()))
}

/// POST /payments/verify - Confirm a completed checkout against its order.
async fn verify_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<VerifyRequest>,
) -> (StatusCode, Json<Value>) {
    if bearer_token(&headers).is_none() {
        return (
            StatusCode::UNAUTHORIZED,
            error_body("UNAUTHORIZED", "Missing bearer token"),
        );
    }

    let Some(order_amount) = state.orders.get(&request.order_id).map(|a| *a) else {
        return (
            StatusCode::NOT_FOUND,
            error_body("ORDER_NOT_FOUND", "Unknown order id"),
        );
    };
    if order_amount != request.amount {
        return (
            StatusCode::BAD_REQUEST,
            error_body(
                "AMOUNT_MISMATCH",
                "Verified amount does not match the order",
            ),
        );
    }
    if request.amount > request.total_due {
        return (
            StatusCode::BAD_REQUEST,
            error_body("DUE_EXCEEDED", "Amount exceeds the outstanding due"),
        );
    }
    if request.signature.0.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            error_body("SIGNATURE_INVALID", "Missing payment signature"),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "settledAmount": request.amount,
            "paymentId": request.payment_id,
        })),
    )
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/payments/orders", post(create_order))
        .route("/payments/verify", post(verify_payment))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    let limit: Decimal = std::env::var("CHUNKPAY_GATEWAY_LIMIT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| Decimal::from(20000));

    let state = AppState {
        orders: Arc::new(DashMap::new()),
        next_order: Arc::new(AtomicU64::new(0)),
        limit,
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Mock gateway backend running on http://127.0.0.1:3000");
    println!("Per-transaction limit: {limit}");
    println!();
    println!("Endpoints:");
    println!("  POST /payments/orders  - Mint a gateway order");
    println!("  POST /payments/verify  - Verify a completed checkout");

    axum::serve(listener, app).await.unwrap();
}
