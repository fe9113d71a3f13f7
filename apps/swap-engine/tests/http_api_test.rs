//! HTTP API Integration Tests
//!
//! REST routes through `tower::ServiceExt::oneshot`, live status streams over
//! a real listener with `tokio-tungstenite`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use rust_decimal_macros::dec;
use serde_json::Value;
use swap_engine::domain::order_execution::{CreateOrderCommand, OrderRepository};
use swap_engine::infrastructure::http::HttpServer;
use swap_engine::infrastructure::simulation::{NoDelay, SequenceRandomSource};
use swap_engine::{
    AppState, Container, EngineConfig, InMemoryOrderRepository, Order, OrderKind, create_router,
};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn state() -> AppState<InMemoryOrderRepository> {
    let mut config = EngineConfig::default();
    config.execution.settlement_failure_rate = 0.0;
    let container = Container::new(
        &config,
        Arc::new(InMemoryOrderRepository::new()),
        Arc::new(SequenceRandomSource::new(vec![0.5])),
        Arc::new(NoDelay),
    );
    AppState::from_container(&container, "test")
}

fn order() -> Order {
    Order::new(CreateOrderCommand {
        kind: OrderKind::Market,
        token_in: "SOL".to_string(),
        token_out: "USDC".to_string(),
        amount_in: dec!(100),
        slippage_pct: dec!(1),
    })
    .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serve `state` on an ephemeral port; returns the address and a stop token.
async fn serve(state: AppState<InMemoryOrderRepository>) -> (std::net::SocketAddr, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let server = HttpServer::new(addr.port(), create_router(state), cancel.clone());
    tokio::spawn(server.serve(listener));
    (addr, cancel)
}

/// Read text frames until the server closes the stream.
async fn collect_frames<S>(mut socket: S) -> Vec<Value>
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let mut frames = Vec::new();
    let read = async {
        while let Some(message) = socket.next().await {
            match message.unwrap() {
                Message::Text(text) => frames.push(serde_json::from_str(text.as_str()).unwrap()),
                Message::Close(_) => break,
                _ => {}
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(10), read)
        .await
        .expect("stream did not finish");
    frames
}

// ============================================
// REST
// ============================================

#[tokio::test]
async fn submit_then_lookup() {
    let state = state();
    let app = create_router(state.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/orders/execute")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"type":"market","tokenIn":"SOL","tokenOut":"USDC","amountIn":100,"slippage":1}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let submitted = json_body(response).await;
    assert_eq!(submitted["status"], "pending");
    let order_id = submitted["orderId"].as_str().unwrap().to_string();

    state.queue.wait_idle().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/orders/{order_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let order = json_body(response).await;
    assert_eq!(order["status"], "confirmed");
    assert_eq!(order["retryCount"], 1);
    assert_eq!(order["txHash"].as_str().map(str::len), Some(64));
    assert!(order["executedPrice"].as_f64().is_some());
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let app = create_router(state());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/orders/execute")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"type":"market","tokenIn":"SOL"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "tokenOut is required");
}

#[tokio::test]
async fn metrics_route_answers() {
    let app = create_router(state());
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(matches!(
        response.status(),
        StatusCode::OK | StatusCode::SERVICE_UNAVAILABLE
    ));
}

// ============================================
// WebSocket
// ============================================

#[tokio::test]
async fn stream_delivers_full_sequence_then_closes() {
    let state = state();
    let order = order();
    let id = order.id().clone();
    state.orders.save(&order).await.unwrap();
    let (addr, cancel) = serve(state.clone()).await;

    let (socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/orders/{id}/stream"))
        .await
        .unwrap();

    // The server subscribes after the upgrade completes.
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.hub.subscriber_count(&id) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscription never registered");

    state.queue.enqueue(order).unwrap();
    let frames = collect_frames(socket).await;

    let statuses: Vec<&str> = frames.iter().filter_map(|f| f["status"].as_str()).collect();
    assert_eq!(
        statuses,
        vec!["pending", "routing", "building", "submitted", "confirmed"]
    );
    assert!(frames.iter().all(|f| f["orderId"] == id.as_str()));
    assert!(frames[4]["data"]["txHash"].is_string());
    assert_eq!(state.hub.subscriber_count(&id), 0);

    cancel.cancel();
}

#[tokio::test]
async fn stream_of_finished_order_sends_snapshot() {
    let state = state();
    let order = order();
    let id = order.id().clone();
    state.orders.save(&order).await.unwrap();
    state.queue.enqueue(order).unwrap();
    state.queue.wait_idle().await;
    let (addr, cancel) = serve(state.clone()).await;

    let (socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/orders/{id}/stream"))
        .await
        .unwrap();
    let frames = collect_frames(socket).await;

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["status"], "confirmed");
    assert!(frames[0]["data"]["txHash"].is_string());

    cancel.cancel();
}

#[tokio::test]
async fn stream_of_unknown_order_reports_error() {
    let (addr, cancel) = serve(state()).await;

    let (socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/orders/missing/stream"))
        .await
        .unwrap();
    let frames = collect_frames(socket).await;

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["error"], "Order not found");

    cancel.cancel();
}
