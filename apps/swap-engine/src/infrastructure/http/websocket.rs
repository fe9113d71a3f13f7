//! Order Status Stream
//!
//! `GET /api/orders/{id}/stream` upgrades to a WebSocket that forwards every
//! status event of one order as a JSON text frame, then closes once the
//! queue is done with the order.
//!
//! The subscription is registered before the order is looked up, so no event
//! published after the lookup can be missed. An order the queue has already
//! finished gets a single snapshot event carrying its final state.

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};

use crate::application::services::JobStatus;
use crate::domain::order_execution::{
    Order, OrderRepository, OrderStatus, StatusEvent, StatusPayload,
};
use crate::domain::shared::OrderId;
use crate::domain::venue_routing::Venue;

use super::controller::AppState;
use super::response::ErrorResponse;

/// WebSocket upgrade handler.
pub async fn stream_order<O: OrderRepository + 'static>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<O>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_events(socket, state, OrderId::new(id)))
}

async fn stream_events<O: OrderRepository + 'static>(
    mut socket: WebSocket,
    state: AppState<O>,
    order_id: OrderId,
) {
    let (subscription, mut events) = state.hub.subscribe_channel(&order_id);

    let order = match state.orders.find_by_id(&order_id).await {
        Ok(Some(order)) => order,
        Ok(None) => {
            send_error(&mut socket, "Order not found").await;
            return;
        }
        Err(e) => {
            tracing::error!(order_id = %order_id, error = %e, "Failed to load order for stream");
            send_error(&mut socket, "Order lookup failed").await;
            return;
        }
    };

    let finished = state.queue.get_job(&order_id).map_or_else(
        || order.status().is_terminal(),
        |job| matches!(job.status(), JobStatus::Completed | JobStatus::Failed),
    );
    if finished {
        subscription.unsubscribe();
        if send_event(&mut socket, &snapshot_event(&order)).await {
            let _ = socket.send(Message::Close(None)).await;
        }
        return;
    }

    tracing::debug!(order_id = %order_id, "Status stream opened");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if !send_event(&mut socket, &event).await {
                        return;
                    }
                }
                None => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => {
                    tracing::debug!(order_id = %order_id, "Status stream closed by client");
                    return;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!(order_id = %order_id, "Status stream finished");
    let _ = socket.send(Message::Close(None)).await;
}

/// Returns `false` once the socket is unusable.
async fn send_event(socket: &mut WebSocket, event: &StatusEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!(order_id = %event.order_id, error = %e, "Failed to encode status event");
            true
        }
    }
}

async fn send_error(socket: &mut WebSocket, message: &str) {
    let body = ErrorResponse {
        error: message.to_string(),
    };
    if let Ok(json) = serde_json::to_string(&body) {
        let _ = socket.send(Message::Text(json.into())).await;
    }
    let _ = socket.send(Message::Close(None)).await;
}

/// Event describing the stored final state of `order`.
fn snapshot_event(order: &Order) -> StatusEvent {
    let mut payload = StatusPayload {
        selected_dex: order.selected_venue(),
        raydium_quote: order.quoted_price(Venue::Raydium),
        meteora_quote: order.quoted_price(Venue::Meteora),
        ..StatusPayload::default()
    };
    let message = match order.status() {
        OrderStatus::Confirmed => {
            payload.executed_price = order.executed_price();
            payload.amount_out = order.amount_out();
            payload.tx_hash = order.tx_hash().cloned();
            "Order already confirmed"
        }
        OrderStatus::Failed => {
            payload.error = order.error().map(ToString::to_string);
            payload.attempt = Some(order.attempts());
            payload.will_retry = Some(false);
            "Order already failed"
        }
        _ => "Order is no longer queued",
    };
    StatusEvent::new(order.id().clone(), order.status())
        .with_message(message)
        .with_data(payload)
}
