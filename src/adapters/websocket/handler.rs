//! WebSocket upgrade handler for the realtime notification channel.
//!
//! Connection lifecycle:
//! 1. Authenticate the `token` query parameter (or Bearer header)
//! 2. Admit only client principals; staff roles get 403
//! 3. Upgrade and register with the hub (snapshot is queued on connect)
//! 4. Forward hub events and replies until either side closes
//! 5. Disconnect from the hub

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::adapters::http::middleware::{bearer_token, AuthState, RequireStaff};
use crate::adapters::http::ApiError;
use crate::application::{InboxError, NotificationInbox};
use crate::domain::foundation::{AuthError, ClientPrincipal, ConnectionId};

use super::{
    hub::{HubStats, RealtimeHub},
    messages::{ClientMessage, ServerMessage},
};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub hub: Arc<RealtimeHub>,
    pub inbox: Arc<NotificationInbox>,
    pub sessions: AuthState,
}

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// Resolves the caller of an upgrade request to a client principal.
pub async fn authorize(
    sessions: &AuthState,
    query: &ConnectQuery,
    headers: &HeaderMap,
) -> Result<ClientPrincipal, ApiError> {
    let token = query
        .token
        .as_deref()
        .or_else(|| bearer_token(headers))
        .ok_or(AuthError::InvalidToken)?;
    let user = sessions.validate(token).await?;
    Ok(ClientPrincipal::try_from(&user)?)
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws?token=<access token>`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<WebSocketState>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Response {
    let principal = match authorize(&state.sessions, &query, &headers).await {
        Ok(principal) => principal,
        Err(rejection) => {
            tracing::debug!(code = rejection.code(), "realtime connection refused");
            return rejection.into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, principal, state))
}

/// Runs for the lifetime of one connection.
async fn handle_socket(socket: WebSocket, principal: ClientPrincipal, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();
    let (connection_id, mut hub_rx) = state.hub.connect(&principal).await;
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMessage>(16);

    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                Some(msg) = hub_rx.recv() => msg,
                Some(msg) = reply_rx.recv() => msg,
                else => break,
            };
            if let Err(e) = send_message(&mut sender, &msg).await {
                tracing::debug!(connection_id = %connection_id, "Send error, closing connection: {}", e);
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_principal = principal.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    let reply = match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(msg) => {
                            handle_client_message(&recv_state, &recv_principal, connection_id, msg)
                                .await
                        }
                        Err(_) => ServerMessage::error("BAD_MESSAGE", "Unrecognised message"),
                    };
                    if reply_tx.send(reply).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::warn!(connection_id = %connection_id, "Received unsupported binary message");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    tracing::debug!(connection_id = %connection_id, "Client sent close frame");
                    break;
                }
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, "Receive error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.disconnect(&connection_id).await;
}

/// Answers one client message.
pub async fn handle_client_message(
    state: &WebSocketState,
    principal: &ClientPrincipal,
    connection_id: ConnectionId,
    msg: ClientMessage,
) -> ServerMessage {
    match msg {
        ClientMessage::Ping => ServerMessage::pong(),
        ClientMessage::MarkAsRead { notification_id } => {
            match state.inbox.mark_read(principal, notification_id).await {
                Ok(_) => ServerMessage::read_confirmed(notification_id),
                Err(InboxError::NotFound(_)) => {
                    ServerMessage::error("NOTIFICATION_NOT_FOUND", "Notification not found")
                }
                Err(e) => {
                    tracing::warn!(error = %e, "mark_as_read failed");
                    ServerMessage::error("INTERNAL_ERROR", "Could not mark notification read")
                }
            }
        }
        ClientMessage::GetNotificationsSummary => {
            match state.inbox.unread_summary(principal).await {
                Ok(summary) => ServerMessage::NotificationsSummary(summary),
                Err(e) => {
                    tracing::warn!(error = %e, "summary failed");
                    ServerMessage::error("INTERNAL_ERROR", "Could not load summary")
                }
            }
        }
        ClientMessage::ConnectionStatus => state
            .hub
            .connection_status(&connection_id)
            .await
            .unwrap_or_else(|| ServerMessage::error("NOT_CONNECTED", "Connection is not registered")),
    }
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

/// GET /ws/stats - Live connection and room counts (staff only)
pub async fn hub_stats(
    State(state): State<WebSocketState>,
    RequireStaff(_staff): RequireStaff,
) -> axum::Json<HubStats> {
    axum::Json(state.hub.stats().await)
}

/// Create axum router for the WebSocket endpoint.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws", get(ws_handler))
}

/// Monitoring routes for the hub. These rely on the REST auth middleware.
pub fn realtime_stats_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws/stats", get(hub_stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::memory::InMemoryNotificationRepository;
    use crate::application::InboxConfig;
    use crate::domain::foundation::{ClientId, ClientRef, SampleId, Timestamp, UserId};
    use crate::domain::notification::NotificationRecord;
    use crate::domain::sample::{Actor, SampleState, SampleStateChanged};
    use crate::ports::NotificationRepository;
    use axum::http::StatusCode;

    fn state() -> (WebSocketState, Arc<InMemoryNotificationRepository>) {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let sessions: AuthState = Arc::new(
            MockSessionValidator::new()
                .with_client("client-token", "c-1", Some("900"))
                .with_staff("lab-token", "lab-1"),
        );
        let state = WebSocketState {
            hub: Arc::new(RealtimeHub::new(repo.clone(), 5, 16)),
            inbox: Arc::new(NotificationInbox::new(repo.clone(), InboxConfig::default())),
            sessions,
        };
        (state, repo)
    }

    fn query(token: Option<&str>) -> ConnectQuery {
        ConnectQuery {
            token: token.map(String::from),
        }
    }

    fn principal() -> ClientPrincipal {
        ClientPrincipal {
            client_id: ClientId::new("c-1").unwrap(),
            document: Some("900".into()),
        }
    }

    #[tokio::test]
    async fn client_token_is_admitted() {
        let (state, _) = state();
        let principal = authorize(&state.sessions, &query(Some("client-token")), &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(principal.client_id.as_str(), "c-1");
    }

    #[tokio::test]
    async fn bearer_header_is_accepted_when_query_is_absent() {
        let (state, _) = state();
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", "Bearer client-token".parse().unwrap());
        assert!(authorize(&state.sessions, &query(None), &headers).await.is_ok());
    }

    #[tokio::test]
    async fn staff_are_refused_with_403() {
        let (state, _) = state();
        let err = authorize(&state.sessions, &query(Some("lab-token")), &HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_or_bad_token_is_401() {
        let (state, _) = state();
        for q in [query(None), query(Some("bogus"))] {
            let err = authorize(&state.sessions, &q, &HeaderMap::new()).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn ping_gets_pong() {
        let (state, _) = state();
        let reply = handle_client_message(&state, &principal(), ConnectionId::new(), ClientMessage::Ping).await;
        assert!(matches!(reply, ServerMessage::Pong(_)));
    }

    #[tokio::test]
    async fn mark_as_read_confirms_and_updates_summary() {
        let (state, repo) = state();
        let client = ClientRef::ById(ClientId::new("c-1").unwrap());
        let record = NotificationRecord::for_state_change(&SampleStateChanged {
            sample_id: SampleId::new("S-1").unwrap(),
            client: client.clone(),
            client_refs: vec![client],
            previous_state: SampleState::InAnalysis,
            new_state: SampleState::Finalized,
            observations: String::new(),
            actor: Actor {
                id: UserId::new("lab-1").unwrap(),
                name: "Ana".into(),
                document: None,
            },
            occurred_at: Timestamp::now(),
        });
        repo.save(&record).await.unwrap();

        let reply = handle_client_message(
            &state,
            &principal(),
            ConnectionId::new(),
            ClientMessage::MarkAsRead {
                notification_id: record.id,
            },
        )
        .await;
        assert!(matches!(reply, ServerMessage::NotificationReadConfirmed(m) if m.notification_id == record.id));

        let reply = handle_client_message(
            &state,
            &principal(),
            ConnectionId::new(),
            ClientMessage::GetNotificationsSummary,
        )
        .await;
        assert!(matches!(reply, ServerMessage::NotificationsSummary(s) if s.total == 0));
    }

    #[tokio::test]
    async fn connection_status_reports_rooms() {
        let (state, _) = state();
        let (connection_id, _rx) = state.hub.connect(&principal()).await;

        let reply =
            handle_client_message(&state, &principal(), connection_id, ClientMessage::ConnectionStatus).await;
        match reply {
            ServerMessage::ConnectionStatus(status) => assert_eq!(status.rooms.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }
}
