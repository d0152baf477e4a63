//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    domain::{RoomName, StudentId, UserId},
    infrastructure::dto::ws::{ClientEvent, ServerEvent},
    ui::state::AppState,
    usecase::{
        FollowQuestionUseCase, JoinQueueUseCase, JoinRequest, LeaveQueueUseCase, OperatorUseCase,
        PushBackUseCase, RegisterUserUseCase, notify::room_summaries,
    },
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // All outbound traffic for this connection flows through one channel,
    // so broadcasts and targeted events share a single ordered stream.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn_id = state.sessions.connect(tx).await;
    tracing::info!("Connection {} established", conn_id);

    // New connections get the rooms list immediately for the lobby view.
    let summaries = {
        let registry = state.registry.lock().await;
        room_summaries(&registry)
    };
    state
        .sessions
        .send_to_conn(conn_id, &ServerEvent::RoomsListUpdate(summaries))
        .await;

    let recv_state = Arc::clone(&state);
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!("WebSocket error on {}: {}", conn_id, e);
                    break;
                }
            };
            match msg {
                Message::Text(text) => {
                    match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => dispatch(&recv_state, conn_id, event).await,
                        Err(e) => {
                            tracing::warn!("Unparseable frame on {}: {}", conn_id, e);
                            recv_state
                                .sessions
                                .send_to_conn(
                                    conn_id,
                                    &ServerEvent::Error {
                                        message: "Invalid message format.".to_string(),
                                    },
                                )
                                .await;
                        }
                    }
                }
                Message::Close(_) => {
                    tracing::info!("Connection {} requested close", conn_id);
                    break;
                }
                _ => {}
            }
        }
    });

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Disconnecting drops the connection binding only. Queue entries stay:
    // a closed tab must not forfeit a queue position.
    state.sessions.disconnect(conn_id).await;
    tracing::info!("Connection {} closed", conn_id);
}

async fn send_error(state: &AppState, conn_id: Uuid, message: String) {
    state
        .sessions
        .send_to_conn(conn_id, &ServerEvent::Error { message })
        .await;
}

/// Route one parsed client event to its usecase, reporting validation and
/// domain errors back on the same connection.
async fn dispatch(state: &Arc<AppState>, conn_id: Uuid, event: ClientEvent) {
    match event {
        ClientEvent::RegisterUser(p) => {
            let (user_id, room) = match (UserId::new(p.user_id), RoomName::new(p.room)) {
                (Ok(u), Ok(r)) => (u, r),
                (Err(e), _) | (_, Err(e)) => {
                    return send_error(state, conn_id, e.to_string()).await;
                }
            };
            RegisterUserUseCase::new(Arc::clone(&state.registry), Arc::clone(&state.sessions))
                .execute(conn_id, &user_id, &room)
                .await;
        }
        ClientEvent::JoinMarking(p) => {
            let parsed = UserId::new(p.user_id)
                .and_then(|u| RoomName::new(p.room).map(|r| (u, r)))
                .and_then(|(u, r)| StudentId::new(p.student_id).map(|s| (u, r, s)));
            let (user_id, room, student_id) = match parsed {
                Ok(v) => v,
                Err(e) => return send_error(state, conn_id, e.to_string()).await,
            };
            let result = join_usecase(state)
                .execute(
                    &room,
                    p.name,
                    p.email,
                    user_id,
                    JoinRequest::Marking { student_id },
                )
                .await;
            if let Err(e) = result {
                send_error(state, conn_id, e.to_string()).await;
            }
        }
        ClientEvent::JoinQuestion(p) => {
            let (user_id, room) = match (UserId::new(p.user_id), RoomName::new(p.room)) {
                (Ok(u), Ok(r)) => (u, r),
                (Err(e), _) | (_, Err(e)) => {
                    return send_error(state, conn_id, e.to_string()).await;
                }
            };
            let result = join_usecase(state)
                .execute(
                    &room,
                    p.name,
                    p.email,
                    user_id,
                    JoinRequest::Question {
                        description: p.description,
                    },
                )
                .await;
            if let Err(e) = result {
                send_error(state, conn_id, e.to_string()).await;
            }
        }
        ClientEvent::LeaveQueue(p) => {
            let (user_id, room) = match (UserId::new(p.user_id), RoomName::new(p.room)) {
                (Ok(u), Ok(r)) => (u, r),
                (Err(e), _) | (_, Err(e)) => {
                    return send_error(state, conn_id, e.to_string()).await;
                }
            };
            LeaveQueueUseCase::new(
                Arc::clone(&state.registry),
                Arc::clone(&state.store),
                Arc::clone(&state.dispatcher),
            )
            .execute(&room, p.queue_type, p.entry_id, &user_id)
            .await;
        }
        ClientEvent::PushBack(p) => {
            let (user_id, room) = match (UserId::new(p.user_id), RoomName::new(p.room)) {
                (Ok(u), Ok(r)) => (u, r),
                (Err(e), _) | (_, Err(e)) => {
                    return send_error(state, conn_id, e.to_string()).await;
                }
            };
            PushBackUseCase::new(
                Arc::clone(&state.registry),
                Arc::clone(&state.store),
                Arc::clone(&state.dispatcher),
            )
            .execute(&room, p.queue_type, p.entry_id, &user_id)
            .await;
        }
        ClientEvent::FollowQuestion(p) => {
            let (user_id, room) = match (UserId::new(p.user_id), RoomName::new(p.room)) {
                (Ok(u), Ok(r)) => (u, r),
                (Err(e), _) | (_, Err(e)) => {
                    return send_error(state, conn_id, e.to_string()).await;
                }
            };
            let result = follow_usecase(state)
                .follow(&room, p.entry_id, user_id, p.name)
                .await;
            if let Err(e) = result {
                send_error(state, conn_id, e.to_string()).await;
            }
        }
        ClientEvent::UnfollowQuestion(p) => {
            let (user_id, room) = match (UserId::new(p.user_id), RoomName::new(p.room)) {
                (Ok(u), Ok(r)) => (u, r),
                (Err(e), _) | (_, Err(e)) => {
                    return send_error(state, conn_id, e.to_string()).await;
                }
            };
            follow_usecase(state)
                .unfollow(&room, p.entry_id, &user_id)
                .await;
        }
        ClientEvent::TaCheckin(p) => {
            let room = match RoomName::new(p.room) {
                Ok(r) => r,
                Err(e) => return send_error(state, conn_id, e.to_string()).await,
            };
            if let Err(e) = operator_usecase(state).check_in(&room, p.queue_type).await {
                send_error(state, conn_id, e.to_string()).await;
            }
        }
        ClientEvent::TaNext(p) => {
            let room = match RoomName::new(p.room) {
                Ok(r) => r,
                Err(e) => return send_error(state, conn_id, e.to_string()).await,
            };
            operator_usecase(state).finish(&room, p.queue_type).await;
        }
        ClientEvent::TaCallSpecific(p) => {
            let room = match RoomName::new(p.room) {
                Ok(r) => r,
                Err(e) => return send_error(state, conn_id, e.to_string()).await,
            };
            operator_usecase(state)
                .call_specific(&room, p.queue_type, p.entry_id)
                .await;
        }
        ClientEvent::TaCancelCall(p) => {
            let room = match RoomName::new(p.room) {
                Ok(r) => r,
                Err(e) => return send_error(state, conn_id, e.to_string()).await,
            };
            operator_usecase(state)
                .cancel_call(&room, p.queue_type, p.entry_id)
                .await;
        }
        ClientEvent::TaStartAssisting(p) => {
            let room = match RoomName::new(p.room) {
                Ok(r) => r,
                Err(e) => return send_error(state, conn_id, e.to_string()).await,
            };
            operator_usecase(state)
                .start_assisting(&room, p.queue_type, p.entry_id)
                .await;
        }
        ClientEvent::TaRemove(p) => {
            let room = match RoomName::new(p.room) {
                Ok(r) => r,
                Err(e) => return send_error(state, conn_id, e.to_string()).await,
            };
            operator_usecase(state)
                .remove(&room, p.queue_type, p.entry_id)
                .await;
        }
        ClientEvent::TaClearAll(p) => {
            let room = match RoomName::new(p.room) {
                Ok(r) => r,
                Err(e) => return send_error(state, conn_id, e.to_string()).await,
            };
            operator_usecase(state).clear_all(&room).await;
        }
        ClientEvent::TaDeleteRoom(p) => {
            let room = match RoomName::new(p.room) {
                Ok(r) => r,
                Err(e) => return send_error(state, conn_id, e.to_string()).await,
            };
            operator_usecase(state).delete_room(&room).await;
        }
    }
}

fn join_usecase(state: &AppState) -> JoinQueueUseCase {
    JoinQueueUseCase::new(
        Arc::clone(&state.registry),
        Arc::clone(&state.store),
        Arc::clone(&state.dispatcher),
    )
}

fn follow_usecase(state: &AppState) -> FollowQuestionUseCase {
    FollowQuestionUseCase::new(
        Arc::clone(&state.registry),
        Arc::clone(&state.store),
        Arc::clone(&state.dispatcher),
    )
}

fn operator_usecase(state: &AppState) -> OperatorUseCase {
    OperatorUseCase::new(
        Arc::clone(&state.registry),
        Arc::clone(&state.store),
        Arc::clone(&state.dispatcher),
    )
}
