use autodrain_core::config::DrainPlan;
use autodrain_core::events::Event;
use autodrain_core::processors::{ControlCommand, ControlOutcome};
use autodrain_sdk::objects::{ClientCommand, ServerMessage, StartConfig};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use kanau::processor::Processor;
use uuid::Uuid;

use crate::state::AppState;

/// `GET /ws`: the control channel.
///
/// The first frame is always the current run status. Afterwards the client
/// may send `start`/`stop` commands at any time and receives every worker
/// log line plus a status frame on each transition.
pub(super) async fn control_ws(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_control_ws(socket, state))
}

/// Background task that drives a single WebSocket connection.
///
/// In exclusive sink mode a newer connection takes over the event stream;
/// this one stays open and keeps accepting commands.
async fn handle_control_ws(mut socket: WebSocket, state: AppState) {
    let session = Uuid::now_v7();
    let mut events = state.sink().attach();
    let mut forwarding = true;

    tracing::info!(%session, "WS: control client connected");
    state.sink().publish(Event::info("Client connected"));

    loop {
        tokio::select! {
            event = events.recv(), if forwarding => {
                match event {
                    Some(event) => {
                        if send_json(&mut socket, &ServerMessage::from(&event)).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        tracing::debug!(%session, "WS: event stream taken over by another client");
                        forwarding = false;
                    }
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_command(&state, session, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(%session, error = %e, "WS: receive failed");
                        break;
                    }
                }
            }
        }
    }

    let _ = socket.send(Message::Close(None)).await;
    tracing::info!(%session, "WS: control client disconnected");
    state.sink().publish(Event::info("Client disconnected"));
}

async fn handle_command(state: &AppState, session: Uuid, text: &str) {
    let command = match ClientCommand::from_json(text) {
        Ok(command) => command,
        Err(e) => {
            tracing::debug!(%session, error = %e, "WS: malformed command");
            state
                .sink()
                .publish(Event::error(format!("Error processing client message: {e}")));
            return;
        }
    };

    match command {
        ClientCommand::Start { config } => start(state, session, config).await,
        ClientCommand::Stop => stop(state, session).await,
    }
}

async fn start(state: &AppState, session: Uuid, config: StartConfig) {
    let plan = match config
        .validate(&state.reserve_policy)
        .map_err(|e| e.to_string())
        .and_then(|validated| DrainPlan::try_from(validated).map_err(|e| e.to_string()))
    {
        Ok(plan) => plan,
        Err(reason) => {
            tracing::info!(%session, %reason, "WS: start rejected");
            state
                .sink()
                .publish(Event::error(format!("Invalid configuration: {reason}")));
            return;
        }
    };

    let Ok(outcome) = state
        .orchestrator
        .process(ControlCommand::Start(plan))
        .await;
    match outcome {
        ControlOutcome::Started { workers } => {
            tracing::info!(%session, workers, "WS: run started");
        }
        ControlOutcome::AlreadyRunning => {
            state
                .sink()
                .publish(Event::warn("Already running, start ignored"));
        }
        ControlOutcome::Stopping(_) | ControlOutcome::AlreadyStopped => {}
    }
}

async fn stop(state: &AppState, session: Uuid) {
    let Ok(outcome) = state.orchestrator.process(ControlCommand::Stop).await;
    match outcome {
        ControlOutcome::Stopping(run) => {
            // Collect the run report in the background; stop never blocks
            // the connection.
            let grace = state.stop_grace;
            tokio::spawn(async move {
                match run.join(grace).await {
                    Ok(report) => tracing::info!(%session, ?report, "WS: run stopped"),
                    Err(e) => tracing::warn!(%session, error = %e, "WS: run did not stop cleanly"),
                }
            });
        }
        ControlOutcome::AlreadyStopped => {
            state.sink().publish(Event::warn("Not running, stop ignored"));
        }
        ControlOutcome::Started { .. } | ControlOutcome::AlreadyRunning => {}
    }
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
