//! Control API.
//!
//! - `GET /ws` - WebSocket control channel (see `autodrain_sdk::objects::ws`)

mod ws;

use crate::state::AppState;
use axum::{Router, routing::get};

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws::control_ws))
}
