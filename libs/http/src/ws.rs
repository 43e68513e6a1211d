use std::future::Future;
use std::pin::Pin;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};

use phonebook_api::{ChannelError, ChannelFuture, ChannelReader, ChannelWriter, Phone};

use super::AppState;

// ═══════════════════════════════════════════════════════════════
//  WebSocket: /ws
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_ws(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(socket, state))
}

async fn ws_connection(socket: WebSocket, state: AppState) {
    let (sink, stream) = socket.split();
    let handle = state
        .hub
        .register(Box::new(WsReader { stream }), Box::new(WsWriter { sink }))
        .await;
    state.hub.read_loop(handle).await;
}

// ═══════════════════════════════════════════════════════════════
//  Channel halves over JSON text frames
// ═══════════════════════════════════════════════════════════════

pub(crate) struct WsReader {
    stream: SplitStream<WebSocket>,
}

impl ChannelReader for WsReader {
    fn read_event(&mut self) -> ChannelFuture<'_, Option<Phone>> {
        Box::pin(async move {
            loop {
                let msg = match self.stream.next().await {
                    None => return Ok(None),
                    Some(Err(e)) => return Err(ChannelError::Io(e.to_string())),
                    Some(Ok(msg)) => msg,
                };
                match msg {
                    Message::Text(t) => return serde_json::from_str(&t).map(Some).map_err(Into::into),
                    Message::Binary(b) => {
                        return serde_json::from_slice(&b).map(Some).map_err(Into::into);
                    }
                    Message::Close(_) => return Ok(None),
                    // axum answers pings itself
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            }
        })
    }
}

pub(crate) struct WsWriter {
    sink: SplitSink<WebSocket, Message>,
}

impl ChannelWriter for WsWriter {
    fn write_event<'a>(&'a mut self, phone: &'a Phone) -> ChannelFuture<'a, ()> {
        Box::pin(async move {
            let json = serde_json::to_string(phone).map_err(|e| ChannelError::Io(e.to_string()))?;
            self.sink
                .send(Message::Text(json.into()))
                .await
                .map_err(|e| ChannelError::Io(e.to_string()))
        })
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let _ = self.sink.close().await;
        })
    }
}
