use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::client::Client;
use crate::config::ServerSettings;
use crate::transport::message::{ClientMessage, ServerMessage};

/// Binds `addr` and serves connections until the listener fails.
pub async fn start_websocket_server(
    addr: &str,
    client: Client,
    settings: ServerSettings,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("WebSocket server listening on ws://{}", listener.local_addr()?);
    serve(listener, client, settings).await;
    Ok(())
}

/// Accepts connections on an already bound listener.
pub async fn serve(listener: TcpListener, client: Client, settings: ServerSettings) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {e}");
                break;
            }
        };

        let client = client.clone();
        let settings = settings.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer, client, settings).await;
        });
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, client: Client, settings: ServerSettings) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error from {peer}: {e}");
            return;
        }
    };
    debug!("{peer} connected");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Frames are answered one at a time, in order.
    while let Some(frame) = ws_receiver.next().await {
        let text = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("Read error from {peer}: {e}");
                break;
            }
        };

        let response = handle_text(&client, &settings, text.as_str()).await;
        let json = match serde_json::to_string(&response) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize response for {peer}: {e}");
                continue;
            }
        };

        if let Err(e) = ws_sender.send(WsMessage::text(json)).await {
            warn!("Failed to send response to {peer}: {e}");
            break;
        }
    }

    debug!("{peer} disconnected");
}

/// Parses one client frame and runs it.
pub async fn handle_text(client: &Client, settings: &ServerSettings, text: &str) -> ServerMessage {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => handle_client_message(client, settings, msg).await,
        Err(err) => {
            warn!(
                "Invalid client message: {err} | {}",
                text.chars().take(100).collect::<String>()
            );
            ServerMessage::Error {
                message: format!("invalid message: {err}"),
            }
        }
    }
}

/// Runs one request against the broker and builds its response.
pub async fn handle_client_message(
    client: &Client,
    settings: &ServerSettings,
    msg: ClientMessage,
) -> ServerMessage {
    match msg {
        ClientMessage::Subscribe { topic, id, ttl_ms } => {
            let ttl = ttl_ms.map(Duration::from_millis);
            match client.poll(&topic, &id, ttl, settings.session_timeout()).await {
                Ok(Some(message)) => ServerMessage::from_message(&topic, &message),
                Ok(None) => ServerMessage::Empty { topic },
                Err(e) => {
                    error!("Subscribe {id} on {topic} failed: {e}");
                    ServerMessage::Error {
                        message: e.to_string(),
                    }
                }
            }
        }

        ClientMessage::Publish {
            topic,
            name,
            payload,
            ttl_ms,
        } => {
            let ttl = ttl_ms.map(Duration::from_millis);
            match client.publish(&topic, &name, &payload, ttl) {
                Ok(report) => ServerMessage::Published {
                    topic,
                    name,
                    enqueued: report.enqueued,
                    deferred: report.deferred,
                    dropped: report.dropped,
                },
                Err(e) => {
                    error!("Publish {name} to {topic} failed: {e}");
                    ServerMessage::Error {
                        message: e.to_string(),
                    }
                }
            }
        }
    }
}
