use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::client::Client;
use crate::client::operations::{process_register, process_send};
use crate::config::ServerConfig;
use crate::error::handlers::{client_reason, handle_error};
use crate::error::{ProtocolError, RelayError};
use crate::protocol::{ClientEvent, ServerEvent, encode_event, parse_event};
use crate::registry::ConnectionHandle;
use crate::router::Router;

/// How long a closing session waits for queued events to reach the socket.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles one relay client session using the Tokio async runtime.
///
/// - Spawns a writer task that drains the connection's outbound queue.
/// - Reads newline-delimited frames and dispatches them to the registry and router.
/// - Stops on EOF, read error, an unterminated oversize frame, or eviction.
/// - Unregisters the connection before returning.
pub async fn handle_client(
    stream: TcpStream,
    client_addr: SocketAddr,
    router: Arc<Router>,
    config: Arc<ServerConfig>,
) {
    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_buffer);

    let connection = ConnectionHandle::new(client_addr, outbound_tx);
    let shutdown = connection.shutdown_signal();
    let writer = tokio::spawn(write_events(write_half, outbound_rx, client_addr));

    let mut client = Client::new(connection);
    let mut reader = BufReader::new(read_half);
    let mut line = Vec::new();
    // Room for the frame plus "\r\n"
    let read_limit = config.max_frame_length as u64 + 2;

    info!("Client connected: {} ({})", client_addr, client.id());

    loop {
        line.clear();
        tokio::select! {
            _ = shutdown.notified() => {
                info!("Closing {} at registry request", client_addr);
                break;
            }
            read = read_frame(&mut reader, &mut line, read_limit) => match read {
                Ok(0) => {
                    info!("Connection closed by client {}", client_addr);
                    break;
                }
                Ok(n) => {
                    if !line.ends_with(b"\n") && n as u64 >= read_limit {
                        // Framing is lost once a line overruns the limit
                        reject(&client, ProtocolError::FrameTooLong {
                            max: config.max_frame_length,
                        }.into());
                        break;
                    }
                    let frame = match std::str::from_utf8(&line) {
                        Ok(frame) => frame,
                        Err(_) => {
                            reject(&client, ProtocolError::InvalidUtf8.into());
                            continue;
                        }
                    };
                    if frame.trim().is_empty() {
                        continue;
                    }
                    dispatch(&mut client, frame, &router, &config);
                }
                Err(e) => {
                    error!("Failed to read from {}: {}", client_addr, e);
                    break;
                }
            }
        }
    }

    match router.registry().unregister(client.id()) {
        Some(removed) => info!(
            "Client {} ({}) disconnected, {} online",
            removed.identity,
            client_addr,
            removed.presence.len()
        ),
        None => info!("Client {} disconnected", client_addr),
    }

    // Last sender owned by this task; the writer stops once the queue drains
    drop(client);
    let abort = writer.abort_handle();
    if timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        warn!("Writer for {} did not drain in time", client_addr);
        abort.abort();
    }
}

/// Reads one line as raw bytes, never buffering more than `limit` bytes of it.
///
/// Decoding is left to the caller so bad UTF-8 is a protocol error, not a
/// transport failure.
async fn read_frame(
    reader: &mut BufReader<OwnedReadHalf>,
    line: &mut Vec<u8>,
    limit: u64,
) -> std::io::Result<usize> {
    let mut limited = (&mut *reader).take(limit);
    limited.read_until(b'\n', line).await
}

/// Drains the outbound queue onto the socket until every sender is gone.
async fn write_events(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<ServerEvent>,
    client_addr: SocketAddr,
) {
    while let Some(event) = outbound.recv().await {
        let frame = match encode_event(&event) {
            Ok(frame) => frame,
            Err(e) => {
                handle_error(&e.into());
                continue;
            }
        };

        if let Err(e) = writer.write_all(frame.as_bytes()).await {
            warn!("Failed to write to {}: {}", client_addr, e);
            // Dropping the receiver makes further deliveries fail as misses
            return;
        }
    }

    let _ = writer.shutdown().await;
}

/// Dispatches one inbound frame.
fn dispatch(client: &mut Client, frame: &str, router: &Router, config: &ServerConfig) {
    let event = match parse_event(frame, config.max_frame_length) {
        Ok(event) => event,
        Err(e) => {
            reject(client, e.into());
            return;
        }
    };

    match event {
        ClientEvent::Register(requested) => {
            match process_register(
                client,
                &requested,
                router.registry(),
                config.max_identity_length,
            ) {
                Ok(registration) => info!(
                    "Client registered: {} ({}, {} online)",
                    registration.identity,
                    client.addr(),
                    registration.presence.len()
                ),
                Err(e) => reject(client, e.into()),
            }
        }
        ClientEvent::Send(request) => {
            // The router has already told the sender about any failure
            if let Err(e) = process_send(client, request, router) {
                handle_error(&e.into());
            }
        }
    }
}

/// Logs `err` and reports it to the client that caused it.
fn reject(client: &Client, err: RelayError) {
    handle_error(&err);
    client.notify(ServerEvent::error(client_reason(&err)));
}
