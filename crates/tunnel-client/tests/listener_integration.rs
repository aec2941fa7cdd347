//! Integration tests for the client listener.
//!
//! Each test starts a tiny tokio-tungstenite WebSocket echo server on
//! `127.0.0.1:0`, points the client at it, and talks to the client through a
//! real local TCP connection.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use tunnel_client::domain::{ClientConfig, TargetDescriptor};
use tunnel_client::infrastructure::{serve, TungsteniteConnector};
use tunnel_core::{RecordingObserver, SessionObserver, SessionSupervisor};

/// Starts a WebSocket server that echoes binary messages and records the
/// request path of every upgrade.
async fn start_echo_ws_server() -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let paths = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&paths);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    seen.lock().unwrap().push(req.uri().path().to_string());
                    Ok(resp)
                };
                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(socket, callback).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    match msg {
                        Message::Binary(data) => {
                            if ws.send(Message::Binary(data)).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
            });
        }
    });

    (addr, paths)
}

struct RunningClient {
    addr: SocketAddr,
    observer: Arc<RecordingObserver>,
    supervisor: SessionSupervisor,
}

async fn start_client(server_url: String) -> RunningClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let target = TargetDescriptor::new(server_url, "echo.local", 7).unwrap();
    let config = ClientConfig::new(addr.port(), target);
    let observer = Arc::new(RecordingObserver::new());
    let supervisor = SessionSupervisor::new();

    tokio::spawn(serve(
        listener,
        config,
        Arc::new(TungsteniteConnector::new(Duration::from_secs(2))),
        Arc::clone(&observer) as Arc<dyn SessionObserver>,
        supervisor.clone(),
    ));

    RunningClient {
        addr,
        observer,
        supervisor,
    }
}

#[tokio::test]
async fn test_bytes_round_trip_through_echo_server() {
    // Arrange
    let (ws_addr, paths) = start_echo_ws_server().await;
    let client = start_client(format!("ws://{ws_addr}")).await;

    // Act
    let mut tcp = TcpStream::connect(client.addr).await.unwrap();
    tcp.write_all(b"ping").await.unwrap();
    let mut reply = [0u8; 4];
    tcp.read_exact(&mut reply).await.unwrap();

    // Assert
    assert_eq!(&reply, b"ping");
    assert_eq!(paths.lock().unwrap().as_slice(), ["/echo.local/7"]);
    assert_eq!(client.observer.created_count(), 1);
}

#[tokio::test]
async fn test_bare_server_url_gets_ws_scheme() {
    // Arrange: no scheme and a trailing slash
    let (ws_addr, paths) = start_echo_ws_server().await;
    let client = start_client(format!("{ws_addr}/")).await;

    // Act
    let mut tcp = TcpStream::connect(client.addr).await.unwrap();
    tcp.write_all(b"x").await.unwrap();
    let mut reply = [0u8; 1];
    tcp.read_exact(&mut reply).await.unwrap();

    // Assert
    assert_eq!(paths.lock().unwrap().as_slice(), ["/echo.local/7"]);
}

#[tokio::test]
async fn test_dial_failure_closes_local_connection_without_session() {
    // Arrange: a server URL whose port has nothing listening
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = dead.local_addr().unwrap();
    drop(dead);
    let client = start_client(format!("ws://{dead_addr}")).await;

    // Act
    let mut tcp = TcpStream::connect(client.addr).await.unwrap();
    let mut buf = [0u8; 1];
    let read = tokio::time::timeout(Duration::from_secs(5), tcp.read(&mut buf))
        .await
        .unwrap();

    // Assert: EOF (or reset), and no session was ever created
    assert!(matches!(read, Ok(0) | Err(_)));
    assert_eq!(client.observer.created_count(), 0);
}

#[tokio::test]
async fn test_concurrent_connections_stay_independent() {
    // Arrange
    let (ws_addr, _) = start_echo_ws_server().await;
    let client = start_client(format!("ws://{ws_addr}")).await;

    // Act: 20 connections, each with its own payload
    let mut tasks = Vec::new();
    for i in 0..20u32 {
        let addr = client.addr;
        tasks.push(tokio::spawn(async move {
            let payload = format!("connection-{i}-payload").into_bytes();
            let mut tcp = TcpStream::connect(addr).await.unwrap();
            tcp.write_all(&payload).await.unwrap();
            let mut reply = vec![0u8; payload.len()];
            tcp.read_exact(&mut reply).await.unwrap();
            (payload, reply)
        }));
    }

    // Assert
    for task in tasks {
        let (payload, reply) = task.await.unwrap();
        assert_eq!(payload, reply);
    }
    assert_eq!(client.observer.created_count(), 20);
}

#[tokio::test]
async fn test_shutdown_stops_accepting_and_drains_sessions() {
    // Arrange
    let (ws_addr, _) = start_echo_ws_server().await;
    let client = start_client(format!("ws://{ws_addr}")).await;
    let mut tcp = TcpStream::connect(client.addr).await.unwrap();
    tcp.write_all(b"hi").await.unwrap();
    let mut reply = [0u8; 2];
    tcp.read_exact(&mut reply).await.unwrap();

    // Act
    let clean = client.supervisor.shutdown(Duration::from_secs(5)).await;

    // Assert: the live session ended and the local side sees EOF
    assert!(clean);
    let mut buf = [0u8; 1];
    assert_eq!(tcp.read(&mut buf).await.unwrap(), 0);
    assert_eq!(client.observer.terminations().len(), 1);
}
