//! End-to-end tests: local TCP client → tunnel-client → tunnel-server →
//! TCP destination, all on loopback.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tunnel_client::domain::{ClientConfig, TargetDescriptor};
use tunnel_client::infrastructure::{serve as serve_client, TungsteniteConnector};
use tunnel_core::{
    BridgeConfig, RecordingObserver, SessionEvent, SessionObserver, SessionSupervisor,
};
use tunnel_server::domain::ServerConfig;
use tunnel_server::infrastructure::serve as serve_server;

struct Tunnel {
    local: SocketAddr,
    server_observer: Arc<RecordingObserver>,
    client_observer: Arc<RecordingObserver>,
    client_supervisor: SessionSupervisor,
}

async fn start_echo_destination() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut r, mut w) = socket.split();
                let _ = tokio::io::copy(&mut r, &mut w).await;
            });
        }
    });
    port
}

/// Starts the server and a client forwarding to `remote_host:remote_port`.
async fn start_tunnel(remote_host: &str, remote_port: u16) -> Tunnel {
    let bridge = BridgeConfig {
        close_timeout: Duration::from_millis(200),
        ..BridgeConfig::default()
    };

    let server_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server_addr = server_listener.local_addr().unwrap();
    let server_observer = Arc::new(RecordingObserver::new());
    tokio::spawn(serve_server(
        server_listener,
        ServerConfig {
            bind_addr: server_addr,
            bridge: bridge.clone(),
            connect_timeout: Duration::from_secs(2),
            shutdown_grace: Duration::from_secs(1),
        },
        Arc::clone(&server_observer) as Arc<dyn SessionObserver>,
        SessionSupervisor::new(),
    ));

    let client_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let local = client_listener.local_addr().unwrap();
    let target =
        TargetDescriptor::new(format!("http://{server_addr}"), remote_host, remote_port).unwrap();
    let mut config = ClientConfig::new(local.port(), target);
    config.bridge = bridge;
    let client_observer = Arc::new(RecordingObserver::new());
    let client_supervisor = SessionSupervisor::new();
    tokio::spawn(serve_client(
        client_listener,
        config,
        Arc::new(TungsteniteConnector::new(Duration::from_secs(2))),
        Arc::clone(&client_observer) as Arc<dyn SessionObserver>,
        client_supervisor.clone(),
    ));

    Tunnel {
        local,
        server_observer,
        client_observer,
        client_supervisor,
    }
}

async fn wait_for(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "condition never held");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_ping_travels_through_both_halves() {
    // Arrange: "localhost" resolves on the server side, which is what the
    // path carries
    let dest = start_echo_destination().await;
    let tunnel = start_tunnel("localhost", dest).await;

    // Act
    let mut tcp = TcpStream::connect(tunnel.local).await.unwrap();
    tcp.write_all(b"ping").await.unwrap();
    let mut reply = [0u8; 4];
    tcp.read_exact(&mut reply).await.unwrap();

    // Assert
    assert_eq!(&reply, b"ping");
    let server_ids: Vec<(String, u16)> = tunnel
        .server_observer
        .events()
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Created { id, .. } => Some((id.host().to_string(), id.port())),
            _ => None,
        })
        .collect();
    assert_eq!(server_ids, vec![("localhost".to_string(), dest)]);
}

#[tokio::test]
async fn test_large_transfer_arrives_intact() {
    // Arrange
    let dest = start_echo_destination().await;
    let tunnel = start_tunnel("127.0.0.1", dest).await;
    let payload: Vec<u8> = (0..256 * 1024u32).map(|i| (i % 253) as u8).collect();

    // Act
    let tcp = TcpStream::connect(tunnel.local).await.unwrap();
    let (mut reader, mut writer) = tcp.into_split();
    let to_send = payload.clone();
    let writer_task = tokio::spawn(async move {
        writer.write_all(&to_send).await.unwrap();
        writer
    });
    let mut received = vec![0u8; payload.len()];
    reader.read_exact(&mut received).await.unwrap();
    let _writer = writer_task.await.unwrap();

    // Assert
    assert_eq!(received, payload);
}

#[tokio::test]
async fn test_local_close_ends_both_sessions() {
    // Arrange
    let dest = start_echo_destination().await;
    let tunnel = start_tunnel("127.0.0.1", dest).await;
    let mut tcp = TcpStream::connect(tunnel.local).await.unwrap();
    tcp.write_all(b"hi").await.unwrap();
    let mut reply = [0u8; 2];
    tcp.read_exact(&mut reply).await.unwrap();

    // Act
    drop(tcp);

    // Assert
    let client = Arc::clone(&tunnel.client_observer);
    wait_for(|| client.terminations().len() == 1).await;
    let server = Arc::clone(&tunnel.server_observer);
    wait_for(|| server.terminations().len() == 1).await;
    assert!(tunnel.client_observer.terminations()[0].1.is_normal());
    assert!(tunnel.server_observer.terminations()[0].1.is_normal());
}

#[tokio::test]
async fn test_unreachable_destination_closes_local_connection() {
    // Arrange: nothing listens on the destination port
    let dead = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let tunnel = start_tunnel("127.0.0.1", dead).await;

    // Act
    let mut tcp = TcpStream::connect(tunnel.local).await.unwrap();
    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(Duration::from_secs(5), tcp.read(&mut buf))
        .await
        .unwrap();

    // Assert: the local side sees EOF or a reset, never data
    assert!(matches!(read, Ok(0) | Err(_)));
    assert_eq!(tunnel.server_observer.created_count(), 0);
    tunnel.client_supervisor.shutdown_token().cancel();
}
