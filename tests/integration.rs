use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use presence_relay::registry::Registry;
use presence_relay::{CollisionPolicy, Server, ServerConfig};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

const READ_TIMEOUT: Duration = Duration::from_secs(2);
const QUIET_PERIOD: Duration = Duration::from_millis(200);

// Start a server on an ephemeral port and return its address
async fn start_server(config: ServerConfig) -> SocketAddr {
    start_server_with_registry(config).await.0
}

// Same as start_server, also handing back the live registry
async fn start_server_with_registry(config: ServerConfig) -> (SocketAddr, Arc<Registry>) {
    let server = Server::new(ServerConfig { port: 0, ..config })
        .await
        .expect("server should bind");
    let addr = server.local_addr().unwrap();
    let registry = server.registry();
    tokio::spawn(async move { server.start().await });
    (addr, registry)
}

fn online(registry: &Registry) -> Vec<String> {
    registry
        .snapshot()
        .into_iter()
        .map(|identity| identity.into_string())
        .collect()
}

struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    async fn send_raw(&mut self, raw: &str) {
        self.send_bytes(raw.as_bytes()).await;
    }

    async fn send_bytes(&mut self, raw: &[u8]) {
        self.writer.write_all(raw).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn send(&mut self, frame: Value) {
        self.send_raw(&format!("{}\n", frame)).await;
    }

    async fn register(&mut self, identity: &str) {
        self.send(json!({"event": "register", "data": identity})).await;
    }

    async fn message(&mut self, to: &str, body: &str) {
        self.send(json!({"event": "send", "data": {"to": to, "body": body}}))
            .await;
    }

    async fn recv(&mut self) -> Value {
        let mut line = String::new();
        let n = timeout(READ_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for an event")
            .unwrap();
        assert!(n > 0, "connection closed while waiting for an event");
        serde_json::from_str(line.trim_end()).expect("server sent invalid JSON")
    }

    async fn expect_presence(&mut self, identities: &[&str]) {
        assert_eq!(
            self.recv().await,
            json!({"event": "presence", "data": identities})
        );
    }

    async fn expect_error(&mut self, reason: &str) {
        assert_eq!(
            self.recv().await,
            json!({"event": "error", "data": {"reason": reason}})
        );
    }

    async fn expect_quiet(&mut self) {
        let mut line = String::new();
        let read = timeout(QUIET_PERIOD, self.reader.read_line(&mut line)).await;
        assert!(read.is_err(), "unexpected event: {}", line);
    }

    async fn expect_closed(&mut self) {
        let mut line = String::new();
        let n = timeout(READ_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for close")
            .unwrap_or(0);
        assert_eq!(n, 0, "expected close, got: {}", line);
    }
}

#[tokio::test]
async fn test_direct_message() {
    let addr = start_server(ServerConfig::default()).await;
    let mut neo = TestClient::connect(addr).await;
    let mut elliot = TestClient::connect(addr).await;
    let mut bystander = TestClient::connect(addr).await;

    neo.register("neo").await;
    neo.expect_presence(&["neo"]).await;
    elliot.register("elliot").await;
    elliot.expect_presence(&["elliot", "neo"]).await;
    neo.expect_presence(&["elliot", "neo"]).await;

    neo.message("elliot", "hello").await;

    let received = elliot.recv().await;
    assert_eq!(received["event"], "message-received");
    assert_eq!(received["data"]["from"], "neo");
    assert_eq!(received["data"]["body"], "hello");
    assert!(received["data"]["sentAt"].is_string());

    let sent = neo.recv().await;
    assert_eq!(sent["event"], "message-sent");
    assert_eq!(sent["data"]["to"], "elliot");
    assert_eq!(sent["data"]["body"], "hello");
    assert_eq!(sent["data"]["sentAt"], received["data"]["sentAt"]);

    neo.expect_quiet().await;
    elliot.expect_quiet().await;
    // Never registered, so not part of any broadcast either
    bystander.expect_quiet().await;
}

#[tokio::test]
async fn test_unreachable_recipient() {
    let addr = start_server(ServerConfig::default()).await;
    let mut neo = TestClient::connect(addr).await;
    let mut observer = TestClient::connect(addr).await;

    observer.register("observer").await;
    observer.expect_presence(&["observer"]).await;
    neo.register("neo").await;
    neo.expect_presence(&["neo", "observer"]).await;
    observer.expect_presence(&["neo", "observer"]).await;

    neo.message("mrrobot", "hello friend").await;

    let error = neo.recv().await;
    assert_eq!(error["event"], "message-error");
    assert_eq!(error["data"]["to"], "mrrobot");
    assert_eq!(error["data"]["reason"], "recipient unreachable");

    neo.expect_quiet().await;
    observer.expect_quiet().await;
}

#[tokio::test]
async fn test_disconnect_rebroadcasts_presence() {
    let (addr, registry) = start_server_with_registry(ServerConfig::default()).await;
    let mut observer = TestClient::connect(addr).await;
    observer.register("observer").await;
    observer.expect_presence(&["observer"]).await;

    let mut neo = TestClient::connect(addr).await;
    neo.register("neo").await;
    neo.expect_presence(&["neo", "observer"]).await;
    observer.expect_presence(&["neo", "observer"]).await;

    assert_eq!(online(&registry), ["neo", "observer"]);

    drop(neo);
    observer.expect_presence(&["observer"]).await;
    assert_eq!(online(&registry), ["observer"]);

    // A message to the departed identity is now a miss
    observer.message("neo", "still there?").await;
    let error = observer.recv().await;
    assert_eq!(error["event"], "message-error");
    assert_eq!(error["data"]["to"], "neo");
}

#[tokio::test]
async fn test_unregistered_disconnect_is_silent() {
    let addr = start_server(ServerConfig::default()).await;
    let mut observer = TestClient::connect(addr).await;
    observer.register("observer").await;
    observer.expect_presence(&["observer"]).await;

    let lurker = TestClient::connect(addr).await;
    drop(lurker);

    observer.expect_quiet().await;
}

#[tokio::test]
async fn test_duplicate_identity_rejected() {
    let addr = start_server(ServerConfig::default()).await;
    let mut first = TestClient::connect(addr).await;
    let mut second = TestClient::connect(addr).await;

    first.register("neo").await;
    first.expect_presence(&["neo"]).await;

    second.register("neo").await;
    second.expect_error("identity already taken: neo").await;
    first.expect_quiet().await;

    // The refused connection may still pick another identity
    second.register("trinity").await;
    second.expect_presence(&["neo", "trinity"]).await;
    first.expect_presence(&["neo", "trinity"]).await;
}

#[tokio::test]
async fn test_duplicate_identity_evicts_under_evict_policy() {
    let config = ServerConfig {
        collision_policy: CollisionPolicy::Evict,
        ..ServerConfig::default()
    };
    let addr = start_server(config).await;
    let mut first = TestClient::connect(addr).await;
    let mut second = TestClient::connect(addr).await;

    first.register("neo").await;
    first.expect_presence(&["neo"]).await;

    second.register("neo").await;
    second.expect_presence(&["neo"]).await;

    first.expect_error("identity claimed by another session").await;
    first.expect_closed().await;

    // The evicted session's close must not take the identity with it
    second.message("neo", "ping").await;
    let received = second.recv().await;
    assert_eq!(received["event"], "message-received");
    let sent = second.recv().await;
    assert_eq!(sent["event"], "message-sent");
}

#[tokio::test]
async fn test_reregistration_rejected() {
    let addr = start_server(ServerConfig::default()).await;
    let mut neo = TestClient::connect(addr).await;

    neo.register("neo").await;
    neo.expect_presence(&["neo"]).await;

    neo.register("thomas").await;
    neo.expect_error("connection already registered as neo").await;
    neo.expect_quiet().await;
}

#[tokio::test]
async fn test_validation_errors() {
    let addr = start_server(ServerConfig::default()).await;
    let mut client = TestClient::connect(addr).await;

    client.register("   ").await;
    client.expect_error("identity must not be empty").await;

    client.message("elliot", "hello").await;
    let error = client.recv().await;
    assert_eq!(error["event"], "message-error");
    assert_eq!(error["data"]["reason"], "register before sending");

    client.register("neo").await;
    client.expect_presence(&["neo"]).await;

    client.message("", "hello").await;
    let error = client.recv().await;
    assert_eq!(error["data"]["reason"], "destination must not be empty");
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection() {
    let addr = start_server(ServerConfig::default()).await;
    let mut client = TestClient::connect(addr).await;

    client.send_raw("USER anonymous\r\n").await;
    let error = client.recv().await;
    assert_eq!(error["event"], "error");
    assert!(
        error["data"]["reason"]
            .as_str()
            .unwrap()
            .starts_with("malformed frame")
    );

    // Blank lines are ignored, CRLF is accepted
    client
        .send_raw("\r\n{\"event\":\"register\",\"data\":\"neo\"}\r\n")
        .await;
    client.expect_presence(&["neo"]).await;
}

#[tokio::test]
async fn test_invalid_utf8_keeps_connection() {
    let addr = start_server(ServerConfig::default()).await;
    let mut neo = TestClient::connect(addr).await;
    let mut observer = TestClient::connect(addr).await;

    observer.register("observer").await;
    observer.expect_presence(&["observer"]).await;
    neo.register("neo").await;
    neo.expect_presence(&["neo", "observer"]).await;
    observer.expect_presence(&["neo", "observer"]).await;

    neo.send_bytes(b"{\"event\":\"register\",\"data\":\"\xff\xfe\"}\n")
        .await;
    neo.expect_error("frame is not valid UTF-8").await;

    // Still registered: nobody saw a departure and messages still flow
    observer.expect_quiet().await;
    neo.message("neo", "still here").await;
    let received = neo.recv().await;
    assert_eq!(received["event"], "message-received");
    assert_eq!(received["data"]["body"], "still here");
    let sent = neo.recv().await;
    assert_eq!(sent["event"], "message-sent");
}

#[tokio::test]
async fn test_oversize_frame_closes_connection() {
    let config = ServerConfig {
        max_frame_length: 64,
        max_body_length: 32,
        ..ServerConfig::default()
    };
    let addr = start_server(config).await;
    let mut client = TestClient::connect(addr).await;

    // Exactly fills the read limit (frame plus CRLF), so nothing is left unread
    client.send_raw(&"x".repeat(66)).await;
    client.expect_error("frame exceeds 64 bytes").await;
    client.expect_closed().await;
}

#[tokio::test]
async fn test_connection_limit() {
    let config = ServerConfig {
        max_clients: 1,
        ..ServerConfig::default()
    };
    let addr = start_server(config).await;

    let mut first = TestClient::connect(addr).await;
    first.register("neo").await;
    first.expect_presence(&["neo"]).await;

    let mut second = TestClient::connect(addr).await;
    second.expect_error("too many connections, try again later").await;
    second.expect_closed().await;

    // The slot frees up once the first client leaves
    drop(first);
    tokio::time::sleep(QUIET_PERIOD).await;
    let mut third = TestClient::connect(addr).await;
    third.register("elliot").await;
    third.expect_presence(&["elliot"]).await;
}
