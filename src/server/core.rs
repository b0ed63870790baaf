use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::client::handle_client;
use crate::config::ServerConfig;
use crate::error::RelayError;
use crate::protocol::{ServerEvent, encode_event};
use crate::registry::Registry;
use crate::router::Router;

const TOO_MANY_CONNECTIONS: &str = "too many connections, try again later";

pub struct Server {
    router: Arc<Router>,
    listener: TcpListener,
    config: Arc<ServerConfig>,
    slots: Arc<Semaphore>,
}

impl Server {
    /// Binds the listener and builds the shared registry and router.
    pub async fn new(config: ServerConfig) -> Result<Self, RelayError> {
        let address = config.listen_address();

        let listener = match TcpListener::bind(&address).await {
            Ok(listener) => {
                info!("Server bound to {}", listener.local_addr()?);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", address, e);
                return Err(e.into());
            }
        };

        let registry = Arc::new(Registry::new(config.collision_policy));
        let router = Arc::new(Router::new(registry, config.max_body_length));
        let slots = Arc::new(Semaphore::new(config.max_clients));

        Ok(Self {
            router,
            listener,
            config: Arc::new(config),
            slots,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(self.router.registry())
    }

    pub async fn start(&self) {
        info!(
            "Starting presence relay on {} (max {} clients, collision policy {})",
            self.config.listen_address(),
            self.config.max_clients,
            self.config.collision_policy
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let permit = match Arc::clone(&self.slots).try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            warn!(
                                "Refusing {}: {} clients connected",
                                addr, self.config.max_clients
                            );
                            tokio::spawn(refuse_client(stream));
                            continue;
                        }
                    };

                    let router = Arc::clone(&self.router);
                    let config = Arc::clone(&self.config);

                    // Spawn a task for each client so accept loop doesn't block
                    tokio::spawn(async move {
                        handle_client(stream, addr, router, config).await;
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

/// Tells a client over the connection limit why it is being dropped.
async fn refuse_client(mut stream: TcpStream) {
    if let Ok(frame) = encode_event(&ServerEvent::error(TOO_MANY_CONNECTIONS)) {
        let _ = stream.write_all(frame.as_bytes()).await;
    }
    let _ = stream.shutdown().await;
}
