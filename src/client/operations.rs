//! Client operations
//!
//! Applies a session's `register` and `send` requests to the registry and
//! router.

use log::warn;

use crate::client::Client;
use crate::error::{RegistryError, RouteError};
use crate::protocol::SendRequest;
use crate::registry::{Identity, Registration, Registry};
use crate::router::{Envelope, Router};

/// Handles a `register` request
pub fn process_register(
    client: &mut Client,
    requested: &str,
    registry: &Registry,
    max_identity_length: usize,
) -> Result<Registration, RegistryError> {
    let identity = Identity::parse(requested, max_identity_length)?;
    let registration = registry.register(identity, client.connection().clone())?;
    client.set_identity(registration.identity.clone());
    Ok(registration)
}

/// Handles a `send` request. The router reports failures to the client itself.
pub fn process_send(
    client: &Client,
    request: SendRequest,
    router: &Router,
) -> Result<Envelope, RouteError> {
    if let (Some(claimed), Some(identity)) = (request.from.as_deref(), client.identity()) {
        if claimed != identity.as_str() {
            warn!(
                "Client {} claimed to send as {:?} while registered as {}",
                client.addr(),
                claimed,
                identity
            );
        }
    }

    router.send(client.connection(), &request.to, request.body)
}
