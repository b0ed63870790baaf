use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::CollisionPolicy;
use crate::error::{DeliveryError, RegistryError};
use crate::protocol::ServerEvent;
use crate::registry::results::{Registration, Unregistration};
use crate::registry::{ConnectionHandle, ConnectionId, EventSink, Identity};

/// Reason given to a connection that loses its identity under `CollisionPolicy::Evict`.
pub const EVICTED_REASON: &str = "identity claimed by another session";

type Undelivered = Vec<(ConnectionId, DeliveryError)>;

/// Both directions of the identity ↔ connection mapping, kept in step.
struct Table<S> {
    by_identity: BTreeMap<Identity, S>,
    by_connection: HashMap<ConnectionId, Identity>,
}

impl<S: EventSink> Table<S> {
    fn insert(&mut self, identity: Identity, connection: S) {
        self.by_connection.insert(connection.id(), identity.clone());
        self.by_identity.insert(identity, connection);
    }

    fn remove_identity(&mut self, identity: &Identity) -> Option<S> {
        let connection = self.by_identity.remove(identity)?;
        self.by_connection.remove(&connection.id());
        Some(connection)
    }

    fn snapshot(&self) -> Vec<Identity> {
        self.by_identity.keys().cloned().collect()
    }

    /// Sends the current presence set to every registered connection.
    ///
    /// A failed emit is recorded and the fan-out continues.
    fn broadcast_presence(&self) -> (Vec<Identity>, Undelivered) {
        let presence = self.snapshot();
        let event = ServerEvent::Presence(presence.iter().map(Identity::to_string).collect());

        let mut undelivered = Vec::new();
        for (identity, connection) in &self.by_identity {
            if let Err(e) = connection.emit(event.clone()) {
                warn!(
                    "Presence update to {} ({}) failed: {}",
                    identity,
                    connection.id(),
                    e
                );
                undelivered.push((connection.id(), e));
            }
        }

        (presence, undelivered)
    }
}

/// Registry of live, registered connections
///
/// All mutations and the presence broadcast each one triggers run under one
/// lock, so every client sees the same sequence of presence sets.
pub struct Registry<S: EventSink = ConnectionHandle> {
    table: Mutex<Table<S>>,
    policy: CollisionPolicy,
}

impl<S: EventSink> Registry<S> {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            table: Mutex::new(Table {
                by_identity: BTreeMap::new(),
                by_connection: HashMap::new(),
            }),
            policy,
        }
    }

    // The table is only mutated through methods that keep both maps consistent,
    // so a panic elsewhere while holding the lock cannot leave it half-updated.
    fn lock(&self) -> MutexGuard<'_, Table<S>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds `identity` to `connection` and broadcasts the new presence set.
    ///
    /// Fails without touching state if the connection is already registered,
    /// or if the identity is held by another connection under
    /// `CollisionPolicy::Reject`. Under `CollisionPolicy::Evict` the previous
    /// holder is closed and replaced.
    pub fn register(&self, identity: Identity, connection: S) -> Result<Registration, RegistryError> {
        let mut table = self.lock();

        if let Some(held) = table.by_connection.get(&connection.id()) {
            return Err(RegistryError::AlreadyRegistered(held.to_string()));
        }

        let evicted = if table.by_identity.contains_key(&identity) {
            match self.policy {
                CollisionPolicy::Reject => {
                    return Err(RegistryError::IdentityTaken(identity.into_string()));
                }
                CollisionPolicy::Evict => table.remove_identity(&identity),
            }
        } else {
            None
        };

        if let Some(previous) = &evicted {
            info!(
                "Evicting {} from identity {} in favour of {}",
                previous.id(),
                identity,
                connection.id()
            );
            previous.close(EVICTED_REASON);
        }

        table.insert(identity.clone(), connection);
        let (presence, undelivered) = table.broadcast_presence();

        Ok(Registration {
            identity,
            evicted: evicted.map(|previous| previous.id()),
            presence,
            undelivered,
        })
    }

    /// Removes whatever identity `connection` holds and rebroadcasts.
    ///
    /// Returns `None`, and broadcasts nothing, when the connection holds no
    /// identity (never registered, already removed, or evicted).
    pub fn unregister(&self, connection: ConnectionId) -> Option<Unregistration> {
        let mut table = self.lock();

        let identity = table.by_connection.get(&connection)?.clone();
        table.remove_identity(&identity);
        let (presence, undelivered) = table.broadcast_presence();

        Some(Unregistration {
            identity,
            presence,
            undelivered,
        })
    }

    /// Current presence set, sorted.
    pub fn snapshot(&self) -> Vec<Identity> {
        self.lock().snapshot()
    }

    pub fn identity_of(&self, connection: ConnectionId) -> Option<Identity> {
        self.lock().by_connection.get(&connection).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` against the sender's identity and the destination's
    /// connection while holding the lock, so no unregister can interleave
    /// between lookup and delivery.
    pub fn route<R>(
        &self,
        sender: ConnectionId,
        to: &str,
        f: impl FnOnce(Option<&Identity>, Option<&S>) -> R,
    ) -> R {
        let table = self.lock();
        f(table.by_connection.get(&sender), table.by_identity.get(to))
    }
}

impl<S: EventSink + Clone> Registry<S> {
    /// Point lookup of the connection holding `identity`.
    pub fn resolve(&self, identity: &str) -> Option<S> {
        self.lock().by_identity.get(identity).cloned()
    }
}
