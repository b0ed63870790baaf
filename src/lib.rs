pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;

#[cfg(test)]
mod test_support;

pub use config::{CollisionPolicy, ServerConfig};
pub use server::Server;
