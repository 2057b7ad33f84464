//! Business logic services.
//!
//! Services contain core logic separated from HTTP handlers: key storage,
//! identity verification, and the geodata proxy client.

pub mod identity;
pub mod key_store;
pub mod poi_client;
