//! Domain layer
//!
//! - `value_object`: identifiers and timestamps
//! - `entity`: connections and rooms
//! - `repository`: room registry interface
//! - `message_pusher`: outbound message interface
//! - `error`: domain errors

pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use entity::{Connection, Departure, JoinOutcome, Room};
pub use error::{MessagePushError, RepositoryError, ValueObjectError};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::RoomRepository;
pub use value_object::{ConnectionId, RoomId, Timestamp};

#[cfg(test)]
pub use message_pusher::MockMessagePusher;
