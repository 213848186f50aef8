//! # Transport Adapters
//!
//! Thin I/O adapters that move serialized packet records between the
//! protocol core and a physical medium. They hold no protocol logic: the
//! sender side writes records produced by
//! [`Message::construct_packets`](crate::protocol::message::Message::construct_packets),
//! the receiver side feeds records to a
//! [`Reassembler`](crate::protocol::reassembler::Reassembler).
//!
//! ## Adapters
//! - **Drop directory**: one file per packet in a watched directory (async, tokio)

pub mod drop_dir;
