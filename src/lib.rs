//! Encoder and decoder for the DNS message wire format.
//!
//! This crate converts between an in-memory [`Message`] and its big-endian
//! byte encoding: the fixed 12-byte header, length-prefixed domain name
//! labels (including decompression of intra-message pointers), questions,
//! and resource records. Record payloads can be interpreted into typed
//! values through [`Answer::process`].
//!
//! Transport, caching, and resolution are left to callers; this crate never
//! performs I/O and keeps no state between calls.
//!
//! [`Message`]: message::Message
//! [`Answer::process`]: message::Answer::process

mod hex;
pub mod message;
mod num;

/// Size of unicast DNS message buffers.
///
/// Unicast DNS messages are limited to 512 Bytes.
pub const DNS_BUFFER_SIZE: usize = 512;
