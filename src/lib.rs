//! Minimal two-party chat over an encrypted libp2p stream.
//!
//! One process listens and prints a connectable multiaddress; the other
//! dials that address and opens a stream tagged with the chat protocol.
//! Both ends then relay terminal input over the stream while displaying
//! whatever the peer sends. Each module focuses on a concrete
//! responsibility:
//!
//! - [`cli`] parses the command-line interface: no argument listens, a
//!   peer multiaddress dials.
//! - [`message`] defines the wire format, one bounded newline-delimited
//!   JSON frame per message, and the pure encode/decode pair.
//! - [`relay`] drives a session: two independent pumps (stdin to stream,
//!   stream to stdout) coordinated only through the stream's own close
//!   semantics.
//! - [`session`] delegates identity, transport security, and stream
//!   establishment to libp2p and hands the resulting stream to the relay.
//!
//! Unit and integration tests use this crate directly to exercise the
//! codec and the pumps over in-memory streams.

pub mod cli;
pub mod message;
pub mod relay;
pub mod session;
