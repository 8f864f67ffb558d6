// switchyard_relay — the ordering authority for networked Switchyard games.
//
// The relay never runs the sim. It admits peers, collects their encoded
// commands, and broadcasts them in numbered turns at a fixed cadence so that
// every peer applies the same commands in the same order. It also compares
// the world checksums peers report and flags desyncs.
//
// Module overview:
// - `session.rs`:  Roster, admission checks, turn batching and ordering,
//                  checksum comparison. Transport-agnostic.
// - `server.rs`:   TCP acceptor, per-peer reader threads, and the
//                  single-threaded event loop that owns the `Session`.
// - `client.rs`:   `NetClient`, the peer side of the connection: handshake,
//                  background reader, non-blocking `poll()`.
//
// The binary (`main.rs`) wraps `start_relay` with a clap CLI; games and
// tests can embed the relay through the same library call.

pub mod client;
pub mod server;
pub mod session;

pub use client::{HelloInfo, NetClient, NetError, WelcomeInfo};
pub use server::{RelayConfig, RelayHandle, start_relay};
