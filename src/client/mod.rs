//! The `client` module is the producer/consumer face of the broker.
//!
//! It provides the `Client` struct, a cheap-to-clone handle over a shared
//! `Registry` that fills in default lifetimes and implements the
//! single-receive "poll" cycle a request/response front end needs.

pub mod pubsub_client;
pub use pubsub_client::Client;

#[cfg(test)]
mod tests;
