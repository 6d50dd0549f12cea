//! # ttlsub
//!
//! `ttlsub` is an in-memory, topic-based publish/subscribe broker.
//! Producers publish named messages to topics; consumers open time-bounded
//! subscriptions and receive live messages plus a replay of each topic's
//! cached, unexpired state.
//!
//! ## Core Modules
//!
//! - `broker`: the registry, topics, subscriptions and messages.
//! - `client`: the producer/consumer handle over a shared registry.
//! - `config`: loading server, broker and logging settings.
//! - `transport`: the WebSocket request/response front end.
//! - `utils`: error type, logging and shared helpers.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
