//! The `transport` module exposes the broker over WebSockets.
//!
//! Every client frame is one request and gets exactly one response frame.
//! A `subscribe` frame is a long poll: the response is the first message
//! that reaches the session, or `empty` once the session timeout passes.

pub mod message;
pub mod websocket;

#[cfg(test)]
mod tests;
