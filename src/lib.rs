//! Wagate - an HTTP gateway for a single WhatsApp Web session.
//!
//! The gateway owns no messaging logic itself: an external session driver
//! (see [`driver`]) holds the authenticated WhatsApp connection and pushes
//! lifecycle events into the [`session`] tracker. HTTP handlers only read
//! tracker snapshots and forward sends through the [`dispatch`] layer,
//! gated by the [`ratelimit`] admission controller.

pub mod config;
pub mod dispatch;
pub mod driver;
pub mod handlers;
pub mod qr;
pub mod ratelimit;
pub mod response;
pub mod server;
pub mod session;
