//! HTTP request handlers.

mod index;
mod messages;
mod status;

pub use index::index;
pub use messages::send_message;
pub use status::status;
