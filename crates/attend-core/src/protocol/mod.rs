//! Protocol module: channel names and the JSON messages exchanged with the
//! frontend.

pub mod channels;
pub mod messages;

pub use messages::*;
