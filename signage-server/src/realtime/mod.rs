pub mod hub;
pub mod sessions;

pub use hub::RealtimeHub;
pub use sessions::{ConnectionId, ScreenSession, SessionTable};
