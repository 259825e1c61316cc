pub mod client;
pub mod reconnect;

pub use client::RealtimeClient;
pub use reconnect::ReconnectPolicy;
