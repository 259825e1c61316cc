pub mod pairing;
pub mod realtime;
pub mod screen;
