pub mod realtime;
pub mod screens;
pub mod serve;
