pub mod admin;
pub mod screen_token;
