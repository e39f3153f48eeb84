pub mod admin;
pub mod auth;
pub mod drivers;

pub mod utils;
