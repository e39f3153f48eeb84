pub mod dto;
pub mod login;
pub mod logout;
pub mod utils;
