pub mod last_called;
pub mod register;
