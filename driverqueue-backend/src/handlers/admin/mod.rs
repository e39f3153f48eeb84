pub mod attended;
pub mod call_next;
pub mod called;
pub mod clear;
pub mod get;
pub mod history;
pub mod queue;
pub mod recall;
