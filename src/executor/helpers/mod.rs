pub mod command;
pub mod naming;
