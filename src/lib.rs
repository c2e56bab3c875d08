pub mod cli;
pub mod config;
pub mod migrate;
pub mod remote;
pub mod session;
pub mod ui;
