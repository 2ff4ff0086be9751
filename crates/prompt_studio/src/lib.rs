//! Command-line front end over the prompt engine and chat transports.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod provider;
