pub mod bot;
pub mod commands;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod model;
pub mod persistence;
pub mod types;

#[cfg(test)]
mod testing;

pub use bot::run;
