pub mod campaign;
pub mod cli;
pub mod config;
pub mod database;
pub mod offboard;
pub mod services;
pub mod types;

#[cfg(test)]
pub mod testing;
