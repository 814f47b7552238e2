pub mod cli;
pub mod config;
pub mod door;
pub mod error;
pub mod sync;
pub mod transform;

#[cfg(test)]
pub mod testing;
