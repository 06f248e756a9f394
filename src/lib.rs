#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![doc = include_str!("../README.md")]

mod config;

mod interrupt;
pub use interrupt::Interrupt;

mod lock;
pub use lock::{Error, Lock};

mod opcode;

mod permit;
pub use permit::Permit;

mod state;
mod wait_queue;

#[cfg(test)]
mod tests;
