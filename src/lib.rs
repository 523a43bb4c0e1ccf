#![doc = include_str!("RUSTDOC.md")]

pub mod platform;
pub mod provider;
pub mod session;
pub mod util;
