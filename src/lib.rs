//! perfwatch - real-time performance counter monitor for virtual machines.
//!
//! The library holds the polling engine, the console surface and a scripted
//! backend; `perfwatch` is the command-line front end.

pub mod collector;
pub mod config;
pub mod console;
pub mod model;
pub mod monitor;
pub mod util;
