#![doc = include_str!("../README.md")]

pub mod commands;
pub mod core;
pub mod gettext;
pub mod utils;
