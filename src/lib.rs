//! trustctl - add, remove and check trust certificates across certificate stores.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod platform;
pub mod store;
pub mod tool;
