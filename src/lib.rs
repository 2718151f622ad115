pub mod banner;
pub mod capture;
pub mod channel;
pub mod chunk;
pub mod classify;
pub mod commands;
pub mod config;
pub mod consts;
pub mod extract;
pub mod relay;
pub mod store;
pub mod tasks;
