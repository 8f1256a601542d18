pub mod base;
pub mod client;
pub mod config;
pub mod errors;
pub mod infer;
pub mod models;
pub mod proto;
pub mod serve;
pub mod service;
pub mod trace;
