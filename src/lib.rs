pub mod batch;
pub mod collector;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod heavy;
pub mod hello;
pub mod response;
pub mod server;
