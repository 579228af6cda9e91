pub mod broadcaster;
pub mod connection;
pub mod games;
pub mod listener;
pub mod matchmaking;
pub mod server_config;
pub mod session;
