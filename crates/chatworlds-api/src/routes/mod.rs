pub mod credential;
pub mod health;
pub mod messages;
pub mod models;
pub mod relay;
pub mod threads;
