pub mod auth;
pub mod bootstrap;
pub mod clock;
pub mod commands;
pub mod facade;
pub mod session;
pub mod views;
