// src/handlers/mod.rs

pub mod account;
pub mod api;
pub mod auth;
pub mod reviews;
pub mod stores;
pub mod tags;
