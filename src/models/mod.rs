// src/models/mod.rs

pub mod review;
pub mod store;
pub mod user;
