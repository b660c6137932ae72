// src/utils/mod.rs

pub mod geo;
pub mod hash;
pub mod html;
pub mod jwt;
pub mod slug;
pub mod token;
pub mod upload;
