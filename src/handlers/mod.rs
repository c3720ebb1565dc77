// src/handlers/mod.rs

pub mod attempt;
pub mod auth;
pub mod play;
pub mod quiz;
pub mod report;
