// src/prober/mod.rs
pub mod background;
pub mod service;
