// src/services/mod.rs

pub mod ai;
pub mod catalog;
pub mod exam_engine;
pub mod exam_store;
pub mod pdf;
pub mod sample_bank;
pub mod stats;
pub mod youtube;
