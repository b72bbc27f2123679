// src/handlers/mod.rs

pub mod auth;
pub mod dashboard;
pub mod exams;
pub mod health;
pub mod past_questions;
pub mod questions;
pub mod study_plans;
pub mod topics;
pub mod upload;
