// src/models/mod.rs

pub mod dashboard;
pub mod exam;
pub mod lesson;
pub mod past_question;
pub mod question;
pub mod study_plan;
pub mod user;
