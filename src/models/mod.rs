// src/models/mod.rs

pub mod answer;
pub mod catalog;
pub mod exam;
pub mod grade;
