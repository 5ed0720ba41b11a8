// src/engine/mod.rs

//! Pure, synchronous grading core: normalisers, answer matching, flattening and scoring.
//! Nothing in here performs I/O.

pub mod consigne;
pub mod evaluator;
pub mod flatten;
pub mod grading;
pub mod matcher;
pub mod normalize;
pub mod repair;

pub use consigne::{ConsigneSplit, parse_consignes};
pub use evaluator::{Equivalence, equivalent, evaluate};
pub use flatten::{FlatQuestion, PublicQuestion, flatten, group_runs};
pub use grading::{GradingContext, grade, grade_exam, grade_question};
pub use matcher::{MatchOptions, matches};
