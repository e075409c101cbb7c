pub mod indicators;
pub mod scoring;

pub use scoring::{rank_descending, StatusInputs, StatusRule, StatusRules};
