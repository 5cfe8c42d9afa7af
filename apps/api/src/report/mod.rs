//! Feedback report: rubric scoring and markdown rendering.

pub mod generator;
pub mod rubric;
