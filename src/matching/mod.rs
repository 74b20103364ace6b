//! Matching Module
//!
//! 번역 메모리(정확/퍼지)와 용어집 매칭 알고리즘

pub mod glossary;
pub mod memory;
pub mod sequence;

pub use memory::{FuzzyMatch, DEFAULT_FUZZY_THRESHOLD};
