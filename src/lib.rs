//! Exact-test significance of transcription factor binding site disruption and
//! emergence by cancer mutations, against a randomized mutation background

pub mod config;
pub mod correction;
pub mod error;
pub mod fisher;
pub mod inputs;
pub mod statistics;
pub mod table;
pub mod types;
