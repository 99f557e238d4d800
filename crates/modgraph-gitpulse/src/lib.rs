//! Git history analysis: change frequency, churn and hotspots.
//!
//! Mines recent commits with git2 and scores each Python file by how often
//! and how heavily it changed, flagging hotspots and stable files.

pub mod hotspots;
pub mod mining;
