//! Ferrocliff Chem - the boundary with the chemistry engine.
//!
//! The cliff engine never parses or fingerprints structures itself. It talks
//! to a [`ChemistryEngine`] through a [`SimilarityOracle`], which turns every
//! per-item engine failure into a logged skip and memoizes depictions.
//!
//! [`FragmentEngine`] is a small built-in engine for the organic subset of the
//! line notation, so the workspace runs without a native toolkit.

pub mod engine;
pub mod oracle;
pub mod fragment;

pub use engine::{ChemistryEngine, DepictOptions, Depiction, PatternMatch};
pub use fragment::FragmentEngine;
pub use oracle::SimilarityOracle;
