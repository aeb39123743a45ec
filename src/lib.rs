//! Korean financial-statement question answering.
//!
//! Questions are routed by how much retrieval they need. The iterative route
//! runs [`rag::IterativeRagEngine`], a bounded loop that alternates controller
//! decisions with structured-data queries and web searches before synthesizing
//! one answer from everything it collected.

pub mod assistant;
pub mod commands;
pub mod error;
pub mod llm;
pub mod rag;
pub mod router;
pub mod session;
pub mod state;
pub mod tools;
