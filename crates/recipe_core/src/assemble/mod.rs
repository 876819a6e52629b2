//! Aggregate read-model assembly.

pub mod recipe_assembler;
