// GcodeGate - core/mod.rs
//
// Core business logic layer: the check pipeline and its data model.
// Must NOT depend on: app or platform.

pub mod check;
pub mod discovery;
pub mod export;
pub mod metadata;
pub mod model;
pub mod pricing;
pub mod rules;
pub mod ruleset;
pub mod serializer;
pub mod tokenizer;
