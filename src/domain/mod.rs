// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits that define what the system
// works with: labelled image samples, normalisation statistics,
// and the evaluation report.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Everything in here is testable without a backend or a GPU.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A labelled image on disk and its binary class
pub mod sample;

// Per-channel mean / standard deviation and how they are accumulated
pub mod stats;

// Accuracy and 2x2 confusion matrix
pub mod confusion;

// Core abstractions (traits) that other layers implement
pub mod traits;
