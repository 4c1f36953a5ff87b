// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing the data the trainer works on:
// land-cover classes, partitions and the slices drawn from them.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only structs, enums and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// The six SAT-6 land-cover classes
pub mod land_cover;

// Train/test partitions and borrowed sample slices
pub mod partition;

// Core abstractions (traits) that other layers implement
pub mod traits;
