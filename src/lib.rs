// Purpose: Define crate-level module surface for the dependency synchronizer.
// Inputs/Outputs: Re-exports internal modules for the binary, tests, and embedding build scripts.
// Invariants: Public module boundaries should remain stable for internal callers.
// Gotchas: Keep module wiring consistent with the src/main.rs entry path.

pub mod cli;
pub mod manifest;
pub mod status;
pub mod sync;
pub mod vcs;
