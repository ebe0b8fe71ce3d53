//! Refinement workflow: state machine, run registry and the runner that
//! drives collaborators through both.

pub mod machine;
pub mod registry;
pub mod runner;
pub mod stages;

pub use machine::{transition, transition_at, WorkflowEvent, ENHANCEMENT_BUDGET_EXHAUSTED};
pub use registry::RunRegistry;
pub use runner::{Collaborators, WorkflowRunner};
pub use stages::{
    BrandKitProvider, GenerationRequest, MediaEnhancer, RunRequest, VariationGenerator,
};
