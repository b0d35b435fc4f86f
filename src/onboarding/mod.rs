//! Onboarding workflow engine.
//!
//! A new institution is walked through a fixed sequence of setup steps
//! before it goes live. Which steps an actor sees depends on their
//! roles; navigation is gated so nobody skips past an incomplete step;
//! and the go-live transition checks a readiness checklist, then locks
//! the workflow for good.

pub mod checklist;
pub mod controller;
pub mod progress;
pub mod routes;
pub mod steps;

pub use checklist::{ChecklistItem, ChecklistItemId, ChecklistStatus};
pub use controller::WorkflowController;
pub use progress::{OnboardingProgress, ProgressPatch};
pub use routes::{onboarding_routes, OnboardingRouteState};
pub use steps::{visible_steps, StepDefinition, StepId};
