//! Campus Onboard — institution onboarding workflow engine.

pub mod config;
pub mod error;
pub mod onboarding;
pub mod roles;
pub mod store;
