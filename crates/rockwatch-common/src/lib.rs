//! Shared domain types for the rockwatch alert dispatch service.
//!
//! Facilities, risk assessments, explanations and the [`types::Alert`]
//! record live here so that the alert, notify and server crates agree on a
//! single data model. The [`i18n`] module holds the region → language →
//! template table used by message formatting.

pub mod i18n;
pub mod id;
pub mod types;
