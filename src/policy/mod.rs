//! Label policy: loading, scoping, and evaluation.
//!
//! A [`PolicyDocument`] is parsed once per run, resolved into a
//! [`ResourcePolicy`] for the provider being scanned, and applied to each
//! resource by a [`ComplianceEvaluator`].

mod engine;
mod loader;
mod rules;

pub use engine::{has_all_required, has_no_banned, ComplianceEvaluator, Verdict};
pub use loader::{
    string_collection, PolicyDocument, BANNED_LABELS_KEY, EXCLUDED_RESOURCES_KEY,
    INCLUDED_RESOURCES_KEY, REQUIRED_LABELS_KEY,
};
pub use rules::{ResourcePolicy, ResourceScope};
