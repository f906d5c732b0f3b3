//! Integration tests for Geoseek
//!
//! These tests drive the search store through its public handle with mock
//! providers and check the commands and states it produces.

#[path = "integration/cascade_workflow.rs"]
mod cascade_workflow;
#[path = "integration/common.rs"]
mod common;
#[path = "integration/failure_recovery.rs"]
mod failure_recovery;
#[path = "integration/item_selection.rs"]
mod item_selection;
#[path = "integration/provider_wiring.rs"]
mod provider_wiring;
#[path = "integration/state_transitions.rs"]
mod state_transitions;
#[path = "integration/template_cache.rs"]
mod template_cache;
