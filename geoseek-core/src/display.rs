//! Display text for results and breadcrumbs.
//!
//! Result lists render each entry through its service's `displayName` and
//! `subTitle` templates. Results without a service template fall back to
//! plain property lookups.

use serde_json::Value;

use crate::state::SearchState;
use crate::template::TemplateResolver;
use crate::types::SearchResult;

const FALLBACK_PROPERTIES: [&str; 2] = ["display_name", "name"];

/// Title shown for a result in the list.
pub fn result_title(result: &SearchResult, resolver: &TemplateResolver) -> String {
    match result
        .service
        .as_ref()
        .and_then(|service| service.display_name.as_deref())
    {
        Some(template) => resolver.compile(template).render(&result.to_record()),
        None => fallback_title(result),
    }
}

/// Secondary line shown under the title, when the service defines one.
pub fn result_subtitle(result: &SearchResult, resolver: &TemplateResolver) -> Option<String> {
    let template = result.service.as_ref()?.sub_title.as_deref()?;
    Some(resolver.compile(template).render(&result.to_record()))
}

/// Title from well-known properties, then the identifier.
pub fn fallback_title(result: &SearchResult) -> String {
    FALLBACK_PROPERTIES
        .iter()
        .find_map(|key| match result.properties.get(*key) {
            Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
            Some(Value::Number(number)) => Some(number.to_string()),
            _ => None,
        })
        .or_else(|| result.identifier())
        .unwrap_or_default()
}

/// Breadcrumb texts joined outermost first.
pub fn breadcrumb_trail(state: &SearchState) -> String {
    state
        .selected_items
        .iter()
        .map(|item| item.text.as_str())
        .collect::<Vec<_>>()
        .join(" › ")
}
