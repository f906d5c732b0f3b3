//! Compiled template identity and rendering.

use std::num::NonZeroUsize;
use std::sync::Arc;

use geoseek_core::TemplateResolver;
use serde_json::json;

#[test]
fn test_same_source_returns_same_compiled_template() {
    let resolver = TemplateResolver::default();
    let first = resolver.compile("this is a ${test}");
    let second = resolver.compile("this is a ${test}");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.render(&json!({"test": "TEST"})), "this is a TEST");
    assert_eq!(resolver.cache().len(), 1);
}

#[test]
fn test_cloned_resolvers_share_cache() {
    let resolver = TemplateResolver::default();
    let clone = resolver.clone();

    let first = resolver.compile("${properties.name}");
    let second = clone.compile("${properties.name}");
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_bounded_cache_still_renders() {
    let resolver = TemplateResolver::with_capacity(NonZeroUsize::new(1));
    let record = json!({"a": "x", "b": "y"});

    assert_eq!(resolver.render("${a}", &record), "x");
    assert_eq!(resolver.render("${b}", &record), "y");
    assert_eq!(resolver.render("${a}-${b}", &record), "x-y");
    assert_eq!(resolver.cache().len(), 1);
}

#[test]
fn test_missing_path_renders_empty() {
    let resolver = TemplateResolver::default();
    assert_eq!(
        resolver.render("${properties.missing}|${properties.list[1]}", &json!({
            "properties": { "list": ["a", "b"] }
        })),
        "|b"
    );
}
