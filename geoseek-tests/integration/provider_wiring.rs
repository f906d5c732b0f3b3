//! HTTP providers wired into the store.

use geoseek_core::{
    GeoseekConfig, ServiceDescriptor, ServiceKind, TemplateResolver, spawn_search_store,
};

use crate::common::init_test_tracing;

#[test]
fn test_registry_serves_builtin_kinds() {
    let registry = geoseek_search::build_registry(&GeoseekConfig::for_testing().providers).unwrap();
    assert!(registry.contains(&ServiceKind::Nominatim));
    assert!(registry.contains(&ServiceKind::Wfs));
}

#[tokio::test]
async fn test_misconfigured_wfs_service_surfaces_error() {
    init_test_tracing();
    let config = GeoseekConfig::for_testing();
    let registry = geoseek_search::build_registry(&config.providers).unwrap();
    let handle = spawn_search_store(config, registry, TemplateResolver::default());

    handle
        .start_search("Garibaldi", Some(vec![ServiceDescriptor::new("wfs")]))
        .await
        .unwrap();
    let state = handle.wait_until_idle().await.unwrap();

    let error = state.error.unwrap();
    assert_eq!(error.service.as_deref(), Some("wfs"));
    assert!(error.message.contains("url"), "{}", error.message);
}
