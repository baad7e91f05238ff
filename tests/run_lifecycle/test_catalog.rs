//! Catalog sync and cluster discovery against the database.

use ostf_adapter_lib::services::{catalog, discovery};

use super::test_helpers::*;

/// Re-syncing replaces templates but keeps per-run rows.
#[actix_rt::test]
async fn test_resync_replaces_templates_only() {
    let db = create_test_db().await;
    let tracker = create_tracker(&db.pool, FakeDriver::new());
    let detail = start_run(&tracker, "sanity", 5, &[]).await;

    let updated = catalog::parse_catalog(
        r#"{"test_sets": [{
            "id": "sanity",
            "description": "Sanity checks",
            "test_path": "fuel_health/tests/sanity",
            "tests": [{"name": "fuel_health.tests.sanity.test_d", "title": "Check D"}]
        }]}"#,
    )
    .unwrap();
    let summary = catalog::sync_catalog(&db.pool, updated).await.unwrap();
    assert_eq!(summary.test_sets, 1);
    assert_eq!(summary.tests, 1);

    let sanity = get_test_set(&db.pool, "sanity").await;
    assert_eq!(sanity.description, "Sanity checks");

    let templates: Vec<String> = db
        .pool
        .list_template_tests()
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.test_set_id == "sanity")
        .map(|t| t.name)
        .collect();
    assert_eq!(templates, vec!["fuel_health.tests.sanity.test_d"]);

    assert_eq!(reload(&db.pool, detail.run.id).await.tests.len(), 3);
}

/// Registration keeps the sets and tests matching tags and release.
#[actix_rt::test]
async fn test_register_cluster_patterns() {
    let db = create_test_db().await;

    let response = discovery::register_cluster(
        &db.pool,
        3,
        vec!["ha".to_string(), "Murano".to_string()],
        "2015.1.0-7.0".to_string(),
    )
    .await
    .unwrap();

    assert_eq!(response.cluster_id, 3);
    let mut testsets = response.testsets.clone();
    testsets.sort();
    assert_eq!(testsets, vec!["broken", "ha", "platform", "sanity", "smoke"]);

    let cluster = db.pool.get_cluster(3).await.unwrap().unwrap();
    assert_eq!(cluster.release_version, "2015.1.0-7.0");

    let platform = db
        .pool
        .list_testing_patterns(3)
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.test_set_id == "platform")
        .unwrap();
    assert_eq!(platform.tests.0, vec![PLATFORM_HEAT, PLATFORM_MURANO]);
}

/// Re-registering recomputes patterns from the new tags and release.
#[actix_rt::test]
async fn test_reregister_cluster_replaces_patterns() {
    let db = create_test_db().await;

    discovery::register_cluster(&db.pool, 3, vec!["ha".to_string()], "2015.1.0-7.0".to_string())
        .await
        .unwrap();
    let response = discovery::register_cluster(
        &db.pool,
        3,
        vec!["multinode".to_string()],
        "2014.2-5.1".to_string(),
    )
    .await
    .unwrap();

    let mut testsets = response.testsets;
    testsets.sort();
    assert_eq!(testsets, vec!["broken", "sanity", "smoke"]);

    let ids: Vec<String> = db
        .pool
        .test_sets_for_cluster(3)
        .await
        .unwrap()
        .into_iter()
        .map(|ts| ts.id)
        .collect();
    assert_eq!(ids, vec!["broken", "sanity", "smoke"]);
}

/// Applicable test sets come back in run priority order.
#[actix_rt::test]
async fn test_cluster_test_sets_ordered_by_priority() {
    let db = create_test_db().await;

    discovery::register_cluster(&db.pool, 4, vec!["ha".to_string()], "2015.1.0-7.0".to_string())
        .await
        .unwrap();

    let ids: Vec<String> = db
        .pool
        .test_sets_for_cluster(4)
        .await
        .unwrap()
        .into_iter()
        .map(|ts| ts.id)
        .collect();
    assert_eq!(ids, vec!["broken", "ha", "sanity", "smoke", "platform"]);

    let tests = db.pool.template_tests_for_cluster(4).await.unwrap();
    assert!(tests.iter().any(|t| t.name == PLATFORM_HEAT));
    assert!(!tests.iter().any(|t| t.name == PLATFORM_MURANO));
}
