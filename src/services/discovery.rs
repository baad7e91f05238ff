//! Works out which test sets and tests apply to a cluster.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::{debug, info};

use crate::db::DbPool;
use crate::db::clusters::NewTestingPattern;
use crate::entity::StringList;
use crate::error::AppResult;
use crate::models::RegisterClusterResponse;

/// Whether a cluster with `cluster_tags` satisfies every requirement.
///
/// A requirement may list alternatives separated by `|`; it is met when any
/// alternative is. An alternative prefixed with `!` is met when the tag is
/// absent. Comparison ignores case, and no requirements always match.
pub fn tags_match(requirements: &[String], cluster_tags: &HashSet<String>) -> bool {
    requirements.iter().all(|requirement| {
        requirement
            .split('|')
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .any(|alt| match alt.strip_prefix('!') {
                Some(tag) => !cluster_tags.contains(&tag.to_lowercase()),
                None => cluster_tags.contains(&alt.to_lowercase()),
            })
    })
}

/// Whether something introduced in `since` exists in `release`.
///
/// Both values look like `2014.2-6.1`; only the part after the last `-` is
/// compared, numerically and segment by segment. An empty `since` is always
/// available.
pub fn release_available(since: &str, release: &str) -> bool {
    let since = since.trim();
    if since.is_empty() {
        return true;
    }

    compare_versions(version_part(release), version_part(since)) != Ordering::Less
}

fn version_part(release: &str) -> &str {
    release.rsplit('-').next().unwrap_or(release).trim()
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|segment| segment.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));

    let len = a.len().max(b.len());
    for i in 0..len {
        let (x, y) = (
            a.get(i).copied().unwrap_or(0),
            b.get(i).copied().unwrap_or(0),
        );
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

fn normalize_tags(tags: &[String]) -> HashSet<String> {
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn applies(deployment_tags: &StringList, since: &str, tags: &HashSet<String>, release: &str) -> bool {
    tags_match(&deployment_tags.0, tags) && release_available(since, release)
}

/// Record a cluster and recompute its testing patterns.
///
/// Test sets with no applicable test are left out of the patterns, which
/// hides them from the cluster.
pub async fn register_cluster(
    pool: &DbPool,
    cluster_id: i32,
    deployment_tags: Vec<String>,
    release_version: String,
) -> AppResult<RegisterClusterResponse> {
    let tags = normalize_tags(&deployment_tags);
    let test_sets = pool.list_test_sets().await?;
    let templates = pool.list_template_tests().await?;

    let mut patterns = Vec::new();
    for test_set in test_sets {
        if !applies(
            &test_set.deployment_tags,
            &test_set.available_since_release,
            &tags,
            &release_version,
        ) {
            debug!(
                "Test set {} does not apply to cluster {}",
                test_set.id, cluster_id
            );
            continue;
        }

        let tests: Vec<String> = templates
            .iter()
            .filter(|t| t.test_set_id == test_set.id)
            .filter(|t| {
                applies(
                    &t.deployment_tags,
                    &t.available_since_release,
                    &tags,
                    &release_version,
                )
            })
            .map(|t| t.name.clone())
            .collect();

        if tests.is_empty() {
            continue;
        }

        patterns.push(NewTestingPattern {
            test_set_id: test_set.id,
            tests,
        });
    }

    let testsets: Vec<String> = patterns.iter().map(|p| p.test_set_id.clone()).collect();

    pool.save_cluster(cluster_id, deployment_tags, release_version, patterns)
        .await?;

    info!(
        "Registered cluster {} with {} applicable test sets",
        cluster_id,
        testsets.len()
    );

    Ok(RegisterClusterResponse {
        cluster_id,
        testsets,
    })
}
