//! Test set and cluster DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::test_set;

/// Test set as presented to API clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TestSetResponse {
    pub id: String,
    pub name: String,
}

impl From<test_set::Model> for TestSetResponse {
    fn from(ts: test_set::Model) -> Self {
        TestSetResponse {
            id: ts.id,
            name: ts.description,
        }
    }
}

/// Request to register (or re-register) a cluster.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterClusterRequest {
    pub cluster_id: i32,
    #[serde(default)]
    pub deployment_tags: Vec<String>,
    #[serde(default)]
    pub release_version: String,
}

/// Test sets found applicable to a registered cluster.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegisterClusterResponse {
    pub cluster_id: i32,
    pub testsets: Vec<String>,
}
