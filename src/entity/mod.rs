//! SeaORM entity definitions.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

pub mod cluster_state;
pub mod cluster_testing_pattern;
pub mod test_run;
pub mod test_set;

/// List of strings stored as a JSON array.
///
/// Used for deployment tags, runner arguments and test name lists so the
/// same schema works on PostgreSQL and SQLite.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct StringList(pub Vec<String>);

impl StringList {
    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for StringList {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}
