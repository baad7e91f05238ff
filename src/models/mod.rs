//! Domain models and DTOs for the OSTF adapter.

pub mod test_run;
pub mod test_set;

pub use test::{TestResponse, TestResultUpdate, TestStatus};
pub use test_run::{
    OsAccessCredentials, RunMetadata, StartTestRunRequest, TestRunAction, TestRunDetail,
    TestRunResponse, TestRunStatus, UpdateTestRunRequest,
};
pub use test_set::{RegisterClusterRequest, RegisterClusterResponse, TestSetResponse};
