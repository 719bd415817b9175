// Scaffolding / deployment port (external collaborator)

use crate::port::collaborator::CollaboratorResult;
use crate::port::content_generator::BusinessPlan;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Stage reported by the scaffolder once the build is done
pub const STAGE_COMPLETE: &str = "complete";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub name: String,
    pub concept: String,
    pub plan: BusinessPlan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectHandle {
    pub repository_url: String,
    pub deployment_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevelopmentProgress {
    pub stage: String,
    pub percent: u8,
    pub has_testable_components: bool,
}

impl DevelopmentProgress {
    pub fn is_complete(&self) -> bool {
        self.stage == STAGE_COMPLETE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeQuality {
    pub lint_errors: u32,
    pub type_errors: u32,
    #[serde(default)]
    pub warnings: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    pub passed: u32,
    pub failed: u32,
}

#[async_trait]
pub trait ProjectScaffolder: Send + Sync {
    async fn create_project(
        &self,
        business_id: &str,
        spec: &ProjectSpec,
    ) -> CollaboratorResult<ProjectHandle>;

    /// Deploy and return the live URL
    async fn deploy(&self, business_id: &str) -> CollaboratorResult<String>;

    async fn get_progress(&self, business_id: &str) -> CollaboratorResult<DevelopmentProgress>;

    async fn get_code_quality(&self, business_id: &str) -> CollaboratorResult<CodeQuality>;

    async fn run_tests(&self, business_id: &str) -> CollaboratorResult<TestReport>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::port::collaborator::CollaboratorError;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    pub struct MockProjectScaffolder {
        progress: Mutex<DevelopmentProgress>,
        quality: Mutex<CodeQuality>,
        tests: Mutex<TestReport>,
        fail_create: AtomicBool,
        deploy_calls: AtomicU32,
        create_calls: AtomicU32,
        test_runs: AtomicU32,
    }

    impl Default for MockProjectScaffolder {
        fn default() -> Self {
            Self {
                progress: Mutex::new(DevelopmentProgress {
                    stage: "building".to_string(),
                    percent: 40,
                    has_testable_components: false,
                }),
                quality: Mutex::new(CodeQuality::default()),
                tests: Mutex::new(TestReport::default()),
                fail_create: AtomicBool::new(false),
                deploy_calls: AtomicU32::new(0),
                create_calls: AtomicU32::new(0),
                test_runs: AtomicU32::new(0),
            }
        }
    }

    impl MockProjectScaffolder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_progress(&self, stage: &str, percent: u8, has_testable_components: bool) {
            *self.progress.lock().unwrap() = DevelopmentProgress {
                stage: stage.to_string(),
                percent,
                has_testable_components,
            };
        }

        pub fn set_quality(&self, lint_errors: u32, type_errors: u32) {
            *self.quality.lock().unwrap() = CodeQuality {
                lint_errors,
                type_errors,
                warnings: 0,
            };
        }

        pub fn set_tests(&self, passed: u32, failed: u32) {
            *self.tests.lock().unwrap() = TestReport { passed, failed };
        }

        pub fn set_fail_create(&self, fail: bool) {
            self.fail_create.store(fail, Ordering::SeqCst);
        }

        pub fn deploy_calls(&self) -> u32 {
            self.deploy_calls.load(Ordering::SeqCst)
        }

        pub fn create_calls(&self) -> u32 {
            self.create_calls.load(Ordering::SeqCst)
        }

        pub fn test_runs(&self) -> u32 {
            self.test_runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProjectScaffolder for MockProjectScaffolder {
        async fn create_project(
            &self,
            business_id: &str,
            _spec: &ProjectSpec,
        ) -> CollaboratorResult<ProjectHandle> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(CollaboratorError::Unavailable(
                    "scaffolder offline".to_string(),
                ));
            }
            Ok(ProjectHandle {
                repository_url: format!("https://git.example/{}", business_id),
                deployment_url: format!("https://{}.preview.example", business_id),
            })
        }

        async fn deploy(&self, business_id: &str) -> CollaboratorResult<String> {
            self.deploy_calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://{}.example", business_id))
        }

        async fn get_progress(&self, _business_id: &str) -> CollaboratorResult<DevelopmentProgress> {
            Ok(self.progress.lock().unwrap().clone())
        }

        async fn get_code_quality(&self, _business_id: &str) -> CollaboratorResult<CodeQuality> {
            Ok(self.quality.lock().unwrap().clone())
        }

        async fn run_tests(&self, _business_id: &str) -> CollaboratorResult<TestReport> {
            self.test_runs.fetch_add(1, Ordering::SeqCst);
            Ok(self.tests.lock().unwrap().clone())
        }
    }
}
