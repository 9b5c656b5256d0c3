//! Mock implementations for all collaborator ports
//!
//! Each mock records the calls it receives so tests can assert on the
//! exact side effects a handler produced. `set_fail` switches a mock
//! into failure mode to exercise error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use warehouse_core::{WarehouseError, WarehouseResult};
use warehouse_domain::entities::{ValidatorQuery, ValidatorSubmission};
use warehouse_domain::{
    DataService, DatasetPatch, HealthReport, HealthStore, InviteService, MetricsSink, TaskApi,
    TaskEvent, TaskOutput,
};

/// Mock implementation of DataService for testing
#[derive(Debug, Default)]
pub struct MockDataService {
    archived: Mutex<HashMap<(String, String), String>>,
    patches: Mutex<Vec<(String, DatasetPatch)>>,
    touched_rules: Mutex<Vec<String>>,
    rule_stats_updates: Mutex<Vec<String>>,
    project_stats_updates: Mutex<Vec<String>>,
    project_stats_by_group: Mutex<Vec<String>>,
    dataset_stats_updates: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl MockDataService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register an archived (or deliberately removed) dataset for
    /// the given task output
    pub fn with_archived_dataset(self, task_id: &str, output_id: &str, dataset_id: &str) -> Self {
        self.archived.lock().unwrap().insert(
            (task_id.to_string(), output_id.to_string()),
            dataset_id.to_string(),
        );
        self
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check_fail(&self) -> WarehouseResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WarehouseError::database("mock failure"));
        }
        Ok(())
    }

    pub fn patches(&self) -> Vec<(String, DatasetPatch)> {
        self.patches.lock().unwrap().clone()
    }

    pub fn touched_rules(&self) -> Vec<String> {
        self.touched_rules.lock().unwrap().clone()
    }

    pub fn rule_stats_updates(&self) -> Vec<String> {
        self.rule_stats_updates.lock().unwrap().clone()
    }

    pub fn project_stats_updates(&self) -> Vec<String> {
        self.project_stats_updates.lock().unwrap().clone()
    }

    pub fn project_stats_by_group(&self) -> Vec<String> {
        self.project_stats_by_group.lock().unwrap().clone()
    }

    pub fn dataset_stats_updates(&self) -> Vec<String> {
        self.dataset_stats_updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataService for MockDataService {
    async fn find_archived_dataset(
        &self,
        task_id: &str,
        output_id: &str,
    ) -> WarehouseResult<Option<String>> {
        self.check_fail()?;
        Ok(self
            .archived
            .lock()
            .unwrap()
            .get(&(task_id.to_string(), output_id.to_string()))
            .cloned())
    }

    async fn patch_dataset(&self, dataset_id: &str, patch: &DatasetPatch) -> WarehouseResult<()> {
        self.check_fail()?;
        self.patches
            .lock()
            .unwrap()
            .push((dataset_id.to_string(), patch.clone()));
        Ok(())
    }

    async fn touch_rule(&self, rule_id: &str) -> WarehouseResult<()> {
        self.check_fail()?;
        self.touched_rules.lock().unwrap().push(rule_id.to_string());
        Ok(())
    }

    async fn update_rule_stats(&self, rule_id: &str) -> WarehouseResult<()> {
        self.check_fail()?;
        self.rule_stats_updates
            .lock()
            .unwrap()
            .push(rule_id.to_string());
        Ok(())
    }

    async fn update_project_stats(&self, project_id: &str) -> WarehouseResult<()> {
        self.check_fail()?;
        self.project_stats_updates
            .lock()
            .unwrap()
            .push(project_id.to_string());
        Ok(())
    }

    async fn update_project_stats_by_group(&self, group_id: &str) -> WarehouseResult<()> {
        self.check_fail()?;
        self.project_stats_by_group
            .lock()
            .unwrap()
            .push(group_id.to_string());
        Ok(())
    }

    async fn update_dataset_stats(&self, project_id: &str) -> WarehouseResult<()> {
        self.check_fail()?;
        self.dataset_stats_updates
            .lock()
            .unwrap()
            .push(project_id.to_string());
        Ok(())
    }
}

/// Mock implementation of TaskApi for testing
#[derive(Debug, Default)]
pub struct MockTaskApi {
    existing_validators: Mutex<HashMap<(String, String), String>>,
    submitted_validators: Mutex<Vec<ValidatorSubmission>>,
    issued_jwts: Mutex<Vec<String>>,
    archive_submissions: Mutex<Vec<(String, Vec<TaskOutput>)>>,
    fail: AtomicBool,
}

impl MockTaskApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register an already submitted validator task for the given
    /// task output
    pub fn with_existing_validator(self, task_id: &str, output_id: &str, dtv_id: &str) -> Self {
        self.existing_validators.lock().unwrap().insert(
            (task_id.to_string(), output_id.to_string()),
            dtv_id.to_string(),
        );
        self
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check_fail(&self) -> WarehouseResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WarehouseError::task_api("mock failure"));
        }
        Ok(())
    }

    pub fn submitted_validators(&self) -> Vec<ValidatorSubmission> {
        self.submitted_validators.lock().unwrap().clone()
    }

    pub fn issued_jwts(&self) -> Vec<String> {
        self.issued_jwts.lock().unwrap().clone()
    }

    pub fn archive_submissions(&self) -> Vec<(String, Vec<TaskOutput>)> {
        self.archive_submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskApi for MockTaskApi {
    async fn find_validator_task(&self, query: &ValidatorQuery) -> WarehouseResult<Option<String>> {
        self.check_fail()?;
        Ok(self
            .existing_validators
            .lock()
            .unwrap()
            .get(&(query.task_id.clone(), query.output_id.clone()))
            .cloned())
    }

    async fn submit_validator(
        &self,
        submission: &ValidatorSubmission,
        _user_jwt: &str,
    ) -> WarehouseResult<()> {
        self.check_fail()?;
        self.submitted_validators
            .lock()
            .unwrap()
            .push(submission.clone());
        Ok(())
    }

    async fn issue_archiver_jwt(&self, user_id: &str) -> WarehouseResult<String> {
        self.check_fail()?;
        self.issued_jwts.lock().unwrap().push(user_id.to_string());
        Ok(format!("jwt-{user_id}"))
    }

    async fn archive_outputs(
        &self,
        task: &TaskEvent,
        outputs: &[TaskOutput],
    ) -> WarehouseResult<()> {
        self.check_fail()?;
        self.archive_submissions
            .lock()
            .unwrap()
            .push((task.id.clone(), outputs.to_vec()));
        Ok(())
    }
}

/// Mock implementation of InviteService for testing
#[derive(Debug, Default)]
pub struct MockInviteService {
    invited: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl MockInviteService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn invited(&self) -> Vec<(String, String)> {
        self.invited.lock().unwrap().clone()
    }
}

#[async_trait]
impl InviteService for MockInviteService {
    async fn invite(&self, email: &str, real_name: &str) -> WarehouseResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WarehouseError::Invite("mock failure".to_string()));
        }
        self.invited
            .lock()
            .unwrap()
            .push((email.to_string(), real_name.to_string()));
        Ok(())
    }
}

/// Mock implementation of HealthStore for testing
#[derive(Debug, Default)]
pub struct MockHealthStore {
    published: Mutex<Vec<(String, HealthReport)>>,
}

impl MockHealthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, HealthReport)> {
        self.published.lock().unwrap().clone()
    }

    pub fn last_published(&self) -> Option<(String, HealthReport)> {
        self.published.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HealthStore for MockHealthStore {
    async fn publish(&self, key: &str, report: &HealthReport) -> WarehouseResult<()> {
        self.published
            .lock()
            .unwrap()
            .push((key.to_string(), report.clone()));
        Ok(())
    }
}

/// Mock implementation of MetricsSink for testing
#[derive(Debug, Default)]
pub struct MockMetricsSink {
    batches: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl MockMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn batches(&self) -> Vec<String> {
        self.batches.lock().unwrap().clone()
    }

    pub fn last_batch(&self) -> Option<String> {
        self.batches.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MetricsSink for MockMetricsSink {
    async fn write_batch(&self, batch: &str) -> WarehouseResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WarehouseError::MetricsSink("mock failure".to_string()));
        }
        self.batches.lock().unwrap().push(batch.to_string());
        Ok(())
    }
}
