//! Builders for constructing event test data with sensible defaults

use warehouse_domain::{
    ArchiveDatasetConfig, DatasetRef, InstanceEvent, RuleRef, TaskEvent, TaskEventConfig,
    TaskOutput,
};

/// Builder for creating test task events
#[derive(Debug)]
pub struct TaskEventBuilder {
    event: TaskEvent,
}

impl Default for TaskEventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskEventBuilder {
    pub fn new() -> Self {
        Self {
            event: TaskEvent {
                id: "task-1".to_string(),
                instance_id: "instance-1".to_string(),
                service: "brainlife/app-test".to_string(),
                status: "running".to_string(),
                status_msg: None,
                user_id: "1".to_string(),
                resource_id: None,
                group_id: None,
                status_changed: false,
                config: TaskEventConfig::default(),
                product: None,
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.event.id = id.to_string();
        self
    }

    pub fn with_service(mut self, service: &str) -> Self {
        self.event.service = service.to_string();
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.event.status = status.to_string();
        self
    }

    pub fn with_status_msg(mut self, msg: &str) -> Self {
        self.event.status_msg = Some(msg.to_string());
        self
    }

    pub fn with_user(mut self, user_id: &str) -> Self {
        self.event.user_id = user_id.to_string();
        self
    }

    pub fn with_group(mut self, group_id: &str) -> Self {
        self.event.group_id = Some(group_id.to_string());
        self
    }

    pub fn with_resource(mut self, resource_id: &str) -> Self {
        self.event.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn status_changed(mut self) -> Self {
        self.event.status_changed = true;
        self
    }

    pub fn with_app(mut self, app_id: &str) -> Self {
        self.event.config.app = Some(app_id.to_string());
        self
    }

    pub fn with_rule(mut self, rule_id: &str) -> Self {
        self.event.config.rule = Some(RuleRef {
            id: rule_id.to_string(),
        });
        self
    }

    pub fn with_output(mut self, output_id: &str, datatype: &str, subdir: Option<&str>) -> Self {
        self.event.config.outputs.push(TaskOutput {
            id: output_id.to_string(),
            datatype: datatype.to_string(),
            subdir: subdir.map(str::to_string),
        });
        self
    }

    pub fn with_archive_dataset(
        mut self,
        dataset_id: &str,
        storage: Option<&str>,
        storage_config: Option<serde_json::Value>,
    ) -> Self {
        self.event.config.datasets.push(ArchiveDatasetConfig {
            dataset: DatasetRef {
                id: dataset_id.to_string(),
            },
            storage: storage.map(str::to_string),
            storage_config,
        });
        self
    }

    pub fn with_product(mut self, product: serde_json::Value) -> Self {
        self.event.product = Some(product);
        self
    }

    pub fn build(self) -> TaskEvent {
        self.event
    }
}

/// Builder for creating test instance events
#[derive(Debug)]
pub struct InstanceEventBuilder {
    event: InstanceEvent,
}

impl Default for InstanceEventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceEventBuilder {
    pub fn new() -> Self {
        Self {
            event: InstanceEvent {
                id: "instance-1".to_string(),
                status: "running".to_string(),
                user_id: "1".to_string(),
                group_id: None,
                status_changed: false,
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.event.id = id.to_string();
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.event.status = status.to_string();
        self
    }

    pub fn with_user(mut self, user_id: &str) -> Self {
        self.event.user_id = user_id.to_string();
        self
    }

    pub fn with_group(mut self, group_id: &str) -> Self {
        self.event.group_id = Some(group_id.to_string());
        self
    }

    pub fn status_changed(mut self) -> Self {
        self.event.status_changed = true;
        self
    }

    pub fn build(self) -> InstanceEvent {
        self.event
    }
}
