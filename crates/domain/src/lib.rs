pub mod entities;
pub mod events;
pub mod ports;

pub use entities::{
    DatasetPatch, HealthCounts, HealthReport, HealthStatus, ValidatorQuery, ValidatorSubmission,
};
pub use events::{
    ArchiveDatasetConfig, AuthEvent, DatasetEvent, DatasetRef, InstanceEvent, RuleRef, RuleRouting,
    TaskEvent, TaskEventConfig, TaskOutput,
};
pub use ports::{DataService, HealthStore, InviteService, MetricsSink, TaskApi};
