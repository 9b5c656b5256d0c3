//! Shared testing utilities for the warehouse event processor
//!
//! In-memory mock implementations of the external collaborator ports,
//! plus builders for event test data. No database, broker, or network
//! access required.

pub mod builders;
pub mod mocks;

pub use builders::{InstanceEventBuilder, TaskEventBuilder};
pub use mocks::{
    MockDataService, MockHealthStore, MockInviteService, MockMetricsSink, MockTaskApi,
};
