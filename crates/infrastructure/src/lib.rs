pub mod amaretti;
pub mod graphite;
pub mod postgres;
pub mod rabbitmq;
pub mod redis_store;
pub mod slack;

pub use amaretti::AmarettiClient;
pub use graphite::GraphiteFileSink;
pub use postgres::PostgresDataService;
pub use rabbitmq::RabbitMq;
pub use redis_store::RedisHealthStore;
pub use slack::SlackClient;
