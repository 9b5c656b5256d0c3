use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::broadcast;
use tracing::{error, info};
use warehouse_config::AppConfig;
use warehouse_domain::{DataService, HealthStore, InviteService, MetricsSink, TaskApi};
use warehouse_handler::{
    CounterStore, EventContext, EventSubscriber, HandlerSettings, HealthReporter,
};
use warehouse_infrastructure::{
    AmarettiClient, GraphiteFileSink, PostgresDataService, RabbitMq, RedisHealthStore, SlackClient,
};

/// 主应用程序
///
/// 装配全部外部协作方并持有两条长期任务：队列订阅和健康上报。
pub struct Application {
    broker: Arc<RabbitMq>,
    subscriber: EventSubscriber,
    reporter: Arc<HealthReporter>,
}

impl Application {
    /// 创建新的应用实例，建立所有外部连接
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("初始化warehouse事件处理服务，实例: {}", config.instance);

        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(Duration::from_secs(
                config.database.connection_timeout_seconds,
            ))
            .connect(&config.database.url)
            .await
            .context("连接数据库失败")?;

        let broker = Arc::new(
            RabbitMq::connect(&config.amqp)
                .await
                .context("连接消息代理失败")?,
        );

        let health_store: Arc<dyn HealthStore> = Arc::new(
            RedisHealthStore::new(&config.redis.url)
                .await
                .context("连接Redis失败")?,
        );
        let metrics_sink: Arc<dyn MetricsSink> =
            Arc::new(GraphiteFileSink::new(&config.metrics.path));

        let data: Arc<dyn DataService> = Arc::new(PostgresDataService::new(pool));
        let tasks: Arc<dyn TaskApi> = Arc::new(
            AmarettiClient::new(&config.amaretti, &config.warehouse.archive_service)
                .context("创建任务API客户端失败")?,
        );
        let invites: Arc<dyn InviteService> =
            Arc::new(SlackClient::new(&config.slack).context("创建Slack客户端失败")?);

        let counters = Arc::new(CounterStore::new());
        let settings = HandlerSettings::from_config(&config.warehouse, &config.slack);
        let ctx = Arc::new(EventContext::new(
            Arc::clone(&counters),
            data,
            tasks,
            invites,
            settings,
        ));

        let subscriber = EventSubscriber::new(Arc::clone(&broker), ctx);
        let reporter = Arc::new(HealthReporter::new(
            counters,
            health_store,
            metrics_sink,
            &config.metrics,
            &config.health,
            &config.instance,
        ));

        Ok(Self {
            broker,
            subscriber,
            reporter,
        })
    }

    /// 运行应用程序直到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let consumer_handles = self.subscriber.start().await?;

        let reporter_handle = {
            let reporter = Arc::clone(&self.reporter);
            let shutdown_rx = shutdown_rx.resubscribe();
            tokio::spawn(async move {
                reporter.run(shutdown_rx).await;
            })
        };

        // 等待关闭信号
        let _ = shutdown_rx.recv().await;
        info!("应用收到关闭信号，停止消费");

        self.subscriber.stop();
        for handle in consumer_handles {
            if let Err(e) = handle.await {
                error!("消费任务退出异常: {e}");
            }
        }
        if let Err(e) = reporter_handle.await {
            error!("健康上报任务退出异常: {e}");
        }

        if let Err(e) = self.broker.close().await {
            error!("关闭消息代理连接失败: {e}");
        }

        info!("应用已停止");
        Ok(())
    }
}
