use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;
use std::time::Duration;

use biteme_backend::{
    config::Config,
    database::init_pool,
    services::{QuarterService, ReportService},
    store::SqliteStore,
    tasks::ReportScheduler,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = init_pool(&config.database)
        .await
        .expect("Failed to initialize database");

    let store: Arc<dyn biteme_backend::store::ReportStore> = Arc::new(SqliteStore::new(pool));

    let report_service = ReportService::new(store.clone());
    let quarter_service = QuarterService::new(store.clone());

    let scheduler = Arc::new(ReportScheduler::new(
        report_service,
        quarter_service,
        store,
        Duration::from_secs(config.reports.restaurant_timeout_secs),
    ));
    let handle = scheduler.start();

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down");
    // Lets an in-flight pass finish; only the next arm is cancelled.
    handle.stop().await;

    Ok(())
}
