use std::sync::Arc;

use bankcore_api::{app, scheduler};
use bankcore_infra::config::BankCoreConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BankCoreConfig::from_env()?;
    bankcore_observability::init(config.log_format);

    let services = Arc::new(app::services::build_services(&config)?);

    if config.accrual_run_once {
        let business_date = services.today();
        let report = scheduler::run_batch(services, business_date).await?;
        tracing::info!(
            business_date = %report.business_date,
            processed = report.processed,
            already_processed = report.already_processed,
            failures = report.failures,
            "one-off daily accrual finished"
        );
        if !report.is_success() {
            anyhow::bail!(
                "daily accrual for {} had {} failures",
                report.business_date,
                report.failures
            );
        }
        return Ok(());
    }

    let _accrual = scheduler::spawn_daily_accrual(services.clone(), config.accrual_time);

    let app = app::build_app(services);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
