use carpet_dashboard::{DashboardConfig, app};
use std::env;

/// Main entry point for the dashboard web application
///
/// # Arguments
/// * Optional path to a JSON config file (falls back to `DASHBOARD_CONFIG`)
///
/// # Default Configuration
/// * Binds to 127.0.0.1:3000 unless `DASHBOARD_ADDR` says otherwise
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DashboardConfig::load(env::args().nth(1))?;

    app::run(config).await
}
