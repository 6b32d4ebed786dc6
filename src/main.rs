//! Ambassador Hub - Builder Task Coordination Service
//!
//! A JSON API for coordinating marketing tasks between admins and builders.
//!
//! ## Architecture
//!
//! - **Tasks**: Workshops, hackathons, meetups and jobs with budgets and KPIs
//! - **Applications**: Builders apply to tasks, admins review
//! - **Submissions**: Deliverables with KPI results and supporting files
//! - **Payments**: Payout records and the submission payout flow
//! - **Analytics**: Aggregates for the admin dashboard

use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ambassador_hub::Config::from_env();

    info!(
        database = config.database_url.as_str(),
        bind_address = config.bind_address.as_str(),
        "Starting Ambassador Hub service"
    );

    let db = ambassador_hub::Database::new(&config.database_url).await?;
    let state = ambassador_hub::AppState::new(db);
    let app = ambassador_hub::routes().with_state(state);

    info!("Listening on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
