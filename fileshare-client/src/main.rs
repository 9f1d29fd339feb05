//! Fileshare Client
//!
//! Restores the persisted session, reports where it lands, and for staff
//! sessions prints the first page of the user table.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fileshare_client::{
    Api, Config, Dashboard, DirectorySink, EventBus, Gateway, SessionMachine, SqliteStore, Theme,
    View, Workspace,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fileshare_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(?config, "Loaded configuration");

    let store = Arc::new(SqliteStore::open(&config.store_path)?);
    let theme = Theme::load(store.as_ref(), false);
    tracing::debug!(theme = theme.as_str(), "Theme preference");

    let events = EventBus::new();
    let sink = Arc::new(DirectorySink::new(&config.download_dir));
    let gateway = Gateway::new(&config, events.clone(), sink)?;
    let api = Arc::new(Api::new(gateway));
    let session = Arc::new(SessionMachine::new(api, store));

    tokio::spawn(session.clone().listen(events.subscribe()));

    let state = session.boot().await;
    let view = session.view();
    tracing::info!(?state, ?view, "Session ready");

    match view {
        View::Dashboard { can_manage } => {
            let Some(dashboard) = Dashboard::for_session(&session, &config) else {
                return Ok(());
            };
            dashboard.fetch_users().await?;
            let snapshot = dashboard.snapshot();
            tracing::info!(
                can_manage,
                page = snapshot.query.page(),
                total_pages = snapshot.total_pages,
                "Loaded user table"
            );
            for row in &snapshot.rows {
                tracing::info!(id = %row.id, name = %row.name, role = %row.role, "User");
            }
        }
        View::Upload => {
            let Some(workspace) = Workspace::for_session(&session) else {
                return Ok(());
            };
            workspace.fetch_my_files().await?;
            for file in workspace.files() {
                tracing::info!(id = %file.id, filename = %file.filename, "File");
            }
        }
        View::Login | View::Register | View::Loading => {
            tracing::info!("No active session; log in to continue");
        }
    }

    Ok(())
}
