use desidia::Desidia;
use desidia::config::Config;
use desidia::db;
use desidia::stores::ProjectQuery;
use desidia::utils::logging::debug_json;
use desidia_schema::LoginRequest;
use mimalloc::MiMalloc;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        base_url = %cfg.api.base_url,
        proxy = %cfg.api.proxy.as_ref().map_or("<none>", |u| u.as_str()),
        enable_multiplexing = cfg.api.enable_multiplexing,
        loglevel = %cfg.basic.loglevel,
        "Configuration loaded"
    );

    let storage = db::spawn(&cfg.basic.database_url).await?;
    let mut app = Desidia::new(&cfg.api, Arc::new(storage))?;

    app.session_mut().initialize().await;
    if !app.session().is_authenticated() {
        let Some(login) = cfg.login.as_ref() else {
            warn!("No stored session and no [login] credentials configured; nothing to do");
            return Ok(());
        };
        app.session_mut()
            .login(&LoginRequest {
                email: login.email.clone(),
                password: login.password.clone(),
            })
            .await?;
    }

    let workspaces = app.fetch_workspaces().await?;
    debug_json("workspaces", &workspaces);

    let mut project_count = 0;
    if let Some(workspace_id) = app.workspaces().current_id().map(str::to_string) {
        let projects = app
            .projects_mut()
            .fetch_projects(&workspace_id, &ProjectQuery::default())
            .await?;
        debug_json("projects", projects);
        project_count = projects.len();
    }
    let unread = app.notifications_mut().fetch_unread_count().await?;

    info!(
        user = %app.session().user_name(),
        role = app.session().user_role().as_str(),
        workspaces = workspaces.len(),
        current_workspace = %app.workspaces().current_name(),
        members = app.workspaces().member_count(),
        projects = project_count,
        unread_notifications = unread,
        "Session ready"
    );
    Ok(())
}
