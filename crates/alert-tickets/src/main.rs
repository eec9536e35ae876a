use alert_tickets::{Engine, Settings, api, jira::JiraClient, metrics};
use anyhow::Context;
use clap::Parser;
use derivative::Derivative;
use futures::FutureExt;

/// alert-tickets receives Alertmanager webhook notifications and keeps
/// exactly one Jira issue per alert group, opening, closing, reopening and
/// updating it as the group fires and resolves.
#[derive(Derivative, Parser)]
#[derivative(Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// URL of the Jira server.
    server: url::Url,
    /// Address to listen on.
    #[clap(long, env = "HOST", default_value = "[::]")]
    host: String,
    /// Port to listen on for webhooks.
    #[clap(long, short = 'p', env = "PORT", default_value = "9050")]
    port: u16,
    /// Jira user to authenticate as.
    #[clap(long, env = "JIRA_USERNAME")]
    jira_username: String,
    /// Password or API token of the Jira user.
    #[derivative(Debug = "ignore")]
    #[clap(long, env = "JIRA_PASSWORD", hide_env_values = true)]
    jira_password: String,
    /// Issue type of newly created issues.
    #[clap(long, env = "ISSUE_TYPE", default_value = "Task")]
    issue_type: String,
    /// Workflow state, and transition, of issues which are alerting.
    #[clap(long, env = "OPEN_STATE", default_value = "Open")]
    open_state: String,
    /// Workflow state, and transition, of issues which are resolved.
    #[clap(long, env = "CLOSED_STATE", default_value = "Closed")]
    closed_state: String,
    /// Also reopen issues in any of the resolved, closed, done or complete states.
    #[clap(long, env = "ALLOW_REOPEN_OF_OTHER_CLOSED_STATES")]
    allow_reopen_of_other_closed_states: bool,
    /// Ignore closed issues, filing a new issue when an alert group fires again.
    #[clap(long, env = "IGNORE_CLOSED")]
    ignore_closed: bool,
    /// Timeout of each request made to Jira.
    #[clap(long, env = "REQUEST_TIMEOUT", default_value = "10s")]
    request_timeout: humantime::Duration,
}

fn main() -> Result<(), anyhow::Error> {
    // Use reasonable defaults for printing structured logs to stderr.
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    let args = Args::parse();
    tracing::info!(?args, "started!");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let task = runtime.spawn(async move { async_main(args).await });
    let result = runtime.block_on(task);

    tracing::info!(?result, "main function completed, shutting down runtime");
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    result?
}

async fn async_main(args: Args) -> anyhow::Result<()> {
    let Args {
        server,
        host,
        port,
        jira_username,
        jira_password,
        issue_type,
        open_state,
        closed_state,
        allow_reopen_of_other_closed_states,
        ignore_closed,
        request_timeout,
    } = args;

    let settings = Settings {
        issue_type,
        open_state_name: open_state,
        closed_state_name: closed_state,
        allow_reopen_of_other_closed_states,
        include_closed_in_search: !ignore_closed,
        call_timeout: request_timeout.into(),
    };
    tracing::info!(issue_type = %settings.issue_type, "issue type that will be created");

    let client = JiraClient::new(
        server,
        jira_username,
        jira_password,
        settings.call_timeout,
    )
    .context("building Jira client")?;
    let engine = Engine::new(client, settings)?;

    let prometheus = metrics::install().context("installing prometheus recorder")?;
    let router = api::build_router(engine, prometheus);

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}"))
        .await
        .context("failed to bind server port")?;
    tracing::info!(addr = %listener.local_addr()?, "listening for webhooks");

    axum::serve(listener, router)
        .with_graceful_shutdown(tokio::signal::ctrl_c().map(|_| ()))
        .await?;

    Ok(())
}
