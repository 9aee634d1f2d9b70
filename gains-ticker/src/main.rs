use chrono::Utc;
use clap::Parser;
use common::{load_settings_from_s3, logging, settings::SettingsReader};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, to_string, Value};
use tracing::info;

use models::event::Invocation;
use models::settings::Settings;
use service::handler::Job;

mod ledger;
mod models;
mod service;

const S3_STORED_SETTINGS: &str = "settings.json";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Local settings file; otherwise settings come from S3 or defaults
    #[arg(short, long)]
    settings: Option<String>,

    /// Run once for this user instead of starting the Lambda runtime
    #[arg(short, long)]
    user: Option<String>,
}

async fn handle_event(job: &Job, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let timestamp = Utc::now();
    let (payload, context) = event.into_parts();
    info!("Invocation {}: {}", context.request_id, payload);

    let invocation = Invocation::from_payload(payload)?;
    let users = job.handle(&invocation, timestamp).await?;
    Ok(json!({ "processed": users }))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cmdline_args = Args::parse();
    let (settings, source) = match cmdline_args.settings {
        Some(path) => (SettingsReader::read_config_file::<Settings>(&path)?, path),
        None => match load_settings_from_s3::<Settings>(S3_STORED_SETTINGS).await? {
            Some((settings, location)) => (settings, location.to_string()),
            None => (Settings::default(), "defaults".to_string()),
        },
    };

    logging::init_logging(&settings.logging)?;

    let version = env!("CARGO_PKG_VERSION");
    info!("___/********Realized Gains Ticker v{}********\\___", version);
    info!("Loaded settings from {}", source);
    info!("Settings: {}", to_string(&settings)?);

    let job = Job::from_settings(&settings).await?;

    if let Some(user) = cmdline_args.user {
        let invocation = Invocation::Direct {
            user_name: Some(user),
        };
        job.handle(&invocation, Utc::now()).await?;
        return Ok(());
    }

    let job = &job;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_event(job, event).await
    }))
    .await
}
