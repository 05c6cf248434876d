use midpoint_engine::config::Settings;
use midpoint_engine::core::{MidpointResolver, SearchEngine};
use midpoint_engine::models::ResolveRequest;
use midpoint_engine::services::{GoogleMapsClient, HaversineEstimator, RoutingProvider, VenueFinder};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const USAGE: &str = "usage: midpoint <request.json> [--offline]";

fn init_logging(settings: &Settings) {
    // Environment wins over the config file
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    match log_format.as_str() {
        "pretty" => subscriber.pretty().init(),
        "json" => subscriber.json().init(),
        _ => subscriber.compact().init(),
    }
}

async fn run<R: RoutingProvider>(
    settings: &Settings,
    router: R,
    places: GoogleMapsClient,
    request: ResolveRequest,
) -> ExitCode {
    let search = SearchEngine::new(Arc::new(router), settings.objective(), settings.search_config())
        .with_step_policy(settings.step_policy());
    let venues = VenueFinder::new(Arc::new(places), settings.ranking_weights());
    let resolver = MidpointResolver::new(search, venues, settings.venue_defaults());

    match resolver.handle(request).await {
        Ok(response) => match serde_json::to_string_pretty(&response) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to serialize response: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_client(base_url: &str, api_key: Option<String>, timeout_secs: u64) -> Option<GoogleMapsClient> {
    match GoogleMapsClient::new(base_url, api_key, Duration::from_secs(timeout_secs)) {
        Ok(client) => Some(client),
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings);

    let mut path = None;
    let mut offline = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--offline" => offline = true,
            _ if path.is_none() => path = Some(arg),
            _ => {
                eprintln!("{}", USAGE);
                return ExitCode::FAILURE;
            }
        }
    }

    let Some(path) = path else {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    };

    let request: ResolveRequest = match std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
    {
        Ok(request) => request,
        Err(e) => {
            error!("Failed to read request from {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Resolving meeting point for {} participants", request.participants.len());

    let Some(places) = build_client(
        &settings.places.base_url,
        settings.places.api_key.clone(),
        settings.places.timeout_secs,
    ) else {
        return ExitCode::FAILURE;
    };

    if request.category.is_some() && !places.has_credential() {
        warn!("No places API key configured, venue list will be empty");
    }

    if offline {
        info!("Offline mode: estimating travel times from straight-line distance");
        return run(&settings, HaversineEstimator::default(), places, request).await;
    }

    let Some(router) = build_client(
        &settings.routing.base_url,
        settings.routing.api_key.clone(),
        settings.routing.timeout_secs,
    ) else {
        return ExitCode::FAILURE;
    };

    if !router.has_credential() {
        warn!("No routing API key configured, result will fall back to the centroid");
    }

    run(&settings, router, places, request).await
}
