use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use better_weather::models::{LocationPatch, PrecipUnit, TempUnit, WindUnit, new_location_id};
use better_weather::telemetry::init_tracing;
use better_weather::view::ChartMetric;
use better_weather::{
    AppConfig, BackgroundService, ControlApi, ControlClient, DiskStore, KeyValueStore,
    LocalControl, Location, MemoryBadge, MemoryStore, OpenMeteoClient, PopupView,
    RefreshCoordinator, RefreshMessage, RefreshReply, SearchOutcome, SearchSession, ViewState,
    WeatherStore, control,
};

#[derive(Debug, Parser)]
#[command(name = "better-weather", version)]
#[command(about = "Weather refresh, cache and badge for your saved places")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, env = "BETTER_WEATHER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Keep everything in memory instead of the on-disk store
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the refresh loop until Ctrl+C; refresh messages are read from stdin
    Daemon,
    /// Refresh one location, or all of them
    Refresh {
        #[arg(long)]
        location: Option<String>,
    },
    /// Print the cached weather the way the popup shows it
    Show {
        #[arg(long)]
        location: Option<String>,
        /// Forecast day, 0 is today
        #[arg(long, default_value_t = 0)]
        day: usize,
        #[arg(long, default_value_t = ChartMetric::Temp)]
        metric: ChartMetric,
    },
    /// Look up places by name
    Search {
        query: String,
        /// Save the n-th result (1-based) as a new location
        #[arg(long)]
        add: Option<usize>,
    },
    Locations {
        #[command(subcommand)]
        command: LocationCommands,
    },
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Debug, Subcommand)]
enum LocationCommands {
    List,
    Add {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        #[arg(long)]
        name: Option<String>,
    },
    Remove {
        id: String,
    },
    Rename {
        id: String,
        /// Omit to clear the name
        name: Option<String>,
    },
    /// Move a location to a new position (0 is primary)
    Move {
        id: String,
        #[arg(allow_hyphen_values = true)]
        order: i64,
    },
    /// Set or clear the location the popup opens on
    Activate {
        id: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsCommands {
    Show,
    Set {
        #[arg(long)]
        temp: Option<TempUnit>,
        #[arg(long)]
        wind: Option<WindUnit>,
        #[arg(long)]
        precip: Option<PrecipUnit>,
    },
}

struct App {
    config: AppConfig,
    locale: String,
    provider: Arc<OpenMeteoClient>,
    control: Arc<dyn ControlApi>,
}

impl App {
    /// Use the running daemon when there is one, else open the store here
    async fn connect(config: AppConfig, ephemeral: bool) -> Result<Self> {
        let provider = build_provider(&config)?;
        let control: Arc<dyn ControlApi> = if ephemeral {
            local_control(open_store(&config, true)?, provider.clone())
        } else {
            let client = ControlClient::from_config(&config.control)?;
            if client.is_running().await {
                debug!(address = %config.control.address, "Using the running daemon");
                Arc::new(client)
            } else {
                local_control(open_store(&config, false)?, provider.clone())
            }
        };

        Ok(Self {
            locale: config.resolve_locale(),
            config,
            provider,
            control,
        })
    }
}

fn build_provider(config: &AppConfig) -> Result<Arc<OpenMeteoClient>> {
    let provider = OpenMeteoClient::new(&config.provider).context("Failed to build HTTP client")?;
    Ok(Arc::new(provider))
}

fn open_store(config: &AppConfig, ephemeral: bool) -> Result<WeatherStore> {
    let kv: Arc<dyn KeyValueStore> = if ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        let location = &config.storage.location;
        Arc::new(DiskStore::open(location).with_context(|| {
            format!(
                "Failed to open store at {location} (a daemon not listening on {} may hold it)",
                config.control.address
            )
        })?)
    };
    Ok(WeatherStore::new(kv, config.resolve_locale()))
}

/// No daemon: this process refreshes by itself
fn local_control(store: WeatherStore, provider: Arc<OpenMeteoClient>) -> Arc<dyn ControlApi> {
    let badge = Arc::new(MemoryBadge::new());
    let coordinator = Arc::new(RefreshCoordinator::new(provider, store, badge.clone()));
    Arc::new(LocalControl::new(coordinator, badge))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from_path(cli.config.clone())?;
    init_tracing(&config.logging);

    let command = match cli.command {
        Commands::Daemon => return run_daemon(config, cli.ephemeral).await,
        command => command,
    };
    let app = App::connect(config, cli.ephemeral).await?;

    match command {
        // handled before connecting
        Commands::Daemon => Ok(()),
        Commands::Refresh { location } => run_refresh(&app, location).await,
        Commands::Show {
            location,
            day,
            metric,
        } => run_show(&app, location, day, metric).await,
        Commands::Search { query, add } => run_search(&app, &query, add).await,
        Commands::Locations { command } => run_locations(&app, command).await,
        Commands::Settings { command } => run_settings(&app, command).await,
    }
}

async fn run_daemon(config: AppConfig, ephemeral: bool) -> Result<()> {
    let store = open_store(&config, ephemeral)?;
    let address = &config.control.address;
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to listen on {address}"))?;

    let badge = Arc::new(MemoryBadge::new());
    let coordinator = Arc::new(RefreshCoordinator::new(
        build_provider(&config)?,
        store.clone(),
        badge.clone(),
    ));
    let cancel = CancellationToken::new();
    let service = BackgroundService::new(coordinator, config.refresh.interval());
    let (handle, task) = service.spawn(cancel.clone());

    // Edits made through the control API reach the service's store subscription
    let local = Arc::new(LocalControl::with_service(store, badge, handle));
    let server = tokio::spawn(control::serve(listener, local.clone(), cancel.clone()));

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT, shutting down");
        }
        shutdown.cancel();
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let Some(message) = RefreshMessage::parse(&line) else {
                        warn!(%line, "Ignoring unknown message");
                        continue;
                    };
                    match local.refresh(message).await {
                        Ok(reply) => print_reply(&reply),
                        Err(error) => eprintln!("{}", error.user_message()),
                    }
                }
                // stdin closed; keep serving alarms, store changes and the control API
                Ok(None) | Err(_) => {
                    cancel.cancelled().await;
                    break;
                }
            },
        }
    }

    task.await.context("Background task panicked")?;
    server.await.context("Control API task panicked")??;
    Ok(())
}

async fn run_refresh(app: &App, location: Option<String>) -> Result<()> {
    let reply = app
        .control
        .refresh(RefreshMessage::new(location))
        .await
        .map_err(|error| anyhow::anyhow!("{}: {error}", error.user_message()))?;
    print_reply(&reply);

    let badge = app.control.badge().await?;
    if !badge.text.is_empty() {
        println!(
            "badge: {} {}",
            badge.text,
            badge.color.as_deref().unwrap_or("")
        );
    }
    let failed = reply.failed();
    if !failed.is_empty() {
        bail!("{} location(s) failed to refresh", failed.len());
    }
    Ok(())
}

fn print_reply(reply: &RefreshReply) {
    match reply {
        RefreshReply::Primary => println!("refreshed primary location"),
        RefreshReply::One {
            location_id,
            temperature: Some(temperature),
            timezone,
        } => println!("refreshed {location_id}: {temperature:.1} ({timezone})"),
        RefreshReply::One {
            location_id,
            timezone,
            ..
        } => println!("refreshed {location_id} ({timezone})"),
        RefreshReply::All { refreshed, failed } => {
            println!("refreshed {} location(s)", refreshed.len());
            for failure in failed {
                println!("  {} failed: {}", failure.location_id, failure.message);
            }
        }
    }
}

async fn run_show(
    app: &App,
    location: Option<String>,
    day: usize,
    metric: ChartMetric,
) -> Result<()> {
    let view = ViewState {
        active_location_id: location,
        active_day_index: day,
        metric,
    };

    let PopupView::Location(popup) = app.control.popup(view).await? else {
        println!("No locations yet. Add one with `better-weather search <name> --add 1`.");
        return Ok(());
    };

    println!("{} ({})", popup.label, popup.position);
    println!("{}  {}", popup.temperature, popup.condition);
    println!(
        "feels like {}  precip {}  wind {}  humidity {}",
        popup.feels_like, popup.precipitation, popup.wind, popup.humidity
    );
    println!(
        "high {}  low {}  sunrise {}  sunset {}",
        popup.temp_max, popup.temp_min, popup.sunrise, popup.sunset
    );
    for forecast in &popup.forecast {
        let marker = if forecast.active { '*' } else { ' ' };
        println!(
            "{marker} {:<6} {:>6} {:>6}  {}",
            forecast.label, forecast.high, forecast.low, forecast.description
        );
    }
    println!(
        "{}: {}  {}",
        popup.chart.metric.label(),
        popup.chart.summary,
        popup.chart.range_label
    );
    println!("{}", popup.status);
    Ok(())
}

async fn run_search(app: &App, query: &str, add: Option<usize>) -> Result<()> {
    let session = SearchSession::new(app.provider.clone(), &app.locale)
        .with_debounce(app.config.refresh.search_debounce());

    let results = match session.search(query).await? {
        SearchOutcome::Results(results) => results,
        SearchOutcome::Cleared => bail!("Search needs at least two characters"),
        SearchOutcome::Superseded => return Ok(()),
    };
    if results.is_empty() {
        println!("No places found.");
        return Ok(());
    }
    for (index, result) in results.iter().enumerate() {
        println!(
            "{:>2}. {}  ({:.4}, {:.4})",
            index + 1,
            result.label(),
            result.latitude,
            result.longitude
        );
    }

    if let Some(position) = add {
        let Some(result) = position.checked_sub(1).and_then(|i| results.get(i)) else {
            bail!("No result number {position}");
        };
        let order = i64::try_from(app.control.locations().await?.len())?;
        let location = result.clone().into_location(new_location_id(), order);
        println!("added {} as {}", location.label(0), location.id);
        app.control.add_location(location).await?;
    }
    Ok(())
}

async fn run_locations(app: &App, command: LocationCommands) -> Result<()> {
    let control = &app.control;
    let locations = match command {
        LocationCommands::List => control.locations().await?,
        LocationCommands::Add { lat, lon, name } => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                bail!("Coordinates out of range: {lat}, {lon}");
            }
            let order = i64::try_from(control.locations().await?.len())?;
            let location = Location::new(new_location_id(), name, lat, lon, order);
            control.add_location(location).await?
        }
        LocationCommands::Remove { id } => control.delete_location(&id).await?,
        LocationCommands::Rename { id, name } => {
            control
                .update_location(&id, &LocationPatch::rename(name))
                .await?
        }
        LocationCommands::Move { id, order } => {
            let locations = control.locations().await?;
            let Some(current) = locations.iter().position(|location| location.id == id) else {
                bail!("Location not found: {id}");
            };
            // Place it before (or after, when moving down) the location at `order`
            let target = if order > i64::try_from(current)? {
                order.saturating_mul(2).saturating_add(1)
            } else {
                order.saturating_mul(2).saturating_sub(1)
            };
            let spaced = locations
                .into_iter()
                .map(|mut location| {
                    location.order = location.order.saturating_mul(2);
                    location
                })
                .collect();
            control.save_locations(spaced).await?;
            control
                .update_location(&id, &LocationPatch::reorder(target))
                .await?
        }
        LocationCommands::Activate { id } => {
            control.set_active_location_id(id).await?;
            control.locations().await?
        }
    };

    let active = control.active_location_id().await?;
    for (index, location) in locations.iter().enumerate() {
        let marker = if active.as_deref() == Some(location.id.as_str()) {
            '*'
        } else {
            ' '
        };
        println!(
            "{marker} {index}. {}  ({})  {}",
            location.label(index),
            location.format_coordinates(),
            location.id
        );
    }
    Ok(())
}

async fn run_settings(app: &App, command: SettingsCommands) -> Result<()> {
    let mut settings = app.control.settings().await?;
    if let SettingsCommands::Set { temp, wind, precip } = command {
        if let Some(unit) = temp {
            settings = settings.with_temp_unit(unit);
        }
        if let Some(unit) = wind {
            settings = settings.with_wind_unit(unit);
        }
        if let Some(unit) = precip {
            settings = settings.with_precip_unit(unit);
        }
        settings = app.control.save_settings(settings).await?;
    }

    println!("temperature: {}", settings.temp_unit.label());
    println!("wind: {}", settings.wind_unit.label());
    println!("precipitation: {}", settings.precip_unit.label());
    if settings.locale_defaulted {
        println!("(defaults for {})", app.locale);
    }
    Ok(())
}
