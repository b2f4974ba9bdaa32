use std::env;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use config::{Config, Environment, File, FileFormat};

use log::{LevelFilter, debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use hirely::api::{AppState, create_router};
use hirely::auth::{AuthConfig, AuthState};
use hirely::db::Database;
use hirely::user::{UserRepository, UserService};

const APP_NAME: &str = "hirely";

/// How often expired entries are dropped from the revocation list.
const REVOCATION_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_main(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    handle_serve(&ctx, cmd).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common)?;
    ctx.init_logging()?;
    debug!("resolved paths: {:#?}", ctx.paths);

    match cli.command {
        Command::Serve(cmd) => async_main(ctx, cmd),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Secret => handle_secret(),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Hirely - identity and session server for the job board.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Config file (or a directory holding config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    /// More log output; repeat for trace
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,
    /// Log at trace level
    #[arg(long, global = true)]
    trace: bool,
    /// JSON log lines and JSON `config show`
    #[arg(long, global = true)]
    json: bool,
    /// Same as --color never
    #[arg(long = "no-color", global = true, conflicts_with = "color")]
    no_color: bool,
    /// When to colorize console logs
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    color: ColorOption,
    /// Report what would be written without touching disk
    #[arg(long = "dry-run", global = true)]
    dry_run: bool,
    /// Answer yes to overwrite confirmations
    #[arg(short = 'y', long = "yes", global = true)]
    assume_yes: bool,
}

impl CommonOpts {
    /// Flags win over `logging.level`; `--quiet` wins over everything.
    fn log_level(&self, configured: &str) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        if self.trace || self.verbose >= 2 {
            return LevelFilter::Trace;
        }
        if self.debug || self.verbose == 1 {
            return LevelFilter::Debug;
        }
        configured.parse().unwrap_or(LevelFilter::Info)
    }

    fn console_ansi(&self) -> bool {
        match self.color {
            _ if self.no_color => false,
            ColorOption::Never => false,
            ColorOption::Always => true,
            ColorOption::Auto => {
                if env::var_os("NO_COLOR").is_some() {
                    false
                } else {
                    env::var_os("FORCE_COLOR").is_some() || io::stderr().is_terminal()
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorOption {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve(ServeCommand),
    /// Write the default config file
    Init(InitCommand),
    /// Show or reset configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Print a freshly generated signing secret
    Secret,
    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Bind address (defaults to server.host)
    #[arg(long)]
    host: Option<String>,
    /// Bind port (defaults to server.port)
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Debug, Clone, Args)]
struct InitCommand {
    /// Overwrite an existing config file
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Overwrite the config file with defaults
    Reset,
}

#[derive(Debug)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let config_file = locate_config_file(common.config.clone())?;
        let config = load_config(&config_file, common.dry_run)?;
        let paths = AppPaths::resolve(config_file, &config)?;

        if common.dry_run {
            info!("dry-run: skipping creation of {}", paths);
        } else {
            paths.create_dirs()?;
        }

        Ok(Self {
            common,
            paths,
            config,
        })
    }

    fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        let level = self.common.log_level(&self.config.logging.level);
        let directive = level.to_string().to_lowercase();
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{APP_NAME}={directive},tower_http={directive}"))
        });

        let json = self.common.json;
        let json_console = json.then(|| tracing_subscriber::fmt::layer().json());
        let text_console = (!json)
            .then(|| tracing_subscriber::fmt::layer().with_ansi(self.common.console_ansi()));

        let log_file = match (&self.paths.log_file, self.common.dry_run) {
            (Some(path), false) => Some(open_log_file(path)?),
            _ => None,
        };
        let file_layer = log_file.map(|file| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
        });

        tracing_subscriber::registry()
            .with(filter)
            .with(json_console)
            .with(text_console)
            .with(file_layer)
            .try_init()
            .ok();

        // `log` records from dependencies; a no-op once tracing owns the logger.
        env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .try_init()
            .ok();

        Ok(())
    }
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

#[derive(Debug, Clone)]
struct AppPaths {
    config_file: PathBuf,
    data_dir: PathBuf,
    state_dir: PathBuf,
    log_file: Option<PathBuf>,
}

impl AppPaths {
    /// Config overrides first, XDG defaults otherwise.
    fn resolve(config_file: PathBuf, cfg: &AppConfig) -> Result<Self> {
        let data_dir = match &cfg.paths.data_dir {
            Some(dir) => expand(dir)?,
            None => XdgDir::Data.locate()?,
        };
        let state_dir = match &cfg.paths.state_dir {
            Some(dir) => expand(dir)?,
            None => XdgDir::State.locate()?,
        };
        let log_file = match &cfg.logging.file {
            Some(file) => Some(state_dir.join(expand(file)?)),
            None => None,
        };

        Ok(Self {
            config_file,
            data_dir,
            state_dir,
            log_file,
        })
    }

    fn create_dirs(&self) -> Result<()> {
        for dir in [&self.data_dir, &self.state_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating directory {}", dir.display()))?;
        }
        Ok(())
    }

    fn database_file(&self) -> PathBuf {
        self.data_dir.join(format!("{APP_NAME}.db"))
    }
}

impl fmt::Display for AppPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "config={} data={} state={}",
            self.config_file.display(),
            self.data_dir.display(),
            self.state_dir.display()
        )?;
        if let Some(log_file) = &self.log_file {
            write!(f, " log={}", log_file.display())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum XdgDir {
    Config,
    Data,
    State,
}

impl XdgDir {
    /// `$XDG_*_HOME/hirely`, then the platform directory, then the
    /// conventional path under `$HOME`.
    fn locate(self) -> Result<PathBuf> {
        let (var, platform, fallback): (&str, Option<PathBuf>, &[&str]) = match self {
            XdgDir::Config => ("XDG_CONFIG_HOME", dirs::config_dir(), &[".config"]),
            XdgDir::Data => ("XDG_DATA_HOME", dirs::data_dir(), &[".local", "share"]),
            XdgDir::State => ("XDG_STATE_HOME", dirs::state_dir(), &[".local", "state"]),
        };

        let base = env::var_os(var)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or(platform)
            .or_else(|| {
                dirs::home_dir().map(|home| fallback.iter().fold(home, |dir, part| dir.join(part)))
            })
            .ok_or_else(|| anyhow!("no home directory to place {self:?} files in"))?;
        Ok(base.join(APP_NAME))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct AppConfig {
    logging: LoggingConfig,
    paths: PathsConfig,
    server: ServerConfig,
    auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct LoggingConfig {
    level: String,
    /// Append plain-text logs here as well; relative to the state directory.
    file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct PathsConfig {
    data_dir: Option<String>,
    state_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ServerConfig {
    host: String,
    port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    if ctx.paths.config_file.exists() && !(cmd.force || ctx.common.assume_yes) {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            ctx.paths.config_file.display()
        ));
    }

    if ctx.common.dry_run {
        info!(
            "dry-run: would write default config to {}",
            ctx.paths.config_file.display()
        );
        return Ok(());
    }

    write_default_config(&ctx.paths.config_file)
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ctx.config)
                        .context("serializing config to JSON")?
                );
            } else {
                println!("{:#?}", ctx.config);
            }
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
        ConfigCommand::Reset => {
            if ctx.common.dry_run {
                info!(
                    "dry-run: would reset config at {}",
                    ctx.paths.config_file.display()
                );
                return Ok(());
            }
            write_default_config(&ctx.paths.config_file)
        }
    }
}

fn handle_secret() -> Result<()> {
    println!("{}", AuthConfig::generate_jwt_secret());
    Ok(())
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}

async fn handle_serve(ctx: &RuntimeContext, cmd: ServeCommand) -> Result<()> {
    info!("Starting {APP_NAME} server...");
    info!("Paths: {}", ctx.paths);

    // A missing or weak signing key stops the process here.
    let auth_config = ctx.config.auth.clone();
    let dev_mode = auth_config.dev_mode;
    let auth_state = AuthState::new(auth_config).context("Invalid auth configuration")?;
    info!(
        "Auth mode: {}",
        if dev_mode { "development" } else { "production" }
    );

    let db_path = ctx.paths.database_file();
    info!("Database path: {}", db_path.display());
    let database = Database::new(&db_path).await?;

    let user_service = UserService::new(UserRepository::new(database.pool().clone()));

    if dev_mode {
        let seeded = user_service
            .seed_dev_users(auth_state.dev_users())
            .await
            .context("seeding development users")?;
        if seeded > 0 {
            info!("Seeded {seeded} development user(s)");
        }
    }

    match user_service.get_stats().await {
        Ok(stats) => info!(
            "Accounts: {} total ({} seekers, {} recruiters)",
            stats.total, stats.seekers, stats.recruiters
        ),
        Err(e) => warn!("Failed to read account stats: {e}"),
    }

    let revocations = auth_state.revocations().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REVOCATION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = revocations.purge_expired();
            if purged > 0 {
                debug!("Purged {purged} expired revocation(s)");
            }
        }
    });

    let app = create_router(AppState::new(user_service, auth_state));

    let host = cmd.host.unwrap_or_else(|| ctx.config.server.host.clone());
    let port = cmd.port.unwrap_or(ctx.config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("invalid address")?;

    info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .context("binding to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// `--config` may name the file itself or the directory holding it.
fn locate_config_file(flag: Option<PathBuf>) -> Result<PathBuf> {
    let Some(path) = flag else {
        return Ok(XdgDir::Config.locate()?.join("config.toml"));
    };
    let path = match path.to_str() {
        Some(text) => expand(text)?,
        None => path,
    };
    if path.is_dir() {
        Ok(path.join("config.toml"))
    } else if path.file_name().is_some() {
        Ok(path)
    } else {
        Err(anyhow!("invalid config file path: {}", path.display()))
    }
}

/// Defaults, then the TOML file, then `HIRELY__SECTION__KEY` variables.
fn load_config(config_file: &Path, dry_run: bool) -> Result<AppConfig> {
    match (config_file.exists(), dry_run) {
        (true, _) => {}
        (false, true) => info!(
            "dry-run: would create default config at {}",
            config_file.display()
        ),
        (false, false) => write_default_config(config_file)?,
    }

    Config::builder()
        .set_default("logging.level", "info")?
        .add_source(
            File::from(config_file)
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(Environment::with_prefix(&env_prefix()).separator("__"))
        .build()?
        .try_deserialize()
        .with_context(|| format!("reading config from {}", config_file.display()))
}

fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }

    let toml = toml::to_string_pretty(&AppConfig::default())
        .context("serializing default config to TOML")?;
    let body = format!(
        "# Configuration for {APP_NAME}\n\
         # File: {}\n\
         # Set auth.jwt_secret (or env:VAR) before `serve`; `{APP_NAME} secret` prints one.\n\
         \n\
         {toml}",
        path.display()
    );
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

fn expand(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).with_context(|| format!("expanding path {text}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

fn env_prefix() -> String {
    APP_NAME.to_ascii_uppercase().replace('-', "_")
}
