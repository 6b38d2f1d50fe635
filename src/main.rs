mod commands;
mod config;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, ValueEnum};
use commands::{Command, OutputFormat};
use config::Config;
use mistralclient::{AuthRequest, Credentials, MistralClient, OidcParams, TlsOptions};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command-line client for the Mistral workflow service
#[derive(Parser, Debug)]
#[command(name = "mistral", version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(flatten)]
    target: TargetArgs,

    /// Output format (default from config, else json)
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Shortcut for --log-level debug
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct ConnectionArgs {
    #[arg(long, env = "OS_MISTRAL_URL")]
    os_mistral_url: Option<String>,
    #[arg(long, env = "OS_MISTRAL_SERVICE_TYPE")]
    os_mistral_service_type: Option<String>,
    #[arg(long, env = "OS_MISTRAL_ENDPOINT_TYPE")]
    os_mistral_endpoint_type: Option<String>,
    /// keystone or keycloak-oidc
    #[arg(long, env = "MISTRAL_AUTH_TYPE")]
    auth_type: Option<String>,

    #[arg(long, env = "OS_AUTH_URL")]
    os_auth_url: Option<String>,
    #[arg(long, env = "OS_USERNAME")]
    os_username: Option<String>,
    #[arg(long, env = "OS_USER_ID")]
    os_user_id: Option<String>,
    #[arg(long, env = "OS_PASSWORD", hide_env_values = true)]
    os_password: Option<String>,
    #[arg(long, env = "OS_PROJECT_NAME")]
    os_project_name: Option<String>,
    #[arg(long, env = "OS_PROJECT_ID")]
    os_project_id: Option<String>,
    #[arg(long, env = "OS_USER_DOMAIN_NAME")]
    os_user_domain_name: Option<String>,
    #[arg(long, env = "OS_USER_DOMAIN_ID")]
    os_user_domain_id: Option<String>,
    #[arg(long, env = "OS_PROJECT_DOMAIN_NAME")]
    os_project_domain_name: Option<String>,
    #[arg(long, env = "OS_PROJECT_DOMAIN_ID")]
    os_project_domain_id: Option<String>,
    #[arg(long, env = "OS_AUTH_TOKEN", hide_env_values = true)]
    os_auth_token: Option<String>,
    #[arg(long, env = "OS_REGION_NAME")]
    os_region_name: Option<String>,

    #[arg(long, env = "OPENID_CLIENT_ID")]
    openid_client_id: Option<String>,
    #[arg(long, env = "OPENID_CLIENT_SECRET", hide_env_values = true)]
    openid_client_secret: Option<String>,
    #[arg(long, env = "OPENID_REALM_NAME")]
    openid_realm_name: Option<String>,
    #[arg(long, env = "OS_ACCESS_TOKEN", hide_env_values = true)]
    os_access_token: Option<String>,

    #[arg(long, env = "OS_CACERT")]
    os_cacert: Option<PathBuf>,
    #[arg(long, env = "OS_CERT")]
    os_cert: Option<PathBuf>,
    #[arg(long, env = "OS_KEY")]
    os_key: Option<PathBuf>,
    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,
}

/// Credentials for the cloud that workflow actions operate on
#[derive(ClapArgs, Debug)]
struct TargetArgs {
    #[arg(long, env = "OS_TARGET_AUTH_URL")]
    os_target_auth_url: Option<String>,
    #[arg(long, env = "OS_TARGET_USERNAME")]
    os_target_username: Option<String>,
    #[arg(long, env = "OS_TARGET_USER_ID")]
    os_target_user_id: Option<String>,
    #[arg(long, env = "OS_TARGET_PASSWORD", hide_env_values = true)]
    os_target_password: Option<String>,
    #[arg(long, env = "OS_TARGET_PROJECT_NAME")]
    os_target_project_name: Option<String>,
    #[arg(long, env = "OS_TARGET_PROJECT_ID")]
    os_target_project_id: Option<String>,
    #[arg(long, env = "OS_TARGET_USER_DOMAIN_NAME")]
    os_target_user_domain_name: Option<String>,
    #[arg(long, env = "OS_TARGET_PROJECT_DOMAIN_NAME")]
    os_target_project_domain_name: Option<String>,
    #[arg(long, env = "OS_TARGET_AUTH_TOKEN", hide_env_values = true)]
    os_target_auth_token: Option<String>,
    #[arg(long, env = "OS_TARGET_REGION_NAME")]
    os_target_region_name: Option<String>,
    #[arg(long, env = "OS_TARGET_CACERT")]
    os_target_cacert: Option<PathBuf>,
    #[arg(long)]
    target_insecure: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("mistral started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("mistral").join("mistral.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".mistral").join("mistral.log");
    }
    PathBuf::from("mistral.log")
}

fn target_credentials(args: TargetArgs) -> Option<Credentials> {
    args.os_target_auth_url.as_ref()?;
    Some(Credentials {
        auth_url: args.os_target_auth_url,
        username: args.os_target_username,
        user_id: args.os_target_user_id,
        password: args.os_target_password,
        project_name: args.os_target_project_name,
        project_id: args.os_target_project_id,
        user_domain_name: args.os_target_user_domain_name,
        project_domain_name: args.os_target_project_domain_name,
        token: args.os_target_auth_token,
        region_name: args.os_target_region_name,
        insecure: args.target_insecure,
        cacert: args.os_target_cacert,
        ..Default::default()
    })
}

/// Merge flags, environment and the config file into client options
fn build_request(
    args: ConnectionArgs,
    target: TargetArgs,
    config: &Config,
) -> (AuthRequest, TlsOptions) {
    let tls = TlsOptions {
        insecure: args.insecure,
        cacert: args.os_cacert.clone(),
        cert: args.os_cert,
        key: args.os_key,
    };

    let request = AuthRequest {
        auth_type: Some(config.effective_auth_type(args.auth_type)),
        credentials: Credentials {
            auth_url: config.effective_auth_url(args.os_auth_url),
            username: args.os_username,
            user_id: args.os_user_id,
            password: args.os_password,
            project_name: if args.os_project_id.is_some() {
                args.os_project_name
            } else {
                config.effective_project_name(args.os_project_name)
            },
            project_id: args.os_project_id,
            user_domain_name: args.os_user_domain_name,
            user_domain_id: args.os_user_domain_id,
            project_domain_name: args.os_project_domain_name,
            project_domain_id: args.os_project_domain_id,
            token: args.os_auth_token,
            region_name: config.effective_region_name(args.os_region_name),
            insecure: args.insecure,
            cacert: args.os_cacert,
        },
        oidc: OidcParams {
            client_id: args.openid_client_id,
            client_secret: args.openid_client_secret,
            realm_name: args.openid_realm_name,
            access_token: args.os_access_token,
        },
        mistral_url: config.effective_mistral_url(args.os_mistral_url),
        service_type: Some(config.effective_service_type(args.os_mistral_service_type)),
        endpoint_type: Some(config.effective_endpoint_type(args.os_mistral_endpoint_type)),
        target: target_credentials(target),
    };

    (request, tls)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { LogLevel::Debug } else { args.log_level };
    let _log_guard = setup_logging(level);

    let mut config = Config::load();
    let format = match args.format {
        Some(format) => format,
        None => OutputFormat::parse(&config.effective_output_format(None))?,
    };

    if let Command::Config(cmd) = &args.command {
        println!("{}", commands::run_config(cmd, &mut config, format)?);
        return Ok(());
    }

    let (request, tls) = build_request(args.connection, args.target, &config);
    let client = MistralClient::new(&request, &tls).await?;
    let output = commands::execute(&client, args.command, format).await?;

    println!("{}", output);
    Ok(())
}
