use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgGroup, Parser};
use serde::Serialize;
use tempfile::NamedTempFile;

use lib_playstore::auth::fetch_remote_token;
use lib_playstore::error::StoreError;
use lib_playstore::loggers::{init_tracing, LogOptions};
use lib_playstore::query::QueryEngine;
use lib_playstore::{ErrorCategory, PlayStoreClient, StoreConfig};

/// Query the Play Store and download APKs while posing as an Android device.
#[derive(Parser, Debug)]
#[command(
    about,
    long_about = "Logs in as an emulated Android device, then runs one store operation and prints the result as JSON on stdout. Downloads are written to <dir>/<package>.apk."
)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["request", "details", "search", "similar", "bulk_details", "list", "download"])
))]
struct Args {
    /// GET an arbitrary store path, e.g. `details?doc=com.android.chrome`.
    #[arg(long, value_name = "PATH")]
    request: Option<String>,

    /// Details of one package.
    #[arg(long, value_name = "PKG")]
    details: Option<String>,

    /// With --details, also fetch every related listing the page links to.
    #[arg(long, requires = "details")]
    with_pages: bool,

    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// Apps similar to a package.
    #[arg(long, value_name = "PKG")]
    similar: Option<String>,

    /// Details of several packages in one call.
    #[arg(long, value_name = "PKG", num_args = 1..)]
    bulk_details: Option<Vec<String>>,

    /// Browse categories; narrow with --category and --subcategory.
    #[arg(long)]
    list: bool,

    #[arg(long, value_name = "CAT", requires = "list")]
    category: Option<String>,

    #[arg(long, value_name = "SUB", requires = "list")]
    subcategory: Option<String>,

    /// Follow continuation markers and print every page (search, list and similar).
    #[arg(long)]
    all_pages: bool,

    /// Download the APK of a package.
    #[arg(long, value_name = "PKG")]
    download: Option<String>,

    /// Directory the APK is written to.
    #[arg(short = 'o', long = "output-dir", value_name = "DIR", default_value = ".", requires = "download")]
    output_dir: PathBuf,

    /// Version code to download instead of the latest.
    #[arg(long = "version", value_name = "CODE", requires = "download")]
    version_code: Option<i64>,

    /// Pre-issued session token; skips the login handshake.
    #[arg(long, env = "PLAYSTORE_TOKEN", hide_env_values = true, conflicts_with = "remote_token")]
    token: Option<String>,

    /// Fetch the session token from this URL instead of logging in.
    #[arg(long, value_name = "URL")]
    remote_token: Option<String>,

    #[arg(long, value_name = "URL")]
    http_proxy: Option<String>,

    #[arg(long, value_name = "URL")]
    https_proxy: Option<String>,

    /// JSON5 config file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Built-in device profile (bacon, hammerhead, angler).
    #[arg(long, value_name = "NAME")]
    device: Option<String>,

    /// Send requests back to back.
    #[arg(long)]
    no_throttle: bool,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log JSON lines on stderr.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let options = LogOptions {
        level: args.log_level.clone(),
        json: args.json_logs,
        ..LogOptions::default()
    };
    let _guard = match init_tracing(&options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error initializing logging: {}", e);
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = build_config(&args)?;
    let mut client = PlayStoreClient::new(config)?;

    let token = match (&args.token, &args.remote_token) {
        (Some(token), _) => Some(token.clone()),
        (None, Some(url)) => Some(fetch_remote_token(url).await.map_err(StoreError::from)?),
        (None, None) => None,
    };
    client.login(token.as_deref()).await?;

    if let Some(path) = &args.request {
        print_json(&client.free_request(path).await?)?;
    } else if let Some(package) = &args.details {
        if args.with_pages {
            print_json(&client.details_with_pages(package).await?)?;
        } else {
            print_json(&client.details(package).await?)?;
        }
    } else if let Some(query) = &args.search {
        if args.all_pages {
            all_pages(&client, QueryEngine::search_request(query)).await?;
        } else {
            print_json(&client.search(query).await?)?;
        }
    } else if let Some(package) = &args.similar {
        if args.all_pages {
            all_pages(&client, QueryEngine::similar_request(package)).await?;
        } else {
            print_json(&client.list_similar(package).await?)?;
        }
    } else if let Some(packages) = &args.bulk_details {
        print_json(&client.bulk_details(packages, false, true).await?)?;
    } else if args.list {
        let category = args.category.as_deref();
        let subcategory = args.subcategory.as_deref();
        if args.all_pages {
            let request =
                QueryEngine::list_request(category, subcategory).map_err(StoreError::from)?;
            all_pages(&client, request).await?;
        } else {
            print_json(&client.list(category, subcategory).await?)?;
        }
    } else if let Some(package) = &args.download {
        download(&client, package, args.version_code, &args.output_dir).await?;
    }
    Ok(())
}

fn build_config(args: &Args) -> Result<StoreConfig, StoreError> {
    let mut config = StoreConfig::load(args.config.as_deref())?;
    if let Some(device) = &args.device {
        config.device = device.clone();
        config.device_profile = None;
    }
    if let Some(proxy) = &args.http_proxy {
        config.proxy.http = Some(proxy.clone());
    }
    if let Some(proxy) = &args.https_proxy {
        config.proxy.https = Some(proxy.clone());
    }
    if args.no_throttle {
        config.throttle.enabled = false;
    }
    Ok(config)
}

/// Print whatever pages were fetched, even when pagination stopped early.
async fn all_pages(client: &PlayStoreClient, request: lib_playstore::Request) -> Result<()> {
    match client.get_pages(request).await {
        Ok(pages) => print_json(&pages),
        Err(partial) => {
            print_json(&partial.pages)?;
            Err(StoreError::from(partial.error).into())
        }
    }
}

#[derive(Serialize)]
struct Downloaded<'a> {
    package: &'a str,
    path: PathBuf,
    bytes: u64,
}

async fn download(
    client: &PlayStoreClient,
    package: &str,
    version_code: Option<i64>,
    dir: &Path,
) -> Result<()> {
    let mut payload = client.download(package, version_code).await?;

    std::fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;
    let mut written = 0u64;
    while let Some(chunk) = payload.next_chunk().await {
        let chunk = chunk.map_err(StoreError::from)?;
        file.write_all(&chunk)?;
        written += chunk.len() as u64;
    }
    file.flush()?;

    let target = dir.join(format!("{}.apk", package));
    file.persist(&target).map_err(|e| e.error)?;
    tracing::info!(package, path = %target.display(), bytes = written, "apk saved");

    print_json(&Downloaded {
        package,
        path: target,
        bytes: written,
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(json.as_bytes())?;
    stdout.write_all(b"\n")?;
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<StoreError>().map(StoreError::category) {
        Some(ErrorCategory::Usage) => 2,
        Some(ErrorCategory::Auth) => 3,
        Some(ErrorCategory::Protocol) => 4,
        Some(ErrorCategory::Network) => 5,
        Some(ErrorCategory::Entitlement) => 6,
        Some(ErrorCategory::NotFound) => 7,
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pages_applies_to_similar() {
        let args = Args::try_parse_from(["playstore", "--similar", "com.a", "--all-pages"]).unwrap();
        assert_eq!(args.similar.as_deref(), Some("com.a"));
        assert!(args.all_pages);
    }

    #[test]
    fn one_action_is_required() {
        assert!(Args::try_parse_from(["playstore", "--all-pages"]).is_err());
    }
}
