//! CLI mode for link-dl: submit a batch of links from the terminal.

mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use crate::{
    AppConfig, Controller, DirectorySink, HttpLinkService, LinkService, Page, PageHandle,
    RunOutcome,
};

use progress::{make_spinner, mirror_submit_label, print_outcome, print_status};

/// Arguments accepted by the `link-dl` binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// Links to submit, in order.
    pub links: Vec<String>,
    /// Server base URL overriding the configuration.
    pub server: Option<String>,
    /// Output directory overriding the configuration.
    pub output: Option<PathBuf>,
    /// Explicit configuration file.
    pub config: Option<PathBuf>,
    /// Query server status instead of submitting.
    pub status: bool,
    pub help: bool,
}

/// Prints usage information to stderr.
pub fn print_usage() {
    eprintln!("Usage: link-dl [OPTIONS] <url>...");
    eprintln!();
    eprintln!("Submits links to a link-downloader server and saves the resulting archive.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --server <URL>    Server base URL (default: http://127.0.0.1:5000)");
    eprintln!("  -o, --output <DIR>    Directory for the downloaded archive (default: .)");
    eprintln!("  -c, --config <FILE>   Configuration file (TOML)");
    eprintln!("      --status          Show whether the server is busy and exit");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Set RUST_LOG=info (or debug) for detailed logs.");
}

/// Parses command-line arguments (without the program name).
///
/// # Errors
///
/// Returns a message for unknown flags or flags missing their value.
pub fn parse_args<I>(args: I) -> std::result::Result<CliArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value_for = |flag: &str| {
            args.next()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "-s" | "--server" => parsed.server = Some(value_for(&arg)?),
            "-o" | "--output" => parsed.output = Some(PathBuf::from(value_for(&arg)?)),
            "-c" | "--config" => parsed.config = Some(PathBuf::from(value_for(&arg)?)),
            "--status" => parsed.status = true,
            "-h" | "--help" => parsed.help = true,
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(format!("unknown option: {flag}"));
            }
            link => parsed.links.push(link.to_string()),
        }
    }

    Ok(parsed)
}

/// Loads configuration and applies command-line overrides.
fn resolve_config(args: &CliArgs) -> crate::Result<AppConfig> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(server) = &args.server {
        config.client = config.client.with_base_url(server.as_str());
    }
    if let Some(output) = &args.output {
        config.paths.output_dir.clone_from(output);
    }
    Ok(config)
}

/// Runs one submission of `links` and reports the outcome.
///
/// # Errors
///
/// Returns an error if the configuration is unusable or the HTTP client cannot
/// be built. Run failures are reported through the returned outcome.
pub async fn submit_links(config: &AppConfig, links: &[String]) -> crate::Result<RunOutcome> {
    if links.len() > config.client.max_links {
        return Err(crate::Error::Config(format!(
            "at most {} links can be submitted at once (got {})",
            config.client.max_links,
            links.len()
        )));
    }

    let service = HttpLinkService::new(config.client.clone())?;
    let sink = DirectorySink::new(&config.paths.output_dir);
    let archive_path = sink.path_for(&config.client.archive_name);
    let page = PageHandle::new(Page::with_links(links));
    let mut controller = Controller::new(service, sink, page.clone(), config.client.clone());

    log::info!("Submitting to {}", config.client.base_url);
    let spinner = make_spinner();
    let mirror = mirror_submit_label(spinner.clone(), page.clone());

    let outcome = controller.submit().await;

    mirror.abort();
    spinner.finish_and_clear();
    print_outcome(&page.snapshot(), &outcome, &archive_path);
    Ok(outcome)
}

/// Entry point for the `link-dl` binary.
pub async fn run() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("Error: {msg}");
            print_usage();
            return ExitCode::from(2);
        }
    };

    if args.help || (args.links.is_empty() && !args.status) {
        print_usage();
        return if args.help {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(2)
        };
    }

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.status {
        let result = match HttpLinkService::new(config.client.clone()) {
            Ok(service) => service.status().await,
            Err(e) => Err(e),
        };
        return match result {
            Ok(status) => {
                print_status(&config.client.base_url, &status);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e.user_message());
                ExitCode::FAILURE
            }
        };
    }

    match submit_links(&config, &args.links).await {
        Ok(RunOutcome::Complete(_)) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn positional_arguments_are_links() {
        let parsed = parse_args(args(&["http://a.com", "http://b.com"])).unwrap();
        assert_eq!(parsed.links, args(&["http://a.com", "http://b.com"]));
        assert!(!parsed.status);
    }

    #[test]
    fn options_take_values() {
        let parsed = parse_args(args(&[
            "--server",
            "http://srv:5000",
            "-o",
            "/tmp/out",
            "-c",
            "cfg.toml",
            "http://a.com",
        ]))
        .unwrap();
        assert_eq!(parsed.server.as_deref(), Some("http://srv:5000"));
        assert_eq!(parsed.output, Some(PathBuf::from("/tmp/out")));
        assert_eq!(parsed.config, Some(PathBuf::from("cfg.toml")));
        assert_eq!(parsed.links, args(&["http://a.com"]));
    }

    #[test]
    fn missing_value_is_reported() {
        let err = parse_args(args(&["--server"])).unwrap_err();
        assert_eq!(err, "--server requires a value");
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(parse_args(args(&["--verbose"])).is_err());
    }

    #[test]
    fn status_and_help_flags() {
        let parsed = parse_args(args(&["--status", "-h"])).unwrap();
        assert!(parsed.status);
        assert!(parsed.help);
    }

    #[test]
    fn overrides_apply_on_top_of_config() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[client]\nbase_url = \"http://from-file\"\n").unwrap();
        let parsed = CliArgs {
            config: Some(file.path().to_path_buf()),
            output: Some(PathBuf::from("/srv/archives")),
            ..CliArgs::default()
        };

        let config = resolve_config(&parsed).unwrap();
        assert_eq!(config.client.base_url, "http://from-file");
        assert_eq!(config.paths.output_dir, PathBuf::from("/srv/archives"));

        let parsed = CliArgs {
            server: Some("http://cli/".into()),
            ..parsed
        };
        assert_eq!(resolve_config(&parsed).unwrap().client.base_url, "http://cli");
    }

    #[tokio::test]
    async fn too_many_links_are_refused() {
        let config = AppConfig {
            client: crate::ClientConfig::new().with_max_links(1),
            ..AppConfig::default()
        };
        let err = submit_links(&config, &args(&["http://a.com", "http://b.com"]))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
