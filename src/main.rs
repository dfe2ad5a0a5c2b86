use clap::{Arg, Command};
use log::LevelFilter;
use scamcheck::analysis::{AnalysisRequest, AnalysisResult, InputKind};
use scamcheck::classifier::{build_classifier, RiskClassifier};
use scamcheck::server::{self, AppState};
use scamcheck::Config;
use std::process;
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "/etc/scamcheck.yaml";

#[tokio::main]
async fn main() {
    let matches = Command::new("scamcheck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Scam and phishing risk scoring for messages and URLs")
        .long_about(
            "scamcheck scores a message or URL for phishing and scam indicators and returns \
             a SAFE / SUSPICIOUS / MALICIOUS verdict with the findings behind it.\n\
             By default it serves the verdict API over HTTP; use --analyze for a one-off check.",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the configuration and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("analyze")
                .long("analyze")
                .value_name("TEXT")
                .help("Analyze a single message or URL and print the JSON verdict")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("type")
                .long("type")
                .value_name("KIND")
                .help("Input kind hint for --analyze")
                .value_parser(["url", "message", "general"])
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging with rule-level detail")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_PATH);

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        test_config(&config);
        return;
    }

    let classifier = match build_classifier(&config) {
        Ok(classifier) => classifier,
        Err(e) => {
            eprintln!("Error initializing classifier: {e:#}");
            process::exit(1);
        }
    };

    if let Some(text) = matches.get_one::<String>("analyze") {
        let kind = matches
            .get_one::<String>("type")
            .and_then(|k| k.parse::<InputKind>().ok());
        analyze_once(classifier, text, kind).await;
        return;
    }

    let addr = config.bind_addr();
    log::info!("Starting scamcheck {} on {addr}", env!("CARGO_PKG_VERSION"));
    if let Err(e) = server::serve(AppState { classifier }, &addr).await {
        log::error!("Server error: {e:#}");
        process::exit(1);
    }
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path)
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn test_config(config: &Config) {
    println!("🔍 Testing configuration...");
    println!();
    println!("Classifier: {:?}", config.classifier);
    println!("Listen address: {}", config.bind_addr());
    println!(
        "Thresholds: suspicious >= {}, malicious >= {}",
        config.thresholds.suspicious, config.thresholds.malicious
    );
    println!("Keywords: {}", config.rules.keywords.len());
    println!("Suspicious TLDs: {}", config.rules.suspicious_tlds.len());

    match config.validate() {
        Ok(()) => println!("✅ Configuration is valid"),
        Err(e) => {
            println!("❌ Configuration validation failed:");
            println!("Error: {e:#}");
            process::exit(1);
        }
    }
}

async fn analyze_once(classifier: Arc<dyn RiskClassifier>, text: &str, kind: Option<InputKind>) {
    let mut request = AnalysisRequest::new(text);
    if let Some(kind) = kind {
        request = request.with_kind(kind);
    }

    let (result, exit_code) = match classifier.classify(&request).await {
        Ok(result) => (result, 0),
        Err(e) if e.is_client_error() => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
        Err(e) => (AnalysisResult::error(e.to_string()), 1),
    };

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing result: {e}");
            process::exit(1);
        }
    }

    if exit_code != 0 {
        process::exit(exit_code);
    }
}
