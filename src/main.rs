use chartlens::{
    analysis::AnalysisView,
    logger::{self, LogLevel, LoggerConfig},
    AnalysisOutcome, AnalystConfig, AnalystSession, GeminiClient, Preset, SessionEvent,
    TerminalView, UploadedImage, VisionClient,
};
use clap::Parser;
use colored::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Ask a Gemini vision model about a cryptocurrency chart.
#[derive(Parser, Debug)]
#[command(name = "chartlens", version, about)]
struct Cli {
    /// Chart image to load (jpg, jpeg, png or gif)
    #[arg(long)]
    image: Option<PathBuf>,

    /// Question to ask about the chart
    #[arg(long, conflicts_with = "preset")]
    question: Option<String>,

    /// Quick analysis: comprehensive, trend or risk (or 1, 2, 3)
    #[arg(long, value_parser = parse_preset)]
    preset: Option<Preset>,

    /// Gemini model name
    #[arg(long)]
    model: Option<String>,

    /// Base URL of the Gemini REST API
    #[arg(long)]
    api_base: Option<String>,

    /// Whole-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print responses at once instead of typing them out
    #[arg(long)]
    no_typing: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Also append log lines to this file
    #[arg(long)]
    log_file: Option<String>,

    /// Write log lines as JSON
    #[arg(long)]
    log_json: bool,

    /// List known vision models and exit
    #[arg(long)]
    list_models: bool,
}

fn parse_preset(input: &str) -> Result<Preset, String> {
    Preset::parse(input).ok_or_else(|| {
        format!(
            "unknown preset '{}' (use comprehensive, trend, risk or 1-3)",
            input
        )
    })
}

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Upload(PathBuf),
    Preset(Preset),
    Analyze,
    Last,
    Help,
    Quit,
    Ask(String),
    Empty,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if !line.starts_with('/') {
        return Command::Ask(line.to_string());
    }

    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (line, ""),
    };
    match (name, arg) {
        ("/upload", path) if !path.is_empty() => Command::Upload(PathBuf::from(path)),
        ("/preset", preset) => match Preset::parse(preset) {
            Some(preset) => Command::Preset(preset),
            None => Command::Unknown(line.to_string()),
        },
        ("/analyze", _) => Command::Analyze,
        ("/last", _) => Command::Last,
        ("/help", _) => Command::Help,
        ("/quit", _) | ("/exit", _) => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  /upload <path>   load a chart image (jpg, jpeg, png, gif)");
    println!("  /preset <n>      run a quick analysis:");
    for (index, preset) in Preset::ALL.iter().enumerate() {
        println!("                     {} {}  {}", index + 1, preset.label(), preset.help().bright_black());
    }
    println!("  /analyze         ask the current question again");
    println!("  /last            show the previous analysis");
    println!("  /help            this list");
    println!("  /quit            leave");
    println!("  anything else is sent as your question");
}

fn prompt(label: &str) {
    print!("{}", label.bright_cyan().bold());
    let _ = std::io::stdout().flush();
}

fn build_config(cli: &Cli) -> AnalystConfig {
    let mut config = AnalystConfig::from_env();
    if let Some(model) = &cli.model {
        config.gemini = config.gemini.with_model(model.as_str());
    }
    if let Some(api_base) = &cli.api_base {
        config.gemini = config.gemini.with_api_base(api_base.as_str());
    }
    if let Some(secs) = cli.timeout {
        config.gemini = config.gemini.with_timeout(Duration::from_secs(secs));
    }
    if cli.no_typing {
        config = config.without_typing();
    }
    config
}

async fn read_credential(
    session: &mut AnalystSession,
    client: &GeminiClient,
    view: &mut TerminalView,
    lines: &mut Lines<BufReader<Stdin>>,
) -> std::io::Result<bool> {
    while !session.has_credential() {
        prompt("🔑 Gemini API key: ");
        let Some(line) = lines.next_line().await? else {
            return Ok(false);
        };
        session
            .handle(SessionEvent::CredentialEntered(line), client.vision(), view)
            .await;
    }
    Ok(true)
}

async fn upload(
    session: &mut AnalystSession,
    client: &GeminiClient,
    view: &mut TerminalView,
    path: &Path,
) -> bool {
    match UploadedImage::from_path(path) {
        Ok(upload) => {
            session
                .handle(SessionEvent::ImageUploaded(upload), client.vision(), view)
                .await;
            session.image().is_some()
        }
        Err(e) => {
            log::error!("❌ Could not read {}: {}", path.display(), e);
            view.error(&e.to_string(), None);
            false
        }
    }
}

async fn run_once(
    session: &mut AnalystSession,
    client: &GeminiClient,
    view: &mut TerminalView,
    cli: &Cli,
) -> Option<AnalysisOutcome> {
    let event = match (&cli.preset, &cli.question) {
        (Some(preset), _) => SessionEvent::PresetClicked(*preset),
        (None, Some(question)) => {
            session
                .handle(SessionEvent::QuestionChanged(question.clone()), client.vision(), view)
                .await;
            SessionEvent::TriggerClicked
        }
        (None, None) => return None,
    };
    session.handle(event, client.vision(), view).await
}

async fn run_interactive(
    session: &mut AnalystSession,
    client: &GeminiClient,
    view: &mut TerminalView,
    lines: &mut Lines<BufReader<Stdin>>,
) -> std::io::Result<()> {
    print_help();
    loop {
        prompt("\n› ");
        let Some(line) = lines.next_line().await? else {
            println!();
            return Ok(());
        };

        let event = match parse_command(&line) {
            Command::Empty => continue,
            Command::Quit => return Ok(()),
            Command::Help => {
                print_help();
                continue;
            }
            Command::Unknown(input) => {
                view.warning(&format!("Unknown command: {} (try /help)", input));
                continue;
            }
            Command::Upload(path) => {
                upload(session, client, view, &path).await;
                continue;
            }
            Command::Last => {
                view.expand_last_analysis();
                view.render(&session.snapshot());
                continue;
            }
            Command::Preset(preset) => SessionEvent::PresetClicked(preset),
            Command::Analyze => SessionEvent::TriggerClicked,
            Command::Ask(question) => {
                session
                    .handle(SessionEvent::QuestionChanged(question), client.vision(), view)
                    .await;
                SessionEvent::TriggerClicked
            }
        };

        session.handle(event, client.vision(), view).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let dotenv_loaded = dotenv::dotenv().is_ok();

    let mut logger_config = if cli.verbose {
        LoggerConfig::development()
    } else {
        LoggerConfig::default().with_level(LogLevel::Warn)
    };
    if let Some(path) = &cli.log_file {
        logger_config = logger_config.with_file_output(path);
    }
    logger_config = logger_config.with_json_output(cli.log_json);
    logger::init_with_config(logger_config)?;

    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::info!("No .env file found, using system environment variables");
    }

    if cli.list_models {
        for (id, name) in VisionClient::known_models() {
            println!("{:<20} {}", id.bold(), name);
        }
        return Ok(());
    }

    let config = build_config(&cli);
    logger::log_config_info(&config);

    let client = match GeminiClient::new(config.gemini.clone()) {
        Ok(client) => client,
        Err(e) => {
            log::error!("❌ Failed to initialize Gemini client: {}", e);
            return Err(e.into());
        }
    };

    println!("{}", "📈 Crypto chart analyst".bold());
    println!(
        "{}",
        format!("Model: {}", config.gemini.model).bright_black()
    );

    let mut session = AnalystSession::from_config(&config);
    let mut view = TerminalView::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !read_credential(&mut session, &client, &mut view, &mut lines).await? {
        log::warn!("⚠️  No API key entered, exiting");
        return Ok(());
    }

    if let Some(path) = &cli.image {
        let loaded = upload(&mut session, &client, &mut view, path).await;
        let one_shot = cli.question.is_some() || cli.preset.is_some();
        if one_shot {
            let completed = loaded
                && run_once(&mut session, &client, &mut view, &cli)
                    .await
                    .map_or(false, |outcome| outcome.is_completed());
            std::process::exit(if completed { 0 } else { 1 });
        }
    }

    run_interactive(&mut session, &client, &mut view, &mut lines).await?;
    log::info!("👋 Session closed");
    Ok(())
}
