use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pictura_contracts::chat::{parse_intent, ChatIntent, CHAT_HELP_COMMANDS};
use pictura_contracts::styles::{request_message, StyleName, StyleSelection};
use pictura_engine::config::{load_dotenv, mask_key, resolve_api_key, ClientConfig, StoreConfig};
use pictura_engine::media::ImagePart;
use pictura_engine::orchestrator::{TransformRequest, TransformResult, ValidationRetryPolicy};
use pictura_engine::storage::SweepReport;
use pictura_engine::{SessionConfig, StudioSession};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pictura", version, about = "Style transfer descriptions over Gemini")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Filter an image and describe it in the chosen style.
    Transform(TransformArgs),
    /// Interactive chat with optional image attachments.
    Chat(ChatArgs),
    /// Check whether the configured API key works.
    CheckKey(CheckKeyArgs),
    /// Delete transient files older than the given age.
    Sweep(SweepArgs),
    /// List the available styles.
    Styles,
}

#[derive(Debug, Args)]
struct SessionArgs {
    /// Root directory for uploads, filtered images and the event log.
    #[arg(long, default_value = "temp")]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    model: Option<String>,
}

#[derive(Debug, Args)]
struct TransformArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    style: String,
    #[arg(long)]
    instruction: Option<String>,
    #[arg(long, default_value_t = 5)]
    max_attempts: u32,
    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Debug, Args)]
struct ChatArgs {
    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Debug, Args)]
struct CheckKeyArgs {
    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Debug, Args)]
struct SweepArgs {
    #[arg(long, default_value_t = 24)]
    max_age_hours: u64,
    #[command(flatten)]
    session: SessionArgs,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("pictura error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    load_dotenv(Path::new(".env"));
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Transform(args) => run_transform(args),
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::CheckKey(args) => run_check_key(args),
        Command::Sweep(args) => run_sweep(args),
        Command::Styles => {
            print_styles();
            Ok(0)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn session_config(args: &SessionArgs, retry: ValidationRetryPolicy) -> SessionConfig {
    let mut client = ClientConfig::from_env();
    if let Some(model) = args.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        client.model = model.to_string();
    }
    client.api_key = resolve_api_key(args.api_key.as_deref()).unwrap_or_default();
    SessionConfig {
        client,
        store: StoreConfig {
            root: args.out.clone(),
            ..StoreConfig::default()
        },
        events_path: args.events.clone(),
        retry,
    }
}

fn open_session(args: &SessionArgs, retry: ValidationRetryPolicy) -> Result<StudioSession> {
    StudioSession::open(session_config(args, retry)).context("failed to open session")
}

fn parse_style(raw: &str) -> Result<StyleSelection> {
    let style = StyleSelection::parse(raw);
    if style.label().is_empty() {
        bail!("style must not be empty (see `pictura styles`)");
    }
    Ok(style)
}

fn run_transform(args: TransformArgs) -> Result<i32> {
    let style = parse_style(&args.style)?;
    let bytes = fs::read(&args.image)
        .with_context(|| format!("failed to read image {}", args.image.display()))?;
    let retry = ValidationRetryPolicy::default().with_max_attempts(args.max_attempts);
    let mut session = open_session(&args.session, retry)?;

    transform_and_report(
        &mut session,
        &args.image,
        bytes,
        style,
        args.instruction.as_deref(),
    )
}

fn transform_and_report(
    session: &mut StudioSession,
    image_path: &Path,
    bytes: Vec<u8>,
    style: StyleSelection,
    instruction: Option<&str>,
) -> Result<i32> {
    let file_name = image_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());
    if let Err(err) = session.save_upload(&file_name, &bytes) {
        println!("warning: {err}");
    }

    println!("{}", request_message(&style, instruction));
    let mut request = TransformRequest::new(bytes, style);
    if let Some(instruction) = instruction {
        request = request.with_instruction(instruction);
    }

    match session.transform(&request) {
        Ok(result) => {
            print_transform_result(&result);
            Ok(if result.outcome.is_ok() { 0 } else { 1 })
        }
        Err(err) => {
            println!("{}", err.message);
            Ok(1)
        }
    }
}

fn print_transform_result(result: &TransformResult) {
    println!();
    println!("{}", result.display_text());
    println!();
    match &result.filtered_image {
        Some(stored) => match stored.read_bytes() {
            Ok(bytes) => println!(
                "Filtered image: {} ({} bytes)",
                stored.path.display(),
                bytes.len()
            ),
            Err(err) => println!("warning: {err}"),
        },
        None => println!(
            "warning: {}",
            result
                .filter_warning
                .as_deref()
                .unwrap_or("no filtered image was produced")
        ),
    }
}

fn run_check_key(args: CheckKeyArgs) -> Result<i32> {
    let mut session = open_session(&args.session, ValidationRetryPolicy::default())?;
    if session.api_key().is_empty() {
        println!("No API key set. Pass --api-key or set GEMINI_API_KEY.");
        return Ok(1);
    }
    let check = session.check_key()?;
    let key = mask_key(session.api_key());
    match check.error() {
        None => {
            println!("API key {key}: valid");
            Ok(0)
        }
        Some(err) => {
            println!("API key {key}: {} ({})", err.message, err.kind);
            Ok(1)
        }
    }
}

fn run_sweep(args: SweepArgs) -> Result<i32> {
    let session = open_session(&args.session, ValidationRetryPolicy::default())?;
    let max_age = Duration::from_secs(args.max_age_hours.saturating_mul(60 * 60));
    let report = session.sweep_older_than(max_age);
    println!("{}", describe_sweep(&report));
    Ok(if report.failed == 0 { 0 } else { 1 })
}

fn describe_sweep(report: &SweepReport) -> String {
    let mut text = format!("Removed {} file(s), kept {}", report.removed, report.kept);
    if report.failed > 0 {
        text.push_str(&format!(", {} could not be removed", report.failed));
    }
    text
}

fn print_styles() {
    for style in StyleName::ALL {
        println!("{:<14} {:<14} {}", style.id(), style.display_name(), style.prompt_template());
    }
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let mut session = open_session(&args.session, ValidationRetryPolicy::default())?;
    let swept = session.sweep();
    if swept.removed > 0 {
        tracing::info!(removed = swept.removed, "swept stale transient files");
    }

    let stdin = io::stdin();
    let mut line = String::new();
    let mut attachment: Option<ImagePart> = None;
    let mut attachment_name: Option<String> = None;

    println!("Pictura chat started. Pick a style with /transform or just ask a question.");
    println!("Type /help for commands.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        match parse_intent(line.trim_end_matches(['\n', '\r'])) {
            ChatIntent::Noop => continue,
            ChatIntent::Help => println!("Commands: {}", CHAT_HELP_COMMANDS.join("  ")),
            ChatIntent::Quit => break,
            ChatIntent::Styles => print_styles(),
            ChatIntent::Detach => {
                attachment = None;
                attachment_name = None;
                println!("Attachment cleared.");
            }
            ChatIntent::SetKey { key } => {
                session.set_api_key(&key);
                match session.check_key() {
                    Ok(check) => match check.error() {
                        None => println!("API key {} is valid.", mask_key(&key)),
                        Some(err) => println!("API key {}: {}", mask_key(&key), err.message),
                    },
                    Err(err) => println!("Key check failed: {err:#}"),
                }
            }
            ChatIntent::Attach { path } => {
                let path = PathBuf::from(path);
                match fs::read(&path) {
                    Ok(bytes) => {
                        let name = path
                            .file_name()
                            .map(|name| name.to_string_lossy().to_string())
                            .unwrap_or_else(|| "upload".to_string());
                        if let Err(err) = session.save_upload(&name, &bytes) {
                            println!("warning: {err}");
                        }
                        let part = ImagePart::detect(bytes);
                        println!("Attached {name} ({}).", part.mime_type);
                        attachment = Some(part);
                        attachment_name = Some(name);
                    }
                    Err(err) => println!("Attach failed: {} ({err})", path.display()),
                }
            }
            ChatIntent::Transform {
                path,
                style,
                instruction,
            } => {
                let style = match parse_style(&style) {
                    Ok(style) => style,
                    Err(err) => {
                        println!("{err}");
                        continue;
                    }
                };
                let path = PathBuf::from(path);
                let bytes = match fs::read(&path) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        println!("Transform failed: {} ({err})", path.display());
                        continue;
                    }
                };
                transform_and_report(&mut session, &path, bytes, style, instruction.as_deref())?;
            }
            ChatIntent::Invalid { command, reason } => println!("/{command}: {reason}"),
            ChatIntent::Unknown { command, .. } => {
                println!("Unknown command /{command}. Type /help for commands.")
            }
            ChatIntent::Message { text } => {
                if let Some(name) = attachment_name.as_deref() {
                    tracing::debug!(attachment = name, "sending chat message with image");
                }
                match session.chat(&text, attachment.as_ref()) {
                    Ok(reply) => println!("{reply}"),
                    Err(err) => println!("{}", err.message),
                }
            }
        }
    }

    Ok(())
}
