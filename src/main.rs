use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast;
use tracing::{info, warn};

use claim_intake::claims::{ClaimStatus, ClaimsView};
use claim_intake::client::HttpIntakeClient;
use claim_intake::config::AppConfig;
use claim_intake::models::{ChatMessage, MessageRole, ScreenKind};
use claim_intake::service::chat_screen::{backend_for, ChatScreen};
use claim_intake::service::intake_service::IntakeService;
use claim_intake::service::terms_gate::{TermsContent, TermsGate};
use claim_intake::speech::{CaptureState, ScriptedRecognizer, SpeechRecognizer, UnavailableRecognizer};
use claim_intake::store::terms_store::FileTermsStore;

const TRANSCRIPT_GAP: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "claim-intake", version, about = "Conversational insurance intake client")]
struct Cli {
    /// Base URL of the intake service (overrides INTAKE_API_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Where terms acceptance is remembered (overrides TERMS_STATE_PATH)
    #[arg(long)]
    state_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chat with one of the intake screens
    Chat {
        #[arg(long, default_value = "signup")]
        screen: ScreenKind,
        /// Specialist for the verify screen, by name or specialty
        #[arg(long)]
        specialist: Option<String>,
        /// File of utterances, one per line, played back as speech input
        #[arg(long)]
        transcripts: Option<PathBuf>,
    },
    /// Show the terms gate and record acceptance
    Terms,
    /// List claims for a status (approved, pending, rejected)
    Claims { status: ClaimStatus },
}

type StdinLines = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the transcript on stdout stays readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "claim_intake=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // ── Configuration ─────────────────────────────────────────────────────────
    let mut config = AppConfig::from_env()?;
    if let Some(url) = cli.base_url {
        config.intake_base_url = url;
    }
    if let Some(path) = cli.state_path {
        config.terms_state_path = path;
    }
    info!(base_url = %config.intake_base_url, "configuration loaded");

    let client = HttpIntakeClient::new(&config.intake_base_url);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    match cli.command {
        Command::Claims { status } => {
            print!("{}", ClaimsView::for_status(status).render());
        }
        Command::Terms => {
            let accepted = run_terms_gate(&config, &client, &mut lines).await?;
            println!("{}", if accepted { "Terms accepted." } else { "Terms not accepted." });
        }
        Command::Chat { screen, specialist, transcripts } => {
            if !run_terms_gate(&config, &client, &mut lines).await? {
                return Ok(());
            }
            let recognizer = recognizer_from(transcripts.as_deref()).await?;
            run_chat(&config, &client, screen, specialist, recognizer, &mut lines).await?;
        }
    }

    Ok(())
}

/// Returns `true` once the user has accepted, now or in an earlier session.
async fn run_terms_gate(
    config: &AppConfig,
    client: &HttpIntakeClient,
    lines: &mut StdinLines,
) -> anyhow::Result<bool> {
    let store = Arc::new(FileTermsStore::new(&config.terms_state_path));
    let mut gate = TermsGate::startup(store).await;
    if !gate.is_blocking() {
        return Ok(true);
    }

    gate.load_content(client).await;
    println!("── Terms and Conditions ──");
    match gate.content() {
        TermsContent::Loading => println!("Loading Terms and Conditions..."),
        TermsContent::Loaded(text) => println!("{text}"),
        TermsContent::Failed(message) => println!("{message}"),
    }

    loop {
        println!("I accept the Terms and Conditions [y/n, q to quit]:");
        let Some(answer) = lines.next_line().await? else {
            return Ok(false);
        };
        match answer.trim().to_lowercase().as_str() {
            "q" | "quit" => return Ok(false),
            "y" | "yes" => gate.set_checked(true),
            _ => gate.set_checked(false),
        }
        match gate.accept().await {
            Ok(()) => return Ok(true),
            Err(e) => println!("{e}"),
        }
    }
}

async fn recognizer_from(transcripts: Option<&Path>) -> anyhow::Result<Arc<dyn SpeechRecognizer>> {
    let Some(path) = transcripts else {
        return Ok(Arc::new(UnavailableRecognizer));
    };
    let raw = tokio::fs::read_to_string(path).await?;
    let utterances: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    info!(count = utterances.len(), "loaded scripted transcripts");
    Ok(Arc::new(ScriptedRecognizer::new(utterances).with_gap(TRANSCRIPT_GAP)))
}

async fn run_chat(
    config: &AppConfig,
    client: &HttpIntakeClient,
    kind: ScreenKind,
    specialist: Option<String>,
    recognizer: Arc<dyn SpeechRecognizer>,
    lines: &mut StdinLines,
) -> anyhow::Result<()> {
    let intake = IntakeService::new(backend_for(kind, client, config.simulated_reply_delay));
    let mut screen =
        ChatScreen::open(kind, intake, recognizer, config.recognition_settings()).await;

    if let Some(query) = specialist {
        screen.select_specialist(&query).await?;
    }

    let updates = screen.thread().subscribe();
    for message in screen.thread().all().await {
        print_turn(&message);
    }
    let renderer = tokio::spawn(render_turns(updates));

    println!("Type a message. Commands: /mic, /attach <file>, /specialist <name>, /quit");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit", _) => break,
            ("/mic", _) => match screen.toggle_recording() {
                CaptureState::Capturing => println!("(listening…)"),
                CaptureState::Idle if screen.speech_supported() => {
                    println!("(stopped after {}s)", screen.recording_seconds())
                }
                CaptureState::Idle => println!("(speech input is not available)"),
            },
            ("/attach", path) => {
                if let Err(e) = screen.attach(Path::new(path.trim())).await {
                    println!("{e}");
                }
            }
            ("/specialist", query) => match screen.select_specialist(query).await {
                Ok(s) => println!("(now talking to {} – {})", s.name, s.specialty),
                Err(e) => println!("{e}"),
            },
            _ => {
                screen.send(line).await;
            }
        }
    }

    screen.stop_recording();
    renderer.abort();
    Ok(())
}

async fn render_turns(mut updates: broadcast::Receiver<ChatMessage>) {
    loop {
        match updates.recv().await {
            Ok(message) => print_turn(&message),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("renderer skipped {skipped} turns");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_turn(message: &ChatMessage) {
    let who = match (message.role, message.is_attachment) {
        (MessageRole::User, true) => "you 📎",
        (MessageRole::User, false) => "you",
        (MessageRole::Bot, _) => "bot",
    };
    println!("[{who}] {}", message.text);
}
