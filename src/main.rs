use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use readalong::config::clamp_rate;
use readalong::playback::{self, AudioClock, Driver, forward_ctrl_c};
use readalong::segment::{Pause, Token};
use readalong::sync::TerminalSurface;
use readalong::voice::{DEFAULT_VOICE, HttpSynthesizer, VOICES};
use readalong::{Config, ContentTree};

/// Readalong - read web content aloud with word highlighting
#[derive(Parser)]
#[command(name = "readalong", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of ~/.config/readalong/config.toml
    #[arg(long, env = "READALONG_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the speakable buffer and its tokens
    Segment {
        /// HTML file to read
        file: PathBuf,
        /// CSS selector of the content root
        #[arg(short, long)]
        selector: Option<String>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Read a file aloud, highlighting words in the terminal
    Read {
        /// HTML file to read
        file: PathBuf,
        /// CSS selector of the content root
        #[arg(short, long)]
        selector: Option<String>,
        /// Voice identifier (see `readalong voices`)
        #[arg(long)]
        voice: Option<String>,
        /// Speaking rate, 0.5 to 2.0
        #[arg(long)]
        rate: Option<f64>,
        /// Synthesis service root
        #[arg(long)]
        api_url: Option<String>,
        /// Wrap width for the highlighted text
        #[arg(long, default_value = "80")]
        width: usize,
        /// Follow the timings without playing sound
        #[arg(long)]
        silent: bool,
    },
    /// List known voices
    Voices,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,readalong=info",
        1 => "info,readalong=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Segment {
            file,
            selector,
            json,
        } => {
            if let Some(selector) = selector {
                config.content.selector = selector;
            }
            segment(&config, &file, json)
        }
        Command::Read {
            file,
            selector,
            voice,
            rate,
            api_url,
            width,
            silent,
        } => {
            if let Some(selector) = selector {
                config.content.selector = selector;
            }
            if let Some(voice) = voice {
                config.synthesis.voice = voice;
            }
            if let Some(rate) = rate {
                config.synthesis.rate = clamp_rate(rate);
            }
            if let Some(api_url) = api_url {
                config.synthesis.api_url = api_url;
            }
            config.validate()?;
            read(&config, &file, width, silent).await
        }
        Command::Voices => {
            for voice in VOICES {
                let marker = if voice.id == DEFAULT_VOICE { "*" } else { " " };
                println!("{marker} {:<22} {}", voice.id, voice.name);
            }
            Ok(())
        }
    }
}

fn load_tree(config: &Config, file: &Path) -> anyhow::Result<ContentTree> {
    let html = std::fs::read_to_string(file)?;
    Ok(ContentTree::from_html(&html, &config.content.selector)?)
}

#[derive(Serialize)]
struct SegmentReport<'a> {
    buffer: &'a str,
    tokens: &'a [Token],
    pauses: &'a [Pause],
}

fn segment(config: &Config, file: &Path, json: bool) -> anyhow::Result<()> {
    let mut tree = load_tree(config, file)?;
    let segmentation = config.segmenter().segment(&mut tree);

    if json {
        let report = SegmentReport {
            buffer: segmentation.buffer(),
            tokens: segmentation.tokens(),
            pauses: segmentation.pauses(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", segmentation.buffer());
    println!("---");
    println!("{:>5} {:>6} {:>4} {:>7}  word", "id", "offset", "len", "node");
    for token in segmentation.tokens() {
        println!(
            "{:>5} {:>6} {:>4} {:>7}  {}",
            token.id.0,
            token.start,
            token.len,
            token.element.to_string(),
            token.display
        );
    }
    println!(
        "{} tokens, {} pauses, {} chars",
        segmentation.token_count(),
        segmentation.pauses().len(),
        segmentation.len()
    );
    Ok(())
}

#[allow(clippy::future_not_send)]
async fn read(config: &Config, file: &Path, width: usize, silent: bool) -> anyhow::Result<()> {
    let tree = load_tree(config, file)?;

    #[cfg(feature = "speaker")]
    if !silent {
        return narrate(config, tree, readalong::voice::SpeakerClock::new(), width).await;
    }
    #[cfg(not(feature = "speaker"))]
    if !silent {
        tracing::info!("built without the speaker feature, following timings silently");
    }

    narrate(config, tree, playback::WallClock::new(), width).await
}

#[allow(clippy::future_not_send)]
async fn narrate<C: AudioClock>(
    config: &Config,
    tree: ContentTree,
    clock: C,
    width: usize,
) -> anyhow::Result<()> {
    let synthesizer =
        HttpSynthesizer::new(&config.synthesis.api_url, config.synthesis.timeout)?;
    let narrator = config.narrator(tree, clock);
    let surface = TerminalSurface::new(std::io::stderr(), width, 24);
    let mut driver = Driver::new(narrator, surface, Arc::new(synthesizer), config.sync.frame_rate)
        .exit_when_idle(true);

    let (commands, receiver) = mpsc::channel(8);
    let _ctrl_c = forward_ctrl_c(commands.clone());
    commands.send(playback::Command::Play).await?;

    driver.run(receiver).await;

    if let Some(error) = driver.narrator_mut().acknowledge_error() {
        return Err(error.into());
    }
    eprintln!("{}", driver.narrator().status_label());
    Ok(())
}
