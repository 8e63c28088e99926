use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};

use flowroll::config::{EngineConfig, GatewayConfig};
use flowroll::gateway::OpenAiGateway;
use flowroll::media::Ffmpeg;
use flowroll::observability::{LogFormat, init_logging};
use flowroll::pivot::chart_examples;
use flowroll::prompt::Ruleset;
use flowroll::session::{CounterOutcome, MatchReview, NOT_IN_CHART_MESSAGE, NextMove};
use flowroll::{FlowEngine, FlowError, FlowSession};

#[derive(Parser)]
#[command(name = "flowroll", about = "Generate and navigate grappling technique flow charts")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Raise log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Command {
    /// Normalise model output into a canonical Mermaid chart
    Sanitize {
        /// Input file (reads from stdin if not provided)
        file: Option<PathBuf>,
        /// Emit a standalone HTML page instead of Mermaid text
        #[arg(long)]
        html: bool,
        #[arg(long, default_value = "Jiu-Jitsu Flow Chart")]
        title: String,
    },
    /// Find the node or transition a move refers to
    Resolve {
        query: String,
        /// Chart file (reads from stdin if not provided)
        file: Option<PathBuf>,
    },
    /// Split a strategy text into points
    Format { file: Option<PathBuf> },
    /// Generate a fresh chart around a focus position
    Generate {
        #[arg(default_value = "both top and bottom positions")]
        focus: String,
        #[command(flatten)]
        athlete: AthleteArgs,
        #[command(flatten)]
        gateway: GatewayArgs,
    },
    /// Continue a chart from the move you pick
    Next {
        query: String,
        /// Current chart (reads from stdin if not provided)
        file: Option<PathBuf>,
        #[command(flatten)]
        athlete: AthleteArgs,
        #[command(flatten)]
        gateway: GatewayArgs,
    },
    /// Counter an opponent's chart or written game plan
    Counter {
        file: Option<PathBuf>,
        #[command(flatten)]
        athlete: AthleteArgs,
        #[command(flatten)]
        gateway: GatewayArgs,
    },
    /// Estimate an athlete's build from images
    Attributes {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[arg(long, default_value = "both")]
        subject: String,
        #[command(flatten)]
        gateway: GatewayArgs,
    },
    /// Suggest next steps for the position in an image
    Recommend {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[arg(long, default_value = "both")]
        subject: String,
        #[arg(long, default_value = "")]
        keywords: String,
        #[command(flatten)]
        athlete: AthleteArgs,
        #[command(flatten)]
        gateway: GatewayArgs,
    },
    /// Review a match video
    Analyse {
        video: PathBuf,
        #[arg(long, default_value = "both")]
        subject: String,
        #[arg(long, default_value = "")]
        keywords: String,
        /// Answer in the voice of this coach
        #[arg(long)]
        persona: Option<String>,
        /// Start of the clip to review, in seconds
        #[arg(long, requires = "end")]
        start: Option<f64>,
        /// End of the clip to review, in seconds
        #[arg(long, requires = "start")]
        end: Option<f64>,
        #[arg(long, env = "FLOWROLL_FFMPEG", default_value = "ffmpeg")]
        ffmpeg: PathBuf,
        #[command(flatten)]
        athlete: AthleteArgs,
        #[command(flatten)]
        gateway: GatewayArgs,
    },
    /// List coach personas
    Personas {
        #[arg(default_value = "masters.txt")]
        file: PathBuf,
    },
}

#[derive(Args)]
struct GatewayArgs {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "FLOWROLL_ENDPOINT")]
    endpoint: Option<String>,
    /// Model for text requests; vision requests use FLOWROLL_VISION_MODEL
    #[arg(long, env = "FLOWROLL_MODEL")]
    model: Option<String>,
    /// Completion calls per chart when the reply fails validation
    #[arg(long, env = "FLOWROLL_MAX_ATTEMPTS", default_value_t = 1)]
    max_attempts: u32,
    #[arg(long, env = "FLOWROLL_FRAME_SAMPLES", default_value_t = 3)]
    frame_samples: usize,
}

#[derive(Args)]
struct AthleteArgs {
    /// Free-text description of the athlete's build
    #[arg(long, default_value = "")]
    athlete: String,
    #[arg(long, value_enum, default_value_t = Ruleset::Mma)]
    ruleset: Ruleset,
    /// Favourite techniques or ideas to build around
    #[arg(long, default_value = "")]
    ideas: String,
}

impl AthleteArgs {
    fn session(&self) -> FlowSession {
        FlowSession::new()
            .with_athlete(&self.athlete)
            .with_ruleset(self.ruleset)
            .with_ideas(&self.ideas)
    }
}

impl GatewayArgs {
    fn engine(&self) -> FlowEngine<OpenAiGateway> {
        let mut gateway = OpenAiGateway::new(&GatewayConfig::from_env());
        if let Some(key) = &self.api_key {
            gateway = gateway.with_api_key(key);
        }
        if let Some(endpoint) = &self.endpoint {
            gateway = gateway.with_endpoint(endpoint);
        }
        if let Some(model) = &self.model {
            gateway = gateway.with_model(model);
        }
        let engine_config = EngineConfig {
            max_attempts: self.max_attempts,
            frame_samples: self.frame_samples,
        };
        FlowEngine::new(gateway, engine_config)
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.log_format, cli.verbose) {
        eprintln!("ERROR: failed to initialise logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(cli.command) {
        eprintln!("ERROR: {e}");
        if e.downcast_ref::<FlowError>().is_some_and(FlowError::is_retryable) {
            eprintln!("The generated chart was rejected; running the command again usually helps.");
        }
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Sanitize { file, html, title } => {
            let input = read_input(file.as_deref())?;
            if html {
                print!("{}", flowroll::html::render_page(&input, &title));
            } else {
                println!("{}", flowroll::sanitize_graph(&input));
            }
        }
        Command::Resolve { query, file } => {
            let chart = read_input(file.as_deref())?;
            match flowroll::resolve_pivot(&chart, &query) {
                Some(found) => {
                    println!("{}", found.label);
                    for label in &found.context_labels {
                        println!("  - {label}");
                    }
                }
                None => print_miss(&chart),
            }
        }
        Command::Format { file } => {
            let input = read_input(file.as_deref())?;
            for point in flowroll::format_strategy(&input) {
                println!("- {point}");
            }
        }
        Command::Generate {
            focus,
            athlete,
            gateway,
        } => {
            let mut session = athlete.session();
            let chart = gateway.engine().generate_graph(&mut session, &focus)?;
            println!("{chart}");
        }
        Command::Next {
            query,
            file,
            athlete,
            gateway,
        } => {
            let mut session = athlete.session().with_chart(&read_input(file.as_deref())?);
            match gateway.engine().pick_next_move(&mut session, &query)? {
                NextMove::Advanced { .. } => println!("{}", session.chart().unwrap_or_default()),
                NextMove::NotInChart => print_miss(session.chart().unwrap_or_default()),
            }
        }
        Command::Counter {
            file,
            athlete,
            gateway,
        } => {
            let opponent = read_input(file.as_deref())?;
            match gateway.engine().counter(&athlete.session(), &opponent)? {
                CounterOutcome::Graph(chart) => println!("{chart}"),
                CounterOutcome::Strategy(points) => {
                    for (i, point) in points.iter().enumerate() {
                        println!("{}. {point}", i + 1);
                    }
                }
            }
        }
        Command::Attributes {
            images,
            subject,
            gateway,
        } => {
            let images = read_images(&images)?;
            let mut session = FlowSession::new();
            let profile = gateway
                .engine()
                .estimate_attributes(&mut session, &subject, &images)?;
            println!("{profile}");
        }
        Command::Recommend {
            images,
            subject,
            keywords,
            athlete,
            gateway,
        } => {
            let images = read_images(&images)?;
            let reply = gateway
                .engine()
                .recommend(&athlete.session(), &subject, &keywords, &images)?;
            println!("{reply}");
        }
        Command::Analyse {
            video,
            subject,
            keywords,
            persona,
            start,
            end,
            ffmpeg,
            athlete,
            gateway,
        } => {
            let review = MatchReview {
                subject: &subject,
                keywords: &keywords,
                persona: persona.as_deref(),
                clip: start.zip(end),
            };
            let reply = gateway.engine().analyse_match(
                &Ffmpeg::new(ffmpeg),
                &athlete.session(),
                &video,
                &review,
            )?;
            println!("{reply}");
        }
        Command::Personas { file } => {
            for name in flowroll::personas::load_personas(&file) {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn print_miss(chart: &str) {
    println!("{NOT_IN_CHART_MESSAGE}");
    let examples = chart_examples(chart, "", 3);
    if !examples.is_empty() {
        let quoted: Vec<String> = examples.iter().map(|e| format!("\"{e}\"")).collect();
        println!("Examples from current chart: {}", quoted.join(", "));
    }
}

fn read_input(file: Option<&Path>) -> Result<String, String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            Ok(buf)
        }
    }
}

fn read_images(paths: &[PathBuf]) -> Result<Vec<Vec<u8>>, String> {
    paths
        .iter()
        .map(|path| {
            std::fs::read(path).map_err(|e| format!("failed to read {}: {e}", path.display()))
        })
        .collect()
}
