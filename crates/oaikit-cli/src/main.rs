mod render;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use oaikit_auth::Authorizer;
use oaikit_llm::{ReasoningEffort, ResponseEnvelope, ResponseOptions, StreamCallback};
use oaikit_openai::{OpenAI, OpenAIConfig};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oaikit", version, about = "Send requests to the Responses API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a prompt to a model.
    Create(CreateArgs),
    /// Send a request document as-is, read from a file or `-` for stdin.
    Raw {
        file: PathBuf,
        /// Stream the reply; sets `"stream": true` on the document.
        #[arg(long)]
        stream: bool,
    },
    /// Show which request parameters a model accepts.
    Capabilities { model: String },
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long, short)]
    model: String,
    #[arg(long)]
    instructions: Option<String>,
    #[arg(long)]
    temperature: Option<f64>,
    #[arg(long)]
    max_output_tokens: Option<u32>,
    #[arg(long, value_enum)]
    reasoning_effort: Option<Effort>,
    /// Print text as it is generated.
    #[arg(long)]
    stream: bool,
    input: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Effort {
    None,
    Minimal,
    Low,
    Medium,
    High,
}

impl From<Effort> for ReasoningEffort {
    fn from(effort: Effort) -> Self {
        match effort {
            Effort::None => ReasoningEffort::None,
            Effort::Minimal => ReasoningEffort::Minimal,
            Effort::Low => ReasoningEffort::Low,
            Effort::Medium => ReasoningEffort::Medium,
            Effort::High => ReasoningEffort::High,
        }
    }
}

impl CreateArgs {
    fn options(&self) -> ResponseOptions {
        let mut options = ResponseOptions::default();
        if let Some(instructions) = &self.instructions {
            options.instructions(instructions.as_str());
        }
        if let Some(t) = self.temperature {
            options.temperature(t);
        }
        if let Some(n) = self.max_output_tokens {
            options.max_output_tokens(n);
        }
        if let Some(effort) = self.reasoning_effort {
            options.reasoning(ReasoningEffort::from(effort));
        }
        options
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Capabilities { model } => {
            let caps = oaikit_llm::resolve(&model);
            print!("{}", render::capabilities_report(&model, &caps));
            Ok(())
        }
        Command::Create(args) => {
            let client = client()?;
            let stream = args.stream.then(stdout_printer);
            let envelope = client
                .responses()
                .create_async(args.model.as_str(), args.input.as_str(), args.options(), stream)
                .await?;
            finish(&envelope, args.stream)
        }
        Command::Raw { file, stream } => {
            let mut request: Value = serde_json::from_str(&read_source(&file)?)?;
            if stream && let Some(object) = request.as_object_mut() {
                object.insert("stream".into(), Value::Bool(true));
            }
            let client = client()?;
            let envelope = client
                .responses()
                .create_raw_async(request, stream.then(stdout_printer))
                .await?;
            finish(&envelope, stream)
        }
    }
}

fn client() -> Result<OpenAI, Box<dyn std::error::Error>> {
    Ok(OpenAI::new(OpenAIConfig::from_env(), Authorizer::from_env()?))
}

fn stdout_printer() -> StreamCallback {
    render::text_printer(io::stdout())
}

/// Streamed text is already on screen; otherwise print the reply text.
fn finish(envelope: &ResponseEnvelope, streamed: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut out = io::stdout().lock();
    if !streamed {
        write!(out, "{}", envelope.output_text())?;
    }
    writeln!(out)?;
    if let Some(usage) = envelope.usage() {
        tracing::info!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "usage"
        );
    }
    Ok(())
}

fn read_source(path: &Path) -> io::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}
