use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use brine_sbe::{decode_to_json, encode_from_json, generate_to_dir, layout_to_json, load_ir};
use brine_sbe_compiler::error::SbeError;
use brine_sbe_compiler::{GeneratorConfig, KeywordPolicy, Language};

#[derive(Parser)]
#[command(name = "bsbe")]
#[command(about = "Generate codecs from SBE IR, or encode and decode SBE messages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate codecs for every type and message of an IR document
    Generate {
        /// IR document (JSON)
        #[arg(short, long)]
        ir: PathBuf,

        /// Target language: rust, typescript or python
        #[arg(short, long, default_value = "rust")]
        language: Language,

        /// Output directory; units land in a subdirectory per package segment
        #[arg(short, long, default_value = "generated")]
        output: PathBuf,

        /// Package to generate into instead of the IR's package name
        #[arg(short, long)]
        package: Option<String>,

        /// Appended to identifiers that collide with a reserved word. Without
        /// it a collision aborts generation.
        #[arg(long, env = "SBE_KEYWORD_APPEND_TOKEN")]
        keyword_append_token: Option<String>,
    },

    /// Decode an SBE message (header included) to JSON, printed to stdout
    Decode {
        /// IR document (JSON)
        #[arg(short, long)]
        ir: PathBuf,

        /// Binary message file
        #[arg(short = 'f', long)]
        input: PathBuf,
    },

    /// Encode a JSON message body to an SBE message with its header
    Encode {
        /// IR document (JSON)
        #[arg(short, long)]
        ir: PathBuf,

        /// Name of the message to encode
        #[arg(short, long)]
        message: String,

        /// JSON body
        #[arg(short = 'f', long)]
        input: PathBuf,

        /// Output file (defaults to the input with a `.sbe` extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the resolved offsets and widths of every type and message
    Layout {
        /// IR document (JSON)
        #[arg(short, long)]
        ir: PathBuf,
    },
}

fn main() -> Result<(), SbeError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            ir,
            language,
            output,
            package,
            keyword_append_token,
        } => {
            let schema = load_ir(&ir)?;
            let mut config = GeneratorConfig::new(language);
            if let Some(token) = keyword_append_token {
                config = config.with_keyword_policy(KeywordPolicy::append(token));
            }
            if let Some(package) = package {
                config = config.with_package(package);
            }
            let written = generate_to_dir(&schema, &config, &output)?;
            println!("Generated {} {} files in {}", written.len(), language, output.display());
            Ok(())
        }

        Commands::Decode { ir, input } => {
            let schema = load_ir(&ir)?;
            let data = fs::read(&input)?;
            let json = decode_to_json(&schema, &data)?;
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(())
        }

        Commands::Encode {
            ir,
            message,
            input,
            output,
        } => {
            let schema = load_ir(&ir)?;
            let body: serde_json::Value = serde_json::from_str(&fs::read_to_string(&input)?)?;
            let bytes = encode_from_json(&schema, &message, &body)?;
            let out_path = output.unwrap_or_else(|| input.with_extension("sbe"));
            fs::write(&out_path, &bytes)?;
            info!(message = %message, bytes = bytes.len(), "encoded message");
            println!("Encoded {} → {}", input.display(), out_path.display());
            Ok(())
        }

        Commands::Layout { ir } => {
            let schema = load_ir(&ir)?;
            println!("{}", serde_json::to_string_pretty(&layout_to_json(&schema)?)?);
            Ok(())
        }
    }
}
