use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use log::{debug, info};

use provschema_core::config::{self, CONFIG_FILE_NAME, ProvschemaConfig};
use provschema_core::parse::{self, spec::OpenApiSpec};
use provschema_core::{Extraction, extract};

#[derive(Parser)]
#[command(
    name = "provschema",
    about = "Infer a provider schema from an OpenAPI 3.x document",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the provider schema and metadata from an OpenAPI spec
    Generate {
        /// Path to the OpenAPI spec file (YAML or JSON)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Where to write the provider schema; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Where to write the provider metadata
        #[arg(long)]
        metadata_output: Option<PathBuf>,

        /// Package name, the first segment of every token
        #[arg(short, long)]
        package: Option<String>,
    },

    /// Check that a spec parses and extracts cleanly
    Validate {
        /// Path to the OpenAPI spec file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Summarize the resources, functions and types a spec yields
    Inspect {
        /// Path to the OpenAPI spec file
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: InspectFormat,
    },

    /// Initialize a new provschema configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, ValueEnum)]
enum InspectFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            output,
            metadata_output,
            package,
        } => cmd_generate(input, output, metadata_output, package),

        Commands::Validate { input } => cmd_validate(input),

        Commands::Inspect { input, format } => cmd_inspect(input, format),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "provschema", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Try to load the project config file from the current directory.
fn try_load_config() -> Result<Option<ProvschemaConfig>> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    config::load_config(&config_path).map_err(|e| anyhow::anyhow!(e))
}

fn load_spec(path: &Path) -> Result<OpenApiSpec> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let format = parse::Format::from_path(path);
    debug!("parsing {} as {format:?}", path.display());

    parse::from_str(&content, format).with_context(|| format!("failed to parse {}", path.display()))
}

fn run_extraction(spec: &OpenApiSpec, cfg: &ProvschemaConfig) -> Result<Extraction> {
    let options = cfg
        .extract_options(&spec.info.title)
        .context("invalid exclusion configuration")?;
    info!(
        "extracting package {} with {} exclusion rule(s)",
        options.package_name,
        options.exclusions.len()
    );
    let extraction = extract(spec, &options)
        .with_context(|| format!("failed to extract provider schema from {}", spec.info.title))?;
    Ok(extraction)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json + "\n").with_context(|| format!("failed to write {}", path.display()))?;
    eprintln!("  wrote {}", path.display());
    Ok(())
}

fn cmd_generate(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    metadata_output: Option<PathBuf>,
    package: Option<String>,
) -> Result<()> {
    let mut cfg = try_load_config()?.unwrap_or_default();
    if package.is_some() {
        cfg.package_name = package;
    }

    let input = input
        .or_else(|| cfg.input.as_ref().map(PathBuf::from))
        .context("no input spec given; pass --input or set `input` in the config")?;
    let output = output.or_else(|| cfg.output.as_ref().map(PathBuf::from));
    let metadata_output = metadata_output.or_else(|| cfg.metadata_output.as_ref().map(PathBuf::from));

    let spec = load_spec(&input)?;
    let extraction = run_extraction(&spec, &cfg)?;

    eprintln!(
        "Extracted {} resources, {} functions and {} types from {}",
        extraction.schema.resources.len(),
        extraction.schema.functions.len(),
        extraction.schema.types.len(),
        input.display()
    );

    match output {
        Some(path) => write_json(&path, &extraction.schema)?,
        None => println!("{}", serde_json::to_string_pretty(&extraction.schema)?),
    }
    if let Some(path) = metadata_output {
        write_json(&path, &extraction.metadata)?;
    }
    Ok(())
}

fn cmd_validate(input: PathBuf) -> Result<()> {
    let parsed = load_spec(&input)?;

    eprintln!(
        "Valid OpenAPI {} spec: {}",
        parsed.openapi, parsed.info.title
    );
    eprintln!("  Version: {}", parsed.info.version);
    eprintln!("  Paths: {}", parsed.paths.len());

    if let Some(ref components) = parsed.components {
        eprintln!("  Schemas: {}", components.schemas.len());
    }

    let cfg = try_load_config()?.unwrap_or_default();
    let extraction = run_extraction(&parsed, &cfg)?;
    eprintln!("  Resources: {}", extraction.schema.resources.len());
    eprintln!("  Functions: {}", extraction.schema.functions.len());
    eprintln!("  Types: {}", extraction.schema.types.len());

    eprintln!("Validation successful.");
    Ok(())
}

fn cmd_inspect(input: PathBuf, format: InspectFormat) -> Result<()> {
    let cfg = try_load_config()?.unwrap_or_default();
    let spec = load_spec(&input)?;
    let extraction = run_extraction(&spec, &cfg)?;

    let summary = build_inspect_summary(&spec, &extraction);

    match format {
        InspectFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(&summary)?;
            print!("{}", yaml);
        }
        InspectFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn build_inspect_summary(spec: &OpenApiSpec, extraction: &Extraction) -> serde_json::Value {
    let crud_map = &extraction.metadata.crud_map;

    let resources: Vec<serde_json::Value> = extraction
        .schema
        .resources
        .iter()
        .map(|(token, resource)| {
            serde_json::json!({
                "token": token,
                "inputs": resource.input_properties.keys().collect::<Vec<_>>(),
                "outputs": resource.properties.keys().collect::<Vec<_>>(),
                "operations": crud_map.get(token),
                "auto_name": extraction.metadata.auto_name_map.get(token),
            })
        })
        .collect();

    let functions: Vec<serde_json::Value> = extraction
        .schema
        .functions
        .iter()
        .map(|(token, function)| {
            serde_json::json!({
                "token": token,
                "path": crud_map.get(token).and_then(|ops| ops.read.as_ref()),
                "has_return_type": function.return_type.is_some(),
            })
        })
        .collect();

    let types: Vec<serde_json::Value> = extraction
        .schema
        .types
        .iter()
        .map(|(token, spec)| {
            let kind = if spec.as_enum().is_some() { "enum" } else { "object" };
            serde_json::json!({ "token": token, "kind": kind })
        })
        .collect();

    serde_json::json!({
        "info": {
            "title": spec.info.title,
            "version": spec.info.version,
        },
        "package": extraction.schema.name,
        "modules": extraction.metadata.module_namespaces,
        "resources": resources,
        "functions": functions,
        "types": types,
    })
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}
