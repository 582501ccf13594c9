//! Treedigest CLI - turn a directory or file into a text digest for LLMs.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use treedigest::errors::{exit_code, IngestError};
use treedigest::output::format_tree;
use treedigest::query::{
    Limits, Query, DEFAULT_MAX_DEPTH, DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_SIZE,
    DEFAULT_MAX_TOTAL_SIZE,
};
use treedigest::tree::{Node, NodeKind};
use treedigest::{ingest, ingest_tree};

#[derive(Parser)]
#[command(name = "treedigest")]
#[command(about = "Turn a directory or file into a text digest for LLMs")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the full digest (summary, tree and file contents)
    Digest {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output file, or "-" for stdout
        #[arg(short, long, default_value = "digest.txt")]
        output: String,

        /// Branch name shown in the summary
        #[arg(long)]
        branch: Option<String>,

        /// Commit shown in the summary (takes precedence over --branch)
        #[arg(long)]
        commit: Option<String>,

        /// Print the digest as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Display only the directory tree
    Tree {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Directory or file to ingest
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Restrict ingestion to a subdirectory of PATH
    #[arg(long)]
    subpath: Option<String>,

    /// Exclude entries matching a glob pattern (repeatable)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Only include files matching a glob pattern (repeatable)
    #[arg(short, long = "include", value_name = "PATTERN")]
    include: Vec<String>,

    /// Skip files larger than this many bytes
    #[arg(short = 's', long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    max_size: u64,

    /// Maximum directory depth below the root
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Maximum number of files to include
    #[arg(long, default_value_t = DEFAULT_MAX_FILES)]
    max_files: usize,

    /// Maximum total bytes of included files
    #[arg(long, default_value_t = DEFAULT_MAX_TOTAL_SIZE)]
    max_total_size: u64,

    /// Do not apply the built-in exclude patterns
    #[arg(long)]
    no_default_excludes: bool,
}

impl FilterArgs {
    fn query(&self, branch: Option<String>, commit: Option<String>) -> Result<Query, IngestError> {
        let mut builder = Query::builder(&self.path)
            .exclude(&self.exclude)
            .include(&self.include)
            .default_excludes(!self.no_default_excludes)
            .max_file_size(self.max_size)
            .limits(Limits {
                max_depth: self.max_depth,
                max_files: self.max_files,
                max_total_size: self.max_total_size,
            });
        if let Some(subpath) = &self.subpath {
            builder = builder.subpath(subpath);
        }
        if let Some(branch) = branch {
            builder = builder.branch(branch);
        }
        if let Some(commit) = commit {
            builder = builder.commit(commit);
        }
        Ok(builder.build()?)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let json_output = json_flag(&cli.command);

    let result = match cli.command {
        Commands::Digest {
            filters,
            output,
            branch,
            commit,
            json,
        } => run_digest(&filters, &output, branch, commit, json),
        Commands::Tree { filters, json } => run_tree(&filters, json),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "treedigest", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        if json_output {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }

            let payload = ErrorOutput {
                error: e.to_string(),
            };

            let json = serde_json::to_string(&payload)
                .unwrap_or_else(|_| "{\"error\":\"serialization failed\"}".to_string());
            eprintln!("{json}");
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(exit_code(&e));
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "treedigest=debug" } else { "treedigest=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn json_flag(cmd: &Commands) -> bool {
    match cmd {
        Commands::Digest { json, .. } => *json,
        Commands::Tree { json, .. } => *json,
        Commands::Completions { .. } => false,
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, IngestError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| IngestError::Io(std::io::Error::other(e.to_string())))
}

// --- Digest command ---

fn run_digest(
    filters: &FilterArgs,
    output: &str,
    branch: Option<String>,
    commit: Option<String>,
    json: bool,
) -> Result<(), IngestError> {
    let query = filters.query(branch, commit)?;
    let digest = ingest(&query)?;

    if json {
        #[derive(Serialize)]
        struct Output<'a> {
            #[serde(flatten)]
            digest: &'a treedigest::Digest,
            estimated_tokens: usize,
        }
        let payload = Output {
            digest: &digest,
            estimated_tokens: digest.estimated_tokens(),
        };
        println!("{}", to_json(&payload)?);
        return Ok(());
    }

    if output == "-" {
        print!("{}", digest.to_text());
        return Ok(());
    }

    let target = Path::new(output);
    fs::write(target, digest.to_text())?;
    println!("{}", digest.summary);
    println!("Output written to: {}", target.display());
    Ok(())
}

// --- Tree command ---

fn run_tree(filters: &FilterArgs, json: bool) -> Result<(), IngestError> {
    let query = filters.query(None, None)?;
    let tree = ingest_tree(&query, &query.root_path())?;

    if json {
        println!("{}", to_json(&tree_to_json(&tree))?);
    } else {
        print!("{}", format_tree(&tree));
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonTreeNode {
    name: String,
    path: String,
    kind: &'static str,
    size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<JsonTreeNode>,
}

fn tree_to_json(node: &Node) -> JsonTreeNode {
    let (kind, file_count) = match &node.kind {
        NodeKind::Directory => ("directory", Some(node.file_count)),
        NodeKind::File { .. } => ("file", None),
    };

    JsonTreeNode {
        name: node.name.clone(),
        path: node.display_path(),
        kind,
        size: node.size,
        file_count,
        children: node.children().iter().map(tree_to_json).collect(),
    }
}
