mod cli;
mod server;
mod tools;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use aku::aku::{KnowledgeType, RelationKind, Volatility};
use aku::substrate::Direction;

#[derive(Parser)]
#[command(name = "aku", version, about = "Content-addressed knowledge substrate")]
struct Cli {
    /// Store root. Falls back to $AKU_ROOT, then ~/.aku/knowledge.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new substrate
    Init,
    /// Ingest a file (or stdin) as a new atom and print its hash
    Ingest {
        /// File to ingest; reads stdin when omitted
        file: Option<PathBuf>,
        #[arg(short, long)]
        domain: String,
        /// Knowledge type (fact, concept, relationship, procedure, insight, question, artifact)
        #[arg(short = 't', long = "type")]
        knowledge_type: Option<KnowledgeType>,
        /// Comma-separated tags
        #[arg(short = 'T', long)]
        tags: Option<String>,
        #[arg(short, long)]
        confidence: Option<f64>,
        /// Volatility (stable, evolving, ephemeral)
        #[arg(long)]
        volatility: Option<Volatility>,
    },
    /// Print a full atom by hash
    Get { hash: String },
    /// List atoms matching filters
    List {
        /// Domain prefix filter
        #[arg(short, long)]
        domain: Option<String>,
        #[arg(short = 't', long = "type")]
        knowledge_type: Option<KnowledgeType>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Record a link between two atoms
    Link {
        from: String,
        to: String,
        /// Relation kind (relates_to, derived_from, supersedes, ...)
        relation: RelationKind,
    },
    /// Show an atom's neighbors across embedded and external links
    Neighbors {
        hash: String,
        /// Edge direction (out, in, both)
        #[arg(short = 'D', long, default_value = "both")]
        direction: Direction,
    },
    /// Ranked full-text search
    Search {
        query: String,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Recently ingested atoms, newest first
    Recent {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        /// Inclusive lower creation-time bound (ISO 8601)
        #[arg(long)]
        since: Option<String>,
        /// Inclusive upper creation-time bound (ISO 8601)
        #[arg(long)]
        until: Option<String>,
    },
    /// Breadth-first graph exploration from an atom
    Traverse {
        start: String,
        #[arg(long, default_value_t = 2)]
        max_depth: usize,
        #[arg(short = 'D', long, default_value = "both")]
        direction: Direction,
    },
    /// Shortest path between two atoms
    Path {
        from: String,
        to: String,
        #[arg(long, default_value_t = 5)]
        max_depth: usize,
    },
    /// Store statistics
    Stats,
    /// Full integrity audit
    Verify,
    /// Rebuild derived indexes from the atom store
    Rebuild,
    /// Embed atom bodies into the vector index
    Embed {
        hash: Option<String>,
        /// Embed every atom in the store
        #[arg(long)]
        all: bool,
    },
    /// Nearest neighbors of an atom by embedding similarity
    Similar {
        hash: String,
        #[arg(short = 'k', long = "count", default_value_t = 10)]
        k: usize,
    },
    /// Start the MCP server
    Serve {
        /// Bind address for the Streamable HTTP transport; stdio when omitted
        #[arg(long)]
        http: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log to stderr so stdout stays clean for MCP JSON-RPC and piped output.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let root = aku::config::resolve_root(cli.root);

    match cli.command {
        Command::Init => cli::init::init(&root)?,
        Command::Ingest {
            file,
            domain,
            knowledge_type,
            tags,
            confidence,
            volatility,
        } => cli::ingest::ingest(&root, file, domain, knowledge_type, tags, confidence, volatility)?,
        Command::Get { hash } => cli::get::get(&root, &hash)?,
        Command::List {
            domain,
            knowledge_type,
            tag,
            limit,
        } => cli::list::list(&root, domain, knowledge_type, tag, limit)?,
        Command::Link { from, to, relation } => cli::link::link(&root, &from, &to, relation)?,
        Command::Neighbors { hash, direction } => {
            cli::link::neighbors(&root, &hash, direction)?
        }
        Command::Search { query, limit } => cli::search::search(&root, &query, limit)?,
        Command::Recent { limit, since, until } => {
            cli::recent::recent(&root, limit, since, until)?
        }
        Command::Traverse {
            start,
            max_depth,
            direction,
        } => cli::graph::traverse(&root, &start, max_depth, direction)?,
        Command::Path {
            from,
            to,
            max_depth,
        } => cli::graph::path(&root, &from, &to, max_depth)?,
        Command::Stats => cli::stats::stats(&root)?,
        Command::Verify => cli::verify::verify(&root)?,
        Command::Rebuild => cli::rebuild::rebuild(&root)?,
        Command::Embed { hash, all } => cli::vectors::embed(&root, hash, all)?,
        Command::Similar { hash, k } => cli::vectors::similar(&root, &hash, k)?,
        Command::Serve { http } => match http {
            Some(addr) => server::serve_sse(&root, &addr).await?,
            None => server::serve_stdio(&root).await?,
        },
    }

    Ok(())
}
