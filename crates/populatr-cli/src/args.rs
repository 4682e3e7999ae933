use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "populatr",
    about = "Fill a relational database with referentially consistent synthetic rows",
    version,
    after_help = "Examples:\n  populatr populate --db postgres://localhost/myapp --rows 50 --seed 42\n  populatr populate --rows 10              # DATABASE_URL from env, .env or populatr.toml\n  populatr introspect --db sqlite://app.db --format json\n  populatr graph --db mysql://root@localhost/shop --format dot"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Introspect, order, generate and insert rows into every table
    Populate(PopulateArgs),

    /// Show tables in insertion order with their references
    Introspect(IntrospectArgs),

    /// Visualize table dependency graph
    Graph(GraphArgs),
}

#[derive(Parser, Debug)]
pub struct PopulateArgs {
    /// Database connection URL (postgres://, mysql://, sqlite://)
    /// Falls back to DATABASE_URL env var, .env file or populatr.toml
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,

    /// Number of rows to generate per table
    #[arg(long)]
    pub rows: Option<usize>,

    /// Random seed for deterministic generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Give up after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Tries per row, including the first
    #[arg(long)]
    pub retries: Option<u32>,

    /// Schema name to introspect (PostgreSQL only)
    #[arg(long)]
    pub schema: Option<String>,

    /// Insert in best-effort order when tables reference each other in a
    /// cycle. Without this flag a cycle stops the run before any insert.
    #[arg(long)]
    pub allow_cycles: bool,
}

#[derive(Parser, Debug)]
pub struct IntrospectArgs {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,

    /// Schema name to introspect
    #[arg(long)]
    pub schema: Option<String>,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: IntrospectFormat,
}

#[derive(Parser, Debug)]
pub struct GraphArgs {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,

    /// Schema name
    #[arg(long)]
    pub schema: Option<String>,

    /// Graph output format
    #[arg(long, default_value = "mermaid")]
    pub format: GraphFormat,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum IntrospectFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum GraphFormat {
    Mermaid,
    Dot,
}
