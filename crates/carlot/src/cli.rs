//! Clap derive structures for the `carlot` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use carlot_core::{CarStatus, InquiryStatus, RequestStatus};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// carlot -- browse and manage the car marketplace from a terminal
#[derive(Debug, Parser)]
#[command(
    name = "carlot",
    version,
    about = "Browse and manage the carlot car marketplace",
    long_about = "Command-line client for the carlot marketplace.\n\n\
        Buyers post requests and inquiries; dealers list and manage vehicles.\n\
        Sign in once with `carlot login`; the session is kept per profile.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config profile to use
    #[arg(long, short = 'p', env = "CARLOT_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base URL (overrides profile)
    #[arg(long, short = 'u', env = "CARLOT_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Directory holding the persisted session (overrides profile)
    #[arg(long, env = "CARLOT_SESSION_DIR", global = true)]
    pub session_dir: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CARLOT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "CARLOT_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CARLOT_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one id per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session for this profile
    Login(LoginArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Update your own profile
    Profile(ProfileArgs),

    /// Browse and manage car listings
    #[command(alias = "car", alias = "c")]
    Cars(CarsArgs),

    /// Buyer inquiries to dealers
    #[command(alias = "inq", alias = "i")]
    Inquiries(InquiriesArgs),

    /// Buyer "looking for" requests
    #[command(alias = "req", alias = "r")]
    Requests(RequestsArgs),

    /// Follow a listing live, refreshing on an interval
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Args)]
pub struct LoginArgs {
    /// Account email
    #[arg(long, short = 'e', env = "CARLOT_EMAIL")]
    pub email: Option<String>,

    /// Account password (prompted when omitted)
    #[arg(long, env = "CARLOT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl std::fmt::Debug for LoginArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginArgs")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Change name or phone
    Update {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
}

// ── Shared List Arguments ────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PageArgs {
    /// Page number (1-based)
    #[arg(long)]
    pub page: Option<u32>,

    /// Max results per page
    #[arg(long, short = 'l')]
    pub limit: Option<u32>,
}

// ── Cars ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CarsArgs {
    #[command(subcommand)]
    pub command: CarsCommand,
}

#[derive(Debug, Args)]
pub struct CarFilterArgs {
    /// Filter by make (case-insensitive)
    #[arg(long)]
    pub make: Option<String>,

    /// Filter by model
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub year_min: Option<u16>,

    #[arg(long)]
    pub year_max: Option<u16>,

    #[arg(long)]
    pub price_max: Option<f64>,

    /// active, sold or deleted
    #[arg(long)]
    pub status: Option<CarStatus>,

    /// Only this dealer's cars
    #[arg(long)]
    pub dealer: Option<String>,

    /// Server-side sort key, e.g. `price` or `-createdAt`
    #[arg(long)]
    pub sort: Option<String>,

    #[command(flatten)]
    pub paging: PageArgs,
}

#[derive(Debug, Subcommand)]
pub enum CarsCommand {
    /// List cars
    #[command(alias = "ls")]
    List(CarFilterArgs),

    /// Show one car
    Get { id: String },

    /// List a new car (dealers)
    Create {
        #[arg(long)]
        make: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        year: u16,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value = "0")]
        mileage: u32,
        #[arg(long)]
        description: Option<String>,
    },

    /// Edit price, mileage or description (dealers)
    Update {
        id: String,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        mileage: Option<u32>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Mark a car as sold (dealers)
    Sold { id: String },

    /// Set whether a car is available (dealers)
    Availability {
        id: String,
        /// true or false
        #[arg(action = clap::ArgAction::Set)]
        available: bool,
    },

    /// Delete a listing (dealers)
    #[command(alias = "rm")]
    Delete { id: String },

    /// Restore a deleted listing (dealers)
    Restore { id: String },
}

// ── Inquiries ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InquiriesArgs {
    #[command(subcommand)]
    pub command: InquiriesCommand,
}

#[derive(Debug, Subcommand)]
pub enum InquiriesCommand {
    /// List your inquiries
    #[command(alias = "ls")]
    List {
        /// new, responded or closed
        #[arg(long)]
        status: Option<InquiryStatus>,
        /// Only inquiries about this car
        #[arg(long)]
        car: Option<String>,
        #[command(flatten)]
        paging: PageArgs,
    },

    /// Ask a dealer about a car (buyers)
    Send {
        #[arg(long)]
        dealer: String,
        #[arg(long)]
        car: Option<String>,
        #[arg(long, short = 'm')]
        message: String,
    },

    /// Mark an inquiry as responded (dealers)
    Respond { id: String },

    /// Close an inquiry
    Close { id: String },
}

// ── Requests ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RequestsArgs {
    #[command(subcommand)]
    pub command: RequestsCommand,
}

#[derive(Debug, Subcommand)]
pub enum RequestsCommand {
    /// List car requests
    #[command(alias = "ls")]
    List {
        /// active or closed
        #[arg(long)]
        status: Option<RequestStatus>,
        #[arg(long)]
        make: Option<String>,
        #[command(flatten)]
        paging: PageArgs,
    },

    /// Post what you are looking for (buyers)
    Create {
        #[arg(long)]
        make: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        year_min: Option<u16>,
        #[arg(long)]
        year_max: Option<u16>,
        #[arg(long)]
        price_max: Option<f64>,
        #[arg(long, short = 'm')]
        requirements: String,
    },

    /// Close a request (buyers)
    Close { id: String },

    /// Reopen a closed request (buyers)
    Reopen { id: String },
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// What to follow
    #[arg(value_enum)]
    pub target: WatchTarget,

    /// Filter cars or requests by make
    #[arg(long)]
    pub make: Option<String>,

    /// Seconds between refreshes
    #[arg(long, short = 'n', default_value = "10")]
    pub interval: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WatchTarget {
    Cars,
    Inquiries,
    Requests,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,
    /// Show the merged configuration
    Show,
    /// Set a key on the active profile
    Set {
        /// api_url, insecure, timeout, ca_cert, session_dir, render_while_checking
        key: String,
        value: String,
    },
    /// Print the config file location
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
