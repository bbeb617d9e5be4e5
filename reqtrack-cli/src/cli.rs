use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Track expense and operation requests")]
pub struct Cli {
    /// Path to the request data file (overrides REQTRACK_DB and the config file)
    #[clap(long, short = 'f', global = true)]
    pub file: Option<PathBuf>,

    /// Path to the config file (defaults to ~/.reqtrack.yaml)
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Run against an in-memory copy of the data file; nothing is saved
    #[clap(long, global = true)]
    pub dry_run: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a new request
    Submit {
        /// Name of the person requesting the money
        #[clap(long)]
        name: Option<String>,

        /// What the money is for
        #[clap(long)]
        purpose: Option<String>,

        /// Amount requested
        #[clap(long)]
        amount: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// List requests
    List {
        /// Filter by approval status (Pending, Approved, Declined)
        #[clap(long)]
        status: Option<String>,

        /// Filter by finance status (Pending, Issued)
        #[clap(long)]
        finance_status: Option<String>,

        /// Filter by requester name (substring)
        #[clap(long)]
        requester: Option<String>,
    },

    /// Show every column of one request
    Show {
        /// Reference ID (e.g., REQ-001)
        id: String,
    },

    /// Approve or decline a request
    Status {
        /// Reference ID (e.g., REQ-001)
        id: String,

        /// New status (Pending, Approved, Declined)
        status: String,
    },

    /// Record whether the money was issued
    Finance {
        /// Reference ID (e.g., REQ-001)
        id: String,

        /// New finance status (Pending, Issued)
        finance_status: String,

        /// Date the money was issued (YYYY-MM-DD); defaults to today when issuing
        #[clap(long)]
        issue_date: Option<String>,
    },

    /// Record how the issued money was spent
    Liquidate {
        /// Reference ID (e.g., REQ-001)
        id: String,

        /// Amount spent
        #[clap(long)]
        liquidated: String,

        /// Amount handed back
        #[clap(long)]
        returned: String,

        /// Invoice file paths or links
        #[clap(long, default_value = "")]
        invoices: String,
    },

    /// Edit columns of a request
    Edit {
        /// Reference ID (e.g., REQ-001)
        id: String,

        /// Column assignment, e.g. --set "Request Purpose=Conference travel"
        #[clap(long = "set", value_name = "COLUMN=VALUE")]
        set: Vec<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// Show totals per status
    Summary,

    /// Export all requests to JSON
    Export {
        /// Output file
        #[clap(long, short = 'o', default_value = "requests.json")]
        output: PathBuf,
    },

    /// Print the path to the data file
    Path,
}
