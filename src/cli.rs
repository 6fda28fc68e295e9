use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::ContractField;

/// selfserve - drive the service selection and quote wizard from the shell
#[derive(Parser)]
#[command(name = "selfserve")]
#[command(about = "Pick services and packages, fill in contract details, get a quote")]
#[command(version)]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Catalog feed to load (overrides the config file)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Directory holding the persisted cart (overrides the config file)
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current step, cart and totals
    Status {
        /// Print the full view as JSON
        #[arg(long)]
        json: bool,
    },
    /// List services and packages from the catalog
    Catalog,
    /// Submit the form for a step
    Submit {
        /// Step number the form belongs to
        step: u8,
        /// Submitted fields as key=value (a bare key means "on")
        fields: Vec<String>,
    },
    /// Choose a package for a service
    Choose {
        service: String,
        package: String,
    },
    /// Move to the next selected service
    NextService,
    /// Move back to the previous selected service
    PreviousService,
    /// Go back to an earlier step
    Goto {
        step: u8,
    },
    /// Reopen package selection for a service that already has a package
    Jump {
        service: String,
    },
    /// Set a details field
    Set {
        /// One of: submitter-name, submitter-email, contract-name, address,
        /// address2, company, company-legal-name
        field: ContractField,
        value: String,
    },
    /// Whether the submitter also signs the contract
    Signer {
        #[arg(
            action = clap::ArgAction::Set,
            value_parser = clap::builder::BoolishValueParser::new()
        )]
        also_signer: bool,
    },
    /// Discard the cart and start over
    Reset,
    /// Write a default configuration file
    InitConfig {
        path: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

/// Split `key=value` arguments; a bare `key` becomes `key=on`.
pub fn parse_field(raw: &str) -> (String, String) {
    match raw.split_once('=') {
        Some((key, value)) => (key.to_string(), value.to_string()),
        None => (raw.to_string(), "on".to_string()),
    }
}
