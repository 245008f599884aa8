use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect AT Protocol repository archives and CIDs")]
pub struct Args {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every record in a repository archive
    Ls {
        /// Path to a .car repository export
        car: PathBuf,
    },
    /// Print every record in a repository archive as JSON lines
    Dump {
        /// Path to a .car repository export
        car: PathBuf,
    },
    /// Compute the CID of a file
    Cid {
        /// File to hash
        file: PathBuf,

        /// Codec recorded in the CID
        #[arg(long, value_enum, default_value_t = Codec::DagCbor)]
        codec: Codec,

        /// Read the file as JSON and hash its canonical DAG-CBOR encoding
        #[arg(long)]
        json: bool,
    },
    /// Show the parts of a CID
    Inspect {
        /// CID string, e.g. bafyrei...
        cid: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    DagCbor,
    Raw,
}

impl Codec {
    pub fn code(self) -> u64 {
        match self {
            Codec::DagCbor => atpack_common::cid::DAG_CBOR,
            Codec::Raw => atpack_common::cid::RAW,
        }
    }
}
