use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use flipper_core::ItemState;

#[derive(Parser)]
#[command(name = "flipper")]
#[command(version, about = "Operator console for the media transcoding service")]
pub struct Cli {
    /// Path to the RON config file (default: ./flipper.ron)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the items of a batch
    Batch {
        batch_id: Uuid,

        /// Only items in this state (pending, active, completed, failed, aborted, notqueued)
        #[arg(long)]
        state: Option<ItemState>,

        /// Pages to read before printing
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// Follow a batch's counters until nothing is pending or active
    Counters { batch_id: Uuid },

    /// Follow a job until it finishes
    Watch {
        job_id: Uuid,

        /// Template the job was created from, to label its steps
        #[arg(long)]
        template: Option<Uuid>,
    },

    /// Upload one file and wait for its format analysis
    Quick {
        #[arg(required = true)]
        file: PathBuf,

        /// Job template to run on the file
        #[arg(short, long)]
        template: Uuid,
    },

    /// Follow the job runner's queue sizes and the job totals per status
    Dashboard,

    /// List the available job templates
    Templates,
}
