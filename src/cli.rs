//! Command line argument parser
use std::path::PathBuf;

use clap::Parser;
use log::error;

use crate::overlap::Counting;
use crate::venn::{MAX_SIZE, MIN_SIZE};

/// Merge two peak lists, then merge the shared peaks with RNA-seq expression
/// data and draw the three-way overlap.
#[derive(Parser, Debug)]
#[command(name = "peaks-deg", version, about)]
pub struct ArgParser {
    /// first peak list (csv, json or parquet)
    #[arg(value_name = "PEAKFILE1")]
    pub peaklist1: PathBuf,

    /// second peak list (csv, json or parquet)
    #[arg(value_name = "PEAKFILE2")]
    pub peaklist2: PathBuf,

    /// RNA-seq expression table (csv, json or parquet)
    #[arg(value_name = "RNA-SEQFILE")]
    pub expression: PathBuf,

    /// how overlap region sizes are computed
    #[arg(value_enum, long, default_value_t = Counting::Sets)]
    pub counting: Counting,

    /// write every joined row instead of one row per join key
    #[arg(long = "keep-duplicates", default_value_t = false)]
    pub keep_duplicates: bool,

    /// edge length of the diagram in pixels
    #[arg(long = "image-size", default_value_t = 600)]
    pub image_size: u32,

    /// verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ArgParser {
    /// Log level used when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Validate command line arguments
    pub fn validate(&self) -> bool {
        let mut is_ok = true;
        for (flag, path) in [
            ("PEAKFILE1", &self.peaklist1),
            ("PEAKFILE2", &self.peaklist2),
            ("RNA-SEQFILE", &self.expression),
        ] {
            if !path.is_file() {
                error!("{flag} {} doesn't exist", path.display());
                is_ok = false;
            }
        }
        if !(MIN_SIZE..=MAX_SIZE).contains(&self.image_size) {
            error!("--image-size must be between {MIN_SIZE} and {MAX_SIZE}");
            is_ok = false;
        }
        is_ok
    }
}
