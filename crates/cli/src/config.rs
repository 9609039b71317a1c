//! Argument surface for the `range-repair` binary.

use std::path::PathBuf;

use clap::Parser;

use repair::{Exclusion, RepairOptions, RetryPolicy};

/// Break a node's repairs into small, recoverable sub-range repairs.
#[derive(Parser, Debug)]
#[command(name = "range-repair", version, about)]
pub struct RangeRepairCli {
    /// Keyspace to repair; omit to repair all keyspaces
    #[arg(short = 'k', long)]
    pub keyspace: Option<String>,

    /// ColumnFamily to repair, can appear multiple times (requires --keyspace)
    #[arg(short = 'c', long = "columnfamily", value_name = "COLUMNFAMILY")]
    pub column_families: Vec<String>,

    /// Hostname to repair
    #[arg(short = 'H', long, default_value = "localhost")]
    pub host: String,

    /// JMX port to use for nodetool commands
    #[arg(short = 'P', long, default_value_t = 7199)]
    pub port: u16,

    /// Number of discrete sub-ranges per owned token
    #[arg(short = 's', long, default_value_t = 100)]
    pub steps: u32,

    /// Number of host tokens to skip
    #[arg(short = 'o', long, default_value_t = 0)]
    pub offset: usize,

    /// Path to nodetool
    #[arg(short = 'n', long, default_value = "nodetool")]
    pub nodetool: String,

    /// Number of workers to use for parallelism
    #[arg(short = 'w', long, default_value_t = 1)]
    pub workers: usize,

    /// Identify the local datacenter and only consider its ring members
    #[arg(short = 'D', long)]
    pub datacenter: Option<String>,

    /// Restrict repair to the local DC (mutually exclusive with -pr)
    #[arg(short = 'l', long)]
    pub local: bool,

    /// Carry out a parallel repair (post-2.x only)
    #[arg(short = 'p', long = "par")]
    pub parallel: bool,

    /// Carry out an incremental repair (post-2.1 only); forces --par
    #[arg(short = 'i', long = "inc")]
    pub incremental: bool,

    /// Instruct nodetool to issue a full repair
    #[arg(short = 'f', long)]
    pub full: bool,

    /// Use snapshots (pre-2.x only)
    #[arg(short = 'S', long)]
    pub snapshot: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Debugging output
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Do not execute repairs; print each command instead
    #[arg(long)]
    pub dry_run: bool,

    /// Send log messages to a file
    #[arg(long, value_name = "FILENAME")]
    pub logfile: Option<PathBuf>,

    /// Exclude a [keyspace,[column_family,]]node,step from repairs;
    /// can appear multiple times
    #[arg(long = "exclude-step", value_name = "EXCLUDE")]
    pub exclude_step: Vec<Exclusion>,

    /// Output (and update) a status file for each run
    #[arg(long = "output-status", value_name = "FILENAME")]
    pub output_status: Option<PathBuf>,

    /// Also log every status-file write
    #[arg(long = "log-status")]
    pub log_status: bool,

    /// Resume a hung or canceled repair session,
    /// requires an existing --output-status file
    #[arg(long)]
    pub resume: bool,

    /// Maximum number of random seconds to sleep before each execution
    #[arg(long = "max-sleep-before-run", value_name = "SECONDS", default_value_t = 60.0)]
    pub max_sleep_before_run: f64,

    /// Number of times to rerun a failed repair call
    #[arg(long = "max-tries", value_name = "N", default_value_t = 1)]
    pub max_tries: u32,

    /// Number of seconds to sleep after the first failed repair call
    #[arg(long = "initial-sleep", value_name = "SECONDS", default_value_t = 1.0)]
    pub initial_sleep: f64,

    /// Multiplication factor that the retry sleep grows with
    #[arg(long = "sleep-factor", value_name = "N", default_value_t = 2.0)]
    pub sleep_factor: f64,

    /// Maximum time in seconds the retryer may sleep at once;
    /// zero or negative disables the cap
    #[arg(long = "max-sleep", value_name = "SECONDS", default_value_t = 1800.0)]
    pub max_sleep: f64,
}

impl RangeRepairCli {
    /// Converts parsed arguments into the driver's immutable options.
    pub fn into_options(self) -> RepairOptions {
        RepairOptions {
            keyspace: self.keyspace,
            column_families: self.column_families,
            host: self.host,
            port: self.port,
            datacenter: self.datacenter,
            nodetool: self.nodetool,
            steps: self.steps,
            offset: self.offset,
            workers: self.workers,
            local: self.local,
            parallel: self.parallel,
            incremental: self.incremental,
            full: self.full,
            snapshot: self.snapshot,
            dry_run: self.dry_run,
            output_status: self.output_status,
            log_status: self.log_status,
            resume: self.resume,
            max_sleep_before_run: self.max_sleep_before_run,
            retry: RetryPolicy {
                max_tries: self.max_tries,
                initial_sleep: self.initial_sleep,
                sleep_factor: self.sleep_factor,
                max_sleep: self.max_sleep,
            },
            exclusions: self.exclude_step,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_driver_defaults() {
        let cli = RangeRepairCli::parse_from(["range-repair"]);
        let options = cli.into_options();
        assert_eq!(options.steps, 100);
        assert_eq!(options.workers, 1);
        assert_eq!(options.port, 7199);
        assert_eq!(options.retry.max_tries, 1);
        assert_eq!(options.retry.max_sleep, 1800.0);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_exclude_step_parsing() {
        let cli = RangeRepairCli::parse_from([
            "range-repair",
            "--exclude-step",
            "app,users,3,7",
            "--exclude-step",
            "4,2",
        ]);
        assert_eq!(cli.exclude_step.len(), 2);
        assert_eq!(cli.exclude_step[0].keyspace.as_deref(), Some("app"));
        assert_eq!(cli.exclude_step[1].node, "4");
    }

    #[test]
    fn test_repeatable_column_families() {
        let cli = RangeRepairCli::parse_from([
            "range-repair", "-k", "app", "-c", "users", "-c", "events",
        ]);
        let options = cli.into_options();
        assert_eq!(options.column_families, vec!["users", "events"]);
        assert!(options.validate().is_ok());
    }
}
