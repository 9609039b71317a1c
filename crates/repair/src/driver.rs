//! Top-level repair orchestrator.
//!
//! Builds the work list from the token ring, primes the journal's pending
//! set, fans slices out to a bounded worker pool and finalises the
//! journal. A slice whose repair command fails is recorded and logged but
//! never aborts the run; only discovery, configuration and journal errors
//! are fatal.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rand::Rng;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use corelib::TokenRing;
use nodetool::{discover_ring, enumerate_keyspaces, CommandOutput, CommandRunner};

use crate::config::RepairOptions;
use crate::exclude::{check_excluded, ExclusionMatch};
use crate::retry::ExponentialBackoffRetryer;
use crate::status::{SliceId, StatusJournal, ALL};

/// Runs a complete repair (fresh or resumed) against the configured node.
///
/// Returns `Ok` even when individual slices failed; per-slice outcomes
/// live in the journal.
pub async fn run(options: RepairOptions, runner: Arc<dyn CommandRunner>) -> anyhow::Result<()> {
    let options = Arc::new(options.normalize());
    let ring: Arc<TokenRing> = Arc::new(
        discover_ring(&options.discovery(), runner.as_ref())
            .await
            .context("ring discovery failed")?,
    );
    let journal = Arc::new(StatusJournal::new());
    let workers = Arc::new(Semaphore::new(options.workers.max(1)));
    let mut tasks: JoinSet<anyhow::Result<()>> = JoinSet::new();

    if options.resume {
        let pending = journal.resume(&options).context("cannot resume repair")?;
        tracing::info!("resuming {} pending slices", pending.len());
        for record in pending.into_values() {
            spawn_slice(
                &mut tasks,
                workers.clone(),
                options.clone(),
                runner.clone(),
                journal.clone(),
                record.start,
                record.end,
                record.step,
                record.nodeposition,
            );
        }
    } else {
        journal.start(&options).context("cannot write status file")?;
        let total = ring.host_token_count();
        for (index, &host_token) in ring.host_tokens().iter().enumerate() {
            if index < options.offset {
                tracing::info!("[{}/{}] skipping token", index + 1, total);
                continue;
            }
            let range_start = ring.preceding_token(host_token);
            let nodeposition = format!("{}/{}", index + 1, total);
            tracing::info!(
                "[{}] repairing range ({}, {}) in {} steps for keyspace {}",
                nodeposition,
                ring.format(range_start),
                ring.format(host_token),
                options.steps,
                options.keyspace.as_deref().unwrap_or(ALL)
            );
            for sub in ring.sub_ranges(range_start, host_token, options.steps) {
                let slice = SliceId::new(
                    sub.step,
                    &sub.start,
                    &sub.end,
                    &nodeposition,
                    options.keyspace.as_deref(),
                    &options.column_families,
                );
                journal.add_pending(&slice);
                spawn_slice(
                    &mut tasks,
                    workers.clone(),
                    options.clone(),
                    runner.clone(),
                    journal.clone(),
                    sub.start,
                    sub.end,
                    sub.step,
                    nodeposition.clone(),
                );
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        joined.context("repair worker panicked")??;
    }
    journal.finish().context("cannot write status file")?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn spawn_slice(
    tasks: &mut JoinSet<anyhow::Result<()>>,
    workers: Arc<Semaphore>,
    options: Arc<RepairOptions>,
    runner: Arc<dyn CommandRunner>,
    journal: Arc<StatusJournal>,
    start: String,
    end: String,
    step: u32,
    nodeposition: String,
) {
    tasks.spawn(async move {
        let _permit = workers
            .acquire_owned()
            .await
            .context("worker pool closed")?;
        repair_slice(
            &options,
            runner.as_ref(),
            &journal,
            &start,
            &end,
            step,
            &nodeposition,
        )
        .await
    });
}

/// Repairs one slice, honouring exclusions.
async fn repair_slice(
    options: &RepairOptions,
    runner: &dyn CommandRunner,
    journal: &StatusJournal,
    start: &str,
    end: &str,
    step: u32,
    nodeposition: &str,
) -> anyhow::Result<()> {
    match check_excluded(&options.exclusions, options.keyspace.as_deref(), nodeposition, step) {
        Some(ExclusionMatch::Whole(_)) => {
            tracing::debug!(
                "{} step {:04} skipping range ({}, {}) for keyspace {}",
                nodeposition,
                step,
                start,
                end,
                options.keyspace.as_deref().unwrap_or(ALL)
            );
            Ok(())
        }
        Some(ExclusionMatch::KeyspaceOnly(excluded)) => {
            tracing::info!(
                "running individual repair commands for each keyspace to exclude {} {}",
                excluded.keyspace.as_deref().unwrap_or(""),
                excluded.column_family.as_deref().unwrap_or("")
            );
            let keyspaces =
                match enumerate_keyspaces(&options.nodetool, &options.host, options.port, runner)
                    .await
                {
                    Ok(keyspaces) => keyspaces,
                    Err(err) => {
                        // The slice stays pending and is picked up on resume.
                        tracing::error!(
                            "{} step {:04} could not enumerate keyspaces: {}",
                            nodeposition,
                            step,
                            err
                        );
                        return Ok(());
                    }
                };
            for (keyspace, tables) in keyspaces {
                if Some(keyspace.as_str()) == excluded.keyspace.as_deref() {
                    match &excluded.column_family {
                        Some(excluded_table) => {
                            tracing::info!(
                                "repairing all column families except {} for keyspace {}",
                                excluded_table,
                                keyspace
                            );
                            let tables: Vec<String> =
                                tables.into_iter().filter(|t| t != excluded_table).collect();
                            repair_one(
                                options,
                                runner,
                                journal,
                                start,
                                end,
                                step,
                                nodeposition,
                                Some(&keyspace),
                                &tables,
                            )
                            .await?;
                        }
                        None => {
                            tracing::debug!(
                                "{} step {:04} skipping range ({}, {}) for keyspace {}",
                                nodeposition,
                                step,
                                start,
                                end,
                                keyspace
                            );
                        }
                    }
                    continue;
                }
                repair_one(
                    options,
                    runner,
                    journal,
                    start,
                    end,
                    step,
                    nodeposition,
                    Some(&keyspace),
                    &options.column_families,
                )
                .await?;
            }
            Ok(())
        }
        None => {
            repair_one(
                options,
                runner,
                journal,
                start,
                end,
                step,
                nodeposition,
                options.keyspace.as_deref(),
                &options.column_families,
            )
            .await
        }
    }
}

/// Runs one repair command and records its outcome in the journal.
#[allow(clippy::too_many_arguments)]
async fn repair_one(
    options: &RepairOptions,
    runner: &dyn CommandRunner,
    journal: &StatusJournal,
    start: &str,
    end: &str,
    step: u32,
    nodeposition: &str,
    keyspace: Option<&str>,
    column_families: &[String],
) -> anyhow::Result<()> {
    tracing::debug!(
        "{} step {:04} repairing range ({}, {}) for keyspace {}",
        nodeposition,
        step,
        start,
        end,
        keyspace.unwrap_or(ALL)
    );

    let argv = build_repair_argv(options, keyspace, column_families, start, end);
    let cmd = argv.join(" ");
    let slice = SliceId::new(step, start, end, nodeposition, keyspace, column_families);

    if !options.dry_run && options.max_sleep_before_run > 0.0 {
        let jitter = rand::thread_rng().gen_range(0.0..options.max_sleep_before_run);
        tracing::info!("sleeping for {:.1} seconds before run", jitter);
        tokio::time::sleep(Duration::from_secs_f64(jitter)).await;
    }

    journal.repair_start(&cmd, &slice)?;

    let success = if options.dry_run {
        println!("{:04}/{} {}", step, nodeposition, cmd);
        true
    } else {
        let retryer = ExponentialBackoffRetryer::new(options.retry);
        let output = retryer
            .run(
                || {
                    let argv = argv.clone();
                    async move { runner.run(&argv).await }
                },
                |out: &CommandOutput| out.success,
            )
            .await;
        if !output.success {
            tracing::error!("FAILED: {} step {:04} {}", nodeposition, step, cmd);
            tracing::error!("{}", output.stderr);
        }
        output.success
    };

    if success {
        journal.repair_success(&cmd, &slice)?;
        tracing::debug!("{} step {:04} complete", nodeposition, step);
    } else {
        journal.repair_fail(&cmd, &slice)?;
    }
    Ok(())
}

/// Builds the `nodetool repair` argv for one slice.
///
/// `-local` and `-pr` are mutually exclusive; primary-range repair is the
/// default whenever the run is not DC-local.
fn build_repair_argv(
    options: &RepairOptions,
    keyspace: Option<&str>,
    column_families: &[String],
    start: &str,
    end: &str,
) -> Vec<String> {
    let mut argv = vec![
        options.nodetool.clone(),
        "-h".to_string(),
        options.host.clone(),
        "-p".to_string(),
        options.port.to_string(),
        "repair".to_string(),
    ];
    if options.full {
        argv.push("-full".to_string());
    }
    if let Some(keyspace) = keyspace {
        argv.push(keyspace.to_string());
    }
    argv.extend(column_families.iter().cloned());
    if options.local {
        argv.push("-local".to_string());
    } else {
        argv.push("-pr".to_string());
    }
    if options.parallel {
        argv.push("-par".to_string());
    }
    if options.incremental {
        argv.push("-inc".to_string());
    }
    if options.snapshot {
        argv.push("-snapshot".to_string());
    }
    argv.extend([
        "-st".to_string(),
        start.to_string(),
        "-et".to_string(),
        end.to_string(),
    ]);
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> RepairOptions {
        RepairOptions::default()
    }

    #[test]
    fn test_build_repair_argv_defaults_to_primary_range() {
        let argv = build_repair_argv(&options(), Some("app"), &[], "+01", "+02");
        assert_eq!(
            argv.join(" "),
            "nodetool -h localhost -p 7199 repair app -pr -st +01 -et +02"
        );
    }

    #[test]
    fn test_build_repair_argv_local_suppresses_pr() {
        let opts = RepairOptions {
            local: true,
            ..options()
        };
        let argv = build_repair_argv(&opts, None, &[], "+01", "+02");
        assert!(argv.contains(&"-local".to_string()));
        assert!(!argv.contains(&"-pr".to_string()));
    }

    #[test]
    fn test_build_repair_argv_flag_flavours() {
        let opts = RepairOptions {
            full: true,
            parallel: true,
            incremental: true,
            snapshot: true,
            ..options()
        };
        let cfs = vec!["users".to_string(), "events".to_string()];
        let argv = build_repair_argv(&opts, Some("app"), &cfs, "+01", "+02");
        assert_eq!(
            argv.join(" "),
            "nodetool -h localhost -p 7199 repair -full app users events -pr -par -inc -snapshot -st +01 -et +02"
        );
    }
}
