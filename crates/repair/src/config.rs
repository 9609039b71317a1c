//! Run configuration.
//!
//! One immutable value carries everything a run needs; it is built at the
//! CLI boundary, validated once, and shared read-only by the workers.

use std::path::PathBuf;

use nodetool::DiscoveryConfig;

use crate::exclude::Exclusion;
use crate::retry::RetryPolicy;

/// Configuration rejected before a run starts.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("a column family target requires a keyspace")]
    ColumnFamilyWithoutKeyspace,
    #[error("resume requires an existing status file (--output-status)")]
    ResumeWithoutStatusFile,
}

/// All options recognised by the repair driver.
#[derive(Debug, Clone)]
pub struct RepairOptions {
    /// Keyspace to repair; `None` repairs all keyspaces.
    pub keyspace: Option<String>,
    /// Column families to repair within `keyspace`.
    pub column_families: Vec<String>,
    pub host: String,
    pub port: u16,
    /// Restrict ring discovery to members of this datacenter.
    pub datacenter: Option<String>,
    /// Path to the admin CLI binary.
    pub nodetool: String,
    /// Sub-ranges per owned token.
    pub steps: u32,
    /// Skip this many host tokens before repairing.
    pub offset: usize,
    /// Bounded worker-pool size.
    pub workers: usize,
    /// Restrict repair to the local DC (`-local`; suppresses `-pr`).
    pub local: bool,
    /// Parallel repair (`-par`).
    pub parallel: bool,
    /// Incremental repair (`-inc`); forces `parallel`.
    pub incremental: bool,
    /// Full repair (`-full`).
    pub full: bool,
    /// Snapshot repair (`-snapshot`).
    pub snapshot: bool,
    /// Print commands instead of executing them.
    pub dry_run: bool,
    /// Journal path; `None` disables the journal file.
    pub output_status: Option<PathBuf>,
    /// Also log every journal snapshot.
    pub log_status: bool,
    /// Re-dispatch the pending slices of an interrupted run.
    pub resume: bool,
    /// Upper bound for the uniform-random pre-run sleep, in seconds.
    pub max_sleep_before_run: f64,
    pub retry: RetryPolicy,
    pub exclusions: Vec<Exclusion>,
}

impl Default for RepairOptions {
    fn default() -> Self {
        RepairOptions {
            keyspace: None,
            column_families: Vec::new(),
            host: "localhost".to_string(),
            port: 7199,
            datacenter: None,
            nodetool: "nodetool".to_string(),
            steps: 100,
            offset: 0,
            workers: 1,
            local: false,
            parallel: false,
            incremental: false,
            full: false,
            snapshot: false,
            dry_run: false,
            output_status: None,
            log_status: false,
            resume: false,
            max_sleep_before_run: 60.0,
            retry: RetryPolicy::default(),
            exclusions: Vec::new(),
        }
    }
}

impl RepairOptions {
    /// Rejects inconsistent option combinations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.column_families.is_empty() && self.keyspace.is_none() {
            return Err(ConfigError::ColumnFamilyWithoutKeyspace);
        }
        if self.resume && self.output_status.is_none() {
            return Err(ConfigError::ResumeWithoutStatusFile);
        }
        Ok(())
    }

    /// Applies cross-option rules: incremental repair needs parallel.
    pub fn normalize(mut self) -> Self {
        if self.incremental && !self.parallel {
            tracing::info!("incremental repairs need parallel: enabling");
            self.parallel = true;
        }
        self
    }

    pub fn discovery(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            nodetool: self.nodetool.clone(),
            host: self.host.clone(),
            port: self.port,
            datacenter: self.datacenter.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(RepairOptions::default().validate().is_ok());
    }

    #[test]
    fn test_column_family_requires_keyspace() {
        let options = RepairOptions {
            column_families: vec!["users".to_string()],
            ..RepairOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::ColumnFamilyWithoutKeyspace)
        ));

        let options = RepairOptions {
            keyspace: Some("app".to_string()),
            column_families: vec!["users".to_string()],
            ..RepairOptions::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_resume_requires_status_file() {
        let options = RepairOptions {
            resume: true,
            ..RepairOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::ResumeWithoutStatusFile)
        ));
    }

    #[test]
    fn test_incremental_forces_parallel() {
        let options = RepairOptions {
            incremental: true,
            ..RepairOptions::default()
        }
        .normalize();
        assert!(options.parallel);
    }
}
