//! Keyspace and table enumeration via `cfstats`.

use std::collections::BTreeMap;

use crate::error::NodetoolError;
use crate::invoker::CommandRunner;

/// Lists every keyspace and its tables on the target node.
pub async fn enumerate_keyspaces(
    nodetool: &str,
    host: &str,
    port: u16,
    runner: &dyn CommandRunner,
) -> Result<BTreeMap<String, Vec<String>>, NodetoolError> {
    tracing::info!("running nodetool cfstats");
    let argv = vec![
        nodetool.to_string(),
        "-h".to_string(),
        host.to_string(),
        "-p".to_string(),
        port.to_string(),
        "cfstats".to_string(),
    ];
    let out = runner.run(&argv).await;
    if !out.success {
        return Err(NodetoolError::CommandFailed {
            cmd: out.cmd,
            stderr: out.stderr,
        });
    }
    tracing::debug!("cfstats retrieved, parsing output to retrieve keyspaces");
    let keyspaces = parse_cfstats(&out.stdout);
    tracing::info!("found {} keyspaces", keyspaces.len());
    Ok(keyspaces)
}

/// Parses `cfstats` output into a keyspace -> tables map.
///
/// `Keyspace: <name>` lines open a keyspace; double-tab-indented
/// `Table: <name>` lines add a table to the most recent keyspace.
pub fn parse_cfstats(stdout: &str) -> BTreeMap<String, Vec<String>> {
    let mut keyspaces: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut current: Option<String> = None;
    for line in stdout.lines() {
        if let Some(name) = line.strip_prefix("Keyspace: ") {
            keyspaces.insert(name.to_string(), Vec::new());
            current = Some(name.to_string());
        } else if let Some(table) = line.strip_prefix("\t\tTable: ") {
            if let Some(keyspace) = &current {
                if let Some(tables) = keyspaces.get_mut(keyspace) {
                    tables.push(table.to_string());
                }
            }
        }
    }
    keyspaces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cfstats() {
        let stdout = "Keyspace: app\n\
                      \tRead Count: 1234\n\
                      \t\tTable: users\n\
                      \t\tSSTable count: 4\n\
                      \t\tTable: events\n\
                      Keyspace: system\n\
                      \t\tTable: peers\n";
        let keyspaces = parse_cfstats(stdout);
        assert_eq!(keyspaces.len(), 2);
        assert_eq!(keyspaces["app"], vec!["users", "events"]);
        assert_eq!(keyspaces["system"], vec!["peers"]);
    }

    #[test]
    fn test_parse_cfstats_ignores_tables_before_any_keyspace() {
        let keyspaces = parse_cfstats("\t\tTable: orphan\n");
        assert!(keyspaces.is_empty());
    }
}
