//! Ring, host-token and datacenter discovery.
//!
//! Three admin-CLI subcommands are consumed:
//! - `gossipinfo`: node paragraphs separated by `/`, used to find the
//!   members of the local datacenter
//! - `ring`: one row per (node, token) after a four-line header
//! - `info -T`: the target node's own tokens on `Token` lines
//!
//! Any failure here is fatal to the run; without an accurate ring model
//! there is nothing safe to repair.

use corelib::{TokenRing, TokenValue};

use crate::error::NodetoolError;
use crate::invoker::CommandRunner;

/// Connection settings for discovery commands.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Path to the admin CLI binary.
    pub nodetool: String,
    pub host: String,
    pub port: u16,
    /// Restrict the ring to members of this datacenter.
    pub datacenter: Option<String>,
}

impl DiscoveryConfig {
    fn argv(&self, subcommand: &[&str]) -> Vec<String> {
        let mut argv = vec![
            self.nodetool.clone(),
            "-h".to_string(),
            self.host.clone(),
            "-p".to_string(),
            self.port.to_string(),
        ];
        argv.extend(subcommand.iter().map(|s| s.to_string()));
        argv
    }
}

/// Discovers the full token ring for the configured target node.
///
/// Performs local-node discovery (when a datacenter filter is set), ring
/// discovery and host-token discovery, in that order, then builds the
/// immutable [`TokenRing`].
pub async fn discover_ring(
    config: &DiscoveryConfig,
    runner: &dyn CommandRunner,
) -> Result<TokenRing, NodetoolError> {
    let local_nodes = match &config.datacenter {
        None => {
            tracing::debug!("no datacenter specified, all ring members' tokens will be considered");
            Vec::new()
        }
        Some(datacenter) => {
            tracing::debug!("determining local ring members");
            let out = runner.run(&config.argv(&["gossipinfo"])).await;
            if !out.success {
                return Err(NodetoolError::CommandFailed {
                    cmd: out.cmd,
                    stderr: out.stderr,
                });
            }
            let nodes = parse_local_nodes(&out.stdout, datacenter);
            tracing::info!("local nodes: {}", nodes.join(" "));
            nodes
        }
    };

    tracing::info!("running nodetool ring, this will take a little bit of time");
    let out = runner.run(&config.argv(&["ring"])).await;
    if !out.success {
        return Err(NodetoolError::CommandFailed {
            cmd: out.cmd,
            stderr: out.stderr,
        });
    }
    let datacenter_filter = config.datacenter.as_ref().map(|_| local_nodes.as_slice());
    let ring_tokens = parse_ring_tokens(&out.stdout, datacenter_filter)?;
    tracing::info!("found {} ring tokens", ring_tokens.len());

    let out = runner.run(&config.argv(&["info", "-T"])).await;
    if !out.success {
        return Err(NodetoolError::CommandFailed {
            cmd: out.cmd,
            stderr: out.stderr,
        });
    }
    let host_tokens = parse_host_tokens(&out.stdout)?;
    tracing::debug!("{} host tokens found", host_tokens.len());

    TokenRing::new(ring_tokens, host_tokens, local_nodes).map_err(|err| NodetoolError::Parse {
        cmd: "ring".to_string(),
        reason: err.to_string(),
    })
}

/// Extracts addresses of nodes in `datacenter` from `gossipinfo` output.
///
/// Paragraphs are separated by `/`; a paragraph belongs to the datacenter
/// when it carries `DC:<datacenter>` or `DC:<generation>:<datacenter>`.
/// The paragraph's first whitespace field is the node address.
pub fn parse_local_nodes(stdout: &str, datacenter: &str) -> Vec<String> {
    let mut nodes = Vec::new();
    for paragraph in stdout.split('/') {
        if !paragraph_names_datacenter(paragraph, datacenter) {
            continue;
        }
        if let Some(address) = paragraph.split_whitespace().next() {
            nodes.push(address.to_string());
        }
    }
    nodes
}

/// True when the paragraph carries a `DC` application state naming
/// `datacenter`, with or without the numeric version between the colons.
fn paragraph_names_datacenter(paragraph: &str, datacenter: &str) -> bool {
    for (idx, _) in paragraph.match_indices("DC:") {
        let rest = &paragraph[idx + 3..];
        if rest.starts_with(datacenter) {
            return true;
        }
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0
            && rest[digits..].starts_with(':')
            && rest[digits + 1..].starts_with(datacenter)
        {
            return true;
        }
    }
    false
}

/// Parses `ring` output into token values.
///
/// The first four lines are a header. Well-formed rows have 8 whitespace
/// fields with the state in field 3 and the token last; rows from joining
/// nodes are dropped. Rows where a long rack name ran into the status
/// column collapse to 7 fields ending in `Up`/`Down` in field 1; these
/// are split back apart. With a datacenter filter, rows whose address is
/// not a local node are dropped.
pub fn parse_ring_tokens(
    stdout: &str,
    local_nodes: Option<&[String]>,
) -> Result<Vec<TokenValue>, NodetoolError> {
    let mut tokens = Vec::new();
    for line in stdout.lines().skip(4) {
        let mut fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();

        if fields.len() != 8 || fields[3] == "Joining" {
            let fused = fields.len() == 7
                && (fields[1].ends_with("Up") || fields[1].ends_with("Down"));
            if !fused {
                tracing::debug!("discarding: {}", line);
                continue;
            }
            let status = if fields[1].ends_with("Up") { "Up" } else { "Down" };
            let rack = fields[1][..fields[1].len() - status.len()].to_string();
            fields[1] = rack;
            fields.insert(2, status.to_string());
        }

        if let Some(locals) = local_nodes {
            if !locals.iter().any(|n| n == &fields[0]) {
                tracing::debug!("discarding node/token {}/{}", fields[0], fields[7]);
                continue;
            }
        }

        let token = fields[7]
            .parse::<TokenValue>()
            .map_err(|_| NodetoolError::Parse {
                cmd: "ring".to_string(),
                reason: format!("bad token `{}`", fields[7]),
            })?;
        tokens.push(token);
    }
    Ok(tokens)
}

/// Parses `info -T` output: every `Token` line carries the token as its
/// last whitespace field.
pub fn parse_host_tokens(stdout: &str) -> Result<Vec<TokenValue>, NodetoolError> {
    let mut tokens = Vec::new();
    for line in stdout.lines() {
        if !line.starts_with("Token") {
            continue;
        }
        let field = line.split_whitespace().last().ok_or_else(|| NodetoolError::Parse {
            cmd: "info -T".to_string(),
            reason: "empty Token line".to_string(),
        })?;
        let token = field.parse::<TokenValue>().map_err(|_| NodetoolError::Parse {
            cmd: "info -T".to_string(),
            reason: format!("bad token `{}`", field),
        })?;
        tokens.push(token);
    }
    if tokens.is_empty() {
        return Err(NodetoolError::Parse {
            cmd: "info -T".to_string(),
            reason: "no Token lines in output".to_string(),
        });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RING_HEADER: &str = "\nDatacenter: dc1\n==========\nAddress    Rack  Status State   Load   Owns   Token\n";

    #[test]
    fn test_parse_ring_tokens_basic() {
        let stdout = format!(
            "{}10.0.0.1 rack1 Up Normal 1.05 GB 33.33% -9000000000000000000\n\
             10.0.0.2 rack1 Up Normal 1.02 GB 33.33% -3000000000000000000\n\
             10.0.0.3 rack1 Up Normal 0.98 GB 33.33% 3000000000000000000\n",
            RING_HEADER
        );
        let tokens = parse_ring_tokens(&stdout, None).unwrap();
        assert_eq!(
            tokens,
            vec![
                -9000000000000000000,
                -3000000000000000000,
                3000000000000000000
            ]
        );
    }

    #[test]
    fn test_parse_ring_tokens_drops_joining_nodes() {
        let stdout = format!(
            "{}10.0.0.1 rack1 Up Normal 1.05 GB 33.33% 100\n\
             10.0.0.2 rack1 Up Joining 1.02 GB 33.33% 200\n",
            RING_HEADER
        );
        let tokens = parse_ring_tokens(&stdout, None).unwrap();
        assert_eq!(tokens, vec![100]);
    }

    #[test]
    fn test_parse_ring_tokens_splits_fused_rack_and_status() {
        // A rack name wide enough to run into the status column collapses
        // the row to 7 fields.
        let stdout = format!(
            "{}10.0.0.1 very-long-rack-nameUp Normal 1.05 GB 33.33% 100\n\
             10.0.0.2 another-rackDown Normal 1.02 GB 33.33% 200\n\
             10.0.0.3 rack1Sideways Normal 1.02 GB 33.33% 300\n",
            RING_HEADER
        );
        let tokens = parse_ring_tokens(&stdout, None).unwrap();
        assert_eq!(tokens, vec![100, 200]);
    }

    #[test]
    fn test_parse_ring_tokens_datacenter_filter() {
        let stdout = format!(
            "{}10.0.0.1 rack1 Up Normal 1.05 GB 33.33% 100\n\
             10.0.9.9 rack1 Up Normal 1.02 GB 33.33% 200\n",
            RING_HEADER
        );
        let locals = vec!["10.0.0.1".to_string()];
        let tokens = parse_ring_tokens(&stdout, Some(&locals)).unwrap();
        assert_eq!(tokens, vec![100]);
    }

    #[test]
    fn test_parse_ring_tokens_rejects_garbage_token() {
        let stdout = format!("{}10.0.0.1 rack1 Up Normal 1.05 GB 33.33% notatoken\n", RING_HEADER);
        assert!(parse_ring_tokens(&stdout, None).is_err());
    }

    #[test]
    fn test_parse_host_tokens() {
        let stdout = "ID               : 0a9f6cca\n\
                      Token            : -9000000000000000000\n\
                      Token            : 42\n\
                      Gossip active    : true\n";
        let tokens = parse_host_tokens(stdout).unwrap();
        assert_eq!(tokens, vec![-9000000000000000000, 42]);
    }

    #[test]
    fn test_parse_host_tokens_requires_token_lines() {
        assert!(parse_host_tokens("Gossip active : true\n").is_err());
    }

    #[test]
    fn test_parse_local_nodes() {
        let stdout = "/10.0.0.1\n  generation:1700000000\n  DC:dc1\n  RACK:rack1\n\
                      /10.0.0.2\n  generation:1700000001\n  DC:8:dc1\n  RACK:rack1\n\
                      /10.0.9.9\n  generation:1700000002\n  DC:dc2\n  RACK:rack1\n";
        let nodes = parse_local_nodes(stdout, "dc1");
        assert_eq!(nodes, vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn test_parse_local_nodes_no_match() {
        let stdout = "/10.0.0.1\n  DC:dc1\n";
        assert!(parse_local_nodes(stdout, "dc9").is_empty());
    }
}
