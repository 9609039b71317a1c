//! Slice exclusion rules.
//!
//! An exclusion names a `(node, step)` pair, optionally narrowed to a
//! keyspace and column family. Matching a slice yields one of three
//! outcomes: not excluded, the whole slice skipped, or a single keyspace
//! carved out of an otherwise all-keyspaces slice (in which case the
//! driver falls back to per-keyspace repair commands).

use std::str::FromStr;

/// Malformed `--exclude-step` value.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExclusionParseError {
    #[error("expected [keyspace,[column_family,]]node,step, got `{0}`")]
    WrongShape(String),
    #[error("invalid step number `{0}`")]
    InvalidStep(String),
}

/// One exclusion rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub keyspace: Option<String>,
    pub column_family: Option<String>,
    /// 1-based node index, compared against the slice's `i/N` position.
    pub node: String,
    pub step: u32,
}

impl FromStr for Exclusion {
    type Err = ExclusionParseError;

    /// Parses `keyspace,column_family,node,step`, `keyspace,node,step`
    /// or `node,step`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let pieces: Vec<&str> = value.split(',').collect();
        let parse_step = |raw: &str| {
            raw.parse::<u32>()
                .map_err(|_| ExclusionParseError::InvalidStep(raw.to_string()))
        };
        match pieces.as_slice() {
            [keyspace, column_family, node, step] => Ok(Exclusion {
                keyspace: Some(keyspace.to_string()),
                column_family: Some(column_family.to_string()),
                node: node.to_string(),
                step: parse_step(step)?,
            }),
            [keyspace, node, step] => Ok(Exclusion {
                keyspace: Some(keyspace.to_string()),
                column_family: None,
                node: node.to_string(),
                step: parse_step(step)?,
            }),
            [node, step] => Ok(Exclusion {
                keyspace: None,
                column_family: None,
                node: node.to_string(),
                step: parse_step(step)?,
            }),
            _ => Err(ExclusionParseError::WrongShape(value.to_string())),
        }
    }
}

/// How an exclusion applies to a slice.
#[derive(Debug, PartialEq, Eq)]
pub enum ExclusionMatch<'a> {
    /// Skip the slice entirely.
    Whole(&'a Exclusion),
    /// Repair per keyspace, carving out the excluded one.
    KeyspaceOnly(&'a Exclusion),
}

/// Tests a slice's `(node position, step)` against the exclusion list.
///
/// A keyspace-scoped exclusion skips the whole slice when the run targets
/// exactly that keyspace; on an all-keyspaces run it narrows to
/// [`ExclusionMatch::KeyspaceOnly`]. An exclusion without a keyspace
/// always skips the whole slice.
pub fn check_excluded<'a>(
    exclusions: &'a [Exclusion],
    configured_keyspace: Option<&str>,
    nodeposition: &str,
    step: u32,
) -> Option<ExclusionMatch<'a>> {
    let current_node = nodeposition.split('/').next().unwrap_or(nodeposition);
    for exclusion in exclusions {
        if exclusion.node != current_node || exclusion.step != step {
            continue;
        }
        match &exclusion.keyspace {
            None => return Some(ExclusionMatch::Whole(exclusion)),
            Some(excluded) => match configured_keyspace {
                Some(configured) if configured == excluded => {
                    return Some(ExclusionMatch::Whole(exclusion))
                }
                None => return Some(ExclusionMatch::KeyspaceOnly(exclusion)),
                // The run targets a different keyspace; this rule is moot.
                Some(_) => {}
            },
        }
    }
    None
}
