//! Identifier generation.
//!
//! Ids have the shape `{kind}-{base36 millis}-{suffix}`. The time component
//! is zero-padded to a fixed width so lexical order follows creation order;
//! the suffix is eight random base36 digits (about 41 bits of entropy).

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TIME_WIDTH: usize = 9;
const SUFFIX_LEN: usize = 8;

/// The three persisted entity kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Tree,
    Node,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Tree => "tree",
            Self::Node => "node",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(Self::Project),
            "tree" => Ok(Self::Tree),
            "node" => Ok(Self::Node),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

/// Generate a fresh id for the given kind using the wall clock and the
/// thread-local RNG.
pub fn new_id(kind: EntityKind) -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    new_id_with(kind, millis, &mut rand::thread_rng())
}

/// Generate an id from an explicit timestamp and RNG.
pub fn new_id_with<R: Rng>(kind: EntityKind, millis: u64, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!(
        "{}-{:0>width$}-{}",
        kind.as_str(),
        to_base36(millis),
        suffix,
        width = TIME_WIDTH
    )
}

/// The decoded parts of a well-formed id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedId {
    pub kind: EntityKind,
    pub timestamp_ms: u64,
    pub suffix: String,
}

/// Split an id into its kind, creation time, and random suffix.
pub fn parse_id(id: &str) -> Result<ParsedId, TypeError> {
    let malformed = || TypeError::MalformedId(id.to_string());
    let mut parts = id.splitn(3, '-');
    let kind = parts.next().ok_or_else(malformed)?;
    let time = parts.next().ok_or_else(malformed)?;
    let suffix = parts.next().ok_or_else(malformed)?;

    let kind = kind.parse::<EntityKind>()?;
    let timestamp_ms = from_base36(time).ok_or_else(malformed)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| BASE36.contains(&b)) {
        return Err(malformed());
    }

    Ok(ParsedId {
        kind,
        timestamp_ms,
        suffix: suffix.to_string(),
    })
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

fn from_base36(s: &str) -> Option<u64> {
    if s.is_empty() {
        return None;
    }
    s.bytes().try_fold(0u64, |acc, b| {
        let digit = BASE36.iter().position(|&d| d == b)? as u64;
        acc.checked_mul(36)?.checked_add(digit)
    })
}
