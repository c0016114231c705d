//! Frame identity tokens.
//!
//! A sentinel has the shape `<depth>-<random>`. The depth says how many
//! ancestors above the frame the host-side window sits; the random part
//! distinguishes sibling frames that share a host.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::{ContextError, Result};

/// Legacy hash parameter carrying the sentinel.
const HASH_PARAM: &str = "amp3pSentinel=";

/// A parsed sentinel.
///
/// `Display` yields the raw wire form. `Debug` hides the random token.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Sentinel {
    raw: String,
    depth: usize,
}

impl Sentinel {
    /// Parse `<depth>-<random>`. Both parts must be non-empty ASCII digit runs
    /// and nothing else may surround them.
    pub fn parse(raw: &str) -> Result<Self> {
        let malformed = || ContextError::MalformedSentinel(raw.to_string());

        let (depth, token) = raw.split_once('-').ok_or_else(malformed)?;
        if !is_digits(depth) || !is_digits(token) {
            return Err(malformed());
        }
        let depth = depth.parse::<usize>().map_err(|_| malformed())?;

        Ok(Self {
            raw: raw.to_string(),
            depth,
        })
    }

    /// Mint a fresh sentinel for a frame `depth` levels below its host.
    pub fn generate(depth: usize) -> Self {
        let token: u64 = rand::thread_rng().gen();
        Self {
            raw: format!("{depth}-{token}"),
            depth,
        }
    }

    /// Extract the legacy `amp3pSentinel=` hash parameter.
    ///
    /// Returns `Ok(None)` when the parameter is absent.
    pub fn from_hash(hash: &str) -> Result<Option<Self>> {
        let hash = hash.strip_prefix('#').unwrap_or(hash);
        let Some(value) = hash
            .split('&')
            .find_map(|pair| pair.strip_prefix(HASH_PARAM))
        else {
            return Ok(None);
        };
        Self::parse(value).map(Some)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl FromStr for Sentinel {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sentinel")
            .field("depth", &self.depth)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl PartialEq<str> for Sentinel {
    fn eq(&self, other: &str) -> bool {
        self.raw == other
    }
}
