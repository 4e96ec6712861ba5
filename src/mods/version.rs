//! Mod versions and version requirements.
//!
//! Fabric mod manifests declare versions as free-form strings, but almost all of them follow
//! semantic versioning. Versions that parse as a dotted release (with an optional pre-release tag
//! after a `-` and ignored build metadata after a `+`) compare component-wise; anything else falls
//! back to byte-wise string comparison. A parseable version always orders above a raw one so that
//! provider preference stays deterministic for mixed collections.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display};

/// A mod or capability version. Keeps the original text for display and equality reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Version {
    raw: String,
    parsed: Option<Parsed>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Parsed {
    release: Vec<u64>,
    pre: Option<String>,
}

impl Version {
    /// Parse a version string. This never fails: unparseable input becomes a raw version that
    /// compares byte-wise.
    pub fn parse(text: &str) -> Self {
        Self {
            raw: text.to_string(),
            parsed: Parsed::parse(text),
        }
    }

    /// The version of the synthetic providers backing implicit capabilities.
    pub fn zero() -> Self {
        Self::parse("0.0.0")
    }

    /// The numeric release component at `index`, counting missing trailing components as zero.
    /// Returns `None` for raw versions.
    fn release(&self, index: usize) -> Option<u64> {
        self.parsed
            .as_ref()
            .map(|parsed| parsed.release.get(index).copied().unwrap_or(0))
    }
}

impl Parsed {
    fn parse(text: &str) -> Option<Self> {
        // Build metadata does not participate in ordering.
        let text = text.split_once('+').map(|(v, _)| v).unwrap_or(text);
        let (release, pre) = match text.split_once('-') {
            Some((release, pre)) if !pre.is_empty() => (release, Some(pre.to_string())),
            Some(_) => return None,
            None => (text, None),
        };

        let release = release
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<u64>>>()?;

        if release.is_empty() { None } else { Some(Self { release, pre }) }
    }

    fn cmp(&self, other: &Self) -> Ordering {
        let components = self.release.len().max(other.release.len());
        for index in 0..components {
            let a = self.release.get(index).copied().unwrap_or(0);
            let b = other.release.get(index).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }

        // A pre-release sorts below the release it precedes.
        match (&self.pre, &other.pre) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.parsed, &other.parsed) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<String> for Version {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.raw
    }
}

/// A single version requirement, e.g. `>=1.2.0` or `*`. A dependency entry carries a list of
/// these and every one of them must hold; an empty list means any version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VersionReq {
    op: Op,
    version: Option<Version>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Any,
    Exact,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    /// Same major.minor, at least the given version.
    Tilde,
    /// Same major, at least the given version.
    Caret,
}

impl VersionReq {
    /// The requirement that matches everything.
    pub fn any() -> Self {
        Self { op: Op::Any, version: None }
    }

    /// Parse a requirement string. A bare version means an exact match; `*` and the empty string
    /// match anything.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let (op, rest) = if text.is_empty() || text == "*" {
            return Self::any();
        } else if let Some(rest) = text.strip_prefix(">=") {
            (Op::GreaterEq, rest)
        } else if let Some(rest) = text.strip_prefix("<=") {
            (Op::LessEq, rest)
        } else if let Some(rest) = text.strip_prefix('>') {
            (Op::Greater, rest)
        } else if let Some(rest) = text.strip_prefix('<') {
            (Op::Less, rest)
        } else if let Some(rest) = text.strip_prefix('~') {
            (Op::Tilde, rest)
        } else if let Some(rest) = text.strip_prefix('^') {
            (Op::Caret, rest)
        } else if let Some(rest) = text.strip_prefix('=') {
            (Op::Exact, rest)
        } else {
            (Op::Exact, text)
        };

        Self {
            op,
            version: Some(Version::parse(rest.trim())),
        }
    }

    /// Test whether `candidate` satisfies this requirement.
    pub fn matches(&self, candidate: &Version) -> bool {
        let Some(version) = &self.version else {
            return true;
        };

        match self.op {
            Op::Any => true,
            Op::Exact => candidate == version,
            Op::Greater => candidate > version,
            Op::GreaterEq => candidate >= version,
            Op::Less => candidate < version,
            Op::LessEq => candidate <= version,
            Op::Tilde => match (candidate.release(0), version.release(0)) {
                (Some(_), Some(_)) => {
                    candidate.release(0) == version.release(0)
                        && candidate.release(1) == version.release(1)
                        && candidate >= version
                }
                // Raw versions carry no components to pin, only an exact match is meaningful.
                _ => candidate == version,
            },
            Op::Caret => match (candidate.release(0), version.release(0)) {
                (Some(_), Some(_)) => candidate.release(0) == version.release(0) && candidate >= version,
                _ => candidate == version,
            },
        }
    }
}

impl Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(version) = &self.version else {
            return f.write_str("*");
        };

        let op = match self.op {
            Op::Any => return f.write_str("*"),
            Op::Exact => "=",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
            Op::Tilde => "~",
            Op::Caret => "^",
        };

        write!(f, "{}{}", op, version)
    }
}

impl From<String> for VersionReq {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<VersionReq> for String {
    fn from(req: VersionReq) -> Self {
        req.to_string()
    }
}
