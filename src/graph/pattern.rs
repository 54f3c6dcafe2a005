//! Glob-style edge address patterns: `from->to:label`.
//!
//! Each of the three segments is either `*`, which matches any value, or a
//! literal matched exactly. A segment is compared as a whole, so a pattern
//! always matches an entire edge key and never a substring of it.
//!
//! ```
//! use propgraph::graph::EdgePattern;
//! use propgraph::Edge;
//!
//! let p = EdgePattern::parse("1->*:knows").unwrap();
//! assert!(p.matches(&Edge::new("1", "2", "knows", 1.0)));
//! assert!(!p.matches(&Edge::new("1", "2", "likes", 1.0)));
//! ```

use std::fmt;
use std::str::FromStr;

use crate::model::{Edge, EdgeKey};
use crate::{Error, Result};

const WILDCARD: &str = "*";

/// One of the three positions of an edge key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Any,
    Exact(String),
}

impl Segment {
    /// Pattern text: `*` is the wildcard and may not appear inside a literal.
    fn parse(pattern: &str, raw: &str, position: &str) -> Result<Self> {
        if raw == WILDCARD {
            return Ok(Segment::Any);
        }
        if raw.contains(WILDCARD) {
            return Err(Error::InvalidPattern {
                pattern: pattern.to_string(),
                reason: format!("`*` must stand alone in the {position} segment"),
            });
        }
        Ok(Segment::Exact(raw.to_string()))
    }

    /// Field-filter text: empty or `*` is the wildcard, anything else literal.
    fn from_field(raw: &str) -> Self {
        if raw.is_empty() || raw == WILDCARD {
            Segment::Any
        } else {
            Segment::Exact(raw.to_string())
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Segment::Any => true,
            Segment::Exact(s) => s == value,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Segment::Any)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Any => f.write_str(WILDCARD),
            Segment::Exact(s) => f.write_str(s),
        }
    }
}

/// A compiled edge pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgePattern {
    pub from: Segment,
    pub to: Segment,
    pub label: Segment,
}

impl EdgePattern {
    /// Matches every edge.
    pub fn any() -> Self {
        Self { from: Segment::Any, to: Segment::Any, label: Segment::Any }
    }

    /// Compile `from->to:label`. The text is split at the first `->`, then
    /// the rest at the first `:`.
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let (from, rest) = pattern.split_once("->").ok_or_else(|| invalid("missing `->`"))?;
        let (to, label) = rest.split_once(':').ok_or_else(|| invalid("missing `:`"))?;

        Ok(Self {
            from: Segment::parse(pattern, from, "from")?,
            to: Segment::parse(pattern, to, "to")?,
            label: Segment::parse(pattern, label, "label")?,
        })
    }

    /// Build from field values, where an empty value or `*` means any.
    pub fn from_filter(from: &str, to: &str, label: &str) -> Self {
        Self {
            from: Segment::from_field(from),
            to: Segment::from_field(to),
            label: Segment::from_field(label),
        }
    }

    pub fn matches(&self, edge: &Edge) -> bool {
        self.from.matches(&edge.from) && self.to.matches(&edge.to) && self.label.matches(&edge.label)
    }

    pub fn matches_key(&self, key: &EdgeKey) -> bool {
        self.from.matches(&key.from) && self.to.matches(&key.to) && self.label.matches(&key.label)
    }

    /// The single source bucket this pattern can match, if `from` is literal.
    pub fn source(&self) -> Option<&str> {
        match &self.from {
            Segment::Exact(s) => Some(s),
            Segment::Any => None,
        }
    }
}

impl FromStr for EdgePattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for EdgePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}:{}", self.from, self.to, self.label)
    }
}
