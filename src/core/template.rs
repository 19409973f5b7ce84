//! Path templates of the form `/v1/records/{id}`.
//!
//! A template is a list of segments, each either literal text or a named
//! single-segment variable. Templates are parsed once at start-up and are
//! immutable afterwards; matching a request path is a segment-by-segment
//! comparison with no backtracking.
use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Variable(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("path template '{0}' must start with '/'")]
    MissingLeadingSlash(String),

    #[error("path template '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error("path template '{template}' has a malformed variable segment '{segment}'")]
    MalformedVariable { template: String, segment: String },

    #[error("path template '{template}' declares variable '{name}' more than once")]
    DuplicateVariable { template: String, name: String },
}

/// Variable bindings produced by a successful match, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    entries: Vec<(String, String)>,
}

impl Captures {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn push(&mut self, name: &str, value: &str) {
        self.entries.push((name.to_string(), value.to_string()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let Some(rest) = raw.strip_prefix('/') else {
            return Err(TemplateError::MissingLeadingSlash(raw.to_string()));
        };

        let mut segments = Vec::new();
        if !rest.is_empty() {
            for part in rest.split('/') {
                segments.push(Self::parse_segment(raw, part)?);
            }
        }

        let mut seen: Vec<&str> = Vec::new();
        for segment in &segments {
            if let Segment::Variable(name) = segment {
                if seen.contains(&name.as_str()) {
                    return Err(TemplateError::DuplicateVariable {
                        template: raw.to_string(),
                        name: name.clone(),
                    });
                }
                seen.push(name);
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    fn parse_segment(raw: &str, part: &str) -> Result<Segment, TemplateError> {
        if part.is_empty() {
            return Err(TemplateError::EmptySegment(raw.to_string()));
        }
        let malformed = || TemplateError::MalformedVariable {
            template: raw.to_string(),
            segment: part.to_string(),
        };

        match part.strip_prefix('{') {
            Some(inner) => {
                let name = inner.strip_suffix('}').ok_or_else(malformed)?;
                if !is_valid_variable_name(name) {
                    return Err(malformed());
                }
                Ok(Segment::Variable(name.to_string()))
            }
            None if part.contains('{') || part.contains('}') => Err(malformed()),
            None => Ok(Segment::Literal(part.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a literal request path (no query string). Returns the captures
    /// on a full match and `None` otherwise; there are no partial matches.
    pub fn matches(&self, path: &str) -> Option<Captures> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').collect()
        };
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut captures = Captures::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(text) if text == part => {}
                Segment::Literal(_) => return None,
                Segment::Variable(_) if part.is_empty() => return None,
                Segment::Variable(name) => captures.push(name, part),
            }
        }
        Some(captures)
    }

    /// True when some literal path would satisfy both templates. Two
    /// positions can only disagree when both are literals with different
    /// text.
    pub fn overlaps(&self, other: &PathTemplate) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    _ => true,
                })
    }
}

fn is_valid_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

impl FromStr for PathTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
