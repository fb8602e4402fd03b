use std::fmt;

use globset::{Glob, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::error::{RepoDigestError, Result};

/// A single name-matching rule used by the scan policy.
///
/// Rules are evaluated against a bare file or directory name, never a full
/// path.
#[derive(Clone)]
pub enum Rule {
    Literal(String),
    Regex(Regex),
    Glob(GlobMatcher),
    /// Matches when `rule` matches and `unless` does not.
    Except { rule: Box<Rule>, unless: Box<Rule> },
}

impl Rule {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|e| RepoDigestError::InvalidRule {
                rule: pattern.to_string(),
                detail: e.to_string(),
            })
    }

    pub fn glob(pattern: &str) -> Result<Self> {
        Glob::new(pattern)
            .map(|glob| Self::Glob(glob.compile_matcher()))
            .map_err(|e| RepoDigestError::InvalidRule {
                rule: pattern.to_string(),
                detail: e.to_string(),
            })
    }

    pub fn except(rule: Rule, unless: Rule) -> Self {
        Self::Except {
            rule: Box::new(rule),
            unless: Box::new(unless),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Literal(value) => value == name,
            Self::Regex(regex) => regex.is_match(name),
            Self::Glob(matcher) => matcher.is_match(name),
            Self::Except { rule, unless } => rule.matches(name) && !unless.matches(name),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "literal({value:?})"),
            Self::Regex(regex) => write!(f, "regex({:?})", regex.as_str()),
            Self::Glob(matcher) => write!(f, "glob({:?})", matcher.glob().glob()),
            Self::Except { rule, unless } => write!(f, "except({rule:?}, unless {unless:?})"),
        }
    }
}

/// Serialized form of a [`Rule`]. A bare string is a literal name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RuleSpec {
    Literal(String),
    Tagged(TaggedRule),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaggedRule {
    Literal(String),
    Regex(String),
    Glob(String),
    Except {
        rule: Box<RuleSpec>,
        unless: Box<RuleSpec>,
    },
}

impl TryFrom<RuleSpec> for Rule {
    type Error = RepoDigestError;

    fn try_from(spec: RuleSpec) -> Result<Self> {
        match spec {
            RuleSpec::Literal(value) | RuleSpec::Tagged(TaggedRule::Literal(value)) => {
                Ok(Rule::literal(value))
            }
            RuleSpec::Tagged(TaggedRule::Regex(pattern)) => Rule::regex(&pattern),
            RuleSpec::Tagged(TaggedRule::Glob(pattern)) => Rule::glob(&pattern),
            RuleSpec::Tagged(TaggedRule::Except { rule, unless }) => Ok(Rule::except(
                Rule::try_from(*rule)?,
                Rule::try_from(*unless)?,
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let spec = RuleSpec::deserialize(deserializer)?;
        Rule::try_from(spec).map_err(serde::de::Error::custom)
    }
}

/// Ordered collection of rules; matches when any member matches.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(Vec<Rule>);

impl RuleSet {
    pub fn matches_any(&self, name: &str) -> bool {
        self.0.iter().any(|rule| rule.matches(name))
    }

    pub fn push(&mut self, rule: Rule) {
        self.0.push(rule);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
