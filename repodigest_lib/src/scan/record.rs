use serde::{Deserialize, Serialize};

use crate::{
    error::{RepoDigestError, Result},
    tokens,
};

/// Constants of the linear relevance heuristic
/// `priority_bonus - depth * depth_penalty + tokens / token_divisor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub priority_bonus: f64,
    pub depth_penalty: f64,
    pub token_divisor: f64,
}

impl ScoreWeights {
    pub fn score(&self, priority: bool, depth: usize, token_count: usize) -> f64 {
        let bonus = if priority { self.priority_bonus } else { 0.0 };
        bonus - depth as f64 * self.depth_penalty + token_count as f64 / self.token_divisor
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.priority_bonus.is_finite() && self.depth_penalty.is_finite()) {
            return Err(RepoDigestError::invalid_config(
                "score weights must be finite numbers",
            ));
        }
        if !(self.token_divisor.is_finite() && self.token_divisor > 0.0) {
            return Err(RepoDigestError::invalid_config(format!(
                "token_divisor must be a positive number, got {}",
                self.token_divisor
            )));
        }
        Ok(())
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            priority_bonus: 100.0,
            depth_penalty: 1.0,
            token_divisor: 100.0,
        }
    }
}

/// One scanned source file: a snapshot of its content plus its ranking data.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    path: String,
    content: String,
    token_count: usize,
    score: f64,
}

impl FileRecord {
    /// Builds a record for `content`, estimating tokens and scoring it.
    pub fn scored(
        path: impl Into<String>,
        content: String,
        depth: usize,
        priority: bool,
        weights: &ScoreWeights,
    ) -> Self {
        let token_count = tokens::estimate_tokens(&content);
        Self {
            path: path.into(),
            score: weights.score(priority, depth, token_count),
            content,
            token_count,
        }
    }

    /// Builds a record from precomputed parts without re-estimating tokens.
    pub fn from_parts(
        path: impl Into<String>,
        content: impl Into<String>,
        token_count: usize,
        score: f64,
    ) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            token_count,
            score,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn score(&self) -> f64 {
        self.score
    }
}
