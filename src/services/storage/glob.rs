//! Glob pattern lists for storage paths.
//!
//! Patterns are compiled with `globset` using literal separators:
//!
//! - `*` and `?` never cross a `/`
//! - `**` crosses segments, and `**/` also matches zero segments
//! - `[abc]`, `[a-z]`, `[!abc]` / `[^abc]` match one character from a set

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// A compiled list of patterns; a path matches if any pattern does.
#[derive(Debug, Clone)]
pub struct GlobList {
    patterns: Vec<String>,
    set: GlobSet,
}

impl GlobList {
    /// Compile `patterns` into one matcher.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first pattern that does not parse.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = GlobBuilder::new(&pattern.replace("[^", "[!"))
                .literal_separator(true)
                .build()
                .with_context(|| format!("invalid glob pattern {:?}", pattern))?;
            builder.add(glob);
        }

        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            set: builder.build().context("Failed to compile glob patterns")?,
        })
    }

    /// A list matching nothing.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    /// The patterns as written.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check `path` against every pattern. The empty path never matches.
    pub fn is_match(&self, path: &str) -> bool {
        !path.is_empty() && self.set.is_match(path)
    }
}

impl Default for GlobList {
    fn default() -> Self {
        Self::empty()
    }
}
