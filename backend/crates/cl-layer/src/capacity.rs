use crate::{LayerError, Result};

use cl_config::{CapacityOverride, PatternKind};

use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;

#[derive(Debug, Clone)]
enum CapacityPattern {
    /// Matches the whole channel name
    Glob(GlobMatcher),
    /// Matches from the start of the channel name
    Regex(Regex),
}

impl CapacityPattern {
    fn matches(&self, channel: &str) -> bool {
        match self {
            Self::Glob(glob) => glob.is_match(channel),
            Self::Regex(regex) => regex.find(channel).is_some_and(|m| m.start() == 0),
        }
    }
}

/// Resolves the capacity of a channel: the first matching override wins,
/// otherwise the default applies.
#[derive(Debug, Clone)]
pub struct CapacityTable {
    default: usize,
    overrides: Vec<(CapacityPattern, usize)>,
}

impl CapacityTable {
    pub fn new(default: usize) -> Self {
        Self {
            default,
            overrides: Vec::new(),
        }
    }

    pub fn from_overrides(default: usize, overrides: &[CapacityOverride]) -> Result<Self> {
        overrides.iter().try_fold(Self::new(default), |table, entry| {
            match entry.kind {
                PatternKind::Glob => table.with_glob(&entry.pattern, entry.capacity),
                PatternKind::Regex => {
                    let regex = Regex::new(&entry.pattern)
                        .map_err(|e| LayerError::invalid_pattern(&entry.pattern, e.to_string()))?;
                    Ok(table.with_regex(regex, entry.capacity))
                }
            }
        })
    }

    /// Append a shell-style glob override (`*`, `?`, `[..]`).
    pub fn with_glob(mut self, pattern: &str, capacity: usize) -> Result<Self> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .map_err(|e| LayerError::invalid_pattern(pattern, e.to_string()))?;
        self.overrides
            .push((CapacityPattern::Glob(glob.compile_matcher()), capacity));
        Ok(self)
    }

    /// Append a precompiled regular expression override.
    pub fn with_regex(mut self, regex: Regex, capacity: usize) -> Self {
        self.overrides.push((CapacityPattern::Regex(regex), capacity));
        self
    }

    pub fn default_capacity(&self) -> usize {
        self.default
    }

    pub fn capacity_for(&self, channel: &str) -> usize {
        self.overrides
            .iter()
            .find(|(pattern, _)| pattern.matches(channel))
            .map(|(_, capacity)| *capacity)
            .unwrap_or(self.default)
    }
}

impl Default for CapacityTable {
    fn default() -> Self {
        Self::new(cl_config::DEFAULT_CAPACITY)
    }
}
