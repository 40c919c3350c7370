// StageGit - Remote-Backed Working Copies
// Copyright (C) 2026 StageGit Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Engine configuration

use serde::{Deserialize, Serialize};

/// Default page size for commit listing when a driver gets no limit
pub const DEFAULT_COMMIT_LIMIT: usize = 50;

/// Configuration for engine bootstrap and listing defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Branch names tried in order by `initialize`, before falling back to
    /// the first branch the driver reports
    #[serde(default = "default_preferred_branches")]
    pub preferred_branches: Vec<String>,

    /// Commit-listing page size drivers should apply when the caller sets
    /// no explicit limit
    #[serde(default = "default_commit_limit")]
    pub commit_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preferred_branches: default_preferred_branches(),
            commit_limit: default_commit_limit(),
        }
    }
}

fn default_preferred_branches() -> Vec<String> {
    vec!["master".to_string(), "main".to_string()]
}

fn default_commit_limit() -> usize {
    DEFAULT_COMMIT_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.preferred_branches, vec!["master", "main"]);
        assert_eq!(config.commit_limit, DEFAULT_COMMIT_LIMIT);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());

        let config: EngineConfig =
            serde_json::from_str(r#"{"preferred_branches": ["trunk"]}"#).unwrap();
        assert_eq!(config.preferred_branches, vec!["trunk"]);
        assert_eq!(config.commit_limit, DEFAULT_COMMIT_LIMIT);
    }
}
