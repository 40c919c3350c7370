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

//! # StageGit Test Utilities
//!
//! Shared fixtures for StageGit integration tests: pre-seeded in-memory
//! repositories covering the common shapes (single branch, clean
//! divergence, conflicting divergence).

pub mod fixtures;

pub use fixtures::{basic_repo, conflicting_repo, diverged_repo, DivergedRepo};
