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

//! Pre-seeded in-memory repositories for integration tests

use stagegit_core::{Driver, MemoryDriver};

/// A repository seeded with two branches sharing a common ancestor
pub struct DivergedRepo {
    /// The seeded driver
    pub driver: MemoryDriver,

    /// Branch being merged into ("main")
    pub base_branch: String,

    /// Branch being merged ("feature")
    pub head_branch: String,
}

/// A single `main` branch with a handful of files
///
/// Tree: `README.md`, `src/lib.rs`, `docs/guide.md`.
pub async fn basic_repo() -> MemoryDriver {
    let driver = MemoryDriver::new();
    driver
        .seed_branch(
            "main",
            &[
                ("README.md", "# Fixture\n"),
                ("src/lib.rs", "pub fn fixture() {}\n"),
                ("docs/guide.md", "Read the fixture.\n"),
            ],
        )
        .await
        .expect("seeding basic repo");
    driver
}

/// `main` and `feature` diverged with only independent, auto-mergeable edits
///
/// After the shared root commit, `main` adds `main-only.txt` and `feature`
/// adds `feature-only.txt`; `shared.txt` is untouched on both sides.
pub async fn diverged_repo() -> DivergedRepo {
    let driver = MemoryDriver::new();
    driver
        .seed_branch("main", &[("shared.txt", "shared v1\n")])
        .await
        .expect("seeding root");
    driver
        .create_branch("main", "feature")
        .await
        .expect("branching feature");

    driver
        .commit_files("main", &[("main-only.txt", "from main\n")], &[], "main adds a file")
        .await
        .expect("advancing main");
    driver
        .commit_files(
            "feature",
            &[("feature-only.txt", "from feature\n")],
            &[],
            "feature adds a file",
        )
        .await
        .expect("advancing feature");

    DivergedRepo {
        driver,
        base_branch: "main".to_string(),
        head_branch: "feature".to_string(),
    }
}

/// `main` and `feature` diverged with one genuine conflict
///
/// Both sides rewrite `shared.txt` differently; each side also makes one
/// independent edit (`main-only.txt` added on main, `feature-only.txt`
/// added on feature).
pub async fn conflicting_repo() -> DivergedRepo {
    let driver = MemoryDriver::new();
    driver
        .seed_branch("main", &[("shared.txt", "shared v1\n")])
        .await
        .expect("seeding root");
    driver
        .create_branch("main", "feature")
        .await
        .expect("branching feature");

    driver
        .commit_files(
            "main",
            &[("shared.txt", "main version\n"), ("main-only.txt", "from main\n")],
            &[],
            "main rewrites shared",
        )
        .await
        .expect("advancing main");
    driver
        .commit_files(
            "feature",
            &[
                ("shared.txt", "feature version\n"),
                ("feature-only.txt", "from feature\n"),
            ],
            &[],
            "feature rewrites shared",
        )
        .await
        .expect("advancing feature");

    DivergedRepo {
        driver,
        base_branch: "main".to_string(),
        head_branch: "feature".to_string(),
    }
}
