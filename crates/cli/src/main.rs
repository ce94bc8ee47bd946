// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fleet Bench agent entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    fleet_bench_cli::run()
}
