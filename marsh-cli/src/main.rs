// This file is part of marsh, a modular POSIX shell.
// Copyright (C) 2025 The marsh developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Entry point of the marsh shell.

use marsh_cli::{run, Config};
use std::process::ExitCode;
use std::process::Termination;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    match Config::from_args(&args) {
        Ok(config) => run(config).report(),
        Err(error) => {
            eprintln!("marsh: {error}");
            ExitCode::from(2)
        }
    }
}
