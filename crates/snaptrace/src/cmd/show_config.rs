// SnapTrace - Execution Snapshot Tracer
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Config command - print the configuration a trace would run with

use eyre::Result;
use serde_json::Value;

use crate::config::FileConfig;

/// Print the effective configuration, with the adapter and launch defaults filled in
pub fn show_config(config: &FileConfig, program: Option<&str>) -> Result<()> {
    let mut effective = config.clone();
    let language = effective.trace.language;
    if let Ok((command, args)) = effective.adapter.command_line(language) {
        effective.adapter.command = Some(command);
        effective.adapter.args = args;
    }
    if let Value::Object(launch) = effective.adapter.launch_arguments(language, program) {
        effective.adapter.launch = launch;
    }
    print!("{}", effective.to_toml_string()?);
    Ok(())
}
