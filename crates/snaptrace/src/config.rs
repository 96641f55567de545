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

//! Configuration file for the `snaptrace` binary.
//!
//! ```toml
//! [trace]
//! language = "python"
//! max_steps = 5000
//!
//! [adapter]
//! command = "python3"
//! args = ["-m", "debugpy.adapter"]
//! launch = { program = "demo.py", justMyCode = true }
//!
//! [[adapter.breakpoints]]
//! path = "demo.py"
//! lines = [1]
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use eyre::{bail, eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use snaptrace_engine::{Language, SourceBreakpoints, TraceConfig};
use tracing::debug;

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "snaptrace.toml";

/// Everything the configuration file can hold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Trace generation settings
    pub trace: TraceConfig,
    /// Debug adapter settings
    pub adapter: AdapterConfig,
}

/// How to start the debug adapter and the debuggee
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterConfig {
    /// Adapter executable; the language default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Adapter arguments
    pub args: Vec<String>,
    /// Extra `launch` request arguments, passed to the adapter verbatim
    pub launch: Map<String, Value>,
    /// Breakpoints installed before the debuggee starts running
    pub breakpoints: Vec<SourceBreakpoints>,
}

impl FileConfig {
    /// Parse a configuration document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| eyre!("invalid configuration: {}", e.message()))
    }

    /// Read a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read configuration file {}", path.display()))?;
        Self::from_toml_str(&text).wrap_err_with(|| format!("in {}", path.display()))
    }

    /// Load the configuration file found by [`locate_config`], or the defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match locate_config(explicit)? {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            None => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Render as a TOML document
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).wrap_err("cannot render configuration")
    }
}

/// Find the configuration file: `explicit`, else `./snaptrace.toml`, else the user's
/// `snaptrace/config.toml`.
///
/// An explicit path that does not exist is an error; missing implicit files are not.
pub fn locate_config(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("configuration file {} does not exist", path.display());
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.is_file() {
        return Ok(Some(local));
    }

    Ok(dirs::config_dir()
        .map(|dir| dir.join("snaptrace").join("config.toml"))
        .filter(|path| path.is_file()))
}

impl AdapterConfig {
    /// Replace command and arguments with a whitespace-separated command line
    pub fn set_command_line(&mut self, line: &str) -> Result<()> {
        let mut words = line.split_whitespace().map(str::to_string);
        let Some(command) = words.next() else {
            bail!("the adapter command line is empty");
        };
        self.command = Some(command);
        self.args = words.collect();
        Ok(())
    }

    /// Executable and arguments that start the adapter for `language`
    pub fn command_line(&self, language: Language) -> Result<(String, Vec<String>)> {
        match (&self.command, language) {
            (Some(command), _) => Ok((command.clone(), self.args.clone())),
            (None, Language::Python) => Ok((
                "python3".to_string(),
                vec!["-m".to_string(), "debugpy.adapter".to_string()],
            )),
            (None, Language::Java) => bail!(
                "no debug adapter configured for java; set `adapter.command` or pass --adapter"
            ),
        }
    }

    /// `launch` request arguments: language defaults, then the configured values, then
    /// the program given on the command line
    pub fn launch_arguments(&self, language: Language, program: Option<&str>) -> Value {
        let mut launch = match language {
            Language::Python => json!({
                "type": "python",
                "request": "launch",
                "console": "internalConsole",
                "justMyCode": true,
                "stopOnEntry": true,
            }),
            Language::Java => json!({
                "type": "java",
                "request": "launch",
                "stopOnEntry": true,
            }),
        };
        if let Value::Object(defaults) = &mut launch {
            defaults.extend(self.launch.clone());
            if let Some(program) = program {
                let key = match language {
                    Language::Python => "program",
                    Language::Java => "mainClass",
                };
                defaults.insert(key.to_string(), Value::String(program.to_string()));
            }
        }
        launch
    }
}

/// Adapter id sent in the `initialize` request
pub fn adapter_id(language: Language) -> &'static str {
    match language {
        Language::Python => "debugpy",
        Language::Java => "java",
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_parse_full_document() {
        let config = FileConfig::from_toml_str(
            r#"
            [trace]
            language = "java"
            max_steps = 50
            declaration_lines = [3]

            [adapter]
            command = "java-debug"
            args = ["--stdio"]
            launch = { mainClass = "Main", classPaths = ["out"] }

            [[adapter.breakpoints]]
            path = "Main.java"
            lines = [4, 9]
            "#,
        )
        .unwrap();

        assert_eq!(config.trace.language, Language::Java);
        assert_eq!(config.trace.max_steps, 50);
        assert_eq!(config.adapter.command.as_deref(), Some("java-debug"));
        assert_eq!(config.adapter.launch["classPaths"], json!(["out"]));
        assert_eq!(
            config.adapter.breakpoints,
            vec![SourceBreakpoints { path: "Main.java".into(), lines: vec![4, 9] }]
        );
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(FileConfig::from_toml_str("").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = FileConfig::from_toml_str("[trace]\nmax_step = 3\n").unwrap_err();
        assert!(err.to_string().contains("max_step"));
    }

    #[test]
    fn test_launch_arguments_layering() {
        let mut adapter = AdapterConfig::default();
        adapter.launch.insert("justMyCode".to_string(), json!(false));
        adapter.launch.insert("program".to_string(), json!("from_file.py"));

        let launch = adapter.launch_arguments(Language::Python, Some("cli.py"));
        assert_eq!(launch["justMyCode"], json!(false));
        assert_eq!(launch["program"], json!("cli.py"));
        assert_eq!(launch["request"], json!("launch"));

        let launch = adapter.launch_arguments(Language::Java, Some("Main"));
        assert_eq!(launch["mainClass"], json!("Main"));
    }

    #[test]
    fn test_adapter_command_line() {
        let mut adapter = AdapterConfig::default();
        let (command, args) = adapter.command_line(Language::Python).unwrap();
        assert_eq!(command, "python3");
        assert_eq!(args, vec!["-m", "debugpy.adapter"]);
        assert!(adapter.command_line(Language::Java).is_err());

        adapter.set_command_line("  node  adapter.js --stdio ").unwrap();
        let (command, args) = adapter.command_line(Language::Java).unwrap();
        assert_eq!(command, "node");
        assert_eq!(args, vec!["adapter.js", "--stdio"]);

        assert!(adapter.set_command_line("   ").is_err());
    }

    #[test]
    fn test_toml_rendering_reloads() {
        let mut config = FileConfig::default();
        config.adapter.set_command_line("python3 -m debugpy.adapter").unwrap();
        config.trace.max_heap_nodes = 12;

        let text = config.to_toml_string().unwrap();
        assert_eq!(FileConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    #[serial]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(locate_config(Some(&missing)).is_err());

        let present = dir.path().join("present.toml");
        fs::write(&present, "[trace]\nmax_steps = 7\n").unwrap();
        assert_eq!(locate_config(Some(&present)).unwrap(), Some(present.clone()));
        assert_eq!(FileConfig::discover(Some(&present)).unwrap().trace.max_steps, 7);
    }

    #[test]
    #[serial]
    fn test_local_config_is_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[trace]\nlanguage = \"java\"\n").unwrap();

        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let located = locate_config(None);
        let config = FileConfig::discover(None);
        std::env::set_current_dir(previous).unwrap();

        assert_eq!(located.unwrap(), Some(PathBuf::from(DEFAULT_CONFIG_FILE)));
        assert_eq!(config.unwrap().trace.language, Language::Java);
    }
}
