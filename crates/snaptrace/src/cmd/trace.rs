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

//! Trace command - launch the debuggee under its adapter and write the trace

use std::{fs, path::Path};

use eyre::{Result, WrapErr};
use snaptrace_common::types::BackendTrace;
use snaptrace_engine::{
    generate_trace, DapClient, InspectionService, TraceGenerationAborted, TraceSummary,
};
use tracing::{info, warn};

use crate::config::{adapter_id, FileConfig};

/// Trace `program` (or the program named in the `launch` table) to completion
pub async fn trace_program(
    config: FileConfig,
    program: Option<&str>,
    output: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    let language = config.trace.language;
    let (command, args) = config.adapter.command_line(language)?;
    let launch = config.adapter.launch_arguments(language, program);

    // Step 1: bring the debuggee up to its first pause
    let mut client = DapClient::spawn(&command, &args, config.trace.request_timeout())
        .map_err(TraceGenerationAborted::startup)?;
    if let Err(e) = client.start(adapter_id(language), launch, &config.adapter.breakpoints).await
    {
        if let Err(e) = client.shutdown().await {
            warn!("Failed to stop the debug adapter: {e}");
        }
        return Err(TraceGenerationAborted::startup(e).into());
    }

    // Step 2: step through the program
    let generated = generate_trace(&mut client, config.trace).await?;
    log_summary(&generated.summary, generated.trace.len());

    // Step 3: write the trace
    write_trace(&generated.trace, output, pretty)
}

fn log_summary(summary: &TraceSummary, kept: usize) {
    info!(
        "Trace complete: {} pauses seen, {} snapshots kept, {} duplicates removed, \
         {} diagnostics{}",
        summary.pauses,
        kept,
        summary.duplicates_removed,
        summary.diagnostics.len(),
        if summary.truncated { " (truncated at the step limit)" } else { "" }
    );
}

/// Write the JSON trace to `output`, or to stdout
pub fn write_trace(trace: &BackendTrace, output: Option<&Path>, pretty: bool) -> Result<()> {
    let mut json = trace.to_json_string(pretty).wrap_err("cannot serialize the trace")?;
    json.push('\n');
    match output {
        Some(path) => {
            fs::write(path, json)
                .wrap_err_with(|| format!("cannot write the trace to {}", path.display()))?;
            info!("Trace written to {}", path.display());
        }
        None => print!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use snaptrace_common::types::{BackendTraceElem, Heap, StackElem, Value};

    use super::*;

    fn sample_trace() -> BackendTrace {
        let mut stack = StackElem::new("<module>", 1);
        stack.locals.insert("x".to_string(), Value::Int(5));
        BackendTrace::from(vec![BackendTraceElem::new(2, vec![stack], Heap::new())])
    }

    #[test]
    fn test_write_trace_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.json");

        write_trace(&sample_trace(), Some(&path), true).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(BackendTrace::from_json_str(&text).unwrap(), sample_trace());
    }

    #[test]
    fn test_write_trace_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("trace.json");

        let err = write_trace(&sample_trace(), Some(&path), false).unwrap_err();
        assert!(format!("{err:#}").contains("cannot write the trace"));
    }
}
