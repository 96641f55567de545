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

//! Test utilities for integration tests

use std::sync::{Arc, Mutex};

/// Initialization utilities for tests
pub mod init {
    /// Initialize logging for a test
    pub fn init_test_environment() {
        snaptrace_common::logging::ensure_test_logging(None);
    }
}

/// Logging and warning capture utilities for tests
pub mod logging {
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    /// A tracing layer that captures warning and error messages
    #[derive(Debug, Clone, Default)]
    pub struct LogCapture {
        events: Arc<Mutex<Vec<(Level, String)>>>,
    }

    impl LogCapture {
        /// Create a new, empty capture
        pub fn new() -> Self {
            Self::default()
        }

        /// Captured messages at `level`
        pub fn messages(&self, level: Level) -> Vec<String> {
            self.events
                .lock()
                .map(|events| {
                    events.iter().filter(|(l, _)| *l == level).map(|(_, m)| m.clone()).collect()
                })
                .unwrap_or_default()
        }

        /// Captured error messages
        pub fn errors(&self) -> Vec<String> {
            self.messages(Level::ERROR)
        }

        /// Captured warning messages
        pub fn warnings(&self) -> Vec<String> {
            self.messages(Level::WARN)
        }
    }

    impl<S> tracing_subscriber::Layer<S> for LogCapture
    where
        S: tracing::Subscriber,
    {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let level = *event.metadata().level();
            if level > Level::WARN {
                return;
            }

            struct MessageVisitor {
                message: String,
            }

            impl tracing::field::Visit for MessageVisitor {
                fn record_debug(
                    &mut self,
                    field: &tracing::field::Field,
                    value: &dyn std::fmt::Debug,
                ) {
                    if field.name() == "message" {
                        self.message = format!("{value:?}");
                    }
                }

                fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                    if field.name() == "message" {
                        self.message = value.to_string();
                    }
                }
            }

            let mut visitor = MessageVisitor { message: String::new() };
            event.record(&mut visitor);
            if !visitor.message.is_empty() {
                if let Ok(mut events) = self.events.lock() {
                    events.push((level, visitor.message));
                }
            }
        }
    }

    /// Capture warnings and errors logged on the current thread until the guard drops.
    ///
    /// Works with the default current-thread `#[tokio::test]` runtime, which polls
    /// every task on the test thread.
    pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
        let capture = LogCapture::new();
        let subscriber = tracing_subscriber::registry()
            .with(capture.clone())
            .with(tracing_subscriber::fmt::layer().with_test_writer());
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }
}

/// Engine testing utilities
pub mod engine {
    use snaptrace_engine::{
        generate_trace,
        test_utils::{ScriptEnd, ScriptedInspector, ScriptedPause},
        GeneratedTrace, TraceConfig, TraceGenerationAborted,
    };
    use tracing::info;

    use super::logging;

    /// Outcome of one scripted trace generation
    #[derive(Debug)]
    pub struct TraceTestResult {
        /// What `generate_trace` returned
        pub result: Result<GeneratedTrace, TraceGenerationAborted>,
        /// The inspector after the run, for inspecting the issued commands
        pub inspector: ScriptedInspector,
        /// Captured warning messages
        pub warnings: Vec<String>,
        /// Captured error messages
        pub errors: Vec<String>,
    }

    impl TraceTestResult {
        /// The generated trace; panics with the abort reason otherwise
        pub fn trace(&self) -> &GeneratedTrace {
            match &self.result {
                Ok(generated) => generated,
                Err(e) => panic!("trace generation aborted: {e}"),
            }
        }
    }

    /// Replay `pauses` through `generate_trace`
    pub async fn run_trace_test(
        pauses: Vec<ScriptedPause>,
        end: ScriptEnd,
        config: TraceConfig,
    ) -> TraceTestResult {
        let (capture, _guard) = logging::capture_logs();
        info!("Replaying {} scripted pauses", pauses.len());

        let mut inspector = ScriptedInspector::new(pauses).ending_with(end);
        let result = generate_trace(&mut inspector, config).await;

        TraceTestResult {
            result,
            inspector,
            warnings: capture.warnings(),
            errors: capture.errors(),
        }
    }
}
