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

//! `Content-Length` framing for Debug Adapter Protocol streams.

use serde::Serialize;
use serde_json::Value;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};

use crate::InspectionError;

/// Largest message body accepted from an adapter
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Longest header line accepted from an adapter
pub const MAX_HEADER_LINE_BYTES: usize = 8 * 1024;

/// Reads framed JSON messages.
#[derive(Debug)]
pub struct DapReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> DapReader<R> {
    /// Wrap a byte stream
    pub fn new(inner: R) -> Self {
        Self { reader: BufReader::new(inner) }
    }

    /// Read the next message. Returns `Ok(None)` when the stream ends between messages.
    pub async fn read_value(&mut self) -> Result<Option<Value>, InspectionError> {
        let mut content_length: Option<usize> = None;
        let mut line = Vec::new();
        let mut started = false;

        loop {
            line.clear();
            let limit = MAX_HEADER_LINE_BYTES as u64 + 1;
            let n = (&mut self.reader).take(limit).read_until(b'\n', &mut line).await?;
            if n == 0 {
                if started {
                    return Err(InspectionError::Protocol(
                        "stream ended inside message headers".to_string(),
                    ));
                }
                return Ok(None);
            }
            started = true;
            if n > MAX_HEADER_LINE_BYTES {
                return Err(InspectionError::Protocol(format!(
                    "header line exceeds {MAX_HEADER_LINE_BYTES} bytes"
                )));
            }
            if line.last() != Some(&b'\n') {
                return Err(InspectionError::Protocol(
                    "stream ended inside message headers".to_string(),
                ));
            }

            let text = String::from_utf8_lossy(&line);
            let trimmed = text.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                break;
            }
            let Some((name, value)) = trimmed.split_once(':') else {
                continue;
            };
            if name.trim().eq_ignore_ascii_case("Content-Length") {
                let value = value.trim();
                let len = value.parse::<usize>().map_err(|e| {
                    InspectionError::Protocol(format!("invalid Content-Length {value:?}: {e}"))
                })?;
                if len > MAX_MESSAGE_BYTES {
                    return Err(InspectionError::Protocol(format!(
                        "message of {len} bytes exceeds the {MAX_MESSAGE_BYTES} byte limit"
                    )));
                }
                content_length = Some(len);
            }
        }

        let Some(len) = content_length else {
            return Err(InspectionError::Protocol("missing Content-Length header".to_string()));
        };

        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf).await?;
        let value = serde_json::from_slice::<Value>(&buf).map_err(|e| {
            InspectionError::Protocol(format!(
                "invalid message body: {}",
                sanitize_json_error_message(&e.to_string())
            ))
        })?;
        Ok(Some(value))
    }
}

/// Writes framed JSON messages.
#[derive(Debug)]
pub struct DapWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> DapWriter<W> {
    /// Wrap a byte sink
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Frame and flush one message
    pub async fn write_message<T: Serialize>(
        &mut self,
        message: &T,
    ) -> Result<(), InspectionError> {
        let bytes = serde_json::to_vec(message)?;
        self.writer
            .write_all(format!("Content-Length: {}\r\n\r\n", bytes.len()).as_bytes())
            .await?;
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Strip string contents out of a serde_json error so debuggee data never reaches the logs.
fn sanitize_json_error_message(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut in_quotes = false;
    let mut redacted_backtick = false;
    let mut in_backticks = false;
    for ch in message.chars() {
        match ch {
            '"' => {
                if !in_quotes {
                    out.push_str("\"<redacted>");
                }
                in_quotes = !in_quotes;
                if !in_quotes {
                    out.push('"');
                }
            }
            '`' if !in_quotes && !redacted_backtick => {
                if in_backticks {
                    out.push_str("<redacted>`");
                    redacted_backtick = true;
                } else {
                    out.push('`');
                }
                in_backticks = !in_backticks;
            }
            _ if in_quotes || in_backticks => {}
            _ => out.push(ch),
        }
    }
    out
}
