use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use serde::Serialize;

const MAX_PREVIEW_CHARS: usize = 256;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Raw
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReceivedOutput {
    size: usize,
    payload: String,
    timestamp: String,
}

#[derive(Serialize)]
struct SentOutput {
    sent: usize,
    timestamp: String,
}

pub fn print_received(payload: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReceivedOutput {
                size: payload.len(),
                payload: payload_preview(payload),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Raw => print_raw(payload),
    }
}

pub fn print_sent(size: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SentOutput {
                sent: size,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Raw => println!("sent {size} bytes"),
    }
}

fn print_raw(payload: &[u8]) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(payload);
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    if text.chars().count() > MAX_PREVIEW_CHARS {
        text.chars().take(MAX_PREVIEW_CHARS).collect()
    } else {
        text.into_owned()
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
