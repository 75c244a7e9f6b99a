use std::io::IsTerminal;

use ahdlc_frame::{DecodeStats, Diagnostic};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
pub struct EncodeOutput {
    pub payload_size: usize,
    pub frame_size: usize,
    pub payload: String,
    pub frame: String,
}

#[derive(Serialize)]
pub struct StatsOutput {
    pub frames: u64,
    pub checksum_errors: u64,
    pub overflows: u64,
    pub resyncs: u64,
    pub discarded_bytes: u64,
}

impl From<DecodeStats> for StatsOutput {
    fn from(stats: DecodeStats) -> Self {
        Self {
            frames: stats.frames,
            checksum_errors: stats.checksum_errors,
            overflows: stats.overflows,
            resyncs: stats.resyncs,
            discarded_bytes: stats.discarded_bytes,
        }
    }
}

#[derive(Serialize)]
pub struct DecodeOutput {
    pub input_size: usize,
    pub frames: Vec<String>,
    pub stats: StatsOutput,
    pub last_diagnostic: Option<String>,
}

impl DecodeOutput {
    pub fn new(
        input_size: usize,
        frames: &[Vec<u8>],
        stats: DecodeStats,
        last: Option<Diagnostic>,
    ) -> Self {
        Self {
            input_size,
            frames: frames.iter().map(|f| hex(f)).collect(),
            stats: stats.into(),
            last_diagnostic: last.map(|d| d.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StressOutput {
    pub passed: bool,
    pub iterations: u64,
    pub channels: usize,
    pub payload_size: usize,
    pub seed: u64,
    pub elapsed_ms: u128,
}

/// Uppercase, space-separated hex bytes.
pub fn hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{byte:02X}"));
    }
    out
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn print_encode(out: &EncodeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table();
            table
                .set_header(vec!["FIELD", "SIZE", "BYTES"])
                .add_row(vec![
                    "payload".to_string(),
                    out.payload_size.to_string(),
                    out.payload.clone(),
                ])
                .add_row(vec![
                    "frame".to_string(),
                    out.frame_size.to_string(),
                    out.frame.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("Unencoded HDLC frame: {}", out.payload);
            println!("Encoded   HDLC frame: {}", out.frame);
        }
    }
}

pub fn print_decode(out: &DecodeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut frames = new_table();
            frames.set_header(vec!["#", "SIZE", "PAYLOAD"]);
            for (i, frame) in out.frames.iter().enumerate() {
                let size = frame.split_whitespace().count();
                frames.add_row(vec![i.to_string(), size.to_string(), frame.clone()]);
            }
            println!("{frames}");

            let mut stats = new_table();
            stats
                .set_header(vec!["STAT", "VALUE"])
                .add_row(vec!["frames".to_string(), out.stats.frames.to_string()])
                .add_row(vec![
                    "checksum_errors".to_string(),
                    out.stats.checksum_errors.to_string(),
                ])
                .add_row(vec!["overflows".to_string(), out.stats.overflows.to_string()])
                .add_row(vec!["resyncs".to_string(), out.stats.resyncs.to_string()])
                .add_row(vec![
                    "discarded_bytes".to_string(),
                    out.stats.discarded_bytes.to_string(),
                ]);
            println!("{stats}");
        }
        OutputFormat::Pretty => {
            for frame in &out.frames {
                println!("Decoded HDLC frame: {frame}");
            }
            if let Some(diag) = &out.last_diagnostic {
                println!("last diagnostic: {diag}");
            }
            println!(
                "frames={} checksum_errors={} overflows={} resyncs={} discarded={}",
                out.stats.frames,
                out.stats.checksum_errors,
                out.stats.overflows,
                out.stats.resyncs,
                out.stats.discarded_bytes
            );
        }
    }
}

pub fn print_stress(out: &StressOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table();
            table
                .set_header(vec!["RESULT", "ITERATIONS", "CHANNELS", "SIZE", "SEED", "ELAPSED"])
                .add_row(vec![
                    status(out.passed).to_string(),
                    out.iterations.to_string(),
                    out.channels.to_string(),
                    out.payload_size.to_string(),
                    out.seed.to_string(),
                    format!("{}ms", out.elapsed_ms),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "CURRENT STATUS: {} ({} iterations, {} channels, {} byte payloads, seed {}, {}ms)",
                status(out.passed),
                out.iterations,
                out.channels,
                out.payload_size,
                out.seed,
                out.elapsed_ms
            );
        }
    }
}

fn status(passed: bool) -> &'static str {
    if passed {
        "PASSED"
    } else {
        "FAILED"
    }
}
