use std::io::{IsTerminal, Write};
use std::net::SocketAddr;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hvaclink::frame::{encode_to_string, Delimiters, Packet};
use serde::Serialize;

/// How `send --wait` prints the response packet.
#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    /// The packet exactly as it appeared on the wire.
    Raw,
}

impl OutputFormat {
    /// Tables for people, JSON for pipes.
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    command: &'a str,
    data: &'a str,
    wire: &'a str,
    server: String,
}

pub fn print_packet(
    packet: &Packet,
    server: SocketAddr,
    delimiters: &Delimiters,
    format: OutputFormat,
) {
    let wire = encode_to_string(packet.command(), packet.data(), delimiters);
    match format {
        OutputFormat::Json => {
            let out = ResponseOutput {
                command: packet.command(),
                data: packet.data(),
                wire: &wire,
                server: server.to_string(),
            };
            match serde_json::to_string(&out) {
                Ok(json) => println!("{json}"),
                Err(err) => eprintln!("error: response not serializable: {err}"),
            }
        }
        OutputFormat::Table => {
            let server = server.to_string();
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "DATA", "SERVER"])
                .add_row(vec![packet.command(), packet.data(), server.as_str()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{packet} from {server}");
        }
        OutputFormat::Raw => {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(wire.as_bytes());
            let _ = out.flush();
        }
    }
}
