#![forbid(unsafe_code)]

//! `chat-herald-ctl`: local CLI companion for `chat-herald`.
//!
//! Connects to the IPC socket and sends JSON commands to the server.

use std::io::{BufRead, BufReader, Write};

use clap::{Parser, Subcommand};
use interprocess::local_socket::{traits::Stream as _, GenericNamespaced, Stream, ToNsName};

#[derive(Debug, Parser)]
#[command(
    name = "chat-herald-ctl",
    about = "Local CLI for the chat-herald server",
    version,
    long_about = None
)]
struct Cli {
    /// IPC socket name (must match the server's `ipc_name` config).
    #[arg(long, default_value = "chat-herald")]
    ipc_name: String,

    /// Shared secret, when the server was started with one.
    #[arg(long, env = "CHAT_HERALD_IPC_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show queue, processor, speech and source status.
    Status,

    /// Start (or restart) monitoring a token.
    Start {
        /// Token address.
        token_address: String,
        /// Optional display name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Stop monitoring.
    Stop,
}

fn main() {
    let args = Cli::parse();

    let mut request_json = match &args.command {
        Command::Status => serde_json::json!({ "command": "status" }),
        Command::Start {
            token_address,
            name,
        } => {
            let mut req = serde_json::json!({ "command": "start", "token_address": token_address });
            if let Some(n) = name {
                req["token_name"] = serde_json::Value::String(n.clone());
            }
            req
        }
        Command::Stop => serde_json::json!({ "command": "stop" }),
    };
    if let Some(ref token) = args.auth_token {
        request_json["auth_token"] = serde_json::Value::String(token.clone());
    }

    match send_ipc_command(&args.ipc_name, &request_json) {
        Ok(response) => {
            if let Some(obj) = response.as_object() {
                let ok = obj
                    .get("ok")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false);
                if ok {
                    if let Some(data) = obj.get("data") {
                        println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
                    } else {
                        println!("OK");
                    }
                } else {
                    let err_msg = obj
                        .get("error")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown error");
                    eprintln!("Error: {err_msg}");
                    std::process::exit(1);
                }
            } else {
                println!("{response}");
            }
        }
        Err(err) => {
            eprintln!("Failed to connect to server: {err}");
            eprintln!("Is chat-herald running with ipc_name '{}'?", args.ipc_name);
            std::process::exit(1);
        }
    }
}

/// Connect to the IPC socket, send a JSON command, and read the response.
fn send_ipc_command(
    ipc_name: &str,
    request: &serde_json::Value,
) -> std::result::Result<serde_json::Value, Box<dyn std::error::Error>> {
    let name = ipc_name.to_ns_name::<GenericNamespaced>()?;
    let mut stream = Stream::connect(name)?;

    let mut request_line = serde_json::to_string(request)?;
    request_line.push('\n');
    stream.write_all(request_line.as_bytes())?;
    stream.flush()?;

    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader.read_line(&mut response_line)?;

    let response: serde_json::Value = serde_json::from_str(response_line.trim())?;
    Ok(response)
}
