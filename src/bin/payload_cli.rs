//! payload-cli — 离线转码请求、解析响应用量的命令行工具
//!
//! Usage:
//!   payload-cli transcode <parser> <request.json> [--header k=v]...   Transcode a request body
//!   payload-cli usage <parser> <response-file> [--stream]             Extract usage from a response
//!   payload-cli list                                                   List available parsers

use anyhow::{bail, Context};
use base64::Engine as _;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use ai_payload_rust::{default_registry, ParsedPayload, Parser, PayloadConfig};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "transcode" => cmd_transcode(&args[2..]),
        "usage" => cmd_usage(&args[2..]),
        "list" => cmd_list(),
        "version" | "--version" | "-V" => {
            println!("payload-cli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"payload-cli — 载荷转码命令行工具

USAGE:
    payload-cli <COMMAND> [OPTIONS]

COMMANDS:
    transcode <parser> <request.json> [--header k=v]...
                                Parse a request body and print the forwarded payload
    usage <parser> <response-file> [--stream]
                                Extract token usage from a backend response or chunk
    list                        List available parsers
    version                     Show version information
    help                        Show this help message

PARSERS:
    "default" selects the parser configured through the environment

ENVIRONMENT:
    AI_PAYLOAD_PARSER               Default parser (openai-parser | vllm-grpc-parser)
    AI_PAYLOAD_DEFAULT_MAX_TOKENS   max_tokens used when a request omits it
    AI_PAYLOAD_REQUEST_ID_HEADER    Header carrying the request id
    RUST_LOG                        Log filter, e.g. ai_payload_rust=debug"#
    );
}

fn resolve_parser(name: &str) -> anyhow::Result<Arc<dyn Parser>> {
    if name == "default" {
        let config = PayloadConfig::from_env()?;
        return Ok(Arc::from(config.build_parser()));
    }
    Ok(default_registry().require(name)?)
}

fn read_file(path: &str) -> anyhow::Result<Vec<u8>> {
    std::fs::read(Path::new(path)).with_context(|| format!("reading {path}"))
}

fn cmd_transcode(args: &[String]) -> anyhow::Result<()> {
    let (Some(parser_name), Some(path)) = (args.first(), args.get(1)) else {
        bail!("usage: payload-cli transcode <parser> <request.json> [--header k=v]...");
    };

    let mut headers = HashMap::new();
    let mut rest = args[2..].iter();
    while let Some(arg) = rest.next() {
        if arg != "--header" {
            bail!("unexpected argument: {arg}");
        }
        let Some((k, v)) = rest.next().and_then(|kv| kv.split_once('=')) else {
            bail!("--header expects k=v");
        };
        headers.insert(k.trim().to_ascii_lowercase(), v.trim().to_string());
    }

    let parser = resolve_parser(parser_name)?;
    let body = read_file(path)?;
    let parsed = parser.parse_request(&headers, &body)?;

    let payload = match &parsed.payload {
        ParsedPayload::Json(map) => serde_json::json!({ "json": map }),
        ParsedPayload::Binary(bytes) => serde_json::json!({
            "protobuf_base64": base64::engine::general_purpose::STANDARD.encode(bytes),
            "bytes": bytes.len(),
        }),
    };
    let out = serde_json::json!({
        "parser": parser.typed_name(),
        "model": parsed.model,
        "chat_completions": parsed.chat_completions.is_some(),
        "payload": payload,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_usage(args: &[String]) -> anyhow::Result<()> {
    let (Some(parser_name), Some(path)) = (args.first(), args.get(1)) else {
        bail!("usage: payload-cli usage <parser> <response-file> [--stream]");
    };
    let stream = args[2..].iter().any(|a| a == "--stream");

    let parser = resolve_parser(parser_name)?;
    let body = read_file(path)?;
    let parsed = if stream {
        parser.parse_stream_response(&body)?
    } else {
        parser.parse_response(&body)?
    };
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

fn cmd_list() -> anyhow::Result<()> {
    for name in default_registry().names() {
        println!("{name}");
    }
    Ok(())
}
