//! Command-line tooling for zkvote nodes.
//!
//! `digest` prints the admin digest a node pins, `verify` checks a single
//! proof against a key, and `replay` drives the state machine over a file of
//! blocks, one JSON object per line.

use std::{
    env, fs,
    io::{BufRead, BufReader},
    path::Path,
};

use serde::Deserialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zkvote::abci::{Application, RequestBeginBlock, RequestQuery};
use zkvote::plonk::{ProofJson, VerificationKeyJson};
use zkvote::{AppConfig, Proof, PublicSignals, TrustAll, VerificationKey, VotingApp};

fn fatal(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn print_help() {
    println!("Usage: zkvote <digest|verify|replay> ...");
    println!("  digest <vkey.json>");
    println!("  verify <vkey.json> <proof.json> <public.json>");
    println!("  replay <config.json> <blocks.jsonl>");
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(filter);
    let result = if json {
        subscriber.with(fmt::layer().json()).try_init()
    } else {
        subscriber.with(fmt::layer().with_target(true)).try_init()
    };
    if let Err(err) = result {
        fatal(&format!("failed to init logging: {err}"));
    }
}

fn read(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| fatal(&format!("failed to read {path}: {err}")))
}

fn load_key_json(path: &str) -> VerificationKeyJson {
    VerificationKeyJson::parse(&read(path))
        .unwrap_or_else(|err| fatal(&format!("invalid verification key {path}: {err}")))
}

fn cmd_digest(args: Vec<String>) {
    let [path] = args.as_slice() else {
        fatal("Usage: zkvote digest <vkey.json>");
    };
    let digest = load_key_json(path)
        .digest_hex()
        .unwrap_or_else(|err| fatal(&format!("cannot digest {path}: {err}")));
    println!("{digest}");
}

fn cmd_verify(args: Vec<String>) {
    let [vkey, proof, public] = args.as_slice() else {
        fatal("Usage: zkvote verify <vkey.json> <proof.json> <public.json>");
    };
    let key = VerificationKey::try_from(&load_key_json(vkey))
        .unwrap_or_else(|err| fatal(&format!("invalid verification key {vkey}: {err}")));
    let proof = ProofJson::parse(&read(proof))
        .and_then(|json| Proof::try_from(&json))
        .unwrap_or_else(|err| fatal(&format!("invalid proof {proof}: {err}")));
    let public = PublicSignals::parse_json(&read(public))
        .unwrap_or_else(|err| fatal(&format!("invalid public signals {public}: {err}")));
    match zkvote::verify(&key, &proof, &public) {
        Ok(true) => println!("valid"),
        Ok(false) => fatal("invalid"),
        Err(err) => fatal(&format!("invalid: {err}")),
    }
}

#[derive(Debug, Deserialize)]
struct Block {
    height: i64,
    time: i64,
    #[serde(default)]
    txs: Vec<serde_json::Value>,
}

fn tx_bytes(tx: &serde_json::Value) -> Vec<u8> {
    match tx {
        serde_json::Value::String(raw) => raw.clone().into_bytes(),
        other => other.to_string().into_bytes(),
    }
}

fn cmd_replay(args: Vec<String>) {
    let [config_path, blocks_path] = args.as_slice() else {
        fatal("Usage: zkvote replay <config.json> <blocks.jsonl>");
    };
    let config = AppConfig::load(Path::new(config_path))
        .unwrap_or_else(|err| fatal(&format!("{err}")));
    init_logging(&config.log_level, config.log_json);
    let mut app = VotingApp::from_config(&config, Box::new(TrustAll))
        .unwrap_or_else(|err| fatal(&format!("{err}")));
    app.init_chain();

    let file = fs::File::open(blocks_path)
        .unwrap_or_else(|err| fatal(&format!("failed to open {blocks_path}: {err}")));
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.unwrap_or_else(|err| fatal(&format!("read error: {err}")));
        if line.trim().is_empty() {
            continue;
        }
        let block: Block = serde_json::from_str(&line)
            .unwrap_or_else(|err| fatal(&format!("line {}: {err}", lineno + 1)));
        app.begin_block(RequestBeginBlock {
            height: block.height,
            time: block.time,
        });
        for (i, tx) in block.txs.iter().enumerate() {
            let res = app.deliver_tx(&tx_bytes(tx), block.time);
            if res.is_ok() {
                let kind = res.events.first().map(|e| e.kind.as_str()).unwrap_or("");
                println!("block {} tx {i}: ok {kind}", block.height);
            } else {
                println!("block {} tx {i}: code {} {}", block.height, res.code, res.log);
            }
        }
        app.end_block(block.height);
        let commit = app.commit();
        println!(
            "block {} committed: {}",
            block.height,
            String::from_utf8_lossy(&commit.data)
        );
    }
    let root = app.query(&RequestQuery::new("root", Vec::new()));
    println!("root: {}", String::from_utf8_lossy(&root.value));
    let total = app.query(&RequestQuery::new("getResult", Vec::new()));
    println!("result: {}", String::from_utf8_lossy(&total.value));
}

fn main() {
    let mut args = env::args().skip(1);
    let command = args.next();
    match command.as_deref() {
        Some("digest") => {
            init_logging("warn", false);
            cmd_digest(args.collect());
        }
        Some("verify") => {
            init_logging("warn", false);
            cmd_verify(args.collect());
        }
        Some("replay") => cmd_replay(args.collect()),
        Some("-h") | Some("--help") => print_help(),
        _ => {
            print_help();
            std::process::exit(1);
        }
    }
}
