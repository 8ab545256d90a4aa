//! Offline check of the voice pipeline
//!
//! Usage: transcribe_move [--moves "e2e4 e7e5"] [transcript words...]
//!
//! Without a transcript on the command line, reads one per line from stdin.

use std::io::{self, BufRead};

use shakmaty::Chess;
use tracing_subscriber::EnvFilter;
use voice_chess_core::{resolve_move, BoardLike, MoveToken, VoiceParser};

fn usage() -> ! {
    eprintln!("Usage: transcribe_move [--moves \"e2e4 e7e5\"] [transcript...]");
    std::process::exit(1);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let mut moves = None;
    let mut words = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--moves" => moves = Some(args.next().unwrap_or_else(|| usage())),
            "-h" | "--help" => usage(),
            _ => words.push(arg),
        }
    }

    let mut board = Chess::default();
    for uci in moves.iter().flat_map(|m| m.split_whitespace()) {
        let applied = uci
            .parse::<MoveToken>()
            .and_then(|token| board.apply_token(&token));
        if let Err(e) = applied {
            eprintln!("Cannot set up position: {}", e);
            std::process::exit(1);
        }
    }

    let parser = VoiceParser::default();
    if !words.is_empty() {
        report(&parser, &board, &words.join(" "));
        return;
    }

    for line in io::stdin().lock().lines() {
        match line {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => report(&parser, &board, &line),
            Err(e) => {
                eprintln!("Failed to read stdin: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn report(parser: &VoiceParser, board: &Chess, transcript: &str) {
    let trace = parser.trace(transcript);
    let tokens: Vec<&str> = trace.tokens.iter().map(|t| t.as_str()).collect();

    println!("transcript: {}", trace.transcript);
    println!("tokens:     {}", tokens.join(" "));
    match &trace.result {
        Ok(command) => {
            println!("command:    {:?}", command);
            if let Some(san) = trace.san() {
                println!("san:        {}", san);
            }
            match resolve_move(command, board) {
                Ok(token) => println!("uci:        {}", token),
                Err(e) => println!("invalid:    {}", e),
            }
        }
        Err(e) => println!("no parse:   {} [{}] {}", e, e.stage(), e.hint()),
    }
    println!();
}
