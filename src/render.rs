//! Terminal presentation collaborators: chain rendering, the stdin nonce
//! provider and the notifier. Everything here is a thin wrapper over the
//! core's plain status values.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use crate::blockchain::{Block, Chain};
use crate::integrity::{BlockStatus, NonceProvider};
use crate::mining::{AttemptOutcome, AttemptResult, MiningSession};
use crate::notify::Notifier;

const RULE: &str = "========================================================================";

/// ASCII BEL: the audible cue for a qualifying hash.
fn bell() {
    print!("\x07");
    let _ = io::stdout().flush();
}

/// Read one trimmed line from stdin; `None` on EOF or I/O error.
pub fn read_line() -> Option<String> {
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

pub fn prompt(text: &str) -> Option<String> {
    print!("{text}");
    let _ = io::stdout().flush();
    read_line()
}

/// Decimal nonce in u32 range; anything else is rejected and re-prompted
/// by the caller, never panicked on.
pub fn parse_nonce(input: &str) -> Option<u32> {
    input.parse::<u32>().ok()
}

pub fn print_invalid_nonce() {
    println!("  !! must be a decimal integer between 0 and 4294967295 (2^32-1)");
}

fn box_line(content: String) {
    println!("| {content:<75} |");
}

fn print_block(block: &Block, ok: bool, difficulty: u32) {
    let status = if ok { "OK" } else { "BROKEN" };
    let border = format!("+{}+", "-".repeat(77));
    println!("{border}");
    box_line(format!(
        "idx: {:<4} ts: {:<10} status: {:<7} difficulty: {}",
        block.height, block.timestamp, status, difficulty
    ));
    box_line(format!("name     : {}", block.name));
    box_line(format!("prev_hash: {}", block.previous_hash.to_hex()));
    box_line(format!("merkle   : {}", block.merkle_root.to_hex()));
    box_line(format!("nonce    : {}", block.nonce));
    box_line(format!("hash     : {}", block.hash.to_hex()));
    println!("{border}");
}

/// Render the whole chain with cascading breakage: once one block is
/// unhealthy, everything after it displays as broken too.
pub fn print_chain(chain: &Chain) {
    println!("{RULE}");
    println!("  Chain integrity (teaching demo)");
    println!("{RULE}");
    println!(
        "Blocks: {} | Difficulty: {} (leading zero nibbles)",
        chain.len(),
        chain.difficulty()
    );
    println!();

    let mut cascade_broken = false;
    let mut first_broken = None;
    for (i, block) in chain.blocks().iter().enumerate() {
        let ok = !cascade_broken && chain.block_ok(i);
        if !ok && !cascade_broken {
            cascade_broken = true;
            first_broken = Some(i);
        }
        print_block(block, ok, chain.difficulty());
    }
    println!();
    match first_broken {
        Some(i) => println!("!! chain broken starting at block {i}"),
        None => println!("chain intact"),
    }
    println!();
}

pub fn print_mining_intro(block: &Block, budget: Duration, difficulty: u32, path: &str) {
    println!("{RULE}");
    println!("  Bitcoin mining simulator (teaching demo)");
    println!("{RULE}");
    println!("Block source: {path}");
    println!("Assigned block:");
    println!("  name:      {}", block.name);
    println!("  height:    {}", block.height);
    println!("  version:   {}", block.version);
    println!("  prev_hash: {}", block.previous_hash);
    println!("  merkle:    {}", block.merkle_root);
    println!("  timestamp: {} (epoch)", block.timestamp);
    println!("  bits:      0x{:08x} ({})", block.bits, block.bits);
    println!();
    println!(
        "Time budget: {}s | Difficulty: {} leading zero nibble(s)",
        budget.as_secs(),
        difficulty
    );
    println!();
    println!("Rules:");
    println!("  1) Enter nonces (0 to 4294967295) until the clock runs out.");
    println!("  2) Each attempt computes SHA256d(header) with your nonce.");
    println!(
        "  3) Hashes starting with {} zero nibble(s) count as hits.",
        difficulty
    );
}

pub fn print_attempt(result: &AttemptResult, verbose: bool) {
    if verbose {
        println!("  hash: {}", result.hash);
    }
    match result.outcome {
        AttemptOutcome::ValidHash => {
            bell();
            println!("  ** qualifies! nonce={}", result.nonce);
        }
        AttemptOutcome::DuplicateValid => {
            println!("  !! this nonce already produced a valid hash; try a different one");
        }
        AttemptOutcome::NoMatch => {
            if !verbose {
                println!("  no match");
            }
        }
    }
}

pub fn print_mining_summary(session: &MiningSession<'_>) {
    println!();
    println!("{RULE}");
    println!(
        "Time's up. Total attempts: {} | Hits: {}",
        session.attempt_count(),
        session.valid_count()
    );
    if session.valid_count() > 0 {
        println!("{}", "-".repeat(72));
        println!("{:<14} Hash", "Nonce");
        println!("{}", "-".repeat(72));
        let mut seen = std::collections::HashSet::new();
        for attempt in session.attempts() {
            if attempt.valid && seen.insert(attempt.nonce) {
                println!("{:<14} {}", attempt.nonce, attempt.hash);
            }
        }
    } else {
        println!("No qualifying hashes found.");
    }
    if let Some(best) = session.best_result() {
        println!(
            "Best attempt: nonce={} with {} leading zero nibble(s)",
            best.nonce,
            best.hash.leading_zero_nibbles()
        );
    }
    println!("{}", "-".repeat(72));
    println!("Teaching note: real Bitcoin does not count zeros; it requires the");
    println!("hash to be below a compact *target* encoded in the `bits` field.");
}

/// Interactive nonce source for repair windows. Blocking line reads,
/// checked against the window at every input boundary; malformed input
/// is rejected and re-prompted, `quit`/`exit` abandons the window.
#[derive(Debug, Default)]
pub struct StdinNonceProvider;

impl NonceProvider for StdinNonceProvider {
    fn next_nonce(&mut self, block: &Block, remaining: Duration) -> Option<u32> {
        loop {
            if remaining.is_zero() {
                return None;
            }
            let line = prompt(&format!(
                "[block {} | {}s left] nonce ('quit' abandons) > ",
                block.height,
                remaining.as_secs()
            ))?;
            if line.is_empty() {
                continue;
            }
            if matches!(line.as_str(), "quit" | "exit") {
                return None;
            }
            match parse_nonce(&line) {
                Some(nonce) => return Some(nonce),
                None => print_invalid_nonce(),
            }
        }
    }
}

/// Turns core status values into terminal output.
#[derive(Debug, Default)]
pub struct TerminalNotifier {
    pub verbose: bool,
}

impl Notifier for TerminalNotifier {
    fn block_status(&mut self, index: usize, status: BlockStatus) {
        match status {
            BlockStatus::Ok => println!("block {index}: OK"),
            BlockStatus::Broken => println!("block {index}: BROKEN (link or difficulty)"),
            BlockStatus::Repairing => {
                println!("block {index}: repair window open, find a qualifying nonce")
            }
            BlockStatus::Fixed => {
                bell();
                println!("block {index}: FIXED");
            }
        }
    }

    fn attempt(&mut self, _index: usize, result: &AttemptResult) {
        print_attempt(result, self.verbose);
    }
}
