mod blockchain;
mod clock;
mod integrity;
mod mining;
mod notify;
mod pow;
mod render;
mod source;

use std::env;
use std::process::ExitCode;
use std::time::Duration;

use dotenvy::dotenv;
use log::info;

use blockchain::{Chain, DEFAULT_DIFFICULTY, DEMO_PAYLOADS};
use clock::SystemClock;
use integrity::{BlockEdit, IntegrityEngine, RepairOutcome};
use mining::{MiningSession, SessionExpired};
use pow::BlockHash;

fn main() -> ExitCode {
    let _ = dotenv();
    env_logger::init();

    let mode = env::args().nth(1).unwrap_or_else(|| "mine".to_string());
    match mode.as_str() {
        "mine" => run_mine(),
        "integrity" => run_integrity(),
        other => {
            eprintln!("unknown mode '{other}'");
            eprintln!("usage: blockchain_simulator [mine|integrity]");
            eprintln!("config via env: SIM_BLOCKS_FILE, SIM_TIME_BUDGET_SECS, SIM_DIFFICULTY,");
            eprintln!("                SIM_FIX_WINDOW_SECS, SIM_BLOCK_COUNT, SIM_VERBOSE");
            ExitCode::from(2)
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str) -> bool {
    env::var(name).map(|v| v == "1" || v == "true").unwrap_or(false)
}

/// The proof-of-work guessing game over one real block header.
fn run_mine() -> ExitCode {
    let path = env::var("SIM_BLOCKS_FILE").unwrap_or_else(|_| "blocks.json".to_string());
    let budget = Duration::from_secs(env_u64("SIM_TIME_BUDGET_SECS", 60));
    let difficulty = env_u32("SIM_DIFFICULTY", 1);
    let verbose = env_flag("SIM_VERBOSE");

    let pool = match source::load_blocks(&path) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("error loading '{path}': {e}");
            return ExitCode::from(2);
        }
    };
    let mut rng = rand::thread_rng();
    let Some(block) = source::pick_block(&pool, &mut rng).cloned() else {
        eprintln!("error: block pool is empty");
        return ExitCode::from(2);
    };
    info!("assigned header '{}' at height {}", block.name, block.height);

    render::print_mining_intro(&block, budget, difficulty, &path);
    if render::prompt("\nPress ENTER to start the clock... ").is_none() {
        return ExitCode::SUCCESS;
    }
    println!("Enter nonces and press ENTER ('quit' to stop early).");

    let clock = SystemClock::new();
    let mut session = MiningSession::new(block.header(), difficulty, budget, &clock);
    loop {
        let remaining = session.remaining_time();
        if remaining.is_zero() {
            break;
        }
        let Some(line) = render::prompt(&format!("({}s) nonce > ", remaining.as_secs())) else {
            break;
        };
        if line.is_empty() {
            continue;
        }
        if matches!(line.as_str(), "quit" | "exit") {
            break;
        }
        let Some(nonce) = render::parse_nonce(&line) else {
            render::print_invalid_nonce();
            continue;
        };
        match session.attempt(nonce) {
            Err(SessionExpired) => break,
            Ok(result) => render::print_attempt(&result, verbose),
        }
    }
    render::print_mining_summary(&session);
    ExitCode::SUCCESS
}

/// The tamper-and-repair demo over a freshly mined chain.
fn run_integrity() -> ExitCode {
    let difficulty = env_u32("SIM_DIFFICULTY", DEFAULT_DIFFICULTY);
    let count = env_u64("SIM_BLOCK_COUNT", 5) as usize;
    let window = Duration::from_secs(env_u64("SIM_FIX_WINDOW_SECS", 30));

    let mut chain = build_chain(count, difficulty);
    loop {
        render::print_chain(&chain);
        let Some(choice) = render::prompt("[V]iew  [A]lter  [R]eset  [Q]uit > ") else {
            break;
        };
        match choice.to_lowercase().as_str() {
            "q" | "quit" | "exit" => break,
            "" | "v" => continue,
            "r" => {
                println!("Rebuilding the chain...");
                chain = build_chain(count, difficulty);
            }
            "a" => alter_and_repair(&mut chain, window),
            _ => println!("  !! unrecognized option"),
        }
    }
    ExitCode::SUCCESS
}

fn build_chain(count: usize, difficulty: u32) -> Chain {
    let base_timestamp = chrono::Utc::now().timestamp() as u32;
    Chain::build_demo(count, difficulty, DEMO_PAYLOADS, base_timestamp)
}

fn alter_and_repair(chain: &mut Chain, window: Duration) {
    if chain.len() < 2 {
        println!("  !! not enough blocks to alter");
        return;
    }
    let last = chain.len() - 1;
    let index = loop {
        let Some(line) = render::prompt(&format!(
            "block index to alter (0..{}; the last block is off limits) > ",
            last - 1
        )) else {
            return;
        };
        match line.parse::<usize>() {
            Ok(i) if i < last => break i,
            _ => println!("  !! must be between 0 and {}", last - 1),
        }
    };
    let Some(label) = render::prompt("new payload label (ENTER for a '*tampered*' marker) > ")
    else {
        return;
    };
    let label = if label.is_empty() {
        format!("{} *tampered*", chain.block(index).name)
    } else {
        label
    };
    let root = BlockHash::from_le_bytes(pow::sha256d(label.as_bytes()));

    let clock = SystemClock::new();
    let engine = IntegrityEngine::new(&clock, window);
    if let Err(e) = engine.tamper(chain, index, BlockEdit::MerkleRoot(root)) {
        println!("  !! {e}");
        return;
    }
    render::print_chain(chain);
    println!(
        "You altered block {index}. Each broken block gets a {}s repair window.",
        window.as_secs()
    );

    let report = engine.repair(
        chain,
        index,
        &mut render::StdinNonceProvider,
        &mut render::TerminalNotifier { verbose: true },
    );
    render::print_chain(chain);
    match report.outcome {
        RepairOutcome::ChainConsistent => println!("Chain repaired through the last block."),
        RepairOutcome::PropagationHalted { index } => {
            println!("Repair halted at block {index}: the fix window expired.");
            println!("The chain stays broken from there; alter or repair again to retry.");
        }
    }
    let _ = render::prompt("ENTER to continue... ");
}
