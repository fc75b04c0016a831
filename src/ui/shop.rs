use log::{debug, error};
use rand::Rng;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::{BOLD, CYAN, GREEN, RED, RESET, category_color, count, money};
use crate::engine::{EconomyEngine, EngineError, TickResult};
use crate::persistence::SaveStore;

/// One line of console input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Buy(String),
    Mine,
    Algo(Option<String>),
    Status,
    Save,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts.next().unwrap_or("").to_ascii_lowercase();
        let arg = parts.next().map(str::to_string);
        match (verb.as_str(), arg) {
            ("list" | "ls" | "shop", None) => Ok(Command::List),
            ("buy" | "b", Some(id)) => Ok(Command::Buy(id)),
            ("buy" | "b", None) => Err("usage: buy <id>".into()),
            ("mine" | "m" | "", None) => Ok(Command::Mine),
            ("algo" | "a", id) => Ok(Command::Algo(id)),
            ("status" | "s", None) => Ok(Command::Status),
            ("save", None) => Ok(Command::Save),
            ("help" | "?" | "h", None) => Ok(Command::Help),
            ("quit" | "exit" | "q", None) => Ok(Command::Quit),
            (other, _) => Err(format!("unknown command `{other}`, try `help`")),
        }
    }
}

const HELP: &str = "commands: list | buy <id> | mine | algo [id] | status | save | quit";

/// Apply a command and render the reply. Returns `None` on quit.
pub fn handle(engine: &mut EconomyEngine, store: &SaveStore, cmd: Command) -> Option<String> {
    let reply = match cmd {
        Command::List => render_shop(engine),
        Command::Buy(id) => match engine.purchase(&id) {
            Ok(receipt) => format!("{GREEN}{}{RESET}", receipt.message()),
            Err(e) => format!("{RED}{e}{RESET}"),
        },
        Command::Mine => {
            let wallet = engine.manual_boost();
            format!(
                "boost! progress {} / {}  wallet ${}",
                count(engine.progress()),
                count(engine.block_requirement()),
                money(wallet)
            )
        }
        Command::Algo(None) => render_algorithms(engine),
        Command::Algo(Some(id)) => match engine.select_algorithm(&id) {
            Ok(algo) => format!("mining {} (difficulty {:.2})", algo.name, algo.difficulty),
            Err(e) => format!("{RED}{e}{RESET}"),
        },
        Command::Status => render_status(engine),
        Command::Save => match store.save(engine) {
            Ok(()) => format!("saved to {}", store.path().display()),
            Err(e) => format!("{RED}{e}{RESET}"),
        },
        Command::Help => HELP.to_string(),
        Command::Quit => return None,
    };
    Some(reply)
}

fn render_status(engine: &EconomyEngine) -> String {
    let algo = engine.current_algorithm();
    let wallet_color = if engine.wallet() >= 0.0 { GREEN } else { RED };
    format!(
        "{BOLD}{wallet_color}${}{RESET}  Hashrate: {} H/s  Power: {} W  OpEx: {RED}-${}/s{RESET}\n\
         Algo: {CYAN}{}{RESET} (difficulty {:.2})  Block: {} / {}",
        money(engine.wallet()),
        count(engine.total_hash_rate()),
        count(engine.total_power_watts()),
        money(engine.expense_per_second()),
        algo.name,
        algo.difficulty,
        count(engine.progress()),
        count(engine.block_requirement()),
    )
}

fn render_shop(engine: &EconomyEngine) -> String {
    let mut out = format!("{BOLD}HARDWARE MARKET (with OpEx analysis){RESET}");
    for item in engine.hardware() {
        let color = category_color(item.category);
        out.push_str(&format!(
            "\n{color}[{:<4}]{RESET} {:<8} {:<24} Lv {:<3} +{} H/s  {} W  {}${}{RESET}",
            item.category.to_string(),
            item.id,
            item.name,
            item.count,
            count(item.rate),
            count(item.watts),
            if item.price <= engine.wallet() { GREEN } else { RED },
            money(item.price),
        ));
    }
    out
}

fn render_algorithms(engine: &EconomyEngine) -> String {
    let current = engine.current_algorithm().id;
    let best = engine.best_algorithm();
    let mut out = format!("{BOLD}ALGORITHMS{RESET}");
    for algo in engine.algorithms() {
        let marker = if algo.id == current { "*" } else { " " };
        let hint = if algo.id == best { " (most profitable)" } else { "" };
        out.push_str(&format!(
            "\n{marker} {:<8} {:<16} difficulty {:.3}  reward x{:.2}{hint}",
            algo.id, algo.name, algo.difficulty, algo.reward_mult
        ));
    }
    out
}

/// Advance by the real time since the previous ticker step, so OpEx is
/// charged per wall-clock second whatever the tick interval.
fn ticker_step<R: Rng + ?Sized>(
    engine: &mut EconomyEngine,
    last: &mut Instant,
    now: Instant,
    rng: &mut R,
) -> Result<TickResult, EngineError> {
    let elapsed = now.saturating_duration_since(*last).as_secs_f64();
    *last = now;
    engine.advance(elapsed, false, rng)
}

/// Management console. A ticker thread advances the engine by elapsed real
/// time every `tick_interval` while stdin commands are applied under the same lock.
pub fn run(
    engine: EconomyEngine,
    store: SaveStore,
    tick_interval: Duration,
) -> Result<EconomyEngine, Box<dyn std::error::Error>> {
    let engine = Arc::new(Mutex::new(engine));
    let running = Arc::new(AtomicBool::new(true));

    let ticker = {
        let engine = engine.clone();
        let running = running.clone();
        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            let mut last = Instant::now();
            while running.load(Ordering::SeqCst) {
                thread::sleep(tick_interval);
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let mut engine = engine.lock().expect("mutex poisoned");
                match ticker_step(&mut engine, &mut last, Instant::now(), &mut rng) {
                    Ok(tick) if tick.blocks > 0 => {
                        debug!(
                            "ticker: {} block(s), net {:.2}, wallet {:.2}",
                            tick.blocks,
                            tick.net(),
                            tick.wallet
                        )
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("ticker stopped: {e}");
                        running.store(false, Ordering::SeqCst);
                    }
                }
            }
        })
    };

    {
        let engine = engine.lock().expect("mutex poisoned");
        println!("{}\n{}\n{HELP}", render_status(&engine), render_shop(&engine));
    }

    let stdin = io::stdin();
    let mut input = String::new();
    while running.load(Ordering::SeqCst) {
        print!("> ");
        io::stdout().flush()?;
        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let cmd = match input.parse::<Command>() {
            Ok(cmd) => cmd,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };
        let reply = {
            let mut engine = engine.lock().expect("mutex poisoned");
            handle(&mut engine, &store, cmd)
        };
        match reply {
            Some(text) => println!("{text}"),
            None => break,
        }
    }

    running.store(false, Ordering::SeqCst);
    ticker
        .join()
        .map_err(|_| io::Error::other("ticker thread panicked"))?;

    let engine = Arc::try_unwrap(engine)
        .map_err(|_| io::Error::other("engine still shared"))?
        .into_inner()
        .map_err(|_| io::Error::other("mutex poisoned"))?;
    Ok(engine)
}
