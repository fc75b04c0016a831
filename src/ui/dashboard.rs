use chrono::Local;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use super::{BOLD, CLEAR_LINE, CYAN, GREEN, MAGENTA, RED, RESET, YELLOW, count, money};
use crate::engine::{EconomyEngine, TickResult};

const LOG_LINES: usize = 6;

/// AFK view: ticks with auto-switch on and redraws until Ctrl+C.
pub fn run(engine: &mut EconomyEngine, refresh: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    execute!(io::stdout(), EnterAlternateScreen, Hide, Clear(ClearType::All))?;
    let result = run_loop(engine, refresh, &running);
    execute!(io::stdout(), Show, LeaveAlternateScreen)?;

    result
}

fn run_loop(
    engine: &mut EconomyEngine,
    refresh: Duration,
    running: &AtomicBool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = rand::thread_rng();
    let mut events = EventLog::new("[SYSTEM] AFK mode initialized. Smart switching active.");
    let mut last = Instant::now();

    while running.load(Ordering::SeqCst) {
        let elapsed = last.elapsed().as_secs_f64();
        last = Instant::now();

        let tick = engine.advance(elapsed, true, &mut rng)?;
        events.record(&tick);

        execute!(io::stdout(), MoveTo(0, 0))?;
        draw(engine, &tick, elapsed, &events);
        io::stdout().flush()?;

        thread::sleep(refresh);
    }

    Ok(())
}

/// Rolling log of the most recent notable events.
struct EventLog {
    lines: VecDeque<String>,
}

impl EventLog {
    fn new(first: &str) -> Self {
        let mut lines = VecDeque::with_capacity(LOG_LINES + 1);
        lines.push_back(first.to_string());
        Self { lines }
    }

    fn push(&mut self, line: String) {
        self.lines.push_back(line);
        while self.lines.len() > LOG_LINES {
            self.lines.pop_front();
        }
    }

    fn record(&mut self, tick: &TickResult) {
        let stamp = Local::now().format("%H:%M:%S");
        if tick.blocks > 0 {
            self.push(format!(
                "[{stamp}] Mined {} block(s). Rev: +${}",
                tick.blocks,
                money(tick.revenue)
            ));
        }
        if let Some(notice) = &tick.switch_notice {
            self.push(format!("{MAGENTA}[{stamp}] >> {notice}{RESET}"));
        }
    }
}

fn line(text: impl AsRef<str>) {
    println!("{CLEAR_LINE}{}", text.as_ref());
}

fn draw(engine: &EconomyEngine, tick: &TickResult, elapsed: f64, events: &EventLog) {
    let algo = engine.current_algorithm();
    line(format!(
        "{BOLD}== HASHFARM AUTOMATION | Algo: {CYAN}{}{RESET}{BOLD} =={RESET}",
        algo.name
    ));
    line("");

    line(format!("{BOLD}Mining Stats{RESET}"));
    line(format!(
        "  Hashrate      {GREEN}{} H/s{RESET}",
        count(engine.total_hash_rate())
    ));
    line(format!("  Difficulty    {:.2}", algo.difficulty));
    line(format!(
        "  Block Prog    {} / {}",
        count(tick.progress),
        count(tick.block_requirement)
    ));
    line("");

    let revenue = if elapsed > 0.0 { tick.revenue / elapsed } else { 0.0 };
    let expense = engine.expense_per_second();
    let net = revenue - expense;
    let net_color = if net >= 0.0 { GREEN } else { RED };
    let wallet_color = if tick.wallet >= 0.0 { YELLOW } else { RED };
    line(format!("{BOLD}Financials{RESET}"));
    line(format!("  Wallet        {wallet_color}${}{RESET}", money(tick.wallet)));
    line(format!("  Rev/sec       ${}", money(revenue)));
    line(format!("  Exp/sec       {RED}-${}{RESET}", money(expense)));
    line(format!("  Net Profit    {net_color}${}/s{RESET}", money(net)));
    line(format!(
        "  Power         {YELLOW}{} W{RESET}",
        count(engine.total_power_watts())
    ));
    line("");

    line(format!("{BOLD}Active Rigs{RESET}"));
    line(format!("  {:<24} {:>6} {:>16}", "Device", "Qty", "Cost/Day"));
    let rigs: Vec<_> = engine.hardware().into_iter().filter(|h| h.count > 0).collect();
    if rigs.is_empty() {
        line("  (none)");
    }
    for rig in rigs {
        line(format!(
            "  {CYAN}{:<24}{RESET} {:>6} {RED}{:>16}{RESET}",
            rig.name,
            rig.count,
            format!("-${}", money(rig.daily_opex))
        ));
    }
    line("");

    line(format!("{BOLD}System Log{RESET}"));
    for entry in &events.lines {
        line(format!("  {entry}"));
    }
    for _ in events.lines.len()..LOG_LINES {
        line("");
    }
    line("");
    line("Ctrl+C to save and exit");
    execute!(io::stdout(), Clear(ClearType::FromCursorDown)).ok();
}

#[cfg(test)]
mod tests {
    use super::{EventLog, LOG_LINES};
    use crate::engine::TickResult;

    fn tick(blocks: u64, notice: Option<&str>) -> TickResult {
        TickResult {
            wallet: 0.0,
            progress: 0.0,
            block_requirement: 1000.0,
            algorithm: "SHA-256".into(),
            blocks,
            revenue: blocks as f64 * 10.0,
            expense: 0.05,
            switch_notice: notice.map(str::to_string),
        }
    }

    #[test]
    fn quiet_ticks_are_not_logged() {
        let mut log = EventLog::new("start");
        log.record(&tick(0, None));
        assert_eq!(log.lines.len(), 1);
    }

    #[test]
    fn log_keeps_last_lines_only() {
        let mut log = EventLog::new("start");
        for _ in 0..10 {
            log.record(&tick(2, None));
        }
        log.record(&tick(0, Some("Auto-Switch: SHA-256 -> Scrypt (Better Profit!)")));
        assert_eq!(log.lines.len(), LOG_LINES);
        assert!(log.lines.back().unwrap().contains("Scrypt"));
        assert!(log.lines.front().unwrap().contains("Mined 2 block(s)"));
    }
}
