use dotenvy::dotenv;
use log::info;
use std::io::{self, BufRead, Write};

use hashfarm::catalog::Catalog;
use hashfarm::config::{Config, Mode};
use hashfarm::engine::{EconomyEngine, SystemClock};
use hashfarm::persistence::{LoadOutcome, SaveStore};
use hashfarm::ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv();
    env_logger::init();

    let config = Config::from_env();
    let catalog = match &config.catalog_file {
        Some(path) => {
            info!("using catalog {}", path.display());
            Catalog::from_json_file(path)?
        }
        None => Catalog::reference(),
    };

    let store = SaveStore::new(&config.save_file);
    let mut engine = EconomyEngine::new(catalog, config.params.clone(), Box::new(SystemClock::new()))?
        .with_store(store.clone());
    if let LoadOutcome::DefaultsUsed(reason) = store.load_into(&mut engine) {
        println!("Starting a fresh farm ({reason})");
    }

    let mode = match config.mode {
        Some(mode) => mode,
        None => prompt_mode()?,
    };

    match mode {
        Mode::Dashboard => ui::dashboard::run(&mut engine, config.refresh_interval)?,
        Mode::Shop => engine = ui::shop::run(engine, store.clone(), config.tick_interval)?,
    }

    store.save(&engine)?;
    println!("Saved & exited.");
    Ok(())
}

fn prompt_mode() -> io::Result<Mode> {
    println!("=== HASHFARM MINING SIMULATOR ===");
    println!("1. Shop console (manage, buy hardware)");
    println!("2. AFK dashboard (auto-switch algorithms)");

    let stdin = io::stdin();
    let mut input = String::new();
    loop {
        print!("Select mode: ");
        io::stdout().flush()?;
        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            return Ok(Mode::Shop);
        }
        match input.parse() {
            Ok(mode) => return Ok(mode),
            Err(e) => println!("{e}"),
        }
    }
}
