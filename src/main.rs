use clap::Parser;
use dotboy::error::DotboyError;
use dotboy::gameboy::GameBoy;
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dotboy", about = "Instruction-level SM83 emulator core")]
struct Args {
    /// ROM image to load
    rom: PathBuf,
    /// Stop after this many frames (runs until a fault otherwise)
    #[arg(short, long)]
    frames: Option<u64>,
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), DotboyError> {
    let args = Args::parse();
    setup_logger(args.verbose);

    let rom = std::fs::read(&args.rom).map_err(|source| DotboyError::RomIo {
        path: args.rom.clone(),
        source,
    })?;

    let mut gameboy = GameBoy::new(rom)?;
    info!("Loaded {} ({})", args.rom.display(), gameboy.mmu().mapper_name());

    let mut frames = 0u64;
    while gameboy.running() {
        if gameboy.run_frame().is_err() {
            // already logged by the execution loop
            break;
        }

        frames += 1;
        if args.frames.is_some_and(|limit| frames >= limit) {
            break;
        }
    }

    info!("Stopped after {} frames: {}", frames, gameboy.cpu());
    Ok(())
}

fn setup_logger(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let _ = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply();
}
