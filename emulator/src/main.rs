use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    thread,
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{select, tick, unbounded, Receiver};
use libemulator::{
    bootmedia::BootImage,
    bus::{ChannelBus, Peripheral},
    execute::InstructionFault,
    memory::{Ram, MAX_MEMORY_SIZE},
    Processor, DEFAULT_MEMORY_SIZE, DEFAULT_TICK,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod program;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Program image in the hex text format.
    program: PathBuf,

    /// RAM size in bytes.
    #[arg(long, default_value_t = DEFAULT_MEMORY_SIZE)]
    memory_size: usize,

    /// Milliseconds between instruction ticks.
    #[arg(long, default_value_t = DEFAULT_TICK.as_millis() as u64)]
    tick_ms: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    anyhow::ensure!(
        args.memory_size <= MAX_MEMORY_SIZE,
        "--memory-size may not exceed {}",
        MAX_MEMORY_SIZE
    );

    let source = fs::read_to_string(&args.program)
        .with_context(|| format!("Reading program image {}", args.program.display()))?;
    let image = program::parse(&source).context("Parsing program image")?;

    info!(
        offset = image.offset,
        initial_ip = image.initial_ip,
        bytes = image.data.len(),
        "program image parsed"
    );

    let mut bus = ChannelBus::new();
    let raw = bus.add_channel(0);
    let tty = bus.add_channel(0);
    let done = bus.add_channel(0);

    let boot_media = BootImage::new(image.data, image.offset, image.initial_ip);
    let ticker = tick(Duration::from_millis(args.tick_ms));

    let mut processor = Processor::new(Ram::new(args.memory_size), boot_media, bus, ticker);
    processor.boot().context("Booting from program image")?;
    info!("boot complete, starting processor");

    let (fault_tx, faults) = unbounded();
    thread::spawn(move || processor.run(&fault_tx));

    console_loop(&raw, &tty, &done, &faults)
}

/// Drives the three terminal peripherals until the program signals done, a
/// fault arrives, or the processor goes away.
fn console_loop(
    raw: &Peripheral,
    tty: &Peripheral,
    done: &Peripheral,
    faults: &Receiver<InstructionFault>,
) -> anyhow::Result<()> {
    let mut stdout = io::stdout();

    let faults = faults.clone();
    let raw_rx = raw.from_cpu().clone();
    let tty_rx = tty.from_cpu().clone();
    let done_rx = done.from_cpu().clone();

    loop {
        select! {
            recv(faults) -> fault => {
                match fault {
                    Ok(fault) => error!(%fault, "processor fault"),
                    Err(_) => info!("processor stopped"),
                }
                return Ok(());
            }

            recv(raw_rx) -> word => match word {
                Ok(word) => {
                    write!(stdout, "{} ", word)?;
                    stdout.flush()?;
                }
                Err(_) => return Ok(()),
            },

            recv(tty_rx) -> word => match word {
                Ok(word) => {
                    let [high, low] = libemu16isa::word_to_bytes(word);
                    if high == 0 {
                        write!(stdout, "{}", low as char)?;
                    } else {
                        write!(stdout, "{}{}", high as char, low as char)?;
                    }
                    stdout.flush()?;
                }
                Err(_) => return Ok(()),
            },

            recv(done_rx) -> word => {
                if word.is_ok() {
                    writeln!(stdout, "\nDone")?;
                    done.raise_interrupt(0);
                }
                return Ok(());
            }
        }
    }
}
