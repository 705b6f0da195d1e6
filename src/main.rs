//! E20 Simulator - CLI Entry Point
//!
//! `e20-sim <program.bin>` loads a machine code file, runs it until it
//! jumps to itself, and prints the final state.

use clap::Parser;
use e20::{Cpu, MachineConfig, Word};
use e20::cpu::{HaltProbe, UndefinedOpcode};
use e20::report::{format_state, StateReport, DEFAULT_MEM_QUANTITY};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "e20-sim")]
#[command(version)]
#[command(about = "Simulate E20 machine")]
struct Cli {
    /// The file containing machine code, typically with .bin suffix
    program: PathBuf,

    /// JSON file with machine configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop with an error after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,

    /// Skip undefined opcodes instead of stopping
    #[arg(long)]
    lenient_opcodes: bool,

    /// Probe the halt instruction at pc mod (memory size - 1)
    #[arg(long)]
    legacy_halt_probe: bool,

    /// Number of memory words to print
    #[arg(long, default_value_t = DEFAULT_MEM_QUANTITY)]
    mem_words: usize,

    /// Print the final state as JSON
    #[arg(long)]
    json: bool,

    /// Print a disassembly of the program instead of running it
    #[arg(long)]
    disasm: bool,

    /// Trace every executed instruction to stderr
    #[arg(short, long)]
    trace: bool,

    /// Open the interactive debugger
    #[cfg(feature = "tui")]
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.trace);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(trace: bool) {
    let filter = if trace {
        EnvFilter::new("e20=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_config(cli: &Cli) -> Result<MachineConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => MachineConfig::from_json_file(path)?,
        None => MachineConfig::default(),
    };

    if cli.max_steps.is_some() {
        config.max_steps = cli.max_steps;
    }
    if cli.lenient_opcodes {
        config.undefined_opcode = UndefinedOpcode::Ignore;
    }
    if cli.legacy_halt_probe {
        config.halt_probe = HaltProbe::Legacy;
    }

    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(cli)?;
    let program = e20::load_machine_code(&cli.program, config.mem_size)?;

    if cli.disasm {
        print!("{}", e20::disassemble(&program));
        return Ok(());
    }

    if launch_debugger(cli, &program, &config)? {
        return Ok(());
    }

    let mut cpu = Cpu::with_config(config)?;
    cpu.load_program(&program)?;
    cpu.run()?;

    if cli.json {
        let report = StateReport::capture(&cpu, cli.mem_words);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_state(&cpu, cli.mem_words));
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn launch_debugger(cli: &Cli, program: &[Word], config: &MachineConfig) -> Result<bool, Box<dyn std::error::Error>> {
    if !cli.debug {
        return Ok(false);
    }
    e20::run_debugger(program.to_vec(), config.clone())?;
    Ok(true)
}

#[cfg(not(feature = "tui"))]
fn launch_debugger(_cli: &Cli, _program: &[Word], _config: &MachineConfig) -> Result<bool, Box<dyn std::error::Error>> {
    Ok(false)
}
