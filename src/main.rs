use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use rv32i_sim::driver;
use rv32i_sim::elf_loader;
use rv32i_sim::hart::Hart;

/// Runs a statically linked RV32I user-mode executable to completion.
#[derive(Debug, Parser)]
#[command(name = "rv32i-sim", about = "A RISC-V RV32I instruction set simulator")]
struct Args {
    /// Path to the 32-bit RISC-V ELF image to run.
    input: String,

    /// Log every retired instruction at trace level.
    #[arg(long)]
    trace: bool,

    /// Abort instead of looping forever past this many retired instructions.
    #[arg(long)]
    max_cycles: Option<u64>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.trace {
        builder.filter_level(log::LevelFilter::Trace);
    }
    builder.init();

    let mut hart = Hart::new(0);

    let image = match elf_loader::load(&args.input, &mut hart.memory) {
        Ok(image) => image,
        Err(err) => {
            error!("failed to load {}: {err}", args.input);
            return ExitCode::FAILURE;
        }
    };
    hart.pc = image.entry;

    match driver::run(&mut hart, args.max_cycles) {
        Ok(report) => {
            info!(
                "retired {} instructions, halted at pc 0x{:08x}",
                report.retired, report.final_pc
            );
            print_registers(&hart);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

const ABI_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

fn print_registers(hart: &Hart) {
    for (i, name) in ABI_NAMES.iter().enumerate() {
        println!("x{i:<2} ({name:<4}) = 0x{:08x}", hart.registers.read(i as u8));
    }
}
