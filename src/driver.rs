//! Sequences the hart through its fetch/decode/execute cycle until it
//! halts, a fault occurs, or an optional cycle cap is exceeded. The
//! cap exists so a guest program's infinite self-loop (see the `BEQ`
//! property in SPEC_FULL.md) is an observable, bounded test outcome
//! rather than a hang.

use log::trace;
use thiserror::Error;

use crate::hart::{Hart, StepOutcome, Trap};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("trap: {0}")]
    Trap(#[from] Trap),
    #[error("exceeded cycle cap of {cap} instructions at pc 0x{pc:08x}")]
    CycleCapExceeded { cap: u64, pc: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub retired: u64,
    pub final_pc: u32,
}

/// Runs `hart` to completion. `max_cycles`, if set, bounds the number
/// of instructions retired before giving up with `CycleCapExceeded`.
pub fn run(hart: &mut Hart, max_cycles: Option<u64>) -> Result<Report, DriverError> {
    let mut retired: u64 = 0;
    loop {
        let pc_before = hart.pc;
        match hart.step()? {
            StepOutcome::Continue => {
                retired += 1;
                trace!("retired {retired} instructions, pc now 0x{:08x} (was 0x{pc_before:08x})", hart.pc);
            }
            StepOutcome::Halted => {
                retired += 1;
                trace!("halted after retiring {retired} instructions at pc 0x{pc_before:08x}");
                return Ok(Report { retired, final_pc: hart.pc });
            }
        }
        if let Some(cap) = max_cycles {
            if retired >= cap {
                return Err(DriverError::CycleCapExceeded { cap, pc: hart.pc });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::BASE;

    fn hart_with_code(code: &[u32]) -> Hart {
        let mut hart = Hart::new(BASE);
        for (i, word) in code.iter().enumerate() {
            hart.memory.write_u32(BASE + (i as u32) * 4, *word).unwrap();
        }
        hart
    }

    #[test]
    fn runs_until_ecall() {
        // lui x1,1 ; addi x1,x1,-1 ; ecall
        let mut hart = hart_with_code(&[0x0000_10B7, 0xFFF0_8093, 0x0000_0073]);
        let report = run(&mut hart, None).unwrap();
        assert_eq!(report.retired, 3);
        assert_eq!(hart.registers.read(1), 0x0000_0FFF);
    }

    #[test]
    fn infinite_branch_loop_trips_cycle_cap() {
        // beq x0, x0, 0 -- always taken, offset 0, loops forever
        let mut hart = hart_with_code(&[0x0000_0063]);
        let err = run(&mut hart, Some(100)).unwrap_err();
        assert!(matches!(err, DriverError::CycleCapExceeded { cap: 100, .. }));
    }

    #[test]
    fn cycle_cap_does_not_trigger_when_program_halts_first() {
        let mut hart = hart_with_code(&[0x0000_0073]); // ecall
        let report = run(&mut hart, Some(10)).unwrap();
        assert_eq!(report.retired, 1);
    }

    #[test]
    fn propagates_trap_on_illegal_instruction() {
        let mut hart = hart_with_code(&[0x7F]);
        assert!(matches!(run(&mut hart, None), Err(DriverError::Trap(_))));
    }
}
