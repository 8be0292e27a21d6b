use log::debug;

use crate::alu;
use crate::api::{
    MemoryRequestKind, ModuleSnapshots, SimConfig, Stage, StagedWrite, TraceEvent, TraceSink,
};
use crate::bus::InstructionWord;
use crate::decoder::{decode, AluOperand, DecodedInstruction, JumpKind, MemoryOp, RegisterOp};
use crate::fault::SimError;
use crate::memory::{DataMemory, InstructionMemory};
use crate::state::{ProgramCounter, RegisterFile};

/// How far one cycle got through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CycleOutcome {
    /// Every stage ran; staged values are ready to commit.
    Completed,
    /// `stage` was not ready; later stages were skipped.
    Stalled(Stage),
    /// `HALT` was decoded.
    Halted,
}

/// The stateful modules and the stage logic that connects them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Datapath {
    pub(crate) register_file: RegisterFile,
    pub(crate) instruction_memory: InstructionMemory,
    pub(crate) data_memory: DataMemory,
    pub(crate) program_counter: ProgramCounter,
}

impl Datapath {
    pub(crate) fn new(config: &SimConfig) -> Self {
        Self {
            register_file: RegisterFile::new(),
            instruction_memory: InstructionMemory::new(config.fetch_latency),
            data_memory: DataMemory::new(config.load_latency, config.store_latency),
            program_counter: ProgramCounter::new(),
        }
    }

    /// Runs fetch, decode, execute, memory access and PC update, stopping at
    /// the first stage that stalls or at `HALT`.
    pub(crate) fn run_cycle(
        &mut self,
        trace: &mut dyn TraceSink,
    ) -> Result<CycleOutcome, SimError> {
        let address = self.program_counter.current_address();
        let Some(word) = self.fetch(trace)? else {
            return Ok(self.stall(Stage::Fetch, trace));
        };

        let instruction = decode(word)?;
        debug!("decoded {address}: {word} {instruction}");
        trace.on_event(TraceEvent::Decoded {
            address,
            instruction,
        });
        if instruction == DecodedInstruction::Halt {
            trace.on_event(TraceEvent::Halted);
            return Ok(CycleOutcome::Halted);
        }

        self.execute(instruction, trace)?;
        if !self.access_memory(instruction, trace)? {
            return Ok(self.stall(Stage::MemoryAccess, trace));
        }
        self.update_program_counter(instruction, trace);
        Ok(CycleOutcome::Completed)
    }

    fn stall(&mut self, stage: Stage, trace: &mut dyn TraceSink) -> CycleOutcome {
        debug!("{stage:?} stage not ready, stalling");
        self.program_counter.set_stall(true);
        trace.on_event(TraceEvent::Stalled { stage });
        CycleOutcome::Stalled(stage)
    }

    fn fetch(&mut self, trace: &mut dyn TraceSink) -> Result<Option<InstructionWord>, SimError> {
        let address = self.program_counter.current_address();
        self.instruction_memory.request_fetch(address)?;
        trace.on_event(TraceEvent::FetchIssued { address });
        if !self.instruction_memory.fetch_ready() {
            return Ok(None);
        }
        self.program_counter.set_stall(false);
        Ok(Some(self.instruction_memory.fetch_result()?))
    }

    fn execute(
        &mut self,
        instruction: DecodedInstruction,
        trace: &mut dyn TraceSink,
    ) -> Result<(), SimError> {
        let registers = &mut self.register_file;
        match instruction {
            DecodedInstruction::Alu { function, operand } => {
                let operand = match operand {
                    AluOperand::Immediate(value) => value,
                    AluOperand::Register(register) => registers.register(register),
                };
                let output = alu::execute(registers.acc(), operand, function);
                registers.set_next_acc(output.result);
                registers.set_next_status(output.signed_overflow, output.carry);
                trace.on_event(TraceEvent::Staged(StagedWrite::Accumulator(output.result)));
                trace.on_event(TraceEvent::Staged(StagedWrite::Status {
                    signed_overflow: output.signed_overflow,
                    carry: output.carry,
                }));
            }
            DecodedInstruction::RegisterFile(RegisterOp::Set(value)) => {
                registers.set_next_acc(value);
                trace.on_event(TraceEvent::Staged(StagedWrite::Accumulator(value)));
            }
            DecodedInstruction::RegisterFile(RegisterOp::Get(register)) => {
                let value = registers.register(register);
                registers.set_next_acc(value);
                trace.on_event(TraceEvent::Staged(StagedWrite::Accumulator(value)));
            }
            DecodedInstruction::RegisterFile(RegisterOp::Put(register)) => {
                let value = registers.acc();
                registers.set_next_register(register, value)?;
                trace.on_event(TraceEvent::Staged(StagedWrite::Register(register, value)));
            }
            DecodedInstruction::Memory(_)
            | DecodedInstruction::Branch { .. }
            | DecodedInstruction::Jump(_)
            | DecodedInstruction::Halt => {}
        }
        Ok(())
    }

    /// Returns false when the data memory is not ready yet.
    fn access_memory(
        &mut self,
        instruction: DecodedInstruction,
        trace: &mut dyn TraceSink,
    ) -> Result<bool, SimError> {
        let DecodedInstruction::Memory(op) = instruction else {
            return Ok(true);
        };
        let address = self.register_file.data_address_register();
        match op {
            MemoryOp::Load => {
                self.data_memory.request_load(address)?;
                trace.on_event(TraceEvent::MemoryRequest {
                    kind: MemoryRequestKind::Load,
                    address,
                    value: None,
                });
                if !self.data_memory.load_ready() {
                    return Ok(false);
                }
                let value = self.data_memory.load_result()?;
                self.register_file.set_next_acc(value);
                trace.on_event(TraceEvent::Staged(StagedWrite::Accumulator(value)));
                Ok(true)
            }
            MemoryOp::Store => {
                let value = self.register_file.acc();
                self.data_memory.request_store(address, value)?;
                trace.on_event(TraceEvent::MemoryRequest {
                    kind: MemoryRequestKind::Store,
                    address,
                    value: Some(value),
                });
                Ok(self.data_memory.store_complete())
            }
        }
    }

    fn update_program_counter(
        &mut self,
        instruction: DecodedInstruction,
        trace: &mut dyn TraceSink,
    ) {
        let pc = &mut self.program_counter;
        match instruction {
            DecodedInstruction::Branch { condition, target } => {
                pc.conditionally_branch(self.register_file.status(), target, condition);
            }
            DecodedInstruction::Jump(JumpKind::ImmediateRelative(offset)) => {
                pc.jump_relative(offset);
            }
            DecodedInstruction::Jump(JumpKind::RegisterRelative) => {
                pc.jump_relative(self.register_file.instr_address_register());
            }
            DecodedInstruction::Jump(JumpKind::RegisterAbsolute) => {
                pc.jump_absolute(self.register_file.instr_address_register());
            }
            DecodedInstruction::Alu { .. }
            | DecodedInstruction::RegisterFile(_)
            | DecodedInstruction::Memory(_)
            | DecodedInstruction::Halt => pc.increment(),
        }
        if let Some(next) = pc.staged_address() {
            trace.on_event(TraceEvent::Staged(StagedWrite::ProgramCounter(next)));
        }
    }

    /// Commits in module order: register file, instruction memory, data
    /// memory, program counter.
    ///
    /// After a stalled cycle the register file drops what the partial cycle
    /// staged and the program counter holds, so only the memory latency
    /// counters move.
    pub(crate) fn commit(
        &mut self,
        stalled: bool,
        trace: &mut dyn TraceSink,
    ) -> Result<(), SimError> {
        if stalled {
            self.register_file.discard();
        } else {
            self.register_file.commit();
        }
        self.instruction_memory.commit();
        self.data_memory.commit();
        self.program_counter.commit()?;
        trace.on_event(TraceEvent::Committed { stalled });
        Ok(())
    }

    pub(crate) fn snapshot(&self) -> ModuleSnapshots {
        ModuleSnapshots {
            register_file: self.register_file.snapshot(),
            instruction_memory: self.instruction_memory.snapshot(),
            data_memory: self.data_memory.snapshot(),
            program_counter: self.program_counter.snapshot(),
        }
    }
}
