use std::io::Read;

use log::{debug, error, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constants::{ADDRESS_MASK, KEY_COUNT, MAX_PROGRAM_SIZE, PROGRAM_START};
use crate::error::{Chip8Error, Result};
use crate::instruction::Instruction;
use crate::opcode;
use crate::operations::{execute, resume_on_key};
use crate::quirks::Quirks;
use crate::state::{FrameBuffer, Keys, RunState, State};

/// What the CPU is doing after a call to `Chip8::step`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Running,
    /// Blocked on FX0A until a key is pressed
    AwaitingKey,
    /// Stopped by a stack fault; only `reset` recovers
    Halted,
}

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`
///  - `pressed_keys` with public interfaces for manipulating them
///  - the `beep` raised when the sound timer runs out
///
/// Supplies interfaces for:
/// - loading programs
/// - pressing and releasing keys
/// - stepping the CPU and its timers
/// - inspecting its frame buffer for rendering by some display
///
/// The host decides how often to call `step`; both timers count down once per call.
pub struct Chip8 {
    state: State,
    pressed_keys: Keys,
    quirks: Quirks,
    rng: StdRng,
    beep: bool,
}

impl Chip8 {
    pub fn new() -> Self {
        Chip8::from_rng(StdRng::from_entropy())
    }

    /// A Chip8 whose CXNN random numbers are reproducible
    pub fn with_seed(seed: u64) -> Self {
        Chip8::from_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }

    fn from_rng(rng: StdRng) -> Self {
        Chip8 {
            state: State::new(),
            pressed_keys: [false; KEY_COUNT],
            quirks: Quirks::default(),
            rng,
            beep: false,
        }
    }

    /// Returns the machine to its power-on state.
    ///
    /// Memory, registers, stack, timers, frame buffer and keys are all cleared and the font is
    /// seeded again. Quirks and the random number generator are kept.
    pub fn reset(&mut self) {
        debug!("resetting");
        self.state = State::new();
        self.pressed_keys = [false; KEY_COUNT];
        self.beep = false;
    }

    /// Copies a program into memory at 0x200.
    ///
    /// # Arguments
    /// * `program` the raw bytes of a ROM, at most 3584 of them
    pub fn load_program(&mut self, program: &[u8]) -> Result<()> {
        if program.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::ProgramTooLarge {
                size: program.len(),
                max: MAX_PROGRAM_SIZE,
            });
        }
        let start = PROGRAM_START as usize;
        self.state.memory[start..start + program.len()].copy_from_slice(program);
        debug!("loaded {} byte program", program.len());
        Ok(())
    }

    /// Load a rom from a source file
    ///
    /// # Arguments
    /// * `reader` a reader that contains a ROM
    pub fn load_rom(&mut self, reader: &mut dyn Read) -> Result<()> {
        let mut program = Vec::new();
        reader.read_to_end(&mut program)?;
        self.load_program(&program)
    }

    /// Advances the CPU by a single cycle
    /// - completes a pending FX0A if a key has been pressed, otherwise
    /// - gets and executes the next opcode
    /// - then decrements the timers
    ///
    /// Unknown opcodes are skipped and reported as `Chip8Error::UnknownOpcode`; the machine keeps
    /// running. Stack faults halt the machine. The timers tick on every step that isn't already
    /// halted, including the one that faults.
    pub fn step(&mut self) -> Result<StepStatus> {
        self.beep = false;

        match self.state.run_state {
            RunState::Halted => return Ok(StepStatus::Halted),
            RunState::AwaitingKey { .. } => {
                self.state = resume_on_key(&self.state, &self.pressed_keys);
            }
            RunState::Running => {
                let pc = self.state.pc;
                let op = self.get_op();
                let instruction = match Instruction::decode(op) {
                    Some(instruction) => instruction,
                    None => {
                        warn!("skipping unknown opcode {:04X} at {:04X}", op, pc);
                        self.state.pc = pc.wrapping_add(0x2) & ADDRESS_MASK;
                        self.advance_timers();
                        return Err(Chip8Error::UnknownOpcode { opcode: op, pc });
                    }
                };

                trace!(
                    "{:04X} {:04X} {:<16} v{:02X?} i{:04X}",
                    pc,
                    op,
                    instruction.to_string(),
                    self.state.v,
                    self.state.i
                );
                match execute(
                    instruction,
                    &self.state,
                    &self.pressed_keys,
                    &self.quirks,
                    &mut self.rng,
                ) {
                    Ok(state) => self.state = state,
                    Err(e) => {
                        error!("halting: {}", e);
                        self.state.run_state = RunState::Halted;
                        self.advance_timers();
                        return Err(e);
                    }
                }
            }
        }

        self.advance_timers();
        Ok(self.status())
    }

    /// Decrements both timers toward 0, raising the beep when the sound timer runs out
    fn advance_timers(&mut self) {
        if self.state.delay_timer > 0 {
            self.state.delay_timer -= 1;
        }

        if self.state.sound_timer > 0 {
            self.state.sound_timer -= 1;
            self.beep = self.state.sound_timer == 0;
        }
    }

    /// Gets the opcode currently pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    fn get_op(&self) -> u16 {
        let pc = self.state.pc;
        let high = self.state.memory[(pc & ADDRESS_MASK) as usize];
        let low = self.state.memory[(pc.wrapping_add(1) & ADDRESS_MASK) as usize];
        opcode::from_bytes(high, low)
    }

    pub fn status(&self) -> StepStatus {
        match self.state.run_state {
            RunState::Running => StepStatus::Running,
            RunState::AwaitingKey { .. } => StepStatus::AwaitingKey,
            RunState::Halted => StepStatus::Halted,
        }
    }

    /// Returns the FrameBuffer and unsets the draw flag if the display should be redrawn
    pub fn take_frame(&mut self) -> Option<FrameBuffer> {
        if self.state.draw_flag {
            self.state.draw_flag = false;
            Some(self.state.frame_buffer)
        } else {
            None
        }
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.state.frame_buffer
    }

    pub fn draw_flag(&self) -> bool {
        self.state.draw_flag
    }

    pub fn clear_draw_flag(&mut self) {
        self.state.draw_flag = false;
    }

    /// Whether the sound timer ran out during the last step
    pub fn beep(&self) -> bool {
        self.beep
    }

    /// Set the pressed status of key
    ///
    /// # Arguments
    /// * `key` the keypad value 0..F that was pressed; anything larger is ignored
    pub fn key_press(&mut self, key: u8) {
        if let Some(pressed) = self.pressed_keys.get_mut(key as usize) {
            *pressed = true;
        }
    }

    /// Unset the pressed status of key
    ///
    /// # Arguments
    /// * `key` the keypad value 0..F that was released; anything larger is ignored
    pub fn key_release(&mut self, key: u8) {
        if let Some(pressed) = self.pressed_keys.get_mut(key as usize) {
            *pressed = false;
        }
    }

    pub fn set_keys(&mut self, keys: Keys) {
        self.pressed_keys = keys;
    }

    pub fn keys(&self) -> &Keys {
        &self.pressed_keys
    }

    pub fn quirks(&self) -> &Quirks {
        &self.quirks
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.state.v
    }

    pub fn index(&self) -> u16 {
        self.state.i
    }

    pub fn pc(&self) -> u16 {
        self.state.pc
    }

    pub fn sp(&self) -> u8 {
        self.state.sp
    }

    pub fn delay_timer(&self) -> u8 {
        self.state.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.state.sound_timer
    }

    pub fn memory(&self) -> &[u8] {
        &self.state.memory
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
