use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, FONT_SET, KEY_COUNT, MEMORY_SIZE, PROGRAM_START, STACK_SIZE,
};

/// The FrameBuffer is a row-major 64x32 array of pixels, indexed as `x + y * DISPLAY_WIDTH`.
/// Each pixel is either 0 (off) or 1 (on).
pub type FrameBuffer = [u8; DISPLAY_WIDTH * DISPLAY_HEIGHT];

/// The pressed status of the keys 0..F
pub type Keys = [bool; KEY_COUNT];

/// Whether the CPU is executing instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// Suspended by FX0A until a key goes down.
    /// `held` is the key state last observed, so only new presses count.
    AwaitingKey { register: u8, held: Keys },
    /// Stopped after a stack fault
    Halted,
}

/// A snapshot of the Chip8 internal state
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) is also the carry, borrow and collision flag
/// - (i) a 12-bit memory address register
///
/// Counter
/// - (pc) a 16-bit program counter
///
/// Pointer
/// - (sp) the number of return addresses on the stack
///
/// Timers
/// - 2 8-bit timers (delay & sound)
/// - both are decremented once per cycle while above 0
///
/// ## Memory
/// - 16 slot stack
///     - stores return addresses when subroutines are called
/// - 4096 bytes of addressable memory
///     - 0x000..0x050 holds the font set
///     - programs are loaded at 0x200
/// - 64x32 byte frame buffer
///     - stores the contents of the next frame to be drawn
#[derive(Copy, Clone)]
pub struct State {
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    pub sp: u8,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub stack: [u16; STACK_SIZE],
    pub memory: [u8; MEMORY_SIZE],
    pub frame_buffer: FrameBuffer,
    pub draw_flag: bool,
    pub run_state: RunState,
}

impl State {
    pub fn new() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[..FONT_SET.len()].copy_from_slice(&FONT_SET);

        State {
            v: [0; 16],
            i: 0,
            pc: PROGRAM_START,
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            stack: [0; STACK_SIZE],
            memory,
            frame_buffer: [0; DISPLAY_WIDTH * DISPLAY_HEIGHT],
            draw_flag: false,
            run_state: RunState::Running,
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_is_seeded() {
        let state = State::new();
        assert_eq!(state.memory[..80], FONT_SET[..]);
    }

    #[test]
    fn test_memory_past_font_is_zeroed() {
        let state = State::new();
        assert!(state.memory[80..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_starts_at_program() {
        let state = State::new();
        assert_eq!(state.pc, 0x200);
        assert_eq!(state.i, 0);
        assert_eq!(state.sp, 0);
        assert_eq!(state.run_state, RunState::Running);
        assert!(!state.draw_flag);
    }
}
