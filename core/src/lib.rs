//! A Chip-8 interpreter core.
//!
//! The host owns the timing: it calls [`Chip8::step`] at its chosen instruction rate, feeds in key
//! state between steps, and reads back the frame buffer and beep after each one.

pub use chip8::{Chip8, StepStatus};
pub use error::{Chip8Error, Result};
pub use instruction::Instruction;
pub use quirks::Quirks;
pub use state::{FrameBuffer, Keys};

mod chip8;
pub mod constants;
mod error;
mod instruction;
mod opcode;
mod operations;
mod quirks;
pub mod state;
