//! Operand extraction for raw 16-bit opcodes.
//!
//! An opcode is read high byte first from `memory[pc]` and `memory[pc + 1]`. The top nibble
//! picks the instruction group; inside a group, either the low nibble (0x5, 0x8, 0x9) or the low
//! byte (0x0, 0xE, 0xF) picks the instruction. Whatever isn't used for selection is an operand:
//!
//! | bits     | operand                                  |
//! |----------|------------------------------------------|
//! | `0x0F00` | X, a register (or the last of V0..=VX)   |
//! | `0x00F0` | Y, a register                            |
//! | `0x000F` | N, a sprite height                       |
//! | `0x00FF` | NN, an immediate byte                    |
//! | `0x0FFF` | NNN, a 12-bit address                    |

/// Field accessors for an opcode word.
pub trait Opcode {
    /// All four nibbles, most significant first.
    fn nibbles(&self) -> (u8, u8, u8, u8);

    /// Register index X, bits 8..12.
    fn x(&self) -> u8;

    /// Register index Y, bits 4..8.
    fn y(&self) -> u8;

    /// Sprite height N, bits 0..4.
    fn n(&self) -> u8;

    /// Immediate byte NN.
    fn nn(&self) -> u8;

    /// Address NNN.
    fn nnn(&self) -> u16;
}

impl Opcode for u16 {
    fn nibbles(&self) -> (u8, u8, u8, u8) {
        (((self & 0xF000) >> 12) as u8, self.x(), self.y(), self.n())
    }

    fn x(&self) -> u8 {
        ((self & 0x0F00) >> 8) as u8
    }

    fn y(&self) -> u8 {
        ((self & 0x00F0) >> 4) as u8
    }

    fn n(&self) -> u8 {
        (self & 0x000F) as u8
    }

    fn nn(&self) -> u8 {
        (self & 0x00FF) as u8
    }

    fn nnn(&self) -> u16 {
        self & 0x0FFF
    }
}

/// Joins the byte at pc and the byte after it into one opcode word.
pub fn from_bytes(high: u8, low: u8) -> u16 {
    u16::from(high) << 8 | u16::from(low)
}
