use thiserror::Error;

/// Everything that can go wrong while loading or running a program
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("program is too large ({size} bytes), at most {max} bytes fit in memory")]
    ProgramTooLarge { size: usize, max: usize },

    #[error("stack overflow: call at {pc:#06X} with every stack slot in use")]
    StackOverflow { pc: u16 },

    #[error("stack underflow: return at {pc:#06X} with an empty stack")]
    StackUnderflow { pc: u16 },

    #[error("unknown opcode {opcode:#06X} at {pc:#06X}")]
    UnknownOpcode { opcode: u16, pc: u16 },

    #[error("unable to read program source: {0}")]
    SourceUnavailable(#[from] std::io::Error),
}

impl Chip8Error {
    /// Whether the machine can keep running after this error.
    ///
    /// Unknown opcodes are skipped over, but a broken call stack leaves the pc with
    /// nowhere meaningful to go.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Chip8Error::StackOverflow { .. } | Chip8Error::StackUnderflow { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Chip8Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_errors_are_fatal() {
        assert!(Chip8Error::StackOverflow { pc: 0x200 }.is_fatal());
        assert!(Chip8Error::StackUnderflow { pc: 0x200 }.is_fatal());
    }

    #[test]
    fn test_unknown_opcode_is_not_fatal() {
        let err = Chip8Error::UnknownOpcode {
            opcode: 0xFFFF,
            pc: 0x202,
        };
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "unknown opcode 0xFFFF at 0x0202");
    }

    #[test]
    fn test_io_errors_become_source_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.ch8");
        let err: Chip8Error = io.into();
        assert!(matches!(err, Chip8Error::SourceUnavailable(_)));
        assert!(!err.is_fatal());
    }
}
