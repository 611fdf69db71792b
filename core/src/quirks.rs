/// Behaviors that differ between historical Chip-8 interpreters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// In FX55/FX65 advance I past the last register copied (I += X + 1).
    /// Many later interpreters leave I untouched instead.
    pub increment_index_on_store: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Quirks {
            increment_index_on_store: true,
        }
    }
}
