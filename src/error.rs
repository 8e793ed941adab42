use thiserror::Error;

/// Errors surfaced while decoding or navigating compressed sequences.
///
/// Trace integrity is load-bearing for every consumer of a sequence, so
/// nothing in this taxonomy is recovered from silently: a corrupt stream
/// always reaches the caller as an error. Programmer errors (appending to a
/// finished sequence, writing a trailer before the grammar) are not errors
/// but panics.
#[derive(Debug, Error)]
pub enum SequenceError {
    /// The stream ended in the middle of a varint, header, or symbol payload.
    #[error("unexpected end of data")]
    UnexpectedEndOfData,

    /// A rule header byte with an undefined layout tag.
    #[error("invalid rule header byte {0:#04x}")]
    InvalidHeader(u8),

    /// A rule body references a rule number that was never emitted.
    #[error("rule reference {reference} out of range ({rules} rules present)")]
    DanglingRuleReference { reference: u64, rules: u64 },

    /// A symbol carried a run length of zero.
    #[error("symbol run length of zero")]
    InvalidRunLength,

    /// Rule bodies form a reference cycle, so no finite expansion exists.
    #[error("cyclic reference involving rule {0}")]
    CyclicRuleReference(u64),

    /// A rule with an empty body is referenced from another rule body.
    #[error("rule {0} has an empty body but is referenced")]
    EmptyRuleReferenced(u64),

    /// The sequence trailer's width bit does not match the requested value type.
    #[error("sequence type mismatch: stream wide={found_wide}, reader wide={expected_wide}")]
    SequenceTypeMismatch {
        expected_wide: bool,
        found_wide: bool,
    },

    /// A decoded value does not fit the sequence's declared value type.
    #[error("value {0} out of range for the sequence value type")]
    ValueOutOfRange(u64),

    /// A sequence trailer's declared element count disagrees with its start
    /// rule's actual expansion.
    #[error("sequence declares {declared} elements but its rule expands to {actual}")]
    LengthMismatch { declared: u64, actual: u64 },

    /// An offset query past the end of the sequence.
    #[error("offset {offset} out of bounds for sequence of length {length}")]
    OffsetOutOfBounds { offset: u64, length: u64 },

    /// A decoded length or count exceeds what this process can address.
    #[error("decoded size exceeds addressable capacity")]
    CapacityExceeded,

    /// An I/O failure from the backing stream, passed through unchanged.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
