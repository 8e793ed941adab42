//! # trace-sequitur: grammar compression for execution trace streams
//!
//! Online Sequitur-style compression of integer/long value streams into a
//! context-free grammar, plus a reader that answers random-access and
//! bidirectional iteration queries without expanding the stream.
//!
//! A dynamic slicer records one value stream per traced entity (for example
//! one instruction-event stream per thread) and later walks those streams
//! tail-to-head over files larger than memory. The engine maintains two
//! constraints while appending (no digram occurs twice, and every shared
//! rule is used at least twice), with runs of equal symbols collapsed into
//! run-length counts, so both exact repetition and structural repetition
//! compress.
//!
//! ## Example
//!
//! ```
//! use trace_sequitur::{InputGrammar, InputSequence, SharedGrammar};
//! use std::sync::Arc;
//!
//! // write side: sequences share one grammar
//! let grammar = SharedGrammar::new();
//! let mut seq = grammar.output_sequence();
//! seq.extend([1u32, 2, 3, 1, 2, 3, 1, 2, 3]);
//! seq.finish();
//!
//! let mut bytes = Vec::new();
//! grammar.write_to(&mut bytes).unwrap();
//! seq.write_trailer(&mut bytes).unwrap();
//!
//! // read side: load once, navigate lazily
//! let mut cursor = bytes.as_slice();
//! let loaded = Arc::new(InputGrammar::<u32>::read_from(&mut cursor).unwrap());
//! let input = InputSequence::read_trailer(loaded, &mut cursor).unwrap();
//!
//! assert_eq!(input.value_at(4).unwrap(), 2);
//! let mut it = input.iterator(input.len()).unwrap();
//! assert_eq!(it.previous(), Some(3)); // walking backward from the tail
//! ```
//!
//! ## Concurrency
//!
//! A [`SharedGrammar`] takes one coarse lock per `append` and per
//! serialization; a loaded [`InputGrammar`] is immutable and freely shared
//! across reader threads.

mod cursor;
mod error;
mod grammar;
mod input;
mod output;
mod symbol;
mod value;
pub mod varint;
mod wire;

#[cfg(test)]
mod tests;

pub use cursor::SequenceCursor;
pub use error::SequenceError;
pub use input::{InputGrammar, InputSequence};
pub use output::{OutputSequence, SharedGrammar};
pub use value::TraceValue;
pub use wire::{BACKEND_GZIP, BACKEND_SEQUITUR, BACKEND_SWITCHING, BACKEND_UNCOMPRESSED};
