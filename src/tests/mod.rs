mod properties;

use crate::{InputGrammar, InputSequence, SequenceError, SharedGrammar, TraceValue};
use std::sync::Arc;

/// Compresses one value stream into grammar bytes plus its trailer.
pub(crate) fn compress<T: TraceValue>(values: &[T]) -> Vec<u8> {
    let grammar = SharedGrammar::new();
    let mut seq = grammar.output_sequence();
    for &v in values {
        seq.append(v);
    }
    seq.finish();

    let mut bytes = Vec::new();
    grammar.write_to(&mut bytes).unwrap();
    seq.write_trailer(&mut bytes).unwrap();
    bytes
}

pub(crate) fn decompress<T: TraceValue>(bytes: &[u8]) -> Result<Vec<T>, SequenceError> {
    let mut cursor = bytes;
    let grammar = Arc::new(InputGrammar::<T>::read_from(&mut cursor)?);
    let seq = InputSequence::read_trailer(grammar, &mut cursor)?;
    Ok(seq.iter().collect())
}

pub(crate) fn load_sequence<T: TraceValue>(bytes: &[u8]) -> InputSequence<T> {
    let mut cursor = bytes;
    let grammar = Arc::new(InputGrammar::<T>::read_from(&mut cursor).unwrap());
    InputSequence::read_trailer(grammar, &mut cursor).unwrap()
}
