//! Write-side façade: a shared grammar handle and the per-stream
//! `OutputSequence`.
//!
//! One `SharedGrammar` serves any number of output sequences (for example
//! one integer stream per traced thread), so repeated patterns compress
//! across streams. The handle is a single coarse lock held for the duration
//! of each `append` and of serialization; the engine itself never spawns
//! threads or blocks outside the I/O boundary.

use crate::error::SequenceError;
use crate::grammar::Grammar;
use crate::symbol::{Symbol, SymbolNode};
use crate::value::TraceValue;
use crate::varint;
use crate::wire;
use slotmap::DefaultKey;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cheaply cloneable handle to one grammar shared by sibling sequences.
pub struct SharedGrammar<T> {
    inner: Arc<Mutex<Grammar<T>>>,
}

impl<T> Clone for SharedGrammar<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for SharedGrammar<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SharedGrammar<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Grammar::new())),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Grammar<T>> {
        self.inner.lock().expect("grammar lock poisoned")
    }
}

impl<T: TraceValue> SharedGrammar<T> {
    /// Opens a new output sequence feeding this grammar.
    ///
    /// # Panics
    ///
    /// Panics if the grammar has already been serialized; the rule numbering
    /// is fixed at that point.
    pub fn output_sequence(&self) -> OutputSequence<T> {
        let mut grammar = self.lock();
        assert!(
            grammar.numbering.is_none(),
            "cannot open a sequence after the grammar was serialized"
        );
        let (rule_id, _head, tail) = grammar.new_start_rule();
        drop(grammar);
        OutputSequence {
            grammar: self.clone(),
            rule_id,
            tail,
            length: 0,
            finished: false,
        }
    }

    /// Serializes the whole grammar: breadth-first rule numbering seeded
    /// from the start rules in creation order, then the count-prefixed,
    /// bit-packed rule list.
    ///
    /// All sequences feeding this grammar should be finished first. The
    /// numbering is computed once; writing again produces identical bytes.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), SequenceError> {
        let mut grammar = self.lock();
        wire::write_grammar(&mut grammar, w)
    }
}

/// One logical value stream being appended into a shared grammar.
///
/// Owns a private, non-reusable start rule; the grammar may fold parts of
/// its body into rules shared with sibling sequences, but no rule ever
/// references the start rule itself.
pub struct OutputSequence<T> {
    grammar: SharedGrammar<T>,
    rule_id: u32,
    tail: DefaultKey,
    length: u64,
    finished: bool,
}

impl<T: TraceValue> OutputSequence<T> {
    /// Appends one value to the sequence.
    ///
    /// A repeat of the trailing value only bumps a run count; anything else
    /// links a new terminal before the tail sentinel and re-establishes the
    /// digram invariants from there.
    ///
    /// # Panics
    ///
    /// Panics if the sequence is already finished.
    pub fn append(&mut self, value: T) {
        assert!(!self.finished, "append to a finished sequence");

        let mut grammar = self.grammar.lock();
        debug_assert!(
            grammar.numbering.is_none(),
            "append after the grammar was serialized"
        );

        let tail_key = self.tail;
        let prev_key = grammar.symbols[tail_key].prev;

        // Run extension fast path: no allocation, no digram work.
        if let Some(prev) = prev_key {
            if let Symbol::Value(prev_val) = &grammar.symbols[prev].symbol {
                if *prev_val == value {
                    grammar.symbols[prev].run += 1;
                    self.length += 1;
                    return;
                }
            }
        }

        let new_key = grammar.symbols.insert(SymbolNode::new(Symbol::Value(value)));

        grammar.symbols[new_key].next = Some(tail_key);
        grammar.symbols[new_key].prev = prev_key;
        grammar.symbols[tail_key].prev = Some(new_key);

        if let Some(prev) = prev_key {
            grammar.symbols[prev].next = Some(new_key);
        }

        self.length += 1;

        if let Some(prev) = prev_key {
            if !Grammar::is_head(&grammar.symbols[prev].symbol) {
                grammar.check_digram(prev);
            }
        }
    }

    /// Appends every value from `iter`.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.append(value);
        }
    }

    /// Number of values appended so far.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Freezes the sequence. Idempotent; later `append` calls panic.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Writes this sequence's trailer: the start-rule reference
    /// (`2 * rule_number`, low bit set for wide values) followed by the
    /// element count.
    ///
    /// # Panics
    ///
    /// Panics if the sequence is not finished or the grammar has not been
    /// serialized yet; trailers are only meaningful against the written
    /// rule numbering.
    pub fn write_trailer<W: Write>(&self, w: &mut W) -> Result<(), SequenceError> {
        assert!(self.finished, "trailer written before finish()");

        let grammar = self.grammar.lock();
        let numbering = grammar
            .numbering
            .as_ref()
            .expect("trailer written before the grammar");
        let number = *numbering
            .numbers
            .get(&self.rule_id)
            .expect("start rule missing from numbering");

        varint::write_u64(w, number * 2 + u64::from(T::WIDE))?;
        varint::write_u64(w, self.length)?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn rule_id(&self) -> u32 {
        self.rule_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sequence() {
        let grammar = SharedGrammar::<u32>::new();
        let seq = grammar.output_sequence();
        assert!(seq.is_empty());
        assert_eq!(seq.len(), 0);
    }

    #[test]
    fn test_append_counts() {
        let grammar = SharedGrammar::new();
        let mut seq = grammar.output_sequence();
        seq.extend([1u32, 1, 1, 2, 3]);
        assert_eq!(seq.len(), 5);
    }

    #[test]
    fn test_run_extension_single_node() {
        let grammar = SharedGrammar::new();
        let mut seq = grammar.output_sequence();
        for _ in 0..100 {
            seq.append(9u32);
        }

        let g = grammar.lock();
        let head = g.rules[&seq.rule_id()];
        let first = g.symbols[head].next.unwrap();
        assert_eq!(g.symbols[first].run, 100);
        assert!(matches!(g.symbols[first].symbol, Symbol::Value(9)));
        assert_eq!(g.symbols[first].next, Some(seq.tail));
    }

    #[test]
    fn test_finish_is_idempotent() {
        let grammar = SharedGrammar::new();
        let mut seq = grammar.output_sequence();
        seq.append(1u32);
        seq.finish();
        seq.finish();
        assert!(seq.is_finished());
    }

    #[test]
    #[should_panic(expected = "append to a finished sequence")]
    fn test_append_after_finish_panics() {
        let grammar = SharedGrammar::new();
        let mut seq = grammar.output_sequence();
        seq.finish();
        seq.append(1u32);
    }

    #[test]
    fn test_shared_rule_across_sequences() {
        let grammar = SharedGrammar::new();
        let mut a = grammar.output_sequence();
        let mut b = grammar.output_sequence();

        a.extend([1u32, 2, 3, 1, 2, 3]);
        b.extend([1u32, 2, 3, 1, 2, 3]);

        let g = grammar.lock();
        g.assert_digram_uniqueness();
        g.assert_rule_utility();
    }
}
