//! Bidirectional cursor over a decoded sequence.
//!
//! The cursor keeps an explicit descent stack describing where the element
//! in front of it lives: one frame per rule on the path from the start rule
//! down to a terminal, each recording the symbol index and which repetition
//! of that symbol's run is active. Stepping moves the stack incrementally,
//! so `next()`/`previous()` are amortized O(1) and exact mirrors of each
//! other; only absolute repositioning pays the logarithmic descent.

use crate::input::{run_of, InputGrammar, ReadSymbol};
use crate::value::TraceValue;
use std::sync::Arc;

/// Location of one element: a symbol occurrence within a rule body.
#[derive(Debug, Clone, Copy)]
struct Frame {
    rule: usize,
    sym: usize,
    /// Which repetition of the symbol's run this path goes through.
    rep: u64,
}

/// Cursor between elements of a sequence, in the style of a list iterator:
/// `next()` returns the element after the cursor, `previous()` the one
/// before, and each moves the cursor over the element it returned.
pub struct SequenceCursor<T> {
    grammar: Arc<InputGrammar<T>>,
    root: usize,
    length: u64,
    /// Number of elements before the cursor.
    pos: u64,
    /// Path to the element `next()` would return; empty iff at the end.
    stack: Vec<Frame>,
}

impl<T: TraceValue> SequenceCursor<T> {
    pub(crate) fn new(
        grammar: Arc<InputGrammar<T>>,
        root: usize,
        length: u64,
        offset: u64,
    ) -> Self {
        debug_assert!(offset <= length);
        let mut cursor = Self {
            grammar,
            root,
            length,
            pos: offset,
            stack: Vec::new(),
        };
        cursor.rebuild_stack();
        cursor
    }

    /// Index of the element `next()` would return.
    pub fn nth_index(&self) -> u64 {
        self.pos
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.length
    }

    pub fn has_previous(&self) -> bool {
        self.pos > 0
    }

    /// Returns the element after the cursor and steps over it.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<T> {
        if self.pos == self.length {
            return None;
        }
        let value = self.current_value();
        self.advance();
        Some(value)
    }

    /// Returns the element before the cursor and steps back over it.
    pub fn previous(&mut self) -> Option<T> {
        if self.pos == 0 {
            return None;
        }
        self.retreat();
        Some(self.current_value())
    }

    /// Value of the element the stack currently points at.
    fn current_value(&self) -> T {
        let leaf = self.stack.last().expect("stack empty inside bounds");
        match self.grammar.rules[leaf.rule].symbols[leaf.sym] {
            ReadSymbol::Value { value, .. } => value,
            ReadSymbol::Rule { .. } => unreachable!("cursor leaf is not a terminal"),
        }
    }

    /// Rebuilds the stack for the element at `self.pos` by offset descent.
    fn rebuild_stack(&mut self) {
        self.stack.clear();
        if self.pos == self.length {
            return;
        }
        let mut rule = self.root;
        let mut off = self.pos;
        loop {
            let (sym, rep, sub) = self.grammar.locate(rule, off);
            self.stack.push(Frame { rule, sym, rep });
            match self.grammar.rules[rule].symbols[sym] {
                ReadSymbol::Value { .. } => return,
                ReadSymbol::Rule { rule: child, .. } => {
                    rule = child;
                    off = sub;
                }
            }
        }
    }

    /// Moves the stack one element forward.
    fn advance(&mut self) {
        self.pos += 1;
        if self.pos == self.length {
            self.stack.clear();
            return;
        }

        // stay within the terminal's run when possible
        {
            let leaf = self.stack.last_mut().expect("stack empty inside bounds");
            let run = run_of(&self.grammar.rules[leaf.rule].symbols[leaf.sym]);
            if leaf.rep + 1 < run {
                leaf.rep += 1;
                return;
            }
        }

        // climb until something to the right exists
        loop {
            let frame = *self.stack.last().expect("ran past sequence end");
            if frame.sym + 1 < self.grammar.rules[frame.rule].symbols.len() {
                let top = self.stack.last_mut().expect("stack empty");
                top.sym += 1;
                top.rep = 0;
                self.descend_front();
                return;
            }

            self.stack.pop();
            let parent = self.stack.last_mut().expect("ran past sequence end");
            let run = run_of(&self.grammar.rules[parent.rule].symbols[parent.sym]);
            if parent.rep + 1 < run {
                parent.rep += 1;
                self.descend_front();
                return;
            }
            // parent's run exhausted too; keep climbing
        }
    }

    /// Moves the stack one element backward.
    fn retreat(&mut self) {
        self.pos -= 1;

        if self.stack.is_empty() {
            // was at the end; resolve the final element from scratch
            self.rebuild_stack();
            return;
        }

        {
            let leaf = self.stack.last_mut().expect("checked non-empty");
            if leaf.rep > 0 {
                leaf.rep -= 1;
                return;
            }
        }

        loop {
            let frame = *self.stack.last().expect("ran past sequence start");
            if frame.sym > 0 {
                let prev_sym = frame.sym - 1;
                let run = run_of(&self.grammar.rules[frame.rule].symbols[prev_sym]);
                let top = self.stack.last_mut().expect("stack empty");
                top.sym = prev_sym;
                top.rep = run - 1;
                self.descend_back();
                return;
            }

            self.stack.pop();
            let parent = self.stack.last_mut().expect("ran past sequence start");
            if parent.rep > 0 {
                parent.rep -= 1;
                self.descend_back();
                return;
            }
        }
    }

    /// Descends from the symbol at the top of the stack to its first value.
    fn descend_front(&mut self) {
        loop {
            let frame = *self.stack.last().expect("descend from empty stack");
            match self.grammar.rules[frame.rule].symbols[frame.sym] {
                ReadSymbol::Value { .. } => return,
                ReadSymbol::Rule { rule: child, .. } => {
                    self.stack.push(Frame {
                        rule: child,
                        sym: 0,
                        rep: 0,
                    });
                }
            }
        }
    }

    /// Descends from the symbol at the top of the stack to its last value.
    fn descend_back(&mut self) {
        loop {
            let frame = *self.stack.last().expect("descend from empty stack");
            match self.grammar.rules[frame.rule].symbols[frame.sym] {
                ReadSymbol::Value { .. } => return,
                ReadSymbol::Rule { rule: child, .. } => {
                    let last = self.grammar.rules[child].symbols.len() - 1;
                    let run = run_of(&self.grammar.rules[child].symbols[last]);
                    self.stack.push(Frame {
                        rule: child,
                        sym: last,
                        rep: run - 1,
                    });
                }
            }
        }
    }
}

impl<T: TraceValue> Iterator for SequenceCursor<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        SequenceCursor::next(self)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.length - self.pos).ok();
        (remaining.unwrap_or(usize::MAX), remaining)
    }
}
