//! Read-side grammar and sequence handles.
//!
//! A deserialized grammar is immutable: rule bodies become flat vectors,
//! every rule's expanded length is computed (and validated) up front, and
//! any number of reader threads may then share the structure through an
//! `Arc` without synchronization. Only the per-rule cumulative offset
//! tables are built lazily, behind a `OnceLock`, and only for rules long
//! enough that binary search beats a linear scan.

use crate::cursor::SequenceCursor;
use crate::error::SequenceError;
use crate::value::TraceValue;
use crate::varint;
use crate::wire;
use std::io::Read;
use std::sync::Arc;
use std::sync::OnceLock;
use tracing::debug;

/// Rule bodies at or below this many symbols resolve offsets by linear
/// scan; longer ones build a cumulative-length table and binary-search it.
/// Both paths return the same resolution.
pub(crate) const LINEAR_SCAN_MAX: usize = 32;

/// A symbol in a decoded rule body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadSymbol<T> {
    Value { value: T, run: u64 },
    Rule { rule: usize, run: u64 },
}

/// A decoded rule: flat body plus its fully expanded length.
#[derive(Debug)]
pub(crate) struct ReadRule<T> {
    pub symbols: Vec<ReadSymbol<T>>,
    /// Total expanded value count; filled in right after decoding.
    pub length: u64,
    /// Lazily built table of cumulative expanded lengths after each symbol.
    index: OnceLock<Vec<u64>>,
}

impl<T> ReadRule<T> {
    pub(crate) fn new(symbols: Vec<ReadSymbol<T>>) -> Self {
        Self {
            symbols,
            length: 0,
            index: OnceLock::new(),
        }
    }
}

/// An immutable grammar decoded from its wire form.
#[derive(Debug)]
pub struct InputGrammar<T> {
    pub(crate) rules: Vec<ReadRule<T>>,
}

impl<T: TraceValue> InputGrammar<T> {
    /// Reads the grammar section from `r` and validates it: dangling or
    /// cyclic rule references, zero runs, referenced empty rules and
    /// overflowing expansions are all rejected here, so navigation never
    /// has to re-check.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, SequenceError> {
        let mut rules = wire::read_rules::<T, R>(r)?;
        let lengths = compute_lengths(&rules)?;
        for (rule, length) in rules.iter_mut().zip(lengths) {
            rule.length = length;
        }
        debug!(rules = rules.len(), "loaded input grammar");
        Ok(Self { rules })
    }

    /// Number of rules in the grammar.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Expanded length of one occurrence of `sym`'s unit (1 for a value,
    /// the referenced rule's length for a rule call).
    #[inline]
    pub(crate) fn unit_len(&self, sym: &ReadSymbol<T>) -> u64 {
        match sym {
            ReadSymbol::Value { .. } => 1,
            ReadSymbol::Rule { rule, .. } => self.rules[*rule].length,
        }
    }

    /// Resolves an offset inside a rule to `(symbol index, repetition,
    /// offset within that repetition)`.
    ///
    /// `offset` must be below the rule's expanded length.
    pub(crate) fn locate(&self, rule: usize, offset: u64) -> (usize, u64, u64) {
        let r = &self.rules[rule];
        debug_assert!(offset < r.length, "offset {offset} outside rule {rule}");

        if r.symbols.len() <= LINEAR_SCAN_MAX {
            let mut acc = 0u64;
            for (i, sym) in r.symbols.iter().enumerate() {
                let unit = self.unit_len(sym);
                let total = unit * run_of(sym);
                if offset < acc + total {
                    let rem = offset - acc;
                    return (i, rem / unit, rem % unit);
                }
                acc += total;
            }
            unreachable!("offset validated against rule length");
        }

        let ends = r.index.get_or_init(|| {
            let mut acc = 0u64;
            r.symbols
                .iter()
                .map(|sym| {
                    acc += self.unit_len(sym) * run_of(sym);
                    acc
                })
                .collect()
        });

        let i = ends.partition_point(|&end| end <= offset);
        let start = if i == 0 { 0 } else { ends[i - 1] };
        let rem = offset - start;
        let unit = self.unit_len(&r.symbols[i]);
        (i, rem / unit, rem % unit)
    }
}

#[inline]
pub(crate) fn run_of<T>(sym: &ReadSymbol<T>) -> u64 {
    match sym {
        ReadSymbol::Value { run, .. } | ReadSymbol::Rule { run, .. } => *run,
    }
}

/// Computes every rule's expanded length with an explicit-stack DFS.
///
/// Rules may reference forward, so this doubles as the structural
/// validation pass: cycles, references to empty rules and length overflow
/// are decode errors.
fn compute_lengths<T>(rules: &[ReadRule<T>]) -> Result<Vec<u64>, SequenceError> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        InProgress,
        Done,
    }

    let mut state = vec![State::Unvisited; rules.len()];
    let mut lengths = vec![0u64; rules.len()];

    for root in 0..rules.len() {
        if state[root] == State::Done {
            continue;
        }
        state[root] = State::InProgress;
        // (rule, next symbol to examine)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

        'dfs: while let Some(frame) = stack.last_mut() {
            let rule = frame.0;
            while frame.1 < rules[rule].symbols.len() {
                let sym_idx = frame.1;
                frame.1 += 1;
                if let ReadSymbol::Rule { rule: child, .. } = rules[rule].symbols[sym_idx] {
                    match state[child] {
                        State::Unvisited => {
                            state[child] = State::InProgress;
                            stack.push((child, 0));
                            continue 'dfs;
                        }
                        State::InProgress => {
                            return Err(SequenceError::CyclicRuleReference(child as u64));
                        }
                        State::Done => {}
                    }
                }
            }

            // all children resolved; sum this body up
            let mut total = 0u64;
            for sym in &rules[rule].symbols {
                let contribution = match *sym {
                    ReadSymbol::Value { run, .. } => run,
                    ReadSymbol::Rule { rule: child, run } => {
                        let child_len = lengths[child];
                        if child_len == 0 {
                            return Err(SequenceError::EmptyRuleReferenced(child as u64));
                        }
                        run.checked_mul(child_len)
                            .ok_or(SequenceError::CapacityExceeded)?
                    }
                };
                total = total
                    .checked_add(contribution)
                    .ok_or(SequenceError::CapacityExceeded)?;
            }
            lengths[rule] = total;
            state[rule] = State::Done;
            stack.pop();
        }
    }

    Ok(lengths)
}

/// One decoded value stream inside a shared input grammar.
#[derive(Debug)]
pub struct InputSequence<T> {
    grammar: Arc<InputGrammar<T>>,
    rule: usize,
    length: u64,
}

impl<T: TraceValue> InputSequence<T> {
    /// Reads a per-sequence trailer against an already-loaded grammar.
    ///
    /// The trailer's width bit must match `T`, its rule reference must name
    /// an emitted rule, and the declared element count must agree with that
    /// rule's expansion.
    pub fn read_trailer<R: Read>(
        grammar: Arc<InputGrammar<T>>,
        r: &mut R,
    ) -> Result<Self, SequenceError> {
        let tagged = varint::read_u64(r)?;
        let found_wide = tagged & 1 == 1;
        if found_wide != T::WIDE {
            return Err(SequenceError::SequenceTypeMismatch {
                expected_wide: T::WIDE,
                found_wide,
            });
        }

        let number = tagged >> 1;
        if number >= grammar.rules.len() as u64 {
            return Err(SequenceError::DanglingRuleReference {
                reference: number,
                rules: grammar.rules.len() as u64,
            });
        }
        let rule = number as usize;

        let length = varint::read_u64(r)?;
        let actual = grammar.rules[rule].length;
        if length != actual {
            return Err(SequenceError::LengthMismatch {
                declared: length,
                actual,
            });
        }

        Ok(Self {
            grammar,
            rule,
            length,
        })
    }

    /// Number of values in the sequence.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Random-access lookup of the value at `offset`.
    pub fn value_at(&self, offset: u64) -> Result<T, SequenceError> {
        if offset >= self.length {
            return Err(SequenceError::OffsetOutOfBounds {
                offset,
                length: self.length,
            });
        }

        let mut rule = self.rule;
        let mut off = offset;
        loop {
            let (i, _rep, sub) = self.grammar.locate(rule, off);
            match self.grammar.rules[rule].symbols[i] {
                ReadSymbol::Value { value, .. } => return Ok(value),
                ReadSymbol::Rule { rule: child, .. } => {
                    rule = child;
                    off = sub;
                }
            }
        }
    }

    /// A cursor positioned before the first value.
    pub fn iter(&self) -> SequenceCursor<T> {
        self.iterator(0).expect("offset 0 is always in bounds")
    }

    /// A bidirectional cursor positioned before the value at `offset`.
    ///
    /// `offset == len()` is allowed and yields a cursor at the end, useful
    /// for walking a trace tail-to-head with `previous()`.
    pub fn iterator(&self, offset: u64) -> Result<SequenceCursor<T>, SequenceError> {
        if offset > self.length {
            return Err(SequenceError::OffsetOutOfBounds {
                offset,
                length: self.length,
            });
        }
        Ok(SequenceCursor::new(
            Arc::clone(&self.grammar),
            self.rule,
            self.length,
            offset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar_of(rules: Vec<Vec<ReadSymbol<u32>>>) -> Result<InputGrammar<u32>, SequenceError> {
        let mut rules: Vec<ReadRule<u32>> = rules.into_iter().map(ReadRule::new).collect();
        let lengths = compute_lengths(&rules)?;
        for (rule, length) in rules.iter_mut().zip(lengths) {
            rule.length = length;
        }
        Ok(InputGrammar { rules })
    }

    #[test]
    fn test_lengths_with_forward_reference() {
        let g = grammar_of(vec![
            vec![
                ReadSymbol::Rule { rule: 1, run: 2 },
                ReadSymbol::Value { value: 9, run: 1 },
            ],
            vec![
                ReadSymbol::Value { value: 1, run: 3 },
                ReadSymbol::Value { value: 2, run: 1 },
            ],
        ])
        .unwrap();
        assert_eq!(g.rules[1].length, 4);
        assert_eq!(g.rules[0].length, 9);
    }

    #[test]
    fn test_cycle_detected() {
        let err = grammar_of(vec![
            vec![ReadSymbol::Rule { rule: 1, run: 1 }],
            vec![ReadSymbol::Rule { rule: 0, run: 1 }],
        ])
        .unwrap_err();
        assert!(matches!(err, SequenceError::CyclicRuleReference(_)));
    }

    #[test]
    fn test_self_reference_detected() {
        let err = grammar_of(vec![vec![ReadSymbol::Rule { rule: 0, run: 1 }]]).unwrap_err();
        assert!(matches!(err, SequenceError::CyclicRuleReference(0)));
    }

    #[test]
    fn test_empty_rule_reference_rejected() {
        let err = grammar_of(vec![vec![ReadSymbol::Rule { rule: 1, run: 1 }], vec![]])
            .unwrap_err();
        assert!(matches!(err, SequenceError::EmptyRuleReferenced(1)));
    }

    #[test]
    fn test_overflowing_expansion_rejected() {
        let err = grammar_of(vec![
            vec![ReadSymbol::Rule { rule: 1, run: u64::MAX }],
            vec![ReadSymbol::Value { value: 0, run: 2 }],
        ])
        .unwrap_err();
        assert!(matches!(err, SequenceError::CapacityExceeded));
    }

    #[test]
    fn test_grammar_is_debug_formattable() {
        let g = grammar_of(vec![vec![ReadSymbol::Value { value: 1, run: 2 }]]).unwrap();
        assert!(format!("{g:?}").contains("rules"));
    }

    #[test]
    fn test_locate_linear_and_indexed_agree() {
        // one long flat rule, resolved through both paths
        let symbols: Vec<ReadSymbol<u32>> = (0..100)
            .map(|v| ReadSymbol::Value {
                value: v,
                run: u64::from(v % 3 + 1),
            })
            .collect();

        let long = grammar_of(vec![symbols.clone()]).unwrap();
        assert!(long.rules[0].symbols.len() > LINEAR_SCAN_MAX);

        // the same prefix as a short rule stays on the linear path
        let short = grammar_of(vec![symbols[..20].to_vec()]).unwrap();

        for offset in 0..short.rules[0].length {
            assert_eq!(
                long.locate(0, offset),
                short.locate(0, offset),
                "offset {offset}"
            );
        }
    }

    #[test]
    fn test_locate_descends_with_runs() {
        let g = grammar_of(vec![
            vec![
                ReadSymbol::Value { value: 7, run: 2 },
                ReadSymbol::Rule { rule: 1, run: 3 },
            ],
            vec![
                ReadSymbol::Value { value: 1, run: 1 },
                ReadSymbol::Value { value: 2, run: 1 },
            ],
        ])
        .unwrap();

        // layout: 7 7 (1 2) (1 2) (1 2)
        assert_eq!(g.locate(0, 0), (0, 0, 0));
        assert_eq!(g.locate(0, 1), (0, 1, 0));
        assert_eq!(g.locate(0, 2), (1, 0, 0));
        assert_eq!(g.locate(0, 3), (1, 0, 1));
        assert_eq!(g.locate(0, 4), (1, 1, 0));
        assert_eq!(g.locate(0, 7), (1, 2, 1));
    }
}
