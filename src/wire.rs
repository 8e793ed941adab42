//! Bit-packed binary format for a grammar and its rule bodies.
//!
//! Layout of the grammar section:
//!
//! ```text
//! varint rule_count
//! rule_count x rule body
//! ```
//!
//! Rule numbers are assigned breadth-first: the start rules (in sequence
//! creation order) seed a queue; each dequeued rule is written, and any rule
//! it references that has no number yet receives the next one and is
//! enqueued. The i-th body written therefore belongs to rule number i, and
//! references may point forward; readers resolve them against the total
//! count.
//!
//! Each rule body starts with a header byte. Bodies of length 2 or 3 pack
//! everything into it: the top two bits hold the length, followed by one
//! 2-bit tag per symbol from bit 5 downward. Any other length writes a zero
//! header byte, a varint length, then `ceil(len/4)` tag bytes packing four
//! tags each (high bits first). Symbol payloads follow in order: a varint
//! rule number or an encoded value, then a varint run count when the tag
//! says the run exceeds one.
//!
//! The surrounding trace-file container tags each stored sequence with the
//! backend that wrote it; the tags live here so container code and engine
//! agree on the values, but the engine itself never reads or writes them.

use crate::error::SequenceError;
use crate::grammar::{Grammar, RuleNumbering};
use crate::input::{ReadRule, ReadSymbol};
use crate::symbol::Symbol;
use crate::value::TraceValue;
use crate::varint;
use ahash::AHashMap as HashMap;
use std::collections::VecDeque;
use std::io::{Read, Write};
use tracing::debug;

/// Backend tags used by the enclosing trace-sequence container.
pub const BACKEND_UNCOMPRESSED: u8 = 0;
pub const BACKEND_GZIP: u8 = 1;
pub const BACKEND_SWITCHING: u8 = 2;
pub const BACKEND_SEQUITUR: u8 = 3;

const TAG_RULE: u8 = 0b00;
const TAG_RULE_RUN: u8 = 0b01;
const TAG_VALUE: u8 = 0b10;
const TAG_VALUE_RUN: u8 = 0b11;

/// A rule body symbol lifted out of the linked arena for emission.
enum WireSymbol<T> {
    Rule { number: u64, run: u64 },
    Value { value: T, run: u64 },
}

impl<T> WireSymbol<T> {
    fn tag(&self) -> u8 {
        match self {
            WireSymbol::Rule { run: 1, .. } => TAG_RULE,
            WireSymbol::Rule { .. } => TAG_RULE_RUN,
            WireSymbol::Value { run: 1, .. } => TAG_VALUE,
            WireSymbol::Value { .. } => TAG_VALUE_RUN,
        }
    }
}

/// Serializes the grammar, assigning (or reusing) its rule numbering.
pub(crate) fn write_grammar<T: TraceValue, W: Write>(
    grammar: &mut Grammar<T>,
    w: &mut W,
) -> Result<(), SequenceError> {
    if grammar.numbering.is_none() {
        grammar.numbering = Some(assign_numbers(grammar));
    }
    let numbering = grammar.numbering.as_ref().expect("numbering just assigned");

    varint::write_u64(w, numbering.order.len() as u64)?;

    for &rule_id in &numbering.order {
        let body = collect_body(grammar, rule_id, numbering);
        write_body(&body, w)?;
    }

    debug!(rules = numbering.order.len(), "serialized grammar");
    Ok(())
}

/// Breadth-first numbering seeded from the start rules in creation order.
fn assign_numbers<T>(grammar: &Grammar<T>) -> RuleNumbering {
    let mut numbers: HashMap<u32, u64> = HashMap::default();
    let mut order: Vec<u32> = Vec::new();
    let mut queue: VecDeque<u32> = VecDeque::new();

    for &rule_id in &grammar.start_rules {
        numbers.insert(rule_id, order.len() as u64);
        order.push(rule_id);
        queue.push_back(rule_id);
    }

    while let Some(rule_id) = queue.pop_front() {
        let head = grammar.rules[&rule_id];
        let mut current = grammar.symbols[head].next;
        while let Some(key) = current {
            let node = &grammar.symbols[key];
            if Grammar::is_tail(&node.symbol) {
                break;
            }
            if let Symbol::RuleRef { rule_id: child } = node.symbol {
                if !numbers.contains_key(&child) {
                    numbers.insert(child, order.len() as u64);
                    order.push(child);
                    queue.push_back(child);
                }
            }
            current = node.next;
        }
    }

    RuleNumbering { numbers, order }
}

fn collect_body<T: TraceValue>(
    grammar: &Grammar<T>,
    rule_id: u32,
    numbering: &RuleNumbering,
) -> Vec<WireSymbol<T>> {
    let head = grammar.rules[&rule_id];
    let mut body = Vec::new();
    let mut current = grammar.symbols[head].next;
    while let Some(key) = current {
        let node = &grammar.symbols[key];
        match &node.symbol {
            Symbol::RuleTail => break,
            Symbol::Value(v) => body.push(WireSymbol::Value {
                value: *v,
                run: node.run,
            }),
            Symbol::RuleRef { rule_id: child } => body.push(WireSymbol::Rule {
                number: numbering.numbers[child],
                run: node.run,
            }),
            Symbol::RuleHead { .. } => {
                unreachable!("rule head inside a rule body")
            }
        }
        current = node.next;
    }
    body
}

fn write_body<T: TraceValue, W: Write>(
    body: &[WireSymbol<T>],
    w: &mut W,
) -> Result<(), SequenceError> {
    let len = body.len();

    if len == 2 || len == 3 {
        let mut header = (len as u8) << 6;
        for (i, sym) in body.iter().enumerate() {
            header |= sym.tag() << (4 - 2 * i);
        }
        w.write_all(&[header])?;
    } else {
        w.write_all(&[0u8])?;
        varint::write_u64(w, len as u64)?;
        for chunk in body.chunks(4) {
            let mut tags = 0u8;
            for (i, sym) in chunk.iter().enumerate() {
                tags |= sym.tag() << (6 - 2 * i);
            }
            w.write_all(&[tags])?;
        }
    }

    for sym in body {
        match sym {
            WireSymbol::Rule { number, run } => {
                varint::write_u64(w, *number)?;
                if *run > 1 {
                    varint::write_u64(w, *run)?;
                }
            }
            WireSymbol::Value { value, run } => {
                value.write_to(w)?;
                if *run > 1 {
                    varint::write_u64(w, *run)?;
                }
            }
        }
    }

    Ok(())
}

/// Reads the grammar section back into flat rule bodies.
///
/// Rule references are validated against the total rule count (they may
/// legitimately point forward); every structural defect maps to a distinct
/// [`SequenceError`] variant rather than a panic.
pub(crate) fn read_rules<T: TraceValue, R: Read>(
    r: &mut R,
) -> Result<Vec<ReadRule<T>>, SequenceError> {
    let rule_count = varint::read_u64(r)?;
    let rule_count_usize =
        usize::try_from(rule_count).map_err(|_| SequenceError::CapacityExceeded)?;

    let mut rules = Vec::new();
    for _ in 0..rule_count_usize {
        rules.push(read_body(r, rule_count)?);
    }

    debug!(rules = rules.len(), "read grammar");
    Ok(rules)
}

fn read_body<T: TraceValue, R: Read>(
    r: &mut R,
    rule_count: u64,
) -> Result<ReadRule<T>, SequenceError> {
    let header = varint::read_byte(r)?;

    let mut tags: Vec<u8> = Vec::new();
    let len: usize;

    if header == 0 {
        let raw_len = varint::read_u64(r)?;
        len = usize::try_from(raw_len).map_err(|_| SequenceError::CapacityExceeded)?;
        let mut remaining = len;
        while remaining > 0 {
            let packed = varint::read_byte(r)?;
            let in_byte = remaining.min(4);
            for i in 0..in_byte {
                tags.push((packed >> (6 - 2 * i)) & 0b11);
            }
            remaining -= in_byte;
        }
    } else {
        match header >> 6 {
            n @ (2 | 3) => {
                len = n as usize;
                for i in 0..len {
                    tags.push((header >> (4 - 2 * i)) & 0b11);
                }
            }
            _ => return Err(SequenceError::InvalidHeader(header)),
        }
    }

    let mut symbols = Vec::with_capacity(len.min(1024));
    for &tag in &tags {
        let symbol = match tag {
            TAG_RULE | TAG_RULE_RUN => {
                let number = varint::read_u64(r)?;
                if number >= rule_count {
                    return Err(SequenceError::DanglingRuleReference {
                        reference: number,
                        rules: rule_count,
                    });
                }
                let run = if tag == TAG_RULE_RUN {
                    varint::read_u64(r)?
                } else {
                    1
                };
                if run == 0 {
                    return Err(SequenceError::InvalidRunLength);
                }
                ReadSymbol::Rule {
                    rule: number as usize,
                    run,
                }
            }
            _ => {
                let value = T::read_from(r)?;
                let run = if tag == TAG_VALUE_RUN {
                    varint::read_u64(r)?
                } else {
                    1
                };
                if run == 0 {
                    return Err(SequenceError::InvalidRunLength);
                }
                ReadSymbol::Value { value, run }
            }
        };
        symbols.push(symbol);
    }

    Ok(ReadRule::new(symbols))
}
