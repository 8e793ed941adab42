use super::{compress, decompress, load_sequence};
use crate::{InputGrammar, InputSequence, SharedGrammar};
use proptest::prelude::*;
use std::sync::Arc;

/// Values drawn from a small alphabet so rules actually form.
fn repetitive_u32() -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::vec(0u32..6, 0..200)
}

proptest! {
    /// Wire round-trip fidelity: decode(encode(seq)) == seq.
    #[test]
    fn prop_roundtrip_repetitive(input in repetitive_u32()) {
        let bytes = compress(&input);
        prop_assert_eq!(decompress::<u32>(&bytes).unwrap(), input);
    }

    /// Round-trip over the full value range, including values needing
    /// multi-byte varint payloads.
    #[test]
    fn prop_roundtrip_arbitrary(input: Vec<u32>) {
        let bytes = compress(&input);
        prop_assert_eq!(decompress::<u32>(&bytes).unwrap(), input);
    }

    /// Signed wide values survive the zigzag mapping.
    #[test]
    fn prop_roundtrip_signed(input: Vec<i64>) {
        let bytes = compress(&input);
        prop_assert_eq!(decompress::<i64>(&bytes).unwrap(), input);
    }

    /// After every single append, no digram occurs twice anywhere in the
    /// grammar and every reusable rule is referenced at least twice.
    #[test]
    fn prop_invariants_after_each_append(input in proptest::collection::vec(0u32..5, 0..60)) {
        let grammar = SharedGrammar::new();
        let mut seq = grammar.output_sequence();
        for &v in &input {
            seq.append(v);
            let g = grammar.lock();
            g.assert_digram_uniqueness();
            g.assert_rule_utility();
        }
    }

    /// iterator(i).next() agrees with the decoded sequence at every offset,
    /// as does value_at(i).
    #[test]
    fn prop_random_access_consistency(input in repetitive_u32()) {
        let bytes = compress(&input);
        let decoded = decompress::<u32>(&bytes).unwrap();
        let seq = load_sequence::<u32>(&bytes);

        for (i, &expected) in decoded.iter().enumerate() {
            let i = i as u64;
            prop_assert_eq!(seq.value_at(i).unwrap(), expected);
            let mut it = seq.iterator(i).unwrap();
            prop_assert_eq!(it.next(), Some(expected));
        }
    }

    /// A cursor driven by an arbitrary mix of next()/previous() calls always
    /// agrees with a plain index into the decoded sequence.
    #[test]
    fn prop_bidirectional_symmetry(
        input in repetitive_u32(),
        start in 0usize..200,
        steps in proptest::collection::vec(any::<bool>(), 0..300),
    ) {
        let bytes = compress(&input);
        let decoded = decompress::<u32>(&bytes).unwrap();
        let seq = load_sequence::<u32>(&bytes);

        let mut pos = start.min(decoded.len());
        let mut cursor = seq.iterator(pos as u64).unwrap();

        for forward in steps {
            if forward {
                let expected = decoded.get(pos).copied();
                prop_assert_eq!(cursor.next(), expected);
                if pos < decoded.len() {
                    pos += 1;
                }
            } else {
                let expected = pos.checked_sub(1).map(|p| decoded[p]);
                prop_assert_eq!(cursor.previous(), expected);
                pos = pos.saturating_sub(1);
            }
            prop_assert_eq!(cursor.nth_index(), pos as u64);
        }
    }

    /// Serializing a finished grammar twice yields identical bytes.
    #[test]
    fn prop_serialization_idempotent(input in repetitive_u32()) {
        let grammar = SharedGrammar::new();
        let mut seq = grammar.output_sequence();
        for &v in &input {
            seq.append(v);
        }
        seq.finish();
        seq.finish();

        let mut first = Vec::new();
        grammar.write_to(&mut first).unwrap();
        seq.write_trailer(&mut first).unwrap();

        let mut second = Vec::new();
        grammar.write_to(&mut second).unwrap();
        seq.write_trailer(&mut second).unwrap();

        prop_assert_eq!(first, second);
    }

    /// Two sequences sharing a grammar round-trip independently.
    #[test]
    fn prop_shared_grammar_roundtrip(
        a in repetitive_u32(),
        b in repetitive_u32(),
    ) {
        let grammar = SharedGrammar::new();
        let mut seq_a = grammar.output_sequence();
        let mut seq_b = grammar.output_sequence();

        // interleave so cross-sequence rules can form
        let mut ia = a.iter();
        let mut ib = b.iter();
        loop {
            match (ia.next(), ib.next()) {
                (None, None) => break,
                (va, vb) => {
                    if let Some(&v) = va {
                        seq_a.append(v);
                    }
                    if let Some(&v) = vb {
                        seq_b.append(v);
                    }
                }
            }
        }
        seq_a.finish();
        seq_b.finish();

        let mut bytes = Vec::new();
        grammar.write_to(&mut bytes).unwrap();
        seq_a.write_trailer(&mut bytes).unwrap();
        seq_b.write_trailer(&mut bytes).unwrap();

        let mut cursor = bytes.as_slice();
        let loaded = Arc::new(InputGrammar::<u32>::read_from(&mut cursor).unwrap());
        let in_a = InputSequence::read_trailer(Arc::clone(&loaded), &mut cursor).unwrap();
        let in_b = InputSequence::read_trailer(loaded, &mut cursor).unwrap();

        prop_assert_eq!(in_a.iter().collect::<Vec<_>>(), a);
        prop_assert_eq!(in_b.iter().collect::<Vec<_>>(), b);
    }

    /// Truncating a valid encoding anywhere yields an error, never a panic
    /// or a silently short sequence.
    #[test]
    fn prop_truncation_detected(input in proptest::collection::vec(0u32..6, 1..80)) {
        let bytes = compress(&input);
        for cut in 0..bytes.len() {
            prop_assert!(decompress::<u32>(&bytes[..cut]).is_err());
        }
    }
}

/// Decoding arbitrary bytes must never panic, whatever garbage arrives.
#[test]
fn fuzz_decode_no_panic() {
    bolero::check!().with_type::<Vec<u8>>().for_each(|bytes| {
        let mut cursor = bytes.as_slice();
        if let Ok(grammar) = InputGrammar::<u32>::read_from(&mut cursor) {
            let grammar = Arc::new(grammar);
            if let Ok(seq) = InputSequence::read_trailer(grammar, &mut cursor) {
                // navigation over a structurally valid grammar is total
                let _ = seq.value_at(0);
                let n: u64 = seq.iter().count() as u64;
                assert_eq!(n, seq.len());
            }
        }
    });
}

/// Compression plus full decode never panics and always round-trips.
#[test]
fn fuzz_roundtrip_no_panic() {
    bolero::check!().with_type::<Vec<u8>>().for_each(|input| {
        let values: Vec<u32> = input.iter().map(|&b| u32::from(b % 8)).collect();
        let bytes = compress(&values);
        assert_eq!(decompress::<u32>(&bytes).unwrap(), values);
    });
}

#[test]
fn test_invariants_on_interleaved_runs() {
    // the two inserted references melt into one run mid-cascade; the digram
    // against the merged node's left neighbor must still be indexed, or the
    // later (value, rule) repeat never folds
    let input = [1u32, 1, 0, 0, 1, 0, 0, 1, 1, 0, 0];
    let grammar = SharedGrammar::new();
    let mut seq = grammar.output_sequence();
    for &v in &input {
        seq.append(v);
        let g = grammar.lock();
        g.assert_digram_uniqueness();
        g.assert_rule_utility();
    }
    seq.finish();

    let bytes = compress(&input);
    assert_eq!(decompress::<u32>(&bytes).unwrap(), input);
}

#[test]
fn test_invariants_exhaustive_short_binary() {
    for len in 0..=12u32 {
        for bits in 0u32..(1u32 << len) {
            let input: Vec<u32> = (0..len).map(|i| (bits >> i) & 1).collect();
            let grammar = SharedGrammar::new();
            let mut seq = grammar.output_sequence();
            for &v in &input {
                seq.append(v);
                let g = grammar.lock();
                g.assert_digram_uniqueness();
                g.assert_rule_utility();
            }
            seq.finish();

            let mut bytes = Vec::new();
            grammar.write_to(&mut bytes).unwrap();
            seq.write_trailer(&mut bytes).unwrap();
            assert_eq!(
                decompress::<u32>(&bytes).unwrap(),
                input,
                "bits {bits:#b} len {len}"
            );
        }
    }
}

#[test]
fn test_backward_iteration_matches_reverse() {
    let input: Vec<u32> = (0..500).map(|i| (i * i) % 7).collect();
    let bytes = compress(&input);
    let seq = load_sequence::<u32>(&bytes);

    let mut cursor = seq.iterator(seq.len()).unwrap();
    let mut backward = Vec::new();
    while let Some(v) = cursor.previous() {
        backward.push(v);
    }
    backward.reverse();
    assert_eq!(backward, input);
}

#[test]
fn test_empty_sequence_roundtrip() {
    let bytes = compress::<u32>(&[]);
    assert_eq!(decompress::<u32>(&bytes).unwrap(), Vec::<u32>::new());

    let seq = load_sequence::<u32>(&bytes);
    assert!(seq.is_empty());
    assert!(seq.value_at(0).is_err());
    let mut it = seq.iter();
    assert_eq!(it.next(), None);
    assert_eq!(it.previous(), None);
}

#[test]
fn test_single_element_roundtrip() {
    let bytes = compress(&[42u32]);
    assert_eq!(decompress::<u32>(&bytes).unwrap(), vec![42]);
}

#[test]
fn test_long_run_roundtrip() {
    let input = vec![3u32; 100_000];
    let bytes = compress(&input);
    // a pure run compresses to a handful of bytes
    assert!(bytes.len() < 32, "run encoded in {} bytes", bytes.len());
    assert_eq!(decompress::<u32>(&bytes).unwrap(), input);
}

#[test]
fn test_wide_narrow_mismatch_rejected() {
    let bytes = compress(&[1u32, 2, 3]);
    let mut cursor = bytes.as_slice();
    let grammar = Arc::new(InputGrammar::<u64>::read_from(&mut cursor).unwrap());
    let err = InputSequence::read_trailer(grammar, &mut cursor).unwrap_err();
    assert!(matches!(
        err,
        crate::SequenceError::SequenceTypeMismatch {
            expected_wide: true,
            found_wide: false,
        }
    ));
}
