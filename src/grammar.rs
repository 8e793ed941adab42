//! Digram table and rule-substitution engine.
//!
//! One `Grammar` is shared by every sequence whose rules may cross-reference
//! each other. Between `append` calls it upholds the two Sequitur
//! constraints, adjusted for run-length encoding:
//!
//! 1. Digram uniqueness: no two non-overlapping digrams in any rule body are
//!    equal (runs excluded from digram identity; adjacent equal symbols are
//!    melted into one node, so exact repeats become run increments).
//! 2. Rule utility: every reusable rule is referenced at least twice,
//!    counting run multiplicity. A rule that drops to a single reference is
//!    inlined back at its only use site and deleted.
//!
//! Start rules are exempt from both reuse and inlining: they are only ever
//! substituted *from*, never *into*.

use crate::symbol::{DigramKey, Symbol, SymbolNode};
use ahash::AHashMap as HashMap;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::Entry;
use std::hash::Hash;

/// Breadth-first rule numbering computed at serialization time.
///
/// `order[n]` is the rule id written as rule number `n`. Cached after the
/// first serialization so repeated writes are byte-identical.
#[derive(Debug)]
pub(crate) struct RuleNumbering {
    pub numbers: HashMap<u32, u64>,
    pub order: Vec<u32>,
}

/// Issues rule ids, reissuing ids released when singleton rules are inlined
/// away so long traces do not exhaust the 32-bit id space.
#[derive(Debug, Default)]
pub(crate) struct RuleIds {
    next: u32,
    recycled: Vec<u32>,
}

impl RuleIds {
    fn allocate(&mut self) -> u32 {
        self.recycled.pop().unwrap_or_else(|| {
            let id = self.next;
            self.next += 1;
            id
        })
    }

    fn release(&mut self, id: u32) {
        debug_assert!(id < self.next, "releasing an id that was never issued");
        self.recycled.push(id);
    }
}

pub(crate) struct Grammar<T> {
    /// Arena holding every symbol node of every rule body.
    pub symbols: SlotMap<DefaultKey, SymbolNode<T>>,

    /// One representative node per currently-unique digram.
    pub digrams: HashMap<DigramKey, DefaultKey>,

    /// Rule id to `RuleHead` key.
    pub rules: HashMap<u32, DefaultKey>,

    pub ids: RuleIds,

    /// Start rules in sequence-creation order; seeds for breadth-first
    /// numbering at serialization time.
    pub start_rules: Vec<u32>,

    pub numbering: Option<RuleNumbering>,
}

impl<T> Grammar<T> {
    pub fn new() -> Self {
        Self {
            symbols: SlotMap::new(),
            digrams: HashMap::default(),
            rules: HashMap::default(),
            ids: RuleIds::default(),
            start_rules: Vec::new(),
            numbering: None,
        }
    }

    /// Creates an empty rule (head and tail sentinels linked together).
    fn new_rule(&mut self, reusable: bool) -> (u32, DefaultKey, DefaultKey) {
        let rule_id = self.ids.allocate();
        let tail_key = self.symbols.insert(SymbolNode::new(Symbol::RuleTail));
        let head_key = self.symbols.insert(SymbolNode::new(Symbol::RuleHead {
            rule_id,
            use_count: 0,
            reusable,
            tail: tail_key,
        }));
        self.symbols[head_key].next = Some(tail_key);
        self.symbols[tail_key].prev = Some(head_key);
        self.rules.insert(rule_id, head_key);
        (rule_id, head_key, tail_key)
    }

    /// Creates the private start rule backing one output sequence.
    pub fn new_start_rule(&mut self) -> (u32, DefaultKey, DefaultKey) {
        let (rule_id, head, tail) = self.new_rule(false);
        self.start_rules.push(rule_id);
        (rule_id, head, tail)
    }

    #[inline]
    pub(crate) fn is_head(symbol: &Symbol<T>) -> bool {
        matches!(symbol, Symbol::RuleHead { .. })
    }

    #[inline]
    pub(crate) fn is_tail(symbol: &Symbol<T>) -> bool {
        matches!(symbol, Symbol::RuleTail)
    }

    #[inline]
    fn bump_use(&mut self, head_key: DefaultKey, n: u64) {
        if let Symbol::RuleHead { use_count, .. } = &mut self.symbols[head_key].symbol {
            *use_count += n;
        }
    }

    #[inline]
    fn drop_use(&mut self, head_key: DefaultKey, n: u64) {
        if let Symbol::RuleHead { use_count, .. } = &mut self.symbols[head_key].symbol {
            debug_assert!(*use_count >= n, "use count underflow");
            *use_count -= n;
        }
    }

    /// Adjusts the referenced rule's use count when a `RuleRef` node enters
    /// a rule body. Run multiplicity counts as that many references.
    #[inline]
    fn add_ref_uses(&mut self, key: DefaultKey) {
        if let Symbol::RuleRef { rule_id } = self.symbols[key].symbol {
            let run = self.symbols[key].run;
            if let Some(&head_key) = self.rules.get(&rule_id) {
                self.bump_use(head_key, run);
            }
        }
    }

    #[inline]
    fn drop_ref_uses(&mut self, key: DefaultKey) {
        if let Symbol::RuleRef { rule_id } = self.symbols[key].symbol {
            let run = self.symbols[key].run;
            if let Some(&head_key) = self.rules.get(&rule_id) {
                self.drop_use(head_key, run);
            }
        }
    }
}

impl<T: Hash + Eq + Clone> Grammar<T> {
    // ------------------------------------------------------------------
    // Run-length operations
    // ------------------------------------------------------------------

    /// Melts a symbol with its next neighbor when both hold the same value
    /// or the same rule: runs add, the second node is unlinked.
    ///
    /// Returns true if a melt occurred.
    pub fn try_melt_with_next(&mut self, key: DefaultKey) -> bool {
        let Some(next_key) = self.symbols[key].next else {
            return false;
        };

        if Self::is_tail(&self.symbols[next_key].symbol) {
            return false;
        }

        if !self.symbols[key]
            .symbol
            .equals(&self.symbols[next_key].symbol)
        {
            return false;
        }

        // The digrams touching either node are about to change identity.
        if let Some(prev) = self.symbols[key].prev {
            self.unindex_digram(prev);
        }
        self.unindex_digram(key);
        self.unindex_digram(next_key);

        let next_run = self.symbols[next_key].run;
        self.symbols[key].run += next_run;

        let after_next = self.symbols[next_key].next;
        self.symbols[key].next = after_next;
        if let Some(after) = after_next {
            self.symbols[after].prev = Some(key);
        }

        // Use counts are untouched: the merged run carries the same total
        // number of references as the two nodes did.
        self.symbols.remove(next_key);

        true
    }

    /// Splits a node's run, leaving `first_run` occurrences in place and
    /// inserting a new node with the remainder right after it.
    ///
    /// Returns the key of the new second node.
    pub fn split_run(&mut self, key: DefaultKey, first_run: u64) -> DefaultKey {
        let total_run = self.symbols[key].run;
        debug_assert!(
            first_run > 0 && first_run < total_run,
            "invalid split: first_run={first_run}, total={total_run}"
        );

        self.unindex_digram(key);

        self.symbols[key].run = first_run;

        let second_run = total_run - first_run;
        let second_key = self.symbols.insert(SymbolNode::with_run(
            self.symbols[key].symbol.clone_symbol(),
            second_run,
        ));

        // Reference totals are conserved across the split, so use counts
        // stay as they are.
        let after_first = self.symbols[key].next;
        self.symbols[key].next = Some(second_key);
        self.symbols[second_key].prev = Some(key);
        self.symbols[second_key].next = after_first;
        if let Some(after) = after_first {
            self.symbols[after].prev = Some(second_key);
        }

        second_key
    }

    // ------------------------------------------------------------------
    // Digram table
    // ------------------------------------------------------------------

    /// Looks up the digram starting at `first`; inserts it as the
    /// representative when unseen.
    ///
    /// Returns the first node of a matching, non-overlapping earlier
    /// occurrence if one exists.
    #[inline]
    pub fn find_or_index_digram(
        &mut self,
        first: DefaultKey,
        second: DefaultKey,
    ) -> Option<DefaultKey> {
        debug_assert!(
            self.symbols[first].next == Some(second),
            "digram nodes must be adjacent"
        );

        // Sentinels bound rule bodies; no digram spans them.
        if Self::is_head(&self.symbols[first].symbol)
            || Self::is_tail(&self.symbols[second].symbol)
        {
            return None;
        }

        let digram_key =
            DigramKey::from_symbols(&self.symbols[first].symbol, &self.symbols[second].symbol);

        match self.digrams.entry(digram_key) {
            Entry::Vacant(e) => {
                e.insert(first);
                None
            }
            Entry::Occupied(mut e) => {
                let other_first = *e.get();

                if other_first == first {
                    return None;
                }

                // Stale representative from a past splice: take over.
                if !self.symbols.contains_key(other_first) {
                    e.insert(first);
                    return None;
                }

                let other_second = self.symbols[other_first]
                    .next
                    .expect("indexed digram lost its second node");

                // Overlapping occurrences never fold.
                if other_second == first || other_first == second {
                    return None;
                }

                // Hash-collision guard: confirm real symbol equality.
                let symbols_equal = self.symbols[first]
                    .symbol
                    .equals(&self.symbols[other_first].symbol)
                    && self.symbols[second]
                        .symbol
                        .equals(&self.symbols[other_second].symbol);

                if symbols_equal {
                    Some(other_first)
                } else {
                    None
                }
            }
        }
    }

    /// Drops the digram starting at `first` from the table, but only if it
    /// is the current representative.
    #[inline]
    pub fn unindex_digram(&mut self, first: DefaultKey) {
        if Self::is_head(&self.symbols[first].symbol) {
            return;
        }

        let Some(second) = self.symbols[first].next else {
            return;
        };

        if Self::is_tail(&self.symbols[second].symbol) {
            return;
        }

        let digram_key =
            DigramKey::from_symbols(&self.symbols[first].symbol, &self.symbols[second].symbol);

        if let Entry::Occupied(e) = self.digrams.entry(digram_key) {
            if *e.get() == first {
                e.remove();
            }
        }
    }

    // ------------------------------------------------------------------
    // Substitution
    // ------------------------------------------------------------------

    /// Checks whether the digram at `first` is exactly the whole body of a
    /// reusable rule (both runs 1, bounded by that rule's own sentinels).
    ///
    /// Start rules never match: they must not be referenced.
    #[inline]
    pub fn whole_rule_match(&self, first: DefaultKey) -> Option<DefaultKey> {
        let second = self.symbols[first].next?;

        if self.symbols[first].run != 1 || self.symbols[second].run != 1 {
            return None;
        }

        let prev = self.symbols[first].prev?;
        let Symbol::RuleHead { reusable, tail, .. } = self.symbols[prev].symbol else {
            return None;
        };
        if !reusable {
            return None;
        }

        let after_second = self.symbols[second].next?;
        if after_second == tail {
            return Some(prev);
        }

        None
    }

    /// Folds two matching digram occurrences into a brand-new reusable rule,
    /// splitting runs down to the common pattern first when they differ.
    ///
    /// Returns the two `RuleRef` nodes that replaced the occurrences.
    pub fn substitute_with_new_rule(
        &mut self,
        match1: DefaultKey,
        match2: DefaultKey,
    ) -> (DefaultKey, DefaultKey) {
        let match1_second = self.symbols[match1].next.expect("digram lost second node");
        let match2_second = self.symbols[match2].next.expect("digram lost second node");

        // The shared pattern is the minimum run at each position.
        let first_run = self.symbols[match1].run.min(self.symbols[match2].run);
        let second_run = self.symbols[match1_second]
            .run
            .min(self.symbols[match2_second].run);

        let (m1_first, m1_second) = self.carve_digram(match1, first_run, second_run);
        let (m2_first, _m2_second) = self.carve_digram(match2, first_run, second_run);

        let (_, head_key, tail_key) = self.new_rule(true);

        // Clone the common digram into the fresh rule body.
        let rule_first = self.symbols.insert(SymbolNode::with_run(
            self.symbols[m1_first].symbol.clone_symbol(),
            first_run,
        ));
        let rule_second = self.symbols.insert(SymbolNode::with_run(
            self.symbols[m1_second].symbol.clone_symbol(),
            second_run,
        ));

        self.symbols[head_key].next = Some(rule_first);
        self.symbols[rule_first].prev = Some(head_key);
        self.symbols[rule_first].next = Some(rule_second);
        self.symbols[rule_second].prev = Some(rule_first);
        self.symbols[rule_second].next = Some(tail_key);
        self.symbols[tail_key].prev = Some(rule_second);

        self.unindex_digram(m1_first);
        self.unindex_digram(m2_first);

        // The rule body becomes the representative for this digram.
        let digram_key = DigramKey::from_symbols(
            &self.symbols[rule_first].symbol,
            &self.symbols[rule_second].symbol,
        );
        self.digrams.insert(digram_key, rule_first);

        self.add_ref_uses(rule_first);
        self.add_ref_uses(rule_second);

        let loc1 = self.substitute_with_rule(m1_first, head_key);
        let loc2 = self.substitute_with_rule(m2_first, head_key);

        (loc1, loc2)
    }

    /// Trims a digram occurrence down to the target run pattern, splitting
    /// nodes where they carry more repetitions than the common match.
    ///
    /// The first position keeps its *trailing* repetitions, the second its
    /// *leading* ones, so the two carved halves stay adjacent.
    fn carve_digram(
        &mut self,
        first: DefaultKey,
        target_first_run: u64,
        target_second_run: u64,
    ) -> (DefaultKey, DefaultKey) {
        let mut first_key = first;
        let mut second_key = self.symbols[first].next.expect("digram lost second node");

        if self.symbols[first_key].run > target_first_run {
            let remaining = self.symbols[first_key].run - target_first_run;
            let new_key = self.split_run(first_key, remaining);
            first_key = new_key;
            second_key = self.symbols[first_key].next.expect("split broke linkage");
        }

        if self.symbols[second_key].run > target_second_run {
            self.split_run(second_key, target_second_run);
        }

        (first_key, second_key)
    }

    /// Replaces the digram at `first` with a single `RuleRef` to an existing
    /// rule, then runs the singleton-inlining check inside that rule's body.
    pub fn substitute_with_rule(
        &mut self,
        first: DefaultKey,
        rule_head: DefaultKey,
    ) -> DefaultKey {
        let second = self.symbols[first].next.expect("digram lost second node");

        let before_digram = self.symbols[first].prev;
        let after_digram = self.symbols[second].next;

        if let Some(prev) = before_digram {
            self.unindex_digram(prev);
        }
        self.unindex_digram(second);

        self.drop_ref_uses(first);
        self.drop_ref_uses(second);

        let Symbol::RuleHead { rule_id, .. } = self.symbols[rule_head].symbol else {
            unreachable!("substitution target must be a rule head");
        };

        let new_ref_key = self
            .symbols
            .insert(SymbolNode::new(Symbol::RuleRef { rule_id }));

        self.symbols[new_ref_key].prev = before_digram;
        self.symbols[new_ref_key].next = after_digram;

        if let Some(prev) = before_digram {
            self.symbols[prev].next = Some(new_ref_key);
        }
        if let Some(next) = after_digram {
            self.symbols[next].prev = Some(new_ref_key);
        }

        self.bump_use(rule_head, 1);

        self.symbols.remove(first);
        self.symbols.remove(second);

        // Dropping the digram's references may have left nested rules at a
        // single use; walk the target rule's body and inline them. The body
        // must be re-fetched between checks because expansion splices.
        let rule_first = self.symbols[rule_head]
            .next
            .expect("rule head lost its body");
        self.expand_if_singleton(rule_first);

        if let Some(current_first) = self.symbols[rule_head].next {
            if let Some(rule_second) = self.symbols[current_first].next {
                if !Self::is_tail(&self.symbols[rule_second].symbol) {
                    self.expand_if_singleton(rule_second);
                }
            }
        }

        new_ref_key
    }

    /// Inlines a rule at `potential_ref` when that reference is the rule's
    /// only remaining use: the body is spliced in place of the reference,
    /// the rule deleted and its id recycled.
    pub fn expand_if_singleton(&mut self, potential_ref: DefaultKey) {
        let Symbol::RuleRef { rule_id } = self.symbols[potential_ref].symbol else {
            return;
        };

        // A run of references is by definition more than one use.
        if self.symbols[potential_ref].run != 1 {
            return;
        }

        let Some(&rule_head) = self.rules.get(&rule_id) else {
            return;
        };

        let Symbol::RuleHead {
            use_count,
            reusable,
            tail: rule_tail,
            ..
        } = self.symbols[rule_head].symbol
        else {
            unreachable!("rule index points at a non-head node");
        };

        debug_assert!(use_count > 0, "referenced rule has zero use count");

        if !reusable || use_count != 1 {
            return;
        }

        let rule_first = self.symbols[rule_head]
            .next
            .expect("rule head lost its body");
        let rule_last = self.symbols[rule_tail]
            .prev
            .expect("rule tail lost its body");

        let before_ref = self.symbols[potential_ref].prev;
        let after_ref = self.symbols[potential_ref].next;

        if let Some(prev) = before_ref {
            self.unindex_digram(prev);
        }
        self.unindex_digram(potential_ref);

        self.rules.remove(&rule_id);
        self.ids.release(rule_id);

        self.symbols.remove(rule_head);
        self.symbols.remove(rule_tail);

        self.symbols[rule_first].prev = before_ref;
        self.symbols[rule_last].next = after_ref;

        if let Some(prev) = before_ref {
            self.symbols[prev].next = Some(rule_first);
        }
        if let Some(next) = after_ref {
            self.symbols[next].prev = Some(rule_last);
        }

        self.symbols.remove(potential_ref);

        // Fresh digrams at both splice boundaries; check_digram melts and
        // folds as needed. The boundary nodes may already have been consumed
        // by the first check, hence the liveness guards.
        if let Some(prev) = before_ref {
            if !Self::is_head(&self.symbols[prev].symbol) {
                self.check_digram(prev);
            }
        }

        if let Some(after) = after_ref {
            if self.symbols.contains_key(after)
                && !Self::is_tail(&self.symbols[after].symbol)
                && self.symbols.contains_key(rule_last)
            {
                self.check_digram(rule_last);
            }
        }
    }

    // ------------------------------------------------------------------
    // Core fixpoint
    // ------------------------------------------------------------------

    /// Restores the grammar invariants around a possibly-new digram starting
    /// at `first_key`. Called after every insertion and every splice; keeps
    /// re-invoking itself on the boundaries it disturbs until nothing
    /// changes.
    #[inline]
    pub fn check_digram(&mut self, first_key: DefaultKey) {
        // Melt comes first: a self-repeat is absorbed into the run count
        // and the digrams around the merged node are re-examined.
        if self.try_melt_with_next(first_key) {
            if let Some(prev) = self.symbols[first_key].prev {
                if !Self::is_head(&self.symbols[prev].symbol) {
                    if let Some(_match_key) = self.find_or_index_digram(prev, first_key) {
                        self.fold_duplicate(prev);
                    }
                }
            }
            // folding (prev, first_key) consumes first_key
            if !self.symbols.contains_key(first_key) {
                return;
            }
            if let Some(next) = self.symbols[first_key].next {
                if !Self::is_tail(&self.symbols[next].symbol) {
                    if let Some(_match_key) = self.find_or_index_digram(first_key, next) {
                        self.fold_duplicate(first_key);
                    }
                }
            }
            return;
        }

        let Some(second_key) = self.symbols[first_key].next else {
            return;
        };

        if let Some(match_key) = self.find_or_index_digram(first_key, second_key) {
            self.fold_duplicate_with_match(first_key, match_key);
        }
    }

    fn fold_duplicate(&mut self, first_key: DefaultKey) {
        let second_key = self.symbols[first_key].next.expect("digram lost second node");
        let digram_key = DigramKey::from_symbols(
            &self.symbols[first_key].symbol,
            &self.symbols[second_key].symbol,
        );

        if let Some(&match_key) = self.digrams.get(&digram_key) {
            if match_key != first_key && self.symbols.contains_key(match_key) {
                self.fold_duplicate_with_match(first_key, match_key);
            }
        }
    }

    fn fold_duplicate_with_match(&mut self, first_key: DefaultKey, match_key: DefaultKey) {
        // Reuse path: the earlier occurrence is already a whole reusable
        // rule body, and the new occurrence repeats nothing.
        if let Some(rule_head_key) = self.whole_rule_match(match_key) {
            let second_key = self.symbols[first_key].next.expect("digram lost second node");
            if self.symbols[first_key].run == 1 && self.symbols[second_key].run == 1 {
                let new_key = self.substitute_with_rule(first_key, rule_head_key);
                self.recheck_around(new_key);
                return;
            }
        }

        let (loc1, loc2) = self.substitute_with_new_rule(first_key, match_key);
        self.recheck_around_pair(loc1, loc2);
    }

    /// Re-examines the neighborhood of one freshly inserted `RuleRef`.
    pub fn recheck_around(&mut self, ref_key: DefaultKey) {
        if !self.symbols.contains_key(ref_key) {
            return;
        }

        if let Some(prev) = self.symbols[ref_key].prev {
            if !Self::is_head(&self.symbols[prev].symbol) && self.try_melt_with_next(prev) {
                self.recheck_around(prev);
                return;
            }
        }

        if !self.symbols.contains_key(ref_key) {
            return;
        }

        if let Some(next) = self.symbols[ref_key].next {
            if !Self::is_tail(&self.symbols[next].symbol) && self.try_melt_with_next(ref_key) {
                self.recheck_around(ref_key);
                return;
            }
        }

        if let Some(prev) = self.symbols[ref_key].prev {
            if !Self::is_head(&self.symbols[prev].symbol) {
                self.check_digram(prev);
            }
        }

        if !self.symbols.contains_key(ref_key) {
            return;
        }

        if let Some(next) = self.symbols[ref_key].next {
            if !Self::is_tail(&self.symbols[next].symbol)
                && !Self::is_head(&self.symbols[ref_key].symbol)
            {
                self.check_digram(ref_key);
            }
        }
    }

    /// Re-examines the neighborhoods of the two `RuleRef`s inserted by a
    /// new-rule substitution.
    ///
    /// Either node may be consumed by a melt or a cascaded fold along the
    /// way. Melts are resolved first, then the *surviving* node's boundary
    /// digrams go through the full `check_digram` lookup: when the two
    /// references melt into one, the digram against the merged node's left
    /// neighbor is new and must be indexed or folded.
    pub fn recheck_around_pair(&mut self, ref1: DefaultKey, ref2: DefaultKey) {
        let first = if self.symbols.contains_key(ref1) {
            Some(self.settle_melts(ref1))
        } else {
            None
        };
        let second = if self.symbols.contains_key(ref2) {
            Some(self.settle_melts(ref2))
        } else {
            None
        };

        for key in first.into_iter().chain(second) {
            if !self.symbols.contains_key(key) {
                continue;
            }
            if let Some(prev) = self.symbols[key].prev {
                if !Self::is_head(&self.symbols[prev].symbol) {
                    self.check_digram(prev);
                }
            }
            if !self.symbols.contains_key(key) {
                continue;
            }
            if let Some(next) = self.symbols[key].next {
                if !Self::is_tail(&self.symbols[next].symbol) {
                    self.check_digram(key);
                }
            }
        }
    }

    /// Melts `key` into equal neighbors on both sides and returns the node
    /// left holding the merged run (`key` itself when nothing melted).
    fn settle_melts(&mut self, key: DefaultKey) -> DefaultKey {
        let mut node = key;
        if let Some(prev) = self.symbols[node].prev {
            if !Self::is_head(&self.symbols[prev].symbol) && self.try_melt_with_next(prev) {
                node = prev;
            }
        }
        self.try_melt_with_next(node);
        node
    }
}

impl<T> Default for Grammar<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl<T: Hash + Eq + Clone> Grammar<T> {
    /// Scans every live rule body and asserts no digram occurs twice.
    pub(crate) fn assert_digram_uniqueness(&self) {
        use crate::symbol::DigramKey;
        let mut seen: HashMap<DigramKey, DefaultKey> = HashMap::default();
        for &head in self.rules.values() {
            let mut current = self.symbols[head].next;
            while let Some(key) = current {
                let node = &self.symbols[key];
                if Self::is_tail(&node.symbol) {
                    break;
                }
                if let Some(next) = node.next {
                    if !Self::is_tail(&self.symbols[next].symbol) {
                        let dk = DigramKey::from_symbols(
                            &node.symbol,
                            &self.symbols[next].symbol,
                        );
                        if let Some(&other) = seen.get(&dk) {
                            panic!(
                                "duplicate digram found at {key:?} and {other:?}"
                            );
                        }
                        seen.insert(dk, key);
                    }
                }
                current = node.next;
            }
        }
    }

    /// Asserts every reusable rule is referenced at least twice and start
    /// rules are never referenced at all.
    pub(crate) fn assert_rule_utility(&self) {
        for (&rule_id, &head) in &self.rules {
            let Symbol::RuleHead {
                use_count,
                reusable,
                ..
            } = self.symbols[head].symbol
            else {
                panic!("rule index entry {rule_id} is not a head");
            };
            if reusable {
                assert!(
                    use_count >= 2,
                    "reusable rule {rule_id} has use count {use_count}"
                );
            } else {
                assert_eq!(use_count, 0, "start rule {rule_id} is referenced");
            }
        }
    }
}
