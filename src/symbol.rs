//! Symbol and digram model for the grammar's linked rule bodies.
//!
//! Rule bodies are doubly-linked lists of run-length-encoded symbols bounded
//! by `RuleHead`/`RuleTail` sentinels, all living in one slotmap arena and
//! addressed by keys instead of pointers.

use slotmap::DefaultKey;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Symbol variants in the grammar.
#[derive(Debug, Clone)]
pub(crate) enum Symbol<T> {
    /// A terminal holding a stored trace value.
    Value(T),

    /// A non-terminal: a call to another rule.
    RuleRef { rule_id: u32 },

    /// Sentinel opening a rule's body; carries the rule's bookkeeping.
    ///
    /// `use_count` is the number of references to this rule across the whole
    /// grammar, counting run multiplicity. Start rules are created with
    /// `reusable: false`: they are never matched as a substitution target,
    /// never referenced by a `RuleRef`, and never inlined away.
    RuleHead {
        rule_id: u32,
        use_count: u64,
        reusable: bool,
        tail: DefaultKey,
    },

    /// Sentinel closing a rule's body.
    RuleTail,
}

/// A node in the doubly-linked symbol list.
///
/// Each node stands for `run` consecutive occurrences of its symbol; the
/// melt step guarantees no two adjacent nodes hold equal symbols, so runs
/// are always maximal.
#[derive(Debug)]
pub(crate) struct SymbolNode<T> {
    pub symbol: Symbol<T>,
    /// Number of consecutive occurrences (always >= 1).
    pub run: u64,
    pub prev: Option<DefaultKey>,
    pub next: Option<DefaultKey>,
}

impl<T> SymbolNode<T> {
    pub(crate) fn new(symbol: Symbol<T>) -> Self {
        Self::with_run(symbol, 1)
    }

    pub(crate) fn with_run(symbol: Symbol<T>, run: u64) -> Self {
        Self {
            symbol,
            run,
            prev: None,
            next: None,
        }
    }
}

/// Compact hash of a single symbol, used to build digram keys.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub(crate) struct SymbolHash(u64);

impl SymbolHash {
    pub(crate) fn from_symbol<T: Hash>(symbol: &Symbol<T>) -> Self {
        let mut hasher = DefaultHasher::new();
        match symbol {
            Symbol::Value(v) => {
                0u8.hash(&mut hasher);
                v.hash(&mut hasher);
            }
            Symbol::RuleRef { rule_id } => {
                1u8.hash(&mut hasher);
                rule_id.hash(&mut hasher);
            }
            Symbol::RuleHead { rule_id, .. } => {
                2u8.hash(&mut hasher);
                rule_id.hash(&mut hasher);
            }
            Symbol::RuleTail => {
                3u8.hash(&mut hasher);
            }
        }
        SymbolHash(hasher.finish())
    }
}

/// Identity of a digram: the ordered pair of a symbol and its current
/// neighbor, run counts excluded.
///
/// Keys must always be recomputed against the *current* `next` link; a
/// digram has no identity of its own apart from its two live symbols.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub(crate) struct DigramKey(pub SymbolHash, pub SymbolHash);

impl DigramKey {
    pub(crate) fn from_symbols<T: Hash>(first: &Symbol<T>, second: &Symbol<T>) -> Self {
        DigramKey(
            SymbolHash::from_symbol(first),
            SymbolHash::from_symbol(second),
        )
    }
}

impl<T: Clone> Symbol<T> {
    /// Clones the symbol's payload for use in a new rule body.
    pub(crate) fn clone_symbol(&self) -> Symbol<T> {
        self.clone()
    }
}

impl<T: PartialEq> Symbol<T> {
    /// Full equality check, used to confirm digram hash matches.
    pub(crate) fn equals(&self, other: &Symbol<T>) -> bool {
        match (self, other) {
            (Symbol::Value(a), Symbol::Value(b)) => a == b,
            (Symbol::RuleRef { rule_id: a }, Symbol::RuleRef { rule_id: b }) => a == b,
            (Symbol::RuleHead { rule_id: a, .. }, Symbol::RuleHead { rule_id: b, .. }) => a == b,
            (Symbol::RuleTail, Symbol::RuleTail) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_hash_consistency() {
        let a1 = Symbol::Value(7u32);
        let a2 = Symbol::Value(7u32);
        let b = Symbol::Value(8u32);

        assert_eq!(SymbolHash::from_symbol(&a1), SymbolHash::from_symbol(&a2));
        assert_ne!(SymbolHash::from_symbol(&a1), SymbolHash::from_symbol(&b));
    }

    #[test]
    fn test_rule_ref_hash() {
        let r1 = Symbol::<u32>::RuleRef { rule_id: 1 };
        let r2 = Symbol::<u32>::RuleRef { rule_id: 1 };
        let r3 = Symbol::<u32>::RuleRef { rule_id: 2 };

        assert_eq!(SymbolHash::from_symbol(&r1), SymbolHash::from_symbol(&r2));
        assert_ne!(SymbolHash::from_symbol(&r1), SymbolHash::from_symbol(&r3));
    }

    #[test]
    fn test_digram_key_ignores_runs() {
        let a = Symbol::Value(1u32);
        let b = Symbol::Value(2u32);
        let c = Symbol::Value(3u32);

        // runs are not part of the key, only the symbol pair is
        assert_eq!(
            DigramKey::from_symbols(&a, &b),
            DigramKey::from_symbols(&a, &b)
        );
        assert_ne!(
            DigramKey::from_symbols(&a, &b),
            DigramKey::from_symbols(&a, &c)
        );
        assert_ne!(
            DigramKey::from_symbols(&a, &b),
            DigramKey::from_symbols(&b, &a)
        );
    }

    #[test]
    fn test_symbol_equality() {
        assert!(Symbol::Value(42u32).equals(&Symbol::Value(42u32)));
        assert!(!Symbol::Value(42u32).equals(&Symbol::Value(99u32)));
        assert!(!Symbol::Value(42u32).equals(&Symbol::RuleRef { rule_id: 42 }));
    }

    #[test]
    fn test_node_defaults() {
        let node = SymbolNode::new(Symbol::Value(5u64));
        assert_eq!(node.run, 1);
        assert_eq!(node.prev, None);
        assert_eq!(node.next, None);
    }
}
