//! Sort system.
//!
//! Every term carries exactly one [`SortId`]. The [`SortStore`] owns all
//! sorts, pre-interns the built-in Bool/Int/Real sorts, and deduplicates
//! uninterpreted sorts by name.

use lasso::Spur;
use rustc_hash::FxHashMap;

/// Index of a sort in the [`SortStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SortId(u32);

impl SortId {
    /// Create a sort id from a raw index.
    #[must_use]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw index of this sort.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The shape of a sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortKind {
    /// Booleans.
    Bool,
    /// Unbounded integers.
    Int,
    /// Rationals (the Real sort).
    Real,
    /// An uninterpreted sort, identified by its interned name.
    Uninterpreted(Spur),
    /// A function sort with a domain and a range.
    Function {
        /// Argument sorts, in order.
        domain: Vec<SortId>,
        /// Result sort.
        range: SortId,
    },
}

/// A sort: its kind plus nothing else for now.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sort {
    /// The kind of this sort.
    pub kind: SortKind,
}

/// Owns all sorts created so far.
///
/// The three built-in sorts are pre-interned and always available as
/// `bool_sort`, `int_sort`, and `real_sort`.
#[derive(Debug)]
pub struct SortStore {
    sorts: Vec<Sort>,
    uninterpreted: FxHashMap<Spur, SortId>,
    /// The Bool sort.
    pub bool_sort: SortId,
    /// The Int sort.
    pub int_sort: SortId,
    /// The Real sort.
    pub real_sort: SortId,
}

impl SortStore {
    /// Create a store with the built-in sorts interned.
    #[must_use]
    pub fn new() -> Self {
        let sorts = vec![
            Sort {
                kind: SortKind::Bool,
            },
            Sort { kind: SortKind::Int },
            Sort {
                kind: SortKind::Real,
            },
        ];
        Self {
            sorts,
            uninterpreted: FxHashMap::default(),
            bool_sort: SortId(0),
            int_sort: SortId(1),
            real_sort: SortId(2),
        }
    }

    /// Look up a sort by id.
    #[must_use]
    pub fn get(&self, id: SortId) -> Option<&Sort> {
        self.sorts.get(id.index())
    }

    /// Intern an uninterpreted sort, deduplicating by name.
    pub fn mk_uninterpreted(&mut self, name: Spur) -> SortId {
        if let Some(&id) = self.uninterpreted.get(&name) {
            return id;
        }
        let id = self.push(Sort {
            kind: SortKind::Uninterpreted(name),
        });
        self.uninterpreted.insert(name, id);
        id
    }

    /// Intern a function sort.
    pub fn mk_function(&mut self, domain: Vec<SortId>, range: SortId) -> SortId {
        // Function sorts are rare enough that a linear scan suffices.
        let kind = SortKind::Function { domain, range };
        for (i, s) in self.sorts.iter().enumerate() {
            if s.kind == kind {
                return SortId(i as u32);
            }
        }
        self.push(Sort { kind })
    }

    /// Number of sorts in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sorts.len()
    }

    /// Whether the store holds no sorts. Always false: built-ins are
    /// pre-interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sorts.is_empty()
    }

    fn push(&mut self, sort: Sort) -> SortId {
        let id = SortId(self.sorts.len() as u32);
        self.sorts.push(sort);
        id
    }
}

impl Default for SortStore {
    fn default() -> Self {
        Self::new()
    }
}
