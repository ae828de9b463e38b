//! The coalesced-chaining table and its node array.
//!
//! Keys and values are [`Scalar`]s. Collision chains are threaded through the
//! same array that stores the entries, linked by [`NodeHandle`] indices.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::config::TableConfig;
use crate::error::Result;
use crate::error::TableError;
use crate::strategy::DefaultStrategy;
use crate::strategy::EqualFn;
use crate::strategy::FnStrategy;
use crate::strategy::HashFn;
use crate::strategy::HashStrategy;
use crate::strategy::KeyType;
use crate::strategy::Scalar;

/// Backing storage handed out for tables in the empty state. Every
/// never-allocated table reports this same zero-length array.
static EMPTY_NODES: [Node; 0] = [];

/// Index of a node in a table's node array.
///
/// Handles are plain indices: they stay meaningful only until the next
/// operation that may move nodes (`set` of a new key, `delete`, or any
/// resize).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(u32);

impl NodeHandle {
    #[inline(always)]
    fn new(index: usize) -> Self {
        debug_assert!(index < 1 << crate::config::MAX_SIZE_LOG);
        NodeHandle(index as u32)
    }

    /// The array index this handle refers to.
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One slot of the node array.
///
/// Collision chains link nodes by index inside the same array, so nodes are
/// never allocated individually.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Node {
    key: Scalar,
    value: Scalar,
    next: Option<NodeHandle>,
    active: bool,
}

impl Node {
    const VACANT: Node = Node {
        key: 0,
        value: 0,
        next: None,
        active: false,
    };

    #[inline(always)]
    fn occupied(key: Scalar) -> Self {
        Node {
            key,
            value: 0,
            next: None,
            active: true,
        }
    }

    /// The stored key. Zero for inactive nodes.
    pub fn key(&self) -> Scalar {
        self.key
    }

    /// The stored value. Zero for inactive nodes.
    pub fn value(&self) -> Scalar {
        self.value
    }

    /// The next node in this node's collision chain.
    pub fn next(&self) -> Option<NodeHandle> {
        self.next
    }

    /// Returns `true` if the node holds a live entry.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// An allocated, power-of-two sized node array plus its free-slot cursor.
///
/// Every index at or above `free_cursor` holds an active node. Indices below
/// it may be either and must be checked.
#[derive(Clone)]
struct NodeArray {
    nodes: Vec<Node>,
    free_cursor: usize,
}

impl NodeArray {
    fn allocate(size_log: u32) -> Result<Self> {
        let slots = 1usize << size_log;
        let mut nodes = Vec::new();
        nodes.try_reserve_exact(slots).map_err(|_| {
            log_warn!("failed to allocate {} table slots", slots);
            TableError::OutOfMemory { slots }
        })?;
        nodes.resize(slots, Node::VACANT);

        Ok(NodeArray {
            nodes,
            free_cursor: slots,
        })
    }

    #[inline(always)]
    fn slot(&self, hash: u64) -> usize {
        debug_assert!(self.nodes.len().is_power_of_two());
        hash as usize & (self.nodes.len() - 1)
    }

    /// Walks the chain rooted at the home slot for `hash`, returning the index
    /// of the first node whose key satisfies `eq` along with its predecessor.
    #[inline]
    fn find(&self, hash: u64, eq: impl Fn(Scalar) -> bool) -> Option<(usize, Option<usize>)> {
        let mut index = self.slot(hash);
        if !self.nodes[index].active {
            return None;
        }

        let mut prev = None;
        loop {
            let node = &self.nodes[index];
            if eq(node.key) {
                return Some((index, prev));
            }
            prev = Some(index);
            index = node.next?.index();
        }
    }

    /// Moves the cursor down to the next inactive slot and returns it.
    fn take_free_slot(&mut self) -> Option<usize> {
        while self.free_cursor > 0 {
            self.free_cursor -= 1;
            if !self.nodes[self.free_cursor].active {
                return Some(self.free_cursor);
            }
        }
        None
    }

    /// Index of the node whose `next` link points at `target`, starting the
    /// walk at `start`.
    fn predecessor(&self, start: usize, target: usize) -> usize {
        let mut index = start;
        loop {
            match self.nodes[index].next {
                Some(next) if next.index() == target => return index,
                Some(next) => index = next.index(),
                None => unreachable!("slot {target} is not reachable from its home slot {start}"),
            }
        }
    }

    /// Claims a node for `key`, which must not already be present.
    ///
    /// The key lands in its home slot whenever that slot is free or is only
    /// borrowed by a displaced node, which then moves to a free slot.
    /// Otherwise the key is chained behind the home slot's rightful owner.
    ///
    /// Returns `None` when the array has no free slot left.
    fn claim(&mut self, key: Scalar, hash: u64, rehash: impl Fn(Scalar) -> u64) -> Option<usize> {
        let home = self.slot(hash);
        if !self.nodes[home].active {
            self.nodes[home] = Node::occupied(key);
            return Some(home);
        }

        let free = self.take_free_slot()?;
        let occupant = self.nodes[home];
        let occupant_home = self.slot(rehash(occupant.key));

        if occupant_home == home {
            self.nodes[free] = Node {
                next: occupant.next,
                ..Node::occupied(key)
            };
            self.nodes[home].next = Some(NodeHandle::new(free));
            Some(free)
        } else {
            let prev = self.predecessor(occupant_home, home);
            self.nodes[prev].next = Some(NodeHandle::new(free));
            self.nodes[free] = occupant;
            self.nodes[home] = Node::occupied(key);
            Some(home)
        }
    }

    /// Removes the node at `index` and repairs its chain.
    ///
    /// A home node with a successor is replaced by that successor, so the
    /// chain keeps its head in the home slot; the successor's old slot is the
    /// one that becomes free.
    fn release(&mut self, index: usize, prev: Option<usize>, rehash: impl Fn(Scalar) -> u64) {
        let next = self.nodes[index].next;
        let mut freed = index;

        match (prev, next) {
            (Some(prev), _) => self.nodes[prev].next = next,
            (None, Some(next)) => {
                let next = next.index();
                if self.slot(rehash(self.nodes[next].key)) == index {
                    self.nodes[index] = self.nodes[next];
                    freed = next;
                }
            }
            (None, None) => {}
        }

        self.nodes[freed] = Node::VACANT;
        if freed >= self.free_cursor {
            self.free_cursor = freed + 1;
        }
    }
}

/// Either the allocation-free empty state or an allocated node array.
#[derive(Clone)]
enum Storage {
    Empty,
    Nodes(NodeArray),
}

impl Storage {
    #[inline(always)]
    fn nodes(&self) -> &[Node] {
        match self {
            Storage::Empty => &EMPTY_NODES,
            Storage::Nodes(array) => &array.nodes,
        }
    }
}

/// Smallest capacity exponent whose table holds `needed` entries, if it does
/// not exceed `max_size_log`.
fn size_log_for(needed: usize, max_size_log: u32) -> Option<u32> {
    let size_log = needed.checked_next_power_of_two()?.trailing_zeros();
    (size_log <= max_size_log).then_some(size_log)
}

/// Debug statistics for table analysis.
///
/// Requires the `stats` feature.
#[cfg(feature = "stats")]
#[derive(Debug, Clone, PartialEq)]
pub struct DebugStats {
    /// Number of live entries.
    pub populated: usize,
    /// Number of slots in the node array.
    pub capacity: usize,
    /// Live entries stored in their home slot. Each one heads a chain.
    pub home_nodes: usize,
    /// Live entries stored outside their home slot.
    pub displaced_nodes: usize,
    /// Length of the longest collision chain.
    pub longest_chain: usize,
    /// Current position of the free-slot cursor.
    pub free_cursor: usize,
    /// Slot utilization (populated / capacity).
    pub load_factor: f64,
    /// Bytes held by the node array.
    pub total_bytes: usize,
}

#[cfg(feature = "stats")]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Placement: {} home, {} displaced",
            self.home_nodes, self.displaced_nodes
        );
        println!("Longest chain: {}", self.longest_chain);
        println!("Free cursor: {}", self.free_cursor);
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// A scalar-to-scalar hash table using coalesced chaining.
///
/// All entries live in one power-of-two array of [`Node`]s. Colliding keys
/// are linked into chains through indices into the same array, and a key is
/// kept in its home slot (`hash(key) mod capacity`) whenever possible: a
/// displaced node borrowing that slot is moved out of the way instead.
///
/// The table grows only when it is completely full, doubling to the next
/// power of two that holds every entry plus the one being inserted, so the
/// array is fully used between growths. A table that has never stored
/// anything owns no allocation.
///
/// ## Example
///
/// ```rust
/// # use coalesced_table::{KeyType, Table};
/// #
/// let mut table = Table::new(KeyType::Int64);
/// assert!(!table.is_allocated());
///
/// table.set(7, 700)?;
/// table.set(9, 900)?;
/// assert_eq!(table.get(7), Some(700));
/// assert_eq!(table.capacity(), 2);
///
/// assert_eq!(table.delete(7), Some(700));
/// assert!(!table.contains(7));
/// # Ok::<(), coalesced_table::TableError>(())
/// ```
#[derive(Clone)]
pub struct Table<S = DefaultStrategy> {
    storage: Storage,
    populated: usize,
    config: TableConfig,
    strategy: S,
}

impl<S> Debug for Table<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let nodes = self
            .storage
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, node)| node.active)
            .map(|(index, node)| match node.next {
                Some(next) => format!(
                    "{index:02}: {:#x} => {:#x} -> {:02}",
                    node.key,
                    node.value,
                    next.index()
                ),
                None => format!("{index:02}: {:#x} => {:#x}", node.key, node.value),
            })
            .collect::<Vec<String>>();

        f.debug_struct("Table")
            .field("key_type", &self.config.key_type())
            .field("populated", &self.populated)
            .field("capacity", &self.capacity())
            .field("nodes", &nodes)
            .finish()
    }
}

impl Table<DefaultStrategy> {
    /// Creates an empty table for keys of `key_type` using the default
    /// strategy. No memory is allocated until the first insertion.
    pub fn new(key_type: KeyType) -> Self {
        Self::with_strategy(key_type, DefaultStrategy::default())
    }
}

impl Default for Table<DefaultStrategy> {
    fn default() -> Self {
        Self::new(KeyType::default())
    }
}

impl Table<FnStrategy> {
    /// Creates an empty table from optional hash and equality functions.
    /// Omitted functions fall back to the defaults.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use coalesced_table::{KeyType, Table};
    /// #
    /// // Every key collides; lookups still resolve through the chain.
    /// let mut table = Table::with_functions(KeyType::Int32, Some(|_, _| 0), None);
    /// table.set(1, 10)?;
    /// table.set(2, 20)?;
    /// assert_eq!(table.get(2), Some(20));
    /// # Ok::<(), coalesced_table::TableError>(())
    /// ```
    pub fn with_functions(key_type: KeyType, hash: Option<HashFn>, equal: Option<EqualFn>) -> Self {
        Self::with_strategy(key_type, FnStrategy::new(hash, equal))
    }
}

impl<S> Table<S> {
    /// The key type tag passed to the strategy.
    pub fn key_type(&self) -> KeyType {
        self.config.key_type()
    }

    /// The configuration this table was built with.
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// The hash strategy in use.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of slots in the node array, zero in the empty
    /// state. A table of capacity `n` holds `n` entries before it grows.
    pub fn capacity(&self) -> usize {
        self.storage.nodes().len()
    }

    /// Returns the capacity exponent, or `None` in the empty state.
    pub fn size_log(&self) -> Option<u32> {
        match &self.storage {
            Storage::Empty => None,
            Storage::Nodes(array) => Some(array.nodes.len().trailing_zeros()),
        }
    }

    /// Returns `true` if the table owns a node array.
    pub fn is_allocated(&self) -> bool {
        matches!(self.storage, Storage::Nodes(_))
    }

    /// The raw node array, including inactive slots.
    ///
    /// Every table in the empty state returns the same shared, zero-length
    /// array.
    pub fn nodes(&self) -> &[Node] {
        self.storage.nodes()
    }

    /// Looks up the node behind `handle`.
    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.storage.nodes().get(handle.index())
    }

    /// Returns an iterator over live `(key, value)` pairs in unspecified
    /// order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            nodes: self.storage.nodes().iter(),
            remaining: self.populated,
        }
    }

    /// Removes every entry but keeps the node array.
    pub fn clear(&mut self) {
        if let Storage::Nodes(array) = &mut self.storage {
            array.nodes.fill(Node::VACANT);
            array.free_cursor = array.nodes.len();
        }
        self.populated = 0;
    }

    /// Releases the node array and returns to the empty state. The table
    /// remains usable afterwards.
    pub fn destroy(&mut self) {
        if self.is_allocated() {
            log_debug!("releasing table of {} slots", self.capacity());
        }
        self.storage = Storage::Empty;
        self.populated = 0;
    }
}

impl<S> Table<S>
where
    S: HashStrategy,
{
    /// Creates an empty table for keys of `key_type` using `strategy`.
    pub fn with_strategy(key_type: KeyType, strategy: S) -> Self {
        Self::with_config(TableConfig::new(key_type), strategy)
    }

    /// Creates an empty table from a full configuration.
    pub fn with_config(config: TableConfig, strategy: S) -> Self {
        Self {
            storage: Storage::Empty,
            populated: 0,
            config,
            strategy,
        }
    }

    #[inline(always)]
    fn hash(&self, key: Scalar) -> u64 {
        self.strategy.hash(self.config.key_type(), key)
    }

    #[inline]
    fn find(&self, key: Scalar) -> Option<(usize, Option<usize>)> {
        let Storage::Nodes(array) = &self.storage else {
            return None;
        };
        let key_type = self.config.key_type();
        array.find(self.hash(key), |candidate| {
            self.strategy.equal(key_type, candidate, key)
        })
    }

    /// Returns the value stored for `key`, or `None` if the key is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use coalesced_table::{KeyType, Table};
    /// #
    /// let mut table = Table::new(KeyType::Opaque);
    /// assert_eq!(table.get(1), None);
    /// table.set(1, 42)?;
    /// assert_eq!(table.get(1), Some(42));
    /// # Ok::<(), coalesced_table::TableError>(())
    /// ```
    pub fn get(&self, key: Scalar) -> Option<Scalar> {
        self.find(key)
            .map(|(index, _)| self.storage.nodes()[index].value)
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: Scalar) -> bool {
        self.find(key).is_some()
    }

    /// Looks up the handle of the node currently holding `key`.
    pub fn find_node(&self, key: Scalar) -> Option<NodeHandle> {
        self.find(key).map(|(index, _)| NodeHandle::new(index))
    }

    /// Stores `value` under `key`, inserting the key if it is new and
    /// overwriting the value otherwise. Returns the handle of the node that
    /// now holds the entry.
    ///
    /// Inserting into a full table grows it first.
    ///
    /// # Errors
    ///
    /// [`TableError::Overflow`] if growing would exceed the configured size
    /// limit, or [`TableError::OutOfMemory`] if the larger node array cannot
    /// be allocated. The table is unchanged in either case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use coalesced_table::{KeyType, Table};
    /// #
    /// let mut table = Table::new(KeyType::Opaque);
    /// let handle = table.set(5, 1)?;
    /// assert_eq!(table.node(handle).map(|n| n.value()), Some(1));
    ///
    /// // Setting an existing key overwrites in place.
    /// let again = table.set(5, 2)?;
    /// assert_eq!(handle, again);
    /// assert_eq!(table.get(5), Some(2));
    /// assert_eq!(table.len(), 1);
    /// # Ok::<(), coalesced_table::TableError>(())
    /// ```
    pub fn set(&mut self, key: Scalar, value: Scalar) -> Result<NodeHandle> {
        let index = match self.find(key) {
            Some((index, _)) => index,
            None => self.insert_key(key)?,
        };

        if let Storage::Nodes(array) = &mut self.storage {
            array.nodes[index].value = value;
        }
        Ok(NodeHandle::new(index))
    }

    /// Removes `key`, returning its value. Removing an absent key does
    /// nothing and returns `None`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use coalesced_table::{KeyType, Table};
    /// #
    /// let mut table = Table::new(KeyType::Opaque);
    /// table.set(3, 30)?;
    /// assert_eq!(table.delete(3), Some(30));
    /// assert_eq!(table.delete(3), None);
    /// # Ok::<(), coalesced_table::TableError>(())
    /// ```
    pub fn delete(&mut self, key: Scalar) -> Option<Scalar> {
        let (index, prev) = self.find(key)?;
        let key_type = self.config.key_type();
        let strategy = &self.strategy;
        let Storage::Nodes(array) = &mut self.storage else {
            return None;
        };

        let value = array.nodes[index].value;
        array.release(index, prev, |other| strategy.hash(key_type, other));
        self.populated -= 1;
        Some(value)
    }

    /// Ensures `additional` more keys can be inserted without a rehash.
    ///
    /// # Errors
    ///
    /// Fails like [`set`](Self::set) when the table cannot grow; the table is
    /// unchanged in that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use coalesced_table::{KeyType, Table};
    /// #
    /// let mut table = Table::new(KeyType::Opaque);
    /// table.try_reserve(100)?;
    /// assert_eq!(table.capacity(), 128);
    /// # Ok::<(), coalesced_table::TableError>(())
    /// ```
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        match self.populated.checked_add(additional) {
            Some(needed) if needed <= self.capacity() => Ok(()),
            _ => self.resize(additional),
        }
    }

    /// Rebuilds the node array at the smallest size that holds the current
    /// entries. An empty table returns to the allocation-free empty state.
    ///
    /// # Errors
    ///
    /// [`TableError::OutOfMemory`] if the smaller array cannot be allocated;
    /// the table is unchanged in that case.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        let target = match self.populated {
            0 => 0,
            populated => populated.next_power_of_two(),
        };
        if target < self.capacity() {
            self.resize(0)?;
        }
        Ok(())
    }

    /// Inserts `key`, which must be absent, growing the table as many times
    /// as it takes to find a free slot.
    fn insert_key(&mut self, key: Scalar) -> Result<usize> {
        let key_type = self.config.key_type();
        let hash = self.hash(key);

        loop {
            if let Storage::Nodes(array) = &mut self.storage {
                let strategy = &self.strategy;
                if let Some(index) = array.claim(key, hash, |other| strategy.hash(key_type, other))
                {
                    self.populated += 1;
                    return Ok(index);
                }
            }

            self.resize(1)?;
        }
    }

    /// Rebuilds the table with room for `additional` entries beyond the live
    /// ones, replaying every live entry into the new array. The current array
    /// is only replaced once the new one is complete.
    fn resize(&mut self, additional: usize) -> Result<()> {
        let limit = self.config.max_slots();
        let Some(needed) = self.populated.checked_add(additional) else {
            log_warn!("table size overflow: cannot hold {} more entries", additional);
            return Err(TableError::Overflow {
                needed: usize::MAX,
                limit,
            });
        };

        if needed == 0 {
            log_debug!("collapsing table of {} slots to empty", self.capacity());
            self.storage = Storage::Empty;
            return Ok(());
        }

        let Some(size_log) = size_log_for(needed, self.config.max_size_log()) else {
            log_warn!(
                "table size overflow: {} entries exceed {} slots",
                needed,
                limit
            );
            return Err(TableError::Overflow { needed, limit });
        };

        let mut fresh = NodeArray::allocate(size_log)?;
        let key_type = self.config.key_type();
        let strategy = &self.strategy;
        for node in self.storage.nodes().iter().rev().filter(|node| node.active) {
            let index = fresh
                .claim(node.key, strategy.hash(key_type, node.key), |other| {
                    strategy.hash(key_type, other)
                })
                .expect("resized table has a slot for every live entry");
            fresh.nodes[index].value = node.value;
        }

        log_debug!(
            "resized table from {} to {} slots ({} live entries)",
            self.capacity(),
            fresh.nodes.len(),
            self.populated
        );
        self.storage = Storage::Nodes(fresh);
        Ok(())
    }

    /// Returns a histogram of collision chain lengths.
    ///
    /// Index `i` counts the chains of length `i + 1`. Requires the `stats`
    /// feature.
    #[cfg(feature = "stats")]
    pub fn chain_histogram(&self) -> Vec<usize> {
        let mut hist = Vec::new();
        for length in self.chain_lengths() {
            if hist.len() < length {
                hist.resize(length, 0);
            }
            hist[length - 1] += 1;
        }
        hist
    }

    /// Returns detailed placement and utilization statistics.
    ///
    /// Requires the `stats` feature.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> DebugStats {
        let mut home_nodes = 0;
        let mut longest_chain = 0;
        for length in self.chain_lengths() {
            home_nodes += 1;
            longest_chain = longest_chain.max(length);
        }

        let capacity = self.capacity();
        DebugStats {
            populated: self.populated,
            capacity,
            home_nodes,
            displaced_nodes: self.populated - home_nodes,
            longest_chain,
            free_cursor: match &self.storage {
                Storage::Empty => 0,
                Storage::Nodes(array) => array.free_cursor,
            },
            load_factor: if capacity == 0 {
                0.0
            } else {
                self.populated as f64 / capacity as f64
            },
            total_bytes: capacity * core::mem::size_of::<Node>(),
        }
    }

    /// Lengths of every chain, one per node sitting in its home slot.
    #[cfg(feature = "stats")]
    fn chain_lengths(&self) -> impl Iterator<Item = usize> + '_ {
        let nodes = self.storage.nodes();
        let mask = nodes.len().wrapping_sub(1);
        nodes
            .iter()
            .enumerate()
            .filter(move |(index, node)| {
                node.active && (self.hash(node.key) as usize & mask) == *index
            })
            .map(move |(index, _)| {
                let mut length = 1;
                let mut cursor = nodes[index].next;
                while let Some(next) = cursor {
                    length += 1;
                    cursor = nodes[next.index()].next;
                }
                length
            })
    }
}

/// Iterator over the live entries of a [`Table`].
pub struct Iter<'a> {
    nodes: core::slice::Iter<'a, Node>,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = (Scalar, Scalar);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes.find(|node| node.active)?;
        self.remaining -= 1;
        Some((node.key, node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a, S> IntoIterator for &'a Table<S> {
    type Item = (Scalar, Scalar);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
