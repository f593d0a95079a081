//! Open-addressing hash map with linear probing and tombstones.
//!
//! # Storage
//!
//! One allocation per table, obtained from the map's [`Allocator`]:
//!
//! ```text
//!   [ (K, V) × slots ][ pad ][ Control × slots ]
//!     entries                  controls
//! ```
//!
//! `slots` is zero or a power of two, so probing wraps with `slots - 1`
//! as a mask. Each control is `Empty`, `Tombstone` or `Full(hash)`; an
//! entry is initialised exactly when its control is `Full`.
//!
//! # Load
//!
//! The table grows (doubling, starting at [`INITIAL_SLOTS`]) once live
//! entries reach 3/4 of the slots. When live entries plus tombstones reach
//! that bound the table is rebuilt at the same size, which keeps at least
//! one `Empty` slot on every probe path.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ptr::{self, NonNull};
use std::rc::Rc;

use strata_core::align::align_up;
use strata_core::{context, AllocError, Allocator, Heap};
use tracing::{debug, warn};

use crate::hash::DefaultHashBuilder;

/// Slot count of the first table.
pub const INITIAL_SLOTS: usize = 8;

/// Largest number of live entries a table of `slots` slots may hold
/// before it grows: `slots * 3 / 4`.
#[inline]
pub const fn max_load(slots: usize) -> usize {
    (slots >> 1) + (slots >> 2)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Control {
    Empty,
    Tombstone,
    Full(u64),
}

/// Byte layout of a table with a given slot count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TableLayout {
    controls_offset: usize,
    size: usize,
}

impl TableLayout {
    fn new<K, V>(slots: usize) -> Result<Self, AllocError> {
        let entries = slots
            .checked_mul(mem::size_of::<(K, V)>())
            .ok_or(AllocError::CapacityOverflow)?;
        let controls_offset =
            align_up(entries, mem::align_of::<Control>()).ok_or(AllocError::CapacityOverflow)?;
        let size = slots
            .checked_mul(mem::size_of::<Control>())
            .and_then(|controls| controls.checked_add(controls_offset))
            .ok_or(AllocError::CapacityOverflow)?;
        Ok(Self {
            controls_offset,
            size,
        })
    }

    /// Alignment the table block needs.
    fn alignment<K, V>() -> usize {
        mem::align_of::<(K, V)>().max(mem::align_of::<Control>())
    }
}

/// An open-addressing hash map allocating through `A`.
///
/// Keys are hashed with `S` (by default [`MixState`](crate::MixState)) and
/// compared with `Eq`. All fallible operations report allocation failure
/// as [`AllocError`] instead of aborting.
///
/// ```
/// use strata_collections::HashMap;
///
/// let mut ages = HashMap::new();
/// ages.put("ada", 36).unwrap();
/// ages.put("alan", 41).unwrap();
/// assert_eq!(ages.get("ada"), Some(&36));
/// assert_eq!(ages.delete("alan"), Some(41));
/// assert_eq!(ages.len(), 1);
/// ```
pub struct HashMap<K, V, S = DefaultHashBuilder, A: Allocator = Heap> {
    entries: NonNull<MaybeUninit<(K, V)>>,
    controls: NonNull<Control>,
    /// Zero or a power of two.
    slots: usize,
    len: usize,
    tombstones: usize,
    hash_builder: S,
    alloc: A,
    marker: PhantomData<(K, V)>,
}

impl<K, V> HashMap<K, V, DefaultHashBuilder, Heap> {
    /// An empty map on the heap. Allocates nothing until the first insert.
    pub fn new() -> Self {
        Self::with_hasher_in(DefaultHashBuilder::default(), Heap)
    }
}

impl<K, V> Default for HashMap<K, V, DefaultHashBuilder, Heap> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> HashMap<K, V, DefaultHashBuilder, Rc<dyn Allocator>> {
    /// An empty map using the current ambient allocator.
    pub fn in_context() -> Self {
        Self::with_hasher_in(DefaultHashBuilder::default(), context::current())
    }
}

impl<K, V, A: Allocator> HashMap<K, V, DefaultHashBuilder, A> {
    /// An empty map allocating through `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self::with_hasher_in(DefaultHashBuilder::default(), alloc)
    }
}

impl<K, V, S> HashMap<K, V, S, Heap> {
    /// An empty heap map hashing with `hash_builder`.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_hasher_in(hash_builder, Heap)
    }
}

impl<K, V, S, A: Allocator> HashMap<K, V, S, A> {
    /// An empty map hashing with `hash_builder` and allocating through
    /// `alloc`.
    pub fn with_hasher_in(hash_builder: S, alloc: A) -> Self {
        Self {
            entries: NonNull::dangling(),
            controls: NonNull::dangling(),
            slots: 0,
            len: 0,
            tombstones: 0,
            hash_builder,
            alloc,
            marker: PhantomData,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the map holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Probe mask of the current table: slot count minus one, or zero when
    /// nothing is allocated.
    pub fn capacity(&self) -> usize {
        self.slots.saturating_sub(1)
    }

    /// Number of physical slots.
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    /// The hash builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// The allocator backing the table.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    fn controls(&self) -> &[Control] {
        // SAFETY: `controls` points at `slots` initialised controls (or is
        // dangling with `slots == 0`).
        unsafe { std::slice::from_raw_parts(self.controls.as_ptr(), self.slots) }
    }

    fn controls_mut(&mut self) -> &mut [Control] {
        // SAFETY: as in `controls`, with unique access through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.controls.as_ptr(), self.slots) }
    }

    fn entries(&self) -> &[MaybeUninit<(K, V)>] {
        // SAFETY: `entries` points at `slots` possibly-uninitialised slots.
        unsafe { std::slice::from_raw_parts(self.entries.as_ptr(), self.slots) }
    }

    fn entries_mut(&mut self) -> &mut [MaybeUninit<(K, V)>] {
        // SAFETY: as in `entries`, with unique access through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.entries.as_ptr(), self.slots) }
    }

    fn entry(&self, index: usize) -> &(K, V) {
        debug_assert!(matches!(self.controls()[index], Control::Full(_)));
        // SAFETY: callers only pass indices whose control is `Full`.
        unsafe { self.entries()[index].assume_init_ref() }
    }

    fn entry_mut(&mut self, index: usize) -> &mut (K, V) {
        debug_assert!(matches!(self.controls()[index], Control::Full(_)));
        // SAFETY: callers only pass indices whose control is `Full`.
        unsafe { self.entries_mut()[index].assume_init_mut() }
    }

    /// Drop every live entry and mark every slot `Empty`. The table stays.
    pub fn clear(&mut self) {
        if mem::needs_drop::<(K, V)>() {
            for index in 0..self.slots {
                if let Control::Full(_) = self.controls()[index] {
                    // Mark first so a panicking destructor cannot cause a
                    // double drop.
                    self.controls_mut()[index] = Control::Empty;
                    // SAFETY: the slot was `Full`, so it is initialised.
                    unsafe { self.entries_mut()[index].assume_init_drop() };
                }
            }
        }
        self.controls_mut().fill(Control::Empty);
        self.len = 0;
        self.tombstones = 0;
    }

    /// Drop every live entry and release the table.
    pub fn free(&mut self) {
        self.clear();
        if self.slots == 0 {
            return;
        }
        match TableLayout::new::<K, V>(self.slots) {
            Ok(layout) => self.release(self.entries.cast(), layout.size),
            Err(err) => warn!(%err, "hash map table layout overflow on free"),
        }
        self.entries = NonNull::dangling();
        self.controls = NonNull::dangling();
        self.slots = 0;
    }

    fn release(&self, block: NonNull<u8>, size: usize) {
        // SAFETY: `block` is the table allocated from `self.alloc` with
        // exactly `size` bytes, and no entry is borrowed from it.
        if let Err(err) = unsafe { self.alloc.deallocate(block, size) } {
            warn!(size, %err, "allocator refused to release a hash map table");
        }
    }

    /// Iterate over `(&K, &V)` in slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            entries: self.entries,
            controls: self.controls(),
            index: 0,
            remaining: self.len,
            marker: PhantomData,
        }
    }

    /// Iterate over `(&K, &mut V)` in slot order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            entries: self.entries,
            // SAFETY: controls and entries are disjoint parts of the table;
            // the iterator only reads controls and hands out entries.
            controls: unsafe { std::slice::from_raw_parts(self.controls.as_ptr(), self.slots) },
            index: 0,
            remaining: self.len,
            marker: PhantomData,
        }
    }

    /// Iterate over keys in slot order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Iterate over values in slot order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Rebuild the table with `new_slots` slots, dropping tombstones.
    fn resize(&mut self, new_slots: usize) -> Result<(), AllocError> {
        debug_assert!(new_slots.is_power_of_two() && new_slots > self.len);
        let required = TableLayout::alignment::<K, V>();
        let provided = self.alloc.alignment();
        if required > provided {
            return Err(AllocError::UnsupportedAlignment { required, provided });
        }

        let layout = TableLayout::new::<K, V>(new_slots)?;
        let block = self.alloc.allocate(layout.size)?;
        let entries = block.cast::<MaybeUninit<(K, V)>>();
        // SAFETY: `controls_offset + slots * size_of::<Control>() == size`,
        // so the control array lies inside the block, aligned because the
        // block and the offset both are.
        let controls = unsafe { block.add(layout.controls_offset) }.cast::<Control>();
        for index in 0..new_slots {
            // SAFETY: in bounds of the new control array.
            unsafe { controls.add(index).write(Control::Empty) };
        }

        let mask = new_slots - 1;
        for index in 0..self.slots {
            let Control::Full(hash) = self.controls()[index] else {
                continue;
            };
            let mut target = hash as usize & mask;
            // SAFETY: `target` stays below `new_slots`; the table has more
            // slots than live entries so an empty one is always found.
            unsafe {
                while *controls.add(target).as_ptr() != Control::Empty {
                    target = (target + 1) & mask;
                }
                ptr::copy_nonoverlapping(
                    self.entries.as_ptr().add(index),
                    entries.as_ptr().add(target),
                    1,
                );
                controls.add(target).write(Control::Full(hash));
            }
        }

        let old = (self.entries, self.slots);
        self.entries = entries;
        self.controls = controls;
        self.slots = new_slots;
        self.tombstones = 0;

        if old.1 > 0 {
            // Entries were moved bitwise; the old block only needs freeing.
            match TableLayout::new::<K, V>(old.1) {
                Ok(old_layout) => self.release(old.0.cast(), old_layout.size),
                Err(err) => warn!(%err, "hash map table layout overflow on resize"),
            }
        }
        debug!(slots = new_slots, len = self.len, "hash map resized");
        Ok(())
    }

    /// Make room for one more entry.
    fn reserve_one(&mut self) -> Result<(), AllocError> {
        if self.slots == 0 {
            return self.resize(INITIAL_SLOTS);
        }
        let limit = max_load(self.slots);
        if self.len >= limit {
            let doubled = self
                .slots
                .checked_mul(2)
                .ok_or(AllocError::CapacityOverflow)?;
            self.resize(doubled)
        } else if self.len + self.tombstones >= limit {
            self.resize(self.slots)
        } else {
            Ok(())
        }
    }
}

/// Where a probe for a key ended.
enum Probe {
    /// The key is live at this index.
    Found(usize),
    /// The key is absent; insert at this index (first tombstone on the
    /// path, else the terminating empty slot).
    Vacant(Option<usize>),
}

impl<K, V, S, A> HashMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn hash_of<Q: Hash + ?Sized>(&self, key: &Q) -> u64 {
        self.hash_builder.hash_one(key)
    }

    fn probe<Q>(&self, hash: u64, key: &Q) -> Probe
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        if self.slots == 0 {
            return Probe::Vacant(None);
        }
        let mask = self.slots - 1;
        let mut index = hash as usize & mask;
        let mut first_tombstone = None;
        for _ in 0..self.slots {
            match self.controls()[index] {
                Control::Empty => return Probe::Vacant(first_tombstone.or(Some(index))),
                Control::Tombstone => {
                    first_tombstone.get_or_insert(index);
                }
                Control::Full(stored) => {
                    if stored == hash && key.eq(self.entry(index).0.borrow()) {
                        return Probe::Found(index);
                    }
                }
            }
            index = (index + 1) & mask;
        }
        Probe::Vacant(first_tombstone)
    }

    fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.len == 0 {
            return None;
        }
        match self.probe(self.hash_of(key), key) {
            Probe::Found(index) => Some(index),
            Probe::Vacant(_) => None,
        }
    }

    /// Insert or overwrite.
    ///
    /// Returns the previous value when `key` was already present; the
    /// stored key is kept and `len` is unchanged.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>, AllocError> {
        self.reserve_one()?;
        let hash = self.hash_of(&key);
        match self.probe(hash, &key) {
            Probe::Found(index) => Ok(Some(mem::replace(&mut self.entry_mut(index).1, value))),
            Probe::Vacant(Some(index)) => {
                if self.controls()[index] == Control::Tombstone {
                    self.tombstones -= 1;
                }
                self.entries_mut()[index].write((key, value));
                self.controls_mut()[index] = Control::Full(hash);
                self.len += 1;
                Ok(None)
            }
            // `reserve_one` leaves at least one empty slot.
            Probe::Vacant(None) => Err(AllocError::CapacityOverflow),
        }
    }

    /// Borrow the value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).map(|index| &self.entry(index).1)
    }

    /// Mutably borrow the value for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find(key)?;
        Some(&mut self.entry_mut(index).1)
    }

    /// Borrow the stored key and value for `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).map(|index| {
            let (k, v) = self.entry(index);
            (k, v)
        })
    }

    /// Whether `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Remove `key`, leaving a tombstone, and return its value.
    pub fn delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find(key)?;
        self.controls_mut()[index] = Control::Tombstone;
        self.len -= 1;
        self.tombstones += 1;
        // SAFETY: the slot was `Full` and is now a tombstone, so the entry
        // is read out exactly once.
        let (_key, value) = unsafe { self.entries()[index].assume_init_read() };
        Some(value)
    }
}

impl<K, V, S, A: Allocator> Drop for HashMap<K, V, S, A> {
    fn drop(&mut self) {
        self.free();
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S, A: Allocator> fmt::Debug for HashMap<K, V, S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, S, A: Allocator> IntoIterator for &'a HashMap<K, V, S, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, A: Allocator> IntoIterator for &'a mut HashMap<K, V, S, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

// ── Iterators ───────────────────────────────────────────────────────

/// Shared iterator over a [`HashMap`], in slot order.
pub struct Iter<'a, K, V> {
    entries: NonNull<MaybeUninit<(K, V)>>,
    controls: &'a [Control],
    index: usize,
    remaining: usize,
    marker: PhantomData<&'a (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.controls.len() {
            let index = self.index;
            self.index += 1;
            if let Control::Full(_) = self.controls[index] {
                self.remaining -= 1;
                // SAFETY: `Full` slot, borrowed shared for `'a` from the map.
                let (k, v) = unsafe { (*self.entries.as_ptr().add(index)).assume_init_ref() };
                return Some((k, v));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries,
            controls: self.controls,
            index: self.index,
            remaining: self.remaining,
            marker: PhantomData,
        }
    }
}

/// Iterator over a [`HashMap`] with mutable values, in slot order.
pub struct IterMut<'a, K, V> {
    entries: NonNull<MaybeUninit<(K, V)>>,
    controls: &'a [Control],
    index: usize,
    remaining: usize,
    marker: PhantomData<&'a mut (K, V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.controls.len() {
            let index = self.index;
            self.index += 1;
            if let Control::Full(_) = self.controls[index] {
                self.remaining -= 1;
                // SAFETY: `Full` slot; each index is yielded once, so the
                // mutable borrows are disjoint.
                let (k, v) = unsafe { (*self.entries.as_ptr().add(index)).assume_init_mut() };
                return Some((&*k, v));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Iterator over the keys of a [`HashMap`].
#[derive(Clone)]
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// Iterator over the values of a [`HashMap`].
#[derive(Clone)]
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::hash::{BuildHasherDefault, Hasher};

    /// Hasher that maps every key to the same value, forcing every insert
    /// onto one probe chain.
    #[derive(Default)]
    struct Constant<const H: u64>;

    impl<const H: u64> Hasher for Constant<H> {
        fn write(&mut self, _: &[u8]) {}

        fn finish(&self) -> u64 {
            H
        }
    }

    type Colliding<const H: u64> = BuildHasherDefault<Constant<H>>;

    fn tombstones<K, V, S, A: Allocator>(map: &HashMap<K, V, S, A>) -> usize {
        map.controls()
            .iter()
            .filter(|c| **c == Control::Tombstone)
            .count()
    }

    #[test]
    fn new_map_allocates_nothing() {
        let map: HashMap<u64, u64> = HashMap::new();
        assert_eq!(map.capacity(), 0);
        assert_eq!(map.slot_count(), 0);
        assert_eq!(map.get(&1), None);
        assert_eq!(map.iter().count(), 0);
    }

    #[test]
    fn first_put_allocates_initial_slots() {
        let mut map = HashMap::new();
        map.put(1u64, "one").unwrap();
        assert_eq!(map.slot_count(), INITIAL_SLOTS);
        assert_eq!(map.capacity(), INITIAL_SLOTS - 1);
    }

    #[test]
    fn twenty_two_keys_scenario() {
        let mut map = HashMap::new();
        for i in 0..22u64 {
            assert_eq!(map.put(i, i * 10).unwrap(), None);
        }
        assert_eq!(map.len(), 22);
        assert_eq!(map.slot_count(), 32);
        assert_eq!(map.get(&2), Some(&20));
        assert_eq!(map.delete(&10), Some(100));
        assert_eq!(map.get(&10), None);
        assert_eq!(map.len(), 21);
    }

    #[test]
    fn overwrite_keeps_len_and_returns_old() {
        let mut map = HashMap::new();
        map.put("k".to_string(), 1).unwrap();
        assert_eq!(map.put("k".to_string(), 2).unwrap(), Some(1));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("k"), Some(&2));
    }

    #[test]
    fn load_factor_never_exceeded() {
        let mut map = HashMap::new();
        for i in 0..1000u32 {
            map.put(i, ()).unwrap();
            assert!(map.len() <= max_load(map.slot_count()));
        }
    }

    #[test]
    fn tombstone_reused_without_duplicates() {
        let mut map: HashMap<u32, u32, Colliding<5>> = HashMap::with_hasher(Default::default());
        map.put(1, 10).unwrap();
        map.put(2, 20).unwrap();
        map.put(3, 30).unwrap();
        assert_eq!(map.delete(&1), Some(10));
        assert_eq!(tombstones(&map), 1);

        // Key 3 sits past the tombstone; overwriting it must not create a
        // second copy in the tombstone's slot.
        assert_eq!(map.put(3, 31).unwrap(), Some(30));
        assert_eq!(map.len(), 2);
        assert_eq!(tombstones(&map), 1);

        map.put(4, 40).unwrap();
        assert_eq!(tombstones(&map), 0);
        assert_eq!(map.get(&3), Some(&31));
        assert_eq!(map.get(&4), Some(&40));
    }

    #[test]
    fn churn_rehashes_in_place() {
        let mut map = HashMap::new();
        for round in 0..100u64 {
            map.put(round, round).unwrap();
            map.put(round + 1_000, round).unwrap();
            map.delete(&round);
            map.delete(&(round + 1_000));
            assert!(map.len() + tombstones(&map) <= max_load(map.slot_count()));
        }
        assert!(map.is_empty());
        assert_eq!(map.slot_count(), INITIAL_SLOTS);
        assert_eq!(map.get(&99), None);
    }

    #[test]
    fn growth_drops_tombstones() {
        let mut map = HashMap::new();
        for i in 0..6u64 {
            map.put(i, i).unwrap();
        }
        map.delete(&0);
        map.delete(&1);
        map.put(0, 0).unwrap();
        map.put(1, 1).unwrap();
        map.put(6, 6).unwrap();
        assert_eq!(map.slot_count(), 16);
        assert_eq!(tombstones(&map), 0);
        for i in 0..7u64 {
            assert_eq!(map.get(&i), Some(&i));
        }
    }

    #[test]
    fn hashes_zero_and_one_are_ordinary() {
        let mut zero: HashMap<u8, u8, Colliding<0>> = HashMap::with_hasher(Default::default());
        let mut one: HashMap<u8, u8, Colliding<1>> = HashMap::with_hasher(Default::default());
        for k in 0..5 {
            zero.put(k, k).unwrap();
            one.put(k, k).unwrap();
        }
        for k in 0..5 {
            assert_eq!(zero.get(&k), Some(&k));
            assert_eq!(one.get(&k), Some(&k));
        }
        assert_eq!(zero.delete(&2), Some(2));
        assert!(!zero.contains_key(&2));
    }

    #[test]
    fn clear_keeps_table() {
        let mut map = HashMap::new();
        for i in 0..10u8 {
            map.put(i, i).unwrap();
        }
        let slots = map.slot_count();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.slot_count(), slots);
        assert_eq!(map.get(&3), None);
        map.put(3, 3).unwrap();
        assert_eq!(map.get(&3), Some(&3));
    }

    #[test]
    fn iteration_skips_dead_slots() {
        let mut map = HashMap::new();
        for i in 0..10u32 {
            map.put(i, i * 2).unwrap();
        }
        for i in (0..10u32).step_by(2) {
            map.delete(&i);
        }
        let mut keys: Vec<u32> = map.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 3, 5, 7, 9]);
        assert_eq!(map.iter().len(), 5);

        for (_, v) in map.iter_mut() {
            *v += 1;
        }
        let mut values: Vec<u32> = map.values().copied().collect();
        values.sort_unstable();
        assert_eq!(values, vec![3, 7, 11, 15, 19]);
    }

    #[test]
    fn get_key_value_and_get_mut() {
        let mut map = HashMap::new();
        map.put(String::from("alpha"), 1).unwrap();
        *map.get_mut("alpha").unwrap() += 41;
        let (k, v) = map.get_key_value("alpha").unwrap();
        assert_eq!((k.as_str(), *v), ("alpha", 42));
        assert_eq!(format!("{map:?}"), r#"{"alpha": 42}"#);
    }

    #[test]
    fn values_are_dropped_exactly_once() {
        struct Counted<'a>(&'a Cell<usize>);

        impl Drop for Counted<'_> {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let drops = Cell::new(0);
        {
            let mut map = HashMap::new();
            for i in 0..20u32 {
                map.put(i, Counted(&drops)).unwrap();
            }
            drop(map.delete(&0));
            assert_eq!(drops.get(), 1);
            drop(map.put(1, Counted(&drops)).unwrap());
            assert_eq!(drops.get(), 2);
            map.clear();
            assert_eq!(drops.get(), 21);
            map.put(100, Counted(&drops)).unwrap();
        }
        assert_eq!(drops.get(), 22);
    }

    #[test]
    fn overaligned_entries_rejected() {
        #[derive(PartialEq, Eq, Hash)]
        #[repr(align(32))]
        struct Wide(#[allow(dead_code)] u8);

        let mut map = HashMap::new();
        let err = map.put(Wide(1), ()).unwrap_err();
        assert_eq!(
            err,
            AllocError::UnsupportedAlignment {
                required: 32,
                provided: 16
            }
        );
        assert!(map.is_empty());
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Put(u16, u32),
            Delete(u16),
            Get(u16),
            Clear,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                6 => (0u16..256, any::<u32>()).prop_map(|(k, v)| Op::Put(k, v)),
                3 => (0u16..256).prop_map(Op::Delete),
                3 => (0u16..256).prop_map(Op::Get),
                1 => Just(Op::Clear),
            ]
        }

        proptest! {
            #[test]
            fn matches_std_model(ops in prop::collection::vec(op(), 1..400)) {
                let mut map = HashMap::new();
                let mut model = std::collections::HashMap::new();
                for op in ops {
                    match op {
                        Op::Put(k, v) => {
                            prop_assert_eq!(map.put(k, v).unwrap(), model.insert(k, v));
                        }
                        Op::Delete(k) => prop_assert_eq!(map.delete(&k), model.remove(&k)),
                        Op::Get(k) => prop_assert_eq!(map.get(&k), model.get(&k)),
                        Op::Clear => {
                            map.clear();
                            model.clear();
                        }
                    }
                    prop_assert_eq!(map.len(), model.len());
                    prop_assert!(map.len() + tombstones(&map) <= max_load(map.slot_count()));
                }
                prop_assert_eq!(map.iter().count(), model.len());
                for (k, v) in &map {
                    prop_assert_eq!(model.get(k), Some(v));
                }
            }
        }
    }
}
