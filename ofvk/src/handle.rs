//! # Opaque buffer handles
//!
//! Registered buffers are handed out as [`BufferHandle`]s, which are an arena slot index paired
//! with the slot's generation. Releasing a slot bumps its generation, so handles that outlive
//! their buffer are rejected instead of resolving to whatever reuses the slot.

use std::num::NonZeroU64;

/// Opaque, generation checked handle to a registered buffer.
///
/// The raw representation is never zero, which leaves `0` free to act as the null handle on
/// the status surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct BufferHandle(NonZeroU64);

impl BufferHandle {
    /// Pack a slot index and generation. The last `u32` index has no representation.
    fn new(index: u32, generation: u32) -> Option<Self> {
        let lower = index.checked_add(1)?;
        NonZeroU64::new(((generation as u64) << 32) | lower as u64).map(Self)
    }

    /// Convert a raw handle value into a handle.
    ///
    /// Returns `None` for the null handle.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Get the raw handle value.
    pub fn as_raw(self) -> u64 {
        self.0.get()
    }

    fn index(self) -> usize {
        // Foreign raw values may carry a zero lower half; those map to an index no arena has.
        ((self.0.get() & u32::MAX as u64) as usize).wrapping_sub(1)
    }

    fn generation(self) -> u32 {
        (self.0.get() >> 32) as u32
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot arena indexed by [`BufferHandle`]s.
pub struct HandleArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Default for HandleArena<T> {
    fn default() -> Self {
        Self {
            slots: vec![],
            free: vec![],
        }
    }
}

impl<T> HandleArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value and return a fresh handle to it.
    ///
    /// Once every representable index is in use the value is handed back.
    pub fn insert(&mut self, value: T) -> Result<BufferHandle, T> {
        let (index, generation) = match self.free.last() {
            Some(&index) => (index, self.slots[index as usize].generation),
            None => match u32::try_from(self.slots.len()) {
                Ok(index) => (index, 0),
                Err(_) => return Err(value),
            },
        };

        let Some(handle) = BufferHandle::new(index, generation) else {
            return Err(value);
        };

        if self.free.pop().is_none() {
            self.slots.push(Slot {
                generation,
                value: None,
            });
        }

        self.slots[index as usize].value = Some(value);

        Ok(handle)
    }

    /// Resolve a handle.
    ///
    /// Returns `None` if the handle was released or never belonged to this arena.
    pub fn get(&self, handle: BufferHandle) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|s| s.generation == handle.generation())
            .and_then(|s| s.value.as_ref())
    }

    /// Remove the value behind a handle, invalidating the handle.
    pub fn remove(&mut self, handle: BufferHandle) -> Option<T> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation())?;

        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index() as u32);

        Some(value)
    }

    /// Remove every stored value, invalidating all outstanding handles.
    pub fn drain(&mut self) -> Vec<T> {
        let mut out = vec![];
        self.free.clear();

        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let Some(value) = slot.value.take() {
                slot.generation = slot.generation.wrapping_add(1);
                out.push(value);
            }
            self.free.push(i as u32);
        }

        out
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handle_rejected() {
        let mut arena = HandleArena::new();
        let a = arena.insert(1u32).unwrap();
        assert_eq!(arena.remove(a), Some(1));
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.remove(a), None);

        // The slot gets reused, but the old handle must not see the new value.
        let b = arena.insert(2u32).unwrap();
        assert_ne!(a, b);
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b), Some(&2));
    }

    #[test]
    fn last_index_does_not_spill_into_generation() {
        assert_eq!(BufferHandle::new(u32::MAX, 0), None);
        assert_eq!(BufferHandle::new(u32::MAX, 7), None);

        let h = BufferHandle::new(u32::MAX - 1, 7).unwrap();
        assert_eq!(h.generation(), 7);
        assert_eq!(h.index(), u32::MAX as usize - 1);
        assert_eq!(h.as_raw(), (7 << 32) | u32::MAX as u64);
    }

    #[test]
    fn raw_round_trip() {
        let mut arena = HandleArena::new();
        let h = arena.insert(()).unwrap();
        assert_ne!(h.as_raw(), 0);
        assert_eq!(BufferHandle::from_raw(h.as_raw()), Some(h));
        assert_eq!(BufferHandle::from_raw(0), None);
    }

    #[test]
    fn foreign_handle_rejected() {
        let mut arena = HandleArena::<u8>::new();
        let bogus = BufferHandle::from_raw(0xdead_0000_0042).unwrap();
        assert_eq!(arena.get(bogus), None);
        assert_eq!(arena.remove(bogus), None);

        let zero_index = BufferHandle::from_raw(1 << 32).unwrap();
        assert_eq!(arena.get(zero_index), None);
    }

    #[test]
    fn drain_empties_arena() {
        let mut arena = HandleArena::new();
        let a = arena.insert('a').unwrap();
        arena.insert('b').unwrap();
        assert_eq!(arena.len(), 2);
        let mut drained = arena.drain();
        drained.sort();
        assert_eq!(drained, vec!['a', 'b']);
        assert!(arena.is_empty());
        assert_eq!(arena.get(a), None);

        // Drained slots are reused with fresh generations.
        let c = arena.insert('c').unwrap();
        assert_ne!(c, a);
        assert_eq!(arena.get(c), Some(&'c'));
        assert_eq!(arena.len(), 1);
    }
}
