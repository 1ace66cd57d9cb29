//! Slot+generation handle table for objects owned across the C boundary.
//!
//! A handle packs a slot index (upper 32 bits) and the slot's generation
//! (lower 32 bits). Removing an object bumps the slot's generation, so a
//! handle kept by C after destruction no longer resolves. Removal through
//! a stale handle is a no-op.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Key {
    slot: u32,
    generation: u32,
}

impl Key {
    fn pack(self) -> u64 {
        (u64::from(self.slot) << 32) | u64::from(self.generation)
    }

    fn unpack(handle: u64) -> Self {
        Self {
            slot: (handle >> 32) as u32,
            generation: handle as u32,
        }
    }
}

enum Entry<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32 },
}

impl<T> Entry<T> {
    fn generation(&self) -> u32 {
        match self {
            Self::Occupied { generation, .. } | Self::Vacant { generation } => *generation,
        }
    }
}

/// Maps `u64` handles to owned values, reusing vacant slots.
pub(crate) struct HandleTable<T> {
    entries: Vec<Entry<T>>,
    vacant: Vec<u32>,
    live: usize,
}

impl<T> HandleTable<T> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            vacant: Vec::new(),
            live: 0,
        }
    }

    /// Store `value` and return its handle.
    pub fn insert(&mut self, value: T) -> u64 {
        self.live += 1;
        if let Some(slot) = self.vacant.pop() {
            let generation = self.entries[slot as usize].generation();
            self.entries[slot as usize] = Entry::Occupied { generation, value };
            return Key { slot, generation }.pack();
        }
        let slot = self.entries.len() as u32;
        self.entries.push(Entry::Occupied {
            generation: 0,
            value,
        });
        Key {
            slot,
            generation: 0,
        }
        .pack()
    }

    pub fn get(&self, handle: u64) -> Option<&T> {
        let key = Key::unpack(handle);
        match self.entries.get(key.slot as usize)? {
            Entry::Occupied { generation, value } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: u64) -> Option<&mut T> {
        let key = Key::unpack(handle);
        match self.entries.get_mut(key.slot as usize)? {
            Entry::Occupied { generation, value } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    /// Take the value out and invalidate every copy of `handle`.
    ///
    /// A slot whose generation wraps to 0 is retired instead of reused, so
    /// handles from its first life can never resolve again.
    pub fn remove(&mut self, handle: u64) -> Option<T> {
        let key = Key::unpack(handle);
        let entry = self.entries.get_mut(key.slot as usize)?;
        if !matches!(entry, Entry::Occupied { generation, .. } if *generation == key.generation) {
            return None;
        }
        let next = key.generation.wrapping_add(1);
        let Entry::Occupied { value, .. } = std::mem::replace(entry, Entry::Vacant { generation: next }) else {
            return None;
        };
        if next != 0 {
            self.vacant.push(key.slot);
        }
        self.live -= 1;
        Some(value)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.live
    }
}
