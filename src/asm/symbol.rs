//! Symbol table mapping labels to memory addresses.
//!
//! The table is backed by [`Dict`], a small open-addressed hash map keyed
//! by FNV-1a. It only ever holds at most [`MEM_SIZE`] entries (one label
//! per statement), so the simple probe scheme is plenty.
//!
//! [`MEM_SIZE`]: crate::asm::MEM_SIZE

const FNV_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Computes the 64-bit FNV-1a hash of a key.
///
/// The key's terminating NUL is folded into the hash, so the hash of a key
/// matches the hash of the same key as a C string.
fn fnv1a(key: &str) -> u64 {
    let mut hash = FNV_BASIS;
    for b in key.bytes().chain([0]) {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

const INIT_CAPACITY: usize = 8;

#[derive(Debug, Clone)]
struct Entry<V> {
    key: String,
    hash: u64,
    value: V,
}

/// A string-keyed hash map with open addressing and linear probing.
///
/// Slots are indexed by `hash & (capacity - 1)`, so the capacity is always
/// a power of two. The backing array doubles before an insert would fill it
/// completely; a probe for an absent key only terminates by hitting an
/// empty slot, so the table always keeps at least one.
#[derive(Debug, Clone)]
pub struct Dict<V> {
    slots: Box<[Option<Entry<V>>]>,
    size: usize,
}

impl<V> Dict<V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(INIT_CAPACITY).collect(),
            size: 0,
        }
    }

    /// The number of entries in the map.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Walks the probe sequence for a key, ending at its slot (`Ok`) or at
    /// the first empty slot (`Err`).
    fn probe(&self, hash: u64, key: &str) -> Result<usize, usize> {
        let mask = self.slots.len() - 1;
        let mut i = (hash as usize) & mask;
        loop {
            match &self.slots[i] {
                Some(e) if e.hash == hash && e.key == key => return Ok(i),
                Some(_) => i = (i + 1) & mask,
                None => return Err(i),
            }
        }
    }

    /// Inserts a value for the given key, overwriting in place (without
    /// growing) if the key is already present.
    pub fn set(&mut self, key: &str, value: V) {
        let hash = fnv1a(key);
        if let Ok(i) = self.probe(hash, key) {
            if let Some(e) = &mut self.slots[i] {
                e.value = value;
            }
            return;
        }

        // Grow before the insert could take the last empty slot.
        if self.size + 1 == self.slots.len() {
            self.grow();
        }
        if let Err(i) = self.probe(hash, key) {
            self.slots[i] = Some(Entry { key: key.to_string(), hash, value });
            self.size += 1;
        }
    }

    /// Looks up the value for the given key.
    pub fn get(&self, key: &str) -> Option<&V> {
        let hash = fnv1a(key);
        match self.probe(hash, key) {
            Ok(i) => self.slots[i].as_ref().map(|e| &e.value),
            Err(_) => None,
        }
    }

    /// Iterates over the entries of the map in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.slots.iter()
            .flatten()
            .map(|e| (&*e.key, &e.value))
    }

    /// Doubles the backing array, rehashing every entry into the new table.
    fn grow(&mut self) {
        let new_cap = self.slots.len() * 2;
        let old = std::mem::replace(
            &mut self.slots,
            std::iter::repeat_with(|| None).take(new_cap).collect(),
        );

        for entry in old.into_vec().into_iter().flatten() {
            let mut i = (entry.hash as usize) & (new_cap - 1);
            while self.slots[i].is_some() {
                i = (i + 1) & (new_cap - 1);
            }
            self.slots[i] = Some(entry);
        }
    }
}

impl<V> Default for Dict<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A mapping from label to the memory address it names.
///
/// This is filled in by the resolution pass of [`validate`] and consumed by
/// the operand-checking pass and by [`codegen`].
///
/// [`validate`]: crate::asm::validate
/// [`codegen`]: crate::asm::codegen
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    labels: Dict<u16>,
}

impl SymbolTable {
    /// Creates an empty symbol table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a label to an address, overwriting any previous binding.
    pub fn add_label(&mut self, label: &str, addr: u16) {
        self.labels.set(label, addr);
    }

    /// Gets the address of a given label, if it is defined.
    pub fn lookup_label(&self, label: &str) -> Option<u16> {
        self.labels.get(label).copied()
    }

    /// Iterates over the defined labels and their addresses.
    pub fn label_iter(&self) -> impl Iterator<Item = (&str, u16)> + '_ {
        self.labels.iter().map(|(k, &v)| (k, v))
    }

    /// The number of defined labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the table has no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{fnv1a, Dict, SymbolTable, FNV_BASIS, FNV_PRIME};

    #[test]
    fn test_fnv1a_reference_values() {
        // Empty key is one round over the terminating NUL.
        assert_eq!(fnv1a(""), FNV_BASIS.wrapping_mul(FNV_PRIME));
        assert_ne!(fnv1a("a"), fnv1a("b"));
        assert_eq!(fnv1a("loop"), fnv1a("loop"));
    }

    #[test]
    fn test_set_get() {
        let mut d = Dict::new();
        assert!(d.is_empty());
        assert_eq!(d.get("x"), None);

        d.set("x", 1);
        d.set("y", 2);
        assert_eq!(d.len(), 2);
        assert_eq!(d.get("x"), Some(&1));
        assert_eq!(d.get("y"), Some(&2));
        assert_eq!(d.get("z"), None);
    }

    #[test]
    fn test_overwrite_in_place() {
        let mut d = Dict::new();
        d.set("x", 1);
        d.set("x", 99);
        assert_eq!(d.len(), 1);
        assert_eq!(d.get("x"), Some(&99));
    }

    #[test]
    fn test_get_missing_key_after_filling_initial_capacity() {
        // With every initial slot taken, a lookup for an absent key still
        // has to terminate (and miss).
        let mut d = Dict::new();
        for i in 0..8u16 {
            d.set(&format!("label{i}"), i);
        }
        assert_eq!(d.get("missing"), None);
        assert_eq!(d.len(), 8);
    }

    #[test]
    fn test_table_always_keeps_an_empty_slot() {
        let mut d = Dict::new();
        for i in 0..40u16 {
            d.set(&format!("label{i}"), i);
            assert!(d.size < d.slots.len());
            assert_eq!(d.get("absent"), None);
        }
    }

    #[test]
    fn test_overwrite_near_capacity_does_not_grow() {
        let mut d = Dict::new();
        for i in 0..7u16 {
            d.set(&format!("label{i}"), i);
        }
        let cap = d.slots.len();

        d.set("label0", 99);
        assert_eq!(d.slots.len(), cap);
        assert_eq!(d.len(), 7);
        assert_eq!(d.get("label0"), Some(&99));
    }

    #[test]
    fn test_growth_past_initial_capacity() {
        let mut d = Dict::new();
        for i in 0..100u16 {
            d.set(&format!("label{i}"), i);
        }
        assert_eq!(d.len(), 100);
        for i in 0..100u16 {
            assert_eq!(d.get(&format!("label{i}")), Some(&i));
        }
    }

    #[test]
    fn test_symbol_table() {
        let mut st = SymbolTable::new();
        st.add_label("start", 0);
        st.add_label("count", 42);

        assert_eq!(st.lookup_label("start"), Some(0));
        assert_eq!(st.lookup_label("count"), Some(42));
        assert_eq!(st.lookup_label("missing"), None);

        let mut labels: Vec<_> = st.label_iter().collect();
        labels.sort();
        assert_eq!(labels, vec![("count", 42), ("start", 0)]);
    }
}
