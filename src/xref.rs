use std::collections::BTreeMap;

use crate::error::{Result, XrefError};

/// One entry of the cross-reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Free slot; `next` is the next free object number in the chain (entry 0
    /// always has `generation == 65535`).
    Free { next: u32, generation: u16 },
    /// Live object at an absolute byte offset.
    Normal { offset: u32, generation: u16 },
    /// Live object packed inside an object stream; generation is implicitly 0.
    Compressed { container: u32, index: u16 },
    /// A free entry whose slot can never be reused (placeholder written by
    /// some producers instead of a proper free-list link).
    UnusableFree,
}

/// Sparse xref table: object number -> latest entry, built by merging
/// successive (overriding) sections as the `Prev` chain is followed.
#[derive(Debug, Clone, Default)]
pub struct Xref {
    pub entries: BTreeMap<u32, XrefEntry>,
    /// Declared `Size` (maximum object number + 1).
    pub size: u32,
}

impl Xref {
    pub fn new(size: u32) -> Self {
        Xref { entries: BTreeMap::new(), size }
    }

    pub fn get(&self, object_number: u32) -> Option<&XrefEntry> {
        self.entries.get(&object_number)
    }

    pub fn insert(&mut self, object_number: u32, entry: XrefEntry) {
        self.entries.insert(object_number, entry);
    }

    pub fn max_id(&self) -> u32 {
        self.entries.keys().copied().max().unwrap_or(0)
    }

    /// Merge `other` (an earlier, lower-priority section reached via `Prev`)
    /// into `self`: entries already present in `self` win — later sections
    /// override earlier entries.
    pub fn merge(&mut self, other: Xref) {
        for (id, entry) in other.entries {
            self.entries.entry(id).or_insert(entry);
        }
        if other.size > self.size {
            self.size = other.size;
        }
    }

    /// Walk the free-list starting at entry 0, guarding against loops by
    /// terminating traversal on revisit.
    pub fn free_list(&self) -> Result<Vec<u32>> {
        let mut visited = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut current = 0u32;
        loop {
            if !seen.insert(current) {
                break;
            }
            visited.push(current);
            match self.entries.get(&current) {
                Some(XrefEntry::Free { next, .. }) => {
                    if *next == 0 || *next == current {
                        break;
                    }
                    current = *next;
                }
                _ => break,
            }
        }
        Ok(visited)
    }
}

/// Width triple for a cross-reference stream's `W` array.
#[derive(Debug, Clone, Copy)]
pub struct XrefStreamWidths {
    pub type_field: usize,
    pub field2: usize,
    pub field3: usize,
}

impl XrefStreamWidths {
    pub fn from_array(w: &[i64]) -> Result<Self> {
        if w.len() != 3 || w.iter().any(|&v| v < 0) {
            return Err(XrefError::InvalidWidthArray.into());
        }
        Ok(XrefStreamWidths { type_field: w[0] as usize, field2: w[1] as usize, field3: w[2] as usize })
    }

    pub fn entry_width(&self) -> usize {
        self.type_field + self.field2 + self.field3
    }
}

/// Decode one fixed-width xref-stream row into an `XrefEntry`. Missing
/// leading fields default to 0, 0, and 0 respectively.
pub fn decode_stream_entry(row: &[u8], widths: &XrefStreamWidths) -> XrefEntry {
    let mut pos = 0;
    let read_field = |row: &[u8], pos: &mut usize, width: usize, default: u64| -> u64 {
        if width == 0 {
            return default;
        }
        let mut value = 0u64;
        for &b in &row[*pos..*pos + width] {
            value = (value << 8) | b as u64;
        }
        *pos += width;
        value
    };

    let field_type = if widths.type_field == 0 { 1 } else { read_field(row, &mut pos, widths.type_field, 1) };
    let field2 = read_field(row, &mut pos, widths.field2, 0);
    let field3 = read_field(row, &mut pos, widths.field3, 0);

    match field_type {
        0 => XrefEntry::Free { next: field2 as u32, generation: field3 as u16 },
        1 => XrefEntry::Normal { offset: field2 as u32, generation: field3 as u16 },
        2 => XrefEntry::Compressed { container: field2 as u32, index: field3 as u16 },
        _ => XrefEntry::UnusableFree,
    }
}

/// Encode an `XrefEntry` back into a fixed-width row for writing.
pub fn encode_stream_entry(entry: &XrefEntry, widths: &XrefStreamWidths) -> Vec<u8> {
    let (field_type, field2, field3): (u64, u64, u64) = match *entry {
        XrefEntry::Free { next, generation } => (0, next as u64, generation as u64),
        XrefEntry::Normal { offset, generation } => (1, offset as u64, generation as u64),
        XrefEntry::Compressed { container, index } => (2, container as u64, index as u64),
        XrefEntry::UnusableFree => (0, 0, 65535),
    };

    let mut out = Vec::with_capacity(widths.entry_width());
    let mut push_be = |value: u64, width: usize| {
        for i in (0..width).rev() {
            out.push(((value >> (8 * i)) & 0xFF) as u8);
        }
    };
    push_be(field_type, widths.type_field);
    push_be(field2, widths.field2);
    push_be(field3, widths.field3);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_section_overrides_earlier_on_merge() {
        let mut newer = Xref::new(3);
        newer.insert(1, XrefEntry::Normal { offset: 500, generation: 0 });
        let mut older = Xref::new(3);
        older.insert(1, XrefEntry::Normal { offset: 100, generation: 0 });
        older.insert(2, XrefEntry::Normal { offset: 200, generation: 0 });

        newer.merge(older);

        assert_eq!(newer.get(1), Some(&XrefEntry::Normal { offset: 500, generation: 0 }));
        assert_eq!(newer.get(2), Some(&XrefEntry::Normal { offset: 200, generation: 0 }));
    }

    #[test]
    fn free_list_terminates_on_self_loop() {
        let mut xref = Xref::new(2);
        xref.insert(0, XrefEntry::Free { next: 1, generation: 65535 });
        xref.insert(1, XrefEntry::Free { next: 1, generation: 0 });
        let visited = xref.free_list().unwrap();
        assert_eq!(visited, vec![0, 1]);
    }

    #[test]
    fn stream_entry_roundtrip() {
        let widths = XrefStreamWidths { type_field: 1, field2: 2, field3: 1 };
        let entry = XrefEntry::Compressed { container: 12, index: 3 };
        let row = encode_stream_entry(&entry, &widths);
        assert_eq!(row.len(), widths.entry_width());
        assert_eq!(decode_stream_entry(&row, &widths), entry);
    }

    #[test]
    fn zero_width_leading_fields_default_to_type_1() {
        let widths = XrefStreamWidths { type_field: 0, field2: 2, field3: 0 };
        let row = vec![0x00, 0x2A];
        assert_eq!(decode_stream_entry(&row, &widths), XrefEntry::Normal { offset: 42, generation: 0 });
    }
}
