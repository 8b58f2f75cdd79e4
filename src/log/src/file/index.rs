use std::fmt::{Display, Formatter};

use bytes::BufMut;
use byteorder::{ByteOrder, LittleEndian};
use viaems_utils::time::{time_format, unix_nano_to_time};

use crate::file::{INDEX_ENTRY_SIZE, INDEX_ENTRY_TYPE_CHUNK};

/// IndexEntry is the index information for a given chunk in a log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// The timestamps of the first and last sample stored in the chunk.
    pub start_time: u64,
    pub stop_time: u64,

    pub typ: u8,

    /// The absolute position in the file where this chunk's size prefix is located.
    pub offset: u64,

    /// The size in bytes of the chunk in the file.
    pub size: u64,
}

impl IndexEntry {
    pub fn new(start_time: u64, stop_time: u64, offset: u64, size: u64) -> Self {
        Self {
            start_time,
            stop_time,
            typ: INDEX_ENTRY_TYPE_CHUNK,
            offset,
            size,
        }
    }

    /// unmarshal_binary decodes an IndexEntry from a byte slice.
    pub fn unmarshal_binary(b: &[u8]) -> anyhow::Result<Self> {
        if b.len() < INDEX_ENTRY_SIZE {
            return Err(anyhow!(
                "unmarshal_binary: short buf: {} < {}",
                b.len(),
                INDEX_ENTRY_SIZE
            ));
        }

        Ok(Self {
            start_time: LittleEndian::read_u64(&b[..8]),
            stop_time: LittleEndian::read_u64(&b[8..16]),
            typ: b[16],
            offset: LittleEndian::read_u64(&b[17..25]),
            size: LittleEndian::read_u64(&b[25..33]),
        })
    }

    /// append_to writes a binary-encoded version of IndexEntry to b.
    pub fn append_to(&self, b: &mut Vec<u8>) {
        b.put_u64_le(self.start_time);
        b.put_u64_le(self.stop_time);
        b.put_u8(self.typ);
        b.put_u64_le(self.offset);
        b.put_u64_le(self.size);
    }

    /// contains returns true if this IndexEntry may contain values for the given time.
    /// The start and stop times are inclusive.
    pub fn contains(&self, t: u64) -> bool {
        self.start_time <= t && self.stop_time >= t
    }

    /// overlaps_time_range returns true if the given time range intersects the entry's time bounds.
    pub fn overlaps_time_range(&self, min: u64, max: u64) -> bool {
        self.start_time <= max && self.stop_time >= min
    }

    /// end returns the offset of the first byte after the chunk.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

impl Display for IndexEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "start={} stop={} ofs={} siz={}",
            time_format(unix_nano_to_time(self.start_time)),
            time_format(unix_nano_to_time(self.stop_time)),
            self.offset,
            self.size,
        )
    }
}

/// IndexEntries holds the index of a log file in chunk order. Entries are
/// never reordered.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexEntries {
    pub entries: Vec<IndexEntry>,
}

impl IndexEntries {
    pub fn new() -> Self {
        Self { entries: vec![] }
    }

    pub fn push(&mut self, entry: IndexEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndexEntry> {
        self.entries.iter()
    }

    /// time_range returns the first start time and the last stop time.
    pub fn time_range(&self) -> Option<(u64, u64)> {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => Some((first.start_time, last.stop_time)),
            _ => None,
        }
    }

    /// is_time_ordered returns true if every chunk stops no later than the next
    /// one starts, which is what `search` relies on.
    pub fn is_time_ordered(&self) -> bool {
        self.entries.windows(2).all(|w| {
            w[0].start_time <= w[0].stop_time && w[0].stop_time <= w[1].start_time
        })
    }

    /// search returns the entries overlapping [min, max] by binary search.
    /// The result is only meaningful when `is_time_ordered` holds.
    pub fn search(&self, min: u64, max: u64) -> &[IndexEntry] {
        if min > max {
            return &[];
        }

        let lo = self.entries.partition_point(|e| e.stop_time < min);
        let hi = self.entries.partition_point(|e| e.start_time <= max);
        if lo >= hi {
            return &[];
        }
        &self.entries[lo..hi]
    }

    /// scan returns the entries overlapping [min, max] by a linear scan, for
    /// logs whose chunks are not time ordered.
    pub fn scan(&self, min: u64, max: u64) -> Vec<IndexEntry> {
        self.entries
            .iter()
            .filter(|e| e.overlaps_time_range(min, max))
            .copied()
            .collect()
    }

    pub fn marshal_binary(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.entries.len() * INDEX_ENTRY_SIZE);

        for entry in &self.entries {
            entry.append_to(&mut buf);
        }

        buf
    }

    pub fn unmarshal_binary(b: &[u8], count: usize) -> anyhow::Result<Self> {
        if b.len() < count * INDEX_ENTRY_SIZE {
            return Err(anyhow!(
                "unmarshal_binary: short buf for {} entries: {} < {}",
                count,
                b.len(),
                count * INDEX_ENTRY_SIZE
            ));
        }

        let entries = b
            .chunks_exact(INDEX_ENTRY_SIZE)
            .take(count)
            .map(IndexEntry::unmarshal_binary)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self { entries })
    }
}
