use crate::temp::{TempFile, TempSpace};
use rdf_bucket_common::{CorruptionError, EngineError, EngineResult};
use rdf_bucket_encoding::{read_binding_set, write_binding_set};
use rdf_bucket_model::BindingSet;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::sync::Arc;

/// An append-only sequence of binding sets that can be read forward and rewound to a mark.
///
/// The newest `memory_size` items are kept in memory. Older items are moved into a backing
/// file if a rewind could still reach them and dropped otherwise. The merge join uses the
/// buffer to replay a block of its left input.
#[derive(Debug)]
pub struct BindingBuffer {
    memory_size: usize,
    temp: Arc<TempSpace>,
    /// The items at the positions `floor..len`.
    memory: VecDeque<BindingSet>,
    floor: u64,
    len: u64,
    /// The position of the next item returned by [Self::next].
    read: u64,
    /// The position [Self::jumpback] rewinds to.
    mark: u64,
    backing: Option<BackingFile>,
    spilled: u64,
}

/// The items at the positions `first..floor`, appended in order.
#[derive(Debug)]
struct BackingFile {
    file: TempFile,
    writer: BufWriter<File>,
    first: u64,
    offsets: Vec<u64>,
    written: u64,
    /// A reader and the position of the item it reads next.
    reader: Option<(BufReader<File>, u64)>,
}

impl BindingBuffer {
    pub fn new(memory_size: usize, temp: Arc<TempSpace>) -> EngineResult<Self> {
        if memory_size == 0 {
            return Err(EngineError::configuration(
                "A binding buffer must hold at least one item in memory.",
            ));
        }
        Ok(Self {
            memory_size,
            temp,
            memory: VecDeque::with_capacity(memory_size.min(1024)),
            floor: 0,
            len: 0,
            read: 0,
            mark: 0,
            backing: None,
            spilled: 0,
        })
    }

    /// Appends `item` to the end of the buffer.
    pub fn add(&mut self, item: BindingSet) -> EngineResult<()> {
        self.memory.push_back(item);
        self.len += 1;
        if self.memory.len() <= self.memory_size {
            return Ok(());
        }

        let position = self.floor;
        self.floor += 1;
        let Some(evicted) = self.memory.pop_front() else {
            return Ok(());
        };
        if position < self.mark {
            return Ok(());
        }

        if self.backing.is_none() {
            let file = self.temp.allocate("binding-buffer")?;
            let writer = BufWriter::new(file.append()?);
            self.backing = Some(BackingFile {
                file,
                writer,
                first: position,
                offsets: Vec::new(),
                written: 0,
                reader: None,
            });
        }
        let Some(backing) = self.backing.as_mut() else {
            return Ok(());
        };
        backing.offsets.push(backing.written);
        backing.written += write_binding_set(&mut backing.writer, &evicted)?;
        self.spilled += 1;
        Ok(())
    }

    pub fn has_next(&self) -> bool {
        self.read < self.len
    }

    /// Returns the item at the read position and advances it.
    pub fn next(&mut self) -> EngineResult<BindingSet> {
        if !self.has_next() {
            return Err(EngineError::InvalidOperation(
                "The binding buffer has no further items.",
            ));
        }

        let position = self.read;
        let item = if position >= self.floor {
            self.memory
                .get(usize::try_from(position - self.floor).unwrap_or(usize::MAX))
                .cloned()
                .ok_or(EngineError::InvalidOperation(
                    "The binding buffer lost an in-memory item.",
                ))?
        } else {
            self.read_backing(position)?
        };
        self.read += 1;
        Ok(item)
    }

    /// Marks the read position as the target of [Self::jumpback].
    ///
    /// If the mark lies within the in-memory window, everything before it is dropped and the
    /// backing file is released.
    pub fn set_jumpback(&mut self) {
        self.mark = self.read;
        if self.mark >= self.floor {
            while self.floor < self.mark && self.memory.pop_front().is_some() {
                self.floor += 1;
            }
            self.backing = None;
        }
    }

    /// Rewinds the read position to the last mark.
    pub fn jumpback(&mut self) {
        self.read = self.mark;
    }

    /// The number of items that have been added.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if some items currently live in the backing file.
    pub fn is_spilled(&self) -> bool {
        self.backing.is_some()
    }

    /// The number of items that have been written to a backing file so far.
    pub fn spilled(&self) -> u64 {
        self.spilled
    }

    /// Drops all items and releases the backing file.
    pub fn clear(&mut self) {
        self.memory.clear();
        self.backing = None;
        self.floor = self.len;
        self.read = self.len;
        self.mark = self.len;
    }

    fn read_backing(&mut self, position: u64) -> EngineResult<BindingSet> {
        let backing = self.backing.as_mut().ok_or(EngineError::InvalidOperation(
            "The binding buffer cannot rewind before its mark.",
        ))?;
        if position < backing.first {
            return Err(EngineError::InvalidOperation(
                "The binding buffer cannot rewind before its mark.",
            ));
        }
        backing.writer.flush()?;

        let positioned = matches!(&backing.reader, Some((_, next)) if *next == position);
        if !positioned {
            let index = usize::try_from(position - backing.first).unwrap_or(usize::MAX);
            let offset = *backing.offsets.get(index).ok_or_else(|| {
                CorruptionError::msg(format!("No offset for buffered item {position}."))
            })?;
            let mut reader = BufReader::new(backing.file.open()?);
            reader.seek(SeekFrom::Start(offset))?;
            backing.reader = Some((reader, position));
        }
        let Some((reader, next)) = backing.reader.as_mut() else {
            return Err(EngineError::InvalidOperation(
                "The binding buffer has no reader for its backing file.",
            ));
        };

        let item = read_binding_set(reader)?.ok_or_else(|| {
            CorruptionError::msg("The backing file of a binding buffer ended early.")
        })?;
        *next = position + 1;
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_bucket_model::{Atom, Variable};

    fn item(value: i64) -> BindingSet {
        [(Variable(1), Atom(value))].into_iter().collect()
    }

    fn buffer(memory_size: usize) -> BindingBuffer {
        BindingBuffer::new(memory_size, Arc::new(TempSpace::new(Some(9)).unwrap())).unwrap()
    }

    /// `set_jumpback` marks the current read position, not the last added item. After `a` has
    /// been read, the mark points at `b`, so a rewind replays `b` even once it has been evicted
    /// from memory.
    #[test]
    fn rewind_restores_marked_item_after_eviction() {
        let mut buffer = buffer(1);
        buffer.add(item(1)).unwrap();
        assert_eq!(buffer.next().unwrap(), item(1));
        buffer.add(item(2)).unwrap();
        buffer.set_jumpback();
        assert_eq!(buffer.next().unwrap(), item(2));
        buffer.add(item(3)).unwrap();
        assert!(buffer.is_spilled());

        buffer.jumpback();
        assert_eq!(buffer.next().unwrap(), item(2));
        assert_eq!(buffer.next().unwrap(), item(3));
        assert!(!buffer.has_next());
    }

    #[test]
    fn initial_mark_is_the_first_item() {
        let mut buffer = buffer(2);
        for i in 0..5 {
            buffer.add(item(i)).unwrap();
        }
        for i in 0..5 {
            assert_eq!(buffer.next().unwrap(), item(i));
        }
        buffer.jumpback();
        for i in 0..5 {
            assert_eq!(buffer.next().unwrap(), item(i));
        }
    }

    #[test]
    fn repeated_replay_reads_file_and_memory() {
        let mut buffer = buffer(3);
        buffer.add(item(0)).unwrap();
        buffer.next().unwrap();
        buffer.set_jumpback();
        for i in 1..10 {
            buffer.add(item(i)).unwrap();
        }
        // Item 0 lies before the mark and is dropped instead of written.
        assert_eq!(buffer.spilled(), 6);
        for _ in 0..3 {
            buffer.jumpback();
            let values = std::iter::from_fn(|| buffer.has_next().then(|| buffer.next().unwrap()))
                .collect::<Vec<_>>();
            assert_eq!(values, (1..10).map(item).collect::<Vec<_>>());
        }
    }

    #[test]
    fn mark_inside_window_releases_file() {
        let mut buffer = buffer(2);
        for i in 0..4 {
            buffer.add(item(i)).unwrap();
        }
        assert!(buffer.is_spilled());
        for _ in 0..3 {
            buffer.next().unwrap();
        }
        buffer.set_jumpback();
        assert!(!buffer.is_spilled());
        assert_eq!(buffer.next().unwrap(), item(3));
        buffer.jumpback();
        assert_eq!(buffer.next().unwrap(), item(3));
    }

    #[test]
    fn next_on_exhausted_buffer_fails() {
        let mut buffer = buffer(1);
        assert!(buffer.is_empty());
        assert!(matches!(
            buffer.next(),
            Err(EngineError::InvalidOperation(_))
        ));
        assert!(matches!(
            BindingBuffer::new(0, Arc::new(TempSpace::new(None).unwrap())),
            Err(EngineError::Configuration(_))
        ));
    }
}
