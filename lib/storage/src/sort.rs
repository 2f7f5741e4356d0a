use crate::bucket::{Bucket, BucketFormat};
use crate::temp::{TempFile, TempSpace};
use rdf_bucket_common::{CorruptionError, EngineError, EngineResult};
use rdf_bucket_encoding::{mini_positions, read_i64, read_record};
use std::cmp::Ordering;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Describes fixed-size records that consist of little-endian `i64` columns and the columns by
/// which they are sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    item_len: usize,
    key: Vec<usize>,
}

impl RecordLayout {
    pub fn try_new(item_len: usize, key: Vec<usize>) -> EngineResult<Self> {
        if item_len == 0 || item_len % 8 != 0 {
            return Err(EngineError::configuration(format!(
                "Record length must be a positive multiple of 8, got {item_len}."
            )));
        }
        if key.is_empty() {
            return Err(EngineError::configuration("Sort key must not be empty."));
        }
        if let Some(column) = key.iter().find(|column| **column >= item_len / 8) {
            return Err(EngineError::configuration(format!(
                "Sort column {column} is outside of a {item_len}-byte record."
            )));
        }
        Ok(Self { item_len, key })
    }

    /// Returns the layout of `bucket` sorted by its order.
    ///
    /// Mini buckets only hold the secondary and tertiary positions, so they are sorted by them.
    pub fn for_bucket(bucket: &Bucket) -> Self {
        let order = bucket.order();
        match bucket.format() {
            BucketFormat::Full => Self {
                item_len: bucket.record_len(),
                key: order.key_columns().to_vec(),
            },
            BucketFormat::Mini => {
                let stored = mini_positions(order.primary());
                let key = [order.secondary(), order.tertiary()]
                    .iter()
                    .filter_map(|position| stored.iter().position(|p| p == position))
                    .collect();
                Self {
                    item_len: bucket.record_len(),
                    key,
                }
            }
        }
    }

    pub fn item_len(&self) -> usize {
        self.item_len
    }

    pub fn key(&self) -> &[usize] {
        &self.key
    }

    /// Compares two records by the key columns.
    pub fn compare(&self, lhs: &[u8], rhs: &[u8]) -> Ordering {
        self.key
            .iter()
            .map(|column| read_i64(lhs, *column).cmp(&read_i64(rhs, *column)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// The result of an external sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOutcome {
    /// The number of sorted records.
    pub records: u64,
    /// The number of sorted runs that were spilled into temporary files.
    pub chunks: usize,
}

/// Sorts `bucket` in place by its order.
pub fn sort_bucket(
    bucket: &Bucket,
    max_records_in_memory: usize,
    temp: &TempSpace,
) -> EngineResult<SortOutcome> {
    sort_file(
        bucket.path(),
        &RecordLayout::for_bucket(bucket),
        max_records_in_memory,
        temp,
    )
}

/// Sorts the records of the file at `path` in place, holding at most `max_items_in_memory`
/// records in memory.
///
/// The first phase cuts the file into sorted runs of `max_items_in_memory` records that are
/// spilled into temporary files. The second phase merges the runs back into the original file
/// with one page per run and one output page. The sort is stable.
pub fn sort_file(
    path: &Path,
    layout: &RecordLayout,
    max_items_in_memory: usize,
    temp: &TempSpace,
) -> EngineResult<SortOutcome> {
    if max_items_in_memory == 0 {
        return Err(EngineError::configuration(
            "The external sort needs room for at least one record.",
        ));
    }

    let bytes = fs::metadata(path)?.len();
    if bytes % layout.item_len as u64 != 0 {
        return Err(CorruptionError::msg(format!(
            "File {} has {bytes} bytes, which is not a multiple of {}.",
            path.display(),
            layout.item_len
        ))
        .into());
    }
    let records = bytes / layout.item_len as u64;
    if records == 0 {
        return Ok(SortOutcome { records, chunks: 0 });
    }

    let chunks = write_sorted_runs(path, layout, max_items_in_memory, temp)?;
    tracing::debug!(
        "Sorting {} spilled {} runs of at most {max_items_in_memory} records",
        path.display(),
        chunks.len()
    );
    let chunk_count = chunks.len();
    merge_runs(path, layout, max_items_in_memory, chunks)?;

    Ok(SortOutcome {
        records,
        chunks: chunk_count,
    })
}

/// Phase 1: reads the file in buffers of `max_items` records, sorts each buffer and writes it
/// to a new temporary file.
fn write_sorted_runs(
    path: &Path,
    layout: &RecordLayout,
    max_items: usize,
    temp: &TempSpace,
) -> EngineResult<Vec<TempFile>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut chunks = Vec::new();
    let mut buffer = vec![0u8; max_items * layout.item_len];

    loop {
        let mut items = 0;
        while items < max_items {
            let record = &mut buffer[items * layout.item_len..(items + 1) * layout.item_len];
            if !read_record(&mut reader, record)? {
                break;
            }
            items += 1;
        }
        if items == 0 {
            break;
        }

        let mut run = buffer[..items * layout.item_len]
            .chunks_exact(layout.item_len)
            .collect::<Vec<_>>();
        run.sort_by(|lhs, rhs| layout.compare(lhs, rhs));

        let chunk = temp.allocate("sort-run")?;
        let mut writer = BufWriter::new(chunk.append()?);
        for record in run {
            writer.write_all(record)?;
        }
        writer.flush()?;
        chunks.push(chunk);

        if items < max_items {
            break;
        }
    }

    Ok(chunks)
}

/// Phase 2: merges the sorted runs into `path`, overwriting it.
fn merge_runs(
    path: &Path,
    layout: &RecordLayout,
    max_items: usize,
    chunks: Vec<TempFile>,
) -> EngineResult<()> {
    let mut page_size = max_items / (chunks.len() + 1);
    if page_size == 0 {
        tracing::warn!(
            "{} runs do not fit into {max_items} records of memory, using pages of one record",
            chunks.len()
        );
        page_size = 1;
    }
    tracing::debug!("Merging {} runs with pages of {page_size} records", chunks.len());

    let mut cursors = chunks
        .iter()
        .map(|chunk| RunCursor::open(chunk, layout.item_len, page_size))
        .collect::<EngineResult<Vec<_>>>()?;

    let output = OpenOptions::new().write(true).truncate(true).open(path)?;
    let mut output = OutputPage::new(output, layout.item_len, page_size);
    loop {
        let mut min: Option<usize> = None;
        for (i, cursor) in cursors.iter().enumerate() {
            let Some(record) = cursor.current() else {
                continue;
            };
            let is_smaller = match min.and_then(|m| cursors[m].current()) {
                Some(current_min) => layout.compare(record, current_min).is_lt(),
                None => true,
            };
            if is_smaller {
                min = Some(i);
            }
        }

        let Some(min) = min else {
            break;
        };
        if let Some(record) = cursors[min].current() {
            output.push(record)?;
        }
        cursors[min].advance()?;
    }
    output.finish()?;

    drop(cursors);
    for chunk in chunks {
        chunk.delete()?;
    }
    Ok(())
}

/// Reads a sorted run one page at a time.
struct RunCursor {
    reader: BufReader<File>,
    page: Vec<u8>,
    item_len: usize,
    page_size: usize,
    /// Number of records on the current page.
    filled: usize,
    /// Position of the current record on the page. `position == filled` means that the run is
    /// exhausted.
    position: usize,
}

impl RunCursor {
    fn open(chunk: &TempFile, item_len: usize, page_size: usize) -> EngineResult<Self> {
        let mut cursor = Self {
            reader: BufReader::new(chunk.open()?),
            page: vec![0; item_len * page_size],
            item_len,
            page_size,
            filled: 0,
            position: 0,
        };
        cursor.fill_page()?;
        Ok(cursor)
    }

    fn current(&self) -> Option<&[u8]> {
        (self.position < self.filled)
            .then(|| &self.page[self.position * self.item_len..(self.position + 1) * self.item_len])
    }

    fn advance(&mut self) -> EngineResult<()> {
        self.position += 1;
        if self.position == self.filled && self.filled == self.page_size {
            self.fill_page()?;
        }
        Ok(())
    }

    fn fill_page(&mut self) -> EngineResult<()> {
        self.filled = 0;
        self.position = 0;
        while self.filled < self.page_size {
            let record =
                &mut self.page[self.filled * self.item_len..(self.filled + 1) * self.item_len];
            if !read_record(&mut self.reader, record)? {
                break;
            }
            self.filled += 1;
        }
        Ok(())
    }
}

/// Collects merged records and writes them whenever the page is full.
struct OutputPage<W: Write> {
    writer: W,
    page: Vec<u8>,
    capacity: usize,
}

impl<W: Write> OutputPage<W> {
    fn new(writer: W, item_len: usize, page_size: usize) -> Self {
        Self {
            writer,
            page: Vec::with_capacity(item_len * page_size),
            capacity: item_len * page_size,
        }
    }

    fn push(&mut self, record: &[u8]) -> EngineResult<()> {
        self.page.extend_from_slice(record);
        if self.page.len() >= self.capacity {
            self.writer.write_all(&self.page)?;
            self.page.clear();
        }
        Ok(())
    }

    fn finish(mut self) -> EngineResult<()> {
        if !self.page.is_empty() {
            self.writer.write_all(&self.page)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
