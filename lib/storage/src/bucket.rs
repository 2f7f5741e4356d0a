use rdf_bucket_common::{CorruptionError, EngineError, EngineResult};
use rdf_bucket_encoding::{
    decode_mini_triple, decode_triple, encode_mini_triple, encode_triple, read_record,
    MINI_TRIPLE_RECORD_LEN, TRIPLE_RECORD_LEN,
};
use rdf_bucket_model::{Atom, BucketOrder, EncodedTriple};
use std::fmt::{Display, Formatter};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// The record format of a bucket file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketFormat {
    /// 24-byte records holding all three positions.
    Full,
    /// 16-byte records that omit the primary position of the bucket order.
    Mini,
}

impl BucketFormat {
    pub fn record_len(self) -> usize {
        match self {
            BucketFormat::Full => TRIPLE_RECORD_LEN,
            BucketFormat::Mini => MINI_TRIPLE_RECORD_LEN,
        }
    }
}

impl Display for BucketFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BucketFormat::Full => f.write_str("full"),
            BucketFormat::Mini => f.write_str("mini"),
        }
    }
}

/// A file of fixed-size triple records that, once sorted, is ordered by its [BucketOrder].
///
/// Records are always stored in S,P,O position order; the bucket order only defines the sort
/// order of the records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    path: PathBuf,
    order: BucketOrder,
    format: BucketFormat,
}

impl Bucket {
    /// Creates an empty bucket file at `path`, truncating an existing one.
    pub fn create(path: impl Into<PathBuf>, order: BucketOrder) -> EngineResult<Self> {
        let path = path.into();
        File::create(&path)?;
        Ok(Self {
            path,
            order,
            format: BucketFormat::Full,
        })
    }

    /// Opens an existing bucket file and validates its length.
    pub fn open(
        path: impl Into<PathBuf>,
        order: BucketOrder,
        format: BucketFormat,
    ) -> EngineResult<Self> {
        let bucket = Self {
            path: path.into(),
            order,
            format,
        };
        bucket.len()?;
        Ok(bucket)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn order(&self) -> BucketOrder {
        self.order
    }

    pub fn format(&self) -> BucketFormat {
        self.format
    }

    pub fn record_len(&self) -> usize {
        self.format.record_len()
    }

    /// Returns the number of records in the bucket.
    ///
    /// A file whose length is not a multiple of the record size is corrupt.
    pub fn len(&self) -> EngineResult<u64> {
        let bytes = fs::metadata(&self.path)?.len();
        let record_len = self.record_len() as u64;
        if bytes % record_len != 0 {
            return Err(CorruptionError::msg(format!(
                "Bucket {} has {bytes} bytes, which is not a multiple of {record_len}.",
                self.path.display()
            ))
            .into());
        }
        Ok(bytes / record_len)
    }

    pub fn is_empty(&self) -> EngineResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Opens a writer that appends records to the bucket.
    pub fn writer(&self) -> EngineResult<BucketWriter> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        Ok(BucketWriter {
            writer: BufWriter::new(file),
            order: self.order,
            format: self.format,
            written: 0,
        })
    }

    /// Reads all records of the bucket.
    ///
    /// Mini buckets can only be read within the range of a single primary atom (see
    /// [Self::range_cursor]).
    pub fn cursor(&self) -> EngineResult<TripleCursor> {
        if self.format == BucketFormat::Mini {
            return Err(EngineError::InvalidOperation(
                "Mini buckets can only be scanned within the range of a primary atom.",
            ));
        }
        let len = self.len()?;
        self.open_cursor(0, len, None)
    }

    /// Reads the records `[start, start + count)`, all of which share `primary` in the primary
    /// position of the bucket order.
    pub fn range_cursor(
        &self,
        start: u64,
        count: u64,
        primary: Atom,
    ) -> EngineResult<TripleCursor> {
        let len = self.len()?;
        if start.saturating_add(count) > len {
            return Err(CorruptionError::msg(format!(
                "Range [{start}, {}) exceeds bucket {} with {len} records.",
                start.saturating_add(count),
                self.path.display()
            ))
            .into());
        }
        self.open_cursor(start, count, Some(primary))
    }

    fn open_cursor(
        &self,
        start: u64,
        count: u64,
        primary: Option<Atom>,
    ) -> EngineResult<TripleCursor> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(start * self.record_len() as u64))?;
        Ok(TripleCursor {
            reader: BufReader::new(file),
            remaining: count,
            order: self.order,
            format: self.format,
            primary,
            buffer: vec![0; self.record_len()],
        })
    }

    /// Writes the 16-byte form of this sorted full bucket to `path`.
    pub fn compact_to_mini(&self, path: impl Into<PathBuf>) -> EngineResult<Bucket> {
        if self.format == BucketFormat::Mini {
            return Err(EngineError::InvalidOperation(
                "The bucket is already a mini bucket.",
            ));
        }

        let mini = Bucket {
            path: path.into(),
            order: self.order,
            format: BucketFormat::Mini,
        };
        File::create(&mini.path)?;
        let mut writer = mini.writer()?;
        for triple in self.cursor()? {
            writer.append(&triple?)?;
        }
        let written = writer.finish()?;
        tracing::debug!(
            "Compacted bucket {} into mini bucket with {written} records",
            self.order
        );
        Ok(mini)
    }
}

/// Appends triples to a bucket. Call [BucketWriter::finish] to flush the buffered records.
#[derive(Debug)]
pub struct BucketWriter {
    writer: BufWriter<File>,
    order: BucketOrder,
    format: BucketFormat,
    written: u64,
}

impl BucketWriter {
    pub fn append(&mut self, triple: &EncodedTriple) -> EngineResult<()> {
        match self.format {
            BucketFormat::Full => self.writer.write_all(&encode_triple(triple))?,
            BucketFormat::Mini => self
                .writer
                .write_all(&encode_mini_triple(triple, self.order.primary()))?,
        }
        self.written += 1;
        Ok(())
    }

    /// Flushes the writer and returns the number of appended records.
    pub fn finish(mut self) -> EngineResult<u64> {
        self.writer.flush()?;
        Ok(self.written)
    }
}

/// Iterates over a range of records of a bucket.
#[derive(Debug)]
pub struct TripleCursor {
    reader: BufReader<File>,
    remaining: u64,
    order: BucketOrder,
    format: BucketFormat,
    primary: Option<Atom>,
    buffer: Vec<u8>,
}

impl TripleCursor {
    /// The number of records that have not been read yet.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    fn read_next(&mut self) -> EngineResult<EncodedTriple> {
        if !read_record(&mut self.reader, &mut self.buffer)? {
            return Err(CorruptionError::msg("Bucket ended before the end of the range.").into());
        }
        match (self.format, self.primary) {
            (BucketFormat::Full, _) => decode_triple(&self.buffer),
            (BucketFormat::Mini, Some(primary)) => {
                decode_mini_triple(&self.buffer, self.order.primary(), primary)
            }
            (BucketFormat::Mini, None) => Err(EngineError::InvalidOperation(
                "Mini buckets can only be scanned within the range of a primary atom.",
            )),
        }
    }
}

impl Iterator for TripleCursor {
    type Item = EngineResult<EncodedTriple>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let result = self.read_next();
        if result.is_err() {
            self.remaining = 0;
        }
        Some(result)
    }
}
