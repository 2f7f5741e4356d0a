use crate::operator::{drain, exhausted, key_of, BoxedOperator, PhysicalOperator};
use rdf_bucket_common::{EngineError, EngineResult, MetricEvent, MetricsSink};
use rdf_bucket_encoding::{decode_tuple, encode_tuple, read_record, tuple_len};
use rdf_bucket_model::{BindingSet, Variable};
use rdf_bucket_storage::{sort_file, RecordLayout, TempFile, TempSpace};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::sync::Arc;

/// Sorts its input by an external merge sort.
///
/// The input is drained on construction. Only the values of the sort variables are written to
/// the temporary file, so the results bind exactly the variables of the sort order.
#[derive(Debug)]
pub struct SortOperator {
    sort_order: Vec<Variable>,
    reader: Option<SortedTuples>,
    current: Option<BindingSet>,
    metrics: Arc<dyn MetricsSink>,
}

#[derive(Debug)]
struct SortedTuples {
    reader: BufReader<File>,
    buffer: Vec<u8>,
    _file: TempFile,
}

impl SortOperator {
    /// Sorts `input` holding at most `max_records_in_memory` tuples in memory.
    pub fn try_new(
        mut input: BoxedOperator,
        sort_order: Vec<Variable>,
        max_records_in_memory: usize,
        temp: &TempSpace,
        metrics: Arc<dyn MetricsSink>,
    ) -> EngineResult<Self> {
        if sort_order.is_empty() {
            return Err(EngineError::configuration(
                "A sort needs at least one variable.",
            ));
        }
        let layout = RecordLayout::try_new(
            tuple_len(sort_order.len()),
            (0..sort_order.len()).collect(),
        )?;

        let file = temp.allocate("sort")?;
        let mut writer = BufWriter::new(file.truncate()?);
        let mut buffer = Vec::with_capacity(layout.item_len());
        let mut records = 0u64;
        drain(input.as_mut(), |bindings| {
            buffer.clear();
            encode_tuple(&key_of(&bindings, &sort_order)?, &mut buffer);
            writer.write_all(&buffer)?;
            records += 1;
            Ok(())
        })?;
        writer.flush()?;
        drop(writer);
        input.dispose();

        let outcome = sort_file(file.path(), &layout, max_records_in_memory, temp)?;
        if outcome.chunks > 0 {
            metrics.record("sort", MetricEvent::RecordsSpilled(records));
        }
        let columns = sort_order.iter().map(ToString::to_string).collect::<Vec<_>>();
        tracing::trace!(
            "Sorted {records} records by [{}] in {} runs",
            columns.join(", "),
            outcome.chunks
        );

        let mut sort = Self {
            reader: Some(SortedTuples {
                reader: BufReader::new(file.open()?),
                buffer: vec![0; layout.item_len()],
                _file: file,
            }),
            sort_order,
            current: None,
            metrics,
        };
        sort.current = sort.advance()?;
        Ok(sort)
    }

    fn advance(&mut self) -> EngineResult<Option<BindingSet>> {
        let Some(tuples) = self.reader.as_mut() else {
            return Ok(None);
        };
        if !read_record(&mut tuples.reader, &mut tuples.buffer)? {
            self.reader = None;
            return Ok(None);
        }
        let atoms = decode_tuple(&tuples.buffer, self.sort_order.len())?;
        Ok(Some(self.sort_order.iter().copied().zip(atoms).collect()))
    }
}

impl PhysicalOperator for SortOperator {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn peek(&self) -> Option<&BindingSet> {
        self.current.as_ref()
    }

    fn next(&mut self) -> EngineResult<BindingSet> {
        let result = self.current.take().ok_or_else(exhausted)?;
        self.current = self.advance()?;
        self.metrics.record(self.name(), MetricEvent::ResultProduced);
        Ok(result)
    }

    fn sort_order(&self) -> &[Variable] {
        &self.sort_order
    }

    fn dispose(&mut self) {
        self.current = None;
        if self.reader.take().is_some() {
            tracing::trace!("Disposing sort by {} variables", self.sort_order.len());
        }
    }
}
