//! Parquet encoding/decoding for silver datasets.
//!
//! Rows are serialized into Arrow record batches through the Arrow JSON
//! decoder, so any `Serialize` row whose field names match the schema can be
//! written. Reading goes the other way through line-delimited JSON.

use std::io::Cursor;

use arrow::datatypes::SchemaRef;
use arrow::json::{LineDelimitedWriter, ReaderBuilder};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::TabularError;

/// Rows per record batch / row group
const BATCH_ROWS: usize = 8192;

fn writer_properties() -> WriterProperties {
    let created_by = KeyValue {
        key: "created_by".to_string(),
        value: Some("olist-dw".to_string()),
    };
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_key_value_metadata(Some(vec![created_by]))
        .build()
}

/// Encode rows as a Parquet file
///
/// Output is deterministic: identical rows produce identical bytes.
pub fn encode_parquet<T: Serialize>(schema: SchemaRef, rows: &[T]) -> Result<Vec<u8>, TabularError> {
    let mut cursor = Cursor::new(Vec::<u8>::new());
    let mut writer = ArrowWriter::try_new(&mut cursor, schema.clone(), Some(writer_properties()))?;

    for chunk in rows.chunks(BATCH_ROWS) {
        let mut decoder = ReaderBuilder::new(schema.clone())
            .with_batch_size(chunk.len())
            .build_decoder()?;
        decoder.serialize(chunk)?;
        if let Some(batch) = decoder.flush()? {
            writer.write(&batch)?;
        }
    }

    writer.close()?;
    Ok(cursor.into_inner())
}

/// Decode a Parquet file into rows
pub fn decode_parquet<T: DeserializeOwned>(bytes: Vec<u8>) -> Result<Vec<T>, TabularError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes))?
        .with_batch_size(BATCH_ROWS)
        .build()?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch: RecordBatch = batch?;
        if batch.num_rows() == 0 {
            continue;
        }

        let mut buffer = Vec::new();
        let mut writer = LineDelimitedWriter::new(&mut buffer);
        writer.write_batches(&[&batch])?;
        writer.finish()?;
        drop(writer);

        for line in buffer.split(|b| *b == b'\n') {
            if line.is_empty() {
                continue;
            }
            rows.push(serde_json::from_slice(line)?);
        }
    }

    Ok(rows)
}
