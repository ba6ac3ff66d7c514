//! GeoParquet writer.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryArray, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array,
    Int8Array, StringArray, UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use granule_reader::ColumnData;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use pipeline::PointTable;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{OutputError, OutputResult};
use crate::wkb;

pub const GEOMETRY_COLUMN: &str = "geometry";
pub const GROUP_COLUMN: &str = "group";
const GEO_METADATA_KEY: &str = "geo";
const GEOPARQUET_VERSION: &str = "1.0.0";

/// The `geo` file metadata defined by GeoParquet 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoMetadata {
    pub version: String,
    pub primary_column: String,
    pub columns: BTreeMap<String, GeoColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoColumn {
    pub encoding: String,
    pub geometry_types: Vec<String>,
    /// [min_x, min_y, max_x, max_y]; omitted for an empty table
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bbox: Option<[f64; 4]>,
}

impl GeoMetadata {
    /// Metadata for a point geometry column. No `crs` key: GeoParquet then
    /// means OGC:CRS84 (lon/lat degrees).
    fn for_points(table: &PointTable) -> Self {
        let mut columns = BTreeMap::new();
        columns.insert(
            GEOMETRY_COLUMN.to_string(),
            GeoColumn {
                encoding: "WKB".to_string(),
                geometry_types: vec!["Point".to_string()],
                bbox: extent(table),
            },
        );
        Self {
            version: GEOPARQUET_VERSION.to_string(),
            primary_column: GEOMETRY_COLUMN.to_string(),
            columns,
        }
    }
}

/// What was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteStats {
    pub rows: usize,
    pub columns: usize,
    pub bytes: u64,
}

/// Build an Arrow batch: variable columns, then `group`, then `geometry`.
pub fn to_record_batch(table: &PointTable) -> OutputResult<RecordBatch> {
    let mut fields = Vec::with_capacity(table.columns().len() + 2);
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns().len() + 2);

    for column in table.columns() {
        if column.name == GEOMETRY_COLUMN || column.name == GROUP_COLUMN {
            return Err(OutputError::ReservedColumn(column.name.clone()));
        }
        let (dtype, array) = column_array(&column.data);
        fields.push(Field::new(&column.name, dtype, false));
        arrays.push(array);
    }

    fields.push(Field::new(GROUP_COLUMN, DataType::Utf8, false));
    arrays.push(Arc::new(StringArray::from_iter_values(table.groups())));

    fields.push(Field::new(GEOMETRY_COLUMN, DataType::Binary, false));
    let encoded: Vec<[u8; wkb::POINT_LEN]> = table
        .geometry()
        .iter()
        .map(|p| wkb::encode_point(p.lon, p.lat))
        .collect();
    arrays.push(Arc::new(BinaryArray::from_iter_values(encoded.iter())));

    let geo = serde_json::to_string(&GeoMetadata::for_points(table))?;
    let metadata = HashMap::from([(GEO_METADATA_KEY.to_string(), geo)]);
    let schema = Schema::new_with_metadata(fields, metadata);

    Ok(RecordBatch::try_new(Arc::new(schema), arrays)?)
}

/// Write `table` to `path` as a single-row-group GeoParquet file.
#[instrument(skip(table), fields(rows = table.len()))]
pub fn write_geoparquet(table: &PointTable, path: &Path) -> OutputResult<WriteStats> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let batch = to_record_batch(table)?;
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    // Readers look for `geo` in the Parquet footer, not the embedded Arrow schema.
    if let Some(geo) = batch.schema().metadata().get(GEO_METADATA_KEY) {
        writer.append_key_value_metadata(KeyValue::new(GEO_METADATA_KEY.to_string(), geo.clone()));
    }
    writer.close()?;

    let bytes = std::fs::metadata(path)?.len();
    info!(
        path = %path.display(),
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        bytes = bytes,
        "Wrote GeoParquet"
    );

    Ok(WriteStats {
        rows: batch.num_rows(),
        columns: batch.num_columns(),
        bytes,
    })
}

fn column_array(data: &ColumnData) -> (DataType, ArrayRef) {
    match data {
        ColumnData::I8(v) => (DataType::Int8, Arc::new(Int8Array::from(v.clone()))),
        ColumnData::I16(v) => (DataType::Int16, Arc::new(Int16Array::from(v.clone()))),
        ColumnData::I32(v) => (DataType::Int32, Arc::new(Int32Array::from(v.clone()))),
        ColumnData::I64(v) => (DataType::Int64, Arc::new(Int64Array::from(v.clone()))),
        ColumnData::U8(v) => (DataType::UInt8, Arc::new(UInt8Array::from(v.clone()))),
        ColumnData::U16(v) => (DataType::UInt16, Arc::new(UInt16Array::from(v.clone()))),
        ColumnData::U32(v) => (DataType::UInt32, Arc::new(UInt32Array::from(v.clone()))),
        ColumnData::U64(v) => (DataType::UInt64, Arc::new(UInt64Array::from(v.clone()))),
        ColumnData::F32(v) => (DataType::Float32, Arc::new(Float32Array::from(v.clone()))),
        ColumnData::F64(v) => (DataType::Float64, Arc::new(Float64Array::from(v.clone()))),
    }
}

/// Bounding box of finite points, if any.
fn extent(table: &PointTable) -> Option<[f64; 4]> {
    table
        .geometry()
        .iter()
        .filter(|p| p.lon.is_finite() && p.lat.is_finite())
        .fold(None, |acc: Option<[f64; 4]>, p| {
            Some(match acc {
                None => [p.lon, p.lat, p.lon, p.lat],
                Some([x0, y0, x1, y1]) => [
                    x0.min(p.lon),
                    y0.min(p.lat),
                    x1.max(p.lon),
                    y1.max(p.lat),
                ],
            })
        })
}
