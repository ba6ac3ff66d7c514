//! Native HDF5 / NetCDF-4 reading using the netcdf library.
//!
//! # Opening
//!
//! libnetcdf opens either a path or a URL. [`NetCdfGranule::open_url`] uses
//! its byte-range mode (`#mode=bytes`), where HDF5 issues HTTP range requests
//! for the superblock, object headers and the chunks of the variables that
//! are actually read; nothing else is transferred.
//!
//! # Staging
//!
//! [`NetCdfGranule::from_reader`] is the fallback for builds of libnetcdf
//! without byte-range support: the whole `Read` source is copied into a
//! temporary file, removed again when the [`NetCdfGranule`] is dropped. On
//! Linux the copy goes to `/dev/shm` (memory-backed tmpfs) when writable.
//!
//! libnetcdf is not thread-safe; the `netcdf` crate serializes calls behind a
//! global lock, so concurrent workers overlap their staging I/O but not their
//! decoding.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Once, OnceLock};

use netcdf::types::{FloatType, IntType, NcVariableType};
use tracing::debug;

use crate::column::ColumnData;
use crate::error::{ReaderError, ReaderResult};
use crate::source::HierarchicalSource;

/// Turn off HDF5's automatic error stack printing.
///
/// Probing for an absent group or variable is an ordinary schema failure
/// here, but libhdf5 would still dump its error stack to stderr for each one.
/// Idempotent; runs once per process.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// An opened HDF5 / NetCDF-4 granule.
pub struct NetCdfGranule {
    // Declared before `_staged` so the handle closes before the file is removed.
    file: netcdf::File,
    name: String,
    _staged: Option<StagedFile>,
}

impl NetCdfGranule {
    /// Open a granule that already lives on the local filesystem.
    pub fn open<P: AsRef<Path>>(path: P) -> ReaderResult<Self> {
        silence_hdf5_errors();

        let path = path.as_ref();
        let file = netcdf::open(path).map_err(|e| {
            ReaderError::Format(format!("Failed to open {}: {}", path.display(), e))
        })?;

        Ok(Self {
            file,
            name: path.display().to_string(),
            _staged: None,
        })
    }

    /// Open a granule served over HTTP byte ranges.
    ///
    /// The server must answer `HEAD` with the object size and honour `Range`.
    /// `name` is only used for diagnostics.
    pub fn open_url(url: &str, name: &str) -> ReaderResult<Self> {
        silence_hdf5_errors();

        let location = format!("{}#mode=bytes", url);
        let file = netcdf::open(&location)
            .map_err(|e| ReaderError::Format(format!("Failed to open {}: {}", name, e)))?;
        debug!(name = %name, url = %url, "Opened granule over byte ranges");

        Ok(Self {
            file,
            name: name.to_string(),
            _staged: None,
        })
    }

    /// Stage `reader` into a temporary file and open it.
    ///
    /// `name` is only used for diagnostics.
    pub fn from_reader<R: Read>(reader: &mut R, name: &str) -> ReaderResult<Self> {
        silence_hdf5_errors();

        let staged = StagedFile::from_reader(reader)?;
        debug!(
            name = %name,
            path = %staged.path.display(),
            size = staged.size,
            "Staged granule"
        );

        let file = netcdf::open(&staged.path)
            .map_err(|e| ReaderError::Format(format!("Failed to open {}: {}", name, e)))?;

        Ok(Self {
            file,
            name: name.to_string(),
            _staged: Some(staged),
        })
    }

    fn has_group(&self, group: &str) -> bool {
        matches!(self.file.group(group), Ok(Some(_)))
    }
}

impl HierarchicalSource for NetCdfGranule {
    fn read_array(&self, group: &str, path: &str) -> ReaderResult<ColumnData> {
        let full_path = format!("{}/{}", group, path);

        let Some(var) = self.file.variable(&full_path) else {
            return Err(if self.has_group(group) {
                ReaderError::VariableNotFound {
                    group: group.to_string(),
                    path: path.to_string(),
                }
            } else {
                ReaderError::GroupNotFound(group.to_string())
            });
        };

        read_variable(&var, &full_path)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Read every element of `var` in its stored type.
fn read_variable(var: &netcdf::Variable, path: &str) -> ReaderResult<ColumnData> {
    let decode =
        |e: netcdf::Error| ReaderError::Format(format!("Failed to read {}: {}", path, e));

    let column = match var.vartype() {
        NcVariableType::Int(IntType::I8) => {
            let values: Vec<i8> = var.get_values(..).map_err(decode)?;
            ColumnData::I8(values)
        }
        NcVariableType::Int(IntType::I16) => {
            let values: Vec<i16> = var.get_values(..).map_err(decode)?;
            ColumnData::I16(values)
        }
        NcVariableType::Int(IntType::I32) => {
            let values: Vec<i32> = var.get_values(..).map_err(decode)?;
            ColumnData::I32(values)
        }
        NcVariableType::Int(IntType::I64) => {
            let values: Vec<i64> = var.get_values(..).map_err(decode)?;
            ColumnData::I64(values)
        }
        NcVariableType::Int(IntType::U8) => {
            let values: Vec<u8> = var.get_values(..).map_err(decode)?;
            ColumnData::U8(values)
        }
        NcVariableType::Int(IntType::U16) => {
            let values: Vec<u16> = var.get_values(..).map_err(decode)?;
            ColumnData::U16(values)
        }
        NcVariableType::Int(IntType::U32) => {
            let values: Vec<u32> = var.get_values(..).map_err(decode)?;
            ColumnData::U32(values)
        }
        NcVariableType::Int(IntType::U64) => {
            let values: Vec<u64> = var.get_values(..).map_err(decode)?;
            ColumnData::U64(values)
        }
        NcVariableType::Float(FloatType::F32) => {
            let values: Vec<f32> = var.get_values(..).map_err(decode)?;
            ColumnData::F32(values)
        }
        NcVariableType::Float(FloatType::F64) => {
            let values: Vec<f64> = var.get_values(..).map_err(decode)?;
            ColumnData::F64(values)
        }
        other => {
            return Err(ReaderError::UnsupportedType {
                path: path.to_string(),
                dtype: format!("{:?}", other),
            })
        }
    };

    Ok(column)
}

// =============================================================================
// Staging
// =============================================================================

/// A temporary copy of a granule, deleted on drop.
struct StagedFile {
    path: PathBuf,
    size: u64,
}

impl StagedFile {
    fn from_reader<R: Read>(reader: &mut R) -> ReaderResult<Self> {
        let path = staging_dir().join(staging_name());
        let mut file = std::fs::File::create(&path)?;
        // From here on the guard owns the path, so failures still clean up.
        let mut staged = StagedFile { path, size: 0 };

        staged.size = std::io::copy(reader, &mut file)?;
        file.flush()?;

        Ok(staged)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Directory for staged granules: `/dev/shm` when it accepts writes,
/// otherwise the system temp directory. Probed once per process.
fn staging_dir() -> &'static Path {
    static DIR: OnceLock<PathBuf> = OnceLock::new();

    DIR.get_or_init(|| {
        #[cfg(target_os = "linux")]
        {
            let shm = Path::new("/dev/shm");
            let probe = shm.join(format!(".granule_probe_{}", std::process::id()));
            if shm.is_dir() && std::fs::write(&probe, b"").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return shm.to_path_buf();
            }
        }
        std::env::temp_dir()
    })
}

/// `granule_<pid>_<seq>.h5`, unique within the process.
fn staging_name() -> String {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    format!(
        "granule_{}_{}.h5",
        std::process::id(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    )
}
