//! Typed in-memory arrays read from a granule.

use std::fmt;

/// Element type of a numeric array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::I8 => "int8",
            DataType::I16 => "int16",
            DataType::I32 => "int32",
            DataType::I64 => "int64",
            DataType::U8 => "uint8",
            DataType::U16 => "uint16",
            DataType::U32 => "uint32",
            DataType::U64 => "uint64",
            DataType::F32 => "float32",
            DataType::F64 => "float64",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            DataType::I8 | DataType::I16 | DataType::I32 | DataType::I64
        ) || self.is_float()
    }

    pub fn bits(&self) -> u32 {
        match self {
            DataType::I8 | DataType::U8 => 8,
            DataType::I16 | DataType::U16 => 16,
            DataType::I32 | DataType::U32 | DataType::F32 => 32,
            DataType::I64 | DataType::U64 | DataType::F64 => 64,
        }
    }

    /// Smallest type both `self` and `other` convert to without loss, or
    /// float64 when no integer type holds both.
    ///
    /// Symmetric, so merging columns in any order ends on the same type.
    pub fn common(self, other: DataType) -> DataType {
        if self == other {
            return self;
        }
        match (self.is_float(), other.is_float()) {
            (true, true) => DataType::F64,
            (true, false) => float_holding(self, other),
            (false, true) => float_holding(other, self),
            (false, false) if self.is_signed() == other.is_signed() => {
                if self.bits() >= other.bits() {
                    self
                } else {
                    other
                }
            }
            (false, false) => {
                let (signed, unsigned) = if self.is_signed() {
                    (self, other)
                } else {
                    (other, self)
                };
                if signed.bits() > unsigned.bits() {
                    signed
                } else {
                    match unsigned.bits() {
                        8 => DataType::I16,
                        16 => DataType::I32,
                        32 => DataType::I64,
                        _ => DataType::F64,
                    }
                }
            }
        }
    }
}

/// float32 holds integers up to 16 bits exactly; anything wider needs float64.
fn float_holding(float: DataType, int: DataType) -> DataType {
    if float == DataType::F32 && int.bits() <= 16 {
        DataType::F32
    } else {
        DataType::F64
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A flat numeric array in its original element type.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Apply `$body` to the inner vector of every variant, rebuilding the same variant.
macro_rules! map_same_variant {
    ($value:expr, $v:ident => $body:expr) => {
        match $value {
            ColumnData::I8($v) => ColumnData::I8($body),
            ColumnData::I16($v) => ColumnData::I16($body),
            ColumnData::I32($v) => ColumnData::I32($body),
            ColumnData::I64($v) => ColumnData::I64($body),
            ColumnData::U8($v) => ColumnData::U8($body),
            ColumnData::U16($v) => ColumnData::U16($body),
            ColumnData::U32($v) => ColumnData::U32($body),
            ColumnData::U64($v) => ColumnData::U64($body),
            ColumnData::F32($v) => ColumnData::F32($body),
            ColumnData::F64($v) => ColumnData::F64($body),
        }
    };
}

/// Evaluate `$body` with the inner vector of any variant bound to `$v`.
macro_rules! with_inner {
    ($value:expr, $v:ident => $body:expr) => {
        match $value {
            ColumnData::I8($v) => $body,
            ColumnData::I16($v) => $body,
            ColumnData::I32($v) => $body,
            ColumnData::I64($v) => $body,
            ColumnData::U8($v) => $body,
            ColumnData::U16($v) => $body,
            ColumnData::U32($v) => $body,
            ColumnData::U64($v) => $body,
            ColumnData::F32($v) => $body,
            ColumnData::F64($v) => $body,
        }
    };
}

impl ColumnData {
    pub fn dtype(&self) -> DataType {
        match self {
            ColumnData::I8(_) => DataType::I8,
            ColumnData::I16(_) => DataType::I16,
            ColumnData::I32(_) => DataType::I32,
            ColumnData::I64(_) => DataType::I64,
            ColumnData::U8(_) => DataType::U8,
            ColumnData::U16(_) => DataType::U16,
            ColumnData::U32(_) => DataType::U32,
            ColumnData::U64(_) => DataType::U64,
            ColumnData::F32(_) => DataType::F32,
            ColumnData::F64(_) => DataType::F64,
        }
    }

    pub fn len(&self) -> usize {
        with_inner!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whole array widened to f64.
    ///
    /// 64-bit integers above 2^53 lose precision; only used for coordinates.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_inner!(self, v => v.iter().map(|&x| x as f64).collect())
    }

    /// New array holding the elements at `indices`, in that order.
    ///
    /// Panics if an index is out of bounds.
    pub fn take(&self, indices: &[usize]) -> Self {
        map_same_variant!(self, v => indices.iter().map(|&i| v[i]).collect())
    }

    /// Append `other` to this array.
    ///
    /// Fails without modifying `self` when the element types differ.
    pub fn append(&mut self, other: ColumnData) -> Result<(), (DataType, DataType)> {
        match (self, other) {
            (ColumnData::I8(a), ColumnData::I8(b)) => a.extend(b),
            (ColumnData::I16(a), ColumnData::I16(b)) => a.extend(b),
            (ColumnData::I32(a), ColumnData::I32(b)) => a.extend(b),
            (ColumnData::I64(a), ColumnData::I64(b)) => a.extend(b),
            (ColumnData::U8(a), ColumnData::U8(b)) => a.extend(b),
            (ColumnData::U16(a), ColumnData::U16(b)) => a.extend(b),
            (ColumnData::U32(a), ColumnData::U32(b)) => a.extend(b),
            (ColumnData::U64(a), ColumnData::U64(b)) => a.extend(b),
            (ColumnData::F32(a), ColumnData::F32(b)) => a.extend(b),
            (ColumnData::F64(a), ColumnData::F64(b)) => a.extend(b),
            (a, b) => return Err((a.dtype(), b.dtype())),
        }
        Ok(())
    }

    /// Convert to `dtype` with `as` casts.
    ///
    /// Lossless when `dtype` comes from [`DataType::common`] with this
    /// array's type.
    pub fn cast(self, dtype: DataType) -> ColumnData {
        if self.dtype() == dtype {
            return self;
        }
        with_inner!(self, v => match dtype {
            DataType::I8 => ColumnData::I8(v.into_iter().map(|x| x as i8).collect()),
            DataType::I16 => ColumnData::I16(v.into_iter().map(|x| x as i16).collect()),
            DataType::I32 => ColumnData::I32(v.into_iter().map(|x| x as i32).collect()),
            DataType::I64 => ColumnData::I64(v.into_iter().map(|x| x as i64).collect()),
            DataType::U8 => ColumnData::U8(v.into_iter().map(|x| x as u8).collect()),
            DataType::U16 => ColumnData::U16(v.into_iter().map(|x| x as u16).collect()),
            DataType::U32 => ColumnData::U32(v.into_iter().map(|x| x as u32).collect()),
            DataType::U64 => ColumnData::U64(v.into_iter().map(|x| x as u64).collect()),
            DataType::F32 => ColumnData::F32(v.into_iter().map(|x| x as f32).collect()),
            DataType::F64 => ColumnData::F64(v.into_iter().map(|x| x as f64).collect()),
        })
    }

    /// Render the value at `index` for display and row comparisons.
    pub fn format_value(&self, index: usize) -> Option<String> {
        with_inner!(self, v => v.get(index).map(|x| x.to_string()))
    }
}

macro_rules! impl_from_vec {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<Vec<$t>> for ColumnData {
                fn from(v: Vec<$t>) -> Self {
                    ColumnData::$variant(v)
                }
            }
        )+
    };
}

impl_from_vec!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_preserves_dtype() {
        let col = ColumnData::from(vec![10i16, 20, 30, 40]);
        let taken = col.take(&[3, 1]);
        assert_eq!(taken, ColumnData::I16(vec![40, 20]));
        assert_eq!(taken.dtype(), DataType::I16);
    }

    #[test]
    fn test_append_same_type() {
        let mut a = ColumnData::from(vec![1.0f32, 2.0]);
        a.append(ColumnData::from(vec![3.0f32])).unwrap();
        assert_eq!(a, ColumnData::F32(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_append_type_mismatch() {
        let mut a = ColumnData::from(vec![1.0f32]);
        let err = a.append(ColumnData::from(vec![1.0f64])).unwrap_err();
        assert_eq!(err, (DataType::F32, DataType::F64));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_widen() {
        let col = ColumnData::from(vec![-3i8, 4]);
        assert_eq!(col.to_f64_vec(), vec![-3.0, 4.0]);
    }

    #[test]
    fn test_common_type() {
        use DataType::*;
        assert_eq!(F32.common(F64), F64);
        assert_eq!(I8.common(I32), I32);
        assert_eq!(U16.common(U8), U16);
        assert_eq!(I8.common(U8), I16);
        assert_eq!(I64.common(U32), I64);
        assert_eq!(I64.common(U64), F64);
        assert_eq!(F32.common(I16), F32);
        assert_eq!(F32.common(I32), F64);
        assert_eq!(U32.common(F64), F64);
        assert_eq!(I16.common(I16), I16);
    }

    #[test]
    fn test_common_type_is_symmetric() {
        use DataType::*;
        let all = [I8, I16, I32, I64, U8, U16, U32, U64, F32, F64];
        for a in all {
            for b in all {
                assert_eq!(a.common(b), b.common(a), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_cast_widens_values() {
        let col = ColumnData::from(vec![1.5f32, -2.25]).cast(DataType::F64);
        assert_eq!(col, ColumnData::F64(vec![1.5, -2.25]));

        let col = ColumnData::from(vec![200u8, 7]).cast(DataType::I16);
        assert_eq!(col, ColumnData::I16(vec![200, 7]));
    }
}
