//! Well-Known Binary encoding for points.

/// Little-endian byte order marker.
const LITTLE_ENDIAN: u8 = 1;

/// WKB geometry type code for a 2-D point.
const WKB_POINT: u32 = 1;

/// Encoded size of a 2-D point.
pub const POINT_LEN: usize = 21;

/// Encode `(x, y)` as a little-endian WKB point.
pub fn encode_point(x: f64, y: f64) -> [u8; POINT_LEN] {
    let mut buf = [0u8; POINT_LEN];
    buf[0] = LITTLE_ENDIAN;
    buf[1..5].copy_from_slice(&WKB_POINT.to_le_bytes());
    buf[5..13].copy_from_slice(&x.to_le_bytes());
    buf[13..21].copy_from_slice(&y.to_le_bytes());
    buf
}

/// Decode a little-endian WKB point; `None` for anything else.
pub fn decode_point(bytes: &[u8]) -> Option<(f64, f64)> {
    if bytes.len() != POINT_LEN || bytes[0] != LITTLE_ENDIAN {
        return None;
    }
    let kind = u32::from_le_bytes(bytes[1..5].try_into().ok()?);
    if kind != WKB_POINT {
        return None;
    }
    let x = f64::from_le_bytes(bytes[5..13].try_into().ok()?);
    let y = f64::from_le_bytes(bytes[13..21].try_into().ok()?);
    Some((x, y))
}
