//! Little-endian primitive encode/decode shared by the record stream and
//! the grid header.
//!
//! All integers are little-endian. Field lists are length-prefixed with a
//! `u16` count. No compression, no padding.

use std::io::{Read, Write};

use hcmesh_core::{Real, RealFormat};

use crate::error::PoolError;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), PoolError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u16.
pub fn write_u16_le(w: &mut dyn Write, v: u16) -> Result<(), PoolError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), PoolError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), PoolError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a real in the requested width.
pub fn write_real(w: &mut dyn Write, format: RealFormat, v: Real) -> Result<(), PoolError> {
    match format {
        RealFormat::F32 => w.write_all(&(v as f32).to_le_bytes())?,
        RealFormat::F64 => w.write_all(&v.to_le_bytes())?,
    }
    Ok(())
}

/// Write a `u16`-count-prefixed list of field indices.
pub fn write_field_list(w: &mut dyn Write, fields: &[u16]) -> Result<(), PoolError> {
    let n = u16::try_from(fields.len()).map_err(|_| PoolError::MalformedStream {
        detail: format!("field list of {} entries does not fit a u16 count", fields.len()),
    })?;
    write_u16_le(w, n)?;
    for &f in fields {
        write_u16_le(w, f)?;
    }
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, PoolError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u16.
pub fn read_u16_le(r: &mut dyn Read) -> Result<u16, PoolError> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, PoolError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, PoolError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Read a real of the given width, widening to [`Real`].
pub fn read_real(r: &mut dyn Read, format: RealFormat) -> Result<Real, PoolError> {
    match format {
        RealFormat::F32 => {
            let mut buf = [0u8; 4];
            r.read_exact(&mut buf)?;
            Ok(f32::from_le_bytes(buf) as Real)
        }
        RealFormat::F64 => read_f64_le(r),
    }
}

/// Read a `u16`-count-prefixed list of field indices.
pub fn read_field_list(r: &mut dyn Read) -> Result<Vec<u16>, PoolError> {
    let n = read_u16_le(r)? as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(read_u16_le(r)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_little_endian() {
        let mut buf = Vec::new();
        write_u32_le(&mut buf, 0x0403_0201).unwrap();
        write_u16_le(&mut buf, 0x0605).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn f32_reals_narrow_then_widen() {
        let mut buf = Vec::new();
        write_real(&mut buf, RealFormat::F32, 0.1).unwrap();
        assert_eq!(buf.len(), 4);
        let v = read_real(&mut buf.as_slice(), RealFormat::F32).unwrap();
        assert_eq!(v, 0.1f32 as f64);
    }

    #[test]
    fn field_list_layout() {
        let mut buf = Vec::new();
        write_field_list(&mut buf, &[3, 0, 7]).unwrap();
        assert_eq!(buf, [3, 0, 3, 0, 0, 0, 7, 0]);
        assert_eq!(read_field_list(&mut buf.as_slice()).unwrap(), vec![3, 0, 7]);
    }

    #[test]
    fn truncated_read_is_io_error() {
        let buf = [1u8, 2];
        assert!(matches!(
            read_u32_le(&mut buf.as_slice()),
            Err(PoolError::Io(_))
        ));
    }
}
