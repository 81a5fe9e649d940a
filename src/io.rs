//! Raw single-precision binary field dumps (§6's output contract): one
//! flat `nx*ny` (or `nx*(ny+1)` for v) little-endian `f32` array per file,
//! row-major, no header. File names encode the run configuration so a
//! batch of cases never collides in one output directory.

use crate::error::{Error, Result};
use crate::grid::Field2;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Identifies a run for the purpose of naming dump files (§6).
pub struct RunTag<'a> {
    pub ic: i64,
    pub coriolis: &'a str,
    pub scheme: &'a str,
    pub nx: usize,
    pub ny: usize,
}

impl<'a> RunTag<'a> {
    fn file_path(&self, dir: &Path, field: &str) -> PathBuf {
        dir.join(format!(
            "ic{}_{}_{}_{}x{}_{}.bin",
            self.ic, self.coriolis, self.scheme, self.nx, self.ny, field
        ))
    }
}

/// Write `field` to `dir/<tag>_<name>.bin` as flat little-endian `f32`,
/// creating or replacing the file (§6).
pub fn dump_field(dir: &Path, tag: &RunTag, name: &str, field: &Field2) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = tag.file_path(dir, name);
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    for j in 0..field.ny() {
        for i in 0..field.nx() {
            writer.write_all(&(field.get(i, j) as f32).to_le_bytes())?;
        }
    }
    writer.flush()?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// Write every prognostic and diagnostic field the run produces for one
/// snapshot: u, v, h (phi/g), relative vorticity, potential vorticity, and
/// (for steady test cases) a height error field against the analytic
/// solution.
#[allow(clippy::too_many_arguments)]
pub fn dump_snapshot(
    dir: &Path,
    tag: &RunTag,
    u: &Field2,
    v: &Field2,
    h: &Field2,
    vorticity: &Field2,
    potential_vorticity: &Field2,
    height_error: Option<&Field2>,
) -> Result<()> {
    dump_field(dir, tag, "u", u)?;
    dump_field(dir, tag, "v", v)?;
    dump_field(dir, tag, "h", h)?;
    dump_field(dir, tag, "zeta", vorticity)?;
    dump_field(dir, tag, "pv", potential_vorticity)?;
    if let Some(err) = height_error {
        dump_field(dir, tag, "herr", err)?;
    }
    Ok(())
}

/// Read a flat little-endian `f32` dump back into a [`Field2`], used by
/// the reference-solution comparison path and by tests.
pub fn load_field(path: &Path, nx: usize, ny: usize) -> Result<Field2> {
    let bytes = std::fs::read(path)?;
    let expected = nx * ny * 4;
    if bytes.len() != expected {
        return Err(Error::Config(anyhow::anyhow!(
            "dump {} has {} bytes, expected {}",
            path.display(),
            bytes.len(),
            expected
        )));
    }
    Ok(Field2::from_fn(nx, ny, |i, j| {
        let offset = (j * nx + i) * 4;
        f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap()) as f64
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_field_through_disk() {
        let dir = std::env::temp_dir().join("globalswe_io_test");
        let tag = RunTag { ic: 2, coriolis: "simple", scheme: "sl", nx: 8, ny: 4 };
        let field = Field2::from_fn(8, 4, |i, j| (i * 10 + j) as f64);
        dump_field(&dir, &tag, "u", &field).unwrap();
        let path = tag.file_path(&dir, "u");
        let loaded = load_field(&path, 8, 4).unwrap();
        for j in 0..4 {
            for i in 0..8 {
                assert!((loaded.get(i, j) - field.get(i, j)).abs() < 1e-4);
            }
        }
        std::fs::remove_dir_all(&dir).ok();
    }
}
