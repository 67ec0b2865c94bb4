// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Writing sorted output.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
#[error("cannot write `{}`: {source}", path.display())]
pub struct StoreError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Write `values` to `path`, space-separated, replacing any old contents.
pub fn store_ints(values: &[i32], path: impl AsRef<Path>) -> Result<(), StoreError> {
    let path = path.as_ref();
    let wrap = |source| StoreError {
        path: path.to_path_buf(),
        source,
    };

    let mut out = BufWriter::new(File::create(path).map_err(wrap)?);
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.write_all(b" ").map_err(wrap)?;
        }
        write!(out, "{}", v).map_err(wrap)?;
    }
    out.flush().map_err(wrap)?;
    log::debug!("wrote {} values to {}", values.len(), path.display());
    Ok(())
}
