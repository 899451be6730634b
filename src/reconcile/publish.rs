//! Output file publishing

use crate::error::CycleError;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace `path` with `data`.
///
/// The bytes go to a temporary file next to the target which is then renamed
/// over it, so readers never observe a half-written configuration. When the
/// directory does not allow creating files (a root-owned `/etc/prometheus`
/// with a writable `prometheus.yml`), the file is overwritten in place.
pub fn publish(path: &Path, data: &[u8]) -> Result<(), CycleError> {
    let publish_err = |source: io::Error| CycleError::Publish { path: path.to_path_buf(), source };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = match NamedTempFile::new_in(dir) {
        Ok(tmp) => tmp,
        Err(err) if path.is_file() => {
            tracing::debug!(
                "Cannot create temporary file in {} ({}), writing {} in place",
                dir.display(),
                err,
                path.display()
            );
            return fs::write(path, data).map_err(publish_err);
        }
        Err(err) => return Err(publish_err(err)),
    };
    tmp.write_all(data).map_err(publish_err)?;
    tmp.as_file().sync_all().map_err(publish_err)?;
    set_readable_mode(tmp.as_file()).map_err(publish_err)?;
    tmp.persist(path).map_err(|err| publish_err(err.error))?;
    Ok(())
}

// Temp files are created 0600; Prometheus often runs as another user.
#[cfg(unix)]
fn set_readable_mode(file: &File) -> io::Result<()> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_readable_mode(_file: &File) -> io::Result<()> {
    Ok(())
}
