pub mod agent_core;
pub mod commands;
pub mod inference;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Return the platform-standard data directory for Vignette Forge.
///
/// - macOS: `~/Library/Application Support/vignette-forge/`
/// - Windows: `{FOLDERID_RoamingAppData}\vignette-forge\`
/// - Linux: `$XDG_DATA_HOME/vignette-forge/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.vignette-forge/` only if none of the above can be resolved.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("vignette-forge");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vignette-forge")
}

/// Install the global tracing subscriber, logging to `log_dir/engine.log`.
///
/// The previous three runs are kept as `engine.log.1` to `.3`. `json`
/// switches the line format to JSON objects. Returns the active log path.
pub fn init_tracing(log_dir: &Path, json: bool) -> io::Result<PathBuf> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join("engine.log");

    rotate_log_file(&log_path, 3);

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let flushing_writer = FlushingWriter::new(log_file);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vignette_forge=info,warn"));

    let builder = fmt::fmt()
        .with_env_filter(filter)
        .with_writer(flushing_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %log_dir.display(),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== Vignette Forge starting ==="
    );

    Ok(log_path)
}

/// `engine.log.{n}` next to `base`.
fn rotated_path(base: &Path, n: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// Shift previous session logs down one slot and drop the one past `keep`.
///
/// Best effort: a rename that fails leaves that slot as it was.
fn rotate_log_file(base_path: &Path, keep: u32) {
    let _ = fs::remove_file(rotated_path(base_path, keep));
    for n in (1..keep).rev() {
        let _ = fs::rename(rotated_path(base_path, n), rotated_path(base_path, n + 1));
    }
    if base_path.exists() {
        let _ = fs::rename(base_path, rotated_path(base_path, 1));
    }
}

/// Log sink shared by every subscriber writer; each write reaches the file
/// before returning, so an aborted session still leaves its turns on disk.
#[derive(Clone)]
struct FlushingWriter {
    file: Arc<Mutex<File>>,
}

impl FlushingWriter {
    fn new(file: File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|e| io::Error::other(format!("log file lock poisoned: {e}")))
    }
}

impl Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.lock()?;
        file.write_all(buf)?;
        file.flush()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Resolve the path for the vignette SQLite database.
///
/// Uses `dir` (creating it if needed).
pub fn resolve_db_path(dir: &Path) -> String {
    if !dir.exists() {
        let _ = fs::create_dir_all(dir);
    }
    dir.join("vignettes.db").to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_log_file_keeps_three() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("engine.log");

        for generation in 0..5 {
            rotate_log_file(&log, 3);
            std::fs::write(&log, format!("run {generation}")).unwrap();
        }

        assert_eq!(std::fs::read_to_string(&log).unwrap(), "run 4");
        let rotated = |n: u32| rotated_path(&log, n);
        assert_eq!(std::fs::read_to_string(rotated(1)).unwrap(), "run 3");
        assert_eq!(std::fs::read_to_string(rotated(3)).unwrap(), "run 1");
        assert!(!rotated(4).exists());
    }

    #[test]
    fn test_flushing_writer_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let file = File::create(&path).unwrap();

        let mut writer = FlushingWriter::new(file);
        writer.write_all(b"line one\n").unwrap();
        // Visible without dropping the writer
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line one\n");
    }

    #[test]
    fn test_resolve_db_path_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data");
        let path = resolve_db_path(&nested);
        assert!(nested.exists());
        assert!(path.ends_with("vignettes.db"));
    }
}
