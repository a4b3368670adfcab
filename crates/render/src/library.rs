use once_cell::sync::OnceCell;
use std::time::SystemTime;

use crate::renderer::RenderError;

/// Record of a native library that was loaded into the process.
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub name: String,
    pub loaded_at: SystemTime,
}

/// Runs a library loader at most once and caches its outcome.
///
/// A failed load is cached too: the loader is never retried within the
/// same process.
pub struct LibraryGuard {
    cell: OnceCell<Result<LibraryInfo, RenderError>>,
}

impl LibraryGuard {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn load<F>(&self, name: &str, loader: F) -> Result<&LibraryInfo, RenderError>
    where
        F: FnOnce(&str) -> Result<(), RenderError>,
    {
        let outcome = self.cell.get_or_init(|| {
            tracing::info!(library = name, "loading native library");
            match loader(name) {
                Ok(()) => Ok(LibraryInfo {
                    name: name.to_string(),
                    loaded_at: SystemTime::now(),
                }),
                Err(e) => {
                    tracing::error!(library = name, "native library failed to load: {e}");
                    Err(e)
                }
            }
        });

        match outcome {
            Ok(info) => {
                if info.name != name {
                    tracing::warn!(
                        requested = name,
                        loaded = %info.name,
                        "a different native library is already loaded"
                    );
                }
                Ok(info)
            }
            Err(e) => Err(e.clone()),
        }
    }

    pub fn get(&self) -> Option<&LibraryInfo> {
        self.cell.get().and_then(|r| r.as_ref().ok())
    }
}

impl Default for LibraryGuard {
    fn default() -> Self {
        Self::new()
    }
}

static NATIVE_LIBRARY: LibraryGuard = LibraryGuard::new();

/// Process-wide native library load. Call once at process start; later calls
/// return the cached result without running `loader`.
pub fn load_native_library<F>(name: &str, loader: F) -> Result<&'static LibraryInfo, RenderError>
where
    F: FnOnce(&str) -> Result<(), RenderError>,
{
    NATIVE_LIBRARY.load(name, loader)
}

/// The process-wide library, if it loaded successfully.
pub fn native_library() -> Option<&'static LibraryInfo> {
    NATIVE_LIBRARY.get()
}
