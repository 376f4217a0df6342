//! Duplicate-name resolution for uploads.
//!
//! Names are compared case-insensitively with the extension and any trailing
//! ` (n)` version marker removed. A free base name is used as-is; otherwise
//! the first free ` (1)`, ` (2)`, ... suffix is appended.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{LazyLock, Mutex, MutexGuard};

use regex::Regex;

/// Trailing version marker such as `" (3)"`.
static VERSION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d+\)$").unwrap());

/// Display name of a file: extension and version marker stripped.
pub fn base_name(filename: &str) -> String {
    let trimmed = filename.trim();
    let stem = match Path::new(trimmed).extension() {
        Some(_) => Path::new(trimmed)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| trimmed.to_string()),
        None => trimmed.to_string(),
    };
    let base = VERSION_MARKER.replace(&stem, "").trim().to_string();
    if base.is_empty() {
        stem
    } else {
        base
    }
}

/// Resolve `filename` to a name for which `is_taken` is false.
pub fn resolve_name(filename: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let base = base_name(filename);
    if !is_taken(&base) {
        return base;
    }
    let mut version = 1u32;
    loop {
        let candidate = format!("{} ({})", base, version);
        if !is_taken(&candidate) {
            return candidate;
        }
        version += 1;
    }
}

/// Process-wide set of names that are in use or reserved by an in-flight
/// upload.
///
/// Names seen in the store and names reserved by pipelines are tracked
/// apart: reseeding from the store replaces the former and leaves
/// reservations alone until they are committed or released. Reservation is
/// a single synchronous step, so two pipelines can never resolve to the same
/// name.
#[derive(Default)]
pub struct NameRegistry {
    inner: Mutex<Names>,
}

#[derive(Default)]
struct Names {
    known: HashSet<String>,
    reserved: HashSet<String>,
}

impl Names {
    fn is_taken(&self, key: &str) -> bool {
        self.known.contains(key) || self.reserved.contains(key)
    }
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the store's known names. Outstanding reservations are kept.
    pub fn reset<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names_guard = self.lock();
        names_guard.known = names.into_iter().map(|n| key(n.as_ref())).collect();
    }

    /// Resolve and reserve a unique name for `filename`.
    pub fn reserve(&self, filename: &str) -> String {
        let mut names = self.lock();
        let name = resolve_name(filename, |candidate| names.is_taken(&key(candidate)));
        names.reserved.insert(key(&name));
        name
    }

    /// Mark a reserved name as stored.
    pub fn commit(&self, name: &str) {
        let mut names = self.lock();
        let key = key(name);
        names.reserved.remove(&key);
        names.known.insert(key);
    }

    /// Give a reserved name back. Returns whether it was held.
    pub fn release(&self, name: &str) -> bool {
        self.lock().reserved.remove(&key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().is_taken(&key(name))
    }

    /// Names currently reserved by in-flight uploads.
    pub fn reserved(&self) -> usize {
        self.lock().reserved.len()
    }

    pub fn len(&self) -> usize {
        let names = self.lock();
        names.known.len() + names.reserved.difference(&names.known).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Names> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}
