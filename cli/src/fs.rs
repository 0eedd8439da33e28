//! Local-disk file enumeration for the CLI host.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;
use stylebridge_analyzer::{CSS_LANGUAGE, FileSystem};
use stylebridge_types::{FileKind, InputFile};

/// Directories never worth descending into.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "target"];

const TEST_DIRS: &[&str] = &["test", "tests"];

/// Style sheets found under a project root, `.gitignore` respected.
#[derive(Debug)]
pub struct LocalFileSystem {
    work_dir: PathBuf,
    files: Vec<InputFile>,
}

impl LocalFileSystem {
    /// Walk `root` for files ending in one of `suffixes` (lowercase, no dot).
    #[must_use]
    pub fn scan(root: &Path, work_dir: PathBuf, suffixes: &[String]) -> Self {
        let walker = WalkBuilder::new(root)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !SKIPPED_DIRS.contains(&name.as_ref())
            })
            .build();

        let mut paths: Vec<PathBuf> = walker
            .flatten()
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(ignore::DirEntry::into_path)
            .filter(|path| suffix_of(path).is_some_and(|ext| suffixes.contains(&ext)))
            .collect();
        paths.sort();

        let files = paths
            .iter()
            .filter_map(|path| {
                let Some(file) = InputFile::from_path(path, CSS_LANGUAGE) else {
                    tracing::debug!("Skipping {}: not an absolute path", path.display());
                    return None;
                };
                let kind = if is_test_file(root, path) {
                    FileKind::Test
                } else {
                    FileKind::Main
                };
                Some(file.with_kind(kind))
            })
            .collect::<Vec<_>>();

        tracing::debug!(root = %root.display(), count = files.len(), "Indexed style sheets");
        Self { work_dir, files }
    }

    #[must_use]
    pub fn files(&self) -> &[InputFile] {
        &self.files
    }
}

fn suffix_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Files under a `test`/`tests` directory, or named `*.test.<suffix>`.
fn is_test_file(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let in_test_dir = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .any(|component| {
            matches!(component, Component::Normal(name)
                if TEST_DIRS.iter().any(|dir| name.eq_ignore_ascii_case(dir)))
        });
    let test_named = path
        .file_stem()
        .and_then(|stem| Path::new(stem).extension())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("test"));
    in_test_dir || test_named
}

impl FileSystem for LocalFileSystem {
    fn input_files(&self) -> Vec<InputFile> {
        self.files.clone()
    }

    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn read_contents(&self, file: &InputFile) -> io::Result<String> {
        let path = file
            .local_path()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Unsupported, "not a local file"))?;
        let bytes = fs::read(path)?;
        if file.charset().is_utf8() {
            String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        } else {
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}
