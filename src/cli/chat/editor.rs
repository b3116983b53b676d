//! Composing a message in an external editor (`/edit`)

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::NamedTempFile;
use thiserror::Error;

const FALLBACK_EDITORS: [&str; 5] = ["editor", "vim", "emacs", "vi", "nano"];

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("failed to prepare the message file")]
    Scratch(#[source] io::Error),

    #[error("failed to launch editor \"{}\"", .0.display())]
    Launch(PathBuf, #[source] io::Error),

    #[error("the editor \"{}\" did not exit successfully", .0.display())]
    Status(PathBuf),

    #[error("failed to read in the message file, was it deleted?")]
    ReadBack(#[source] io::Error),
}

/// Picks the editor named by `EDITOR`, otherwise the first common editor on
/// the `PATH`.
pub(crate) fn resolve_fallback_editor() -> Option<PathBuf> {
    if let Some(editor) = env::var_os("EDITOR").filter(|e| !e.is_empty()) {
        return Some(editor.into());
    }

    let paths = env::var_os("PATH")?;

    env::split_paths(&paths)
        .flat_map(|dir| FALLBACK_EDITORS.iter().map(move |editor| dir.join(editor)))
        .find(|candidate| candidate.exists())
}

/// A private scratch file, unlinked when dropped
pub(crate) struct Scratch {
    file: NamedTempFile,
}

impl Scratch {
    pub(crate) fn new() -> io::Result<Scratch> {
        let file = tempfile::Builder::new()
            .prefix("msg")
            .suffix(".orchat")
            .tempfile()?;

        Ok(Scratch { file })
    }

    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }

    // Editors may replace the file rather than rewrite it, so always go
    // through the path instead of the open handle.
    fn truncate(&self) -> io::Result<()> {
        fs::write(self.path(), "")
    }

    fn read_to_string(&self) -> io::Result<String> {
        fs::read_to_string(self.path())
    }
}

/// Opens `editor` on an emptied scratch file and returns what was written.
pub(crate) fn compose(editor: &Path, scratch: &Scratch) -> Result<String, Error> {
    scratch.truncate().map_err(Error::Scratch)?;

    let status = Command::new(editor)
        .arg(scratch.path())
        .status()
        .map_err(|err| Error::Launch(editor.to_path_buf(), err))?;

    if !status.success() {
        return Err(Error::Status(editor.to_path_buf()));
    }

    scratch.read_to_string().map_err(Error::ReadBack)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_roundtrip() {
        let scratch = Scratch::new().unwrap();

        assert!(scratch.path().exists());

        fs::write(scratch.path(), "draft").unwrap();
        assert_eq!(scratch.read_to_string().unwrap(), "draft");

        scratch.truncate().unwrap();
        assert_eq!(scratch.read_to_string().unwrap(), "");
    }

    #[test]
    fn test_scratch_is_removed_on_drop() {
        let scratch = Scratch::new().unwrap();
        let path = scratch.path().to_path_buf();

        drop(scratch);

        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_compose_with_failing_editor() {
        let scratch = Scratch::new().unwrap();

        let err = compose(Path::new("false"), &scratch).unwrap_err();

        assert!(matches!(err, Error::Status(_)));
    }

    #[test]
    fn test_compose_with_missing_editor() {
        let scratch = Scratch::new().unwrap();

        let err = compose(Path::new("/nonexistent/editor"), &scratch).unwrap_err();

        assert!(matches!(err, Error::Launch(_, _)));
    }
}
