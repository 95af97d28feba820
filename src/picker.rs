//! Folder and file selection
//!
//! A native dialog is used when a desktop session is available. When it is
//! absent or fails, selection falls back to a prompt on a line-based
//! reader, so the user action never fails just because there is no display.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::{AppState, FolderRole};
use crate::error::{NeuroPixelError, Result};

/// Something that can ask the user for a path.
///
/// `Ok(None)` means the user cancelled.
pub trait PathPicker {
    fn pick_folder(&mut self, title: &str) -> Result<Option<PathBuf>>;

    fn pick_file(&mut self, title: &str, extensions: &[&str]) -> Result<Option<PathBuf>>;
}

// ==================== Native Dialog ====================

/// Native dialogs through `rfd`
#[derive(Debug, Default, Clone)]
pub struct NativePicker;

impl NativePicker {
    /// Check whether a desktop session is available to show a dialog
    pub fn is_available() -> bool {
        if cfg!(any(target_os = "windows", target_os = "macos")) {
            return true;
        }
        ["DISPLAY", "WAYLAND_DISPLAY"]
            .iter()
            .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
    }

    fn require_display() -> Result<()> {
        if Self::is_available() {
            Ok(())
        } else {
            Err(NeuroPixelError::Selection("no desktop session".to_string()))
        }
    }
}

impl PathPicker for NativePicker {
    fn pick_folder(&mut self, title: &str) -> Result<Option<PathBuf>> {
        Self::require_display()?;
        Ok(rfd::FileDialog::new().set_title(title).pick_folder())
    }

    fn pick_file(&mut self, title: &str, extensions: &[&str]) -> Result<Option<PathBuf>> {
        Self::require_display()?;
        let mut dialog = rfd::FileDialog::new().set_title(title);
        if !extensions.is_empty() {
            dialog = dialog.add_filter("Supported files", extensions);
        }
        Ok(dialog.pick_file())
    }
}

// ==================== Prompt ====================

/// Reads a path typed by the user; an empty line cancels
pub struct PromptPicker<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptPicker<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn prompt(&mut self, title: &str) -> Result<Option<PathBuf>> {
        write!(self.output, "{}: ", title)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(PathBuf::from(trimmed)))
        }
    }
}

impl<R: BufRead, W: Write> PathPicker for PromptPicker<R, W> {
    fn pick_folder(&mut self, title: &str) -> Result<Option<PathBuf>> {
        self.prompt(title)
    }

    fn pick_file(&mut self, title: &str, extensions: &[&str]) -> Result<Option<PathBuf>> {
        if extensions.is_empty() {
            self.prompt(title)
        } else {
            self.prompt(&format!("{} ({})", title, extensions.join(", ")))
        }
    }
}

// ==================== Selector ====================

/// Native picker with a prompt fallback, remembering chosen folders
pub struct FolderSelector<N, F> {
    native: Option<N>,
    fallback: F,
}

impl<N: PathPicker, F: PathPicker> FolderSelector<N, F> {
    /// `native` is `None` when no desktop session exists
    pub fn new(native: Option<N>, fallback: F) -> Self {
        Self { native, fallback }
    }

    /// Ask for a folder and record it in the recents for `role`
    pub fn select_folder(
        &mut self,
        title: &str,
        role: FolderRole,
        state: &mut AppState,
    ) -> Result<Option<PathBuf>> {
        let picked = match self.native.as_mut().map(|n| n.pick_folder(title)) {
            Some(Ok(picked)) => picked,
            Some(Err(e)) => {
                tracing::warn!("Native folder dialog failed, falling back to prompt: {}", e);
                self.fallback.pick_folder(title)?
            }
            None => self.fallback.pick_folder(title)?,
        };

        if let Some(ref path) = picked {
            state.add_recent_folder(role, path);
            tracing::debug!("Selected {:?} folder {:?}", role, path);
        }
        Ok(picked)
    }

    pub fn select_file(&mut self, title: &str, extensions: &[&str]) -> Result<Option<PathBuf>> {
        match self.native.as_mut().map(|n| n.pick_file(title, extensions)) {
            Some(Ok(picked)) => Ok(picked),
            Some(Err(e)) => {
                tracing::warn!("Native file dialog failed, falling back to prompt: {}", e);
                self.fallback.pick_file(title, extensions)
            }
            None => self.fallback.pick_file(title, extensions),
        }
    }
}

impl<R: BufRead, W: Write> FolderSelector<NativePicker, PromptPicker<R, W>> {
    /// Native dialogs when a desktop is present, otherwise prompts on `input`
    pub fn detect(input: R, output: W) -> Self {
        let native = NativePicker::is_available().then_some(NativePicker);
        Self::new(native, PromptPicker::new(input, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Failing;

    impl PathPicker for Failing {
        fn pick_folder(&mut self, _title: &str) -> Result<Option<PathBuf>> {
            Err(NeuroPixelError::Selection("dialog crashed".into()))
        }

        fn pick_file(&mut self, _title: &str, _ext: &[&str]) -> Result<Option<PathBuf>> {
            Err(NeuroPixelError::Selection("dialog crashed".into()))
        }
    }

    fn prompt(input: &str) -> PromptPicker<Cursor<Vec<u8>>, Vec<u8>> {
        PromptPicker::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_prompt_reads_path() {
        let mut picker = prompt("  /data/scans \n");
        let picked = picker.pick_folder("Input folder").unwrap();
        assert_eq!(picked, Some(PathBuf::from("/data/scans")));
        assert_eq!(String::from_utf8_lossy(&picker.output), "Input folder: ");
    }

    #[test]
    fn test_prompt_empty_cancels() {
        assert_eq!(prompt("\n").pick_folder("x").unwrap(), None);
        assert_eq!(prompt("").pick_file("x", &["json"]).unwrap(), None);
    }

    #[test]
    fn test_fallback_on_native_error() {
        let mut selector = FolderSelector::new(Some(Failing), prompt("/out\n"));
        let mut state = AppState::default();

        let picked = selector
            .select_folder("Output folder", FolderRole::Output, &mut state)
            .unwrap();
        assert_eq!(picked, Some(PathBuf::from("/out")));
        assert_eq!(state.recent_output_folders.len(), 1);
    }

    #[test]
    fn test_cancel_not_recorded() {
        let mut selector = FolderSelector::<Failing, _>::new(None, prompt("\n"));
        let mut state = AppState::default();
        let picked = selector
            .select_folder("Input folder", FolderRole::Input, &mut state)
            .unwrap();
        assert!(picked.is_none());
        assert!(state.recent_input_folders.is_empty());
    }

    #[test]
    fn test_file_fallback() {
        let mut selector = FolderSelector::new(Some(Failing), prompt("graph.json\n"));
        let picked = selector.select_file("Pipeline", &["json"]).unwrap();
        assert_eq!(picked, Some(PathBuf::from("graph.json")));
    }
}
