#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use wallpaper_manager_core::workflow::Prompt;
use wallpaper_manager_core::{Config, Result, TargetResolution};

/// Small target so fixtures stay cheap to encode: 128x72 needs 2x, 32x20 needs 8x
pub const TEST_TARGET: TargetResolution = TargetResolution {
    width: 256,
    height: 144,
};

/// Fake tool: answers the queries and copies the input to the output for jobs
pub const COPYING_TOOL: &str = r#"case "$1" in
  --version) echo "gowall v0.2.1" ;;
  --help) echo "usage: gowall <command>" ;;
  list) printf 'Available themes:\nnord\ngruvbox  (default)\n\nCustom themes:\nmine\n' ;;
  upscale|convert) cp "$2" "$6" ;;
esac"#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.set_target(TEST_TARGET);
    config
}

/// Write a real image of the given size; the format follows the extension
pub fn create_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    RgbImage::new(width, height).save(&path).unwrap();
    path
}

/// A file with an image extension but no image inside
pub fn create_corrupt_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"DUMMY IMAGE DATA").unwrap();
    path
}

/// Executable shell script standing in for the external tool
#[cfg(unix)]
pub fn create_fake_tool(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-gowall");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Sorted names of the files directly inside `dir`
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().unwrap().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Answers confirmations from a fixed list, then falls back to the default
pub struct ScriptedPrompt {
    answers: RefCell<Vec<bool>>,
    pub asked: RefCell<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().rev().copied().collect()),
            asked: RefCell::new(Vec::new()),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, question: &str, default: bool) -> Result<bool> {
        self.asked.borrow_mut().push(question.to_string());
        Ok(self.answers.borrow_mut().pop().unwrap_or(default))
    }

    fn ask(&self, _question: &str, default: &str) -> Result<String> {
        Ok(default.to_string())
    }
}
