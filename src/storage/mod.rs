//! JSON persistence for host-owned save files.
//!
//! The host decides when to save; this module only guarantees the snapshot
//! round-trips losslessly and that writes are atomic (tmp file then rename).

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::engine::EngineState;
use crate::errors::FinanceResult;

const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    pub fn new(root: impl Into<PathBuf>) -> FinanceResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn state_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", canonical_name(name)))
    }

    pub fn save(&self, state: &EngineState, name: &str) -> FinanceResult<()> {
        let path = self.state_path(name);
        let json = serde_json::to_string_pretty(state)?;
        let tmp = tmp_path(&path);
        write_file(&tmp, &json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn load(&self, name: &str) -> FinanceResult<EngineState> {
        let data = fs::read_to_string(self.state_path(name))?;
        Ok(serde_json::from_str(&data)?)
    }
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "save".into()
    } else {
        sanitized
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_file(path: &Path, data: &str) -> FinanceResult<()> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
