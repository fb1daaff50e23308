use crate::data::connectors::{CsvConnector, DatasetSummary};
use crate::error::{OlistError, Result};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Where the dataset's CSV files come from.
///
/// Fetching from the remote dataset hub happens outside this crate; a source
/// only has to hand back a directory that already holds the files.
pub trait DatasetSource {
    fn locate(&self) -> Result<PathBuf>;
}

/// A directory of already-downloaded CSV files.
pub struct LocalDirectory {
    path: PathBuf,
}

impl LocalDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetSource for LocalDirectory {
    fn locate(&self) -> Result<PathBuf> {
        if !self.path.is_dir() {
            return Err(OlistError::FileNotFound(self.path.display().to_string()));
        }
        Ok(self.path.clone())
    }
}

/// Registry of the dataset's tables, keyed by file stem.
pub struct OlistDataLoader {
    source: Box<dyn DatasetSource>,
    data_path: Option<PathBuf>,
    tables: BTreeMap<String, DataFrame>,
}

impl OlistDataLoader {
    pub fn new(source: Box<dyn DatasetSource>) -> Self {
        Self {
            source,
            data_path: None,
            tables: BTreeMap::new(),
        }
    }

    pub fn from_dir(path: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(LocalDirectory::new(path)))
    }

    fn data_path(&mut self) -> Result<PathBuf> {
        if let Some(path) = &self.data_path {
            return Ok(path.clone());
        }
        let path = self.source.locate()?;
        log::info!("Dataset located at {}", path.display());
        self.data_path = Some(path.clone());
        Ok(path)
    }

    /// Load every `*.csv` file of the dataset directory.
    pub fn load_all(&mut self) -> Result<&BTreeMap<String, DataFrame>> {
        let dir = self.data_path()?;
        let csv_files = list_csv_files(&dir)?;
        log::info!("Loading {} CSV files...", csv_files.len());

        for path in csv_files {
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            log::debug!("  - loading {}", path.display());
            let df = CsvConnector::load(&path)?;
            self.tables.insert(name, df);
        }

        log::info!("{} files loaded", self.tables.len());
        Ok(&self.tables)
    }

    /// Load one file; the `.csv` extension is optional.
    pub fn load_file(&mut self, filename: &str) -> Result<&DataFrame> {
        let dir = self.data_path()?;
        let filename = if filename.ends_with(".csv") {
            filename.to_string()
        } else {
            format!("{}.csv", filename)
        };

        let path = dir.join(&filename);
        if !path.exists() {
            return Err(OlistError::FileNotFound(path.display().to_string()));
        }

        let df = CsvConnector::load(&path)?;
        let name = filename.trim_end_matches(".csv").to_string();
        self.tables.insert(name.clone(), df);
        self.tables
            .get(&name)
            .ok_or(OlistError::TableNotFound(name))
    }

    pub fn get(&self, name: &str) -> Option<&DataFrame> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> &BTreeMap<String, DataFrame> {
        &self.tables
    }

    pub fn into_tables(self) -> BTreeMap<String, DataFrame> {
        self.tables
    }

    pub fn summary(&self) -> Vec<DatasetSummary> {
        self.tables
            .iter()
            .map(|(name, df)| CsvConnector::summarize(name, df))
            .collect()
    }
}

fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
