//! A store keeping one JSON document per repository on disk.

use super::Store;
use super::path_utils::{meta_document_name, repo_document_path};
use crate::Result;
use crate::model::{CrawlState, RepoId, RepositoryRecord};
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use ohno::IntoAppError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const LOG_TARGET: &str = "     store";

const REPOS_DIR: &str = "repos";
const META_DIR: &str = "meta";

/// Directory-backed document store.
///
/// Layout under the root directory:
///
/// ```text
/// repos/<owner>/<name>.json   one RepositoryRecord each
/// meta/<key>.json             singleton documents such as the crawl state
/// ```
#[derive(Debug, Clone)]
pub struct DocStore {
    root: PathBuf,
}

impl DocStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in [root.join(REPOS_DIR), root.join(META_DIR)] {
            fs::create_dir_all(&dir).into_app_err_with(|| format!("creating store directory '{}'", dir.display()))?;
        }

        log::debug!(target: LOG_TARGET, "Opened document store at '{}'", root.display());
        Ok(Self { root })
    }

    fn repo_path(&self, id: &RepoId) -> PathBuf {
        self.root.join(REPOS_DIR).join(repo_document_path(id))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(META_DIR).join(meta_document_name(key))
    }
}

impl Store for DocStore {
    async fn upsert_repository(&self, record: &RepositoryRecord) -> Result<()> {
        save_document(record, &self.repo_path(&record.id))
    }

    async fn get_repository(&self, id: &RepoId) -> Result<Option<RepositoryRecord>> {
        load_document(&self.repo_path(id))
    }

    fn stream_repositories(&self) -> BoxStream<'_, Result<RepositoryRecord>> {
        let walker = WalkDir::new(self.root.join(REPOS_DIR))
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter();

        let records = walker.filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "json") => {
                Some(load_document(entry.path()).and_then(|record| {
                    record.into_app_err_with(|| format!("repository document '{}' disappeared", entry.path().display()))
                }))
            }
            Ok(_) => None,
            Err(e) => Some(Err(e).into_app_err("walking the repository store")),
        });

        stream::iter(records).boxed()
    }

    async fn get_crawl_state(&self, key: &str) -> Result<Option<CrawlState>> {
        load_document(&self.meta_path(key))
    }

    async fn upsert_crawl_state(&self, key: &str, state: &CrawlState) -> Result<()> {
        save_document(state, &self.meta_path(key))
    }
}

/// Load a document, returning `None` when the file does not exist.
fn load_document<T>(path: &Path) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).into_app_err_with(|| format!("opening document '{}'", path.display())),
    };

    let data = serde_json::from_reader(BufReader::new(file)).into_app_err_with(|| format!("parsing document '{}'", path.display()))?;
    Ok(Some(data))
}

/// Write a document through a temporary file so readers never see a partial write.
fn save_document<T>(data: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{}'", parent.display()))?;
    }

    let tmp_path = path.with_extension("json.tmp");
    {
        let file = File::create(&tmp_path).into_app_err_with(|| format!("creating document '{}'", tmp_path.display()))?;
        let mut writer = BufWriter::new(file);

        #[cfg(debug_assertions)]
        let result = serde_json::to_writer_pretty(&mut writer, data);
        #[cfg(not(debug_assertions))]
        let result = serde_json::to_writer(&mut writer, data);

        result.into_app_err_with(|| format!("writing document '{}'", tmp_path.display()))?;
        writer
            .flush()
            .into_app_err_with(|| format!("flushing document '{}'", tmp_path.display()))?;
    }

    fs::rename(&tmp_path, path).into_app_err_with(|| format!("replacing document '{}'", path.display()))?;
    log::debug!(target: LOG_TARGET, "Saved '{}'", path.display());
    Ok(())
}
