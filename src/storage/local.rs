use super::{ObjectStore, StorageError};
use async_trait::async_trait;
use std::path::PathBuf;

/// ローカルディレクトリへの保存
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> std::result::Result<String, StorageError> {
        let path = key
            .split('/')
            .filter(|s| !s.is_empty() && *s != "..")
            .fold(self.root.clone(), |p, s| p.join(s));

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        let absolute = std::fs::canonicalize(&path)?;
        Ok(format!("file://{}", absolute.display()))
    }
}
