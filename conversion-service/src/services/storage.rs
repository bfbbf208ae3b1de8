use async_trait::async_trait;
use service_core::error::AppError;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// File storage addressed by relative keys. Converters need real paths, so
/// every backend also exposes `resolve`.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError>;
    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
    /// Remove a whole workspace directory and everything under it.
    async fn delete_workspace(&self, workspace: &str) -> Result<(), AppError>;
    fn resolve(&self, key: &str) -> PathBuf;
}

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        // soffice resolves relative paths against its own cwd
        let base_path = fs::canonicalize(&base_path).await?;
        Ok(Self { base_path })
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError> {
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(key);
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound(anyhow::anyhow!("File not found: {}", key)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.resolve(key);
        if path.exists() {
            fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn delete_workspace(&self, workspace: &str) -> Result<(), AppError> {
        let path = self.resolve(workspace);
        if path.exists() {
            fs::remove_dir_all(path).await?;
        }
        Ok(())
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }
}

/// A unique directory under the storage root, holding one upload and the
/// converter's output for it.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub id: String,
    pub input_name: String,
}

impl Workspace {
    pub fn new(input_name: String) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), input_name)
    }

    pub fn with_id(id: String, input_name: String) -> Self {
        Self { id, input_name }
    }

    pub fn input_key(&self) -> String {
        format!("{}/{}", self.id, self.input_name)
    }

    /// Key of the file the engine writes: same stem, target extension.
    pub fn output_key(&self, extension: &str) -> String {
        format!("{}/{}.{}", self.id, file_stem(&self.input_name), extension)
    }

    pub fn output_name(&self, extension: &str) -> String {
        format!("{}.{}", file_stem(&self.input_name), extension)
    }
}

fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

/// Reduce a client-supplied file name to its last path component.
/// Returns `None` when nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." || cleaned.starts_with('.') {
        return None;
    }
    Some(cleaned)
}
