//! 沙箱文件系统
//!
//! SafeFs 绑定 root_dir，所有路径经 resolve 校验必须在 root 下（禁止 ../ 逃逸）。

use std::path::{Path, PathBuf};

use crate::workflow::WorkflowError;

#[derive(Debug, Clone)]
pub struct SafeFs {
    root_dir: PathBuf,
}

impl SafeFs {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        let root = root_dir.as_ref().to_path_buf();
        let root_dir = root.canonicalize().unwrap_or(root);
        Self { root_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// 解析为沙箱内的绝对路径
    pub fn resolve(&self, path: &str) -> Result<PathBuf, WorkflowError> {
        let path = path.trim().trim_start_matches("./");
        let full = self.root_dir.join(path);
        let canonical = full.canonicalize()?;
        if canonical.starts_with(&self.root_dir) {
            Ok(canonical)
        } else {
            Err(WorkflowError::Tool(format!("Path escapes workspace: {}", path)))
        }
    }

    pub async fn read_to_string(&self, path: &str) -> Result<String, WorkflowError> {
        let resolved = self.resolve(path)?;
        Ok(tokio::fs::read_to_string(&resolved).await?)
    }
}
