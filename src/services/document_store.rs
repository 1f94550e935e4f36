use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::utils::sha256_bytes;

/// Content-addressed store for the original certification documents. Stands
/// in for the external document service: `store` hands back the public URL
/// the registry persists, `fetch` resolves it again.
pub struct DocumentStore {
    root: PathBuf,
    public_base: String,
    max_bytes: usize,
}

impl DocumentStore {
    pub fn new(root: PathBuf, public_base: String, max_bytes: usize) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("creating document store at {}", root.display()))?;
        Ok(DocumentStore {
            root,
            public_base,
            max_bytes,
        })
    }

    pub fn store(&self, bytes: &[u8], original_filename: &str) -> Result<String> {
        // The cap is checked upstream before extraction; enforced here too
        // since the store is also reachable from other call sites.
        if bytes.len() > self.max_bytes {
            return Err(anyhow!(
                "document of {} bytes exceeds store limit of {}",
                bytes.len(),
                self.max_bytes
            ));
        }

        let name = format!("{}.{}", sha256_bytes(bytes), extension_of(original_filename));
        let path = self.root.join(&name);
        if !path.exists() {
            fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        }
        Ok(format!("{}/documents/{}", self.public_base, name))
    }

    pub fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        // Reject anything that could escape the store directory.
        if name.contains('/') || name.contains("..") {
            return Err(anyhow!("invalid document name"));
        }
        let path = self.root.join(name);
        fs::read(&path).with_context(|| format!("reading {}", path.display()))
    }
}

fn extension_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5)
        .unwrap_or_else(|| "bin".to_string())
}
