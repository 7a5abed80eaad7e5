//! Business context store.
//!
//! Loads the SLA, RTO/RPO policy and incident-history documents and
//! concatenates them into the policy text the prompt embeds. The documents
//! are a prerequisite for every analysis: a read failure aborts the call
//! rather than producing an under-informed verdict.

use std::path::PathBuf;

use crate::config::ContextConfig;
use crate::error::{AppError, Result};

const DOCUMENTS: &[&str] = &["SLA.md", "RTO_RPO_POLICY.md", "INCIDENT_HISTORY.md"];

pub struct BusinessContextStore {
    docs_dir: PathBuf,
}

impl BusinessContextStore {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            docs_dir: config.docs_dir.clone(),
        }
    }

    /// Read and concatenate the business documents, freshly on every call.
    pub async fn load(&self) -> Result<String> {
        let mut sections = Vec::with_capacity(DOCUMENTS.len());
        for name in DOCUMENTS {
            let path = self.docs_dir.join(name);
            let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
                AppError::ContextUnavailable(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                ))
            })?;
            sections.push(text);
        }
        Ok(sections.join("\n---\n"))
    }
}
