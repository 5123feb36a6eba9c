use tracing::info;

use crate::context::CrmContext;
use crate::error::Result;
use crate::types::{DocumentCategory, StipDocument};

/// A lead's stip documents, optionally narrowed to one category.
pub struct DocumentLibrary {
    ctx: CrmContext,
    lead_id: String,
}

impl DocumentLibrary {
    pub fn new(ctx: CrmContext, lead_id: impl Into<String>) -> Self {
        Self {
            ctx,
            lead_id: lead_id.into(),
        }
    }

    pub async fn list(&self, category_id: Option<&str>) -> Result<Vec<StipDocument>> {
        let mut docs = self.ctx.api.list_documents(&self.lead_id, category_id).await?;
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs)
    }

    pub async fn categories(&self) -> Result<Vec<DocumentCategory>> {
        self.ctx.api.list_document_categories().await
    }

    pub async fn view_url(&self, document_id: &str) -> Result<String> {
        self.ctx.api.document_view_url(&self.lead_id, document_id).await
    }

    /// Delete a document. The server records a timeline entry for it.
    pub async fn delete(&self, document_id: &str) -> Result<()> {
        self.ctx.api.delete_document(&self.lead_id, document_id).await?;
        info!(lead_id = %self.lead_id, document_id, "document deleted");
        self.ctx
            .reconciler()
            .refresh_after_write(&self.lead_id, false)
            .await;
        Ok(())
    }
}
