//! Whole-lead export as a zip archive or a printable PDF document.
//!
//! Both formats share one gathering phase. Per-document failures are
//! recovered (placeholders or "link unavailable"); anything else aborts
//! the run and resets progress.

mod archive;
mod document;
mod fonts;
mod gather;
mod pool;
mod progress;

pub use archive::{Download, PlannedFile, placeholder_path, plan_paths, unique_name};
pub use document::{
    Block, DocumentLink, LINK_UNAVAILABLE, RenderedDocument, Tone, break_long_words,
    document_outline, render_pdf,
};
pub use fonts::load_fonts;
pub use gather::{LeadHistory, NoteThread, UNCATEGORIZED, fetch_all_activities, gather, thread_notes};
pub use pool::run_bounded;
pub use progress::{ExportPhase, ExportProgress, ProgressReporter};

use genpdf::fonts::{FontData, FontFamily};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::context::CrmContext;
use crate::error::Result;
use crate::types::StipDocument;
use progress::{DOWNLOAD_END, GATHER_END, PREPARE_END};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Zip of documents plus lead.json, activities.json and notes.txt.
    Archive,
    /// Paginated PDF listing a view link for each document.
    Document,
}

/// A finished export, ready to be written out.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    /// File names of documents that were replaced by a placeholder or left unlinked.
    pub failed_documents: Vec<String>,
}

pub struct ExportPipeline {
    ctx: CrmContext,
    progress: ProgressReporter,
}

impl ExportPipeline {
    #[must_use]
    pub fn new(ctx: CrmContext) -> Self {
        Self {
            ctx,
            progress: ProgressReporter::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ExportProgress> {
        self.progress.subscribe()
    }

    #[must_use]
    pub fn progress(&self) -> ExportProgress {
        self.progress.current()
    }

    pub async fn export_lead(&self, lead_id: &str, format: ExportFormat) -> Result<ExportBundle> {
        self.progress.start();
        match self.run(lead_id, format).await {
            Ok(bundle) => {
                info!(
                    lead_id,
                    file = %bundle.file_name,
                    bytes = bundle.bytes.len(),
                    failed = bundle.failed_documents.len(),
                    "export complete"
                );
                self.progress.finish(format!("Export ready: {}", bundle.file_name));
                Ok(bundle)
            }
            Err(e) => {
                error!(lead_id, error = %e, "export failed");
                self.progress.fail(format!("Export failed: {e}"));
                Err(e)
            }
        }
    }

    async fn run(&self, lead_id: &str, format: ExportFormat) -> Result<ExportBundle> {
        let export = &self.ctx.config.export;
        // Fail before any network work when the document cannot be typeset.
        let fonts = match format {
            ExportFormat::Document => Some(load_fonts(export)?),
            ExportFormat::Archive => None,
        };
        let history = gather(
            self.ctx.api.as_ref(),
            lead_id,
            export.activity_page_size,
            |loaded, total| {
                self.progress.report_span(
                    ExportPhase::Gathering,
                    0,
                    GATHER_END,
                    loaded,
                    total,
                    format!("Loaded {loaded} of {total} activities"),
                );
            },
        )
        .await?;
        self.progress.report(
            ExportPhase::Preparing,
            GATHER_END,
            format!(
                "Loaded {} activities and {} documents",
                history.activities.len(),
                history.documents.len()
            ),
        );

        match fonts {
            Some(fonts) => self.package_document(lead_id, &history, &fonts).await,
            None => self.package_archive(lead_id, &history).await,
        }
    }

    fn base_name(&self, history: &LeadHistory) -> String {
        let slug: String = history
            .lead
            .full_name()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        let slug = slug
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        let slug = if slug.is_empty() { history.lead.id.clone() } else { slug };
        format!("lead-{slug}-{}", self.ctx.local_now().format("%Y%m%d"))
    }

    async fn package_archive(&self, lead_id: &str, history: &LeadHistory) -> Result<ExportBundle> {
        let files = plan_paths(history);
        self.progress.report(
            ExportPhase::Preparing,
            PREPARE_END,
            format!("Prepared {} files", files.len()),
        );

        let api = self.ctx.api.as_ref();
        let ids: Vec<&str> = files.iter().map(|f| f.document.id.as_str()).collect();
        let results = run_bounded(
            ids,
            self.ctx.config.export.concurrency,
            |document_id| async move { api.download_document(lead_id, document_id).await },
            |done, total| {
                self.progress.report_span(
                    ExportPhase::Downloading,
                    PREPARE_END,
                    DOWNLOAD_END,
                    done,
                    total,
                    format!("Downloaded {done} of {total} documents"),
                );
            },
        )
        .await;

        let mut failed_documents = Vec::new();
        let downloads: Vec<Download> = files
            .iter()
            .zip(results)
            .map(|(file, result)| match result {
                Ok(body) => Download::Fetched(body),
                Err(e) => {
                    warn!(lead_id, document_id = %file.document.id, error = %e, "document download failed, writing placeholder");
                    failed_documents.push(file.document.file_name.clone());
                    Download::Failed(e.to_string())
                }
            })
            .collect();

        self.progress
            .report(ExportPhase::Packaging, DOWNLOAD_END, "Packaging archive");
        let bytes = archive::build_archive(history, &files, downloads)?;
        Ok(ExportBundle {
            file_name: format!("{}.zip", self.base_name(history)),
            content_type: "application/zip",
            bytes,
            failed_documents,
        })
    }

    async fn package_document(
        &self,
        lead_id: &str,
        history: &LeadHistory,
        fonts: &FontFamily<FontData>,
    ) -> Result<ExportBundle> {
        self.progress.report(
            ExportPhase::Preparing,
            PREPARE_END,
            format!("Resolving links for {} documents", history.documents.len()),
        );

        let api = self.ctx.api.as_ref();
        let documents: Vec<&StipDocument> = history.documents.iter().collect();
        let urls = run_bounded(
            documents,
            self.ctx.config.export.concurrency,
            |doc| async move {
                match api.document_view_url(lead_id, &doc.id).await {
                    Ok(url) => Some(url),
                    Err(e) => {
                        warn!(lead_id, document_id = %doc.id, error = %e, "view url unavailable");
                        None
                    }
                }
            },
            |done, total| {
                self.progress.report_span(
                    ExportPhase::Downloading,
                    PREPARE_END,
                    DOWNLOAD_END,
                    done,
                    total,
                    format!("Resolved {done} of {total} document links"),
                );
            },
        )
        .await;

        let links: Vec<DocumentLink> = history
            .documents
            .iter()
            .zip(urls)
            .map(|(doc, url)| DocumentLink {
                category: history.category_name(doc).to_string(),
                document: doc.clone(),
                url,
            })
            .collect();
        let failed_documents = links
            .iter()
            .filter(|l| l.url.is_none())
            .map(|l| l.document.file_name.clone())
            .collect();

        self.progress
            .report(ExportPhase::Packaging, DOWNLOAD_END, "Rendering document");
        let blocks = document_outline(history, &links, &self.ctx.timezone(), self.ctx.clock.now());
        let title = format!("Lead Export: {}", history.lead.full_name());
        let rendered = render_pdf(&title, &blocks, fonts)?;
        info!(lead_id, pages = rendered.pages, "rendered export document");
        Ok(ExportBundle {
            file_name: format!("{}.pdf", self.base_name(history)),
            content_type: "application/pdf",
            bytes: rendered.bytes,
            failed_documents,
        })
    }
}
