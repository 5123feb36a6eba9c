use std::path::PathBuf;

use tracing::debug;

use crate::context::CrmContext;
use crate::export::{ExportFormat, ExportPhase, ExportPipeline};

pub async fn run_export(
    ctx: &CrmContext,
    lead_id: &str,
    format: ExportFormat,
    output_dir: Option<PathBuf>,
    quiet: bool,
) -> anyhow::Result<()> {
    let output_dir = output_dir.unwrap_or_else(|| ctx.config.export.output_dir.clone());
    std::fs::create_dir_all(&output_dir)?;

    let pipeline = ExportPipeline::new(ctx.clone());
    let mut progress = pipeline.subscribe();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let p = progress.borrow_and_update().clone();
            if matches!(p.phase, ExportPhase::Done | ExportPhase::Failed) {
                break;
            }
            if quiet {
                debug!(percent = p.percent, status = %p.status, "export progress");
            } else {
                eprintln!("[{:>3}%] {}", p.percent, p.status);
            }
        }
    });

    let result = pipeline.export_lead(lead_id, format).await;
    drop(pipeline);
    let _ = reporter.await;
    let bundle = result?;

    let path = output_dir.join(&bundle.file_name);
    std::fs::write(&path, &bundle.bytes)?;

    println!("Wrote {} ({} bytes)", path.display(), bundle.bytes.len());
    if !bundle.failed_documents.is_empty() {
        println!(
            "{} document(s) could not be included: {}",
            bundle.failed_documents.len(),
            bundle.failed_documents.join(", ")
        );
    }
    Ok(())
}
