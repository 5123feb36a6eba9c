use std::collections::HashMap;

use inquire::Confirm;

use super::pickers::format_relative_time;
use crate::context::CrmContext;
use crate::documents::DocumentLibrary;

pub async fn run_docs_list(
    ctx: &CrmContext,
    lead_id: &str,
    category: Option<String>,
) -> anyhow::Result<()> {
    let library = DocumentLibrary::new(ctx.clone(), lead_id);
    let (docs, categories) = tokio::try_join!(library.list(category.as_deref()), library.categories())?;
    let names: HashMap<&str, &str> = categories
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();

    if docs.is_empty() {
        println!("No documents found.");
        return Ok(());
    }

    let now = ctx.clock.now();
    for doc in &docs {
        let category = doc
            .category_id
            .as_deref()
            .and_then(|id| names.get(id).copied())
            .unwrap_or("Uncategorized");
        println!(
            "{}  {:<32} {:<18} {}",
            doc.id,
            doc.file_name,
            category,
            format_relative_time(&doc.created_at, now)
        );
    }
    Ok(())
}

pub async fn run_docs_delete(
    ctx: &CrmContext,
    lead_id: &str,
    document_id: &str,
    force: bool,
) -> anyhow::Result<()> {
    if !force {
        let confirmed = Confirm::new(&format!("Delete document {document_id}?"))
            .with_default(false)
            .prompt()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    DocumentLibrary::new(ctx.clone(), lead_id)
        .delete(document_id)
        .await?;
    println!("Document {document_id} deleted.");
    Ok(())
}
