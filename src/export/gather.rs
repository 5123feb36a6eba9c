use std::collections::HashMap;

use tracing::debug;

use crate::api::LeadApi;
use crate::error::{Error, Result};
use crate::types::{Activity, CreditApplication, DocumentCategory, Lead, StipDocument};

/// A top-level note and its replies, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteThread {
    pub note: Activity,
    pub replies: Vec<Activity>,
}

/// Everything an export needs about one lead.
#[derive(Debug, Clone)]
pub struct LeadHistory {
    pub lead: Lead,
    /// Full timeline, ascending by creation time.
    pub activities: Vec<Activity>,
    pub threads: Vec<NoteThread>,
    pub documents: Vec<StipDocument>,
    pub categories: Vec<DocumentCategory>,
    pub credit_applications: Vec<CreditApplication>,
}

impl LeadHistory {
    /// Category display name for a document, `Uncategorized` when unknown.
    #[must_use]
    pub fn category_name(&self, doc: &StipDocument) -> &str {
        doc.category_id
            .as_deref()
            .and_then(|id| self.categories.iter().find(|c| c.id == id))
            .map_or(UNCATEGORIZED, |c| c.name.as_str())
    }
}

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Page through the whole timeline.
///
/// Stops when a page comes back short or the running count reaches the
/// server-reported total. `on_page` receives `(loaded, total)`.
pub async fn fetch_all_activities(
    api: &dyn LeadApi,
    lead_id: &str,
    page_size: usize,
    on_page: impl Fn(usize, usize),
) -> Result<Vec<Activity>> {
    if page_size == 0 {
        return Err(Error::Config("activity page size must be positive".into()));
    }

    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let batch = api.list_timeline(lead_id, page, page_size).await?;
        let received = batch.items.len();
        let total = batch.total;
        all.extend(batch.items);
        debug!(lead_id, page, received, loaded = all.len(), total, "fetched timeline page");
        on_page(all.len(), total);

        if received < page_size || all.len() >= total {
            break;
        }
        page += 1;
    }
    Ok(all)
}

/// Group notes into two-level threads.
///
/// Replies whose parent is not among the notes are kept as top-level
/// entries so nothing is lost from the export.
#[must_use]
pub fn thread_notes(activities: &[Activity]) -> Vec<NoteThread> {
    let notes: Vec<&Activity> = activities.iter().filter(|a| a.is_note()).collect();

    let mut replies: HashMap<&str, Vec<Activity>> = HashMap::new();
    for note in &notes {
        if let Some(parent) = note.parent_id.as_deref() {
            replies.entry(parent).or_default().push((*note).clone());
        }
    }

    let mut threads: Vec<NoteThread> = notes
        .iter()
        .filter(|n| n.parent_id.is_none())
        .map(|n| NoteThread {
            note: (*n).clone(),
            replies: replies.remove(n.id.as_str()).unwrap_or_default(),
        })
        .collect();

    for orphans in replies.into_values() {
        threads.extend(orphans.into_iter().map(|note| NoteThread {
            note,
            replies: Vec::new(),
        }));
    }

    threads.sort_by_key(|t| t.note.created_at);
    for thread in &mut threads {
        thread.replies.sort_by_key(|r| r.created_at);
    }
    threads
}

/// Collect the lead, full timeline, every document and credit history.
pub async fn gather(
    api: &dyn LeadApi,
    lead_id: &str,
    page_size: usize,
    on_page: impl Fn(usize, usize),
) -> Result<LeadHistory> {
    let lead = api.get_lead(lead_id).await?;

    let mut activities = fetch_all_activities(api, lead_id, page_size, on_page).await?;
    activities.sort_by_key(|a| a.created_at);
    let threads = thread_notes(&activities);

    // The unfiltered list, not whatever category a view has selected.
    let (documents, categories, credit_applications) = tokio::try_join!(
        api.list_documents(lead_id, None),
        api.list_document_categories(),
        api.list_credit_applications(lead_id)
    )?;

    Ok(LeadHistory {
        lead,
        activities,
        threads,
        documents,
        categories,
        credit_applications,
    })
}
