use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::gather::{LeadHistory, NoteThread};
use crate::error::Result;
use crate::types::StipDocument;

/// Where one document lands inside the archive.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFile {
    pub document: StipDocument,
    pub path: String,
    /// Written instead of `path` when the download fails.
    pub placeholder: String,
}

/// Outcome of fetching one planned file's body.
#[derive(Debug, Clone)]
pub enum Download {
    Fetched(Bytes),
    Failed(String),
}

/// Path segments cannot introduce extra directories.
#[must_use]
pub fn sanitize_segment(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "unnamed".to_string(),
        _ => cleaned,
    }
}

/// `invoice.pdf` becomes `invoice (1).pdf`, then `invoice (2).pdf`, until unused.
#[must_use]
pub fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(i) if i > 0 => (&name[..i], &name[i..]),
        _ => (name, ""),
    };
    (1..)
        .map(|n| format!("{stem} ({n}){ext}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Flat `{category}/{file}` plan with per-category name deduplication.
///
/// Each document's placeholder name is reserved alongside its own, so no
/// two entries can collide whichever downloads fail.
#[must_use]
pub fn plan_paths(history: &LeadHistory) -> Vec<PlannedFile> {
    let mut taken: HashMap<String, HashSet<String>> = HashMap::new();
    history
        .documents
        .iter()
        .map(|doc| {
            let category = sanitize_segment(history.category_name(doc));
            let file = sanitize_segment(&doc.file_name);
            let names = taken.entry(category.clone()).or_default();
            let name = unique_name(&file, names);
            names.insert(name.clone());
            let placeholder = unique_name(&placeholder_path(&name), names);
            names.insert(placeholder.clone());
            PlannedFile {
                document: doc.clone(),
                path: format!("{category}/{name}"),
                placeholder: format!("{category}/{placeholder}"),
            }
        })
        .collect()
}

#[must_use]
pub fn placeholder_path(path: &str) -> String {
    format!("{path}.download-failed.txt")
}

fn placeholder_body(file: &PlannedFile, reason: &str) -> String {
    format!(
        "The document \"{}\" could not be downloaded during export.\n\
         Document id: {}\n\
         Reason: {}\n",
        file.document.file_name, file.document.id, reason
    )
}

/// Plain-text rendering of note threads, replies indented under parents.
#[must_use]
pub fn render_notes(threads: &[NoteThread]) -> String {
    let mut out = String::new();
    for thread in threads {
        let note = &thread.note;
        out.push_str(&format!(
            "[{}] {}\n{}\n",
            note.created_at.format("%Y-%m-%d %H:%M UTC"),
            note.user_name.as_deref().unwrap_or("Unknown"),
            note.note_content()
        ));
        for reply in &thread.replies {
            out.push_str(&format!(
                "    [{}] {}\n    {}\n",
                reply.created_at.format("%Y-%m-%d %H:%M UTC"),
                reply.user_name.as_deref().unwrap_or("Unknown"),
                reply.note_content().replace('\n', "\n    ")
            ));
        }
        out.push('\n');
    }
    out
}

/// Zip the lead record, timeline, notes and every planned document.
///
/// `downloads` lines up with `files`. A failed download is written as a
/// placeholder text file next to where the document would have been.
pub fn build_archive(
    history: &LeadHistory,
    files: &[PlannedFile],
    downloads: Vec<Download>,
) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file("lead.json", options)?;
    zip.write_all(&serde_json::to_vec_pretty(&history.lead)?)?;

    zip.start_file("activities.json", options)?;
    zip.write_all(&serde_json::to_vec_pretty(&history.activities)?)?;

    zip.start_file("notes.txt", options)?;
    zip.write_all(render_notes(&history.threads).as_bytes())?;

    for (file, download) in files.iter().zip(downloads) {
        match download {
            Download::Fetched(body) => {
                zip.start_file(file.path.as_str(), options)?;
                zip.write_all(&body)?;
            }
            Download::Failed(reason) => {
                zip.start_file(file.placeholder.as_str(), options)?;
                zip.write_all(placeholder_body(file, &reason).as_bytes())?;
            }
        }
    }

    Ok(zip.finish()?.into_inner())
}
