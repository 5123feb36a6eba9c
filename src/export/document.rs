//! Printable PDF export.
//!
//! The lead history is first turned into a flat list of [`Block`]s, then laid
//! out by `genpdf`, which breaks pages wherever content runs past the bottom
//! margin. The page count is only known after layout, so the document is
//! rendered twice: once to count pages and once with `Page n of N` footers.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, FixedOffset, Utc};
use genpdf::elements::{Break, FrameCellDecorator, LinearLayout, Paragraph, TableLayout};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::style::{Style, StyledString};
use genpdf::{Alignment, Context, Document, Element, Margins, Mm, PageDecorator, Position, render};

use super::gather::{LeadHistory, NoteThread};
use crate::error::Result;
use crate::types::{Activity, StipDocument};

const PAGE_WIDTH_MM: f64 = 210.0;
const MARGIN_MM: f64 = 15.0;
const FOOTER_MM: f64 = 8.0;
const CONTENT_WIDTH_MM: f64 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
const REPLY_INDENT_MM: f64 = 8.0;
const CELL_PADDING_MM: f64 = 1.0;

const BODY_PT: u8 = 10;
const META_PT: u8 = 8;
const TABLE_PT: u8 = 9;
const FOOTER_PT: u8 = 8;

pub const LINK_UNAVAILABLE: &str = "link unavailable";

/// A document with its resolved view URL, if one could be obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLink {
    pub document: StipDocument,
    pub category: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Body,
    Meta,
}

/// One unit of document content, before layout.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        text: String,
    },
    Text {
        text: String,
        tone: Tone,
        /// Replies sit indented under their parent note.
        indent: bool,
    },
    Table {
        /// Column titles with their relative widths.
        columns: Vec<(String, usize)>,
        rows: Vec<Vec<String>>,
    },
}

impl Block {
    fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::Heading {
            level,
            text: text.into(),
        }
    }

    fn text(text: impl Into<String>, tone: Tone) -> Self {
        Self::Text {
            text: text.into(),
            tone,
            indent: false,
        }
    }

    fn reply(text: impl Into<String>, tone: Tone) -> Self {
        Self::Text {
            text: text.into(),
            tone,
            indent: true,
        }
    }

    fn table(columns: &[(&str, usize)], rows: Vec<Vec<String>>) -> Self {
        Self::Table {
            columns: columns.iter().map(|(t, w)| ((*t).to_string(), *w)).collect(),
            rows,
        }
    }
}

/// A rendered PDF and the number of pages it spans.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

fn fmt_time(at: DateTime<Utc>, tz: &FixedOffset) -> String {
    at.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string()
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

fn lead_summary(out: &mut Vec<Block>, history: &LeadHistory, tz: &FixedOffset) {
    let lead = &history.lead;
    out.push(Block::heading(2, "Lead Summary"));
    let rows = vec![
        ("Name", lead.full_name()),
        ("Email", or_dash(lead.email.as_deref())),
        ("Phone", or_dash(lead.phone.as_deref())),
        ("Stage", lead.stage.clone()),
        ("Dealership", or_dash(lead.dealership_id.as_deref())),
        (
            "Assigned to",
            lead.assigned_to.clone().unwrap_or_else(|| "Unassigned".into()),
        ),
        (
            "Secondary salesperson",
            or_dash(lead.secondary_salesperson.as_deref()),
        ),
        ("Created", fmt_time(lead.created_at, tz)),
        ("Last updated", fmt_time(lead.updated_at, tz)),
    ];
    out.push(Block::table(
        &[("Field", 1), ("Value", 3)],
        rows.into_iter()
            .map(|(field, value)| vec![field.to_string(), value])
            .collect(),
    ));
    if !lead.notes.trim().is_empty() {
        out.push(Block::text(lead.notes.clone(), Tone::Body));
    }
}

fn credit_history(out: &mut Vec<Block>, history: &LeadHistory, tz: &FixedOffset) {
    out.push(Block::heading(2, "Credit Applications"));
    if history.credit_applications.is_empty() {
        out.push(Block::text("No credit applications on file.", Tone::Meta));
        return;
    }
    let rows = history
        .credit_applications
        .iter()
        .map(|app| {
            vec![
                fmt_time(app.submitted_at.unwrap_or(app.created_at), tz),
                app.status.clone(),
                or_dash(app.lender.as_deref()),
                app.amount_requested
                    .map_or_else(|| "-".to_string(), |a| format!("${a:.2}")),
            ]
        })
        .collect();
    out.push(Block::table(
        &[("Submitted", 2), ("Status", 2), ("Lender", 3), ("Amount", 2)],
        rows,
    ));
}

fn note_header(note: &Activity, tz: &FixedOffset) -> String {
    format!(
        "{} - {}",
        note.user_name.as_deref().unwrap_or("Unknown"),
        fmt_time(note.created_at, tz)
    )
}

fn notes(out: &mut Vec<Block>, threads: &[NoteThread], tz: &FixedOffset) {
    out.push(Block::heading(2, "Notes"));
    if threads.is_empty() {
        out.push(Block::text("No notes.", Tone::Meta));
        return;
    }
    for thread in threads {
        out.push(Block::text(note_header(&thread.note, tz), Tone::Meta));
        out.push(Block::text(thread.note.note_content(), Tone::Body));
        for reply in &thread.replies {
            out.push(Block::reply(note_header(reply, tz), Tone::Meta));
            out.push(Block::reply(reply.note_content(), Tone::Body));
        }
    }
}

fn documents(out: &mut Vec<Block>, links: &[DocumentLink], tz: &FixedOffset) {
    out.push(Block::heading(2, "Documents"));
    if links.is_empty() {
        out.push(Block::text("No documents uploaded.", Tone::Meta));
        return;
    }
    let mut by_category: BTreeMap<&str, Vec<&DocumentLink>> = BTreeMap::new();
    for link in links {
        by_category.entry(link.category.as_str()).or_default().push(link);
    }
    for (category, links) in by_category {
        out.push(Block::heading(3, category));
        let rows = links
            .iter()
            .map(|link| {
                vec![
                    link.document.file_name.clone(),
                    fmt_time(link.document.created_at, tz),
                    link.url.clone().unwrap_or_else(|| LINK_UNAVAILABLE.into()),
                ]
            })
            .collect();
        out.push(Block::table(
            &[("File", 3), ("Uploaded", 2), ("Link", 5)],
            rows,
        ));
    }
}

/// Lay out the export's sections in reading order.
#[must_use]
pub fn document_outline(
    history: &LeadHistory,
    links: &[DocumentLink],
    tz: &FixedOffset,
    generated_at: DateTime<Utc>,
) -> Vec<Block> {
    let mut out = vec![
        Block::heading(1, format!("Lead Export: {}", history.lead.full_name())),
        Block::text(
            format!("Generated {}", fmt_time(generated_at, tz)),
            Tone::Meta,
        ),
    ];
    lead_summary(&mut out, history, tz);
    credit_history(&mut out, history, tz);
    notes(&mut out, &history.threads, tz);
    documents(&mut out, links, tz);
    out
}

/// Characters that always fit on one line of `width_mm` at `font_pt`,
/// counting every glyph as a full em.
fn line_capacity(width_mm: f64, font_pt: u8) -> usize {
    let width_pt = width_mm * 72.0 / 25.4;
    ((width_pt / f64::from(font_pt)).floor() as usize).max(1)
}

/// Split words longer than `max_chars` so the layout engine can wrap them.
///
/// `genpdf` only breaks lines at whitespace and rejects a word wider than
/// its column, which signed URLs and long file names easily are.
#[must_use]
pub fn break_long_words(text: &str, max_chars: usize) -> String {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for chunk in chars.chunks(max_chars) {
            pieces.push(chunk.iter().collect::<String>());
        }
    }
    pieces.join(" ")
}

fn styled(text: String, style: Style) -> Paragraph {
    Paragraph::new(StyledString::new(text, style))
}

fn tone_style(tone: Tone) -> (Style, u8) {
    match tone {
        Tone::Body => (Style::new().with_font_size(BODY_PT), BODY_PT),
        Tone::Meta => (Style::new().italic().with_font_size(META_PT), META_PT),
    }
}

fn push_block(doc: &mut Document, block: &Block) -> Result<()> {
    match block {
        Block::Heading { level, text } => {
            let size = match level {
                1 => 16,
                2 => 13,
                _ => 11,
            };
            doc.push(Break::new(0.5));
            let width = line_capacity(CONTENT_WIDTH_MM, size);
            doc.push(styled(
                break_long_words(text, width),
                Style::new().bold().with_font_size(size),
            ));
            doc.push(Break::new(0.25));
        }
        Block::Text { text, tone, indent } => {
            let (style, size) = tone_style(*tone);
            let indent_mm = if *indent { REPLY_INDENT_MM } else { 0.0 };
            let width = line_capacity(CONTENT_WIDTH_MM - indent_mm, size);
            let mut layout = LinearLayout::vertical();
            for line in text.lines() {
                if line.trim().is_empty() {
                    layout.push(Break::new(1));
                } else {
                    layout.push(styled(break_long_words(line, width), style));
                }
            }
            doc.push(layout.padded(Margins::trbl(0.0, 0.0, 0.0, indent_mm)));
        }
        Block::Table { columns, rows } => {
            let weights: Vec<usize> = columns.iter().map(|(_, w)| *w).collect();
            let total: usize = weights.iter().sum::<usize>().max(1);
            let capacity = |weight: usize| {
                let width = CONTENT_WIDTH_MM * weight as f64 / total as f64;
                line_capacity(width - 2.0 * CELL_PADDING_MM, TABLE_PT)
            };

            let mut table = TableLayout::new(weights.clone());
            table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

            let header_style = Style::new().bold().with_font_size(TABLE_PT);
            let mut header = table.row();
            for (title, weight) in columns {
                header.push_element(
                    styled(break_long_words(title, capacity(*weight)), header_style)
                        .padded(CELL_PADDING_MM),
                );
            }
            header.push()?;

            let cell_style = Style::new().with_font_size(TABLE_PT);
            for values in rows {
                let mut row = table.row();
                for (value, weight) in values.iter().zip(&weights) {
                    row.push_element(
                        styled(break_long_words(value, capacity(*weight)), cell_style)
                            .padded(CELL_PADDING_MM),
                    );
                }
                row.push()?;
            }
            doc.push(table);
            doc.push(Break::new(0.5));
        }
    }
    Ok(())
}

/// Margins plus a `Page n of N` line at the bottom of every page.
struct PageFooter {
    page: usize,
    total: Option<usize>,
    rendered: Arc<AtomicUsize>,
}

impl PageDecorator for PageFooter {
    fn decorate_page<'a>(
        &mut self,
        context: &Context,
        mut area: render::Area<'a>,
        style: Style,
    ) -> std::result::Result<render::Area<'a>, genpdf::error::Error> {
        self.page += 1;
        self.rendered.store(self.page, Ordering::SeqCst);

        area.add_margins(Margins::all(MARGIN_MM));
        let content_height = area.size().height - Mm::from(FOOTER_MM);

        let mut footer_area = area.clone();
        footer_area.add_offset(Position::new(0.0, content_height));
        footer_area.set_height(Mm::from(FOOTER_MM));
        let label = match self.total {
            Some(total) => format!("Page {} of {total}", self.page),
            None => format!("Page {}", self.page),
        };
        let mut footer = styled(label, Style::new().with_font_size(FOOTER_PT))
            .aligned(Alignment::Right);
        footer.render(context, footer_area, style)?;

        area.set_height(content_height);
        Ok(area)
    }
}

fn build(
    title: &str,
    blocks: &[Block],
    fonts: &FontFamily<FontData>,
    footer: PageFooter,
) -> Result<Document> {
    let mut doc = Document::new(fonts.clone());
    doc.set_title(title);
    doc.set_font_size(BODY_PT);
    doc.set_line_spacing(1.2);
    doc.set_page_decorator(footer);
    for block in blocks {
        push_block(&mut doc, block)?;
    }
    Ok(doc)
}

/// Render `blocks` as a paginated PDF.
pub fn render_pdf(
    title: &str,
    blocks: &[Block],
    fonts: &FontFamily<FontData>,
) -> Result<RenderedDocument> {
    let counted = Arc::new(AtomicUsize::new(0));
    let first = PageFooter {
        page: 0,
        total: None,
        rendered: counted.clone(),
    };
    build(title, blocks, fonts, first)?.render(io::sink())?;
    let pages = counted.load(Ordering::SeqCst);

    let rendered = Arc::new(AtomicUsize::new(0));
    let second = PageFooter {
        page: 0,
        total: Some(pages),
        rendered: rendered.clone(),
    };
    let mut bytes = Vec::new();
    build(title, blocks, fonts, second)?.render(&mut bytes)?;

    Ok(RenderedDocument {
        bytes,
        pages: rendered.load(Ordering::SeqCst),
    })
}
