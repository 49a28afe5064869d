//! Kit export: renders the finalized question set, grouped by competency,
//! into a paginated PDF artifact.

use anyhow::Result;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

// US Letter, points.
const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN_LEFT: i64 = 50;
const RUBRIC_INDENT: i64 = 60;
const TOP_Y: f32 = 760.0;
const BOTTOM_Y: f32 = 60.0;

const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);
const DARK_GRAY: (f32, f32, f32) = (0.2, 0.2, 0.2);
const GOOD_GREEN: (f32, f32, f32) = (0.0, 0.4, 0.0);
const BAD_RED: (f32, f32, f32) = (0.6, 0.0, 0.0);

/// One competency group of the export, questions in review order.
#[derive(Debug, Clone)]
pub struct ExportSection {
    pub competency: String,
    pub questions: Vec<ExportQuestion>,
}

#[derive(Debug, Clone)]
pub struct ExportQuestion {
    pub text: String,
    pub rubric_good: String,
    pub rubric_bad: String,
}

/// Download filename: whitespace runs in the title collapse to underscores.
pub fn export_file_name(job_title: &str) -> String {
    let stem: Vec<&str> = job_title.split_whitespace().collect();
    format!("{}_Interview_Kit.pdf", stem.join("_"))
}

struct PdfWriter {
    doc: Document,
    pages_id: lopdf::ObjectId,
    page_ids: Vec<lopdf::ObjectId>,
    ops: Vec<Operation>,
    y: f32,
}

impl PdfWriter {
    fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        PdfWriter {
            doc,
            pages_id,
            page_ids: Vec::new(),
            ops: Vec::new(),
            y: TOP_Y,
        }
    }

    /// Flushes accumulated operations into a page object.
    fn finish_page(&mut self) {
        let content = Content {
            operations: std::mem::take(&mut self.ops),
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode().unwrap_or_default()));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
        });
        self.page_ids.push(page_id);
        self.y = TOP_Y;
    }

    /// Starts a fresh page when fewer than `needed` points remain.
    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < BOTTOM_Y && !self.ops.is_empty() {
            self.finish_page();
        }
    }

    fn line(&mut self, font: &str, size: i64, x: i64, color: (f32, f32, f32), text: &str) {
        let (r, g, b) = color;
        self.ops.push(Operation::new("BT", vec![]));
        self.ops
            .push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.ops.push(Operation::new(
            "rg",
            vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        ));
        self.ops
            .push(Operation::new("Td", vec![x.into(), Object::Real(self.y)]));
        self.ops
            .push(Operation::new("Tj", vec![Object::string_literal(text)]));
        self.ops.push(Operation::new("ET", vec![]));
    }

    /// Writes wrapped text, breaking pages between lines as needed.
    fn paragraph(
        &mut self,
        font: &str,
        size: i64,
        x: i64,
        color: (f32, f32, f32),
        line_height: f32,
        text: &str,
    ) {
        let max_chars = chars_per_line(size, x);
        for line in wrap_text(text, max_chars) {
            self.ensure_room(line_height);
            self.line(font, size, x, color, &line);
            self.y -= line_height;
        }
    }

    fn gap(&mut self, points: f32) {
        self.y -= points;
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        if !self.ops.is_empty() || self.page_ids.is_empty() {
            self.finish_page();
        }

        let font_id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let bold_id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let resources_id = self.doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id, "F2" => bold_id },
        });

        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let count = self.page_ids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

/// Renders the export artifact. Layout: title header, a section per
/// competency, numbered questions with good/bad rubric lines beneath each.
pub fn render_kit_pdf(job_title: &str, sections: &[ExportSection]) -> Result<Vec<u8>> {
    let mut writer = PdfWriter::new();

    writer.paragraph(
        "F2",
        20,
        MARGIN_LEFT,
        BLACK,
        26.0,
        &format!("Interview Kit: {job_title}"),
    );
    writer.gap(10.0);

    for section in sections {
        // Keep a section header together with at least one question line.
        writer.ensure_room(60.0);
        writer.paragraph("F2", 16, MARGIN_LEFT, BLACK, 21.0, &section.competency);
        writer.gap(4.0);

        for (index, question) in section.questions.iter().enumerate() {
            writer.ensure_room(50.0);
            writer.paragraph(
                "F1",
                12,
                MARGIN_LEFT,
                DARK_GRAY,
                16.0,
                &format!("{}. {}", index + 1, question.text),
            );
            writer.paragraph(
                "F1",
                10,
                RUBRIC_INDENT,
                GOOD_GREEN,
                13.0,
                &format!("Good: {}", question.rubric_good),
            );
            writer.paragraph(
                "F1",
                10,
                RUBRIC_INDENT,
                BAD_RED,
                13.0,
                &format!("Bad: {}", question.rubric_bad),
            );
            writer.gap(8.0);
        }
        writer.gap(6.0);
    }

    writer.finish()
}

/// Approximate column capacity for the Helvetica metrics in play.
fn chars_per_line(font_size: i64, x: i64) -> usize {
    let usable = (PAGE_WIDTH - x - MARGIN_LEFT) as f32;
    (usable / (font_size as f32 * 0.5)).max(10.0) as usize
}

/// Greedy word wrap; words longer than a line are hard-split.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let mut rest: &str = word;
            while rest.len() > max_chars {
                let split = rest
                    .char_indices()
                    .nth(max_chars)
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                lines.push(rest[..split].to_string());
                rest = &rest[split..];
            }
            current = rest.to_string();
            continue;
        }
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
