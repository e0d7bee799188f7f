use std::io::{BufWriter, Cursor};
use std::path::Path;

use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::*;

use super::layout::{document_sections, paginate, Page, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use super::{ExportError, Exporter};
use crate::models::Document;

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// PNG logo drawn in the top-right corner of the first page.
#[derive(Debug, Clone)]
pub struct LogoAsset {
    bytes: Vec<u8>,
}

impl LogoAsset {
    pub fn from_png_bytes(bytes: Vec<u8>) -> Result<Self, ExportError> {
        if !bytes.starts_with(&PNG_MAGIC) {
            return Err(ExportError::Logo("not a PNG image".into()));
        }
        Ok(Self { bytes })
    }

    pub fn from_file(path: &Path) -> Result<Self, ExportError> {
        Self::from_png_bytes(std::fs::read(path)?)
    }
}

/// Renders syllabi and course plans with `printpdf`.
#[derive(Debug, Clone, Default)]
pub struct PdfExporter {
    logo: Option<LogoAsset>,
}

impl PdfExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logo(mut self, logo: LogoAsset) -> Self {
        self.logo = Some(logo);
        self
    }

    fn draw_logo(&self, layer: &PdfLayerReference) -> Result<(), ExportError> {
        let Some(logo) = &self.logo else {
            return Ok(());
        };
        let decoder = PngDecoder::new(Cursor::new(logo.bytes.as_slice()))
            .map_err(|e| ExportError::Logo(e.to_string()))?;
        let image = Image::try_from(decoder).map_err(|e| ExportError::Logo(e.to_string()))?;
        image.add_to_layer(
            layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(PAGE_WIDTH_MM - 45.0)),
                translate_y: Some(Mm(PAGE_HEIGHT_MM - 25.0)),
                dpi: Some(300.0),
                ..Default::default()
            },
        );
        Ok(())
    }
}

fn document_title(document: &Document) -> String {
    match document {
        Document::Syllabus(s) if !s.course_title.trim().is_empty() => s.course_title.clone(),
        Document::Syllabus(_) => "Syllabus".into(),
        Document::CoursePlan(_) => "Course Plan".into(),
    }
}

/// `Intro to Biology` -> `intro-to-biology`
fn slug(text: &str) -> String {
    let mut out = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

impl Exporter for PdfExporter {
    fn export(&self, document: &Document) -> Result<Vec<u8>, ExportError> {
        if document.is_empty() {
            return Err(ExportError::EmptyDocument);
        }
        let pages: Vec<Page> = paginate(&document_sections(document));
        let title = document_title(document);

        let (doc, page1, layer1) =
            PdfDocument::new(&title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Pdf(format!("PDF font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ExportError::Pdf(format!("PDF font error: {e}")))?;

        for (i, page) in pages.iter().enumerate() {
            let layer = if i == 0 {
                doc.get_page(page1).get_layer(layer1)
            } else {
                let (index, layer) =
                    doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
                doc.get_page(index).get_layer(layer)
            };
            if i == 0 {
                self.draw_logo(&layer)?;
            }
            for line in &page.lines {
                let face = if line.style.is_bold() { &bold } else { &font };
                layer.use_text(
                    line.text.as_str(),
                    line.style.font_size(),
                    Mm(line.x_mm),
                    Mm(line.y_mm),
                    face,
                );
            }
        }

        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf)
            .map_err(|e| ExportError::Pdf(format!("PDF save error: {e}")))?;
        buf.into_inner()
            .map_err(|e| ExportError::Pdf(format!("PDF buffer error: {e}")))
    }

    fn file_name(&self, document: &Document) -> String {
        match document {
            Document::Syllabus(_) => {
                let name = slug(&document_title(document));
                format!("{name}-syllabus.pdf")
            }
            Document::CoursePlan(_) => "course-plan.pdf".into(),
        }
    }
}
