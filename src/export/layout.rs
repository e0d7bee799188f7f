//! Page layout for exported documents, independent of the PDF backend.
//!
//! A document becomes a list of sections in a fixed order. Sections are
//! placed top to bottom; a section that does not fit in the space left on
//! the current page starts a fresh page. A section taller than a whole page
//! continues across pages.

use serde::Serialize;

use crate::models::{CoursePlan, Document, Syllabus};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const LEFT_MARGIN_MM: f32 = 20.0;
pub const TOP_Y_MM: f32 = 277.0;
pub const BOTTOM_Y_MM: f32 = 20.0;
pub const SECTION_GAP_MM: f32 = 4.0;

const TITLE_WRAP: usize = 55;
const BODY_WRAP: usize = 90;
const ITEM_WRAP: usize = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextStyle {
    Title,
    Heading,
    Body,
}

impl TextStyle {
    pub fn font_size(&self) -> f32 {
        match self {
            Self::Title => 16.0,
            Self::Heading => 12.0,
            Self::Body => 10.0,
        }
    }

    pub fn line_height_mm(&self) -> f32 {
        match self {
            Self::Title => 9.0,
            Self::Heading => 7.0,
            Self::Body => 5.0,
        }
    }

    pub fn is_bold(&self) -> bool {
        !matches!(self, Self::Body)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub text: String,
    pub style: TextStyle,
    pub indent_mm: f32,
}

impl Line {
    fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
            indent_mm: 0.0,
        }
    }

    fn indented(mut self, indent_mm: f32) -> Self {
        self.indent_mm = indent_mm;
        self
    }
}

/// A block that should stay on one page when it fits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub name: String,
    pub lines: Vec<Line>,
}

impl Section {
    pub fn height_mm(&self) -> f32 {
        self.lines.iter().map(|l| l.style.line_height_mm()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLine {
    pub text: String,
    pub style: TextStyle,
    pub x_mm: f32,
    pub y_mm: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub lines: Vec<PlacedLine>,
}

/// Word wrap at `max_chars` characters per line.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = current.chars().count() + word.chars().count() + 1;
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn wrapped(text: &str, style: TextStyle, max_chars: usize, indent_mm: f32) -> Vec<Line> {
    wrap_text(text, max_chars)
        .into_iter()
        .map(|l| Line::new(l, style).indented(indent_mm))
        .collect()
}

fn bullets(items: &[String]) -> Vec<Line> {
    items
        .iter()
        .flat_map(|item| {
            let mut lines = wrapped(item, TextStyle::Body, ITEM_WRAP, 8.0);
            if let Some(first) = lines.first_mut() {
                first.text = format!("\u{2022} {}", first.text);
                first.indent_mm = 5.0;
            }
            lines
        })
        .collect()
}

fn list_section(name: &str, items: &[String]) -> Option<Section> {
    if items.is_empty() {
        return None;
    }
    let mut lines = vec![Line::new(name, TextStyle::Heading)];
    lines.extend(bullets(items));
    Some(Section {
        name: name.to_string(),
        lines,
    })
}

/// Title, description, outcomes, goals, topics, prerequisites.
pub fn syllabus_sections(syllabus: &Syllabus) -> Vec<Section> {
    let mut sections = vec![Section {
        name: "Title".into(),
        lines: wrapped(&syllabus.course_title, TextStyle::Title, TITLE_WRAP, 0.0),
    }];

    if !syllabus.course_description.trim().is_empty() {
        let mut lines = vec![Line::new("Course Description", TextStyle::Heading)];
        lines.extend(wrapped(&syllabus.course_description, TextStyle::Body, BODY_WRAP, 0.0));
        sections.push(Section {
            name: "Course Description".into(),
            lines,
        });
    }

    sections.extend(list_section("Learning Outcomes", &syllabus.learning_outcomes));
    sections.extend(list_section("Course Goals", &syllabus.course_goals));

    if !syllabus.course_topics.is_empty() {
        let mut lines = vec![Line::new("Course Topics", TextStyle::Heading)];
        for entry in &syllabus.course_topics {
            lines.extend(bullets(std::slice::from_ref(&entry.topic)));
            if !entry.description.trim().is_empty() {
                lines.extend(wrapped(&entry.description, TextStyle::Body, ITEM_WRAP, 8.0));
            }
        }
        sections.push(Section {
            name: "Course Topics".into(),
            lines,
        });
    }

    sections.extend(list_section("Prerequisites", &syllabus.prerequisites));
    sections.retain(|s| !s.lines.is_empty());
    sections
}

/// Title followed by one section per lecture.
pub fn course_plan_sections(plan: &CoursePlan) -> Vec<Section> {
    let mut sections = vec![Section {
        name: "Title".into(),
        lines: vec![Line::new("Course Plan", TextStyle::Title)],
    }];
    for (i, lecture) in plan.plan.iter().enumerate() {
        let heading = if lecture.title.trim().is_empty() {
            format!("Lecture {}", i + 1)
        } else {
            format!("Lecture {}: {}", i + 1, lecture.title)
        };
        let mut lines = wrapped(&heading, TextStyle::Heading, TITLE_WRAP + 20, 0.0);
        lines.extend(bullets(&lecture.topics));
        sections.push(Section {
            name: heading,
            lines,
        });
    }
    sections
}

pub fn document_sections(document: &Document) -> Vec<Section> {
    match document {
        Document::Syllabus(s) => syllabus_sections(s),
        Document::CoursePlan(p) => course_plan_sections(p),
    }
}

/// Place sections on pages.
pub fn paginate(sections: &[Section]) -> Vec<Page> {
    let mut pages = vec![Page::default()];
    let mut y = TOP_Y_MM;

    for section in sections {
        let on_fresh_page = y >= TOP_Y_MM;
        if !on_fresh_page && y - section.height_mm() < BOTTOM_Y_MM {
            pages.push(Page::default());
            y = TOP_Y_MM;
        }

        for line in &section.lines {
            let height = line.style.line_height_mm();
            if y - height < BOTTOM_Y_MM && y < TOP_Y_MM {
                pages.push(Page::default());
                y = TOP_Y_MM;
            }
            if let Some(page) = pages.last_mut() {
                page.lines.push(PlacedLine {
                    text: line.text.clone(),
                    style: line.style,
                    x_mm: LEFT_MARGIN_MM + line.indent_mm,
                    y_mm: y,
                });
            }
            y -= height;
        }
        y -= SECTION_GAP_MM;
    }
    pages
}
