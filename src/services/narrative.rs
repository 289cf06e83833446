//! Parsing the fused narrative into a product sheet.
//!
//! Three sections are recognized, in any order: Title (Titre), Description
//! and Technical Sheet (Fiche Technique). Headers may be bold, bulleted,
//! numbered (`1.`, `2)`) or Markdown headings and use `:` or `-` as
//! separator. A section runs until
//! the next recognized header or the end of the text.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::ProductSheet;

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t>#*\-]*(?:\d+[.)][ \t]*)?(?:\*\*)?[ \t]*(titre|title|description|fiche[ \t]+technique|technical[ \t]+sheet)[ \t]*(?:\*\*[ \t]*)?(?:[:\-–][ \t]*(?:\*\*)?|$)[ \t]*",
    )
    .unwrap()
});

static SHEET_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:[-*•][ \t]+)?(?:\*\*)?(?P<label>[^:\n*]+?)(?:\*\*)?[ \t]*(?::|[ \t][-–][ \t])(?:\*\*)?[ \t]*(?P<value>.*?)[ \t]*$",
    )
    .unwrap()
});

const PLACEHOLDERS: &[&str] = &["non precise", "non precisee", "not specified", "n/a"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Title,
    Description,
    TechnicalSheet,
}

impl Section {
    fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.starts_with("tit") {
            Section::Title
        } else if label.starts_with("desc") {
            Section::Description
        } else {
            Section::TechnicalSheet
        }
    }
}

/// Sections extracted from a narrative. Missing sections are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedNarrative {
    pub title: String,
    pub description: String,
    /// Raw block, bullet structure preserved.
    pub technical_sheet: String,
}

impl ParsedNarrative {
    /// Build the product sheet, mapping the technical block onto attributes.
    pub fn into_sheet(self, narrative: &str) -> ProductSheet {
        let fields = TechnicalSheet::from_block(&self.technical_sheet);
        ProductSheet {
            title: self.title,
            description: self.description,
            brand: fields.brand,
            model: fields.model,
            power: fields.power,
            dimensions: fields.dimensions,
            ip_rating: fields.ip_rating,
            serial_number: fields.serial_number,
            certifications: fields.certifications,
            country_of_manufacture: fields.country_of_manufacture,
            narrative_summary: Some(narrative.to_string()).filter(|n| !n.trim().is_empty()),
        }
    }
}

/// Extracts the labeled sections of a narrative. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NarrativeParser;

impl NarrativeParser {
    pub fn parse(&self, narrative: &str) -> ParsedNarrative {
        let headers: Vec<_> = SECTION_HEADER
            .captures_iter(narrative)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let label = caps.get(1)?;
                Some((Section::from_label(label.as_str()), whole.start(), whole.end()))
            })
            .collect();

        let mut parsed = ParsedNarrative::default();
        let mut seen = Vec::with_capacity(3);

        for (i, &(section, _, body_start)) in headers.iter().enumerate() {
            if seen.contains(&section) {
                continue;
            }
            seen.push(section);

            let body_end = headers
                .get(i + 1)
                .map(|&(_, start, _)| start)
                .unwrap_or(narrative.len());
            let body = &narrative[body_start..body_end];

            match section {
                Section::Title => parsed.title = first_line(body),
                Section::Description => parsed.description = first_line(body),
                Section::TechnicalSheet => parsed.technical_sheet = body.trim().to_string(),
            }
        }

        parsed
    }
}

fn first_line(body: &str) -> String {
    body.lines()
        .map(strip_decoration)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn strip_decoration(line: &str) -> &str {
    line.trim().trim_matches('*').trim()
}

/// Product attributes read from the technical-sheet bullets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TechnicalSheet {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub power: Option<String>,
    pub dimensions: Option<String>,
    pub ip_rating: Option<String>,
    pub serial_number: Option<String>,
    pub certifications: Option<String>,
    pub country_of_manufacture: Option<String>,
}

impl TechnicalSheet {
    /// Map `- **Label** : value` lines onto attributes. The first occurrence
    /// of a label wins; placeholder values ("Non précisé") are unknown.
    pub fn from_block(block: &str) -> Self {
        let mut sheet = Self::default();

        for caps in SHEET_ENTRY.captures_iter(block) {
            let (Some(label), Some(value)) = (caps.name("label"), caps.name("value")) else {
                continue;
            };
            let Some(slot) = sheet.slot(&normalize(label.as_str())) else {
                continue;
            };
            if slot.is_some() {
                continue;
            }
            *slot = clean_value(value.as_str());
        }

        sheet
    }

    fn slot(&mut self, label: &str) -> Option<&mut Option<String>> {
        // Drop qualifiers such as "(Watts, Volts, Hertz)".
        let label = label.split('(').next().unwrap_or(label).trim();

        let slot = if label.starts_with("marque") || label.starts_with("brand") {
            &mut self.brand
        } else if label.starts_with("model") {
            &mut self.model
        } else if label.starts_with("puissance") || label.starts_with("power") {
            &mut self.power
        } else if label.starts_with("dimension") {
            &mut self.dimensions
        } else if label == "ip"
            || label.starts_with("indice de protection")
            || label.starts_with("protection rating")
        {
            &mut self.ip_rating
        } else if label.starts_with("numero de serie")
            || label.starts_with("n° de serie")
            || label.starts_with("serial number")
        {
            &mut self.serial_number
        } else if label.starts_with("certification") || label.starts_with("normes") {
            &mut self.certifications
        } else if label.starts_with("pays")
            || label.starts_with("lieu de fabrication")
            || label.starts_with("country")
        {
            &mut self.country_of_manufacture
        } else {
            return None;
        };
        Some(slot)
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' => 'a',
            'î' | 'ï' => 'i',
            'ô' => 'o',
            'ù' | 'û' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

fn clean_value(value: &str) -> Option<String> {
    let value = value.trim().trim_matches('*').trim();
    let key = normalize(value);
    let key = key.trim_end_matches('.').trim();
    if key.is_empty() || PLACEHOLDERS.contains(&key) {
        None
    } else {
        Some(value.to_string())
    }
}
