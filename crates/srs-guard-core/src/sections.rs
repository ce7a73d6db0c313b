//! Section filter for SRS documents.
//!
//! Keeps only the subsections that describe what a project is and does
//! (purpose, scope, perspective, functions, features) and discards the
//! rest: interface specs, hardware constraints, legal text, glossaries.
//!
//! # Headings
//!
//! A line that starts with a section number (`3`, `2.2`, `4.1.3.`) followed
//! by a short title is a candidate heading. Titles that end in a period are
//! sentences, not headings. Table of contents lines are not headings because
//! they carry dot leaders (`1.1 Purpose ........ 1`).
//!
//! Only headings listed in [`KEPT_SECTIONS`] open a kept section. A kept
//! section's body runs to the next heading that is its sibling or ancestor,
//! or to the end of the text. Nested headings (`4.1.1` under `4.1`) stay in
//! the body.
//!
//! A single-level number (`3`, `3.`) is a chapter heading only when it is
//! the next chapter in sequence. Inside a kept section a run of `1.`, `2.`,
//! `3.` is a numbered list and stays in the body, even when an item number
//! collides with the next chapter.

/// A recognized SRS subsection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Purpose,
    ProductScope,
    ProductPerspective,
    ProductFunctions,
    SystemFeatures,
}

/// Ordered table of `(number, title, kind)` for the sections that are kept.
pub const KEPT_SECTIONS: &[(&str, &str, SectionKind)] = &[
    ("1.1", "purpose", SectionKind::Purpose),
    ("1.4", "product scope", SectionKind::ProductScope),
    ("2.1", "product perspective", SectionKind::ProductPerspective),
    ("2.2", "product functions", SectionKind::ProductFunctions),
    ("4.1", "system features", SectionKind::SystemFeatures),
];

/// Headings with longer titles are treated as prose.
const MAX_TITLE_WORDS: usize = 8;

/// Result of [`filter_sections`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredText {
    /// Kept section bodies in document order, separated by a blank line.
    pub text: String,
    /// Which sections contributed to `text`, in document order.
    pub sections: Vec<SectionKind>,
}

impl FilteredText {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

struct Heading<'a> {
    number: &'a str,
    title: String,
}

impl Heading<'_> {
    /// Chapter number of a single-level heading (`3 Title`).
    fn top_level(&self) -> Option<u32> {
        if self.number.contains('.') {
            return None;
        }
        self.number.parse().ok()
    }

    fn chapter(&self) -> Option<u32> {
        self.number.split('.').next()?.parse().ok()
    }

    /// True when this heading is nested under section `parent`.
    fn is_within(&self, parent: &str) -> bool {
        self.number
            .strip_prefix(parent)
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

/// Parse a line as a numbered heading.
fn parse_heading(line: &str) -> Option<Heading<'_>> {
    let line = line.trim();
    let split = line.find(char::is_whitespace)?;
    let (number, rest) = line.split_at(split);
    let number = number.strip_suffix('.').unwrap_or(number);

    if number.is_empty()
        || !number
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }

    let title = rest.trim();
    if !title.chars().next().is_some_and(char::is_alphabetic)
        || title.contains("..")
        || title.ends_with('.')
    {
        return None;
    }

    let words: Vec<&str> = title.split_whitespace().collect();
    if words.len() > MAX_TITLE_WORDS {
        return None;
    }

    Some(Heading {
        number,
        title: words.join(" ").to_lowercase(),
    })
}

fn kept_section(heading: &Heading<'_>) -> Option<(&'static str, SectionKind)> {
    KEPT_SECTIONS
        .iter()
        .find(|(number, title, _)| *number == heading.number && *title == heading.title)
        .map(|(number, _, kind)| (*number, *kind))
}

/// A kept section whose body is still being collected.
struct OpenSection<'a> {
    kind: SectionKind,
    number: &'static str,
    lines: Vec<&'a str>,
    /// Number the next item of a running `1.`, `2.` list would carry.
    list_next: Option<u32>,
}

impl<'a> OpenSection<'a> {
    /// Take `heading` into the body if it belongs to this section. Returns
    /// false when it is a heading of its own.
    fn absorb(&mut self, line: &'a str, heading: &Heading<'_>) -> bool {
        if heading.is_within(self.number) {
            self.lines.push(line);
            return true;
        }
        if let Some(n) = heading.top_level() {
            if self.list_next.map_or(n == 1, |next| next == n) {
                self.list_next = Some(n + 1);
                self.lines.push(line);
                return true;
            }
        }
        false
    }
}

/// Select the kept sections from raw extracted text.
///
/// Pure function: identical input always yields identical output. An empty
/// result means no kept section with a non-empty body was found.
pub fn filter_sections(raw_text: &str) -> FilteredText {
    let mut filtered = FilteredText {
        text: String::new(),
        sections: Vec::new(),
    };
    let mut current: Option<OpenSection<'_>> = None;
    let mut chapter: Option<u32> = None;

    for line in raw_text.lines() {
        let Some(heading) = parse_heading(line) else {
            if let Some(open) = current.as_mut() {
                open.lines.push(line);
            }
            continue;
        };

        if let Some(open) = current.as_mut() {
            if open.absorb(line, &heading) {
                continue;
            }
        }

        // Out-of-sequence single-level numbers are list items or prose.
        if let Some(n) = heading.top_level() {
            if n != chapter.map_or(1, |c| c + 1) {
                if let Some(open) = current.as_mut() {
                    open.lines.push(line);
                }
                continue;
            }
        }

        chapter = heading.chapter().or(chapter);
        close_section(current.take(), &mut filtered);
        current = kept_section(&heading).map(|(number, kind)| OpenSection {
            kind,
            number,
            lines: Vec::new(),
            list_next: None,
        });
    }
    close_section(current, &mut filtered);

    filtered
}

fn close_section(section: Option<OpenSection<'_>>, out: &mut FilteredText) {
    let Some(section) = section else {
        return;
    };
    let body = section.lines.join("\n");
    let body = body.trim();
    if body.is_empty() {
        return;
    }
    if !out.text.is_empty() {
        out.text.push_str("\n\n");
    }
    out.text.push_str(body);
    out.sections.push(section.kind);
}
