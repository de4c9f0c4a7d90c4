//! One slide to be exported.

use std::collections::HashSet;

use serde::Serialize;

use asipuc_model::settings::Resolution;
use asipuc_model::tally::Row;
use asipuc_model::template::TemplateId;
use asipuc_model::theme::Theme;

use crate::templates::render_slide;
use crate::tree::VisualTree;

/// Everything needed to render and name one exported slide.
#[derive(Debug, Clone, Serialize)]
pub struct ExportJob {
    /// Reporting unit name, or the accumulated sentinel.
    pub label: String,
    pub rows: Vec<Row>,
    pub total: u64,
    pub theme: Theme,
    pub template: TemplateId,
    pub resolution: Resolution,
    pub filename: String,
}

impl ExportJob {
    /// Lay the slide out with the job's template.
    pub fn render(&self) -> VisualTree {
        render_slide(
            self.template,
            &self.rows,
            self.total,
            &self.theme,
            self.resolution,
        )
    }
}

/// `{date}-{label}.{ext}` with whitespace runs in the label collapsed to `-`.
pub fn export_filename(date: &str, label: &str, extension: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut in_space = false;
    for ch in label.chars() {
        if ch.is_whitespace() {
            if !in_space {
                slug.push('-');
            }
            in_space = true;
        } else {
            slug.push(ch);
            in_space = false;
        }
    }
    format!("{date}-{slug}.{extension}")
}

/// Filenames already handed out in one batch.
///
/// A repeated name gets `-2`, `-3`, ... before its extension. Names are
/// compared case-insensitively.
#[derive(Debug, Default)]
pub struct FilenameSet {
    used: HashSet<String>,
}

impl FilenameSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `filename`, or the first free suffixed variant of it.
    pub fn claim(&mut self, filename: &str) -> String {
        if self.used.insert(filename.to_lowercase()) {
            return filename.to_string();
        }
        let (stem, extension) = match filename.rsplit_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (filename, None),
        };
        (2u32..)
            .map(|n| match extension {
                Some(ext) => format!("{stem}-{n}.{ext}"),
                None => format!("{stem}-{n}"),
            })
            .find(|candidate| self.used.insert(candidate.to_lowercase()))
            .unwrap_or_else(|| filename.to_string())
    }
}
