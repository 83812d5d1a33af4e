use super::types::Rendition;

/// Sort key for a rendition label.
///
/// Variant order matters: every non-numeric label (`"source"`, `"original"`)
/// ranks above any resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualityKey {
    Resolution(u32),
    Source,
}

impl QualityKey {
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        let digits = trimmed
            .strip_suffix('p')
            .or_else(|| trimmed.strip_suffix('P'))
            .unwrap_or(trimmed);
        match digits.parse::<u32>() {
            Ok(height) => QualityKey::Resolution(height),
            Err(_) => QualityKey::Source,
        }
    }
}

impl Rendition {
    pub fn quality_key(&self) -> QualityKey {
        QualityKey::from_label(&self.label)
    }
}

/// Pick the best rendition to download. `None` only for an empty slice.
pub fn select_rendition(renditions: &[Rendition]) -> Option<&Rendition> {
    renditions.iter().max_by_key(|r| r.quality_key())
}
