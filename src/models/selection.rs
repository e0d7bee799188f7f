//! User-owned selections made in the contextual and pedagogical stages.

use serde::{Deserialize, Serialize};

use super::enums::{BloomLevel, ClassLevel, Framework};

// ═══════════════════════════════════════════════════════════
// SelectionList: insertion-ordered set of strings
// ═══════════════════════════════════════════════════════════

/// Ordered set of strings. Order of first insertion is kept for display;
/// membership is exact string equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionList(Vec<String>);

impl SelectionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }

    /// Insert `value` at the end. Returns false if it was already present.
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.contains(&value) {
            return false;
        }
        self.0.push(value);
        true
    }

    pub fn remove(&mut self, value: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|v| v != value);
        self.0.len() != before
    }

    /// Add if absent, remove if present. Returns whether `value` is now selected.
    pub fn toggle(&mut self, value: &str) -> bool {
        if self.remove(value) {
            false
        } else {
            self.0.push(value.to_string());
            true
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for SelectionList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = Self::new();
        for value in iter {
            list.insert(value);
        }
        list
    }
}

/// Normalise free-text input for a custom entry. Empty after trimming is `None`.
fn normalize_custom(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// ═══════════════════════════════════════════════════════════
// Contextual stage
// ═══════════════════════════════════════════════════════════

/// Topics and class level chosen for the course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContextSelection {
    pub selected_topics: SelectionList,
    pub class_level: Option<ClassLevel>,
}

impl ContextSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for topic in topics {
            self.selected_topics.insert(topic);
        }
        self
    }

    pub fn with_class_level(mut self, level: ClassLevel) -> Self {
        self.class_level = Some(level);
        self
    }

    pub fn toggle_topic(&mut self, topic: &str) -> bool {
        self.selected_topics.toggle(topic)
    }

    /// Add a topic not offered by the analysis. The new topic is selected
    /// straight away; blank input and duplicates are ignored.
    pub fn add_custom_topic(&mut self, topic: &str) -> bool {
        match normalize_custom(topic) {
            Some(topic) => self.selected_topics.insert(topic),
            None => false,
        }
    }

    /// Selected topics that are not part of `offered`, in selection order.
    pub fn custom_topics<'a>(&'a self, offered: &[&str]) -> Vec<&'a str> {
        self.selected_topics
            .iter()
            .filter(|t| !offered.contains(t))
            .collect()
    }

    /// At least one topic and a class level.
    pub fn is_complete(&self) -> bool {
        !self.selected_topics.is_empty() && self.class_level.is_some()
    }
}

// ═══════════════════════════════════════════════════════════
// Pedagogical stage
// ═══════════════════════════════════════════════════════════

/// Selected Bloom levels. Always a prefix of [`BloomLevel::ALL`]: selecting a
/// level selects every level ranked below it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<BloomLevel>", into = "Vec<BloomLevel>")]
pub struct BloomSelection {
    /// Number of canonical levels selected, counted from `Remember`.
    depth: usize,
}

impl BloomSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every level up to and including `level`.
    pub fn up_to(level: BloomLevel) -> Self {
        Self {
            depth: level.index() + 1,
        }
    }

    /// Normalise an arbitrary set of levels to the prefix ending at its highest member.
    pub fn from_levels<I: IntoIterator<Item = BloomLevel>>(levels: I) -> Self {
        levels
            .into_iter()
            .max()
            .map(Self::up_to)
            .unwrap_or_default()
    }

    pub fn select(&mut self, level: BloomLevel) {
        self.depth = self.depth.max(level.index() + 1);
    }

    /// Deselect `level` and everything above it.
    pub fn deselect(&mut self, level: BloomLevel) {
        self.depth = self.depth.min(level.index());
    }

    pub fn toggle(&mut self, level: BloomLevel) {
        if self.contains(level) {
            self.deselect(level);
        } else {
            self.select(level);
        }
    }

    pub fn contains(&self, level: BloomLevel) -> bool {
        level.index() < self.depth
    }

    pub fn levels(&self) -> &'static [BloomLevel] {
        &BloomLevel::ALL[..self.depth]
    }

    pub fn highest(&self) -> Option<BloomLevel> {
        self.levels().last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.depth == 0
    }
}

impl From<Vec<BloomLevel>> for BloomSelection {
    fn from(levels: Vec<BloomLevel>) -> Self {
        Self::from_levels(levels)
    }
}

impl From<BloomSelection> for Vec<BloomLevel> {
    fn from(selection: BloomSelection) -> Self {
        selection.levels().to_vec()
    }
}

/// Learning objectives offered by the objectives service plus custom ones,
/// and the subset the educator has picked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectiveSelection {
    pub available: SelectionList,
    pub selected: SelectionList,
}

impl ObjectiveSelection {
    pub fn from_available<I, S>(objectives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            available: objectives.into_iter().collect(),
            selected: SelectionList::new(),
        }
    }

    /// Toggle an offered objective. Unknown objectives are ignored.
    pub fn toggle(&mut self, objective: &str) -> bool {
        if !self.available.contains(objective) {
            return false;
        }
        self.selected.toggle(objective)
    }

    /// Offer and select a custom objective. Blank input and duplicates are ignored.
    pub fn add_custom(&mut self, objective: &str) -> bool {
        let Some(objective) = normalize_custom(objective) else {
            return false;
        };
        if self.available.contains(objective) {
            return false;
        }
        self.available.insert(objective);
        self.selected.insert(objective);
        true
    }

    pub fn clear_all(&mut self) {
        self.selected.clear();
    }
}

/// Framework, Bloom levels and optional objectives chosen for the course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PedagogicalSelection {
    #[serde(default)]
    pub framework: Framework,
    pub bloom_levels: BloomSelection,
    #[serde(default)]
    pub objectives: SelectionList,
}

impl PedagogicalSelection {
    pub fn new(bloom_levels: BloomSelection) -> Self {
        Self {
            framework: Framework::default(),
            bloom_levels,
            objectives: SelectionList::new(),
        }
    }

    pub fn with_objectives(mut self, objectives: &SelectionList) -> Self {
        self.objectives = objectives.clone();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_list_keeps_insertion_order() {
        let mut list = SelectionList::new();
        assert!(list.insert("b"));
        assert!(list.insert("a"));
        assert!(!list.insert("b"));
        assert_eq!(list.as_slice(), &["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut list = SelectionList::new();
        assert!(list.toggle("x"));
        assert!(list.contains("x"));
        assert!(!list.toggle("x"));
        assert!(list.is_empty());
    }

    #[test]
    fn custom_topic_trimmed_and_deduplicated() {
        let mut ctx = ContextSelection::new().with_topics(["Cells"]);
        assert!(ctx.add_custom_topic("  Genetics "));
        assert!(!ctx.add_custom_topic("Genetics"));
        assert!(!ctx.add_custom_topic("Cells"));
        assert!(!ctx.add_custom_topic("   "));
        assert_eq!(ctx.selected_topics.len(), 2);
        assert_eq!(ctx.custom_topics(&["Cells", "Atoms"]), vec!["Genetics"]);
    }

    #[test]
    fn context_completeness_needs_topics_and_level() {
        let ctx = ContextSelection::new().with_topics(["Cells"]);
        assert!(!ctx.is_complete());
        let ctx = ctx.with_class_level(ClassLevel::High);
        assert!(ctx.is_complete());
        let empty = ContextSelection::new().with_class_level(ClassLevel::High);
        assert!(!empty.is_complete());
    }

    #[test]
    fn selecting_a_level_fills_the_prefix() {
        let mut bloom = BloomSelection::new();
        bloom.select(BloomLevel::Remember);
        bloom.select(BloomLevel::Understand);
        bloom.select(BloomLevel::Apply);
        assert_eq!(
            bloom.levels(),
            &[BloomLevel::Remember, BloomLevel::Understand, BloomLevel::Apply]
        );

        let mut jump = BloomSelection::new();
        jump.select(BloomLevel::Evaluate);
        assert_eq!(jump.levels().len(), 5);
        assert!(jump.contains(BloomLevel::Remember));
    }

    #[test]
    fn deselecting_truncates() {
        let mut bloom = BloomSelection::up_to(BloomLevel::Create);
        bloom.deselect(BloomLevel::Apply);
        assert_eq!(bloom.highest(), Some(BloomLevel::Understand));
        bloom.toggle(BloomLevel::Remember);
        assert!(bloom.is_empty());
        bloom.toggle(BloomLevel::Analyse);
        assert_eq!(bloom.highest(), Some(BloomLevel::Analyse));
    }

    #[test]
    fn arbitrary_levels_normalised_to_prefix() {
        let bloom = BloomSelection::from_levels([BloomLevel::Apply, BloomLevel::Remember]);
        assert_eq!(bloom, BloomSelection::up_to(BloomLevel::Apply));
        assert!(BloomSelection::from_levels([]).is_empty());
    }

    #[test]
    fn bloom_selection_serde_normalises() {
        let bloom: BloomSelection = serde_json::from_str(r#"["Analyse"]"#).unwrap();
        assert_eq!(bloom.levels().len(), 4);
        let json = serde_json::to_string(&BloomSelection::up_to(BloomLevel::Understand)).unwrap();
        assert_eq!(json, r#"["Remember","Understand"]"#);
    }

    #[test]
    fn objectives_custom_entry_selected_immediately() {
        let mut objectives = ObjectiveSelection::from_available(["Define osmosis"]);
        assert!(objectives.add_custom("Compare cell types"));
        assert!(objectives.selected.contains("Compare cell types"));
        assert!(!objectives.add_custom("Compare cell types"));
        assert!(!objectives.add_custom("Define osmosis"));
        assert_eq!(objectives.available.len(), 2);
    }

    #[test]
    fn objectives_toggle_and_clear() {
        let mut objectives = ObjectiveSelection::from_available(["A", "B"]);
        assert!(objectives.toggle("A"));
        assert!(!objectives.toggle("C"));
        assert_eq!(objectives.selected.len(), 1);
        objectives.clear_all();
        assert!(objectives.selected.is_empty());
        assert_eq!(objectives.available.len(), 2);
    }
}
