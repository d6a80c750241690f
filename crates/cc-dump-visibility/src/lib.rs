//! Visibility engine: the 3-level-per-category × collapsed/expanded state
//! machine that decides, for any block, which of the five renderer states
//! applies.
//!
//! [`CategoryLevel`] is the coarse per-category state a hotkey cycles
//! through (EXISTENCE -> SUMMARY -> FULL -> EXISTENCE). [`VisState`] is the
//! fully resolved five-value state a block actually renders at, combining
//! the category's level with that block's own collapsed/expanded override.

use std::collections::HashMap;

use cc_dump_block_ir::Category;
use serde::{Deserialize, Serialize};

/// The five states a block can resolve to. `HIDDEN` renders nothing;
/// the rest select a distinct renderer per spec §4.5's block × VisState
/// matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisState {
    Hidden,
    SummaryCollapsed,
    SummaryExpanded,
    FullCollapsed,
    FullExpanded,
}

impl VisState {
    /// Global line-limit policy: the single source of truth every renderer
    /// must respect. Individual renderers may emit fewer lines but must
    /// never exceed this.
    pub fn line_limit(self) -> Option<usize> {
        match self {
            VisState::Hidden => Some(0),
            VisState::SummaryCollapsed => Some(3),
            VisState::SummaryExpanded => Some(8),
            VisState::FullCollapsed => Some(5),
            VisState::FullExpanded => None,
        }
    }
}

/// The coarse per-category cycle state. Combined with a block's own
/// expanded/collapsed override to produce a [`VisState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryLevel {
    Existence,
    Summary,
    Full,
}

impl CategoryLevel {
    pub fn cycle_next(self) -> CategoryLevel {
        match self {
            CategoryLevel::Existence => CategoryLevel::Summary,
            CategoryLevel::Summary => CategoryLevel::Full,
            CategoryLevel::Full => CategoryLevel::Existence,
        }
    }

    /// Resolves this level plus a per-block expanded override into a
    /// concrete [`VisState`]. `Summary` defaults collapsed; `Full` defaults
    /// expanded — matching the spec's framing that USER/ASSISTANT default
    /// to FULL meaning their content renders in full by default.
    fn resolve(self, block_expanded_override: Option<bool>) -> VisState {
        match self {
            CategoryLevel::Existence => VisState::Hidden,
            CategoryLevel::Summary => {
                if block_expanded_override.unwrap_or(false) {
                    VisState::SummaryExpanded
                } else {
                    VisState::SummaryCollapsed
                }
            }
            CategoryLevel::Full => {
                if block_expanded_override.unwrap_or(true) {
                    VisState::FullExpanded
                } else {
                    VisState::FullCollapsed
                }
            }
        }
    }
}

fn default_level(category: Category) -> CategoryLevel {
    match category {
        Category::User | Category::Assistant => CategoryLevel::Full,
        Category::Tools | Category::System => CategoryLevel::Summary,
        Category::Headers | Category::Metadata | Category::Budget => CategoryLevel::Existence,
        Category::Thinking => CategoryLevel::Summary,
        Category::AlwaysVisible => CategoryLevel::Full,
    }
}

/// Per-session visibility state: one [`CategoryLevel`] per category.
#[derive(Debug, Clone)]
pub struct VisibilityEngine {
    levels: HashMap<Category, CategoryLevel>,
}

impl Default for VisibilityEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityEngine {
    pub fn new() -> Self {
        let categories = [
            Category::Headers,
            Category::User,
            Category::Assistant,
            Category::Tools,
            Category::System,
            Category::Metadata,
            Category::Budget,
            Category::Thinking,
            Category::AlwaysVisible,
        ];
        let levels = categories.into_iter().map(|c| (c, default_level(c))).collect();
        Self { levels }
    }

    pub fn level_of(&self, category: Category) -> CategoryLevel {
        self.levels.get(&category).copied().unwrap_or(CategoryLevel::Summary)
    }

    /// Advances a category's level: EXISTENCE -> SUMMARY -> FULL -> EXISTENCE.
    /// The caller is responsible for clearing per-block overrides in that
    /// category afterward (IDR5), since those overrides live in the
    /// view-override store, not here.
    pub fn cycle(&mut self, category: Category) -> CategoryLevel {
        let next = self.level_of(category).cycle_next();
        self.levels.insert(category, next);
        next
    }

    /// The single enforcement point translating a block's category,
    /// per-block override, and any search-forced override into a concrete
    /// [`VisState`]. `force_visible` wins outright; otherwise the category
    /// level combines with `block_expanded_override`.
    pub fn resolve(
        &self,
        category: Category,
        block_expanded_override: Option<bool>,
        force_visible: Option<VisState>,
    ) -> VisState {
        if let Some(forced) = force_visible {
            return forced;
        }
        self.level_of(category).resolve(block_expanded_override)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_match_spec() {
        let engine = VisibilityEngine::new();
        assert_eq!(engine.level_of(Category::User), CategoryLevel::Full);
        assert_eq!(engine.level_of(Category::Assistant), CategoryLevel::Full);
        assert_eq!(engine.level_of(Category::Tools), CategoryLevel::Summary);
        assert_eq!(engine.level_of(Category::System), CategoryLevel::Summary);
        assert_eq!(engine.level_of(Category::Headers), CategoryLevel::Existence);
        assert_eq!(engine.level_of(Category::Metadata), CategoryLevel::Existence);
        assert_eq!(engine.level_of(Category::Budget), CategoryLevel::Existence);
        assert_eq!(engine.level_of(Category::Thinking), CategoryLevel::Summary);
    }

    #[test]
    fn cycle_wraps_around() {
        let mut engine = VisibilityEngine::new();
        assert_eq!(engine.cycle(Category::Headers), CategoryLevel::Summary);
        assert_eq!(engine.cycle(Category::Headers), CategoryLevel::Full);
        assert_eq!(engine.cycle(Category::Headers), CategoryLevel::Existence);
    }

    #[test]
    fn force_visible_overrides_category_level() {
        let engine = VisibilityEngine::new();
        let resolved = engine.resolve(Category::Headers, None, Some(VisState::FullExpanded));
        assert_eq!(resolved, VisState::FullExpanded);
    }

    #[test]
    fn line_limits_match_spec_table() {
        assert_eq!(VisState::Hidden.line_limit(), Some(0));
        assert_eq!(VisState::SummaryCollapsed.line_limit(), Some(3));
        assert_eq!(VisState::SummaryExpanded.line_limit(), Some(8));
        assert_eq!(VisState::FullCollapsed.line_limit(), Some(5));
        assert_eq!(VisState::FullExpanded.line_limit(), None);
    }
}
