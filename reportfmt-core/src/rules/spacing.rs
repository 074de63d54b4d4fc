use crate::config::SpacingConfig;
use crate::types::{RoleTag, SpacingPoints, SpacingRule};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static DEFAULT_TABLE: LazyLock<SpacingTable> =
    LazyLock::new(|| SpacingTable::new(&SpacingConfig::default()));

/// Spacing rule for a role from the built-in table.
pub fn rule_for(tag: RoleTag) -> SpacingRule {
    DEFAULT_TABLE.rule_for(tag)
}

/// Role → spacing table plus the line-unit conversion and comparison tolerance.
#[derive(Debug, Clone)]
pub struct SpacingTable {
    rules: BTreeMap<RoleTag, SpacingRule>,
    points_per_line: f32,
    tolerance_points: f32,
}

impl Default for SpacingTable {
    fn default() -> Self {
        Self::new(&SpacingConfig::default())
    }
}

impl SpacingTable {
    pub fn new(config: &SpacingConfig) -> Self {
        Self {
            rules: config.rules.clone(),
            points_per_line: config.points_per_line,
            tolerance_points: config.tolerance_points,
        }
    }

    /// Total: roles without an entry use the paragraph rule, then no spacing.
    pub fn rule_for(&self, tag: RoleTag) -> SpacingRule {
        self.rules
            .get(&tag)
            .or_else(|| self.rules.get(&RoleTag::Paragraph))
            .copied()
            .unwrap_or(SpacingRule::NONE)
    }

    pub fn points_for(&self, tag: RoleTag) -> SpacingPoints {
        self.rule_for(tag).to_points(self.points_per_line)
    }

    pub fn to_points(&self, line_units: u32) -> f32 {
        line_units as f32 * self.points_per_line
    }

    pub fn points_per_line(&self) -> f32 {
        self.points_per_line
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance_points
    }

    /// True when `current` is further than the tolerance from `target`.
    pub fn needs_update(&self, current: f32, target: f32) -> bool {
        (current - target).abs() > self.tolerance_points
    }

    /// One line per configured role, for reports.
    pub fn describe(&self) -> Vec<String> {
        self.rules
            .iter()
            .map(|(role, rule)| {
                format!(
                    "{}: {} line(s) before, {} line(s) after",
                    role.description(),
                    rule.before,
                    rule.after
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_rules_in_points() {
        let table = SpacingTable::default();
        assert_eq!(
            table.points_for(RoleTag::ChapterHeading),
            SpacingPoints { before: 36.0, after: 18.0 }
        );
        assert_eq!(
            table.points_for(RoleTag::SectionHeading),
            SpacingPoints { before: 18.0, after: 0.0 }
        );
        assert_eq!(
            table.points_for(RoleTag::SubsectionHeading),
            SpacingPoints { before: 18.0, after: 0.0 }
        );
        assert_eq!(rule_for(RoleTag::FigureTableCaption), SpacingRule::new(1, 1));
    }

    #[test]
    fn missing_roles_fall_back_to_paragraph_rule() {
        assert_eq!(rule_for(RoleTag::Empty), SpacingRule::new(0, 0));

        let mut config = SpacingConfig::default();
        config.rules.remove(&RoleTag::QuoteBlock);
        config
            .rules
            .insert(RoleTag::Paragraph, SpacingRule::new(0, 1));
        let table = SpacingTable::new(&config);
        assert_eq!(table.rule_for(RoleTag::QuoteBlock), SpacingRule::new(0, 1));

        config.rules.clear();
        let table = SpacingTable::new(&config);
        assert_eq!(table.rule_for(RoleTag::ChapterHeading), SpacingRule::NONE);
    }

    #[test]
    fn tolerance_is_one_point() {
        let table = SpacingTable::default();
        assert!(!table.needs_update(36.5, 36.0));
        assert!(!table.needs_update(35.0, 36.0));
        assert!(table.needs_update(34.9, 36.0));
        assert!(table.needs_update(0.0, 18.0));
    }
}
