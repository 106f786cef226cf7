use crate::{utils, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Lines in the groups file that begin with this character name a group.
pub const GROUP_MARKER: char = '*';

/// Lines in the categories and groups files that begin with this character are ignored.
pub const COMMENT_MARKER: char = '#';

/// The group that receives categories listed before any group header in the groups file.
pub const UNGROUPED: &str = "Ungrouped";

/// The known categories and the group each of them belongs to.
///
/// Categories and groups keep the order in which they were first seen so that saving the
/// registry produces stable files. Every category that has been assigned a group belongs to
/// exactly one group.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct CategoryRegistry {
    categories: Vec<String>,
    groups: Vec<String>,
    group_to_categories: BTreeMap<String, Vec<String>>,
    category_to_group: BTreeMap<String, String>,
}

impl CategoryRegistry {
    /// Loads the category list from `categories` and the group layout from `groups`.
    pub fn load(categories: &Path, groups: &Path) -> Result<Self> {
        let mut registry = Self::default();
        registry.parse_categories(&utils::read(categories)?);
        registry.parse_groups(&utils::read(groups)?);
        Ok(registry)
    }

    /// Parses the contents of a categories file: one category per non-blank, non-comment line.
    pub fn parse_categories(&mut self, text: &str) {
        for line in content_lines(text) {
            self.add_category(line);
        }
    }

    /// Parses the contents of a groups file. Lines starting with `*` open a group and the lines
    /// that follow are its categories.
    pub fn parse_groups(&mut self, text: &str) {
        let mut current: Option<String> = None;
        for line in content_lines(text) {
            if let Some(name) = line.strip_prefix(GROUP_MARKER) {
                let name = name.trim().to_string();
                self.add_group(&name);
                current = Some(name);
            } else {
                let group = current.get_or_insert_with(|| UNGROUPED.to_string()).clone();
                self.assign_group(line, &group);
            }
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    pub fn group_of(&self, category: &str) -> Option<&str> {
        self.category_to_group.get(category).map(String::as_str)
    }

    pub fn categories_in(&self, group: &str) -> &[String] {
        self.group_to_categories
            .get(group)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Adds `category` to the list if it is not already there. Returns true if it was added.
    pub fn add_category(&mut self, category: &str) -> bool {
        if self.contains(category) {
            return false;
        }
        self.categories.push(category.to_string());
        true
    }

    /// Adds `group` if it is not already known. Returns true if it was added.
    pub fn add_group(&mut self, group: &str) -> bool {
        self.group_to_categories.entry(group.to_string()).or_default();
        if self.groups.iter().any(|g| g == group) {
            return false;
        }
        self.groups.push(group.to_string());
        true
    }

    /// Puts `category` into `group`, creating the group if needed. A category that already
    /// belongs to another group is moved.
    pub fn assign_group(&mut self, category: &str, group: &str) {
        self.add_group(group);
        if let Some(previous) = self.category_to_group.get(category).cloned() {
            if previous == group {
                return;
            }
            if let Some(members) = self.group_to_categories.get_mut(&previous) {
                members.retain(|c| c != category);
            }
        }
        self.group_to_categories
            .entry(group.to_string())
            .or_default()
            .push(category.to_string());
        self.category_to_group
            .insert(category.to_string(), group.to_string());
    }

    /// Renders the categories file.
    pub fn categories_text(&self) -> String {
        let mut text = self.categories.join("\n");
        text.push('\n');
        text
    }

    /// Renders the groups file: each group header followed by its categories, with a blank line
    /// between groups.
    pub fn groups_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        for group in &self.groups {
            lines.push(format!("{GROUP_MARKER}{group}"));
            lines.extend(self.categories_in(group).iter().cloned());
            lines.push(String::new());
        }
        let mut text = lines.join("\n").trim_end().to_string();
        text.push('\n');
        text
    }

    /// Writes both files, replacing each one only after it has been fully rendered.
    pub fn save(&self, categories: &Path, groups: &Path) -> Result<()> {
        utils::write_atomic(categories, self.categories_text())?;
        utils::write_atomic(groups, self.groups_text())
    }
}

fn content_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUPS: &str = "\
# household layout
Misc
*Food
Groceries
Restaurants

*Living
Rent
";

    #[test]
    fn test_parse_categories_skips_comments_and_blanks() {
        let mut registry = CategoryRegistry::default();
        registry.parse_categories("# header\nGroceries\n\n  Rent  \nGroceries\n");
        assert_eq!(registry.categories(), ["Groceries", "Rent"]);
    }

    #[test]
    fn test_parse_groups() {
        let mut registry = CategoryRegistry::default();
        registry.parse_groups(GROUPS);
        assert_eq!(registry.groups(), [UNGROUPED, "Food", "Living"]);
        assert_eq!(registry.group_of("Misc"), Some(UNGROUPED));
        assert_eq!(registry.group_of("Restaurants"), Some("Food"));
        assert_eq!(registry.categories_in("Living"), ["Rent"]);
        assert_eq!(registry.group_of("Travel"), None);
    }

    #[test]
    fn test_assign_group_creates_group_and_moves_category() {
        let mut registry = CategoryRegistry::default();
        registry.parse_groups(GROUPS);
        registry.assign_group("Rent", "Housing");
        assert_eq!(registry.group_of("Rent"), Some("Housing"));
        assert!(registry.categories_in("Living").is_empty());
        assert_eq!(registry.groups().last().unwrap(), "Housing");
    }

    #[test]
    fn test_groups_text() {
        let mut registry = CategoryRegistry::default();
        registry.parse_groups(GROUPS);
        let expected = "*Ungrouped\nMisc\n\n*Food\nGroceries\nRestaurants\n\n*Living\nRent\n";
        assert_eq!(registry.groups_text(), expected);

        let mut reparsed = CategoryRegistry::default();
        reparsed.parse_groups(&registry.groups_text());
        assert_eq!(reparsed.groups(), registry.groups());
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::TempDir::new().unwrap();
        let cats = dir.path().join("categories.txt");
        let groups = dir.path().join("groups.txt");
        utils::write(&cats, "Groceries\nRent\n").unwrap();
        utils::write(&groups, GROUPS).unwrap();

        let mut registry = CategoryRegistry::load(&cats, &groups).unwrap();
        registry.add_category("Travel");
        registry.assign_group("Travel", "Other");
        registry.save(&cats, &groups).unwrap();

        let loaded = CategoryRegistry::load(&cats, &groups).unwrap();
        assert_eq!(loaded.categories(), ["Groceries", "Rent", "Travel"]);
        assert_eq!(loaded.group_of("Travel"), Some("Other"));
    }
}
