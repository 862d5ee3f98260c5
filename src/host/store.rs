//! Merged section store and the read-only view the renderer consumes

use crate::ini::IniDocument;

/// Read-only view of the host's final configuration.
///
/// Sections and options come back in the host's enumeration order: the
/// position of their first declaration, with later overrides applied in
/// place.
pub trait MergedConfig {
    fn sections(&self) -> Vec<&str>;

    /// Final options of `section`; empty when the section does not exist.
    fn options(&self, section: &str) -> Vec<(&str, &str)>;

    fn get(&self, section: &str, option: &str) -> Option<&str> {
        self.options(section)
            .into_iter()
            .find(|(name, _)| *name == option)
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct StoredSection {
    name: String,
    options: Vec<(String, String)>,
}

/// Sections merged in load order.
///
/// Re-declaring a section merges into the existing entry, and overriding an
/// option keeps the position it was first declared at.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigStore {
    sections: Vec<StoredSection>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `name` exists, appending it if new.
    pub fn add_section(&mut self, name: &str) {
        self.section_mut(name);
    }

    pub fn set(&mut self, section: &str, option: &str, value: &str) {
        let entry = self.section_mut(section);
        match entry.options.iter_mut().find(|(name, _)| name == option) {
            Some((_, existing)) => *existing = value.to_string(),
            None => entry
                .options
                .push((option.to_string(), value.to_string())),
        }
    }

    /// Apply every section occurrence of a scanned document, in order.
    pub fn merge_document(&mut self, doc: &IniDocument) {
        for section in &doc.sections {
            self.add_section(&section.name);
            for (option, value) in &section.options {
                self.set(&section.name, option, value);
            }
        }
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.iter().any(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn section_mut(&mut self, name: &str) -> &mut StoredSection {
        let idx = match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sections.push(StoredSection {
                    name: name.to_string(),
                    options: Vec::new(),
                });
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx]
    }
}

impl MergedConfig for ConfigStore {
    fn sections(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    fn options(&self, section: &str) -> Vec<(&str, &str)> {
        self.sections
            .iter()
            .find(|s| s.name == section)
            .map(|s| {
                s.options
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ini;

    #[test]
    fn test_sections_keep_first_declaration_order() {
        let mut store = ConfigStore::new();
        store.merge_document(&ini::parse("[printer]\n[extruder]\n"));
        store.merge_document(&ini::parse("[fan]\n[printer]\nmax_velocity: 200\n"));

        assert_eq!(store.sections(), ["printer", "extruder", "fan"]);
        assert_eq!(store.get("printer", "max_velocity"), Some("200"));
    }

    #[test]
    fn test_override_keeps_option_position() {
        let mut store = ConfigStore::new();
        store.merge_document(&ini::parse(
            "[extruder]\nstep_pin: PA1\nrotation_distance: 40\nnozzle_diameter: 0.4\n",
        ));
        store.merge_document(&ini::parse("[extruder]\nrotation_distance: 32\npid_kp: 21.4\n"));

        assert_eq!(
            store.options("extruder"),
            [
                ("step_pin", "PA1"),
                ("rotation_distance", "32"),
                ("nozzle_diameter", "0.4"),
                ("pid_kp", "21.4"),
            ]
        );
    }

    #[test]
    fn test_missing_section_has_no_options() {
        let store = ConfigStore::new();
        assert!(store.options("nope").is_empty());
        assert_eq!(store.get("nope", "x"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_section_is_kept() {
        let mut store = ConfigStore::new();
        store.add_section("respond");
        assert!(store.has_section("respond"));
        assert_eq!(store.len(), 1);
    }
}
