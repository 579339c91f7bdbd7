//! Package requirements.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One package the runtime must be able to import.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRequirement {
    /// Distribution name, as shown to the user and queried for versions.
    pub name: String,

    /// Top-level module probed with `import`.
    pub import_name: String,

    /// Argument handed to the installer, e.g. `zotero-keeper>=1.11.0`.
    pub install_spec: String,
}

impl PackageRequirement {
    pub fn new(
        name: impl Into<String>,
        import_name: impl Into<String>,
        install_spec: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            import_name: import_name.into(),
            install_spec: install_spec.into(),
        }
    }
}

/// Ordered set of requirements, installed together in one batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementSet {
    items: Vec<PackageRequirement>,
}

impl RequirementSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The packages the bundled tools need.
    pub fn defaults() -> Self {
        Self::from(vec![
            PackageRequirement::new("zotero-keeper", "zotero_mcp", "zotero-keeper>=1.11.0"),
            PackageRequirement::new(
                "pubmed-search-mcp",
                "pubmed_search",
                "pubmed-search-mcp>=0.3.8",
            ),
        ])
    }

    /// Add a requirement, replacing any existing one with the same name in place.
    pub fn push(&mut self, requirement: PackageRequirement) {
        match self.items.iter_mut().find(|r| r.name == requirement.name) {
            Some(existing) => *existing = requirement,
            None => self.items.push(requirement),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PackageRequirement> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Install specs in set order.
    pub fn install_specs(&self) -> Vec<String> {
        self.items.iter().map(|r| r.install_spec.clone()).collect()
    }

    /// Look up a requirement by name.
    pub fn get(&self, name: &str) -> Option<&PackageRequirement> {
        self.items.iter().find(|r| r.name == name)
    }

    /// Stable SHA-256 over every field of every requirement, in order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for req in &self.items {
            for field in [&req.name, &req.import_name, &req.install_spec] {
                hasher.update((field.len() as u64).to_le_bytes());
                hasher.update(field.as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

impl From<Vec<PackageRequirement>> for RequirementSet {
    fn from(requirements: Vec<PackageRequirement>) -> Self {
        let mut set = Self::new();
        for req in requirements {
            set.push(req);
        }
        set
    }
}

impl<'a> IntoIterator for &'a RequirementSet {
    type Item = &'a PackageRequirement;
    type IntoIter = std::slice::Iter<'a, PackageRequirement>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
