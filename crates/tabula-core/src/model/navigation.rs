use serde::Serialize;

///
/// KeyPair
///
/// One referenced (exporting side) / referencing (importing side) column pair.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct KeyPair {
    pub referenced: String,
    pub referencing: String,
}

impl KeyPair {
    pub fn new(referenced: impl Into<String>, referencing: impl Into<String>) -> Self {
        Self {
            referenced: referenced.into(),
            referencing: referencing.into(),
        }
    }
}

///
/// NavigationEdge
///
/// Foreign-key relation from the exporting table (whose key is referenced)
/// to the importing table (which holds the foreign-key columns).
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct NavigationEdge {
    pub exporting: String,
    pub importing: String,
    pub keys: Vec<KeyPair>,
}

impl NavigationEdge {
    pub fn new(exporting: impl Into<String>, importing: impl Into<String>) -> Self {
        Self {
            exporting: exporting.into(),
            importing: importing.into(),
            keys: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_key(mut self, referenced: impl Into<String>, referencing: impl Into<String>) -> Self {
        self.keys.push(KeyPair::new(referenced, referencing));
        self
    }

    /// True when this edge joins `a` and `b`, in either direction.
    #[must_use]
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.exporting == a && self.importing == b) || (self.exporting == b && self.importing == a)
    }
}
