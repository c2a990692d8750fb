use serde::{Deserialize, Serialize};

/// A named group of students. Read-only from this service's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassItem {
    pub id: String,
    pub name: String,
}

impl ClassItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
