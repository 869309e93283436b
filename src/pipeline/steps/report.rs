use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Names of the two winning cereals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub most_calories: String,
    pub most_protein: String,
}

impl Report {
    pub fn new(most_calories: impl Into<String>, most_protein: impl Into<String>) -> Self {
        Self {
            most_calories: most_calories.into(),
            most_protein: most_protein.into(),
        }
    }

    pub fn lines(&self) -> [String; 2] {
        [
            format!("Most caloric cereal: {}", self.most_calories),
            format!("Most protein-rich cereal: {}", self.most_protein),
        ]
    }

    /// Emits both lines as info events.
    pub fn log(&self) {
        for line in self.lines() {
            info!("{}", line);
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [calories, protein] = self.lines();
        write!(f, "{}\n{}", calories, protein)
    }
}
