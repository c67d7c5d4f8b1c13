use serde::{Deserialize, Serialize};

/// Fixed set of expense categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Flight,
    Hotel,
    Food,
    Transport,
    Sightseeing,
    Shopping,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Flight,
        Category::Hotel,
        Category::Food,
        Category::Transport,
        Category::Sightseeing,
        Category::Shopping,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Flight => "Flight",
            Category::Hotel => "Hotel",
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Sightseeing => "Sightseeing",
            Category::Shopping => "Shopping",
            Category::Other => "Other",
        }
    }

    /// Case-insensitive lookup; surrounding whitespace is ignored.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "flight" => Some(Category::Flight),
            "hotel" => Some(Category::Hotel),
            "food" => Some(Category::Food),
            "transport" => Some(Category::Transport),
            "sightseeing" => Some(Category::Sightseeing),
            "shopping" => Some(Category::Shopping),
            "other" => Some(Category::Other),
            _ => None,
        }
    }

    /// Comma-separated list of valid names, for help and error messages.
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
