//! Keyword categorization for uncategorized expenses
//!
//! Rules are checked in order and the first rule with a keyword contained in
//! the (lowercased) description wins.

/// A target expense category and the description keywords that select it
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub category: &'static str,
    pub keywords: &'static [&'static str],
}

/// Built-in rules, in priority order
pub const KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule {
        category: "Groceries",
        keywords: &["grocery", "supermarket", "food", "market"],
    },
    KeywordRule {
        category: "Gas",
        keywords: &["gas station", "fuel", "petrol"],
    },
    KeywordRule {
        category: "Restaurant",
        keywords: &["restaurant", "cafe", "dining"],
    },
    KeywordRule {
        category: "Utilities",
        keywords: &["electric", "water", "gas bill", "internet"],
    },
    KeywordRule {
        category: "Shopping",
        keywords: &["amazon", "store", "retail"],
    },
    KeywordRule {
        category: "Transport",
        keywords: &["uber", "taxi", "bus", "train"],
    },
    KeywordRule {
        category: "Healthcare",
        keywords: &["pharmacy", "doctor", "hospital", "medical"],
    },
];

/// Category for a description, if any rule matches
pub fn category_for(description: &str) -> Option<&'static str> {
    let desc_lower = description.to_lowercase();

    KEYWORD_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| desc_lower.contains(k)))
        .map(|rule| rule.category)
}
