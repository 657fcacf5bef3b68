use serde::Serialize;
use std::fmt;

/// Which portal search box an item code goes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupKind {
    /// Manufacturer article code
    Sku,
    /// Product name
    Name,
}

impl LookupKind {
    /// Form field name of the matching search box
    pub fn field(&self) -> &'static str {
        match self {
            LookupKind::Sku => "sku_mf",
            LookupKind::Name => "name",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKind::Sku => write!(f, "article code"),
            LookupKind::Name => write!(f, "name"),
        }
    }
}

/// Guess whether a catalog code is an article code or a product name.
///
/// Alphanumeric codes starting with a digit are article codes; everything
/// else, including empty and punctuated codes, is searched by name.
pub fn classify(code: &str) -> LookupKind {
    let alphanumeric = !code.is_empty() && code.chars().all(char::is_alphanumeric);

    match code.chars().next() {
        Some(first) if alphanumeric && first.is_numeric() => LookupKind::Sku,
        _ => LookupKind::Name,
    }
}

/// Term actually typed into the search box.
///
/// The "Fantasy" line is listed as e.g. `Fantasy 7725` and only the second
/// word is searchable.
pub fn search_term(code: &str) -> &str {
    let code = code.trim();
    let mut words = code.split_whitespace();

    if code.to_lowercase().contains("fantasy") {
        if let (Some(_), Some(second)) = (words.next(), words.next()) {
            return second;
        }
    }

    code
}
