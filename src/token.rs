//! Anti-forgery token extraction from the login page.

use regex::Regex;

/// Pulls the anti-forgery token out of a login page body.
///
/// Sessions only depend on this trait, so a structured HTML parser can
/// replace the default pattern match without touching anything else.
pub trait TokenExtractor: Send + Sync {
    fn extract(&self, body: &str) -> Option<String>;

    /// Form field the token is submitted back under.
    fn field(&self) -> &str;
}

/// Matches `name="<field>" ... value="<token>"` inside a single tag.
#[derive(Debug, Clone)]
pub struct PatternTokenExtractor {
    field: String,
    pattern: Regex,
}

impl PatternTokenExtractor {
    /// Extractor for a hidden input named `field`.
    pub fn new(field: &str) -> Self {
        let pattern = Regex::new(&format!(
            r#"name="{}"[^>]*value="([^"]*)""#,
            regex::escape(field)
        ))
        .unwrap_or_else(|_| unreachable!("escaped field name always forms a valid pattern"));
        Self {
            field: field.to_string(),
            pattern,
        }
    }
}

impl Default for PatternTokenExtractor {
    fn default() -> Self {
        Self::new("csrf_token")
    }
}

impl TokenExtractor for PatternTokenExtractor {
    fn extract(&self, body: &str) -> Option<String> {
        self.pattern
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn field(&self) -> &str {
        &self.field
    }
}
