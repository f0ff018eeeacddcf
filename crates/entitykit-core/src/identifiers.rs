//! Identifier validation and naming helpers.
//!
//! Entity and table names flow into storage statements, so they are validated
//! once at resolution time rather than escaped at every use site.

use regex::Regex;
use std::sync::OnceLock;

/// Matches a valid entity, table, or column identifier.
fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Compiled once; the pattern is a literal so this cannot fail.
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier pattern")
    })
}

/// Check whether a name is a valid identifier.
///
/// # Examples
///
/// ```
/// use entitykit_core::is_valid_identifier;
///
/// assert!(is_valid_identifier("user"));
/// assert!(is_valid_identifier("cool_user2"));
/// assert!(!is_valid_identifier("user name"));
/// assert!(!is_valid_identifier("2users"));
/// assert!(!is_valid_identifier(""));
/// ```
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    identifier_pattern().is_match(name)
}

/// Derive the default table name for an entity: snake_case of the entity name.
///
/// This is the naming scheme used when a registered entity supplies no
/// explicit table binding. It intentionally never matches a differently-cased
/// explicit binding on a base entity.
///
/// # Examples
///
/// ```
/// use entitykit_core::default_table_name;
///
/// assert_eq!(default_table_name("User"), "user");
/// assert_eq!(default_table_name("CoolUser"), "cool_user");
/// assert_eq!(default_table_name("HTTPLog"), "http_log");
/// ```
#[must_use]
pub fn default_table_name(entity: &str) -> String {
    let mut out = String::with_capacity(entity.len() + 4);
    let chars: Vec<char> = entity.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_ascii_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if i > 0 && (prev_lower || (chars[i - 1].is_ascii_uppercase() && next_lower)) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(*c);
        }
    }
    out
}
