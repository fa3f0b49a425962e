//! Placeholder substitution for preview and copy

use crate::placeholders::placeholder_token;
use crate::variables::VariableMap;

/// Replace every `[name]` in `template` with its value from `variables`.
///
/// Each name is replaced globally, one name at a time in the map's order.
/// Values are inserted as literal text with no SQL quoting. Tokens whose name is
/// not in the map are left untouched.
///
/// A value that contains another name's token is rewritten again when that
/// name comes later in the map, so such results depend on map order.
pub fn substitute(template: &str, variables: &VariableMap) -> String {
    variables
        .iter()
        .fold(template.to_string(), |sql, (name, value)| {
            sql.replace(&placeholder_token(name), value)
        })
}

/// Names in `variables` that still have an empty value
pub fn unfilled_variables(variables: &VariableMap) -> Vec<&str> {
    variables
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name.as_str())
        .collect()
}
