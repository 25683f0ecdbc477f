use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern is valid"));

/// Distinct `{{name}}` placeholders, in order of first appearance.
pub fn extract_variables<'a>(texts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut vars: Vec<String> = Vec::new();
    for text in texts {
        for cap in PLACEHOLDER.captures_iter(text) {
            let name = &cap[1];
            if !vars.iter().any(|v| v == name) {
                vars.push(name.to_string());
            }
        }
    }
    vars
}

/// Substitutes known placeholders; unknown ones are left untouched.
pub fn render(text: &str, values: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(text, |cap: &Captures| match values.get(&cap[1]) {
            Some(value) => value.clone(),
            None => cap[0].to_string(),
        })
        .into_owned()
}
