//! Tool-name sanitization.
//!
//! Function names must match `^[A-Za-z][A-Za-z0-9_]{0,63}$`. Feature short
//! names such as `P.CU` become `P_CU`; collisions get `_2`, `_3`, ...

use std::collections::HashSet;

pub const MAX_TOOL_NAME_LEN: usize = 64;

pub fn sanitize_tool_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    let mut pending_underscore = false;
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_underscore && !name.is_empty() {
                name.push('_');
            }
            pending_underscore = false;
            name.push(ch);
        } else {
            pending_underscore = true;
        }
    }
    if name.is_empty() {
        return "feature".to_string();
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        name = format!("F_{name}");
    }
    if name.len() > MAX_TOOL_NAME_LEN {
        name.truncate(MAX_TOOL_NAME_LEN);
        let trimmed = name.trim_end_matches('_').len();
        name.truncate(trimmed);
    }
    name
}

/// Hands out sanitized names that are unique within one catalog.
#[derive(Debug, Default)]
pub struct ToolNamer {
    used: HashSet<String>,
}

impl ToolNamer {
    /// Marks a name as taken without sanitizing it.
    pub fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    pub fn unique(&mut self, raw: &str) -> String {
        let base = sanitize_tool_name(raw);
        let mut name = base.clone();
        let mut suffix = 2;
        while self.used.contains(&name) {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.used.insert(name.clone());
        name
    }
}
