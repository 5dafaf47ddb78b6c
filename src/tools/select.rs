//! Relevance-based tool selection.
//!
//! Providers degrade when offered every tool at once, so each request only
//! advertises a subset. Fixed tools are always included.

use std::collections::HashSet;

use crate::core::tool::ToolDescriptor;

use super::fixed::is_fixed_tool;
use super::types::SelectionMode;

/// Cap on keyword-matched feature tools in normal mode.
pub const MATCH_LIMIT: usize = 24;
/// Normal mode pads with unmatched feature tools up to this many.
pub const MIN_FEATURE_TOOLS: usize = 14;
/// Feature tools offered in compact mode.
pub const COMPACT_LIMIT: usize = 16;
/// Feature tools compact mode takes first, when present.
pub const COMPACT_PREFERRED: [&str; 23] = [
    "P_CU", "P_CY", "P_CO", "P_S", "P_T", "P_PY", "S", "SP", "E", "B", "F", "CH", "R", "SW", "M",
    "H", "PATLIN", "PATRAD", "XFORM", "LOFT", "TU", "O_S", "O_F",
];

pub fn select_tools(
    user_text: &str,
    all_tools: &[ToolDescriptor],
    mode: SelectionMode,
) -> Vec<ToolDescriptor> {
    let (fixed, dynamic): (Vec<&ToolDescriptor>, Vec<&ToolDescriptor>) =
        all_tools.iter().partition(|t| is_fixed_tool(&t.name));

    let selected: Vec<&ToolDescriptor> = match mode {
        SelectionMode::Compact => {
            let (preferred, rest): (Vec<&ToolDescriptor>, Vec<&ToolDescriptor>) = dynamic
                .iter()
                .copied()
                .partition(|t| COMPACT_PREFERRED.contains(&t.name.as_str()));
            preferred.into_iter().chain(rest).take(COMPACT_LIMIT).collect()
        }
        SelectionMode::Normal => {
            let tokens = keyword_tokens(user_text);
            let mut picked: Vec<&ToolDescriptor> = dynamic
                .iter()
                .copied()
                .filter(|t| {
                    let haystack = t.search_text();
                    tokens.iter().any(|token| haystack.contains(token.as_str()))
                })
                .take(MATCH_LIMIT)
                .collect();
            for tool in &dynamic {
                if picked.len() >= MIN_FEATURE_TOOLS {
                    break;
                }
                if !picked.iter().any(|p| std::ptr::eq(*p, *tool)) {
                    picked.push(*tool);
                }
            }
            picked
        }
    };

    let mut seen = HashSet::new();
    selected
        .into_iter()
        .chain(fixed)
        .filter(|t| seen.insert(t.name.clone()))
        .cloned()
        .collect()
}

/// Lowercased alphanumeric runs of at least three characters, deduplicated
/// in first-seen order.
pub fn keyword_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut seen = HashSet::new();
    lowered
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|word| word.len() >= 3)
        .filter(|word| seen.insert(*word))
        .map(str::to_string)
        .collect()
}
