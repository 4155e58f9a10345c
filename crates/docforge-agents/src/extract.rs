//! Heading-boundary extraction over raw markdown stage output. Ported from
//! the original per-stage `_extract_section`/`_extract_list_items`/
//! `_extract_key_facts` helpers: substring search for `## Name` / `### Name`
//! / `**Name**`, not a markdown parse, so the four stage prompts can keep
//! asking the model for loosely-formatted section headers.

/// Returns the text between the first matching heading and the next `##`/
/// `###` heading (or end of document) if found, else an empty string.
pub fn extract_section(content: &str, section_names: &[&str]) -> String {
    for name in section_names {
        for pattern in [format!("## {name}"), format!("### {name}"), format!("**{name}**")] {
            if let Some(start_idx) = content.find(&pattern) {
                let after = start_idx + pattern.len();
                let rest = &content[after..];
                let next_section = rest
                    .find("\n##")
                    .or_else(|| rest.find("\n###"));
                let section_content = match next_section {
                    Some(end) => &rest[..end],
                    None => rest,
                };
                return section_content.trim().to_string();
            }
        }
    }
    String::new()
}

/// Extracts `- ` / `* ` bullet items from the matched section.
pub fn extract_list_items(content: &str, section_names: &[&str]) -> Vec<String> {
    let section_content = extract_section(content, section_names);
    if section_content.is_empty() {
        return Vec::new();
    }
    section_content
        .lines()
        .map(str::trim)
        .filter(|line| (line.starts_with("- ") || line.starts_with("* ")) && line.len() > 5)
        .map(|line| line[2..].trim().to_string())
        .collect()
}

/// Extracts bullet points and bolded one-liners as candidate facts to carry
/// into later stages, capped at 10 like the original.
pub fn extract_key_facts(content: &str) -> Vec<String> {
    let mut facts = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if (line.starts_with("- ") || line.starts_with("* ")) && line.len() > 20 {
            facts.push(line[2..].trim().to_string());
        } else if line.starts_with("**") && line.ends_with("**") && line.len() > 10 {
            facts.push(line.trim_matches('*').trim().to_string());
        }
        if facts.len() >= 10 {
            break;
        }
    }
    facts.truncate(10);
    facts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_section_stops_at_next_heading() {
        let content = "# Doc\n\n## Problem Statement\nUsers struggle with onboarding.\n\n## Target Audience\nSmall teams.\n";
        let section = extract_section(content, &["Problem Statement"]);
        assert_eq!(section, "Users struggle with onboarding.");
    }

    #[test]
    fn extract_section_missing_heading_returns_empty() {
        assert_eq!(extract_section("no headings here", &["Problem"]), "");
    }

    #[test]
    fn extract_list_items_filters_short_lines() {
        let content = "## Success Metrics\n- Reach 1000 signups in month one\n- ok\n- Retain 40% of users after 30 days\n";
        let items = extract_list_items(content, &["Success Metrics"]);
        assert_eq!(items.len(), 2);
        assert!(items[0].contains("signups"));
    }

    #[test]
    fn extract_key_facts_caps_at_ten() {
        let content = (0..15)
            .map(|i| format!("- this is a sufficiently long bullet point number {i}\n"))
            .collect::<String>();
        let facts = extract_key_facts(&content);
        assert_eq!(facts.len(), 10);
    }

    #[test]
    fn extract_key_facts_picks_up_bold_oneliners() {
        let content = "**This is an important highlighted fact**\nnormal line\n";
        let facts = extract_key_facts(content);
        assert_eq!(facts, vec!["This is an important highlighted fact".to_string()]);
    }
}
