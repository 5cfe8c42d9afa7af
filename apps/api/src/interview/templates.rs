//! `{{placeholder}}` substitution for message and report templates.

use std::collections::HashMap;

use crate::interview::prompt_config::MessageTemplates;

pub type TemplateVars<'a> = HashMap<&'a str, String>;

/// Replaces every `{{name}}` with `vars[name]`, or the empty string when absent.
///
/// Single left-to-right pass: substituted values are never re-scanned, so a value
/// containing `{{...}}` is emitted literally. Anything that is not a well-formed
/// placeholder (unclosed braces, empty or non-identifier names) is copied as-is.
pub fn substitute(template: &str, vars: &TemplateVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = after_open[..end].trim();
        if is_placeholder_name(name) {
            if let Some(value) = vars.get(name) {
                out.push_str(value);
            }
            rest = &after_open[end + 2..];
        } else {
            // Not a placeholder: keep the opening braces and continue after them
            out.push_str("{{");
            rest = after_open;
        }
    }

    out.push_str(rest);
    out
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Renders items as a markdown bullet list.
pub fn format_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders `(label, score)` pairs as `- label: n/5` lines.
pub fn format_scores<'a>(scores: impl IntoIterator<Item = (&'a str, u8)>) -> String {
    scores
        .into_iter()
        .map(|(label, score)| format!("- {label}: {score}/5"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders the configured conversational message templates.
#[derive(Debug, Clone, Copy)]
pub struct MessageTemplateEngine<'a> {
    templates: &'a MessageTemplates,
}

impl<'a> MessageTemplateEngine<'a> {
    pub fn new(templates: &'a MessageTemplates) -> Self {
        Self { templates }
    }

    pub fn no_context(&self) -> String {
        self.templates.no_context.clone()
    }

    pub fn diff_probe(&self, diff_snippet: &str) -> String {
        let vars = TemplateVars::from([("diff_snippet", diff_snippet.to_string())]);
        substitute(&self.templates.diff_probe, &vars)
    }

    pub fn time_check(&self, minute: u32, remaining_minutes: u32) -> String {
        let vars = TemplateVars::from([
            ("minute", minute.to_string()),
            ("remaining_minutes", remaining_minutes.to_string()),
        ]);
        substitute(&self.templates.time_check, &vars)
    }

    pub fn nudge_focus(&self) -> String {
        self.templates.nudge_focus.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> TemplateVars<'static> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_substitute_simple() {
        assert_eq!(substitute("Hello {{name}}", &vars(&[("name", "Ana")])), "Hello Ana");
    }

    #[test]
    fn test_substitute_missing_key_is_empty() {
        assert_eq!(substitute("Hello {{name}}!", &vars(&[])), "Hello !");
    }

    #[test]
    fn test_substitute_repeated_placeholder() {
        let out = substitute("{{x}} and {{x}}", &vars(&[("x", "1")]));
        assert_eq!(out, "1 and 1");
    }

    #[test]
    fn test_substitute_tolerates_inner_whitespace() {
        assert_eq!(substitute("{{ name }}", &vars(&[("name", "Ana")])), "Ana");
    }

    #[test]
    fn test_substitute_does_not_rescan_values() {
        let out = substitute("{{a}}", &vars(&[("a", "{{b}}"), ("b", "nope")]));
        assert_eq!(out, "{{b}}");
    }

    #[test]
    fn test_substitute_unclosed_placeholder_kept() {
        assert_eq!(substitute("cost {{n", &vars(&[("n", "1")])), "cost {{n");
    }

    #[test]
    fn test_substitute_non_identifier_kept() {
        let template = "map = {{'a': 1}}";
        assert_eq!(substitute(template, &vars(&[])), template);
    }

    #[test]
    fn test_substitute_is_noop_without_placeholders() {
        let once = substitute("Hi {{name}}", &vars(&[("name", "Ana")]));
        let twice = substitute(&once, &vars(&[("name", "Bo")]));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_substitute_multibyte_text() {
        let out = substitute("Résumé — {{who}} ✓", &vars(&[("who", "Zoë")]));
        assert_eq!(out, "Résumé — Zoë ✓");
    }

    #[test]
    fn test_format_list() {
        let items = vec!["one".to_string(), "two".to_string()];
        assert_eq!(format_list(&items), "- one\n- two");
        assert_eq!(format_list(&[]), "");
    }

    #[test]
    fn test_format_scores() {
        let out = format_scores([("Code quality", 4), ("Communication", 3)]);
        assert_eq!(out, "- Code quality: 4/5\n- Communication: 3/5");
    }

    #[test]
    fn test_message_engine_time_check() {
        let templates = MessageTemplates {
            no_context: "need context".to_string(),
            diff_probe: "Why {{diff_snippet}}?".to_string(),
            time_check: "{{minute}} in, {{remaining_minutes}} left".to_string(),
            nudge_focus: "focus".to_string(),
        };
        let engine = MessageTemplateEngine::new(&templates);
        assert_eq!(engine.time_check(10, 15), "10 in, 15 left");
        assert_eq!(engine.diff_probe("+x = 1"), "Why +x = 1?");
        assert_eq!(engine.no_context(), "need context");
        assert_eq!(engine.nudge_focus(), "focus");
    }
}
