// Shared prompt type and cross-cutting prompt fragments.
// Each service that talks to the model defines its own prompts.rs alongside it.

/// A fully rendered request for the model: system + user text and sampling
/// limits. Built by the prompt builders, consumed by `LlmClient`.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Substitutes `{key}` placeholders in a single left-to-right pass.
///
/// Substituted values are never rescanned, so resume text or a question that
/// happens to contain `{question}` stays literal.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_template_replaces_known_keys() {
        let out = fill_template("Q: {question}\nC: {context}", &[
            ("question", "Where?"),
            ("context", "Berlin"),
        ]);
        assert_eq!(out, "Q: Where?\nC: Berlin");
    }

    #[test]
    fn test_fill_template_leaves_unknown_braces() {
        let out = fill_template(r#"{"skills": []} {text}"#, &[("text", "x")]);
        assert_eq!(out, r#"{"skills": []} x"#);
    }

    #[test]
    fn test_fill_template_does_not_rescan_values() {
        let out = fill_template("{context} / {question}", &[
            ("context", "{question}"),
            ("question", "real"),
        ]);
        assert_eq!(out, "{question} / real");
    }
}
