//! Prompt template registry.
//!
//! Templates are keyed by `(language, group, key)` and rendered with
//! `{placeholder}` substitution. Lookup falls back from the primary
//! language to the default language, then to English.

use std::collections::HashMap;

type TemplateKey = (&'static str, &'static str, &'static str);

const EN_RAG_SYSTEM_PROMPT: &str = "\
You are an assistant to generate a response for the user. \
You will be provided by a set of documents associated with the user's query. \
You have to generate a response based on the documents provided. \
Ignore the documents that are not relevant to the user's query. \
You can apologize to the user if you are not able to generate a response. \
You have to generate response in the same language as the user's query. \
Be polite and respectful to the user. \
Be precise and concise in your response. Avoid unnecessary information.";

const EN_RAG_DOCUMENT_PROMPT: &str = "## Document No: {doc_num}\n### Content: {chunk_text}";

const EN_RAG_FOOTER_PROMPT: &str = "\
Based only on the above documents, please generate an answer for the user.\n\
## Question:\n{query}\n\n## Answer:";

/// Registry of prompt templates with language fallback.
pub struct TemplateRegistry {
    primary_lang: String,
    default_lang: String,
    templates: HashMap<TemplateKey, &'static str>,
}

impl TemplateRegistry {
    pub fn new(primary_lang: &str, default_lang: &str) -> Self {
        let mut templates = HashMap::new();
        templates.insert(("en", "rag", "system_prompt"), EN_RAG_SYSTEM_PROMPT);
        templates.insert(("en", "rag", "document_prompt"), EN_RAG_DOCUMENT_PROMPT);
        templates.insert(("en", "rag", "footer_prompt"), EN_RAG_FOOTER_PROMPT);

        Self {
            primary_lang: primary_lang.to_string(),
            default_lang: default_lang.to_string(),
            templates,
        }
    }

    /// Fetch and render a template; unknown keys return `None`.
    pub fn get(&self, group: &str, key: &str, vars: &[(&str, &str)]) -> Option<String> {
        let raw = self
            .lookup(&self.primary_lang, group, key)
            .or_else(|| self.lookup(&self.default_lang, group, key))
            .or_else(|| self.lookup("en", group, key))?;

        Some(render(raw, vars))
    }

    fn lookup(&self, lang: &str, group: &str, key: &str) -> Option<&'static str> {
        self.templates
            .iter()
            .find(|((l, g, k), _)| *l == lang && *g == group && *k == key)
            .map(|(_, raw)| *raw)
    }
}

fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{}}}", name), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_prompt_substitution() {
        let registry = TemplateRegistry::new("en", "en");
        let rendered = registry
            .get(
                "rag",
                "document_prompt",
                &[("doc_num", "1"), ("chunk_text", "Paris is in France.")],
            )
            .unwrap();

        assert_eq!(
            rendered,
            "## Document No: 1\n### Content: Paris is in France."
        );
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        let registry = TemplateRegistry::new("xx", "yy");
        let rendered = registry.get("rag", "system_prompt", &[]).unwrap();
        assert!(rendered.contains("documents"));
    }

    #[test]
    fn test_unknown_key_returns_none() {
        let registry = TemplateRegistry::new("en", "en");
        assert!(registry.get("rag", "missing", &[]).is_none());
    }

    #[test]
    fn test_footer_prompt_keeps_question() {
        let registry = TemplateRegistry::new("en", "en");
        let rendered = registry
            .get("rag", "footer_prompt", &[("query", "What is the capital?")])
            .unwrap();
        assert!(rendered.contains("What is the capital?"));
    }
}
