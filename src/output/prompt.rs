// Prompt construction from the embedded templates

use crate::error::Result;
use crate::output::RenderMode;
use tera::{Context, Tera};

/// Renders the localization prompt for each render mode
pub struct PromptBuilder {
    tera: Tera,
}

impl PromptBuilder {
    /// Create a prompt builder with the embedded templates
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("locations_example.txt", include_str!("../../templates/locations_example.txt.tera")),
            ("file_names.txt", include_str!("../../templates/file_names.txt.tera")),
            (
                "functions_no_signature.txt",
                include_str!("../../templates/functions_no_signature.txt.tera"),
            ),
            (
                "functions_with_signature.txt",
                include_str!("../../templates/functions_with_signature.txt.tera"),
            ),
            ("full_text.txt", include_str!("../../templates/full_text.txt.tera")),
        ])?;

        Ok(Self { tera })
    }

    /// Name of the template used for a mode
    pub fn template_name(mode: RenderMode) -> &'static str {
        match mode {
            RenderMode::FilesOnly => "file_names.txt",
            RenderMode::FunctionsNoSignature => "functions_no_signature.txt",
            RenderMode::FunctionsWithSignature => "functions_with_signature.txt",
            RenderMode::FullText => "full_text.txt",
        }
    }

    /// Embed a problem statement and a rendered structure into the prompt for `mode`
    pub fn build(&self, mode: RenderMode, problem_statement: &str, structure: &str) -> Result<String> {
        let mut context = Context::new();
        context.insert("problem_statement", problem_statement);
        context.insert("structure", structure);

        let prompt = self.tera.render(Self::template_name(mode), &context)?;
        Ok(prompt.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [RenderMode; 4] = [
        RenderMode::FilesOnly,
        RenderMode::FunctionsNoSignature,
        RenderMode::FunctionsWithSignature,
        RenderMode::FullText,
    ];

    #[test]
    fn test_builder_new() {
        assert!(PromptBuilder::new().is_ok());
    }

    #[test]
    fn test_every_mode_embeds_inputs() {
        let builder = PromptBuilder::new().unwrap();
        for mode in MODES {
            let prompt = builder.build(mode, "Crash in <Parser> & friends", "pkg/a.py").unwrap();
            // Plain-text templates are not HTML escaped
            assert!(prompt.contains("Crash in <Parser> & friends"), "{:?}", mode);
            assert!(prompt.contains("pkg/a.py"), "{:?}", mode);
            assert!(prompt.starts_with("Please look through"), "{:?}", mode);
        }
    }

    #[test]
    fn test_mode_specific_instructions() {
        let builder = PromptBuilder::new().unwrap();
        let files = builder.build(RenderMode::FilesOnly, "bug", "a.py").unwrap();
        assert!(files.contains("return at most 5 files"));

        let functions = builder.build(RenderMode::FunctionsWithSignature, "bug", "a.py").unwrap();
        assert!(functions.contains("data dependencies"));
        assert!(functions.contains("function: MyClass2.my_method"));

        let full = builder.build(RenderMode::FullText, "bug", "a.py").unwrap();
        assert!(full.contains("### Full Repository ###"));
        assert!(full.ends_with("Return just the location(s)"));
    }
}
