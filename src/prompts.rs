pub const EVALUATION_USER: &str = include_str!("../data/prompts/evaluation_user.txt");
pub const INSPIRATION: &str = include_str!("../data/prompts/inspiration.txt");
pub const DEFAULT_PROMPT: &str = include_str!("../data/prompts/default_prompt.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// The instruction sent to vision models alongside the image.
pub fn evaluation_instruction(prompt: &str) -> String {
    render(EVALUATION_USER.trim_end(), &[("prompt", prompt)])
}

pub fn inspiration_description(title: &str) -> String {
    render(INSPIRATION.trim_end(), &[("title", title)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_var() {
        assert_eq!(
            render("Hello {{name}}!", &[("name", "world")]),
            "Hello world!"
        );
    }

    #[test]
    fn test_render_multiple_vars() {
        assert_eq!(
            render("{{a}} and {{b}}", &[("a", "cats"), ("b", "dogs")]),
            "cats and dogs"
        );
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{{a}} {{b}}", &[("a", "x")]), "x {{b}}");
    }

    #[test]
    fn test_prompts_are_non_empty() {
        assert!(!EVALUATION_USER.is_empty());
        assert!(!INSPIRATION.is_empty());
        assert!(!DEFAULT_PROMPT.is_empty());
    }

    #[test]
    fn test_evaluation_instruction_quotes_prompt() {
        let instruction = evaluation_instruction("a lonely lighthouse");
        assert!(instruction.starts_with("Evaluate this image against the prompt: \"a lonely lighthouse\""));
        assert!(instruction.contains("Dixit card game"));
        assert!(instruction.ends_with("a score from 0-100."));
    }

    #[test]
    fn test_inspiration_description() {
        assert_eq!(
            inspiration_description("Neon Dreams"),
            "Abstract artistic interpretation of Neon Dreams"
        );
    }
}
