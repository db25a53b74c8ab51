//! Prompt construction for note reviews.
//!
//! The built-in prompts steer the model's output format, so their wording is fixed. Users may
//! swap them for a minijinja template via `[prompt] template` in the config.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use minijinja::Environment;
use serde::Serialize;

use crate::domain::errors::ReviewError;
use crate::domain::model::{NoteRecord, TargetLanguage};

const CUSTOM_TEMPLATE_NAME: &str = "custom_prompt";

struct BuiltinPrompt {
    instructions: &'static str,
    constraints: &'static str,
    file_label: &'static str,
    content_label: &'static str,
}

static KOREAN_PROMPT: BuiltinPrompt = BuiltinPrompt {
    instructions: "[지시사항]\n\
아래 마크다운 파일의 내용을 '한국어'로 요약하고 복습 퀴즈를 만드세요.",
    constraints: "[제약사항]\n\
1. \"다음은 요약입니다\" 같은 서론이나 인사말을 절대로 하지 마세요.\n\
2. 바로 요약 제목(Heading)부터 출력을 시작하세요.\n\
3. HTML 태그(<details> 등)는 사용하지 마세요.\n\
4. 퀴즈 정답은 맨 마지막에 '정답: ||내용||' 형식으로 적어주세요.",
    file_label: "파일명",
    content_label: "학습 내용",
};

static ENGLISH_PROMPT: BuiltinPrompt = BuiltinPrompt {
    instructions: "[Instructions]\n\
Summarize the markdown content in 'English' and create a quiz.",
    constraints: "[Constraints]\n\
1. Do NOT use introductory phrases like \"Here is the summary\".\n\
2. Start directly with the Summary Heading.\n\
3. Do NOT use HTML tags.\n\
4. Provide the answer at the very bottom in 'Answer: ||content||' format.",
    file_label: "Filename",
    content_label: "Content",
};

fn builtin(language: TargetLanguage) -> &'static BuiltinPrompt {
    match language {
        TargetLanguage::Korean => &KOREAN_PROMPT,
        TargetLanguage::English => &ENGLISH_PROMPT,
    }
}

/// Render the built-in review prompt for `note`.
///
/// Layout is instructions, constraints, file name, then the note content verbatim.
pub fn build_prompt(note: &NoteRecord, language: TargetLanguage) -> String {
    let prompt = builtin(language);
    format!(
        "{instructions}\n\n{constraints}\n\n[{file_label}: {file_name}]\n[{content_label}]\n{content}",
        instructions = prompt.instructions,
        constraints = prompt.constraints,
        file_label = prompt.file_label,
        file_name = note.file_name,
        content_label = prompt.content_label,
        content = note.content,
    )
}

/// Renders prompts from the built-in wording or a user-supplied template.
#[derive(Debug, Clone, Default)]
pub struct PromptRenderer {
    custom: Option<CustomTemplate>,
}

#[derive(Debug, Clone)]
struct CustomTemplate {
    path: PathBuf,
    source: String,
}

impl PromptRenderer {
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Use the built-in prompts unless `template` points at a custom one.
    pub fn from_config(template: Option<&Path>) -> Result<Self> {
        match template {
            Some(path) => Self::from_template_file(path),
            None => Ok(Self::builtin()),
        }
    }

    /// Load and validate a minijinja template from disk.
    pub fn from_template_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to load prompt template from {}", path.display()))?;
        let custom = CustomTemplate {
            path: path.to_path_buf(),
            source,
        };
        custom_environment(&custom.source)
            .map_err(|err| anyhow!("invalid prompt template '{}': {err}", path.display()))?;
        tracing::debug!(path = %path.display(), "using custom prompt template");
        Ok(Self {
            custom: Some(custom),
        })
    }

    pub fn is_custom(&self) -> bool {
        self.custom.is_some()
    }

    pub fn render(&self, note: &NoteRecord, language: TargetLanguage) -> Result<String, ReviewError> {
        let Some(custom) = &self.custom else {
            return Ok(build_prompt(note, language));
        };

        let prompt = builtin(language);
        let context = TemplateContext {
            file_name: &note.file_name,
            content: &note.content,
            language: language.as_str(),
            language_label: language.label(),
            instructions: prompt.instructions,
            constraints: prompt.constraints,
        };

        let env = custom_environment(&custom.source)
            .map_err(|err| ReviewError::PromptTemplate(err.to_string()))?;
        env.get_template(CUSTOM_TEMPLATE_NAME)
            .and_then(|template| template.render(&context))
            .map_err(|err| {
                tracing::warn!(path = %custom.path.display(), error = %err, "prompt template failed");
                ReviewError::PromptTemplate(err.to_string())
            })
    }
}

fn custom_environment(source: &str) -> Result<Environment<'_>, minijinja::Error> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template(CUSTOM_TEMPLATE_NAME, source)?;
    Ok(env)
}

#[derive(Serialize)]
struct TemplateContext<'a> {
    file_name: &'a str,
    content: &'a str,
    language: &'static str,
    language_label: &'static str,
    instructions: &'static str,
    constraints: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(file_name: &str, content: &str) -> NoteRecord {
        NoteRecord {
            file_name: file_name.into(),
            content: content.into(),
            source_path: PathBuf::from("/notes").join(file_name),
        }
    }

    fn has_hangul(text: &str) -> bool {
        text.chars().any(|ch| ('\u{AC00}'..='\u{D7A3}').contains(&ch))
    }

    #[test]
    fn korean_prompt_matches_fixed_wording() {
        let rendered = build_prompt(&note("os.md", "# 프로세스\n스케줄링"), TargetLanguage::Korean);
        let expected = "[지시사항]
아래 마크다운 파일의 내용을 '한국어'로 요약하고 복습 퀴즈를 만드세요.

[제약사항]
1. \"다음은 요약입니다\" 같은 서론이나 인사말을 절대로 하지 마세요.
2. 바로 요약 제목(Heading)부터 출력을 시작하세요.
3. HTML 태그(<details> 등)는 사용하지 마세요.
4. 퀴즈 정답은 맨 마지막에 '정답: ||내용||' 형식으로 적어주세요.

[파일명: os.md]
[학습 내용]
# 프로세스
스케줄링";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn english_prompt_matches_fixed_wording() {
        let rendered = build_prompt(&note("a.md", "Hello"), TargetLanguage::English);
        insta::assert_snapshot!(rendered, @r#"
[Instructions]
Summarize the markdown content in 'English' and create a quiz.

[Constraints]
1. Do NOT use introductory phrases like "Here is the summary".
2. Start directly with the Summary Heading.
3. Do NOT use HTML tags.
4. Provide the answer at the very bottom in 'Answer: ||content||' format.

[Filename: a.md]
[Content]
Hello
"#);
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let rendered = build_prompt(&note("order.md", "BODY"), TargetLanguage::English);
        let instructions = rendered.find("[Instructions]").unwrap();
        let constraints = rendered.find("[Constraints]").unwrap();
        let file = rendered.find("[Filename: order.md]").unwrap();
        let content = rendered.find("BODY").unwrap();
        assert!(instructions < constraints && constraints < file && file < content);
    }

    #[test]
    fn english_prompt_contains_no_korean_and_vice_versa() {
        let english = build_prompt(&note("a.md", "plain"), TargetLanguage::English);
        assert!(!has_hangul(&english));
        assert!(!english.contains("정답"));

        let korean = build_prompt(&note("a.md", "plain"), TargetLanguage::Korean);
        assert!(korean.contains("정답: ||내용||"));
        assert!(!korean.contains("Answer: ||content||"));
        assert!(!korean.contains("[Instructions]"));
    }

    #[test]
    fn content_is_embedded_verbatim_and_deterministically() {
        let raw = "{{ not a template }}\n[Constraints]\n<details>||spoiler||</details>";
        let record = note("tricky {{name}}.md", raw);
        let first = build_prompt(&record, TargetLanguage::Korean);
        let second = build_prompt(&record, TargetLanguage::Korean);
        assert_eq!(first, second);
        assert!(first.contains("[파일명: tricky {{name}}.md]"));
        assert!(first.ends_with(raw));
    }

    #[test]
    fn builtin_renderer_never_fails() {
        let renderer = PromptRenderer::builtin();
        assert!(!renderer.is_custom());
        let rendered = renderer
            .render(&note("a.md", ""), TargetLanguage::English)
            .unwrap();
        assert!(rendered.ends_with("[Content]\n"));
    }

    #[test]
    fn custom_template_receives_note_and_builtin_blocks() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("prompt.jinja");
        fs::write(
            &path,
            "{{ instructions }}\nLanguage: {{ language }} ({{ language_label }})\n{% if file_name %}File: {{ file_name }}{% endif %}\n{{ content }}",
        )?;

        let renderer = PromptRenderer::from_template_file(&path)?;
        assert!(renderer.is_custom());
        let rendered = renderer
            .render(&note("net.md", "<tcp> & udp"), TargetLanguage::English)
            .unwrap();
        assert!(rendered.starts_with("[Instructions]"));
        assert!(rendered.contains("Language: english (English 🇺🇸)"));
        assert!(rendered.contains("File: net.md"));
        assert!(rendered.ends_with("<tcp> & udp"));
        Ok(())
    }

    #[test]
    fn invalid_custom_template_is_rejected_on_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("broken.jinja");
        fs::write(&path, "{% if %}")?;
        assert!(PromptRenderer::from_template_file(&path).is_err());
        assert!(PromptRenderer::from_template_file(&temp.path().join("missing.jinja")).is_err());
        Ok(())
    }

    #[test]
    fn custom_template_runtime_failure_maps_to_prompt_error() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("failing.jinja");
        // Compiles fine; attribute lookup on an undefined value fails only while rendering.
        fs::write(&path, "{{ content }} {{ missing.deeper }}")?;
        let renderer = PromptRenderer::from_template_file(&path)?;
        assert!(renderer.is_custom());

        let err = renderer
            .render(&note("a.md", "x"), TargetLanguage::Korean)
            .unwrap_err();
        let ReviewError::PromptTemplate(message) = &err else {
            panic!("expected a prompt template error, got {err:?}");
        };
        assert!(!message.is_empty());
        assert!(
            err.to_string()
                .starts_with("Error: failed to render prompt template: ")
        );
        Ok(())
    }
}
