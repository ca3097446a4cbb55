//! Display-time formatting for assistant replies.
//!
//! Nothing here touches stored messages; the output is only ever rendered.

use crate::context::history::{strip_image_marker, ChatMessage};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(\w+)?\n([\s\S]*?)```").unwrap());
static FENCE_BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\w*\n([\s\S]*?)```").unwrap());
static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(\d+\.)\s").unwrap());
static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(-|\*)\s").unwrap());
static INLINE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(Important|Note|Warning|Error|Success|Tips?|Example|Solution|Result)\b")
        .unwrap()
});
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(#{1,6})\s*(.+)$").unwrap());
static STEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Step\s+(\d+):?\s*(.+)$").unwrap());
static QUERY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^Q:\s*(.+)$").unwrap());
static ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^A:\s*(.+)$").unwrap());

/// Tag shown in front of a fenced block's language name.
pub fn language_prefix(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "python" | "py" => "[PY]",
        "javascript" | "js" => "[JS]",
        "java" => "[JAVA]",
        "kotlin" | "kt" => "[KT]",
        "cpp" | "c++" => "[CPP]",
        "c" => "[C]",
        "html" => "[HTML]",
        "css" => "[CSS]",
        "sql" => "[SQL]",
        "json" => "[JSON]",
        "xml" => "[XML]",
        "yaml" | "yml" => "[YAML]",
        "bash" | "shell" => "[BASH]",
        "php" => "[PHP]",
        "ruby" => "[RUBY]",
        "go" => "[GO]",
        "rust" => "[RUST]",
        "swift" => "[SWIFT]",
        "dart" => "[DART]",
        _ => "[CODE]",
    }
}

/// Decorate assistant text for display.
///
/// Fenced code blocks get a language banner and a trimmed body; every
/// other rule applies only to the prose between them.
pub fn enhance(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut last = 0;

    for caps in FENCE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&enhance_prose(&text[last..whole.start()]));
        out.push_str(&format_fence(&caps));
        last = whole.end();
    }
    out.push_str(&enhance_prose(&text[last..]));
    out
}

fn format_fence(caps: &Captures<'_>) -> String {
    let language = caps
        .get(1)
        .map(|m| m.as_str())
        .filter(|lang| !lang.is_empty())
        .unwrap_or("code");
    let code = caps.get(2).map_or("", |m| m.as_str()).trim();
    format!(
        "\n\n**{} {}**\n\n```{}\n{}\n```\n\n",
        language_prefix(language),
        language.to_uppercase(),
        language,
        code
    )
}

fn enhance_prose(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let s = NUMBERED_RE.replace_all(text, "**$1** ");
    let s = BULLET_RE.replace_all(&s, ">> ");
    let s = INLINE_CODE_RE.replace_all(&s, "`[CODE] $1`");
    let s = KEYWORD_RE.replace_all(&s, "**[!] $1**");
    let s = HEADING_RE.replace_all(&s, |caps: &Captures<'_>| {
        let title = &caps[2];
        match caps[1].len() {
            1 => format!("\n\n# [SYSTEM] **{title}**\n"),
            2 => format!("\n\n## [DATA] **{title}**\n"),
            3 => format!("\n\n### [INFO] **{title}**\n"),
            _ => format!("\n\n#### [LOG] **{title}**\n"),
        }
    });
    let s = STEP_RE.replace_all(&s, "**[STEP-$1] $2**");
    let s = QUERY_RE.replace_all(&s, "**[QUERY] $1**");
    let s = ANSWER_RE.replace_all(&s, "**[RESPONSE] $1**");
    s.into_owned()
}

/// Text to render for a message: user text loses its image marker,
/// assistant text is enhanced.
pub fn display_text(message: &ChatMessage) -> String {
    if message.is_user {
        strip_image_marker(&message.text)
    } else {
        enhance(&message.text)
    }
}

/// Code worth offering for copy: fenced bodies first, then inline spans
/// longer than 10 characters.
pub fn extract_code_blocks(text: &str) -> Vec<String> {
    let mut blocks: Vec<String> = FENCE_BODY_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|code| !code.is_empty())
        .collect();

    // Inline spans are looked for in the prose only.
    let prose = FENCE_BODY_RE.replace_all(text, "");
    blocks.extend(
        INLINE_CODE_RE
            .captures_iter(&prose)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|code| code.chars().count() > 10)
            .map(str::to_string),
    );
    blocks
}
