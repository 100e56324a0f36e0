//! Argument templates for configurable cleartool operations.
//!
//! Settings describe the flags of checkout, checkin, undo-checkout and update as
//! templates such as `-c ${comment} ${filename}`. Rendering is single-pass over each
//! whitespace-separated token (double quotes group a token):
//!
//! - a token that is exactly `${comment}` becomes the comment as one argument, even
//!   when it contains spaces
//! - `${comment}` inside a larger token is substituted in place
//! - `${filename}` marks file placement; cleartool wants pathnames last, so file
//!   operands are always appended afterwards by `CommandArgs`
//! - unknown placeholders are kept as-is

pub const COMMENT_TOKEN: &str = "${comment}";
pub const FILENAME_TOKEN: &str = "${filename}";

/// Values available to a template
#[derive(Debug, Default)]
pub struct TemplateContext<'a> {
    pub comment: Option<&'a str>,
}

/// Whether rendering this template needs a comment from the user
pub fn requires_comment(template: &str) -> bool {
    template.contains(COMMENT_TOKEN)
}

/// Render a template into argument tokens
pub fn render_args(template: &str, context: &TemplateContext) -> Vec<String> {
    let mut args = Vec::new();
    for token in tokenize(template) {
        if token == FILENAME_TOKEN {
            continue;
        }
        if token == COMMENT_TOKEN {
            args.push(context.comment.unwrap_or_default().to_string());
            continue;
        }
        let mut rendered = String::with_capacity(token.len() + 32);
        render_token_single_pass(&token, context, &mut rendered);
        if !rendered.is_empty() {
            args.push(rendered);
        }
    }
    args
}

fn render_token_single_pass(token: &str, context: &TemplateContext, output: &mut String) {
    let mut rest = token;
    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                match &after[..end] {
                    "comment" => output.push_str(context.comment.unwrap_or_default()),
                    "filename" => {}
                    unknown => {
                        output.push_str("${");
                        output.push_str(unknown);
                        output.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                // No closing brace, treat as literal
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);
}

/// Whitespace split with double-quote grouping
fn tokenize(template: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;

    for ch in template.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() || quoted {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() || quoted {
        tokens.push(current);
    }
    tokens
}
