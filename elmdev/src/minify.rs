//! Pure-Rust minification for compiled output.
//!
//! Two conservative stages: strip `//` and `/* */` comments, then collapse
//! whitespace runs. String and template literals pass through untouched, and
//! a run containing a newline collapses to a single newline rather than
//! disappearing, so statements that rely on line breaks stay intact. When a
//! construct looks malformed the stage fails instead of guessing; the
//! pipeline must never write a partially minified artifact.
//!
//! `minify` is deterministic: same input, same output, always.

/// Minify JavaScript source text.
pub fn minify(input: &str) -> Result<String, String> {
    let stripped = strip_comments(input)?;
    collapse_whitespace(&stripped)
}

enum State {
    Normal,
    AfterSlash,
    InString(char),
    InStringEscape(char),
    InLineComment,
    InBlockComment,
    InBlockCommentEnd,
}

fn strip_comments(input: &str) -> Result<String, String> {
    let mut output = String::with_capacity(input.len());
    let mut state = State::Normal;

    for ch in input.chars() {
        state = match state {
            State::Normal => match ch {
                '"' | '\'' | '`' => {
                    output.push(ch);
                    State::InString(ch)
                }
                '/' => {
                    output.push(ch);
                    State::AfterSlash
                }
                _ => {
                    output.push(ch);
                    State::Normal
                }
            },
            State::AfterSlash => match ch {
                '*' => {
                    output.pop();
                    State::InBlockComment
                }
                '/' => {
                    output.pop();
                    State::InLineComment
                }
                _ => {
                    // Not a comment opener; keep the slash and this char so
                    // division and regex syntax survive unchanged.
                    output.push(ch);
                    State::Normal
                }
            },
            State::InString(quote) => {
                output.push(ch);
                if ch == '\\' {
                    State::InStringEscape(quote)
                } else if ch == quote {
                    State::Normal
                } else {
                    State::InString(quote)
                }
            }
            State::InStringEscape(quote) => {
                output.push(ch);
                State::InString(quote)
            }
            State::InLineComment => {
                if ch == '\n' || ch == '\r' {
                    output.push(ch);
                    State::Normal
                } else {
                    State::InLineComment
                }
            }
            State::InBlockComment => {
                if ch == '*' {
                    State::InBlockCommentEnd
                } else {
                    State::InBlockComment
                }
            }
            State::InBlockCommentEnd => {
                if ch == '/' {
                    State::Normal
                } else if ch == '*' {
                    State::InBlockCommentEnd
                } else {
                    State::InBlockComment
                }
            }
        };
    }

    match state {
        State::Normal | State::AfterSlash | State::InLineComment => Ok(output),
        State::InString(_) | State::InStringEscape(_) => {
            Err("unterminated string literal".to_string())
        }
        State::InBlockComment | State::InBlockCommentEnd => {
            Err("unterminated block comment".to_string())
        }
    }
}

fn is_word(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

fn collapse_whitespace(input: &str) -> Result<String, String> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if let Some(quote) = in_string {
            output.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                in_string = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' | '`' => {
                output.push(ch);
                in_string = Some(ch);
            }
            _ if ch.is_whitespace() => {
                let mut saw_newline = ch == '\n' || ch == '\r';
                while let Some(&next) = chars.peek() {
                    if !next.is_whitespace() {
                        break;
                    }
                    saw_newline |= next == '\n' || next == '\r';
                    chars.next();
                }
                let prev = output.chars().next_back();
                let next = chars.peek().copied();
                match (prev, next) {
                    // Runs at the edges of the input vanish entirely.
                    (None, _) | (_, None) => {}
                    (Some(_), Some(_)) if saw_newline => output.push('\n'),
                    (Some(prev), Some(next)) => {
                        // A plain space matters between two word chars, and
                        // between identical sign operators: `a - -b` must not
                        // merge into a decrement token.
                        if (is_word(prev) && is_word(next))
                            || (prev == '+' && next == '+')
                            || (prev == '-' && next == '-')
                        {
                            output.push(' ');
                        }
                    }
                }
            }
            _ => output.push(ch),
        }
    }

    if in_string.is_some() {
        return Err("unterminated string literal".to_string());
    }
    Ok(output)
}
