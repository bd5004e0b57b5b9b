//! Argument handling: the owned argv model, response-file expansion, and
//! the classifier that splits a compiler command line into the derived
//! preprocessor/compiler/extra-hash command lines.

mod analyze;
mod options;

pub use analyze::{analyze_arguments, CompileIntent, ModeState, ProcessedArgs};
pub use options::{
    affects_comp, affects_cpp, prefix_affects_comp, prefix_affects_cpp, takes_arg,
    takes_concat_arg, takes_path, too_hard, too_hard_for_direct,
};

use std::fs;
use std::path::Path;

/// Parse a GCC-style response file (`@file`) into tokens.
///
/// Tokens are whitespace-separated; single and double quotes group, and a
/// backslash escapes the next character.
pub fn parse_response_file(path: &Path) -> std::io::Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(tokenize_response(&text))
}

fn tokenize_response(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                } else {
                    current.push(c);
                }
            }
            None => match c {
                '\'' | '"' => {
                    in_token = true;
                    quote = Some(c);
                }
                '\\' => {
                    in_token = true;
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                c => {
                    in_token = true;
                    current.push(c);
                }
            },
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}
