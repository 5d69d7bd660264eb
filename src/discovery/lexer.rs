//! Call-site tokenizer for route declarations
//!
//! Source lines are split into a small token stream and matched against a
//! fixed grammar instead of free-form patterns:
//!
//! ```text
//! call_site := RECEIVER "." VERB "(" STRING
//! RECEIVER  := IDENT            (router-style: name contains "router", any case)
//!            | "app" | "server" (app-style)
//! VERB      := get | post | put | patch | delete | head | options
//! STRING    := '...' | "..." | `...`   whose content starts with "/"
//! ```
//!
//! The receiver may itself be the tail of a member chain (`this.router.get(...)`).
//! Every call site on a line is reported; nothing is deduplicated. Strings
//! spanning lines and chained `.route('/x').get(...)` declarations are not
//! recognised.

use crate::HttpMethod;

/// A lexical token of one source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Str(String),
    Dot,
    LParen,
    RParen,
    Comma,
    Other(char),
}

/// Surface syntax a call site was recognised as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStyle {
    Router,
    App,
}

/// A recognised route declaration on a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub style: CallStyle,
    pub receiver: String,
    pub method: HttpMethod,
    pub path: String,
}

/// Tokenize a single line
///
/// Unterminated strings run to the end of the line.
pub fn tokenize(line: &str) -> Vec<Token> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '\'' | '"' | '`' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                while i < chars.len() && chars[i] != quote {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        value.push(chars[i + 1]);
                        i += 2;
                    } else {
                        value.push(chars[i]);
                        i += 1;
                    }
                }
                i += 1; // closing quote
                tokens.push(Token::Str(value));
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_part(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                tokens.push(Token::Other(other));
                i += 1;
            }
        }
    }

    tokens
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn receiver_style(name: &str) -> Option<CallStyle> {
    if name == "app" || name == "server" {
        Some(CallStyle::App)
    } else if name.to_lowercase().contains("router") {
        Some(CallStyle::Router)
    } else {
        None
    }
}

/// Find every route call site on a line, left to right
pub fn call_sites(line: &str) -> Vec<CallSite> {
    let tokens = tokenize(line);
    let mut sites = Vec::new();

    // Window: IDENT . VERB ( STR
    for window in tokens.windows(5) {
        let [Token::Ident(receiver), Token::Dot, Token::Ident(verb), Token::LParen, Token::Str(path)] =
            window
        else {
            continue;
        };
        let Some(style) = receiver_style(receiver) else {
            continue;
        };
        if verb.chars().any(|c| c.is_uppercase()) {
            continue;
        }
        let Some(method) = HttpMethod::from_str(verb) else {
            continue;
        };
        if verb == "del" || !path.starts_with('/') {
            continue;
        }
        sites.push(CallSite {
            style,
            receiver: receiver.clone(),
            method,
            path: path.clone(),
        });
    }

    sites
}

/// Dotted identifier chains on a line, in order (`passport.authenticate`, `jwt`)
///
/// String contents are not included.
pub fn identifier_chains(line: &str) -> Vec<String> {
    let tokens = tokenize(line);
    let mut chains = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        if let Token::Ident(first) = &tokens[i] {
            let mut chain = first.clone();
            i += 1;
            while i + 1 < tokens.len() {
                match (&tokens[i], &tokens[i + 1]) {
                    (Token::Dot, Token::Ident(next)) => {
                        chain.push('.');
                        chain.push_str(next);
                        i += 2;
                    }
                    _ => break,
                }
            }
            chains.push(chain);
        } else {
            i += 1;
        }
    }

    chains
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_call() {
        let tokens = tokenize("router.get('/users', auth)");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("router".to_string()),
                Token::Dot,
                Token::Ident("get".to_string()),
                Token::LParen,
                Token::Str("/users".to_string()),
                Token::Comma,
                Token::Ident("auth".to_string()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_router_and_app_styles() {
        let sites = call_sites("userRouter.post(\"/users\", create); app.delete(`/users/:id`, rm)");
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].style, CallStyle::Router);
        assert_eq!(sites[0].method, HttpMethod::Post);
        assert_eq!(sites[0].path, "/users");
        assert_eq!(sites[1].style, CallStyle::App);
        assert_eq!(sites[1].method, HttpMethod::Delete);
        assert_eq!(sites[1].path, "/users/:id");
    }

    #[test]
    fn test_member_chain_receiver() {
        let sites = call_sites("this.router.patch('/items/:id', update);");
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].receiver, "router");
    }

    #[test]
    fn test_non_routes_are_ignored() {
        assert!(call_sites("app.get('port')").is_empty());
        assert!(call_sites("axios.get('/api/users')").is_empty());
        assert!(call_sites("map.get(key)").is_empty());
        assert!(call_sites("app.listen(3000)").is_empty());
        assert!(call_sites("app.GET('/x')").is_empty());
    }

    #[test]
    fn test_identifier_chains_skip_strings() {
        let chains = identifier_chains("router.get('/me', passport.authenticate('jwt'), me)");
        assert_eq!(chains, vec!["router.get", "passport.authenticate", "me"]);
    }
}
