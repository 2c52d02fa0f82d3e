use logos::Logos;

/// Tokens of the process formula language.
/// Arithmetic, comparisons and a handful of math calls; nothing else lexes.

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f\r\n]+")] // Skip whitespace
#[logos(error = LexerError)]
pub enum Token {
    // Literals
    #[regex(r"\d+(\.\d*)?([eE][+-]?\d+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.\d+([eE][+-]?\d+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Arithmetic
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("^")]
    #[token("**")]
    Power,

    // Comparison
    #[token("<")]
    Lt,

    #[token("<=")]
    Le,

    #[token(">")]
    Gt,

    #[token(">=")]
    Ge,

    #[token("==")]
    #[token("===")]
    EqEq,

    #[token("!=")]
    #[token("!==")]
    NotEq,

    // Logic
    #[token("&&")]
    AndAnd,

    #[token("||")]
    OrOr,

    #[token("!")]
    Bang,

    #[token("?")]
    Question,

    #[token(":")]
    Colon,

    // Punctuation
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Power => write!(f, "^"),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Bang => write!(f, "!"),
            Token::Question => write!(f, "?"),
            Token::Colon => write!(f, ":"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LexerError;

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lexer error")
    }
}

impl std::error::Error for LexerError {}

/// Lex a formula into tokens.
///
/// Unlike a permissive lexer, anything outside the formula alphabet (`=`,
/// `;`, quotes, brackets...) is rejected with the span of the first bad
/// character so it can be reported against the formula text.
pub fn lex(input: &str) -> Result<Vec<(Token, logos::Span)>, logos::Span> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(LexerError) => return Err(span),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<Token> {
        lex(input).expect("lex failed").into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            kinds("(machiningLength + toolDiameter) / feedRate"),
            vec![
                Token::LParen,
                Token::Ident("machiningLength".to_string()),
                Token::Plus,
                Token::Ident("toolDiameter".to_string()),
                Token::RParen,
                Token::Slash,
                Token::Ident("feedRate".to_string()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 2.5 .25 3. 1e3 2.5E-2"),
            vec![
                Token::Number(1.0),
                Token::Number(2.5),
                Token::Number(0.25),
                Token::Number(3.0),
                Token::Number(1000.0),
                Token::Number(0.025),
            ]
        );
    }

    #[test]
    fn test_compound_operators() {
        assert_eq!(
            kinds("a ** 2 <= b === c !== d && e || !f"),
            vec![
                Token::Ident("a".to_string()),
                Token::Power,
                Token::Number(2.0),
                Token::Le,
                Token::Ident("b".to_string()),
                Token::EqEq,
                Token::Ident("c".to_string()),
                Token::NotEq,
                Token::Ident("d".to_string()),
                Token::AndAnd,
                Token::Ident("e".to_string()),
                Token::OrOr,
                Token::Bang,
                Token::Ident("f".to_string()),
            ]
        );
    }

    #[test]
    fn test_math_namespace() {
        assert_eq!(
            kinds("Math.ceil(x)"),
            vec![
                Token::Ident("Math".to_string()),
                Token::Dot,
                Token::Ident("ceil".to_string()),
                Token::LParen,
                Token::Ident("x".to_string()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_rejects_assignment() {
        let err = lex("x = 5").unwrap_err();
        assert_eq!(err, 2..3);
    }

    #[test]
    fn test_rejects_statement_separator() {
        assert!(lex("a; b").is_err());
        assert!(lex("\"text\"").is_err());
    }
}
