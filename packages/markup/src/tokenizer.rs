//! # Markup Tokenizer
//!
//! Two logos lexers share one source: [`ContentToken`] reads text between
//! tags, [`TagToken`] reads the inside of a tag. The tokenizer morphs between
//! them at every `<` and `>`.

use crate::error::{ParseError, ParseResult};
use logos::Logos;
use std::fmt;
use std::ops::Range;

/// Tokens between tags
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"<!--([^-]|-[^-])*-->")]
pub enum ContentToken<'src> {
    #[token("</")]
    CloseTagOpen,

    #[token("<")]
    TagOpen,

    #[regex(r"&[a-zA-Z]+;|&#[0-9]+;|&#x[0-9a-fA-F]+;", |lex| lex.slice())]
    Entity(&'src str),

    #[regex(r"[^<&]+", |lex| lex.slice())]
    Text(&'src str),
}

/// Tokens inside a tag
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum TagToken<'src> {
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_.:-]*", |lex| lex.slice())]
    Name(&'src str),

    #[token("=")]
    Equals,

    // Quotes are stripped; entities are decoded by the parser
    #[regex(r#""[^"]*""#, |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    #[regex(r"'[^']*'", |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    Value(&'src str),

    #[token(">")]
    TagEnd,

    #[token("/>")]
    SelfClose,
}

/// Unified token stream handed to the parser
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    Text(&'src str),
    Entity(&'src str),
    TagOpen,
    CloseTagOpen,
    Name(&'src str),
    Equals,
    Value(&'src str),
    TagEnd,
    SelfClose,
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(_) => write!(f, "text"),
            Token::Entity(e) => write!(f, "entity {}", e),
            Token::TagOpen => write!(f, "<"),
            Token::CloseTagOpen => write!(f, "</"),
            Token::Name(n) => write!(f, "name '{}'", n),
            Token::Equals => write!(f, "="),
            Token::Value(v) => write!(f, "value \"{}\"", v),
            Token::TagEnd => write!(f, ">"),
            Token::SelfClose => write!(f, "/>"),
        }
    }
}

/// Tokenize markup source with byte spans
pub fn tokenize(source: &str) -> ParseResult<Vec<(Token<'_>, Range<usize>)>> {
    let mut tokens = Vec::new();
    let mut content = ContentToken::lexer(source);

    loop {
        let Some(result) = content.next() else {
            break;
        };
        let span = content.span();
        let token = result.map_err(|_| ParseError::lexer_error(span.start, &source[span.clone()]))?;

        let opens_tag = match token {
            ContentToken::Text(text) => {
                tokens.push((Token::Text(text), span));
                false
            }
            ContentToken::Entity(entity) => {
                tokens.push((Token::Entity(entity), span));
                false
            }
            ContentToken::TagOpen => {
                tokens.push((Token::TagOpen, span));
                true
            }
            ContentToken::CloseTagOpen => {
                tokens.push((Token::CloseTagOpen, span));
                true
            }
        };

        if opens_tag {
            let mut tag = content.morph::<TagToken>();
            loop {
                let Some(result) = tag.next() else {
                    return Err(ParseError::unexpected_eof(source.len(), "'>' or '/>'"));
                };
                let span = tag.span();
                let token = result.map_err(|_| ParseError::lexer_error(span.start, &source[span.clone()]))?;

                let (token, ends_tag) = match token {
                    TagToken::Name(name) => (Token::Name(name), false),
                    TagToken::Equals => (Token::Equals, false),
                    TagToken::Value(value) => (Token::Value(value), false),
                    TagToken::TagEnd => (Token::TagEnd, true),
                    TagToken::SelfClose => (Token::SelfClose, true),
                };
                tokens.push((token, span));

                if ends_tag {
                    break;
                }
            }
            content = tag.morph();
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_element() {
        let tokens = tokenize(r#"<bold>Hi &amp; bye</bold>"#).unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|(t, _)| t).collect();

        assert_eq!(
            kinds,
            vec![
                Token::TagOpen,
                Token::Name("bold"),
                Token::TagEnd,
                Token::Text("Hi "),
                Token::Entity("&amp;"),
                Token::Text(" bye"),
                Token::CloseTagOpen,
                Token::Name("bold"),
                Token::TagEnd,
            ]
        );
    }

    #[test]
    fn test_tokenize_attributes() {
        let tokens = tokenize(r#"<diagram id="d1" kind='flowchart'/>"#).unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|(t, _)| t).collect();

        assert_eq!(
            kinds,
            vec![
                Token::TagOpen,
                Token::Name("diagram"),
                Token::Name("id"),
                Token::Equals,
                Token::Value("d1"),
                Token::Name("kind"),
                Token::Equals,
                Token::Value("flowchart"),
                Token::SelfClose,
            ]
        );
    }

    #[test]
    fn test_spans_cover_source() {
        let source = "<p>héllo</p>";
        let tokens = tokenize(source).unwrap();
        let (token, span) = &tokens[3];
        assert_eq!(*token, Token::Text("héllo"));
        assert_eq!(&source[span.clone()], "héllo");
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = tokenize("<doc><!-- note --></doc>").unwrap();
        assert_eq!(tokens.len(), 6);
    }

    #[test]
    fn test_stray_ampersand_is_an_error() {
        let error = tokenize("<p>fish & chips</p>").unwrap_err();
        assert!(matches!(error, ParseError::LexerError { pos: 8, .. }));
    }

    #[test]
    fn test_unterminated_tag() {
        let error = tokenize("<doc").unwrap_err();
        assert!(matches!(error, ParseError::UnexpectedEof { .. }));
    }
}
