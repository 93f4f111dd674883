//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone el texto fuente
//! en unidades léxicas denominadas tokens. Los espacios en blanco y los
//! comentarios (`//` de línea y `/* */` de bloque, sin anidar) se
//! descartan durante esta operación. Cada token emitido queda asociado
//! a un rango de posiciones en el código original, lo cual permite
//! rastrear errores tanto en los tokens mismos como en constructos más
//! elevados de fases posteriores.
//!
//! # Reglas importantes del lenguaje
//! - Las palabras clave y los identificadores se reconocen bajo el
//!   mismo escaneo: un prefijo con forma de palabra clave seguido de un
//!   carácter de identificador es un identificador (`classes` no
//!   contiene a `class`).
//! - Las constantes enteras viven en el rango `0..=32767`.
//! - Las cadenas van entre comillas dobles, sin saltos de línea y sin
//!   secuencias de escape.
//!
//! # Errores
//! El lexer es de primera falla: el primer carácter inválido, constante
//! fuera de rango o cadena sin terminar detiene la compilación.

use std::fmt::{self, Display};
use std::iter::Peekable;
use std::mem;
use std::str::{Chars, FromStr};

use thiserror::Error;

use crate::source::{Located, Position, Span};

/// Literal entero máximo.
const INT_MAX: u32 = (1 << 15) - 1;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("bad character {0:?} in input stream")]
    BadChar(char),

    /// Una constante entera se encuentra fuera de rango.
    #[error("integer literal overflow, valid range is [0, {INT_MAX}]")]
    IntOverflow,

    /// Una cadena alcanzó un salto de línea o el fin del archivo sin
    /// su comilla de cierre.
    #[error("unterminated string literal")]
    UnterminatedString,

    /// Un comentario de bloque alcanzó el fin del archivo sin `*/`.
    #[error("unterminated block comment")]
    UnterminatedComment,
}

/// Objeto resultante del análisis léxico.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Palabra clave.
    Keyword(Keyword),

    /// Uno de los diecinueve símbolos de un carácter.
    Symbol(char),

    /// Constante entera.
    Int(u16),

    /// Constante de cadena, sin sus comillas.
    Str(String),

    /// Identificador.
    Ident(String),
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Token::Symbol(symbol) => write!(fmt, "`{}`", symbol),
            Token::Int(integer) => write!(fmt, "integer `{}`", integer),
            Token::Str(string) => write!(fmt, "string \"{}\"", string),
            Token::Ident(id) => write!(fmt, "identifier `{}`", id),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    Null,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("class", Keyword::Class),
    ("constructor", Keyword::Constructor),
    ("function", Keyword::Function),
    ("method", Keyword::Method),
    ("field", Keyword::Field),
    ("static", Keyword::Static),
    ("var", Keyword::Var),
    ("int", Keyword::Int),
    ("char", Keyword::Char),
    ("boolean", Keyword::Boolean),
    ("void", Keyword::Void),
    ("true", Keyword::True),
    ("false", Keyword::False),
    ("null", Keyword::Null),
    ("this", Keyword::This),
    ("let", Keyword::Let),
    ("do", Keyword::Do),
    ("if", Keyword::If),
    ("else", Keyword::Else),
    ("while", Keyword::While),
    ("return", Keyword::Return),
];

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = KEYWORDS
            .iter()
            .find(|&&(_, keyword)| keyword == *self)
            .map(|&(text, _)| text)
            .expect("every keyword is in the table");

        fmt.write_str(text)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Máquina de estados para análisis léxico.
///
/// Un lexer puede encontrarse en uno de diversos estados. La salida del
/// lexer, así como su siguiente estado, se define a partir de tanto su
/// estado actual como el siguiente carácter del flujo de entrada.
pub struct Lexer<'a> {
    source: Peekable<Chars<'a>>,
    state: State,
    start: Position,
    next: Position,
    failed: bool,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Se reconoció un símbolo completo; siempre lo emite en la
    /// siguiente iteración, una vez consumida la entrada.
    Symbol(char),

    /// Se encontró `/`: puede abrir un comentario o ser el operador.
    Slash,

    /// Comentario de línea; termina en `'\n'`.
    LineComment,

    /// Comentario de bloque; termina en `*/`.
    BlockComment,

    /// Comentario de bloque tras un `*` que podría cerrarlo.
    BlockStar,

    /// Constante entera en acumulación dígito a dígito.
    Integer(u16),

    /// Término que puede ser un identificador o una palabra clave.
    Word(String),

    /// Constante de cadena en acumulación.
    Str(String),

    /// Se encontró la comilla de cierre; emite tras consumirla.
    StrEnd(String),
}

impl<'a> Lexer<'a> {
    /// Crea un lexer en estado inicial sobre un texto fuente.
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source: source.chars().peekable(),
            state: State::Start,
            start: Position::default(),
            next: Position::default(),
            failed: false,
        }
    }

    /// Intenta construir el siguiente token.
    fn lex(&mut self) -> Result<Option<(Token, Span)>, LexError> {
        use State::*;

        let token = loop {
            let next_char = self.source.peek().copied();

            // La posición de origen se mueve junto a la posición
            // siguiente mientras no comience un token
            if let Start = self.state {
                self.start = self.next;
            }

            // Switch table principal: combina el estado actual con el
            // siguiente carácter para decidir estado y salida
            match (&mut self.state, next_char) {
                (Start, None) => return Ok(None),
                (Start, Some(c)) if c.is_ascii_whitespace() => (),
                (Start, Some('/')) => self.state = Slash,
                (Start, Some('"')) => self.state = Str(String::new()),
                (Start, Some(c)) if is_symbol_char(c) => self.state = Symbol(c),

                (Start, Some(c)) if c.is_ascii_digit() => {
                    // No se consume el dígito; el estado de constante
                    // entera ya sabe acumularlo
                    self.state = Integer(0);
                    continue;
                }

                (Start, Some(c)) if c.is_ascii_alphabetic() || c == '_' => {
                    self.state = Word(c.to_string())
                }

                (Start, Some(c)) => break Err(LexError::BadChar(c)),

                // Emisión retardada de símbolos ya consumidos
                (Symbol(c), _) => break Ok(Token::Symbol(*c)),

                (Slash, Some('/')) => self.state = LineComment,
                (Slash, Some('*')) => self.state = BlockComment,
                (Slash, _) => break Ok(Token::Symbol('/')),

                (LineComment, Some('\n')) | (LineComment, None) => self.state = Start,
                (LineComment, Some(_)) => (),

                (BlockComment, Some('*')) => self.state = BlockStar,
                (BlockComment, Some(_)) => (),
                (BlockStar, Some('/')) => self.state = Start,
                (BlockStar, Some('*')) => (),
                (BlockStar, Some(_)) => self.state = BlockComment,
                (BlockComment, None) | (BlockStar, None) => {
                    break Err(LexError::UnterminatedComment)
                }

                // Acumulación dígito a dígito de constantes enteras
                (Integer(accumulated), Some(digit)) if digit.is_ascii_digit() => {
                    let digit = digit.to_digit(10).unwrap();
                    let value = *accumulated as u32 * 10 + digit;

                    if value > INT_MAX {
                        break Err(LexError::IntOverflow);
                    }

                    *accumulated = value as u16;
                }

                (Integer(integer), _) => break Ok(Token::Int(*integer)),

                // Extensión de términos
                (Word(word), Some(c)) if is_word_char(c) => word.push(c),

                (Word(word), _) => {
                    break Ok(match word.parse() {
                        Ok(keyword) => Token::Keyword(keyword),
                        Err(()) => Token::Ident(mem::take(word)),
                    })
                }

                (Str(_), Some('\n')) | (Str(_), None) => {
                    break Err(LexError::UnterminatedString)
                }
                (Str(string), Some('"')) => self.state = StrEnd(mem::take(string)),
                (Str(string), Some(c)) => string.push(c),

                (StrEnd(string), _) => break Ok(Token::Str(mem::take(string))),
            }

            // Si no hubo `continue`, aquí se consume el carácter que se
            // observó con lookahead anteriormente
            if let Some(c) = self.source.next() {
                self.next = self.next.next(c);
            }
        };

        token.map(|token| Some((token, Span::new(self.start, self.next))))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Located<Token>, Located<LexError>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.lex() {
            Ok(None) => None,
            Ok(Some((token, span))) => {
                self.state = State::Start;
                Some(Ok(Located::at(token, span)))
            }

            Err(error) => {
                self.failed = true;
                let span = Span::new(self.start, self.next.advance());
                Some(Err(Located::at(error, span)))
            }
        }
    }
}

/// Reduce un texto fuente completo a su secuencia de tokens, o al
/// primer error de escaneo.
pub fn tokenize(source: &str) -> Result<Vec<Located<Token>>, Located<LexError>> {
    Lexer::new(source).collect()
}

/// Determina si un carácter es uno de los símbolos del lenguaje. El
/// `/` no figura porque su reconocimiento pasa por los comentarios.
fn is_symbol_char(c: char) -> bool {
    matches!(
        c,
        '{' | '}' | '(' | ')' | '[' | ']' | '.' | ',' | ';' | '+' | '-' | '*' | '&' | '|' | '<'
            | '>' | '=' | '~'
    )
}

/// Determina si un carácter puede pertenecer a un término.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(Located::into_inner)
            .collect()
    }

    fn error(source: &str) -> LexError {
        tokenize(source).unwrap_err().into_inner()
    }

    #[test]
    fn scans_a_small_class() {
        let source = "class Main {\n    function void main() {\n        return;\n    }\n}\n";

        assert_eq!(
            tokens(source),
            [
                Token::Keyword(Keyword::Class),
                Token::Ident("Main".to_string()),
                Token::Symbol('{'),
                Token::Keyword(Keyword::Function),
                Token::Keyword(Keyword::Void),
                Token::Ident("main".to_string()),
                Token::Symbol('('),
                Token::Symbol(')'),
                Token::Symbol('{'),
                Token::Keyword(Keyword::Return),
                Token::Symbol(';'),
                Token::Symbol('}'),
                Token::Symbol('}'),
            ]
        );
    }

    #[test]
    fn keyword_prefixes_stay_identifiers() {
        assert_eq!(
            tokens("class classes varx do_it"),
            [
                Token::Keyword(Keyword::Class),
                Token::Ident("classes".to_string()),
                Token::Ident("varx".to_string()),
                Token::Ident("do_it".to_string()),
            ]
        );
    }

    #[test]
    fn comments_are_stripped() {
        let source = "let // hasta el final\nx /* en medio */ = /* varias\nlineas */ 5;";

        assert_eq!(
            tokens(source),
            [
                Token::Keyword(Keyword::Let),
                Token::Ident("x".to_string()),
                Token::Symbol('='),
                Token::Int(5),
                Token::Symbol(';'),
            ]
        );
    }

    #[test]
    fn block_comments_are_not_greedy() {
        assert_eq!(
            tokens("/* uno */ x /* dos */"),
            [Token::Ident("x".to_string())]
        );
        assert_eq!(tokens("/* ** * / *** */ y"), [Token::Ident("y".to_string())]);
    }

    #[test]
    fn slash_is_still_an_operator() {
        assert_eq!(
            tokens("a / b"),
            [
                Token::Ident("a".to_string()),
                Token::Symbol('/'),
                Token::Ident("b".to_string()),
            ]
        );
    }

    #[test]
    fn strings_keep_their_contents() {
        assert_eq!(
            tokens("\"hola, mundo\" \"\""),
            [
                Token::Str("hola, mundo".to_string()),
                Token::Str(String::new()),
            ]
        );
    }

    #[test]
    fn comment_markers_inside_strings_are_text() {
        assert_eq!(
            tokens("\"no // es comentario\""),
            [Token::Str("no // es comentario".to_string())]
        );
    }

    #[test]
    fn integer_bounds() {
        assert_eq!(tokens("32767"), [Token::Int(32767)]);
        assert_eq!(error("32768"), LexError::IntOverflow);
    }

    #[test]
    fn bad_inputs_are_fatal() {
        assert_eq!(error("let x = #"), LexError::BadChar('#'));
        assert_eq!(error("\"sin cerrar"), LexError::UnterminatedString);
        assert_eq!(error("\"salto\nde linea\""), LexError::UnterminatedString);
        assert_eq!(error("/* sin cerrar"), LexError::UnterminatedComment);
    }

    #[test]
    fn spans_point_into_the_source() {
        let located = &tokenize("let x;").unwrap()[1];

        assert_eq!(*located.val(), Token::Ident("x".to_string()));
        assert_eq!(located.span().start().to_string(), "1:5");
        assert_eq!(located.span().end().to_string(), "1:6");
    }

    #[test]
    fn error_spans_have_lines() {
        let error = tokenize("let\nx = 99999;").unwrap_err();

        assert_eq!(error.span().start().line(), 2);
        assert_eq!(*error.val(), LexError::IntOverflow);
    }
}
