//! Salida XML del flujo de tokens.
//!
//! El modo `-m xml` no compila: vuelca la secuencia de tokens como un
//! documento `<tokens>`, un elemento por token, con los caracteres
//! especiales de XML escapados. Este formato sirve para inspeccionar
//! la fase léxica en aislamiento.

use std::io::{self, Write};

use crate::lex::Token;
use crate::source::Located;

/// Escribe el documento `<tokens>` de un archivo completo.
pub fn write_tokens<W: Write>(tokens: &[Located<Token>], output: &mut W) -> io::Result<()> {
    writeln!(output, "<tokens>")?;

    for token in tokens {
        let (tag, text) = match token.val() {
            Token::Keyword(keyword) => ("keyword", keyword.to_string()),
            Token::Symbol(symbol) => ("symbol", symbol.to_string()),
            Token::Int(integer) => ("integerConstant", integer.to_string()),
            Token::Str(string) => ("stringConstant", string.clone()),
            Token::Ident(id) => ("identifier", id.clone()),
        };

        writeln!(output, "<{0}> {1} </{0}>", tag, escape(&text))?;
    }

    writeln!(output, "</tokens>")
}

/// Escapa los cuatro caracteres reservados de XML.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::tokenize;

    fn xml_of(source: &str) -> String {
        let tokens = tokenize(source).unwrap();
        let mut output = Vec::new();
        write_tokens(&tokens, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn tokens_become_elements() {
        let xml = xml_of("class Main { let x = 5; }");

        assert!(xml.starts_with("<tokens>\n"));
        assert!(xml.ends_with("</tokens>\n"));
        assert!(xml.contains("<keyword> class </keyword>\n"));
        assert!(xml.contains("<identifier> Main </identifier>\n"));
        assert!(xml.contains("<symbol> { </symbol>\n"));
        assert!(xml.contains("<integerConstant> 5 </integerConstant>\n"));
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let xml = xml_of("if (a < b) { do f(\"x & y\"); }");

        assert!(xml.contains("<symbol> &lt; </symbol>\n"));
        assert!(xml.contains("<stringConstant> x &amp; y </stringConstant>\n"));
    }
}
