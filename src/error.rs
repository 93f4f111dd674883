//! Presentación de diagnósticos de compilación.
//!
//! Un diagnóstico señala un error fatal junto a su ubicación: la línea
//! del fuente donde ocurre y un subrayado bajo el rango ofensivo. La
//! compilación es de primera falla, por lo cual cada corrida presenta a
//! lo sumo un diagnóstico.

use std::fmt::{self, Display};

use crate::source::{Located, Span};

/// Un error con ubicación, listo para presentarse contra el texto
/// fuente que lo produjo.
pub struct Diagnostic<'a> {
    file: &'a str,
    source: &'a str,
    span: Span,
    message: String,
}

impl<'a> Diagnostic<'a> {
    /// Construye un diagnóstico a partir de un error ubicado.
    pub fn new<E: Display>(file: &'a str, source: &'a str, error: &Located<E>) -> Self {
        Diagnostic {
            file,
            source,
            span: error.span(),
            message: error.val().to_string(),
        }
    }
}

impl Display for Diagnostic<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(fmt, "error: {}", self.message)?;

        let start = self.span.start();
        writeln!(fmt, " --> {}:{}", self.file, start)?;

        let line = match self.source.lines().nth(start.line() as usize - 1) {
            Some(line) => line,
            None => return Ok(()),
        };

        let digits = start.line().to_string().len();
        writeln!(fmt, "{:digits$} |", "")?;
        writeln!(fmt, "{} | {}", start.line(), line)?;

        // El subrayado se recorta a la línea donde comienza el rango
        let width = if self.span.end().line() == start.line() {
            (self.span.end().column().max(start.column() + 1) - start.column()) as usize
        } else {
            1
        };

        let skip = start.column() as usize - 1;
        writeln!(
            fmt,
            "{:digits$} | {:skip$}{:^<width$}",
            "",
            "",
            "",
            digits = digits,
            skip = skip,
            width = width
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Position, Span};

    #[test]
    fn renders_the_offending_line_with_a_caret() {
        let source = "class Main {\n    functoin void main() {\n}\n";

        let start = Position::default().newline().advance().advance().advance().advance();
        let mut end = start;
        for _ in 0.."functoin".len() {
            end = end.advance();
        }

        let error = Located::at("unknown keyword", Span::new(start, end));
        let text = Diagnostic::new("Main.jack", source, &error).to_string();

        assert!(text.starts_with("error: unknown keyword\n"));
        assert!(text.contains(" --> Main.jack:2:5\n"));
        assert!(text.contains("2 |     functoin void main() {\n"));
        assert!(text.contains("  |     ^^^^^^^^\n"));
    }
}
