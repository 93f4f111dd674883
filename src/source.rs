//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los objetos que el compilador construye llevan cuenta de rangos de
//! posiciones en el código fuente original, lo cual permite señalar el
//! punto exacto o aproximado donde ocurre un error de abstracción
//! arbitraria. Como cada archivo se lee completo antes de compilarse,
//! las ubicaciones solo guardan coordenadas; el texto para los
//! diagnósticos se recupera del propio fuente en memoria.

use std::fmt::{self, Debug, Display, Formatter};
use std::ops::Range;

/// Ancho de los divisores de tabulador.
const TAB_STOP: u32 = 4;

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    pub fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Ajusta la posición a la siguiente columna de tabulador.
    pub fn tab(self) -> Position {
        let column = 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP;
        Position {
            line: self.line,
            column,
        }
    }

    /// Posición que le corresponde al siguiente carácter.
    pub fn next(self, c: char) -> Position {
        match c {
            '\n' => self.newline(),
            '\t' => self.tab(),
            _ => self.advance(),
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Un rango de posiciones, cerrado por la izquierda y abierto por la
/// derecha.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Span {
    start: Position,
    end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }

    /// Rango de un solo carácter.
    pub fn single(at: Position) -> Self {
        Span {
            start: at,
            end: at.advance(),
        }
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    /// Unifica dos rangos contiguos o anidados.
    pub fn join(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
        }
    }
}

impl From<Range<Position>> for Span {
    fn from(range: Range<Position>) -> Self {
        Span {
            start: range.start,
            end: range.end,
        }
    }
}

impl Display for Span {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.start, formatter)
    }
}

impl Debug for Span {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "[{}-{}]", self.start, self.end)
    }
}

/// Un objeto cualquiera con una ubicación original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    span: Span,
    value: T,
}

impl<T> Located<T> {
    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, span: Span) -> Self {
        Located { value, span }
    }

    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Span, T) {
        (self.span, self.value)
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            span: self.span,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_track_lines_columns_and_tabs() {
        let start = Position::default();

        assert_eq!(start.to_string(), "1:1");
        assert_eq!(start.next('a').to_string(), "1:2");
        assert_eq!(start.next('\n').to_string(), "2:1");
        assert_eq!(start.next('\t').to_string(), "1:5");
        assert_eq!(start.next('a').next('\t').to_string(), "1:5");
    }

    #[test]
    fn spans_join() {
        let a = Span::single(Position::default());
        let b = Span::single(Position::default().advance().advance());

        let joined = a.join(b);
        assert_eq!(joined.start(), a.start());
        assert_eq!(joined.end(), b.end());
    }
}
