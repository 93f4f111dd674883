//! Tablas de símbolos del compilador.
//!
//! Durante la compilación de una clase existen exactamente dos ámbitos
//! anidados: el de clase (variables `static` y `field`) y el de
//! subrutina (argumentos y locales). La búsqueda intenta primero el
//! ámbito de subrutina. Cada ámbito asigna índices secuenciales por
//! categoría, comenzando en cero; esos índices son los que el código
//! generado usa dentro de cada segmento de la máquina virtual.

use std::collections::HashMap;
use std::fmt::{self, Display};

use vmtrans::Segment;

/// Categoría de una variable declarada.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Static,
    Field,
    Argument,
    Local,
}

impl Kind {
    /// Segmento de la máquina virtual donde vive la categoría.
    pub fn segment(self) -> Segment {
        match self {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Argument => Segment::Argument,
            Kind::Local => Segment::Local,
        }
    }

    fn slot(self) -> usize {
        match self {
            Kind::Static => 0,
            Kind::Field => 1,
            Kind::Argument => 2,
            Kind::Local => 3,
        }
    }
}

/// El tipo declarado de una variable: un primitivo o una clase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VarType {
    Int,
    Char,
    Boolean,
    Class(String),
}

impl Display for VarType {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Int => fmt.write_str("int"),
            VarType::Char => fmt.write_str("char"),
            VarType::Boolean => fmt.write_str("boolean"),
            VarType::Class(name) => fmt.write_str(name),
        }
    }
}

/// Una variable resuelta: su tipo, su categoría y su índice dentro del
/// segmento correspondiente.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub typ: VarType,
    pub kind: Kind,
    pub index: u16,
}

/// Un ámbito individual: nombres a entradas más los contadores de
/// índice por categoría.
#[derive(Default)]
struct Scope {
    entries: HashMap<String, Entry>,
    counts: [u16; 4],
}

impl Scope {
    fn define(&mut self, name: &str, typ: VarType, kind: Kind) -> Option<u16> {
        if self.entries.contains_key(name) {
            return None;
        }

        let index = self.counts[kind.slot()];
        self.counts[kind.slot()] += 1;

        self.entries.insert(
            name.to_string(),
            Entry { typ, kind, index },
        );

        Some(index)
    }
}

/// Los dos ámbitos vivos durante la compilación de una clase.
#[derive(Default)]
pub struct SymbolTable {
    class: Scope,
    subroutine: Scope,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Declara una variable en el ámbito que dicta su categoría.
    /// Retorna el índice asignado, o `None` si el nombre ya existe en
    /// ese ámbito.
    pub fn define(&mut self, name: &str, typ: VarType, kind: Kind) -> Option<u16> {
        match kind {
            Kind::Static | Kind::Field => self.class.define(name, typ, kind),
            Kind::Argument | Kind::Local => self.subroutine.define(name, typ, kind),
        }
    }

    /// Aparta un índice de la categoría sin asociarle nombre. Los
    /// métodos lo usan para el receptor implícito en `argument 0`.
    pub fn reserve(&mut self, kind: Kind) {
        match kind {
            Kind::Static | Kind::Field => self.class.counts[kind.slot()] += 1,
            Kind::Argument | Kind::Local => self.subroutine.counts[kind.slot()] += 1,
        }
    }

    /// Busca un nombre, primero en la subrutina y luego en la clase.
    pub fn lookup(&self, name: &str) -> Option<&Entry> {
        self.subroutine
            .entries
            .get(name)
            .or_else(|| self.class.entries.get(name))
    }

    /// Cantidad de variables declaradas de una categoría.
    pub fn count(&self, kind: Kind) -> u16 {
        match kind {
            Kind::Static | Kind::Field => self.class.counts[kind.slot()],
            Kind::Argument | Kind::Local => self.subroutine.counts[kind.slot()],
        }
    }

    /// Descarta el ámbito de subrutina al comenzar una nueva.
    pub fn start_subroutine(&mut self) {
        self.subroutine = Scope::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_grow_per_kind() {
        let mut table = SymbolTable::new();

        assert_eq!(table.define("x", VarType::Int, Kind::Field), Some(0));
        assert_eq!(table.define("y", VarType::Int, Kind::Field), Some(1));
        assert_eq!(table.define("count", VarType::Int, Kind::Static), Some(0));
        assert_eq!(table.define("i", VarType::Int, Kind::Local), Some(0));

        assert_eq!(table.count(Kind::Field), 2);
        assert_eq!(table.count(Kind::Local), 1);
    }

    #[test]
    fn subroutine_scope_shadows_the_class() {
        let mut table = SymbolTable::new();

        table.define("value", VarType::Int, Kind::Field);
        table.define("value", VarType::Boolean, Kind::Local);

        let entry = table.lookup("value").unwrap();
        assert_eq!(entry.kind, Kind::Local);

        table.start_subroutine();
        let entry = table.lookup("value").unwrap();
        assert_eq!(entry.kind, Kind::Field);
    }

    #[test]
    fn redefinition_in_scope_is_rejected() {
        let mut table = SymbolTable::new();

        assert_eq!(table.define("x", VarType::Int, Kind::Local), Some(0));
        assert_eq!(table.define("x", VarType::Int, Kind::Argument), None);
        assert_eq!(table.define("x", VarType::Int, Kind::Field), Some(0));
    }

    #[test]
    fn reserved_slots_shift_arguments() {
        let mut table = SymbolTable::new();

        table.reserve(Kind::Argument);
        assert_eq!(table.define("ax", VarType::Int, Kind::Argument), Some(1));

        table.start_subroutine();
        assert_eq!(table.define("ax", VarType::Int, Kind::Argument), Some(0));
    }
}
