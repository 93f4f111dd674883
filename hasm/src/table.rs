//! Tabla de símbolos del ensamblador.
//!
//! La tabla nace sembrada con los símbolos arquitectónicos de la
//! plataforma (punteros de la convención de llamadas, registros
//! virtuales y dispositivos mapeados a memoria) y persiste durante todo
//! el ensamblado de un archivo. Las etiquetas se registran durante la
//! primera pasada; las variables se asignan durante la segunda, en el
//! orden en que se referencian por primera vez, a partir de la
//! dirección 16.

use std::collections::HashMap;

use thiserror::Error;

/// Primera dirección de RAM disponible para variables.
const VAR_BASE: u32 = 16;

/// Última dirección de RAM direccionable.
const RAM_MAX: u32 = u16::MAX as u32;

/// Error de resolución de símbolos.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SymbolError {
    /// Dos declaraciones de etiqueta comparten nombre.
    #[error("label `{0}` is already defined")]
    Redefined(String),

    /// Referencia a una etiqueta (nombre en mayúsculas) jamás declarada.
    #[error("reference to undeclared label `{0}`")]
    UndeclaredLabel(String),

    /// No quedan direcciones de RAM para asignar variables.
    #[error("out of RAM, cannot allocate `{0}`")]
    RamExhausted(String),
}

/// Mapa de nombres a direcciones de 16 bits, más el contador de la
/// siguiente dirección libre para variables.
pub struct SymbolTable {
    symbols: HashMap<String, u16>,
    next_free: u32,
}

impl SymbolTable {
    /// Crea una tabla sembrada con los símbolos predefinidos.
    pub fn new() -> Self {
        let mut symbols = HashMap::new();

        for (name, address) in [
            ("SP", 0),
            ("LCL", 1),
            ("ARG", 2),
            ("THIS", 3),
            ("THAT", 4),
            ("SCREEN", 16384),
            ("KBD", 24576),
        ] {
            symbols.insert(name.to_string(), address);
        }

        for register in 0..=15 {
            symbols.insert(format!("R{}", register), register);
        }

        SymbolTable {
            symbols,
            next_free: VAR_BASE,
        }
    }

    /// Registra una etiqueta en una dirección de código.
    pub fn define(&mut self, name: &str, address: u16) -> Result<(), SymbolError> {
        if self.symbols.contains_key(name) {
            return Err(SymbolError::Redefined(name.to_string()));
        }

        self.symbols.insert(name.to_string(), address);
        Ok(())
    }

    /// Resuelve una referencia `@símbolo`.
    ///
    /// Un símbolo desconocido escrito enteramente en mayúsculas se toma
    /// por una etiqueta jamás declarada y es un error; cualquier otro
    /// símbolo desconocido es una variable y recibe la siguiente
    /// dirección libre de RAM.
    pub fn resolve(&mut self, name: &str) -> Result<u16, SymbolError> {
        if let Some(&address) = self.symbols.get(name) {
            return Ok(address);
        }

        if looks_like_label(name) {
            return Err(SymbolError::UndeclaredLabel(name.to_string()));
        }

        let address = self.allocate(name)?;
        self.symbols.insert(name.to_string(), address);
        Ok(address)
    }

    fn allocate(&mut self, name: &str) -> Result<u16, SymbolError> {
        if self.next_free > RAM_MAX {
            return Err(SymbolError::RamExhausted(name.to_string()));
        }

        let address = self.next_free as u16;
        self.next_free += 1;
        Ok(address)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

/// Las etiquetas se escriben en mayúsculas por convención; un nombre
/// sin una sola letra minúscula se trata como etiqueta.
fn looks_like_label(name: &str) -> bool {
    let mut letters = name.chars().filter(|c| c.is_ascii_alphabetic()).peekable();

    letters.peek().is_some() && letters.all(|c| c.is_ascii_uppercase())
}
