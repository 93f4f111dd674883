//! Modelo de instrucciones del lenguaje ensamblador Hack.
//!
//! # Formas de instrucción
//! El lenguaje distingue tres formas sintácticas. Una instrucción `A`
//! (`@constante` o `@símbolo`) carga una dirección en el registro `A`.
//! Una instrucción `C` (`dest=comp;jmp`, donde `dest` y `jmp` son
//! opcionales) describe un cómputo de la ALU, sus destinos y una
//! condición de salto. Una declaración de etiqueta (`(NOMBRE)`) no emite
//! palabra alguna y solo asocia un nombre a la dirección de la siguiente
//! instrucción.
//!
//! # Codificación
//! Toda instrucción emitida ocupa exactamente una palabra de 16 bits.
//! Las instrucciones `A` reservan el bit más significativo en `0` y por
//! tanto solo pueden dirigirse a los primeros 2^15 destinos. Las
//! instrucciones `C` llevan `111` en sus tres bits superiores, seguidos
//! por los campos `comp` (7 bits), `dest` (3 bits) y `jmp` (3 bits).
//!
//! Los mnemónicos se resuelven contra tablas fijas; un mnemónico que no
//! aparece en su tabla es un error de ensamblado, nunca una palabra
//! arbitraria.

use std::fmt::{self, Display};
use std::str::FromStr;

use thiserror::Error;

/// Mayor literal que cabe en una instrucción `A`.
pub const ADDRESS_MAX: u32 = (1 << 15) - 1;

/// Error de decodificación de una instrucción individual.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BadInstruction {
    /// El mnemónico de cómputo no está en la tabla.
    #[error("unknown computation `{0}`")]
    UnknownComp(String),

    /// El campo de destino no está en la tabla.
    #[error("unknown destination `{0}`")]
    UnknownDest(String),

    /// El campo de salto no está en la tabla.
    #[error("unknown jump condition `{0}`")]
    UnknownJump(String),

    /// Un literal decimal no cabe en los 15 bits de una instrucción `A`.
    #[error("address literal {0} is out of range, the maximum is {ADDRESS_MAX}")]
    LiteralOverflow(u32),

    /// Un símbolo contiene caracteres fuera del alfabeto permitido.
    #[error("malformed symbol `{0}`")]
    BadSymbol(String),

    /// Una declaración de etiqueta sin `)` de cierre, o vacía.
    #[error("malformed label declaration `{0}`")]
    BadLabel(String),
}

/// Una instrucción o declaración del lenguaje ensamblador.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asm {
    /// `@destino`
    Address(Addr),

    /// `dest=comp;jmp`
    Compute {
        dest: Dest,
        comp: Comp,
        jump: Jump,
    },

    /// `(NOMBRE)`
    Label(String),
}

impl Asm {
    /// Forma abreviada para `dest=comp` sin salto.
    pub fn assign(dest: Dest, comp: Comp) -> Self {
        Asm::Compute {
            dest,
            comp,
            jump: Jump::None,
        }
    }

    /// Forma abreviada para `comp;jmp` sin destino.
    pub fn branch(comp: Comp, jump: Jump) -> Self {
        Asm::Compute {
            dest: Dest::None,
            comp,
            jump,
        }
    }

    /// Referencia `@` a un símbolo.
    pub fn at<S: Into<String>>(symbol: S) -> Self {
        Asm::Address(Addr::Symbol(symbol.into()))
    }

    /// Referencia `@` a un literal.
    pub fn at_literal(value: u16) -> Self {
        Asm::Address(Addr::Literal(value))
    }
}

impl Display for Asm {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asm::Address(Addr::Literal(value)) => write!(fmt, "@{}", value),
            Asm::Address(Addr::Symbol(symbol)) => write!(fmt, "@{}", symbol),
            Asm::Label(name) => write!(fmt, "({})", name),
            Asm::Compute { dest, comp, jump } => {
                if *dest != Dest::None {
                    write!(fmt, "{}=", dest)?;
                }
                write!(fmt, "{}", comp)?;
                if *jump != Jump::None {
                    write!(fmt, ";{}", jump)?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for Asm {
    type Err = BadInstruction;

    /// Decodifica una instrucción ya despojada de comentarios y
    /// espacios exteriores. Los espacios interiores de una instrucción
    /// `C` se toleran (`M = -1` equivale a `M=-1`).
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = text.strip_prefix('@') {
            return Ok(Asm::Address(rest.parse()?));
        }

        if let Some(rest) = text.strip_prefix('(') {
            let name = rest
                .strip_suffix(')')
                .filter(|name| is_symbol(name))
                .ok_or_else(|| BadInstruction::BadLabel(text.to_string()))?;

            return Ok(Asm::Label(name.to_string()));
        }

        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();

        let (dest, rest) = match compact.split_once('=') {
            Some((dest, rest)) => (dest.parse()?, rest),
            None => (Dest::None, compact.as_str()),
        };

        let (comp, jump) = match rest.split_once(';') {
            Some((comp, jump)) => (comp.parse()?, jump.parse()?),
            None => (rest.parse()?, Jump::None),
        };

        Ok(Asm::Compute { dest, comp, jump })
    }
}

/// Destino de una instrucción `A`: un literal decimal o un símbolo
/// a resolver contra la tabla de símbolos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addr {
    Literal(u16),
    Symbol(String),
}

impl FromStr for Addr {
    type Err = BadInstruction;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.starts_with(|c: char| c.is_ascii_digit()) {
            let value: u32 = text
                .parse()
                .map_err(|_| BadInstruction::BadSymbol(text.to_string()))?;

            if value > ADDRESS_MAX {
                return Err(BadInstruction::LiteralOverflow(value));
            }

            Ok(Addr::Literal(value as u16))
        } else if is_symbol(text) {
            Ok(Addr::Symbol(text.to_string()))
        } else {
            Err(BadInstruction::BadSymbol(text.to_string()))
        }
    }
}

/// Determina si un texto conforma un símbolo válido: letras, dígitos,
/// `_`, `.`, `$` y `:`, sin comenzar con dígito.
fn is_symbol(text: &str) -> bool {
    let tail = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | ':');

    match text.chars().next() {
        Some(first) => !first.is_ascii_digit() && text.chars().all(tail),
        None => false,
    }
}

/// Campo de destino de una instrucción `C`.
///
/// El orden de las variantes coincide con su codificación de 3 bits.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dest {
    None = 0b000,
    M = 0b001,
    D = 0b010,
    MD = 0b011,
    A = 0b100,
    AM = 0b101,
    AD = 0b110,
    AMD = 0b111,
}

impl Dest {
    pub fn bits(self) -> u16 {
        self as u16
    }
}

const DESTS: &[(&str, Dest)] = &[
    ("M", Dest::M),
    ("D", Dest::D),
    ("MD", Dest::MD),
    ("A", Dest::A),
    ("AM", Dest::AM),
    ("AD", Dest::AD),
    ("AMD", Dest::AMD),
];

impl Display for Dest {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = DESTS
            .iter()
            .find(|&&(_, dest)| dest == *self)
            .map(|&(text, _)| text)
            .unwrap_or("");

        fmt.write_str(text)
    }
}

impl FromStr for Dest {
    type Err = BadInstruction;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        DESTS
            .iter()
            .find(|&&(name, _)| name == text)
            .map(|&(_, dest)| dest)
            .ok_or_else(|| BadInstruction::UnknownDest(text.to_string()))
    }
}

/// Condición de salto de una instrucción `C`.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Jump {
    None = 0b000,
    JGT = 0b001,
    JEQ = 0b010,
    JGE = 0b011,
    JLT = 0b100,
    JNE = 0b101,
    JLE = 0b110,
    JMP = 0b111,
}

impl Jump {
    pub fn bits(self) -> u16 {
        self as u16
    }
}

const JUMPS: &[(&str, Jump)] = &[
    ("JGT", Jump::JGT),
    ("JEQ", Jump::JEQ),
    ("JGE", Jump::JGE),
    ("JLT", Jump::JLT),
    ("JNE", Jump::JNE),
    ("JLE", Jump::JLE),
    ("JMP", Jump::JMP),
];

impl Display for Jump {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = JUMPS
            .iter()
            .find(|&&(_, jump)| jump == *self)
            .map(|&(text, _)| text)
            .unwrap_or("");

        fmt.write_str(text)
    }
}

impl FromStr for Jump {
    type Err = BadInstruction;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        JUMPS
            .iter()
            .find(|&&(name, _)| name == text)
            .map(|&(_, jump)| jump)
            .ok_or_else(|| BadInstruction::UnknownJump(text.to_string()))
    }
}

/// Campo de cómputo de una instrucción `C`.
///
/// Las 28 variantes cubren las expresiones que la ALU sabe producir.
/// Las que involucran `M` (memoria en `RAM[A]`) son las mismas que sus
/// contrapartes con `A`, con el bit `a` encendido.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Comp {
    Zero,
    One,
    MinusOne,
    D,
    A,
    NotD,
    NotA,
    MinusD,
    MinusA,
    DPlusOne,
    APlusOne,
    DMinusOne,
    AMinusOne,
    DPlusA,
    DMinusA,
    AMinusD,
    DAndA,
    DOrA,
    M,
    NotM,
    MinusM,
    MPlusOne,
    MMinusOne,
    DPlusM,
    DMinusM,
    MMinusD,
    DAndM,
    DOrM,
}

/// Tabla fija mnemónico ↔ variante ↔ bits `a c1..c6`.
const COMPS: &[(&str, Comp, u16)] = &[
    ("0", Comp::Zero, 0b0101010),
    ("1", Comp::One, 0b0111111),
    ("-1", Comp::MinusOne, 0b0111010),
    ("D", Comp::D, 0b0001100),
    ("A", Comp::A, 0b0110000),
    ("!D", Comp::NotD, 0b0001101),
    ("!A", Comp::NotA, 0b0110001),
    ("-D", Comp::MinusD, 0b0001111),
    ("-A", Comp::MinusA, 0b0110011),
    ("D+1", Comp::DPlusOne, 0b0011111),
    ("A+1", Comp::APlusOne, 0b0110111),
    ("D-1", Comp::DMinusOne, 0b0001110),
    ("A-1", Comp::AMinusOne, 0b0110010),
    ("D+A", Comp::DPlusA, 0b0000010),
    ("D-A", Comp::DMinusA, 0b0010011),
    ("A-D", Comp::AMinusD, 0b0000111),
    ("D&A", Comp::DAndA, 0b0000000),
    ("D|A", Comp::DOrA, 0b0010101),
    ("M", Comp::M, 0b1110000),
    ("!M", Comp::NotM, 0b1110001),
    ("-M", Comp::MinusM, 0b1110011),
    ("M+1", Comp::MPlusOne, 0b1110111),
    ("M-1", Comp::MMinusOne, 0b1110010),
    ("D+M", Comp::DPlusM, 0b1000010),
    ("D-M", Comp::DMinusM, 0b1010011),
    ("M-D", Comp::MMinusD, 0b1000111),
    ("D&M", Comp::DAndM, 0b1000000),
    ("D|M", Comp::DOrM, 0b1010101),
];

impl Comp {
    pub fn bits(self) -> u16 {
        COMPS
            .iter()
            .find(|&&(_, comp, _)| comp == self)
            .map(|&(_, _, bits)| bits)
            .expect("every computation is in the table")
    }
}

impl Display for Comp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = COMPS
            .iter()
            .find(|&&(_, comp, _)| comp == *self)
            .map(|&(text, _, _)| text)
            .expect("every computation is in the table");

        fmt.write_str(text)
    }
}

impl FromStr for Comp {
    type Err = BadInstruction;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        COMPS
            .iter()
            .find(|&&(name, _, _)| name == text)
            .map(|&(_, comp, _)| comp)
            .ok_or_else(|| BadInstruction::UnknownComp(text.to_string()))
    }
}

/// Codifica una instrucción `C` como palabra de 16 bits.
pub fn encode_compute(dest: Dest, comp: Comp, jump: Jump) -> u16 {
    0b111 << 13 | comp.bits() << 6 | dest.bits() << 3 | jump.bits()
}
