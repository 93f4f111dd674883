//! Ensamblado en dos pasadas.
//!
//! La primera pasada recorre el texto fuente, descarta comentarios y
//! líneas vacías, decodifica cada instrucción y registra la dirección
//! de cada declaración de etiqueta. Las declaraciones no consumen
//! direcciones; todo lo demás avanza el contador de instrucciones en
//! uno. La segunda pasada emite exactamente una palabra de 16 bits por
//! instrucción, resolviendo símbolos contra la tabla y asignando
//! direcciones de RAM a las variables nuevas.
//!
//! Ensamblar dos veces el mismo texto produce salidas idénticas byte a
//! byte: el orden de asignación de variables depende solo del orden de
//! primera referencia.

use std::io::{self, Write};

use thiserror::Error;
use tracing::debug;

use crate::inst::{encode_compute, Addr, Asm, BadInstruction};
use crate::table::{SymbolError, SymbolTable};

/// Error de ensamblado, anclado a la línea del texto fuente donde
/// ocurre.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct AsmError {
    pub line: u32,
    pub kind: AsmErrorKind,
}

#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AsmErrorKind {
    #[error(transparent)]
    Instruction(#[from] BadInstruction),

    #[error(transparent)]
    Symbol(#[from] SymbolError),
}

/// Ensambla un texto fuente completo a palabras de máquina.
pub fn assemble(source: &str) -> Result<Vec<u16>, AsmError> {
    let instructions = parse(source)?;

    let mut symbols = SymbolTable::new();

    // Primera pasada: solo etiquetas, nada se emite
    let mut address: u16 = 0;
    for (line, instruction) in &instructions {
        match instruction {
            Asm::Label(name) => {
                symbols.define(name, address).map_err(at(*line))?;
            }
            _ => address += 1,
        }
    }

    debug!(instructions = instructions.len(), "first pass complete");

    // Segunda pasada: una palabra por instrucción
    let mut words = Vec::with_capacity(instructions.len());
    for (line, instruction) in &instructions {
        match instruction {
            Asm::Label(_) => (),
            Asm::Address(Addr::Literal(value)) => words.push(*value),
            Asm::Address(Addr::Symbol(name)) => {
                words.push(symbols.resolve(name).map_err(at(*line))?);
            }
            Asm::Compute { dest, comp, jump } => {
                words.push(encode_compute(*dest, *comp, *jump));
            }
        }
    }

    debug!(words = words.len(), "second pass complete");

    Ok(words)
}

/// Decodifica el texto fuente a una lista de instrucciones con su
/// número de línea original.
fn parse(source: &str) -> Result<Vec<(u32, Asm)>, AsmError> {
    let mut instructions = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let line = index as u32 + 1;

        let text = match raw.find("//") {
            Some(comment) => &raw[..comment],
            None => raw,
        };

        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let instruction = text.parse().map_err(at(line))?;
        instructions.push((line, instruction));
    }

    Ok(instructions)
}

/// Escribe las palabras en el formato `.hack`: 16 caracteres ASCII
/// `0`/`1` por línea, bit más significativo primero.
pub fn write_words<W: Write>(words: &[u16], output: &mut W) -> io::Result<()> {
    for word in words {
        writeln!(output, "{:016b}", word)?;
    }

    Ok(())
}

fn at<E: Into<AsmErrorKind>>(line: u32) -> impl FnOnce(E) -> AsmError {
    move |kind| AsmError {
        line,
        kind: kind.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words_of(source: &str) -> Vec<String> {
        assemble(source)
            .unwrap()
            .iter()
            .map(|word| format!("{:016b}", word))
            .collect()
    }

    #[test]
    fn assembles_a_trivial_sum() {
        let words = words_of("@2\nD=A\n@3\nD=D+A\n@0\nM=D\n");

        assert_eq!(words.len(), 6);
        assert_eq!(words[0], "0000000000000010");
        assert_eq!(words[5], "1110001100001000");
    }

    #[test]
    fn labels_and_variables_resolve() {
        let words = words_of("(LOOP)\n@i\nM=M+1\n@LOOP\n0;JMP\n");

        assert_eq!(
            words,
            [
                "0000000000010000", // i en 16
                "1111110111001000", // M=M+1
                "0000000000000000", // LOOP en 0
                "1110101010000111", // 0;JMP
            ]
        );
    }

    #[test]
    fn comments_and_blanks_do_not_count() {
        let source = "// encabezado\n\n@1 // inline\n   \nD=A//pegado\n";

        assert_eq!(assemble(source).unwrap().len(), 2);
    }

    #[test]
    fn assembly_is_idempotent() {
        let source = "@i\nM=1\n@sum\nM=0\n(LOOP)\n@i\nD=M\n@LOOP\nD;JGT\n";

        assert_eq!(assemble(source).unwrap(), assemble(source).unwrap());
    }

    #[test]
    fn variable_addresses_are_monotonic() {
        let words = assemble("@first\n@second\n@first\n@third\n").unwrap();

        assert_eq!(words, [16, 17, 16, 18]);
    }

    #[test]
    fn label_redefinition_is_fatal() {
        let error = assemble("(END)\n@0\n(END)\n").unwrap_err();

        assert_eq!(error.line, 3);
        assert_eq!(
            error.kind,
            AsmErrorKind::Symbol(SymbolError::Redefined("END".to_string()))
        );
    }

    #[test]
    fn undeclared_uppercase_reference_is_fatal() {
        let error = assemble("@MISSING\n0;JMP\n").unwrap_err();

        assert_eq!(error.line, 1);
        assert_eq!(
            error.kind,
            AsmErrorKind::Symbol(SymbolError::UndeclaredLabel("MISSING".to_string()))
        );
    }

    #[test]
    fn labels_may_be_referenced_before_declaration() {
        let words = assemble("@END\n0;JMP\n(END)\n@END\n0;JMP\n").unwrap();

        assert_eq!(words[0], 2);
        assert_eq!(words[2], 2);
    }

    #[test]
    fn hack_lines_are_sixteen_bits() {
        let mut output = Vec::new();
        write_words(&assemble("@2\nD=A\n").unwrap(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        for line in text.lines() {
            assert_eq!(line.len(), 16);
            assert!(line.bytes().all(|c| c == b'0' || c == b'1'));
        }
        assert!(text.ends_with('\n'));
    }
}
