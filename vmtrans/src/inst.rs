//! Conjunto de instrucciones de la máquina virtual de pila.
//!
//! Cada instrucción ocupa una línea de texto. El decodificador trabaja
//! línea por línea y es estricto: un mnemónico desconocido, una aridad
//! incorrecta o un índice fuera de rango detienen la traducción. Este
//! mismo tipo es el que produce el compilador de Jack, de modo que el
//! texto `.vm` intermedio siempre nace y se consume con la misma
//! ortografía canónica.

use std::fmt::{self, Display};
use std::str::FromStr;

use thiserror::Error;

/// Mayor índice admitido por `push`/`pop` y por los contadores de
/// `function`/`call`.
const INDEX_MAX: u32 = (1 << 15) - 1;

/// Error de decodificación de una instrucción de VM.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BadCommand {
    #[error("unknown instruction `{0}`")]
    UnknownMnemonic(String),

    #[error("unknown segment `{0}`")]
    UnknownSegment(String),

    #[error("`{mnemonic}` expects {expected} arguments, found {found}")]
    Arity {
        mnemonic: String,
        expected: usize,
        found: usize,
    },

    #[error("bad index `{0}`")]
    BadIndex(String),

    #[error("index {0} is out of range, the maximum is {INDEX_MAX}")]
    IndexRange(u32),

    #[error("malformed name `{0}`")]
    BadName(String),

    #[error("`pointer` index must be 0 or 1, found {0}")]
    PointerIndex(u16),

    #[error("`temp` index must be 0 to 7, found {0}")]
    TempIndex(u16),

    #[error("`pop constant` is not a valid instruction")]
    PopConstant,
}

/// Los ocho segmentos de memoria virtuales.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
    Constant,
}

const SEGMENTS: &[(&str, Segment)] = &[
    ("argument", Segment::Argument),
    ("local", Segment::Local),
    ("static", Segment::Static),
    ("this", Segment::This),
    ("that", Segment::That),
    ("pointer", Segment::Pointer),
    ("temp", Segment::Temp),
    ("constant", Segment::Constant),
];

impl Display for Segment {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = SEGMENTS
            .iter()
            .find(|&&(_, segment)| segment == *self)
            .map(|&(text, _)| text)
            .expect("every segment is in the table");

        fmt.write_str(text)
    }
}

impl FromStr for Segment {
    type Err = BadCommand;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        SEGMENTS
            .iter()
            .find(|&&(name, _)| name == text)
            .map(|&(_, segment)| segment)
            .ok_or_else(|| BadCommand::UnknownSegment(text.to_string()))
    }
}

/// Una instrucción de la máquina virtual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Vm {
    Push(Segment, u16),
    Pop(Segment, u16),
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
    Label(String),
    Goto(String),
    IfGoto(String),
    Function(String, u16),
    Call(String, u16),
    Return,
}

impl Display for Vm {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vm::Push(segment, index) => write!(fmt, "push {} {}", segment, index),
            Vm::Pop(segment, index) => write!(fmt, "pop {} {}", segment, index),
            Vm::Add => fmt.write_str("add"),
            Vm::Sub => fmt.write_str("sub"),
            Vm::Neg => fmt.write_str("neg"),
            Vm::Eq => fmt.write_str("eq"),
            Vm::Gt => fmt.write_str("gt"),
            Vm::Lt => fmt.write_str("lt"),
            Vm::And => fmt.write_str("and"),
            Vm::Or => fmt.write_str("or"),
            Vm::Not => fmt.write_str("not"),
            Vm::Label(label) => write!(fmt, "label {}", label),
            Vm::Goto(label) => write!(fmt, "goto {}", label),
            Vm::IfGoto(label) => write!(fmt, "if-goto {}", label),
            Vm::Function(name, locals) => write!(fmt, "function {} {}", name, locals),
            Vm::Call(name, arguments) => write!(fmt, "call {} {}", name, arguments),
            Vm::Return => fmt.write_str("return"),
        }
    }
}

impl FromStr for Vm {
    type Err = BadCommand;

    /// Decodifica una línea ya despojada de comentarios y recortada.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        let (mnemonic, arguments) = fields
            .split_first()
            .expect("blank lines are skipped before decoding");

        let arity = |expected: usize| {
            if arguments.len() == expected {
                Ok(())
            } else {
                Err(BadCommand::Arity {
                    mnemonic: mnemonic.to_string(),
                    expected,
                    found: arguments.len(),
                })
            }
        };

        match *mnemonic {
            "push" | "pop" => {
                arity(2)?;
                let segment: Segment = arguments[0].parse()?;
                let index = parse_index(arguments[1])?;

                check_segment_index(segment, index)?;

                if *mnemonic == "push" {
                    Ok(Vm::Push(segment, index))
                } else if segment == Segment::Constant {
                    Err(BadCommand::PopConstant)
                } else {
                    Ok(Vm::Pop(segment, index))
                }
            }

            "add" => arity(0).map(|()| Vm::Add),
            "sub" => arity(0).map(|()| Vm::Sub),
            "neg" => arity(0).map(|()| Vm::Neg),
            "eq" => arity(0).map(|()| Vm::Eq),
            "gt" => arity(0).map(|()| Vm::Gt),
            "lt" => arity(0).map(|()| Vm::Lt),
            "and" => arity(0).map(|()| Vm::And),
            "or" => arity(0).map(|()| Vm::Or),
            "not" => arity(0).map(|()| Vm::Not),

            "label" => {
                arity(1)?;
                Ok(Vm::Label(parse_name(arguments[0])?))
            }
            "goto" => {
                arity(1)?;
                Ok(Vm::Goto(parse_name(arguments[0])?))
            }
            "if-goto" => {
                arity(1)?;
                Ok(Vm::IfGoto(parse_name(arguments[0])?))
            }

            "function" => {
                arity(2)?;
                Ok(Vm::Function(
                    parse_name(arguments[0])?,
                    parse_index(arguments[1])?,
                ))
            }
            "call" => {
                arity(2)?;
                Ok(Vm::Call(
                    parse_name(arguments[0])?,
                    parse_index(arguments[1])?,
                ))
            }

            "return" => arity(0).map(|()| Vm::Return),

            other => Err(BadCommand::UnknownMnemonic(other.to_string())),
        }
    }
}

/// Decodifica una línea cruda de un archivo `.vm`: descarta el
/// comentario y los espacios exteriores, y entrega `None` para las
/// líneas que no contienen instrucción.
pub fn decode_line(text: &str) -> Result<Option<Vm>, BadCommand> {
    let text = match text.find("//") {
        Some(comment) => &text[..comment],
        None => text,
    };

    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    text.parse().map(Some)
}

fn parse_index(text: &str) -> Result<u16, BadCommand> {
    let value: u32 = text
        .parse()
        .map_err(|_| BadCommand::BadIndex(text.to_string()))?;

    if value > INDEX_MAX {
        return Err(BadCommand::IndexRange(value));
    }

    Ok(value as u16)
}

fn check_segment_index(segment: Segment, index: u16) -> Result<(), BadCommand> {
    match segment {
        Segment::Pointer if index > 1 => Err(BadCommand::PointerIndex(index)),
        Segment::Temp if index > 7 => Err(BadCommand::TempIndex(index)),
        _ => Ok(()),
    }
}

/// Nombres de funciones y etiquetas: letras, dígitos, `_`, `.` y `:`,
/// sin comenzar con dígito.
fn parse_name(text: &str) -> Result<String, BadCommand> {
    let tail = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':');
    let head = text.chars().next();

    if head.map_or(false, |c| !c.is_ascii_digit()) && text.chars().all(tail) {
        Ok(text.to_string())
    } else {
        Err(BadCommand::BadName(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_the_canonical_forms() {
        assert_eq!("push constant 7".parse(), Ok(Vm::Push(Segment::Constant, 7)));
        assert_eq!("pop local 0".parse(), Ok(Vm::Pop(Segment::Local, 0)));
        assert_eq!("add".parse(), Ok(Vm::Add));
        assert_eq!("if-goto WHILE_END0".parse(), Ok(Vm::IfGoto("WHILE_END0".to_string())));
        assert_eq!(
            "function Main.main 2".parse(),
            Ok(Vm::Function("Main.main".to_string(), 2))
        );
        assert_eq!(
            "call Math.multiply 2".parse(),
            Ok(Vm::Call("Math.multiply".to_string(), 2))
        );
        assert_eq!("return".parse(), Ok(Vm::Return));
    }

    #[test]
    fn display_round_trips() {
        let lines = [
            "push argument 1",
            "pop static 3",
            "neg",
            "label LOOP",
            "goto LOOP",
            "if-goto END",
            "function Foo.bar 0",
            "call Foo.bar 1",
            "return",
        ];

        for line in lines {
            let inst: Vm = line.parse().unwrap();
            assert_eq!(inst.to_string(), line);
        }
    }

    #[test]
    fn raw_lines_lose_comments_and_blanks() {
        assert_eq!(
            decode_line("  push constant 7 // comentario"),
            Ok(Some(Vm::Push(Segment::Constant, 7)))
        );
        assert_eq!(decode_line("// solo comentario"), Ok(None));
        assert_eq!(decode_line("   "), Ok(None));
        assert_eq!(decode_line(""), Ok(None));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert_eq!(
            "mul".parse::<Vm>(),
            Err(BadCommand::UnknownMnemonic("mul".to_string()))
        );
        assert_eq!(
            "push heap 0".parse::<Vm>(),
            Err(BadCommand::UnknownSegment("heap".to_string()))
        );
        assert_eq!(
            "push constant".parse::<Vm>(),
            Err(BadCommand::Arity {
                mnemonic: "push".to_string(),
                expected: 2,
                found: 1,
            })
        );
        assert_eq!("pop constant 0".parse::<Vm>(), Err(BadCommand::PopConstant));
        assert_eq!(
            "push pointer 2".parse::<Vm>(),
            Err(BadCommand::PointerIndex(2))
        );
        assert_eq!("push temp 8".parse::<Vm>(), Err(BadCommand::TempIndex(8)));
        assert_eq!(
            "push constant 32768".parse::<Vm>(),
            Err(BadCommand::IndexRange(32768))
        );
        assert_eq!(
            "push constant 32767".parse::<Vm>(),
            Ok(Vm::Push(Segment::Constant, 32767))
        );
    }
}
