//! Traductor de código de máquina virtual de pila a ensamblador Hack.
//!
//! La entrada es texto `.vm` (una instrucción por línea); la salida es
//! una secuencia de instrucciones de ensamblador tipadas, listas para
//! imprimirse como `.asm` o entregarse al ensamblador.

pub mod inst;
pub mod translate;

pub use inst::{decode_line, BadCommand, Segment, Vm};
pub use translate::Translator;
