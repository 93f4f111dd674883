//! Compilador del lenguaje Jack a código de máquina virtual.
//!
//! La compilación de un archivo es una función pura de texto a texto:
//! el análisis léxico produce tokens ubicados, y el parser de descenso
//! recursivo emite instrucciones de máquina virtual durante el propio
//! recorrido. Los errores llevan su ubicación original para que el
//! frente los presente contra el fuente.

pub mod error;
pub mod lex;
pub mod parse;
pub mod source;
pub mod symbols;
pub mod xml;
