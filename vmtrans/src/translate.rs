//! Traducción de instrucciones de VM a secuencias de ensamblador.
//!
//! # Convención de memoria
//! `SP` vive en RAM[0], `LCL` en 1, `ARG` en 2, `THIS` en 3 y `THAT`
//! en 4. El segmento `temp` ocupa `R5..R12`; `R13` es el registro de
//! trabajo del traductor. El segmento `static i` se traduce al símbolo
//! `archivo.i`, donde `archivo` es el nombre base del archivo `.vm` en
//! curso; así dos archivos traducidos juntos nunca comparten estáticas.
//!
//! # Etiquetas
//! Las etiquetas de flujo de programa (`label`, `goto`, `if-goto`) se
//! prefijan con el nombre de la función en curso para evitar colisiones
//! entre funciones. Las comparaciones y las llamadas consumen además
//! etiquetas sintéticas únicas (`CMP_n`, `RET_n`) tomadas de un contador
//! que nunca se reinicia durante la vida del traductor.
//!
//! # Marco de llamada
//! `call f n` empuja exactamente cinco palabras (dirección de retorno,
//! `LCL`, `ARG`, `THIS`, `THAT`), fija `ARG = SP − n − 5` y `LCL = SP`.
//! `return` deshace el marco en el orden inverso exacto, leyendo los
//! valores guardados desde `LCL − 1` hasta `LCL − 4` y la dirección de
//! retorno desde `LCL − 5`.

use hasm::{Asm, Comp, Dest, Jump};
use tracing::debug;

use crate::inst::{Segment, Vm};

/// Dirección inicial de la pila, cargada por el arranque.
const STACK_BASE: u16 = 256;

/// Contexto de traducción de una unidad completa (archivo o directorio).
pub struct Translator {
    out: Vec<Asm>,
    file: String,
    function: Option<String>,
    labels: u32,
}

impl Translator {
    pub fn new() -> Self {
        Translator {
            out: Vec::new(),
            file: String::new(),
            function: None,
            labels: 0,
        }
    }

    /// Declara el archivo en curso; gobierna los símbolos de `static`.
    pub fn begin_file(&mut self, stem: &str) {
        debug!(file = stem, "translating");
        self.file = stem.to_string();
    }

    /// Emite el código de arranque: inicializa `SP` y llama a
    /// `Sys.init`. Se antepone exactamente una vez cuando la unidad de
    /// entrada es un directorio.
    pub fn bootstrap(&mut self) {
        self.emit(Asm::at_literal(STACK_BASE));
        self.emit(Asm::assign(Dest::D, Comp::A));
        self.emit(Asm::at("SP"));
        self.emit(Asm::assign(Dest::M, Comp::D));

        self.translate(&Vm::Call("Sys.init".to_string(), 0));
    }

    /// Retira las instrucciones acumuladas desde la última llamada.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Asm> {
        self.out.drain(..)
    }

    /// Traduce una instrucción de VM, acumulando su expansión.
    pub fn translate(&mut self, inst: &Vm) {
        match inst {
            Vm::Push(segment, index) => self.push(*segment, *index),
            Vm::Pop(segment, index) => self.pop(*segment, *index),

            Vm::Add => self.binary(Comp::DPlusM),
            Vm::Sub => self.binary(Comp::MMinusD),
            Vm::And => self.binary(Comp::DAndM),
            Vm::Or => self.binary(Comp::DOrM),
            Vm::Neg => self.unary(Comp::MinusM),
            Vm::Not => self.unary(Comp::NotM),

            Vm::Eq => self.compare(Jump::JEQ),
            Vm::Gt => self.compare(Jump::JGT),
            Vm::Lt => self.compare(Jump::JLT),

            Vm::Label(label) => {
                let symbol = self.label_symbol(label);
                self.emit(Asm::Label(symbol));
            }
            Vm::Goto(label) => {
                let symbol = self.label_symbol(label);
                self.emit(Asm::at(symbol));
                self.emit(Asm::branch(Comp::Zero, Jump::JMP));
            }
            Vm::IfGoto(label) => {
                let symbol = self.label_symbol(label);
                self.pop_d();
                self.emit(Asm::at(symbol));
                self.emit(Asm::branch(Comp::D, Jump::JNE));
            }

            Vm::Function(name, locals) => self.function(name, *locals),
            Vm::Call(name, arguments) => self.call(name, *arguments),
            Vm::Return => self.ret(),
        }
    }

    fn emit(&mut self, inst: Asm) {
        self.out.push(inst);
    }

    /// Toma la siguiente etiqueta sintética; el contador jamás
    /// retrocede.
    fn fresh_label(&mut self, prefix: &str) -> String {
        let label = format!("{}_{}", prefix, self.labels);
        self.labels += 1;
        label
    }

    /// Prefija una etiqueta de flujo con la función en curso. Fuera de
    /// toda función aplica el nombre del archivo.
    fn label_symbol(&self, label: &str) -> String {
        let scope = self.function.as_deref().unwrap_or(&self.file);
        format!("{}.{}", scope, label)
    }

    /// `RAM[SP] = D; SP += 1`
    fn push_d(&mut self) {
        self.emit(Asm::at("SP"));
        self.emit(Asm::assign(Dest::A, Comp::M));
        self.emit(Asm::assign(Dest::M, Comp::D));
        self.emit(Asm::at("SP"));
        self.emit(Asm::assign(Dest::M, Comp::MPlusOne));
    }

    /// `SP -= 1; D = RAM[SP]`
    fn pop_d(&mut self) {
        self.emit(Asm::at("SP"));
        self.emit(Asm::assign(Dest::AM, Comp::MMinusOne));
        self.emit(Asm::assign(Dest::D, Comp::M));
    }

    /// Símbolo del puntero base de un segmento indirecto.
    fn base_symbol(segment: Segment) -> &'static str {
        match segment {
            Segment::Argument => "ARG",
            Segment::Local => "LCL",
            Segment::This => "THIS",
            Segment::That => "THAT",
            _ => unreachable!("segment has no base pointer"),
        }
    }

    /// Símbolo absoluto de una celda de `pointer`/`temp`/`static`.
    fn cell_symbol(&self, segment: Segment, index: u16) -> String {
        match segment {
            Segment::Pointer if index == 0 => "THIS".to_string(),
            Segment::Pointer => "THAT".to_string(),
            Segment::Temp => format!("R{}", 5 + index),
            Segment::Static => format!("{}.{}", self.file, index),
            _ => unreachable!("segment is not absolute"),
        }
    }

    fn push(&mut self, segment: Segment, index: u16) {
        match segment {
            Segment::Constant => {
                // D = index
                self.emit(Asm::at_literal(index));
                self.emit(Asm::assign(Dest::D, Comp::A));
            }
            Segment::Argument | Segment::Local | Segment::This | Segment::That => {
                // D = RAM[base + index]
                self.emit(Asm::at_literal(index));
                self.emit(Asm::assign(Dest::D, Comp::A));
                self.emit(Asm::at(Self::base_symbol(segment)));
                self.emit(Asm::assign(Dest::A, Comp::DPlusM));
                self.emit(Asm::assign(Dest::D, Comp::M));
            }
            Segment::Pointer | Segment::Temp | Segment::Static => {
                // D = RAM[celda]
                self.emit(Asm::at(self.cell_symbol(segment, index)));
                self.emit(Asm::assign(Dest::D, Comp::M));
            }
        }

        self.push_d();
    }

    fn pop(&mut self, segment: Segment, index: u16) {
        match segment {
            Segment::Argument | Segment::Local | Segment::This | Segment::That => {
                // R13 = base + index
                self.emit(Asm::at_literal(index));
                self.emit(Asm::assign(Dest::D, Comp::A));
                self.emit(Asm::at(Self::base_symbol(segment)));
                self.emit(Asm::assign(Dest::D, Comp::DPlusM));
                self.emit(Asm::at("R13"));
                self.emit(Asm::assign(Dest::M, Comp::D));

                self.pop_d();

                // RAM[R13] = D
                self.emit(Asm::at("R13"));
                self.emit(Asm::assign(Dest::A, Comp::M));
                self.emit(Asm::assign(Dest::M, Comp::D));
            }
            Segment::Pointer | Segment::Temp | Segment::Static => {
                self.pop_d();
                self.emit(Asm::at(self.cell_symbol(segment, index)));
                self.emit(Asm::assign(Dest::M, Comp::D));
            }
            Segment::Constant => unreachable!("the decoder rejects pop constant"),
        }
    }

    /// Operación binaria en sitio: `D` toma la cima, la operación cae
    /// sobre `RAM[SP-1]`.
    fn binary(&mut self, comp: Comp) {
        self.pop_d();
        self.emit(Asm::assign(Dest::A, Comp::AMinusOne));
        self.emit(Asm::assign(Dest::M, comp));
    }

    /// Operación unaria en sitio sobre `RAM[SP-1]`.
    fn unary(&mut self, comp: Comp) {
        self.emit(Asm::at("SP"));
        self.emit(Asm::assign(Dest::A, Comp::MMinusOne));
        self.emit(Asm::assign(Dest::M, comp));
    }

    /// Comparación: calcula `x − y`, escribe verdadero (−1) y salta a
    /// una etiqueta única si la condición se cumple; de lo contrario el
    /// incremento convierte el −1 en falso (0).
    fn compare(&mut self, jump: Jump) {
        let done = self.fresh_label("CMP");

        self.pop_d();
        self.emit(Asm::assign(Dest::A, Comp::AMinusOne));
        self.emit(Asm::assign(Dest::D, Comp::MMinusD));
        self.emit(Asm::assign(Dest::M, Comp::MinusOne));
        self.emit(Asm::at(done.clone()));
        self.emit(Asm::branch(Comp::D, jump));
        self.emit(Asm::at("SP"));
        self.emit(Asm::assign(Dest::A, Comp::MMinusOne));
        self.emit(Asm::assign(Dest::M, Comp::MPlusOne));
        self.emit(Asm::Label(done));
    }

    fn function(&mut self, name: &str, locals: u16) {
        self.function = Some(name.to_string());
        self.emit(Asm::Label(name.to_string()));

        // k locales inicializadas a cero
        for _ in 0..locals {
            self.emit(Asm::at("SP"));
            self.emit(Asm::assign(Dest::A, Comp::M));
            self.emit(Asm::assign(Dest::M, Comp::Zero));
            self.emit(Asm::at("SP"));
            self.emit(Asm::assign(Dest::M, Comp::MPlusOne));
        }
    }

    fn call(&mut self, name: &str, arguments: u16) {
        let ret = self.fresh_label("RET");

        // Marco: retorno, LCL, ARG, THIS, THAT
        self.emit(Asm::at(ret.clone()));
        self.emit(Asm::assign(Dest::D, Comp::A));
        self.push_d();

        for saved in ["LCL", "ARG", "THIS", "THAT"] {
            self.emit(Asm::at(saved));
            self.emit(Asm::assign(Dest::D, Comp::M));
            self.push_d();
        }

        // ARG = SP - n - 5
        self.emit(Asm::at("SP"));
        self.emit(Asm::assign(Dest::D, Comp::M));
        self.emit(Asm::at_literal(arguments + 5));
        self.emit(Asm::assign(Dest::D, Comp::DMinusA));
        self.emit(Asm::at("ARG"));
        self.emit(Asm::assign(Dest::M, Comp::D));

        // LCL = SP
        self.emit(Asm::at("SP"));
        self.emit(Asm::assign(Dest::D, Comp::M));
        self.emit(Asm::at("LCL"));
        self.emit(Asm::assign(Dest::M, Comp::D));

        self.emit(Asm::at(name));
        self.emit(Asm::branch(Comp::Zero, Jump::JMP));
        self.emit(Asm::Label(ret));
    }

    fn ret(&mut self) {
        // R13 = RAM[LCL - 5], la dirección de retorno
        self.emit(Asm::at("LCL"));
        self.emit(Asm::assign(Dest::D, Comp::M));
        self.emit(Asm::at_literal(5));
        self.emit(Asm::assign(Dest::A, Comp::DMinusA));
        self.emit(Asm::assign(Dest::D, Comp::M));
        self.emit(Asm::at("R13"));
        self.emit(Asm::assign(Dest::M, Comp::D));

        // RAM[ARG] = valor de retorno
        self.emit(Asm::at("SP"));
        self.emit(Asm::assign(Dest::A, Comp::MMinusOne));
        self.emit(Asm::assign(Dest::D, Comp::M));
        self.emit(Asm::at("ARG"));
        self.emit(Asm::assign(Dest::A, Comp::M));
        self.emit(Asm::assign(Dest::M, Comp::D));

        // SP = ARG + 1
        self.emit(Asm::at("ARG"));
        self.emit(Asm::assign(Dest::D, Comp::MPlusOne));
        self.emit(Asm::at("SP"));
        self.emit(Asm::assign(Dest::M, Comp::D));

        // THAT = RAM[LCL - 1]
        self.emit(Asm::at("LCL"));
        self.emit(Asm::assign(Dest::A, Comp::MMinusOne));
        self.emit(Asm::assign(Dest::D, Comp::M));
        self.emit(Asm::at("THAT"));
        self.emit(Asm::assign(Dest::M, Comp::D));

        // THIS, ARG y LCL desde LCL - 2, - 3 y - 4
        for (offset, saved) in [(2, "THIS"), (3, "ARG"), (4, "LCL")] {
            self.emit(Asm::at("LCL"));
            self.emit(Asm::assign(Dest::D, Comp::M));
            self.emit(Asm::at_literal(offset));
            self.emit(Asm::assign(Dest::A, Comp::DMinusA));
            self.emit(Asm::assign(Dest::D, Comp::M));
            self.emit(Asm::at(saved));
            self.emit(Asm::assign(Dest::M, Comp::D));
        }

        // Salto a través de R13
        self.emit(Asm::at("R13"));
        self.emit(Asm::assign(Dest::A, Comp::M));
        self.emit(Asm::branch(Comp::Zero, Jump::JMP));
    }
}

impl Default for Translator {
    fn default() -> Self {
        Translator::new()
    }
}
