//! Recorrido completo de la cadena: texto Jack a palabras de máquina.
//!
//! Cada etapa es una función de texto a texto; estas pruebas verifican
//! que la salida canónica de una etapa siempre es entrada válida de la
//! siguiente.

use jackc::{lex, parse};
use vmtrans::{Translator, Vm};

const SOURCE: &str = "\
class Main {
    static int total;

    function void main() {
        var int i;
        let i = 0;
        while (i < 10) {
            let total = total + i;
            let i = i + 1;
        }
        do Output.printInt(total);
        return;
    }
}
";

fn compile_to_vm_text(source: &str) -> String {
    let tokens = lex::tokenize(source).expect("lexes");
    let code = parse::compile(&tokens).expect("compiles");

    code.iter().map(|inst| format!("{}\n", inst)).collect()
}

fn translate_to_asm_text(vm_text: &str, stem: &str) -> String {
    let mut translator = Translator::new();
    translator.begin_file(stem);

    for line in vm_text.lines() {
        let inst: Vm = line.parse().expect("canonical VM text decodes");
        translator.translate(&inst);
    }

    translator.drain().map(|inst| format!("{}\n", inst)).collect()
}

#[test]
fn jack_source_reaches_machine_words() {
    let vm_text = compile_to_vm_text(SOURCE);
    let asm_text = translate_to_asm_text(&vm_text, "Main");
    let words = hasm::assemble(&asm_text).expect("translated output assembles");

    assert!(!words.is_empty());

    let mut hack = Vec::new();
    hasm::write_words(&words, &mut hack).unwrap();
    let hack = String::from_utf8(hack).unwrap();

    assert_eq!(hack.lines().count(), words.len());
    for line in hack.lines() {
        assert_eq!(line.len(), 16);
        assert!(line.bytes().all(|c| c == b'0' || c == b'1'));
    }
}

#[test]
fn vm_text_round_trips_through_the_decoder() {
    let vm_text = compile_to_vm_text(SOURCE);

    for line in vm_text.lines() {
        let inst: Vm = line.parse().expect("decodes");
        assert_eq!(inst.to_string(), line);
    }
}

#[test]
fn statics_take_the_file_stem() {
    let vm_text = compile_to_vm_text(SOURCE);
    assert!(vm_text.contains("push static 0"));

    let asm_text = translate_to_asm_text(&vm_text, "Main");
    assert!(asm_text.lines().any(|line| line == "@Main.0"));
}

#[test]
fn assembling_twice_is_byte_identical() {
    let asm_text = translate_to_asm_text(&compile_to_vm_text(SOURCE), "Main");

    assert_eq!(
        hasm::assemble(&asm_text).unwrap(),
        hasm::assemble(&asm_text).unwrap()
    );
}
