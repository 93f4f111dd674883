//! Análisis sintáctico y generación de código.
//!
//! El parser es de descenso recursivo y de una sola pasada: no
//! construye un árbol sintáctico, sino que emite instrucciones de
//! máquina virtual durante el propio descenso. Basta un token de
//! anticipación en todos los puntos de la gramática salvo uno: dentro
//! de un término, un identificador puede abrir una llamada (`f(`,
//! `a.b(`), una subscripción (`a[`) o ser una variable, lo cual se
//! decide observando el token que le sigue.
//!
//! # Contexto de emisión
//! El compilador lleva el nombre de la clase, las dos tablas de
//! símbolos, la variedad de la subrutina en curso y los contadores de
//! etiquetas `if`/`while`, que se reinician en cada subrutina. Las
//! instrucciones emitidas se acumulan y se entregan completas solo si
//! la clase entera compila.

use std::mem;

use thiserror::Error;

use vmtrans::{Segment, Vm};

use crate::lex::{Keyword, Token};
use crate::source::{Located, Position, Span};
use crate::symbols::{Entry, Kind, SymbolTable, VarType};

/// Error de análisis sintáctico o semántico.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// El siguiente token no es el que la gramática admite aquí.
    #[error("expected {expected}, found {found}")]
    Unexpected { expected: String, found: Token },

    /// El programa terminó a mitad de un constructo.
    #[error("expected {0}, found end of input")]
    Exhausted(String),

    /// Dos declaraciones comparten nombre en el mismo ámbito.
    #[error("redefinition of `{0}` in the same scope")]
    Redefined(String),

    /// Referencia a un nombre jamás declarado.
    #[error("symbol `{0}` is undefined")]
    Undefined(String),

    /// Una variable `field` referida desde una subrutina `function`.
    #[error("field `{0}` cannot be used from within a function")]
    FieldFromFunction(String),

    /// Llamada a método sobre una variable de tipo primitivo.
    #[error("`{0}` is not an object")]
    NotAnObject(String),

    /// `return;` en una subrutina que declara un tipo de retorno.
    #[error("`return` needs a value in a non-void subroutine")]
    MissingReturnValue,

    /// `return expr;` en una subrutina `void`.
    #[error("`return` cannot carry a value in a void subroutine")]
    VoidReturnValue,
}

pub type Parse<T> = Result<T, Located<ParseError>>;

/// Variedad de la subrutina en curso.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SubKind {
    Constructor,
    Function,
    Method,
}

/// Compila los tokens de una clase completa a instrucciones de máquina
/// virtual.
pub fn compile(tokens: &[Located<Token>]) -> Parse<Vec<Vm>> {
    let mut compiler = Compiler::new(tokens);

    compiler.class()?;

    if let Some(extra) = compiler.peek() {
        let extra = extra.clone();
        return Err(unexpected("end of input", extra));
    }

    Ok(mem::take(&mut compiler.code))
}

struct Compiler<'a> {
    tokens: &'a [Located<Token>],
    cursor: usize,
    class_name: String,
    table: SymbolTable,
    sub_kind: SubKind,
    returns_void: bool,
    if_labels: u32,
    while_labels: u32,
    code: Vec<Vm>,
}

impl<'a> Compiler<'a> {
    fn new(tokens: &'a [Located<Token>]) -> Self {
        Compiler {
            tokens,
            cursor: 0,
            class_name: String::new(),
            table: SymbolTable::new(),
            sub_kind: SubKind::Function,
            returns_void: true,
            if_labels: 0,
            while_labels: 0,
            code: Vec::new(),
        }
    }

    fn emit(&mut self, inst: Vm) {
        self.code.push(inst);
    }

    // ---- Manejo del cursor ----

    fn peek(&self) -> Option<&Located<Token>> {
        self.tokens.get(self.cursor)
    }

    fn last_span(&self) -> Span {
        self.tokens
            .last()
            .map(Located::span)
            .unwrap_or_else(|| Span::single(Position::default()))
    }

    fn advance(&mut self, expected: &str) -> Parse<Located<Token>> {
        match self.tokens.get(self.cursor) {
            Some(token) => {
                self.cursor += 1;
                Ok(token.clone())
            }

            None => Err(Located::at(
                ParseError::Exhausted(expected.to_string()),
                self.last_span(),
            )),
        }
    }

    fn peek_symbol(&self, symbol: char) -> bool {
        matches!(self.peek().map(Located::val), Some(Token::Symbol(c)) if *c == symbol)
    }

    fn peek_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.peek().map(Located::val), Some(Token::Keyword(k)) if *k == keyword)
    }

    fn eat_symbol(&mut self, symbol: char) -> bool {
        let found = self.peek_symbol(symbol);
        if found {
            self.cursor += 1;
        }

        found
    }

    fn expect_symbol(&mut self, symbol: char) -> Parse<Span> {
        let token = self.advance(&format!("`{}`", symbol))?;
        match token.val() {
            Token::Symbol(c) if *c == symbol => Ok(token.span()),
            _ => Err(unexpected(format!("`{}`", symbol), token)),
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Parse<Span> {
        let token = self.advance(&format!("`{}`", keyword))?;
        match token.val() {
            Token::Keyword(k) if *k == keyword => Ok(token.span()),
            _ => Err(unexpected(format!("`{}`", keyword), token)),
        }
    }

    fn expect_ident(&mut self) -> Parse<Located<String>> {
        let token = self.advance("an identifier")?;
        match token.val() {
            Token::Ident(_) => Ok(token.map(|token| match token {
                Token::Ident(name) => name,
                _ => unreachable!(),
            })),
            _ => Err(unexpected("an identifier", token)),
        }
    }

    // ---- Símbolos ----

    fn define(&mut self, name: &Located<String>, typ: VarType, kind: Kind) -> Parse<()> {
        match self.table.define(name.val(), typ, kind) {
            Some(_) => Ok(()),
            None => Err(Located::at(
                ParseError::Redefined(name.val().clone()),
                name.span(),
            )),
        }
    }

    /// Resuelve una variable, vigilando el acceso a `field` desde
    /// subrutinas `function`.
    fn resolve(&self, name: &Located<String>) -> Parse<Entry> {
        match self.table.lookup(name.val()) {
            Some(entry) => {
                if entry.kind == Kind::Field && self.sub_kind == SubKind::Function {
                    Err(Located::at(
                        ParseError::FieldFromFunction(name.val().clone()),
                        name.span(),
                    ))
                } else {
                    Ok(entry.clone())
                }
            }

            None => Err(Located::at(
                ParseError::Undefined(name.val().clone()),
                name.span(),
            )),
        }
    }

    // ---- Gramática ----

    fn class(&mut self) -> Parse<()> {
        self.expect_keyword(Keyword::Class)?;
        self.class_name = self.expect_ident()?.into_inner();
        self.expect_symbol('{')?;

        loop {
            let token = self.advance("a class member or `}`")?;
            match token.val() {
                Token::Symbol('}') => break Ok(()),

                Token::Keyword(Keyword::Static) => self.class_vars(Kind::Static)?,
                Token::Keyword(Keyword::Field) => self.class_vars(Kind::Field)?,

                Token::Keyword(Keyword::Constructor) => self.subroutine(SubKind::Constructor)?,
                Token::Keyword(Keyword::Function) => self.subroutine(SubKind::Function)?,
                Token::Keyword(Keyword::Method) => self.subroutine(SubKind::Method)?,

                _ => break Err(unexpected("a class member or `}`", token)),
            }
        }
    }

    /// `('static'|'field') type ID (',' ID)* ';'`, ya consumida la
    /// palabra clave inicial.
    fn class_vars(&mut self, kind: Kind) -> Parse<()> {
        let typ = self.var_type()?;

        loop {
            let name = self.expect_ident()?;
            self.define(&name, typ.clone(), kind)?;

            if !self.eat_symbol(',') {
                break;
            }
        }

        self.expect_symbol(';')?;
        Ok(())
    }

    fn var_type(&mut self) -> Parse<VarType> {
        let token = self.advance("a type")?;
        match token.val() {
            Token::Keyword(Keyword::Int) => Ok(VarType::Int),
            Token::Keyword(Keyword::Char) => Ok(VarType::Char),
            Token::Keyword(Keyword::Boolean) => Ok(VarType::Boolean),
            Token::Ident(name) => Ok(VarType::Class(name.clone())),
            _ => Err(unexpected("a type", token)),
        }
    }

    fn subroutine(&mut self, kind: SubKind) -> Parse<()> {
        self.sub_kind = kind;
        self.returns_void = if self.peek_keyword(Keyword::Void) {
            self.cursor += 1;
            true
        } else {
            self.var_type()?;
            false
        };

        let name = self.expect_ident()?;

        self.table.start_subroutine();
        self.if_labels = 0;
        self.while_labels = 0;

        // El receptor implícito de un método ocupa `argument 0`
        if kind == SubKind::Method {
            self.table.reserve(Kind::Argument);
        }

        self.expect_symbol('(')?;
        if !self.eat_symbol(')') {
            loop {
                let typ = self.var_type()?;
                let arg = self.expect_ident()?;
                self.define(&arg, typ, Kind::Argument)?;

                if !self.eat_symbol(',') {
                    break;
                }
            }
            self.expect_symbol(')')?;
        }

        self.expect_symbol('{')?;

        while self.peek_keyword(Keyword::Var) {
            self.cursor += 1;
            let typ = self.var_type()?;

            loop {
                let local = self.expect_ident()?;
                self.define(&local, typ.clone(), Kind::Local)?;

                if !self.eat_symbol(',') {
                    break;
                }
            }

            self.expect_symbol(';')?;
        }

        let mangled = format!("{}.{}", self.class_name, name.val());
        let locals = self.table.count(Kind::Local);
        self.emit(Vm::Function(mangled, locals));

        match kind {
            SubKind::Constructor => {
                // El constructor reserva memoria para sus campos y la
                // apunta con `this`
                let fields = self.table.count(Kind::Field);
                self.emit(Vm::Push(Segment::Constant, fields));
                self.emit(Vm::Call("Memory.alloc".to_string(), 1));
                self.emit(Vm::Pop(Segment::Pointer, 0));
            }

            SubKind::Method => {
                // Un método recibe su `this` en `argument 0`
                self.emit(Vm::Push(Segment::Argument, 0));
                self.emit(Vm::Pop(Segment::Pointer, 0));
            }

            SubKind::Function => (),
        }

        self.statements()?;
        self.expect_symbol('}')?;

        Ok(())
    }

    /// Secuencia de sentencias hasta el `}` de cierre, sin consumirlo.
    fn statements(&mut self) -> Parse<()> {
        while !self.peek_symbol('}') {
            let token = self.advance("a statement")?;
            match token.val() {
                Token::Keyword(Keyword::Let) => self.let_statement()?,
                Token::Keyword(Keyword::If) => self.if_statement()?,
                Token::Keyword(Keyword::While) => self.while_statement()?,
                Token::Keyword(Keyword::Do) => self.do_statement()?,
                Token::Keyword(Keyword::Return) => self.return_statement(token.span())?,
                _ => return Err(unexpected("a statement", token)),
            }
        }

        Ok(())
    }

    fn let_statement(&mut self) -> Parse<()> {
        let name = self.expect_ident()?;
        let entry = self.resolve(&name)?;

        if self.eat_symbol('[') {
            // `let a[e1] = e2`: la dirección base más el índice se
            // calcula antes de evaluar `e2`, y el resultado pasa por
            // `temp 0` porque `e2` puede subscribir arreglos y
            // sobreescribir `pointer 1` en el camino
            self.expression()?;
            self.expect_symbol(']')?;
            self.emit(Vm::Push(entry.kind.segment(), entry.index));
            self.emit(Vm::Add);

            self.expect_symbol('=')?;
            self.expression()?;
            self.expect_symbol(';')?;

            self.emit(Vm::Pop(Segment::Temp, 0));
            self.emit(Vm::Pop(Segment::Pointer, 1));
            self.emit(Vm::Push(Segment::Temp, 0));
            self.emit(Vm::Pop(Segment::That, 0));
        } else {
            self.expect_symbol('=')?;
            self.expression()?;
            self.expect_symbol(';')?;

            self.emit(Vm::Pop(entry.kind.segment(), entry.index));
        }

        Ok(())
    }

    fn if_statement(&mut self) -> Parse<()> {
        let sequence = self.if_labels;
        self.if_labels += 1;

        let if_true = format!("IF_TRUE{}", sequence);
        let if_false = format!("IF_FALSE{}", sequence);

        self.expect_symbol('(')?;
        self.expression()?;
        self.expect_symbol(')')?;

        self.emit(Vm::IfGoto(if_true.clone()));
        self.emit(Vm::Goto(if_false.clone()));
        self.emit(Vm::Label(if_true));

        self.expect_symbol('{')?;
        self.statements()?;
        self.expect_symbol('}')?;

        if self.peek_keyword(Keyword::Else) {
            self.cursor += 1;

            let if_end = format!("IF_END{}", sequence);
            self.emit(Vm::Goto(if_end.clone()));
            self.emit(Vm::Label(if_false));

            self.expect_symbol('{')?;
            self.statements()?;
            self.expect_symbol('}')?;

            self.emit(Vm::Label(if_end));
        } else {
            // Sin `else`, la etiqueta falsa es el punto de salida
            self.emit(Vm::Label(if_false));
        }

        Ok(())
    }

    fn while_statement(&mut self) -> Parse<()> {
        let sequence = self.while_labels;
        self.while_labels += 1;

        let exp = format!("WHILE_EXP{}", sequence);
        let end = format!("WHILE_END{}", sequence);

        self.emit(Vm::Label(exp.clone()));

        self.expect_symbol('(')?;
        self.expression()?;
        self.expect_symbol(')')?;

        self.emit(Vm::Not);
        self.emit(Vm::IfGoto(end.clone()));

        self.expect_symbol('{')?;
        self.statements()?;
        self.expect_symbol('}')?;

        self.emit(Vm::Goto(exp));
        self.emit(Vm::Label(end));

        Ok(())
    }

    fn do_statement(&mut self) -> Parse<()> {
        let first = self.expect_ident()?;
        self.call(first)?;
        self.expect_symbol(';')?;

        // El valor de la llamada se descarta
        self.emit(Vm::Pop(Segment::Temp, 0));
        Ok(())
    }

    fn return_statement(&mut self, at: Span) -> Parse<()> {
        if self.peek_symbol(';') {
            if !self.returns_void {
                return Err(Located::at(ParseError::MissingReturnValue, at));
            }

            // Toda subrutina entrega un valor; `void` entrega cero
            self.emit(Vm::Push(Segment::Constant, 0));
        } else {
            if self.returns_void {
                return Err(Located::at(ParseError::VoidReturnValue, at));
            }

            self.expression()?;
        }

        self.expect_symbol(';')?;
        self.emit(Vm::Return);
        Ok(())
    }

    // ---- Expresiones ----

    /// `term (op term)*`, con emisión postfija: ambos operandos
    /// preceden a su operador.
    fn expression(&mut self) -> Parse<()> {
        self.term()?;

        while let Some(op) = self.peek_operator() {
            self.cursor += 1;
            self.term()?;
            self.operator(op);
        }

        Ok(())
    }

    fn peek_operator(&self) -> Option<char> {
        match self.peek().map(Located::val) {
            Some(Token::Symbol(c)) if "+-*/&|<>=".contains(*c) => Some(*c),
            _ => None,
        }
    }

    fn operator(&mut self, op: char) {
        match op {
            '+' => self.emit(Vm::Add),
            '-' => self.emit(Vm::Sub),
            '&' => self.emit(Vm::And),
            '|' => self.emit(Vm::Or),
            '<' => self.emit(Vm::Lt),
            '>' => self.emit(Vm::Gt),
            '=' => self.emit(Vm::Eq),

            // La ALU no multiplica ni divide; lo hace la biblioteca
            '*' => self.emit(Vm::Call("Math.multiply".to_string(), 2)),
            '/' => self.emit(Vm::Call("Math.divide".to_string(), 2)),

            _ => unreachable!("peek_operator only admits operators"),
        }
    }

    fn term(&mut self) -> Parse<()> {
        let token = self.advance("an expression")?;
        let (span, token) = token.split();

        match token {
            Token::Int(value) => self.emit(Vm::Push(Segment::Constant, value)),
            Token::Str(string) => self.string_literal(&string),

            Token::Keyword(Keyword::True) => {
                self.emit(Vm::Push(Segment::Constant, 0));
                self.emit(Vm::Not);
            }
            Token::Keyword(Keyword::False) | Token::Keyword(Keyword::Null) => {
                self.emit(Vm::Push(Segment::Constant, 0));
            }
            Token::Keyword(Keyword::This) => self.emit(Vm::Push(Segment::Pointer, 0)),

            Token::Symbol('(') => {
                self.expression()?;
                self.expect_symbol(')')?;
            }

            Token::Symbol('-') => {
                self.term()?;
                self.emit(Vm::Neg);
            }
            Token::Symbol('~') => {
                self.term()?;
                self.emit(Vm::Not);
            }

            Token::Ident(name) => {
                let name = Located::at(name, span);

                if self.peek_symbol('(') || self.peek_symbol('.') {
                    self.call(name)?;
                } else if self.eat_symbol('[') {
                    // `v[e]`: primero el índice, luego la base
                    self.expression()?;
                    self.expect_symbol(']')?;

                    let entry = self.resolve(&name)?;
                    self.emit(Vm::Push(entry.kind.segment(), entry.index));
                    self.emit(Vm::Add);
                    self.emit(Vm::Pop(Segment::Pointer, 1));
                    self.emit(Vm::Push(Segment::That, 0));
                } else {
                    let entry = self.resolve(&name)?;
                    self.emit(Vm::Push(entry.kind.segment(), entry.index));
                }
            }

            token => return Err(unexpected("an expression", Located::at(token, span))),
        }

        Ok(())
    }

    /// Resuelve y emite una llamada a subrutina; `first` es el
    /// identificador inicial ya consumido.
    fn call(&mut self, first: Located<String>) -> Parse<()> {
        if self.eat_symbol('.') {
            let second = self.expect_ident()?;

            match self.table.lookup(first.val()).cloned() {
                // `obj.metodo(...)`: el objeto viaja como primer
                // argumento y la clase destino es el tipo declarado
                Some(entry) => {
                    if entry.kind == Kind::Field && self.sub_kind == SubKind::Function {
                        return Err(Located::at(
                            ParseError::FieldFromFunction(first.val().clone()),
                            first.span(),
                        ));
                    }

                    let class = match &entry.typ {
                        VarType::Class(class) => class.clone(),
                        _ => {
                            return Err(Located::at(
                                ParseError::NotAnObject(first.val().clone()),
                                first.span(),
                            ))
                        }
                    };

                    self.emit(Vm::Push(entry.kind.segment(), entry.index));
                    let arguments = self.arguments()?;
                    self.emit(Vm::Call(format!("{}.{}", class, second.val()), arguments + 1));
                }

                // `Clase.subrutina(...)`: llamada sin receptor
                None => {
                    let arguments = self.arguments()?;
                    self.emit(Vm::Call(
                        format!("{}.{}", first.val(), second.val()),
                        arguments,
                    ));
                }
            }
        } else {
            // `metodo(...)`: método de la clase actual sobre `this`
            self.emit(Vm::Push(Segment::Pointer, 0));
            let arguments = self.arguments()?;
            self.emit(Vm::Call(
                format!("{}.{}", self.class_name, first.val()),
                arguments + 1,
            ));
        }

        Ok(())
    }

    /// `'(' (expression (',' expression)*)? ')'`; retorna la cantidad
    /// de argumentos emitidos.
    fn arguments(&mut self) -> Parse<u16> {
        self.expect_symbol('(')?;

        let mut count = 0;
        if !self.eat_symbol(')') {
            loop {
                self.expression()?;
                count += 1;

                if !self.eat_symbol(',') {
                    break;
                }
            }
            self.expect_symbol(')')?;
        }

        Ok(count)
    }

    /// Una constante de cadena se construye carácter por carácter
    /// sobre un objeto `String` nuevo.
    fn string_literal(&mut self, string: &str) {
        let length = string.chars().count() as u16;
        self.emit(Vm::Push(Segment::Constant, length));
        self.emit(Vm::Call("String.new".to_string(), 1));

        for c in string.chars() {
            self.emit(Vm::Push(Segment::Constant, c as u16));
            self.emit(Vm::Call("String.appendChar".to_string(), 2));
        }
    }
}

fn unexpected(expected: impl Into<String>, token: Located<Token>) -> Located<ParseError> {
    let (span, found) = token.split();
    Located::at(
        ParseError::Unexpected {
            expected: expected.into(),
            found,
        },
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::tokenize;

    fn compile_class(source: &str) -> Vec<String> {
        let tokens = tokenize(source).expect("lexes");
        compile(&tokens)
            .expect("compiles")
            .iter()
            .map(|inst| inst.to_string())
            .collect()
    }

    fn compile_error(source: &str) -> ParseError {
        let tokens = tokenize(source).expect("lexes");
        compile(&tokens).unwrap_err().into_inner()
    }

    #[test]
    fn constructors_allocate_their_fields() {
        let code = compile_class(
            "class Point {\n\
             field int x, y;\n\
             constructor Point new(int ax, int ay) {\n\
                 let x = ax;\n\
                 let y = ay;\n\
                 return this;\n\
             }\n\
             }",
        );

        assert_eq!(
            code,
            [
                "function Point.new 0",
                "push constant 2",
                "call Memory.alloc 1",
                "pop pointer 0",
                "push argument 0",
                "pop this 0",
                "push argument 1",
                "pop this 1",
                "push pointer 0",
                "return",
            ]
        );
    }

    #[test]
    fn methods_bind_this_and_shift_arguments() {
        let code = compile_class(
            "class Point {\n\
             field int x;\n\
             method int getX(int unused) {\n\
                 return x;\n\
             }\n\
             }",
        );

        assert_eq!(
            code,
            [
                "function Point.getX 0",
                "push argument 0",
                "pop pointer 0",
                "push this 0",
                "return",
            ]
        );
    }

    #[test]
    fn while_loops_emit_their_label_pair() {
        let code = compile_class(
            "class Main {\n\
             function void count(int n) {\n\
                 var int i;\n\
                 let i = 0;\n\
                 while (i < n) {\n\
                     let i = i + 1;\n\
                 }\n\
                 return;\n\
             }\n\
             }",
        );

        assert_eq!(
            code,
            [
                "function Main.count 1",
                "push constant 0",
                "pop local 0",
                "label WHILE_EXP0",
                "push local 0",
                "push argument 0",
                "lt",
                "not",
                "if-goto WHILE_END0",
                "push local 0",
                "push constant 1",
                "add",
                "pop local 0",
                "goto WHILE_EXP0",
                "label WHILE_END0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn empty_while_still_emits_both_labels() {
        let code = compile_class(
            "class Main {\n\
             function void spin() {\n\
                 while (true) {\n\
                 }\n\
                 return;\n\
             }\n\
             }",
        );

        assert!(code.contains(&"label WHILE_EXP0".to_string()));
        assert!(code.contains(&"label WHILE_END0".to_string()));
        assert!(code.contains(&"goto WHILE_EXP0".to_string()));
    }

    #[test]
    fn if_without_else_omits_the_end_label() {
        let code = compile_class(
            "class Main {\n\
             function void check(int n) {\n\
                 if (n > 0) {\n\
                     do Output.printInt(n);\n\
                 }\n\
                 return;\n\
             }\n\
             }",
        );

        assert!(code.contains(&"if-goto IF_TRUE0".to_string()));
        assert!(code.contains(&"goto IF_FALSE0".to_string()));
        assert!(code.contains(&"label IF_FALSE0".to_string()));
        assert!(!code.iter().any(|line| line.contains("IF_END")));
    }

    #[test]
    fn if_with_else_uses_all_three_labels() {
        let code = compile_class(
            "class Main {\n\
             function int sign(int n) {\n\
                 if (n < 0) {\n\
                     return 1;\n\
                 } else {\n\
                     return 0;\n\
                 }\n\
             }\n\
             }",
        );

        let expected = [
            "function Main.sign 0",
            "push argument 0",
            "push constant 0",
            "lt",
            "if-goto IF_TRUE0",
            "goto IF_FALSE0",
            "label IF_TRUE0",
            "push constant 1",
            "return",
            "goto IF_END0",
            "label IF_FALSE0",
            "push constant 0",
            "return",
            "label IF_END0",
        ];

        assert_eq!(code, expected);
    }

    #[test]
    fn call_shapes_resolve_by_receiver() {
        let code = compile_class(
            "class Game {\n\
             field int score;\n\
             method void play(Point p, int x) {\n\
                 do p.move(1, 2);\n\
                 do Math.abs(x);\n\
                 do tick(1);\n\
                 return;\n\
             }\n\
             method void tick(int n) {\n\
                 return;\n\
             }\n\
             }",
        );

        let text = code.join("\n");

        // método sobre una variable: el objeto más sus argumentos
        assert!(text.contains(
            "push argument 1\npush constant 1\npush constant 2\ncall Point.move 3"
        ));
        // llamada estática: solo los argumentos
        assert!(text.contains("push argument 2\ncall Math.abs 1"));
        // método propio: `this` implícito
        assert!(text.contains("push pointer 0\npush constant 1\ncall Game.tick 2"));
    }

    #[test]
    fn do_discards_the_result() {
        let code = compile_class(
            "class Main {\n\
             function void main() {\n\
                 do Output.println();\n\
                 return;\n\
             }\n\
             }",
        );

        assert_eq!(
            code,
            [
                "function Main.main 0",
                "call Output.println 0",
                "pop temp 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn keyword_constants_and_unaries() {
        let code = compile_class(
            "class Main {\n\
             function boolean flags() {\n\
                 var boolean a;\n\
                 let a = true;\n\
                 let a = false;\n\
                 let a = ~a;\n\
                 return -1 = (0 - 1);\n\
             }\n\
             }",
        );

        let text = code.join("\n");
        assert!(text.contains("push constant 0\nnot\npop local 0"));
        assert!(text.contains("push constant 0\npop local 0"));
        assert!(text.contains("push local 0\nnot\npop local 0"));
        assert!(text.contains("push constant 1\nneg"));
    }

    #[test]
    fn string_literals_build_a_string_object() {
        let code = compile_class(
            "class Main {\n\
             function void main() {\n\
                 do Output.printString(\"Hi\");\n\
                 return;\n\
             }\n\
             }",
        );

        let text = code.join("\n");
        assert!(text.contains(
            "push constant 2\n\
             call String.new 1\n\
             push constant 72\n\
             call String.appendChar 2\n\
             push constant 105\n\
             call String.appendChar 2"
        ));
    }

    #[test]
    fn empty_strings_skip_append_char() {
        let code = compile_class(
            "class Main {\n\
             function void main() {\n\
                 do Output.printString(\"\");\n\
                 return;\n\
             }\n\
             }",
        );

        let text = code.join("\n");
        assert!(text.contains("push constant 0\ncall String.new 1"));
        assert!(!text.contains("String.appendChar"));
    }

    #[test]
    fn array_reads_and_writes_use_that() {
        let code = compile_class(
            "class Main {\n\
             function void main(Array a, Array b) {\n\
                 let a[1] = b[2];\n\
                 return;\n\
             }\n\
             }",
        );

        assert_eq!(
            code,
            [
                "function Main.main 0",
                // a[1] como destino
                "push constant 1",
                "push argument 0",
                "add",
                // b[2] como valor
                "push constant 2",
                "push argument 1",
                "add",
                "pop pointer 1",
                "push that 0",
                // el valor pasa por temp 0
                "pop temp 0",
                "pop pointer 1",
                "push temp 0",
                "pop that 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn operators_emit_postfix() {
        let code = compile_class(
            "class Main {\n\
             function int f(int a, int b) {\n\
                 return a * b + Math.divide(a, 2) / b;\n\
             }\n\
             }",
        );

        assert_eq!(
            code,
            [
                "function Main.f 0",
                "push argument 0",
                "push argument 1",
                "call Math.multiply 2",
                "push argument 0",
                "push constant 2",
                "call Math.divide 2",
                "add",
                "push argument 1",
                "call Math.divide 2",
                "return",
            ]
        );
    }

    #[test]
    fn semantic_errors_are_fatal() {
        assert_eq!(
            compile_error("class C { function void f() { let x = 0; return; } }"),
            ParseError::Undefined("x".to_string())
        );

        assert_eq!(
            compile_error("class C { field int x; field int x; }"),
            ParseError::Redefined("x".to_string())
        );

        assert_eq!(
            compile_error(
                "class C { field int x; function int f() { return x; } }"
            ),
            ParseError::FieldFromFunction("x".to_string())
        );

        assert_eq!(
            compile_error("class C { function int f() { return; } }"),
            ParseError::MissingReturnValue
        );

        assert_eq!(
            compile_error("class C { function void f() { return 1; } }"),
            ParseError::VoidReturnValue
        );
    }

    #[test]
    fn parse_errors_point_at_the_offending_token() {
        let tokens = tokenize("class C { function void f() { let = 5; } }").unwrap();
        let error = compile(&tokens).unwrap_err();

        assert_eq!(
            *error.val(),
            ParseError::Unexpected {
                expected: "an identifier".to_string(),
                found: Token::Symbol('='),
            }
        );
        assert_eq!(error.span().start().line(), 1);
    }

    #[test]
    fn if_counters_reset_per_subroutine() {
        let code = compile_class(
            "class Main {\n\
             function void a() {\n\
                 if (true) { }\n\
                 return;\n\
             }\n\
             function void b() {\n\
                 if (true) { }\n\
                 return;\n\
             }\n\
             }",
        );

        assert_eq!(
            code.iter().filter(|line| *line == "label IF_FALSE0").count(),
            2
        );
    }
}
