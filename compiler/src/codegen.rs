//! AST-to-bytecode compilation.
//!
//! The compiler walks the parsed program twice: a pre-pass declares every
//! top-level `var` and `fun` name so later top-level references resolve
//! regardless of textual order, then the emission pass lowers each node
//! into stack-machine bytecode. One `Compiler` can compile several
//! programs in sequence against the same global namespace and constant
//! pool, which is what the REPL relies on.

use std::rc::Rc;

use memory::{Function, Value};
use stilt_parser::ast::{Expr, Program, Stmt};
use stilt_parser::token::{Literal, Token, TokenKind};
use vm::OpCode;

use crate::error::CompileError;
use crate::scope::Scope;
use crate::symbol_table::{SymbolScope, SymbolTable};

/// Output of a compilation: a bytecode chunk, its constant pool and the
/// number of global slots the VM must allocate.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledScript {
    pub code: Vec<u8>,
    pub constants: Vec<Value>,
    pub global_count: usize,
}

pub struct Compiler {
    symbols: SymbolTable,
    scopes: Vec<Scope>,
    constants: Vec<Value>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            scopes: Vec::new(),
            constants: Vec::new(),
        }
    }

    pub fn compile(&mut self, program: &Program) -> Result<CompiledScript, CompileError> {
        self.scopes.push(Scope::new());
        let result = self.compile_program(program);
        let scope = self.scopes.pop().expect("main scope is present");
        result?;

        Ok(CompiledScript {
            code: scope.code,
            constants: self.constants.clone(),
            global_count: self.symbols.global_count(),
        })
    }

    fn compile_program(&mut self, program: &Program) -> Result<(), CompileError> {
        // Pass 1: pre-declare top-level names.
        for stmt in &program.stmts {
            match stmt {
                Stmt::Var { name, line, .. } | Stmt::Function { name, line, .. } => {
                    self.symbols.define_global(&name.lexeme, *line)?;
                }
                _ => {}
            }
        }

        // Pass 2: emission.
        program.stmts.iter().try_for_each(|s| self.compile_stmt(s))
    }

    fn scope(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is not empty")
    }

    fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    // ======================================================================
    // Statements
    // ======================================================================

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Expression { expr } => {
                self.compile_expr(expr)?;
                // SET_* already pops, so a statement-level assignment
                // leaves nothing to discard.
                if !matches!(expr, Expr::Assign { .. }) {
                    self.scope().emit(OpCode::Pop);
                }
                Ok(())
            }

            Stmt::Print { expr, .. } => {
                self.compile_expr(expr)?;
                self.scope().emit(OpCode::Print);
                Ok(())
            }

            Stmt::Var {
                name,
                initializer,
                line,
            } => {
                match initializer {
                    Some(expr) => self.compile_expr(expr)?,
                    None => self.scope().emit(OpCode::Nil),
                }
                let (slot, scope) = self.symbols.define(&name.lexeme, *line)?;
                self.emit_store(scope, slot, *line)
            }

            Stmt::Block { stmts, .. } => {
                self.symbols.enter_block();
                let result = stmts.iter().try_for_each(|s| self.compile_stmt(s));
                self.symbols.leave();
                result?;
                // A nested return does not guarantee a return on every
                // path, so it must not suppress the epilogue.
                self.scope().have_return = false;
                Ok(())
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.compile_expr(condition)?;
                let skip_then = self.scope().emit_jump(OpCode::JumpFalse);
                self.scope().emit(OpCode::Pop);
                self.compile_stmt(then_branch)?;
                let skip_else = self.scope().emit_jump(OpCode::Jump);
                self.scope().patch(skip_then, OpCode::JumpFalse)?;
                self.scope().emit(OpCode::Pop);
                if let Some(else_branch) = else_branch {
                    self.compile_stmt(else_branch)?;
                }
                self.scope().patch(skip_else, OpCode::Jump)?;
                self.scope().have_return = false;
                Ok(())
            }

            Stmt::While {
                condition, body, ..
            } => {
                let loop_start = self.scope().offset();
                self.compile_expr(condition)?;
                let exit = self.scope().emit_jump(OpCode::JumpFalse);
                self.scope().emit(OpCode::Pop);
                self.compile_stmt(body)?;
                self.scope().emit_loop(loop_start)?;
                self.scope().patch(exit, OpCode::JumpFalse)?;
                self.scope().emit(OpCode::Pop);
                self.scope().have_return = false;
                Ok(())
            }

            Stmt::Function {
                name,
                params,
                body,
                line,
            } => self.compile_function(name, params, body, *line),

            Stmt::Return { value, line } => {
                if self.scopes.len() == 1 {
                    return Err(CompileError::ReturnOutsideFunction { line: *line });
                }
                match value {
                    Some(expr) => self.compile_expr(expr)?,
                    None => self.scope().emit(OpCode::Nil),
                }
                self.scope().emit(OpCode::Return);
                self.scope().have_return = true;
                Ok(())
            }
        }
    }

    /// Compile a `fun` declaration: the name slot is bound before the body
    /// so top-level recursion resolves, the parameters become slots
    /// 0..N-1 of the callee's local region, and the finished prototype is
    /// emitted as a `CLOSURE` constant plus capture metadata.
    fn compile_function(
        &mut self,
        name: &Token,
        params: &[Token],
        body: &[Stmt],
        line: usize,
    ) -> Result<(), CompileError> {
        let (slot, scope) = self.symbols.define(&name.lexeme, line)?;

        self.symbols.enter_function();
        self.scopes.push(Scope::new());

        let result = self.compile_function_body(params, body);

        let function_scope = self.scopes.pop().expect("function scope is present");
        let upvalues = self.symbols.leave();
        result?;

        let function = Function::new(function_scope.code, params.len(), upvalues.len());
        let index = self.add_constant(Value::Function(Rc::new(function)));
        self.scope().emit_closure(index, &upvalues)?;

        self.emit_store(scope, slot, line)
    }

    fn compile_function_body(&mut self, params: &[Token], body: &[Stmt]) -> Result<(), CompileError> {
        for param in params {
            self.symbols.define(&param.lexeme, param.line)?;
        }
        for stmt in body {
            self.compile_stmt(stmt)?;
        }
        if !self.scope().have_return {
            self.scope().emit(OpCode::Nil);
            self.scope().emit(OpCode::Return);
        }
        Ok(())
    }

    // ======================================================================
    // Expressions
    // ======================================================================

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Literal { value, .. } => {
                let constant = match value {
                    Literal::Int(i) => Value::Int(*i),
                    Literal::Float(f) => Value::Float(*f),
                    Literal::Str(s) => Value::string(s),
                };
                let index = self.add_constant(constant);
                self.scope().emit_constant(index)
            }

            Expr::BoolLit { value, .. } => {
                self.scope()
                    .emit(if *value { OpCode::True } else { OpCode::False });
                Ok(())
            }

            Expr::NilLit { .. } => {
                self.scope().emit(OpCode::Nil);
                Ok(())
            }

            Expr::Grouping { expr } => self.compile_expr(expr),

            Expr::Unary { operator, right } => {
                self.compile_expr(right)?;
                match operator.kind {
                    TokenKind::Minus => self.scope().emit(OpCode::Negate),
                    TokenKind::Bang => self.scope().emit(OpCode::Not),
                    _ => {
                        return Err(CompileError::InvalidOperator {
                            op: operator.lexeme.clone(),
                            line: operator.line,
                        })
                    }
                }
                Ok(())
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                match operator.kind {
                    TokenKind::Plus => self.scope().emit(OpCode::Add),
                    TokenKind::Minus => self.scope().emit(OpCode::Subtract),
                    TokenKind::Star => self.scope().emit(OpCode::Multiply),
                    TokenKind::Slash => self.scope().emit(OpCode::Divide),
                    TokenKind::Percent => self.scope().emit(OpCode::Modulo),
                    TokenKind::EqualEqual => self.scope().emit(OpCode::Eq),
                    TokenKind::Greater => self.scope().emit(OpCode::Gt),
                    TokenKind::Less => self.scope().emit(OpCode::Lt),
                    TokenKind::GreaterEqual => self.scope().emit(OpCode::Ge),
                    TokenKind::LessEqual => self.scope().emit(OpCode::Le),
                    TokenKind::BangEqual => {
                        // No dedicated opcode; lowered to EQ; NOT.
                        self.scope().emit(OpCode::Eq);
                        self.scope().emit(OpCode::Not);
                    }
                    _ => {
                        return Err(CompileError::InvalidOperator {
                            op: operator.lexeme.clone(),
                            line: operator.line,
                        })
                    }
                }
                Ok(())
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => match operator.kind {
                TokenKind::And => {
                    self.compile_expr(left)?;
                    let short_circuit = self.scope().emit_jump(OpCode::JumpFalse);
                    self.scope().emit(OpCode::Pop);
                    self.compile_expr(right)?;
                    self.scope().patch(short_circuit, OpCode::JumpFalse)
                }
                TokenKind::Or => {
                    self.compile_expr(left)?;
                    let try_right = self.scope().emit_jump(OpCode::JumpFalse);
                    let short_circuit = self.scope().emit_jump(OpCode::Jump);
                    self.scope().patch(try_right, OpCode::JumpFalse)?;
                    self.scope().emit(OpCode::Pop);
                    self.compile_expr(right)?;
                    self.scope().patch(short_circuit, OpCode::Jump)
                }
                _ => Err(CompileError::InvalidOperator {
                    op: operator.lexeme.clone(),
                    line: operator.line,
                }),
            },

            Expr::Variable { name } => {
                let (index, scope) =
                    self.symbols
                        .get(&name.lexeme)
                        .ok_or_else(|| CompileError::VariableNotDefined {
                            name: name.lexeme.clone(),
                            line: name.line,
                        })?;
                let op = match scope {
                    SymbolScope::Global => OpCode::GetGlobal,
                    SymbolScope::Local => OpCode::GetLocal,
                    SymbolScope::Upvalue => OpCode::GetUpvalue,
                };
                self.scope().emit_with_operand(op, index as u64)
            }

            Expr::Assign { name, value } => {
                self.compile_expr(value)?;
                let (index, scope) =
                    self.symbols
                        .get(&name.lexeme)
                        .ok_or_else(|| CompileError::VariableNotDefined {
                            name: name.lexeme.clone(),
                            line: name.line,
                        })?;
                let op = match scope {
                    SymbolScope::Global => OpCode::SetGlobal,
                    SymbolScope::Local => OpCode::SetLocal,
                    SymbolScope::Upvalue => OpCode::SetUpvalue,
                };
                self.scope().emit_with_operand(op, index as u64)
            }

            Expr::Call { callee, args, .. } => {
                self.compile_expr(callee)?;
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.scope().emit_with_operand(OpCode::Call, args.len() as u64)
            }
        }
    }

    /// Store the value on top of the stack into a freshly defined name.
    fn emit_store(
        &mut self,
        scope: SymbolScope,
        slot: usize,
        line: usize,
    ) -> Result<(), CompileError> {
        let op = match scope {
            SymbolScope::Global => OpCode::SetGlobal,
            SymbolScope::Local => OpCode::SetLocal,
            // `define` never yields an upvalue.
            SymbolScope::Upvalue => return Err(CompileError::InvalidSymbolScope { line }),
        };
        self.scope().emit_with_operand(op, slot as u64)
    }
}
