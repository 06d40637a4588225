//! Renders a syntax tree back to Go source in gofmt layout: tab indentation,
//! one statement per line, a blank line between top-level declarations.
//! Comments are not part of the tree and are not reproduced.

use crate::ast::*;

pub fn print_file(file: &SourceFile) -> String {
    let mut printer = Printer::default();
    printer.file(file);
    printer.out
}

pub fn print_stmt(stmt: &Stmt) -> String {
    let mut printer = Printer::default();
    printer.stmt(stmt);
    printer.out
}

pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::default();
    printer.expr(expr);
    printer.out
}

pub fn print_type(ty: &TypeExpr) -> String {
    let mut printer = Printer::default();
    printer.ty(ty);
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }

    fn separated<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            each(self, item);
        }
    }

    /// `{ ... }` where each entry sits on its own, further indented line.
    fn braced<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Self, &T)) {
        self.push("{");
        self.indent += 1;
        for item in items {
            self.newline();
            each(self, item);
        }
        self.indent -= 1;
        self.newline();
        self.push("}");
    }

    // ---- file level -------------------------------------------------------

    fn file(&mut self, file: &SourceFile) {
        self.push("package ");
        self.push(&file.package.name);
        self.push("\n");
        match file.imports.as_slice() {
            [] => {}
            [single] => {
                self.push("\nimport ");
                self.import(single);
                self.push("\n");
            }
            imports => {
                self.push("\nimport (");
                self.indent += 1;
                for import in imports {
                    self.newline();
                    self.import(import);
                }
                self.indent -= 1;
                self.push("\n)\n");
            }
        }
        for decl in &file.decls {
            self.push("\n");
            match decl {
                Decl::Func(func) => self.func_decl(func),
                Decl::Value(value) => self.value_decl(value),
                Decl::Type(ty) => self.type_decl(ty),
            }
            self.push("\n");
        }
    }

    fn import(&mut self, import: &ImportSpec) {
        if let Some(alias) = &import.alias {
            self.push(alias);
            self.push(" ");
        }
        self.push(&import.path);
    }

    fn func_decl(&mut self, func: &FuncDecl) {
        self.push("func ");
        if let Some(receiver) = &func.receiver {
            self.push("(");
            self.param(receiver);
            self.push(") ");
        }
        self.push(&func.name.name);
        self.signature(&func.signature);
        if let Some(body) = &func.body {
            self.push(" ");
            self.block(body);
        }
    }

    fn signature(&mut self, signature: &Signature) {
        self.push("(");
        self.separated(&signature.params, Self::param);
        self.push(")");
        match signature.results.as_slice() {
            [] => {}
            [single] if single.names.is_empty() => {
                self.push(" ");
                self.ty(&single.ty);
            }
            results => {
                self.push(" (");
                self.separated(results, Self::param);
                self.push(")");
            }
        }
    }

    fn param(&mut self, param: &Param) {
        if !param.names.is_empty() {
            self.idents(&param.names);
            self.push(" ");
        }
        if param.variadic {
            self.push("...");
        }
        self.ty(&param.ty);
    }

    fn idents(&mut self, idents: &[Ident]) {
        self.separated(idents, |p, ident| p.push(&ident.name));
    }

    fn value_decl(&mut self, decl: &ValueDecl) {
        self.push(decl.keyword.as_str());
        if decl.grouped {
            self.push(" (");
            self.indent += 1;
            for spec in &decl.specs {
                self.newline();
                self.value_spec(spec);
            }
            self.indent -= 1;
            self.newline();
            self.push(")");
        } else {
            for spec in &decl.specs {
                self.push(" ");
                self.value_spec(spec);
            }
        }
    }

    fn value_spec(&mut self, spec: &ValueSpec) {
        self.idents(&spec.names);
        if let Some(ty) = &spec.ty {
            self.push(" ");
            self.ty(ty);
        }
        if !spec.values.is_empty() {
            self.push(" = ");
            self.exprs(&spec.values);
        }
    }

    fn type_decl(&mut self, decl: &TypeDecl) {
        self.push("type");
        if decl.grouped {
            self.push(" (");
            self.indent += 1;
            for spec in &decl.specs {
                self.newline();
                self.type_spec(spec);
            }
            self.indent -= 1;
            self.newline();
            self.push(")");
        } else {
            for spec in &decl.specs {
                self.push(" ");
                self.type_spec(spec);
            }
        }
    }

    fn type_spec(&mut self, spec: &TypeSpec) {
        self.push(&spec.name.name);
        self.push(if spec.alias { " = " } else { " " });
        self.ty(&spec.ty);
    }

    // ---- types ------------------------------------------------------------

    fn ty(&mut self, ty: &TypeExpr) {
        match ty {
            TypeExpr::Named { package, name } => {
                if let Some(package) = package {
                    self.push(package);
                    self.push(".");
                }
                self.push(name);
            }
            TypeExpr::Pointer(elem) => {
                self.push("*");
                self.ty(elem);
            }
            TypeExpr::Slice(elem) => {
                self.push("[]");
                self.ty(elem);
            }
            TypeExpr::Array { len, elem } => {
                self.push("[");
                self.push(len);
                self.push("]");
                self.ty(elem);
            }
            TypeExpr::Map { key, value } => {
                self.push("map[");
                self.ty(key);
                self.push("]");
                self.ty(value);
            }
            TypeExpr::Chan { dir, elem } => {
                self.push(match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.ty(elem);
            }
            TypeExpr::Func(signature) => {
                self.push("func");
                self.signature(signature);
            }
            TypeExpr::Struct(fields) if fields.is_empty() => self.push("struct{}"),
            TypeExpr::Struct(fields) => {
                self.push("struct ");
                self.braced(fields, Self::field);
            }
            TypeExpr::Interface(elems) if elems.is_empty() => self.push("interface{}"),
            TypeExpr::Interface(elems) => {
                self.push("interface ");
                self.braced(elems, |p, elem| match elem {
                    InterfaceElem::Method { name, signature } => {
                        p.push(&name.name);
                        p.signature(signature);
                    }
                    InterfaceElem::Embed(ty) => p.ty(ty),
                });
            }
        }
    }

    fn field(&mut self, field: &Field) {
        if !field.names.is_empty() {
            self.idents(&field.names);
            self.push(" ");
        }
        self.ty(&field.ty);
        if let Some(tag) = &field.tag {
            self.push(" ");
            self.push(tag);
        }
    }

    // ---- statements -------------------------------------------------------

    fn block(&mut self, block: &Block) {
        self.braced(&block.stmts, Self::stmt);
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.value {
            StmtKind::Expr(expr) => self.expr(expr),
            StmtKind::Assign { lhs, op, rhs } => {
                self.exprs(lhs);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.exprs(rhs);
            }
            StmtKind::IncDec { target, increment } => {
                self.expr(target);
                self.push(if *increment { "++" } else { "--" });
            }
            StmtKind::Value(decl) => self.value_decl(decl),
            StmtKind::Type(decl) => self.type_decl(decl),
            StmtKind::Return(values) => {
                self.push("return");
                if !values.is_empty() {
                    self.push(" ");
                    self.exprs(values);
                }
            }
            StmtKind::If {
                init,
                cond,
                then,
                otherwise,
            } => {
                self.push("if ");
                if let Some(init) = init {
                    self.stmt(init);
                    self.push("; ");
                }
                self.expr(cond);
                self.push(" ");
                self.block(then);
                if let Some(otherwise) = otherwise {
                    self.push(" else ");
                    self.stmt(otherwise);
                }
            }
            StmtKind::For { header, body } => {
                self.push("for ");
                match header {
                    ForHeader::Infinite => {}
                    ForHeader::Cond(cond) => {
                        self.expr(cond);
                        self.push(" ");
                    }
                    ForHeader::Clause { init, cond, post } => {
                        if let Some(init) = init {
                            self.stmt(init);
                        }
                        self.push("; ");
                        if let Some(cond) = cond {
                            self.expr(cond);
                        }
                        self.push(";");
                        if let Some(post) = post {
                            self.push(" ");
                            self.stmt(post);
                        }
                        self.push(" ");
                    }
                    ForHeader::Range {
                        key,
                        value,
                        define,
                        expr,
                    } => {
                        if let Some(key) = key {
                            self.expr(key);
                            if let Some(value) = value {
                                self.push(", ");
                                self.expr(value);
                            }
                            self.push(if *define { " := " } else { " = " });
                        }
                        self.push("range ");
                        self.expr(expr);
                        self.push(" ");
                    }
                }
                self.block(body);
            }
            StmtKind::Defer(expr) => {
                self.push("defer ");
                self.expr(expr);
            }
            StmtKind::Go(expr) => {
                self.push("go ");
                self.expr(expr);
            }
            StmtKind::Break(label) | StmtKind::Continue(label) => {
                self.push(if matches!(stmt.value, StmtKind::Break(_)) {
                    "break"
                } else {
                    "continue"
                });
                if let Some(label) = label {
                    self.push(" ");
                    self.push(&label.name);
                }
            }
            StmtKind::Send { channel, value } => {
                self.expr(channel);
                self.push(" <- ");
                self.expr(value);
            }
            StmtKind::Switch { init, tag, clauses } => {
                self.push("switch ");
                if let Some(init) = init {
                    self.stmt(init);
                    self.push("; ");
                }
                if let Some(tag) = tag {
                    self.expr(tag);
                    self.push(" ");
                }
                self.case_clauses(clauses);
            }
            StmtKind::TypeSwitch {
                init,
                binding,
                subject,
                clauses,
            } => {
                self.push("switch ");
                if let Some(init) = init {
                    self.stmt(init);
                    self.push("; ");
                }
                if let Some(binding) = binding {
                    self.push(&binding.name);
                    self.push(" := ");
                }
                self.expr(subject);
                self.push(".(type) ");
                self.case_clauses(clauses);
            }
            StmtKind::Select(clauses) => {
                self.push("select {");
                for clause in clauses {
                    self.newline();
                    match &clause.comm {
                        Some(comm) => {
                            self.push("case ");
                            self.stmt(comm);
                        }
                        None => self.push("default"),
                    }
                    self.clause_body(&clause.body);
                }
                self.newline();
                self.push("}");
            }
            StmtKind::Labeled { label, stmt } => {
                // labels sit one level left of the statement they name
                if self.out.ends_with('\t') {
                    self.out.pop();
                }
                self.push(&label.name);
                self.push(":");
                if let Some(stmt) = stmt {
                    self.newline();
                    self.stmt(stmt);
                }
            }
            StmtKind::Goto(label) => {
                self.push("goto ");
                self.push(&label.name);
            }
            StmtKind::Fallthrough => self.push("fallthrough"),
            StmtKind::Block(block) => self.block(block),
        }
    }

    fn case_clauses(&mut self, clauses: &[CaseClause]) {
        self.push("{");
        for clause in clauses {
            self.newline();
            if clause.values.is_empty() {
                self.push("default");
            } else {
                self.push("case ");
                self.exprs(&clause.values);
            }
            self.clause_body(&clause.body);
        }
        self.newline();
        self.push("}");
    }

    /// `:` and the clause statements, one level in, without braces.
    fn clause_body(&mut self, body: &Block) {
        self.push(":");
        self.indent += 1;
        for stmt in &body.stmts {
            self.newline();
            self.stmt(stmt);
        }
        self.indent -= 1;
    }

    // ---- expressions ------------------------------------------------------

    fn exprs(&mut self, exprs: &[Expr]) {
        self.separated(exprs, Self::expr);
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.value {
            ExprKind::Ident(name) => self.push(name),
            ExprKind::Literal(literal) => self.push(&literal.raw),
            ExprKind::Composite { ty, elements } => {
                if let Some(ty) = ty {
                    self.ty(ty);
                }
                self.push("{");
                self.separated(elements, |p, element| {
                    if let Some(key) = &element.key {
                        p.expr(key);
                        p.push(": ");
                    }
                    p.expr(&element.value);
                });
                self.push("}");
            }
            ExprKind::FuncLit { signature, body } => {
                self.push("func");
                self.signature(signature);
                self.push(" ");
                self.block(body);
            }
            ExprKind::Paren(inner) => {
                self.push("(");
                self.expr(inner);
                self.push(")");
            }
            ExprKind::Selector { base, field } => {
                self.expr(base);
                self.push(".");
                self.push(&field.name);
            }
            ExprKind::Index { base, index } => {
                self.expr(base);
                self.push("[");
                self.expr(index);
                self.push("]");
            }
            ExprKind::Slice { base, low, high } => {
                self.expr(base);
                self.push("[");
                if let Some(low) = low {
                    self.expr(low);
                }
                self.push(":");
                if let Some(high) = high {
                    self.expr(high);
                }
                self.push("]");
            }
            ExprKind::TypeAssert { base, ty } => {
                self.expr(base);
                self.push(".(");
                self.ty(ty);
                self.push(")");
            }
            ExprKind::Call { func, args, spread } => {
                self.expr(func);
                self.push("(");
                self.exprs(args);
                if *spread {
                    self.push("...");
                }
                self.push(")");
            }
            ExprKind::Unary { op, operand } => {
                self.push(op.as_str());
                self.expr(operand);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.expr(lhs);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.expr(rhs);
            }
            ExprKind::Type(ty) => self.ty(ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_str;

    #[test]
    fn gofmt_shaped_source_round_trips() {
        let source = "package main

import (
\t\"fmt\"
\t\"log\"
)

type point struct {
\tx, y int
\tname string `json:\"name\"`
}

var (
\tcount = 0
\tlimit int
)

func (p *point) scale(k int, rest ...int) (int, error) {
\tfor i := 0; i < k; i++ {
\t\tp.x *= 2
\t}
\tfor _, r := range rest {
\t\tcount += r
\t}
\tif v, ok := lookup[p.name]; !ok {
\t\tlog.Print(v)
\t} else if p.y > 0 {
\t\treturn 0, nil
\t} else {
\t\tfmt.Println(\"none\")
\t}
\tdone := func() {
\t\tcount--
\t}
\tdefer done()
\treturn p.x + p.y + k, nil
}
";
        let file = parse_str(source).unwrap();
        assert_eq!(print_file(&file), source);
    }

    #[test]
    fn clause_statements_print_in_gofmt_layout() {
        let source = "package main

func pump(in <-chan int, out chan<- int, done chan struct{}) {
outer:
\tfor {
\t\tselect {
\t\tcase v := <-in:
\t\t\tswitch {
\t\t\tcase v < 0:
\t\t\t\tcontinue outer
\t\t\tcase v == 0, v > 9:
\t\t\t\tfallthrough
\t\t\tdefault:
\t\t\t\tout <- v
\t\t\t}
\t\tcase <-done:
\t\t\tgoto end
\t\t}
\t}
end:
\tswitch x := any(in).(type) {
\tcase nil:
\t\treturn
\tdefault:
\t\t_ = x
\t}
}
";
        let file = parse_str(source).unwrap();
        assert_eq!(print_file(&file), source);
    }

    #[test]
    fn single_import_is_not_grouped() {
        let file = parse_str("package main\nimport \"os\"\nfunc main() {\n}\n").unwrap();
        assert_eq!(print_file(&file), "package main\n\nimport \"os\"\n\nfunc main() {\n}\n");
    }

    #[test]
    fn expressions_print_compactly() {
        let file = parse_str("package main\nvar x = []map[string]int{{\"a\": 1}, {}}[0][\"a\"]\n").unwrap();
        let Decl::Value(decl) = &file.decls[0] else {
            panic!("expected a var declaration");
        };
        assert_eq!(
            print_expr(&decl.specs[0].values[0]),
            "[]map[string]int{{\"a\": 1}, {}}[0][\"a\"]"
        );
    }
}
