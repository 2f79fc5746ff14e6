use std::collections::BTreeSet;

use crate::SourceFrontend;
use crate::types::{
    BranchKind, BranchKinds, BranchLabel, CountableUnit, DecisionSite, EngineError, ProbePoint,
    SourceUnit, StatementSpan, StructuralModel,
};

use super::ast::{Block, Expr, Program, Stmt};
use super::parser;
use super::syntax::builtins;

/// Front end for the simple language (`.sim`)
pub struct SimpleFrontend;

impl SimpleFrontend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SimpleFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceFrontend for SimpleFrontend {
    fn name(&self) -> &'static str {
        "Simple"
    }

    fn extensions(&self) -> &[&'static str] {
        &["sim"]
    }

    fn build(
        &self,
        unit: &SourceUnit,
        kinds: &BranchKinds,
    ) -> Result<StructuralModel, EngineError> {
        let program = parser::parse(&unit.text)
            .map_err(|e| EngineError::malformed(&unit.name, e.line, e.message))?;
        let mut builder = ModelBuilder {
            unit: unit.name.clone(),
            source: &unit.text,
            kinds,
            units: Vec::new(),
            sites: Vec::new(),
            statements: Vec::new(),
            probes: Vec::new(),
            seen_lines: BTreeSet::new(),
            next_site: 0,
        };
        builder.walk_program(&program);
        Ok(StructuralModel {
            unit_name: unit.name.clone(),
            content_hash: unit.content_hash,
            units: builder.units,
            sites: builder.sites,
            statements: builder.statements,
            probes: builder.probes,
        })
    }
}

/// Walks the syntax tree in source order, enumerating countable units and
/// emitting the probe edits that wire them to counters.
///
/// Line units: one per line holding at least one executable statement; the
/// probe (`__hit(i);`) lands at the start of the first statement on the
/// line, the earliest point where reaching the line is certain.
///
/// Branch units: conditions are rewritten as `__cond(t, f, expr)`, which
/// bumps one of the two counters and yields the expression's value, so
/// `if` without `else` and loop-exit branches are measured without
/// synthesizing arms. `switch` arms get `__hit` probes at arm entry, and a
/// default arm is materialized when missing so the site's label set stays
/// exhaustive.
struct ModelBuilder<'a> {
    unit: String,
    source: &'a str,
    kinds: &'a BranchKinds,
    units: Vec<CountableUnit>,
    sites: Vec<DecisionSite>,
    statements: Vec<StatementSpan>,
    probes: Vec<ProbePoint>,
    seen_lines: BTreeSet<u32>,
    next_site: u32,
}

impl ModelBuilder<'_> {
    fn walk_program(&mut self, program: &Program) {
        for function in &program.functions {
            self.walk_block(&function.body);
        }
    }

    fn walk_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.walk_stmt(stmt);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        let span = stmt.span();
        let mut contributes = Vec::new();

        // First executable statement on a line claims the line unit
        if !self.seen_lines.contains(&span.line) {
            self.seen_lines.insert(span.line);
            let line_unit = CountableUnit::line(&self.unit, span.line);
            self.units.push(line_unit.clone());
            self.probes.push(ProbePoint {
                units: vec![line_unit.clone()],
                byte_offset: span.start,
                old_text: String::new(),
                template: format!("{}({{0}}); ", builtins::HIT),
            });
            contributes.push(line_unit);
        }

        match stmt {
            Stmt::Let { .. }
            | Stmt::Assign { .. }
            | Stmt::Return { .. }
            | Stmt::Print { .. }
            | Stmt::Call { .. } => {}
            Stmt::If { arms, else_block, .. } => {
                for (cond, body) in arms {
                    if self.kinds.enabled(BranchKind::If) {
                        contributes.extend(self.instrument_condition(cond, BranchKind::If));
                    }
                    self.walk_block(body);
                }
                if let Some(body) = else_block {
                    self.walk_block(body);
                }
            }
            Stmt::While { cond, body, .. } => {
                if self.kinds.enabled(BranchKind::Loop) {
                    contributes.extend(self.instrument_condition(cond, BranchKind::Loop));
                }
                self.walk_block(body);
            }
            Stmt::Switch { cases, default, .. } => {
                if self.kinds.enabled(BranchKind::Switch) {
                    contributes.extend(self.instrument_switch(stmt, cases, default));
                } else {
                    for case in cases {
                        self.walk_block(&case.body);
                    }
                    if let Some(body) = default {
                        self.walk_block(body);
                    }
                }
            }
        }

        self.statements.push(StatementSpan {
            line: span.line,
            start: span.start,
            end: span.end,
            contributes,
        });
    }

    fn new_site(&mut self, kind: BranchKind, line: u32, labels: Vec<BranchLabel>) -> u32 {
        let id = self.next_site;
        self.next_site += 1;
        self.sites.push(DecisionSite {
            id,
            kind,
            line,
            labels,
        });
        id
    }

    fn slice(&self, start: u32, end: u32) -> &str {
        &self.source[start as usize..end as usize]
    }

    /// Wrap a condition in `__cond` probes. One decision site for the
    /// condition as a whole; when the short-circuit kind is enabled, one
    /// more per `&&`/`||` for its conditionally evaluated right operand.
    fn instrument_condition(&mut self, cond: &Expr, kind: BranchKind) -> Vec<CountableUnit> {
        let span = cond.span();
        let mut probe_units = Vec::new();
        let template = self.wrap_outcome(cond, kind, &mut probe_units);
        self.probes.push(ProbePoint {
            units: probe_units.clone(),
            byte_offset: span.start,
            old_text: self.slice(span.start, span.end).to_string(),
            template,
        });
        probe_units
    }

    /// Emit a site for `expr`'s own true/false outcome and return the
    /// `__cond(...)` template measuring it
    fn wrap_outcome(
        &mut self,
        expr: &Expr,
        kind: BranchKind,
        probe_units: &mut Vec<CountableUnit>,
    ) -> String {
        let line = expr.span().line;
        let site = self.new_site(kind, line, vec![BranchLabel::True, BranchLabel::False]);
        let true_slot = probe_units.len();
        let t = CountableUnit::branch(&self.unit, site, BranchLabel::True, line);
        self.units.push(t.clone());
        probe_units.push(t);
        let false_slot = probe_units.len();
        let f = CountableUnit::branch(&self.unit, site, BranchLabel::False, line);
        self.units.push(f.clone());
        probe_units.push(f);

        let inner = self.descend(expr, probe_units);
        format!(
            "{}({{{true_slot}}}, {{{false_slot}}}, {inner})",
            builtins::COND
        )
    }

    /// Render `expr` into the probe template, giving every short-circuit
    /// right operand its own decision site on the way down. Everything
    /// else is spliced verbatim from the source.
    fn descend(&mut self, expr: &Expr, probe_units: &mut Vec<CountableUnit>) -> String {
        match expr {
            Expr::Binary { op, lhs, rhs, .. }
                if op.is_short_circuit() && self.kinds.enabled(BranchKind::ShortCircuit) =>
            {
                let lhs_text = self.descend(lhs, probe_units);
                let rhs_text = self.wrap_outcome(rhs, BranchKind::ShortCircuit, probe_units);
                let op_text = match op {
                    super::ast::BinOp::And => "&&",
                    _ => "||",
                };
                // Composed text is always parenthesized: the original
                // grouping may have come from parentheses the spans of the
                // operands no longer cover
                format!("({lhs_text} {op_text} {rhs_text})")
            }
            _ => {
                let span = expr.span();
                self.slice(span.start, span.end).to_string()
            }
        }
    }

    fn instrument_switch(
        &mut self,
        stmt: &Stmt,
        cases: &[super::ast::SwitchCase],
        default: &Option<Block>,
    ) -> Vec<CountableUnit> {
        let span = stmt.span();
        let mut labels: Vec<BranchLabel> =
            (0..cases.len() as u32).map(BranchLabel::Case).collect();
        labels.push(BranchLabel::Default);
        let site = self.new_site(BranchKind::Switch, span.line, labels);

        let mut contributes = Vec::new();
        for (arm, case) in cases.iter().enumerate() {
            let unit = CountableUnit::branch(&self.unit, site, BranchLabel::Case(arm as u32), case.line);
            self.units.push(unit.clone());
            self.probes.push(ProbePoint {
                units: vec![unit.clone()],
                byte_offset: case.body.open + 1,
                old_text: String::new(),
                template: format!(" {}({{0}});", builtins::HIT),
            });
            contributes.push(unit);
            self.walk_block(&case.body);
        }

        match default {
            Some(body) => {
                let unit =
                    CountableUnit::branch(&self.unit, site, BranchLabel::Default, span.line);
                self.units.push(unit.clone());
                self.probes.push(ProbePoint {
                    units: vec![unit.clone()],
                    byte_offset: body.open + 1,
                    old_text: String::new(),
                    template: format!(" {}({{0}});", builtins::HIT),
                });
                contributes.push(unit);
                self.walk_block(body);
            }
            None => {
                // No default arm to probe; materialize one just before the
                // switch's closing brace so the no-match outcome is counted
                let unit =
                    CountableUnit::branch(&self.unit, site, BranchLabel::Default, span.line);
                self.units.push(unit.clone());
                self.probes.push(ProbePoint {
                    units: vec![unit.clone()],
                    byte_offset: span.end - 1,
                    old_text: String::new(),
                    template: format!("default: {{ {}({{0}}); }} ", builtins::HIT),
                });
                contributes.push(unit);
            }
        }

        contributes
    }
}
