//! CPLEX LP text export.
//!
//! Used to persist conflicting sub-models for inspection. The output reads in
//! any solver that accepts the LP format.

use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::model::{LinearExpr, Model, Sense, VarDomain};

/// Replace characters the LP format does not allow in names. Brackets are
/// reserved for quadratic terms, so index brackets become parentheses.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '[' => '(',
            ']' => ')',
            c if c.is_ascii_alphanumeric() || "_.{}!\"#$%&()/,;?@'`|~".contains(c) => c,
            _ => '_',
        })
        .collect()
}

fn format_number(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn format_expr(model: &Model, expr: &LinearExpr) -> String {
    if expr.is_empty() {
        // LP needs at least one term on the left; reuse the first variable with weight 0.
        return match model.variables().first() {
            Some(var) => format!("0 {}", sanitize(&var.name)),
            None => "0".to_string(),
        };
    }
    let mut out = String::new();
    for (i, &(var, coef)) in expr.terms().iter().enumerate() {
        let sign = match (i, coef < 0.0) {
            (0, true) => "-",
            (0, false) => "",
            (_, true) => "- ",
            (_, false) => "+ ",
        };
        if !out.is_empty() {
            out.push(' ');
        }
        let name = sanitize(&model.variable(var).name);
        let magnitude = coef.abs();
        if magnitude == 1.0 {
            let _ = write!(out, "{}{}", sign, name);
        } else {
            let _ = write!(out, "{}{} {}", sign, format_number(magnitude), name);
        }
    }
    out
}

/// Render a model as LP text.
pub fn to_lp_string(model: &Model) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\\ Model {}", model.name);
    out.push_str(match model.sense() {
        Sense::Minimize => "Minimize\n",
        Sense::Maximize => "Maximize\n",
    });
    let objective = model.objective();
    let _ = write!(out, " obj: {}", format_expr(model, objective));
    let constant = objective.constant_term();
    if constant != 0.0 {
        let _ = write!(out, " {} {}", if constant < 0.0 { "-" } else { "+" }, format_number(constant.abs()));
    }
    out.push('\n');

    out.push_str("Subject To\n");
    for (_, c) in model.constraints() {
        let _ = writeln!(
            out,
            " {}: {} {} {}",
            sanitize(&c.name),
            format_expr(model, &c.expr),
            c.relation.symbol(),
            format_number(c.rhs)
        );
    }

    out.push_str("Bounds\n");
    for var in model.variables().iter().filter(|v| v.domain != VarDomain::Binary) {
        let name = sanitize(&var.name);
        let lower = if var.lower.is_finite() { format_number(var.lower) } else { "-inf".to_string() };
        let upper = if var.upper.is_finite() { format_number(var.upper) } else { "+inf".to_string() };
        let _ = writeln!(out, " {} <= {} <= {}", lower, name, upper);
    }

    let generals: Vec<String> = model
        .variables()
        .iter()
        .filter(|v| v.domain == VarDomain::Integer)
        .map(|v| sanitize(&v.name))
        .collect();
    if !generals.is_empty() {
        let _ = writeln!(out, "Generals\n {}", generals.join(" "));
    }
    let binaries: Vec<String> = model
        .variables()
        .iter()
        .filter(|v| v.domain == VarDomain::Binary)
        .map(|v| sanitize(&v.name))
        .collect();
    if !binaries.is_empty() {
        let _ = writeln!(out, "Binaries\n {}", binaries.join(" "));
    }
    out.push_str("End\n");
    out
}

/// Write a model as an LP file.
pub fn write_lp<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(to_lp_string(model).as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Relation;

    #[test]
    fn test_lp_sections() {
        let mut model = Model::new("lp");
        let x = model.binary("X[0,1]").unwrap();
        let n = model.declare_variable("lease 0", VarDomain::Integer, 0.0, 8.0).unwrap();
        let mut objective = LinearExpr::from_terms(vec![(x, 100.0), (n, 50.0)]);
        objective.add_constant(400.0);
        model.set_objective(objective, Sense::Minimize).unwrap();
        model
            .add_constraint("lease_0", LinearExpr::from_terms(vec![(n, 1.0), (x, -1.0)]), Relation::Ge, -2.0)
            .unwrap();

        let text = to_lp_string(&model);
        assert!(text.contains("Minimize\n obj: 100 X(0,1) + 50 lease_0 + 400"));
        assert!(text.contains(" lease_0: -X(0,1) + lease_0 >= -2"));
        assert!(text.contains(" 0 <= lease_0 <= 8"));
        assert!(text.contains("Generals\n lease_0"));
        assert!(text.contains("Binaries\n X(0,1)"));
        assert!(!text.contains('[') && !text.contains(']'));
        assert!(text.ends_with("End\n"));
    }
}
