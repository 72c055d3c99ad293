//! Plain-text rendering of a profit breakdown.

use std::fmt::Write;

use crate::domain::{ProfitResult, ProfitSign};

const LABEL_WIDTH: usize = 28;
const VALUE_WIDTH: usize = 14;

/// Whole silver with thousands separators: `25600.4` -> `25,600`.
pub fn format_silver(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn render_breakdown(result: &ProfitResult, item_name: &str) -> String {
    let mut out = String::new();
    let title = if item_name.trim().is_empty() {
        "Crafting result"
    } else {
        item_name
    };

    let sign_prefix = if result.sign == ProfitSign::Profit { "+" } else { "" };
    let _ = writeln!(out, "{title}: {}", result.sign.label());
    let _ = writeln!(
        out,
        "Net profit: {sign_prefix}{} ({:.2}% margin)",
        format_silver(result.net_profit),
        result.profit_margin
    );
    out.push('\n');

    out.push_str("Cost breakdown\n");
    line(&mut out, "  Materials", result.total_material_cost);
    for material in result.materials.iter().filter(|m| !m.name.trim().is_empty()) {
        line(
            &mut out,
            &format!("    {} x{}", material.name, material.quantity),
            material.cost(),
        );
    }
    line(
        &mut out,
        &format!("  Return bonus ({}%)", result.return_bonus_percent),
        result.net_material_cost - result.total_material_cost,
    );
    line(&mut out, "  Net material cost", result.net_material_cost);
    line(&mut out, "  Crafting fee", result.fees.crafting_fee);
    line(&mut out, "  Setup fee", result.fees.setup_fee);
    line(&mut out, "  Total cost", result.total_cost);
    out.push('\n');

    out.push_str("Revenue\n");
    line(&mut out, "  Sale price", result.sale_price);
    line(
        &mut out,
        &format!("  Tax ({}%)", result.tax_rate_percent),
        -result.tax_amount,
    );
    line(&mut out, "  Net sale price", result.net_sale_price);

    out
}

fn line(out: &mut String, label: &str, value: f64) {
    let _ = writeln!(
        out,
        "{:<lw$}{:>vw$}",
        label,
        format_silver(value),
        lw = LABEL_WIDTH,
        vw = VALUE_WIDTH
    );
}
