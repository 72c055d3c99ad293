use super::entities::{ProfitRequest, ProfitResult, ProfitSign};

/// Full cost/revenue breakdown for one crafting attempt.
///
/// Return bonus scales material spend down proportionally; tax is taken off
/// the gross sale price. Margin is relative to the gross sale price and is 0
/// when there is no sale price. Out-of-range percentages are not clamped and
/// may drive derived values negative.
pub fn calculate(request: &ProfitRequest) -> ProfitResult {
    let total_material_cost: f64 = request.materials.iter().map(|m| m.cost()).sum();
    let net_material_cost = total_material_cost * (1.0 - request.return_bonus_percent / 100.0);
    let total_cost = net_material_cost + request.fees.crafting_fee + request.fees.setup_fee;

    let tax_amount = request.sale_price * (request.tax_rate_percent / 100.0);
    let net_sale_price = request.sale_price - tax_amount;
    let net_profit = net_sale_price - total_cost;

    let profit_margin = if request.sale_price > 0.0 {
        (net_profit / request.sale_price) * 100.0
    } else {
        0.0
    };

    ProfitResult {
        materials: request.materials.clone(),
        fees: request.fees,
        return_bonus_percent: request.return_bonus_percent,
        sale_price: request.sale_price,
        tax_rate_percent: request.tax_rate_percent,
        total_material_cost,
        net_material_cost,
        total_cost,
        tax_amount,
        net_sale_price,
        net_profit,
        profit_margin,
        sign: profit_sign(net_profit),
    }
}

/// Exactly zero is break-even. NaN is reported as break-even as well since it
/// is neither a gain nor a loss.
pub fn profit_sign(net_profit: f64) -> ProfitSign {
    if net_profit > 0.0 {
        ProfitSign::Profit
    } else if net_profit < 0.0 {
        ProfitSign::Loss
    } else {
        ProfitSign::BreakEven
    }
}
