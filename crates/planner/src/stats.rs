use budgetlens_core::Money;
use rust_decimal::Decimal;

/// Arithmetic mean, exact in decimal. Zero for an empty slice.
pub fn mean(totals: &[Money]) -> Decimal {
    if totals.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Money = totals.iter().sum();
    sum.to_decimal() / Decimal::from(totals.len())
}

pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Standard deviation over mean; defined as 0 when the mean is 0.
pub fn coefficient_of_variation(totals: &[Money]) -> f64 {
    let values: Vec<f64> = totals.iter().map(|m| m.to_f64()).collect();
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    population_std_dev(&values) / mean
}

/// True when the latest `trend_months` totals never go down, or any month
/// exceeds `spike_factor` times the average. Needs at least two months.
///
/// Flat spending passes the trend check since each month is `>=` the last.
pub fn detect_overspending(totals: &[Money], trend_months: usize, spike_factor: Decimal) -> bool {
    if totals.len() < 2 {
        return false;
    }

    let recent = &totals[totals.len().saturating_sub(trend_months)..];
    let non_decreasing = recent.windows(2).all(|pair| pair[1] >= pair[0]);

    let threshold = mean(totals) * spike_factor;
    let has_spike = totals.iter().any(|t| t.to_decimal() > threshold);

    non_decreasing || has_spike
}
