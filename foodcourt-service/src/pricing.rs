use bigdecimal::BigDecimal;

pub fn line_total(price: &BigDecimal, quantity: i32) -> BigDecimal {
    price * &BigDecimal::from(quantity)
}

/// Sums `price × quantity` over the given lines.
pub fn total<'a, I>(lines: I) -> BigDecimal
where
    I: IntoIterator<Item = (&'a BigDecimal, i32)>,
{
    lines
        .into_iter()
        .map(|(price, quantity)| line_total(price, quantity))
        .fold(BigDecimal::from(0), |acc, amount| acc + amount)
}
