use std::collections::HashMap;

use serde::Serialize;

use crate::market::types::Quote;

/// One static holding valued by the portfolio endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct Holding {
    pub name: String,
    pub pair: String,
    pub amount: f64,
    pub buy_price: f64,
    pub color: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ValuedHolding {
    #[serde(flatten)]
    pub holding: Holding,
    pub current_price: f64,
    pub current_value: f64,
    pub profit_loss: f64,
    pub profit_rate: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PortfolioView {
    pub total_value: f64,
    pub assets: Vec<ValuedHolding>,
}

/// Value a list of holdings against the latest cached quotes.
///
/// A pair with no cached quote yet is valued at its buy price, so the
/// endpoint degrades to a flat position instead of erroring.
pub fn value_portfolio(holdings: &[Holding], quotes: &HashMap<String, Quote>) -> PortfolioView {
    let mut total_value = 0.0;
    let mut assets = Vec::with_capacity(holdings.len());

    for h in holdings {
        let current_price = quotes.get(&h.pair).map(|q| q.price).unwrap_or(h.buy_price);

        let invested = h.buy_price * h.amount;
        let current_value = current_price * h.amount;
        let profit_loss = current_value - invested;
        let profit_rate = if invested > 0.0 {
            profit_loss / invested * 100.0
        } else {
            0.0
        };

        total_value += current_value;
        assets.push(ValuedHolding {
            holding: h.clone(),
            current_price,
            current_value,
            profit_loss,
            profit_rate,
        });
    }

    PortfolioView {
        total_value,
        assets,
    }
}

/// Demo holdings served until real account data exists.
pub fn demo_holdings() -> Vec<Holding> {
    [
        ("비트코인", "KRW-BTC", 0.5, 95_000_000.0, "#f59e0b"),
        ("이더리움", "KRW-ETH", 10.0, 3_200_000.0, "#6366f1"),
        ("솔라나", "KRW-SOL", 150.0, 140_000.0, "#14b8a6"),
        ("리플", "KRW-XRP", 5000.0, 850.0, "#3b82f6"),
    ]
    .into_iter()
    .map(|(name, pair, amount, buy_price, color)| Holding {
        name: name.to_string(),
        pair: pair.to_string(),
        amount,
        buy_price,
        color: color.to_string(),
    })
    .collect()
}
