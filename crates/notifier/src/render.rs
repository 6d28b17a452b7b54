//! HTML message rendering for chat notifications.

use common::text::sanitize;
use common::types::ProfitableChain;
use rust_decimal::Decimal;

/// Buckets a profit share into classes 1..=5.
pub fn profit_class(profit_share: Decimal) -> u8 {
    if profit_share < Decimal::new(102, 2) {
        1
    } else if profit_share < Decimal::new(105, 2) {
        2
    } else if profit_share < Decimal::new(110, 2) {
        3
    } else if profit_share < Decimal::new(120, 2) {
        4
    } else {
        5
    }
}

fn class_marker(class: u8) -> &'static str {
    match class {
        2 => "🔥",
        3 => "🔥🔥🔥",
        4 => "❗❗🔥",
        5 => "🚀🚀❗🔥",
        _ => "",
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Renders `chain` as an HTML chat message linking to `{details_url}/{chain_id}`.
pub fn render_chain(chain: &ProfitableChain, details_url: &str) -> String {
    let class = profit_class(chain.profit_share);

    let mut tags = vec![format!("#{}", escape(&chain.asset.0))];
    tags.extend(
        chain
            .exchange_codes
            .iter()
            .map(|code| format!("#{}", sanitize(code))),
    );
    tags.push(format!("#P{}", class));

    let path = chain
        .bids
        .iter()
        .map(|bid| {
            format!(
                "{}:{}({}, {:.5})",
                escape(&bid.src_asset.0),
                escape(&bid.trg_asset.0),
                escape(&bid.exchange_code),
                bid.rate.round_dp(5)
            )
        })
        .collect::<Vec<_>>()
        .join(" -> ");

    let profit = chain
        .profit_share
        .checked_sub(Decimal::ONE)
        .and_then(|gain| gain.checked_mul(Decimal::ONE_HUNDRED))
        .map_or_else(|| "n/a".to_string(), |pct| format!("{:.2}%", pct.round_dp(2)));

    [
        tags.join(" "),
        format!("asset: <b>{}</b>", escape(&chain.asset.0)),
        format!("{}profit: <b>{}</b>", class_marker(class), profit),
        format!("chain: {}", path),
        format!("time: {} UTC", chain.created_at.format("%H:%M:%S")),
        format!(
            "<a href=\"{}/{}\">details</a>",
            details_url.trim_end_matches('/'),
            chain.id
        ),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::types::{Asset, Bid, ChainId};
    use rust_decimal_macros::dec;

    fn bid(src: &str, trg: &str, rate: Decimal, exchange: &str) -> Bid {
        Bid {
            id: format!("{}-{}", src, trg),
            src_asset: Asset::from(src),
            trg_asset: Asset::from(trg),
            rate,
            exchange_code: exchange.to_string(),
            ..Default::default()
        }
    }

    fn chain() -> ProfitableChain {
        ProfitableChain {
            id: ChainId::from("abc123"),
            asset: Asset::from("USD"),
            profit_share: dec!(1.071),
            methods: vec!["SBP".to_string()],
            bid_assets: vec![Asset::from("USD"), Asset::from("RUB"), Asset::from("USD")],
            bids: vec![
                bid("USD", "RUB", dec!(63), "binance"),
                bid("RUB", "USD", dec!(0.017), "Bit-Nami"),
            ],
            depth: 2,
            exchange_codes: vec!["binance".to_string(), "Bit-Nami".to_string()],
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 7, 5, 9).unwrap(),
        }
    }

    #[test]
    fn test_profit_class_boundaries() {
        assert_eq!(profit_class(dec!(1.0005)), 1);
        assert_eq!(profit_class(dec!(1.02)), 2);
        assert_eq!(profit_class(dec!(1.0499)), 2);
        assert_eq!(profit_class(dec!(1.071)), 3);
        assert_eq!(profit_class(dec!(1.10)), 4);
        assert_eq!(profit_class(dec!(1.19)), 4);
        assert_eq!(profit_class(dec!(1.20)), 5);
        assert_eq!(profit_class(dec!(3)), 5);
    }

    #[test]
    fn test_render_chain() {
        let text = render_chain(&chain(), "http://localhost:8080/chains/");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "#USD #binance #bitnami #P3");
        assert_eq!(lines[1], "asset: <b>USD</b>");
        assert_eq!(lines[2], "🔥🔥🔥profit: <b>7.10%</b>");
        assert_eq!(
            lines[3],
            "chain: USD:RUB(binance, 63.00000) -> RUB:USD(Bit-Nami, 0.01700)"
        );
        assert_eq!(lines[4], "time: 07:05:09 UTC");
        assert_eq!(
            lines[5],
            "<a href=\"http://localhost:8080/chains/abc123\">details</a>"
        );
    }

    #[test]
    fn test_low_class_has_no_marker_and_markup_is_escaped() {
        let mut chain = chain();
        chain.profit_share = dec!(1.001);
        chain.bids[0].exchange_code = "<b&b>".to_string();

        let text = render_chain(&chain, "http://x");
        assert!(text.contains("\nprofit: <b>0.10%</b>"));
        assert!(text.contains("USD:RUB(&lt;b&amp;b&gt;, 63.00000)"));
        assert!(text.starts_with("#USD #binance #bitnami #P1"));
    }

    #[test]
    fn test_huge_profit_share_renders_without_percent() {
        let mut chain = chain();
        chain.profit_share = Decimal::MAX;
        chain.bids[0].rate = Decimal::MAX;

        let text = render_chain(&chain, "http://x");
        assert!(text.starts_with("#USD #binance #bitnami #P5"));
        assert!(text.contains("\n🚀🚀❗🔥profit: <b>n/a</b>\n"));
        assert!(text.contains("http://x/abc123"));
    }
}
