//! Portfolio valuation in DESO nanos

use super::{CatalogObject, RefreshCost, Shape, BASE_COIN_PKID};
use crate::annotation::Annotation;

fn cc_balance_totals() -> CatalogObject {
    CatalogObject::materialized("statistic_cc_balance_totals", Shape::Keyed, RefreshCost::Heavy)
        .key(&["pkid"])
        .depends_on(&["cc_nanos_total_sell_value"])
        .reads(&["balance_entry", "profile_entry"])
        .body(
            r#"
SELECT be.hodler_pkid AS pkid,
    COALESCE(SUM(cc_nanos_total_sell_value(
        be.balance_nanos,
        pe.deso_locked_nanos,
        pe.cc_coins_in_circulation_nanos
    )), 0) AS cc_value_nanos
FROM balance_entry be
JOIN profile_entry pe ON pe.pkid = be.creator_pkid
WHERE be.is_dao_coin = false
    AND be.balance_nanos > 0
    AND be.balance_nanos <= pe.cc_coins_in_circulation_nanos
GROUP BY be.hodler_pkid"#,
        )
        .annotate(Annotation::Omit)
}

/// Each held NFT is worth its best open bid, or what its serials last sold for
fn nft_balance_totals() -> CatalogObject {
    CatalogObject::materialized("statistic_nft_balance_totals", Shape::Keyed, RefreshCost::Heavy)
        .key(&["pkid"])
        .reads(&["nft_entry", "nft_bid_entry"])
        .body(
            r#"
SELECT pkid, COALESCE(SUM(post_value), 0) AS nft_value_nanos
FROM (
    SELECT ne.owner_pkid AS pkid,
        ne.nft_post_hash,
        COALESCE(MAX(nbe.bid_amount_nanos), AVG(ne.last_accepted_bid_amount_nanos)) AS post_value
    FROM nft_entry ne
    LEFT JOIN nft_bid_entry nbe
        ON nbe.nft_post_hash = ne.nft_post_hash
        AND nbe.serial_number = ne.serial_number
    WHERE ne.is_pending = false
    GROUP BY ne.owner_pkid, ne.nft_post_hash
) held
GROUP BY pkid"#,
        )
        .annotate(Annotation::Omit)
}

/// DAO coin holdings at the market price against the base coin.
/// Balances are in 1e-18 coin units and prices in DESO per coin.
fn deso_token_balance_totals() -> CatalogObject {
    CatalogObject::materialized(
        "statistic_deso_token_balance_totals",
        Shape::Keyed,
        RefreshCost::Medium,
    )
    .key(&["pkid"])
    .depends_on(&["dao_coin_limit_order_bid_asks"])
    .reads(&["balance_entry"])
    .body(format!(
        r#"
SELECT be.hodler_pkid AS pkid,
    COALESCE(SUM(be.balance_nanos * ba.market_price / 1e9), 0) AS deso_token_value_nanos
FROM balance_entry be
JOIN dao_coin_limit_order_bid_asks ba
    ON ba.buying_creator_pkid = be.creator_pkid
    AND ba.selling_creator_pkid = '{}'
WHERE be.is_dao_coin = true
GROUP BY be.hodler_pkid"#,
        BASE_COIN_PKID
    ))
    .annotate(Annotation::Omit)
}

fn portfolio_value() -> CatalogObject {
    CatalogObject::materialized("statistic_portfolio_value", Shape::Keyed, RefreshCost::Medium)
        .key(&["public_key"])
        .depends_on(&[
            "statistic_cc_balance_totals",
            "statistic_nft_balance_totals",
            "statistic_deso_token_balance_totals",
        ])
        .reads(&["account", "deso_balance_entry"])
        .body(
            r#"
SELECT a.public_key,
    COALESCE(dbe.balance_nanos, 0) AS deso_balance_nanos,
    COALESCE(cc.cc_value_nanos, 0) AS cc_value_nanos,
    COALESCE(nft.nft_value_nanos, 0) AS nft_value_nanos,
    COALESCE(token.deso_token_value_nanos, 0) AS deso_token_value_nanos,
    COALESCE(dbe.balance_nanos, 0)
        + COALESCE(cc.cc_value_nanos, 0)
        + COALESCE(nft.nft_value_nanos, 0)
        + COALESCE(token.deso_token_value_nanos, 0) AS total_value_nanos
FROM account a
LEFT JOIN deso_balance_entry dbe ON dbe.public_key = a.public_key
LEFT JOIN statistic_cc_balance_totals cc ON cc.pkid = a.pkid
LEFT JOIN statistic_nft_balance_totals nft ON nft.pkid = a.pkid
LEFT JOIN statistic_deso_token_balance_totals token ON token.pkid = a.pkid"#,
        )
        .annotate(Annotation::name("portfolioValueStat"))
        .annotate(Annotation::unique(&["public_key"]))
        .annotate(Annotation::OmitAll)
        .annotate(Annotation::account_relation("public_key", "portfolioValueStats"))
}

pub fn objects() -> Vec<CatalogObject> {
    vec![
        cc_balance_totals(),
        nft_balance_totals(),
        deso_token_balance_totals(),
        portfolio_value(),
    ]
}
