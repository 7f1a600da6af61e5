//! Live best-bid / best-ask views over the open DAO coin order book.
//!
//! Prices are DESO per whole coin. Scaled rates carry a 1e38 factor, DAO coins
//! have 1e18 base units and DESO has 1e9 nanos: a bid rate divides by 1e29, an
//! ask rate is inverted and multiplied by 1e47.

use super::{CatalogObject, Shape};
use crate::annotation::Annotation;

const BID_OPERATION: u8 = 2;
const ASK_OPERATION: u8 = 1;

pub fn objects() -> Vec<CatalogObject> {
    let max_bids = CatalogObject::view("dao_coin_limit_order_max_bids", Shape::Keyed)
        .reads(&["dao_coin_limit_order_entry"])
        .body(format!(
            r#"
SELECT
    selling_dao_coin_creator_pkid AS selling_creator_pkid,
    buying_dao_coin_creator_pkid AS buying_creator_pkid,
    MAX(scaled_exchange_rate_coins_to_sell_per_coin_to_buy_numeric) / 1e29 AS max_bid_price,
    SUM(quantity_to_fill_in_base_units_numeric) AS bid_quantity
FROM dao_coin_limit_order_entry
WHERE operation_type = {}
GROUP BY selling_dao_coin_creator_pkid, buying_dao_coin_creator_pkid"#,
            BID_OPERATION
        ))
        .annotate(Annotation::Omit);

    let min_asks = CatalogObject::view("dao_coin_limit_order_min_asks", Shape::Keyed)
        .reads(&["dao_coin_limit_order_entry"])
        .body(format!(
            r#"
SELECT
    selling_dao_coin_creator_pkid AS selling_creator_pkid,
    buying_dao_coin_creator_pkid AS buying_creator_pkid,
    MIN(1 / NULLIF(scaled_exchange_rate_coins_to_sell_per_coin_to_buy_numeric, 0) * 1e47) AS min_ask_price,
    SUM(quantity_to_fill_in_base_units_numeric) AS ask_quantity
FROM dao_coin_limit_order_entry
WHERE operation_type = {}
GROUP BY selling_dao_coin_creator_pkid, buying_dao_coin_creator_pkid"#,
            ASK_OPERATION
        ))
        .annotate(Annotation::Omit);

    // an ask on (X -> Y) mirrors a bid on (Y -> X)
    let bid_asks = CatalogObject::view("dao_coin_limit_order_bid_asks", Shape::Keyed)
        .depends_on(&["dao_coin_limit_order_max_bids", "dao_coin_limit_order_min_asks"])
        .body(
            r#"
SELECT
    bids.selling_creator_pkid,
    bids.buying_creator_pkid,
    bids.max_bid_price,
    bids.bid_quantity,
    asks.min_ask_price,
    asks.ask_quantity,
    (bids.max_bid_price + asks.min_ask_price) / 2 AS market_price
FROM dao_coin_limit_order_max_bids bids
JOIN dao_coin_limit_order_min_asks asks
    ON asks.selling_creator_pkid = bids.buying_creator_pkid
    AND asks.buying_creator_pkid = bids.selling_creator_pkid"#,
        )
        .annotate(Annotation::Omit);

    vec![max_bids, min_asks, bid_asks]
}
