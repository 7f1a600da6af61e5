//! Per-profile activity and earnings rollups

use super::{case_table, CatalogObject, RefreshCost, Shape};
use crate::annotation::Annotation;
use crate::txn_kind::TxnKind;

/// Nanos paid for each diamond level
pub const DIAMOND_LEVEL_NANOS: [(i64, i64); 8] = [
    (1, 50_000),
    (2, 500_000),
    (3, 5_000_000),
    (4, 50_000_000),
    (5, 500_000_000),
    (6, 5_000_000_000),
    (7, 50_000_000_000),
    (8, 450_000_000_000),
];

/// A per-public-key count and nanos sum over one transaction partition
struct ActivityLeaf {
    view: &'static str,
    kind: TxnKind,
    /// Expression yielding the public key the activity is credited to
    subject: &'static str,
    /// Extra join, `apk` is the conventional alias for affected_public_key
    join: Option<&'static str>,
    filter: &'static str,
    count: &'static str,
    count_column: &'static str,
    nanos: &'static str,
    nanos_column: &'static str,
}

const CREATOR_JOIN: &str = "JOIN affected_public_key apk ON apk.transaction_hash = t.transaction_hash AND apk.metadata = 'CreatorPublicKey'";
const BIDDER_JOIN: &str = "JOIN affected_public_key apk ON apk.transaction_hash = t.transaction_hash AND apk.metadata = 'NFTBidderPublicKeyBase58Check'";

fn activity_leaf(leaf: &ActivityLeaf) -> CatalogObject {
    let join = leaf
        .join
        .map(|j| format!("\n{}", j))
        .unwrap_or_default();
    let body = format!(
        r#"
SELECT {subject} AS public_key,
    {count} AS {count_column},
    COALESCE(SUM({nanos}), 0) AS {nanos_column}
FROM {partition} t{join}
WHERE {filter}
    AND {subject} IS NOT NULL
GROUP BY {subject}"#,
        subject = leaf.subject,
        count = leaf.count,
        count_column = leaf.count_column,
        nanos = leaf.nanos,
        nanos_column = leaf.nanos_column,
        partition = leaf.kind.partition_table(),
        join = join,
        filter = leaf.filter
    );

    let object = CatalogObject::materialized(leaf.view, Shape::Keyed, RefreshCost::Heavy)
        .key(&["public_key"])
        .reads_partition(leaf.kind)
        .body(body)
        .annotate(Annotation::Omit);
    if leaf.join.is_some() {
        object.reads(&["affected_public_key"])
    } else {
        object
    }
}

/// Outer-sums the value columns of several keyed leaves into one row per public key
fn rollup(sources: &[(&'static str, &[&'static str])], total: Option<&str>) -> String {
    let columns: Vec<&str> = sources.iter().flat_map(|(_, cols)| cols.iter().copied()).collect();

    let branches = sources
        .iter()
        .map(|(view, own)| {
            let selected = columns
                .iter()
                .map(|c| {
                    if own.contains(c) {
                        c.to_string()
                    } else {
                        format!("0 AS {}", c)
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("    SELECT public_key, {} FROM {}", selected, view)
        })
        .collect::<Vec<_>>()
        .join("\n    UNION ALL\n");

    let mut sums: Vec<String> = columns
        .iter()
        .map(|c| format!("COALESCE(SUM({c}), 0) AS {c}", c = c))
        .collect();
    if let Some(total) = total {
        sums.push(format!(
            "COALESCE(SUM({}), 0) AS {}",
            columns.join(" + "),
            total
        ));
    }

    format!(
        "SELECT public_key,\n    {}\nFROM (\n{}\n) leaves\nGROUP BY public_key",
        sums.join(",\n    "),
        branches
    )
}

fn published(object: CatalogObject, public_name: &str, reverse_name: &str) -> CatalogObject {
    object
        .annotate(Annotation::name(public_name))
        .annotate(Annotation::unique(&["public_key"]))
        .annotate(Annotation::OmitAll)
        .annotate(Annotation::account_relation("public_key", reverse_name))
}

fn transactions() -> CatalogObject {
    let object = CatalogObject::materialized(
        "statistic_profile_transactions",
        Shape::Keyed,
        RefreshCost::Heavy,
    )
    .key(&["public_key"])
    .reads(&["transaction"])
    .body(
        r#"
SELECT public_key,
    COUNT(*) AS count,
    COALESCE(SUM(fee_nanos), 0) AS total_fees,
    MIN(timestamp) AS first_transaction_timestamp,
    MAX(timestamp) AS latest_transaction_timestamp
FROM transaction
GROUP BY public_key"#,
    )
    .after_create(
        "CREATE INDEX statistic_profile_transactions_latest_idx ON statistic_profile_transactions (latest_transaction_timestamp DESC)",
    );
    published(object, "profileTransactionStat", "transactionStats")
}

fn top_nft_owners() -> CatalogObject {
    CatalogObject::materialized(
        "statistic_profile_top_nft_owners",
        Shape::Keyed,
        RefreshCost::Heavy,
    )
    .key(&["public_key", "owner_public_key"])
    .reads(&["nft_entry", "post_entry", "account"])
    .body(
        r#"
SELECT pe.poster_public_key AS public_key,
    owner.public_key AS owner_public_key,
    owner.username AS owner_username,
    COUNT(DISTINCT ne.nft_post_hash) AS nft_count
FROM nft_entry ne
JOIN post_entry pe ON pe.post_hash = ne.nft_post_hash
JOIN account owner ON owner.pkid = ne.owner_pkid
WHERE ne.is_pending = false
GROUP BY pe.poster_public_key, owner.public_key, owner.username"#,
    )
    .annotate(Annotation::name("profileNftTopOwnerStat"))
    .annotate(Annotation::unique(&["public_key", "owner_public_key"]))
    .annotate(Annotation::OmitAll)
    .annotate(Annotation::account_relation("public_key", "nftTopOwnerStats"))
}

fn diamonds(view: &'static str, pkid_column: &str) -> CatalogObject {
    CatalogObject::materialized(view, Shape::Keyed, RefreshCost::Heavy)
        .key(&["pkid"])
        .reads(&["diamond_entry"])
        .body(format!(
            r#"
SELECT {column} AS pkid,
    COUNT(*) AS diamond_count,
    COALESCE(SUM({tiers}), 0) AS diamond_nanos
FROM diamond_entry
GROUP BY {column}"#,
            column = pkid_column,
            tiers = case_table("diamond_level", &DIAMOND_LEVEL_NANOS)
        ))
        .annotate(Annotation::Omit)
}

const EARNING_LEAVES: &[ActivityLeaf] = &[
    // the part of a buy that is not locked into the curve is the founder reward
    ActivityLeaf {
        view: "statistic_profile_cc_royalties",
        kind: TxnKind::CreatorCoin,
        subject: "apk.public_key",
        join: Some(CREATOR_JOIN),
        filter: "t.tx_index_metadata ->> 'OperationType' = 'buy'",
        count: "COUNT(*)",
        count_column: "cc_royalty_count",
        nanos: "(t.tx_index_metadata ->> 'DeSoToSellNanos')::NUMERIC - (t.tx_index_metadata ->> 'DESOLockedNanosDiff')::NUMERIC",
        nanos_column: "cc_royalty_nanos",
    },
    ActivityLeaf {
        view: "statistic_profile_nft_bid_royalty_earnings",
        kind: TxnKind::AcceptNftBid,
        subject: "t.tx_index_metadata ->> 'CreatorPublicKeyBase58Check'",
        join: None,
        filter: "(t.tx_index_metadata ->> 'CreatorRoyaltyNanos')::NUMERIC > 0",
        count: "COUNT(*)",
        count_column: "nft_bid_royalty_count",
        nanos: "(t.tx_index_metadata ->> 'CreatorRoyaltyNanos')::NUMERIC",
        nanos_column: "nft_bid_royalty_nanos",
    },
    ActivityLeaf {
        view: "statistic_profile_nft_buy_now_royalty_earnings",
        kind: TxnKind::NftBid,
        subject: "t.tx_index_metadata ->> 'CreatorPublicKeyBase58Check'",
        join: None,
        filter: "t.tx_index_metadata ->> 'IsBuyNowBid' = 'true' AND (t.tx_index_metadata ->> 'CreatorRoyaltyNanos')::NUMERIC > 0",
        count: "COUNT(*)",
        count_column: "nft_buy_now_royalty_count",
        nanos: "(t.tx_index_metadata ->> 'CreatorRoyaltyNanos')::NUMERIC",
        nanos_column: "nft_buy_now_royalty_nanos",
    },
];

fn diamond_earnings() -> CatalogObject {
    let object = CatalogObject::materialized(
        "statistic_profile_diamond_earnings",
        Shape::Keyed,
        RefreshCost::Light,
    )
    .key(&["public_key"])
    .depends_on(&["statistic_profile_diamonds_received"])
    .reads(&["account"])
    .body(
        r#"
SELECT a.public_key, received.diamond_count, received.diamond_nanos AS diamond_earnings_nanos
FROM statistic_profile_diamonds_received received
JOIN account a ON a.pkid = received.pkid"#,
    );
    published(object, "profileDiamondEarningsStat", "diamondEarningsStats")
}

fn earnings() -> CatalogObject {
    let sources: &[(&'static str, &[&'static str])] = &[
        ("statistic_profile_diamond_earnings", &["diamond_earnings_nanos"]),
        ("statistic_profile_cc_royalties", &["cc_royalty_nanos"]),
        ("statistic_profile_nft_bid_royalty_earnings", &["nft_bid_royalty_nanos"]),
        ("statistic_profile_nft_buy_now_royalty_earnings", &["nft_buy_now_royalty_nanos"]),
    ];
    let views: Vec<&'static str> = sources.iter().map(|(v, _)| *v).collect();

    let object = CatalogObject::materialized(
        "statistic_profile_earnings",
        Shape::Keyed,
        RefreshCost::Light,
    )
    .key(&["public_key"])
    .depends_on(&views)
    .body(rollup(sources, Some("total_earnings_nanos")));
    published(object, "profileEarningsStat", "earningsStats")
}

const BREAKDOWN_LEAVES: &[ActivityLeaf] = &[
    ActivityLeaf {
        view: "statistic_profile_cc_buyers",
        kind: TxnKind::CreatorCoin,
        subject: "apk.public_key",
        join: Some(CREATOR_JOIN),
        filter: "t.tx_index_metadata ->> 'OperationType' = 'buy'",
        count: "COUNT(DISTINCT t.public_key)",
        count_column: "cc_buyer_count",
        nanos: "(t.tx_index_metadata ->> 'DeSoToSellNanos')::NUMERIC",
        nanos_column: "cc_buy_nanos",
    },
    ActivityLeaf {
        view: "statistic_profile_cc_sellers",
        kind: TxnKind::CreatorCoin,
        subject: "apk.public_key",
        join: Some(CREATOR_JOIN),
        filter: "t.tx_index_metadata ->> 'OperationType' = 'sell'",
        count: "COUNT(DISTINCT t.public_key)",
        count_column: "cc_seller_count",
        nanos: "(t.tx_index_metadata ->> 'DeSoToAddNanos')::NUMERIC",
        nanos_column: "cc_sell_nanos",
    },
    ActivityLeaf {
        view: "statistic_profile_nft_bid_buys",
        kind: TxnKind::AcceptNftBid,
        subject: "apk.public_key",
        join: Some(BIDDER_JOIN),
        filter: "true",
        count: "COUNT(*)",
        count_column: "nft_bid_buy_count",
        nanos: "(t.tx_index_metadata ->> 'BidAmountNanos')::NUMERIC",
        nanos_column: "nft_bid_buy_nanos",
    },
    ActivityLeaf {
        view: "statistic_profile_nft_bid_sales",
        kind: TxnKind::AcceptNftBid,
        subject: "t.public_key",
        join: None,
        filter: "true",
        count: "COUNT(*)",
        count_column: "nft_bid_sale_count",
        nanos: "(t.tx_index_metadata ->> 'BidAmountNanos')::NUMERIC",
        nanos_column: "nft_bid_sale_nanos",
    },
    ActivityLeaf {
        view: "statistic_profile_nft_buy_now_buys",
        kind: TxnKind::NftBid,
        subject: "t.public_key",
        join: None,
        filter: "t.tx_index_metadata ->> 'IsBuyNowBid' = 'true'",
        count: "COUNT(*)",
        count_column: "nft_buy_now_buy_count",
        nanos: "(t.tx_index_metadata ->> 'BidAmountNanos')::NUMERIC",
        nanos_column: "nft_buy_now_buy_nanos",
    },
    ActivityLeaf {
        view: "statistic_profile_nft_buy_now_sales",
        kind: TxnKind::NftBid,
        subject: "t.tx_index_metadata ->> 'OwnerPublicKeyBase58Check'",
        join: None,
        filter: "t.tx_index_metadata ->> 'IsBuyNowBid' = 'true'",
        count: "COUNT(*)",
        count_column: "nft_buy_now_sale_count",
        nanos: "(t.tx_index_metadata ->> 'BidAmountNanos')::NUMERIC",
        nanos_column: "nft_buy_now_sale_nanos",
    },
];

/// Orders placed by each transactor with the quantity matched for them
fn token_orders(
    view: &'static str,
    operation_type: u8,
    filled_key: &str,
    count_column: &str,
    filled_column: &str,
) -> CatalogObject {
    let limit_order = TxnKind::DaoCoinLimitOrder;
    let body = format!(
        r#"
SELECT t.public_key,
    COUNT(DISTINCT t.transaction_hash) AS {count_column},
    COALESCE(SUM(hex_to_numeric(fill.value ->> '{filled_key}')), 0) AS {filled_column}
FROM {partition} t
LEFT JOIN LATERAL jsonb_array_elements(
    CASE
        WHEN jsonb_typeof(t.tx_index_metadata -> 'FilledDAOCoinLimitOrdersMetadata') = 'array'
            THEN t.tx_index_metadata -> 'FilledDAOCoinLimitOrdersMetadata'
        ELSE '[]'::JSONB
    END
) AS fill(value) ON fill.value ->> 'TransactorPublicKeyBase58Check' = t.public_key
WHERE t.txn_meta ->> 'OperationType' = '{operation_type}'
GROUP BY t.public_key"#,
        count_column = count_column,
        filled_key = filled_key,
        filled_column = filled_column,
        partition = limit_order.partition_table(),
        operation_type = operation_type
    );

    CatalogObject::materialized(view, Shape::Keyed, RefreshCost::Heavy)
        .key(&["public_key"])
        .depends_on(&["hex_to_numeric"])
        .reads_partition(limit_order)
        .body(body)
        .annotate(Annotation::Omit)
}

fn earnings_breakdown_counts() -> CatalogObject {
    let sources: &[(&'static str, &[&'static str])] = &[
        ("statistic_profile_cc_buyers", &["cc_buyer_count", "cc_buy_nanos"]),
        ("statistic_profile_cc_sellers", &["cc_seller_count", "cc_sell_nanos"]),
        ("statistic_profile_nft_bid_buys", &["nft_bid_buy_count", "nft_bid_buy_nanos"]),
        ("statistic_profile_nft_bid_sales", &["nft_bid_sale_count", "nft_bid_sale_nanos"]),
        (
            "statistic_profile_nft_buy_now_buys",
            &["nft_buy_now_buy_count", "nft_buy_now_buy_nanos"],
        ),
        (
            "statistic_profile_nft_buy_now_sales",
            &["nft_buy_now_sale_count", "nft_buy_now_sale_nanos"],
        ),
        (
            "statistic_profile_deso_token_buy_orders",
            &["token_buy_order_count", "token_buy_order_nanos_filled"],
        ),
        (
            "statistic_profile_deso_token_sell_orders",
            &["token_sell_order_count", "token_sell_order_nanos_filled"],
        ),
    ];
    let views: Vec<&'static str> = sources.iter().map(|(v, _)| *v).collect();

    let object = CatalogObject::materialized(
        "statistic_profile_earnings_breakdown_counts",
        Shape::Keyed,
        RefreshCost::Light,
    )
    .key(&["public_key"])
    .depends_on(&views)
    .body(rollup(sources, None));
    published(object, "profileEarningsBreakdownStat", "earningsBreakdownStats")
}

pub fn objects() -> Vec<CatalogObject> {
    let mut objects = vec![
        transactions(),
        top_nft_owners(),
        diamonds("statistic_profile_diamonds_given", "sender_pkid"),
        diamonds("statistic_profile_diamonds_received", "receiver_pkid"),
        diamond_earnings(),
    ];
    objects.extend(EARNING_LEAVES.iter().map(activity_leaf));
    objects.push(earnings());
    objects.extend(BREAKDOWN_LEAVES.iter().map(activity_leaf));
    objects.push(token_orders(
        "statistic_profile_deso_token_buy_orders",
        2,
        "CoinQuantityInBaseUnitsBought",
        "token_buy_order_count",
        "token_buy_order_nanos_filled",
    ));
    objects.push(token_orders(
        "statistic_profile_deso_token_sell_orders",
        1,
        "CoinQuantityInBaseUnitsSold",
        "token_sell_order_count",
        "token_sell_order_nanos_filled",
    ));
    objects.push(earnings_breakdown_counts());
    objects
}
