//! Top-10 leaderboards over the last 30 days

use super::{CatalogObject, RefreshCost, Shape, BASE_COIN_PKID};
use crate::annotation::Annotation;
use crate::txn_kind::TxnKind;

pub const LEADERBOARD_SIZE: usize = 10;

/// One social signal counted per poster
struct SocialSignal {
    view: &'static str,
    kind: TxnKind,
    /// Key in `tx_index_metadata` holding the hex hash of the post acted on
    post_hash_key: &'static str,
    filter: &'static str,
    column: &'static str,
}

const SOCIAL_SIGNALS: &[SocialSignal] = &[
    SocialSignal {
        view: "statistic_social_leaderboard_likes",
        kind: TxnKind::Like,
        post_hash_key: "PostHashHex",
        filter: "t.tx_index_metadata ->> 'IsUnlike' = 'false'",
        column: "like_count",
    },
    SocialSignal {
        view: "statistic_social_leaderboard_reactions",
        kind: TxnKind::CreatePostAssociation,
        post_hash_key: "PostHashHex",
        filter: "t.tx_index_metadata ->> 'AssociationType' = 'REACTION'",
        column: "reaction_count",
    },
    SocialSignal {
        view: "statistic_social_leaderboard_diamonds",
        kind: TxnKind::BasicTransfer,
        post_hash_key: "PostHashHex",
        filter: "t.tx_index_metadata ->> 'DiamondLevel' IS NOT NULL",
        column: "diamond_count",
    },
    SocialSignal {
        view: "statistic_social_leaderboard_reposts",
        kind: TxnKind::SubmitPost,
        post_hash_key: "RepostedPostHashHex",
        filter: "COALESCE(t.tx_index_metadata ->> 'RepostedPostHashHex', '') <> ''",
        column: "repost_count",
    },
    SocialSignal {
        view: "statistic_social_leaderboard_comments",
        kind: TxnKind::SubmitPost,
        post_hash_key: "ParentPostHashHex",
        filter: "COALESCE(t.tx_index_metadata ->> 'ParentPostHashHex', '') <> ''",
        column: "comment_count",
    },
];

fn social_signal(signal: &SocialSignal) -> CatalogObject {
    let body = format!(
        r#"
SELECT pe.poster_public_key, COUNT(*) AS {column}
FROM {partition} t
JOIN post_entry pe ON pe.post_hash = t.tx_index_metadata ->> '{key}'
WHERE t.timestamp > NOW() - INTERVAL '30 days'
    AND {filter}
GROUP BY pe.poster_public_key
ORDER BY {column} DESC, pe.poster_public_key
LIMIT {limit}"#,
        column = signal.column,
        partition = signal.kind.partition_table(),
        key = signal.post_hash_key,
        filter = signal.filter,
        limit = LEADERBOARD_SIZE
    );

    CatalogObject::materialized(signal.view, Shape::Keyed, RefreshCost::Medium)
        .key(&["poster_public_key"])
        .reads_partition(signal.kind)
        .reads(&["post_entry"])
        .body(body)
        .annotate(Annotation::Omit)
}

/// Sums the five signals per poster and keeps posters that have a profile
fn social_leaderboard() -> CatalogObject {
    let branches = SOCIAL_SIGNALS
        .iter()
        .map(|signal| {
            let columns = SOCIAL_SIGNALS
                .iter()
                .map(|other| {
                    if other.column == signal.column {
                        other.column.to_string()
                    } else {
                        format!("0 AS {}", other.column)
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("        SELECT poster_public_key, {} FROM {}", columns, signal.view)
        })
        .collect::<Vec<_>>()
        .join("\n        UNION ALL\n");

    let sums = SOCIAL_SIGNALS
        .iter()
        .map(|s| format!("SUM({c}) AS {c}", c = s.column))
        .collect::<Vec<_>>()
        .join(",\n        ");
    let total = SOCIAL_SIGNALS
        .iter()
        .map(|s| s.column)
        .collect::<Vec<_>>()
        .join(" + ");
    let selected = SOCIAL_SIGNALS
        .iter()
        .map(|s| format!("totals.{}", s.column))
        .collect::<Vec<_>>()
        .join(", ");

    let body = format!(
        r#"
WITH totals AS (
    SELECT poster_public_key,
        {sums},
        SUM({total}) AS total_count
    FROM (
{branches}
    ) signals
    GROUP BY poster_public_key
)
SELECT pe.public_key, pe.username, {selected}, totals.total_count
FROM totals
JOIN profile_entry pe ON pe.public_key = totals.poster_public_key
ORDER BY totals.total_count DESC, pe.public_key
LIMIT {limit}"#,
        sums = sums,
        total = total,
        branches = branches,
        selected = selected,
        limit = LEADERBOARD_SIZE
    );

    let views: Vec<&'static str> = SOCIAL_SIGNALS.iter().map(|s| s.view).collect();
    CatalogObject::materialized("statistic_social_leaderboard", Shape::Keyed, RefreshCost::Light)
        .key(&["public_key"])
        .depends_on(&views)
        .reads(&["profile_entry"])
        .body(body)
        .annotate(Annotation::name("socialLeaderboardStat"))
        .annotate(Annotation::unique(&["public_key"]))
        .annotate(Annotation::account_relation("public_key", "socialLeaderboardStats"))
}

fn nft_leaderboard() -> CatalogObject {
    let accept_bid = TxnKind::AcceptNftBid;
    let body = format!(
        r#"
SELECT pe.public_key, pe.username,
    SUM((t.tx_index_metadata ->> 'BidAmountNanos')::NUMERIC) AS total_bid_amount_nanos
FROM {partition} t
JOIN nft_entry ne
    ON ne.nft_post_hash = t.tx_index_metadata ->> 'NFTPostHashHex'
    AND ne.serial_number = (t.tx_index_metadata ->> 'SerialNumber')::BIGINT
JOIN profile_entry pe ON pe.pkid = ne.owner_pkid
WHERE t.timestamp > NOW() - INTERVAL '30 days'
GROUP BY pe.public_key, pe.username
ORDER BY total_bid_amount_nanos DESC, pe.public_key
LIMIT {limit}"#,
        partition = accept_bid.partition_table(),
        limit = LEADERBOARD_SIZE
    );

    CatalogObject::materialized("statistic_nft_leaderboard", Shape::Keyed, RefreshCost::Medium)
        .key(&["public_key", "username"])
        .reads_partition(accept_bid)
        .reads(&["nft_entry", "profile_entry"])
        .body(body)
        .annotate(Annotation::name("nftLeaderboardStat"))
        .annotate(Annotation::unique(&["public_key", "username"]))
        .annotate(Annotation::account_relation("public_key", "nftLeaderboardStats"))
}

/// Scores bid orders paying the base coin.
///
/// A limit order scores the quantity that actually filled (order quantity minus
/// what is still open in the book) at its limit price. An immediate-or-cancel
/// order (`FillType = '2'`) scores its quantity. An order named by any
/// `CancelOrderID` in the window scores nothing, whatever the cancelling
/// transaction's operation type.
fn defi_leaderboard() -> CatalogObject {
    let limit_order = TxnKind::DaoCoinLimitOrder;
    let body = format!(
        r#"
WITH orders AS (
    SELECT
        t.transaction_hash AS order_id,
        t.public_key AS buying_public_key,
        NULLIF(t.txn_meta ->> 'CancelOrderID', '') AS cancel_order_id,
        t.txn_meta ->> 'FillType' AS fill_type,
        hex_to_numeric(t.txn_meta ->> 'QuantityToFillInBaseUnits') AS quantity,
        hex_to_numeric(t.txn_meta ->> 'ScaledExchangeRateCoinsToSellPerCoinToBuy') AS scaled_rate
    FROM {partition} t
    WHERE t.timestamp > NOW() - INTERVAL '30 days'
        AND t.tx_index_metadata ->> 'SellingDAOCoinCreatorPublicKey' = '{base}'
        AND t.txn_meta ->> 'OperationType' = '2'
),
cancelled AS (
    SELECT DISTINCT t.txn_meta ->> 'CancelOrderID' AS cancel_order_id
    FROM {partition} t
    WHERE t.timestamp > NOW() - INTERVAL '30 days'
        AND NULLIF(t.txn_meta ->> 'CancelOrderID', '') IS NOT NULL
),
scored AS (
    SELECT
        o.buying_public_key,
        CASE
            WHEN o.cancel_order_id IS NOT NULL OR c.cancel_order_id IS NOT NULL THEN 0
            WHEN o.fill_type = '2' THEN o.quantity
            ELSE (o.quantity - COALESCE(open_order.quantity_to_fill_in_base_units_numeric, 0))
                * o.scaled_rate / 1e38
        END AS score
    FROM orders o
    LEFT JOIN cancelled c ON c.cancel_order_id = o.order_id
    LEFT JOIN dao_coin_limit_order_entry open_order ON open_order.order_id = o.order_id
)
SELECT buying_public_key, SUM(score) AS score
FROM scored
GROUP BY buying_public_key
ORDER BY score DESC, buying_public_key
LIMIT {limit}"#,
        partition = limit_order.partition_table(),
        base = BASE_COIN_PKID,
        limit = LEADERBOARD_SIZE
    );

    CatalogObject::materialized("statistic_defi_leaderboard", Shape::Keyed, RefreshCost::Medium)
        .key(&["buying_public_key"])
        .depends_on(&["hex_to_numeric"])
        .reads_partition(limit_order)
        .reads(&["dao_coin_limit_order_entry"])
        .body(body)
        .annotate(Annotation::name("defiLeaderboardStat"))
        .annotate(Annotation::unique(&["buying_public_key"]))
        .annotate(Annotation::foreign_key(
            &["buying_public_key"],
            "account",
            &["public_key"],
            "defiLeaderboardStats",
            "account",
        ))
}

pub fn objects() -> Vec<CatalogObject> {
    let mut objects: Vec<CatalogObject> = SOCIAL_SIGNALS.iter().map(social_signal).collect();
    objects.push(social_leaderboard());
    objects.push(nft_leaderboard());
    objects.push(defi_leaderboard());
    objects
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_leaderboard_is_capped_at_ten() {
        for board in objects() {
            assert!(board.body.trim_end().ends_with("LIMIT 10"), "{}", board.name);
        }
    }

    #[test]
    fn social_leaderboard_unions_all_signals() {
        let board = social_leaderboard();
        assert_eq!(board.depends_on.len(), 5);
        assert_eq!(board.body.matches("UNION ALL").count(), 4);
        assert!(board.body.contains(
            "SELECT poster_public_key, 0 AS like_count, reaction_count, 0 AS diamond_count, 0 AS repost_count, 0 AS comment_count FROM statistic_social_leaderboard_reactions"
        ));
        assert!(board
            .body
            .contains("JOIN profile_entry pe ON pe.public_key = totals.poster_public_key"));
    }

    #[test]
    fn likes_exclude_unlikes() {
        let likes = social_signal(&SOCIAL_SIGNALS[0]);
        assert!(likes.body.contains("FROM transaction_partition_10 t"));
        assert!(likes.body.contains("'IsUnlike' = 'false'"));
    }

    #[test]
    fn defi_score_zeroes_cancellations() {
        let board = defi_leaderboard();
        assert!(board
            .body
            .contains("WHEN o.cancel_order_id IS NOT NULL OR c.cancel_order_id IS NOT NULL THEN 0"));
        assert!(board.body.contains("WHEN o.fill_type = '2' THEN o.quantity"));
    }

    #[test]
    fn cancellations_come_from_every_limit_order_transaction() {
        let body = defi_leaderboard().body;
        let cancelled = &body[body.find("cancelled AS (").unwrap()..body.find("scored AS (").unwrap()];
        assert!(cancelled.contains("FROM transaction_partition_26 t"));
        assert!(!cancelled.contains("FROM orders"));
        assert!(!cancelled.contains("OperationType"));
    }
}
