//! One-row dashboard over every scalar counter

use super::{CatalogObject, Shape};
use crate::annotation::Annotation;

/// Counter views and the value column each contributes, in column order
pub const DASHBOARD_COUNTERS: [(&str, &str); 19] = [
    ("statistic_txn_count_all", "count"),
    ("statistic_txn_count_30_d", "count"),
    ("statistic_block_height_current", "height"),
    ("statistic_txn_count_pending", "count"),
    ("statistic_txn_fee_1_d", "fee_nanos"),
    ("statistic_total_supply", "total_supply"),
    ("statistic_post_count", "count"),
    ("statistic_post_longform_count", "count"),
    ("statistic_comment_count", "count"),
    ("statistic_repost_count", "count"),
    ("statistic_txn_count_creator_coin", "count"),
    ("statistic_txn_count_nft", "count"),
    ("statistic_txn_count_dex", "count"),
    ("statistic_txn_count_social", "count"),
    ("statistic_follow_count", "count"),
    ("statistic_message_count", "count"),
    ("statistic_wallet_count_all", "count"),
    ("statistic_new_wallet_count_30_d", "count"),
    ("statistic_active_wallet_count_30_d", "count"),
];

/// Dashboard column for a counter view: the view name without its prefix
pub fn column_name(view: &str) -> &str {
    view.strip_prefix("statistic_").unwrap_or(view)
}

pub fn objects() -> Vec<CatalogObject> {
    let columns = DASHBOARD_COUNTERS
        .iter()
        .map(|(view, value)| {
            let alias = column_name(view);
            format!("{alias}.{value} AS {alias}", alias = alias, value = value)
        })
        .collect::<Vec<_>>()
        .join(",\n    ");

    let sources = DASHBOARD_COUNTERS
        .iter()
        .map(|(view, _)| format!("{} {}", view, column_name(view)))
        .collect::<Vec<_>>()
        .join("\nCROSS JOIN ");

    let views: Vec<&'static str> = DASHBOARD_COUNTERS.iter().map(|(view, _)| *view).collect();
    vec![CatalogObject::view("statistic_dashboard", Shape::Singleton)
        .depends_on(&views)
        .body(format!("SELECT\n    {}\nFROM {}", columns, sources))
        .annotate(Annotation::name("dashboardStat"))]
}
