//! Auxiliary table and helper functions the statistics are built on

use super::CatalogObject;
use crate::annotation::Annotation;
use crate::txn_kind::PARTITION_COUNT;

pub const FIRST_TRANSACTION_TABLE: &str = "public_key_first_transaction";

/// Reserve ratio of the creator coin bonding curve
pub const CREATOR_COIN_RESERVE_RATIO: &str = "0.3333333";

/// Fee taken on creator coin sells, in basis points
pub const CREATOR_COIN_TRADE_FEE_BASIS_POINTS: u32 = 100;

/// Earliest block each public key appears in, optionally only above the stored watermark
fn first_appearance_insert(above_watermark: bool) -> String {
    let watermark = if above_watermark {
        "\n    WHERE b.timestamp > (SELECT COALESCE(MAX(timestamp), '-infinity'::TIMESTAMP) FROM public_key_first_transaction)"
    } else {
        ""
    };
    format!(
        r#"INSERT INTO public_key_first_transaction (public_key, timestamp, height)
    SELECT apk.public_key, MIN(b.timestamp), MIN(b.height)
    FROM affected_public_key apk
    JOIN transaction t ON t.transaction_hash = apk.transaction_hash
    JOIN block b ON b.block_hash = t.block_hash{}
    GROUP BY apk.public_key
    ON CONFLICT (public_key) DO NOTHING"#,
        watermark
    )
}

pub fn first_transaction_objects() -> Vec<CatalogObject> {
    let table = CatalogObject::table(FIRST_TRANSACTION_TABLE)
        .reads(&["affected_public_key", "transaction", "block"])
        .body(
            r#"
CREATE TABLE public_key_first_transaction (
    public_key VARCHAR PRIMARY KEY,
    timestamp TIMESTAMP NOT NULL,
    height BIGINT NOT NULL
)"#,
        )
        .after_create(
            "CREATE INDEX public_key_first_transaction_timestamp_idx ON public_key_first_transaction (timestamp DESC)",
        )
        .after_create(first_appearance_insert(false))
        .annotate(Annotation::Omit);

    // Additive only: keys are inserted once and never corrected afterwards.
    let top_up = CatalogObject::function("refresh_public_key_first_transaction", "")
        .depends_on(&[FIRST_TRANSACTION_TABLE])
        .reads(&["affected_public_key", "transaction", "block"])
        .body(format!(
            r#"
CREATE OR REPLACE FUNCTION refresh_public_key_first_transaction() RETURNS VOID AS $$
BEGIN
    {};
END;
$$ LANGUAGE plpgsql"#,
            first_appearance_insert(true)
        ))
        .annotate(Annotation::Omit);

    vec![table, top_up]
}

pub fn function_objects() -> Vec<CatalogObject> {
    let transaction_count = CatalogObject::function("get_transaction_count", "INT")
        .reads(&["pg_class"])
        .body(format!(
            r#"
CREATE OR REPLACE FUNCTION get_transaction_count(transaction_type INT) RETURNS BIGINT AS $$
DECLARE
    estimate BIGINT;
BEGIN
    IF transaction_type < 1 OR transaction_type > {max} THEN
        RAISE EXCEPTION 'transaction type % is outside 1..{max}', transaction_type
            USING ERRCODE = 'invalid_parameter_value';
    END IF;

    SELECT reltuples::BIGINT INTO estimate
    FROM pg_class
    WHERE relname = 'transaction_partition_' || LPAD(transaction_type::TEXT, 2, '0');

    RETURN estimate;
END;
$$ LANGUAGE plpgsql STABLE"#,
            max = PARTITION_COUNT
        ))
        .annotate(Annotation::Omit);

    let sell_value = CatalogObject::function(
        "cc_nanos_total_sell_value",
        "NUMERIC, NUMERIC, NUMERIC",
    )
    .body(format!(
        r#"
CREATE OR REPLACE FUNCTION cc_nanos_total_sell_value(
    amount_nanos NUMERIC,
    deso_locked_nanos NUMERIC,
    coins_in_circulation_nanos NUMERIC
) RETURNS NUMERIC AS $$
    SELECT deso_locked_nanos
        * (1 - POWER(1 - amount_nanos / coins_in_circulation_nanos, 1 / {ratio}))
        * (10000 - {fee}) / 10000;
$$ LANGUAGE sql IMMUTABLE"#,
        ratio = CREATOR_COIN_RESERVE_RATIO,
        fee = CREATOR_COIN_TRADE_FEE_BASIS_POINTS
    ))
    .annotate(Annotation::Omit);

    // 256-bit quantities are serialized as 0x-prefixed hex in transaction JSON
    let hex_to_numeric = CatalogObject::function("hex_to_numeric", "TEXT")
        .body(
            r#"
CREATE OR REPLACE FUNCTION hex_to_numeric(hex TEXT) RETURNS NUMERIC AS $$
DECLARE
    digits TEXT := lower(regexp_replace(hex, '^0[xX]', ''));
    result NUMERIC := 0;
    i INT;
BEGIN
    IF digits !~ '^[0-9a-f]+$' THEN
        RAISE EXCEPTION 'invalid hex quantity %', hex
            USING ERRCODE = 'invalid_parameter_value';
    END IF;

    FOR i IN 1..length(digits) LOOP
        result := result * 16 + (position(substr(digits, i, 1) IN '0123456789abcdef') - 1);
    END LOOP;

    RETURN result;
END;
$$ LANGUAGE plpgsql IMMUTABLE STRICT"#,
        )
        .annotate(Annotation::Omit);

    vec![transaction_count, sell_value, hex_to_numeric]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_up_is_gated_by_watermark() {
        let objects = first_transaction_objects();
        let top_up = &objects[1];
        assert!(top_up.body.contains("WHERE b.timestamp > (SELECT COALESCE(MAX(timestamp)"));
        assert!(top_up.body.contains("ON CONFLICT (public_key) DO NOTHING"));

        let bootstrap = &objects[0].post_create[1];
        assert!(!bootstrap.contains("MAX(timestamp)"));
        assert!(bootstrap.starts_with("INSERT INTO public_key_first_transaction"));
    }

    #[test]
    fn transaction_count_checks_range() {
        let body = &function_objects()[0].body;
        assert!(body.contains("transaction_type < 1 OR transaction_type > 33"));
        assert!(body.contains("invalid_parameter_value"));
        assert!(body.contains("LPAD(transaction_type::TEXT, 2, '0')"));
    }

    #[test]
    fn sell_value_applies_curve_and_fee() {
        let body = &function_objects()[1].body;
        assert!(body.contains("1 / 0.3333333"));
        assert!(body.contains("(10000 - 100) / 10000"));
        assert!(body.contains("IMMUTABLE"));
    }
}
