/// Property-based tests using proptest
/// Tests invariants that should hold for any uploaded report
use proptest::prelude::*;
use std::collections::HashSet;

use lead_qualifier::currency::{format_brl, parse_brl};
use lead_qualifier::messaging::{format_first_name, phone_digits, whatsapp_link};
use lead_qualifier::models::{FilterPolicy, LeadRecord, QualifyOptions};
use lead_qualifier::qualifier::{normalize_orders_sent, qualify_records};

fn record_strategy() -> impl Strategy<Value = LeadRecord> {
    (
        "[1-9]",
        "[a-zà-ú ]{0,12}",
        "\\(?[0-9]{2}\\)? ?9?[0-9]{4}-?[0-9]{4}",
        prop::sample::select(vec!["0", "1", "2", "", "abc", "0.0"]),
        prop::sample::select(vec!["Pedido Salvo", "Entregue", "Cancelado"]),
        "[0-9]{1,5}",
        "(R\\$ )?[0-9]{1,3}(\\.[0-9]{3})?,[0-9]{2}",
    )
        .prop_map(|(id, name, phone, sent, status, order, value)| LeadRecord {
            customer_id: id,
            customer_name: name,
            phone,
            orders_sent_count: sent.to_string(),
            status: status.to_string(),
            order_id: order,
            total_value: value,
        })
}

fn policy_strategy() -> impl Strategy<Value = FilterPolicy> {
    prop::sample::select(vec![FilterPolicy::FirstOccurrence, FilterPolicy::StrictCustomer])
}

// Property: qualified output respects the business rule
proptest! {
    #[test]
    fn output_has_unique_customers(
        records in prop::collection::vec(record_strategy(), 0..40),
        policy in policy_strategy()
    ) {
        let options = QualifyOptions { policy, ..QualifyOptions::default() };
        let outcome = qualify_records(&records, &options);

        let mut ids = HashSet::new();
        for lead in &outcome.leads {
            prop_assert!(ids.insert(lead.lead_key.clone()), "duplicate id {}", lead.lead_key);
        }
    }

    #[test]
    fn output_rows_satisfy_filter(
        records in prop::collection::vec(record_strategy(), 0..40),
        policy in policy_strategy()
    ) {
        let options = QualifyOptions { policy, ..QualifyOptions::default() };
        let outcome = qualify_records(&records, &options);

        for lead in &outcome.leads {
            prop_assert_eq!(lead.record.status.as_str(), "Pedido Salvo");
            prop_assert_eq!(normalize_orders_sent(&lead.record.orders_sent_count), 0);

            // Each output row is the first row seen for its customer
            let first = records.iter().find(|r| r.customer_id == lead.lead_key).unwrap();
            prop_assert_eq!(first, &lead.record);

            if policy == FilterPolicy::StrictCustomer {
                prop_assert!(records
                    .iter()
                    .filter(|r| r.customer_id == lead.lead_key)
                    .all(|r| r.status == "Pedido Salvo"));
            }
        }
    }

    #[test]
    fn metrics_add_up(
        records in prop::collection::vec(record_strategy(), 0..40),
        policy in policy_strategy()
    ) {
        let options = QualifyOptions { policy, ..QualifyOptions::default() };
        let m = qualify_records(&records, &options).metrics;

        prop_assert_eq!(m.original_count, records.len());
        prop_assert_eq!(
            m.original_count,
            m.removed_duplicates + m.removed_by_filter + m.qualified_count
        );
    }

    #[test]
    fn strict_never_keeps_more_than_first_occurrence(
        records in prop::collection::vec(record_strategy(), 0..40)
    ) {
        let loose = qualify_records(&records, &QualifyOptions::default());
        let strict = qualify_records(
            &records,
            &QualifyOptions { policy: FilterPolicy::StrictCustomer, ..QualifyOptions::default() },
        );

        let loose_ids: HashSet<_> = loose.leads.iter().map(|l| l.lead_key.clone()).collect();
        prop_assert!(strict.leads.iter().all(|l| loose_ids.contains(&l.lead_key)));
    }

    #[test]
    fn qualify_is_pure(records in prop::collection::vec(record_strategy(), 0..20)) {
        let options = QualifyOptions::default();
        prop_assert_eq!(qualify_records(&records, &options), qualify_records(&records, &options));
    }
}

// Property: value formatting never panics and degrades to the input
proptest! {
    #[test]
    fn format_brl_never_panics(value in "\\PC*") {
        let formatted = format_brl(&value);
        if parse_brl(&value).is_none() {
            prop_assert_eq!(formatted, value);
        } else {
            prop_assert!(formatted.starts_with("R$ "));
        }
    }

    #[test]
    fn brazilian_amounts_render_with_two_decimals(
        int in 0u32..1_000_000u32,
        cents in 0u32..100u32
    ) {
        let raw = format!("{},{:02}", int, cents);
        prop_assert_eq!(format_brl(&raw), format!("R$ {},{:02}", int, cents));
    }

    #[test]
    fn first_name_never_empty(name in "\\PC*") {
        prop_assert!(!format_first_name(&name).is_empty());
    }
}

// Property: links only ever contain URL-safe characters
proptest! {
    #[test]
    fn link_is_url_safe(phone in "\\PC*", message in "\\PC*") {
        let link = whatsapp_link(&phone, &message, "55");
        let expected_prefix = format!("https://wa.me/55{}?text=", phone_digits(&phone));

        prop_assert!(link.starts_with(&expected_prefix));
        let query = &link[expected_prefix.len()..];
        prop_assert!(query
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "%_.-~/".contains(c)));
    }
}
