#![allow(dead_code)]

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use vaultshift::domain::client::{ClientRecord, SubscriptionStatus};
use vaultshift::domain::transaction::{TransactionRecord, TransactionStatus, TransactionType};
use vaultshift::domain::vault::{LegacyVaultRecord, VaultStatus};

pub fn client(id: &str) -> ClientRecord {
    ClientRecord {
        client_id: id.into(),
        legal_name: format!("Client {id}"),
        email: Some(format!("{id}@example.test")),
        phone: Some("555-0100".into()),
        signup_date: Some(Utc::now() - Duration::days(800)),
        last_activity_date: None,
        last_payment_date: None,
        last_payment_amount: None,
        lifetime_value: dec!(0),
        payment_history_months: 12,
        has_payment_method: false,
        payment_method_type: None,
        successful_payments: 0,
        failed_payments: 0,
        chargebacks: 0,
        disputes: vec![],
        current_plan: None,
        legacy_plan: None,
        subscription_status: SubscriptionStatus::None,
        fraud_indicators: vec![],
        compliance_flags: vec![],
        jurisdiction: Some("US".into()),
        tos_accepted: true,
    }
}

pub fn vault_record(id: &str, email: &str, masked: &str) -> LegacyVaultRecord {
    LegacyVaultRecord {
        legacy_vault_id: id.into(),
        customer_id: format!("cust-{id}"),
        email: Some(email.into()),
        phone: Some("555-0100".into()),
        cc_number_masked: masked.into(),
        cc_exp: "1235".into(),
        card_type: Some("visa".into()),
        status: VaultStatus::Active,
        chargebacks: 0,
        signup_date: Some(Utc::now() - Duration::days(900)),
        notes: None,
        migration_batch_id: None,
    }
}

pub fn transaction(id: &str, amount: rust_decimal::Decimal) -> TransactionRecord {
    TransactionRecord {
        transaction_id: id.into(),
        legacy_transaction_id: None,
        customer_id: "cust-1".into(),
        vault_id: None,
        amount,
        currency: "USD".into(),
        transaction_type: TransactionType::Sale,
        status: TransactionStatus::Approved,
        transaction_date: Some(Utc::now() - Duration::days(30)),
        response_code: Some("100".into()),
        auth_code: Some("AUTH01".into()),
        avs_response: Some("Y".into()),
        cvv_response: Some("M".into()),
        billing_country: Some("US".into()),
        card_last_four: Some("1111".into()),
        processor_id: None,
        is_recurring: false,
    }
}
