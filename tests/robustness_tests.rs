mod common;

use common::{CANCEL_URL, RETURN_BASE, return_url, success_url};
use farepay::domain::payment::{
    CancelReason, NavigationEvent, PaymentOutcome, PaymentOutcomeResolver,
    UNDETERMINED_RESULT_MESSAGE,
};

fn resolve(urls: &[&str]) -> Option<PaymentOutcome> {
    let mut resolver = PaymentOutcomeResolver::default();
    for url in urls {
        resolver.observe(&NavigationEvent::new(*url));
    }
    resolver.outcome().cloned()
}

fn undetermined() -> Option<PaymentOutcome> {
    Some(PaymentOutcome::Failed {
        response_code: None,
        message: UNDETERMINED_RESULT_MESSAGE.to_string(),
    })
}

#[test]
fn test_return_marker_without_parameters() {
    assert_eq!(resolve(&[RETURN_BASE]), undetermined());
    assert_eq!(resolve(&[&format!("{RETURN_BASE}?garbage=1")]), undetermined());
    assert_eq!(resolve(&[&format!("{RETURN_BASE}?vnp_ResponseCode=")]), undetermined());
}

#[test]
fn test_unparseable_url_with_return_marker() {
    // Not a valid absolute URL; the query is still located after '?'.
    assert_eq!(
        resolve(&["::vnpay/return?vnp_ResponseCode=51&vnp_TransactionStatus=02"]),
        Some(PaymentOutcome::Failed {
            response_code: Some("51".to_string()),
            message: "insufficient account balance".to_string(),
        })
    );
    assert_eq!(resolve(&["::vnpay/return"]), undetermined());
}

#[test]
fn test_success_with_truncated_amount() {
    let url = return_url(&[
        ("vnp_ResponseCode", "00"),
        ("vnp_TransactionStatus", "00"),
        ("vnp_TxnRef", "ABC"),
        ("vnp_Amount", "12.5"),
    ]);
    assert_eq!(resolve(&[&url]), undetermined());
}

#[test]
fn test_success_without_reference() {
    let url = return_url(&[
        ("vnp_ResponseCode", "00"),
        ("vnp_TransactionStatus", "00"),
        ("vnp_Amount", "500000"),
    ]);
    assert_eq!(resolve(&[&url]), undetermined());
}

#[test]
fn test_cancel_ignores_everything_else() {
    let url = format!("{CANCEL_URL}?vnp_ResponseCode=00&vnp_TransactionStatus=00&vnp_Amount=1");
    assert_eq!(
        resolve(&[&url]),
        Some(PaymentOutcome::Cancelled {
            reason: CancelReason::GatewayCancel
        })
    );
}

#[test]
fn test_outcome_is_stable_after_resolution() {
    let success = success_url("ABC", 500000);
    let failure = return_url(&[
        ("vnp_ResponseCode", "51"),
        ("vnp_TransactionStatus", "02"),
    ]);

    let mut resolver = PaymentOutcomeResolver::default();
    assert!(resolver.observe(&NavigationEvent::new(&success)).is_some());
    let fixed = resolver.outcome().cloned();

    for url in [failure.as_str(), CANCEL_URL, RETURN_BASE, "about:blank"] {
        assert_eq!(resolver.observe(&NavigationEvent::new(url)), None);
        assert_eq!(resolver.outcome().cloned(), fixed);
    }
    assert!(!resolver.request_abort());
    assert_eq!(resolver.confirm_abort(), None);
    assert_eq!(resolver.force_cancel(), None);
    assert_eq!(resolver.outcome().cloned(), fixed);
}
