#![allow(dead_code)]

use std::io::Write;
use tempfile::NamedTempFile;

pub const RETURN_BASE: &str = "https://api.example.com/api/vnpay/return";
pub const CANCEL_URL: &str = "https://api.example.com/api/vnpay/cancel";
pub const CHECKOUT_PAGE: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html?vnp_TxnRef=ABC";

/// Builds a return redirect carrying the given gateway parameters.
pub fn return_url(params: &[(&str, &str)]) -> String {
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{RETURN_BASE}?{query}")
}

pub fn success_url(txn_ref: &str, amount_minor: u64) -> String {
    let amount = amount_minor.to_string();
    return_url(&[
        ("vnp_ResponseCode", "00"),
        ("vnp_TransactionStatus", "00"),
        ("vnp_TxnRef", txn_ref),
        ("vnp_Amount", &amount),
        ("vnp_BankCode", "NCB"),
        ("vnp_PayDate", "20240101120000"),
    ])
}

/// Writes one URL per line to a temporary file for `farepay resolve --events`.
pub fn events_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();
    file
}

/// Base URL of a local port that was just released, so nothing answers on it.
pub fn closed_api_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}
