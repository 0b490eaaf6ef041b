use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

fn proxy() -> Command {
    let mut cmd = Command::new(cargo_bin!());
    cmd.env_remove("PAYMENT_GATEWAY")
        .env_remove("PAYMENT_ENV")
        .env_remove("ZARINPAL_MERCHANT_ID")
        .env_remove("ZIBAL_MERCHANT_ID")
        .env_remove("BASE_URL")
        .env_remove("ERROR_REDIRECT_URL");
    cmd
}

#[test]
fn test_unknown_gateway_fails_at_startup() {
    proxy()
        .args(["--gateway", "paypal", "--bind", "127.0.0.1:0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'paypal' is not supported"));
}

#[test]
fn test_production_requires_merchant_id() {
    proxy()
        .args(["--gateway", "zibal", "--payment-env", "production"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ZIBAL_MERCHANT_ID must be set"));
}

#[test]
fn test_invalid_base_url_fails_at_startup() {
    proxy()
        .args(["--base-url", "ftp://pay.example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must use http or https"));
}

#[test]
fn test_malformed_merchant_file_fails_at_startup() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "id,name,domain,api_key,active").unwrap();
    writeln!(csv, "one,Shop,shop.example,key-1,true").unwrap();

    proxy()
        .arg("--merchants")
        .arg(csv.path())
        .args(["--bind", "127.0.0.1:0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CSV error"));
}
