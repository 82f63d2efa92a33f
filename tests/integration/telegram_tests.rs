//! Telegram delivery tests
//!
//! The notifier posts to a local Bot API stand-in configured through
//! `notifications.telegram.api_url`.

use ethers::types::U256;

use whale_sentinel::config::TelegramNotificationConfig;
use whale_sentinel::models::{Alert, AlertKind};
use whale_sentinel::notifications::{NotificationEvent, NotificationService, TelegramNotifier};

use crate::support::stub;
use crate::support::{TOKEN, WALLET};

const BOT_TOKEN: &str = "4242-test-token";

fn notifier(api_url: &str, chat_id: &str) -> TelegramNotifier {
    TelegramNotifier::new(&TelegramNotificationConfig {
        bot_token: BOT_TOKEN.to_string(),
        chat_id: chat_id.to_string(),
        api_url: api_url.to_string(),
        ..TelegramNotificationConfig::default()
    })
    .unwrap()
}

fn purchase(label: Option<&str>) -> NotificationEvent {
    NotificationEvent::TokenPurchase {
        alert: Alert {
            wallet: WALLET.to_string(),
            token: TOKEN.to_string(),
            symbol: "PEPE".to_string(),
            amount: U256::from(1_000u64),
            tx_hash: "0xfeed".to_string(),
            kind: AlertKind::FirstPurchase,
            first_seen: 1_700_000_000,
        },
        label: label.map(str::to_string),
    }
}

#[tokio::test]
async fn test_purchase_delivered_as_html() {
    let (url, sent) = stub::telegram(BOT_TOKEN, "-100").await;
    let telegram = notifier(&url, "-100");

    telegram.notify(purchase(Some("early buyer"))).await.unwrap();

    let sent = sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["parse_mode"], "HTML");
    assert_eq!(sent[0]["disable_notification"], false);
    let text = sent[0]["text"].as_str().unwrap();
    assert!(text.contains(&format!("Wallet: {} (early buyer)", WALLET)));
    assert!(text.contains("PEPE"));
}

#[tokio::test]
async fn test_rejected_message_is_an_error() {
    let (url, sent) = stub::telegram(BOT_TOKEN, "-100").await;
    let telegram = notifier(&url, "-999");

    let err = telegram.notify(purchase(None)).await.unwrap_err();
    assert!(err.to_string().contains("chat not found"));
    assert!(sent.lock().is_empty());
}

#[tokio::test]
async fn test_transport_error_hides_bot_token() {
    let telegram = notifier("http://127.0.0.1:1", "-100");

    let err = telegram.notify(purchase(None)).await.unwrap_err();
    assert!(!err.to_string().contains(BOT_TOKEN));
}
