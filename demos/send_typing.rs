use std::error::Error;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use worklane_sdk::realtime::client::{RealtimeClient, RealtimeConfig};
use worklane_sdk::realtime::proto::EventKind;

fn main() -> Result<(), Box<dyn Error>> {
    let token = "REPLACE_WITH_AUTH_TOKEN".to_string();
    let conversation_id = "REPLACE_WITH_CONVERSATION_ID".to_string();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let client = RealtimeClient::new(RealtimeConfig::from_env());

        let connected = {
            let (tx, rx) = tokio::sync::oneshot::channel();
            let tx = std::sync::Mutex::new(Some(tx));
            client.on(EventKind::ConnectionEstablished, move |_| {
                if let Ok(mut guard) = tx.lock() {
                    if let Some(tx) = guard.take() {
                        let _ = tx.send(());
                    }
                }
            });
            rx
        };

        client.connect(SecretString::new(token));
        let _ = connected.await;

        client.send(EventKind::TypingStart, json!({}), Some(conversation_id.clone()));
        tokio::time::sleep(Duration::from_secs(2)).await;
        client.send(EventKind::TypingStop, json!({}), Some(conversation_id));

        client.disconnect();
    });

    Ok(())
}
