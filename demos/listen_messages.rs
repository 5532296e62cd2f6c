use std::error::Error;

use secrecy::SecretString;
use worklane_sdk::realtime::client::{RealtimeClient, RealtimeConfig};
use worklane_sdk::realtime::session::{MessagingSession, SessionEvent};

fn main() -> Result<(), Box<dyn Error>> {
    let token = "REPLACE_WITH_AUTH_TOKEN".to_string();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let client = RealtimeClient::new(RealtimeConfig::from_env());
        let mut session = MessagingSession::attach(&client);
        client.connect(SecretString::new(token));

        while let Some(event) = session.recv().await {
            match event {
                SessionEvent::Connected => println!("connected"),
                SessionEvent::MessageReceived(message) => {
                    println!(
                        "conversation={} from={} body={}",
                        message.conversation_id, message.sender_id, message.body
                    );
                }
                SessionEvent::UserOnline(update) => println!("online: {}", update.user_id),
                SessionEvent::UserOffline(update) => println!("offline: {}", update.user_id),
                SessionEvent::Disconnected { code, reason } => {
                    println!("disconnected code={code} reason={reason}");
                }
                _ => {}
            }
        }
    });

    Ok(())
}
