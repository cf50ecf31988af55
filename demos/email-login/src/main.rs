use std::sync::{Arc, Mutex};

use docgate::prelude::*;
use docgate::{init_tracing, Snapshot};
use serde_json::json;

// ---------------------------------------------------------------------------
// Email delivery stand-in
// ---------------------------------------------------------------------------

/// Where a real deployment would send mail. Here the "inbox" is a vector.
#[derive(Default, Clone)]
struct Outbox(Arc<Mutex<Vec<(String, String)>>>);

impl Outbox {
    fn send_link(&self, email: &str, token: &str) {
        let link = format!("https://app.example.com/login?token={token}");
        tracing::info!(%email, "login link sent");
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((email.to_string(), link));
    }

    fn token_for(&self, email: &str) -> Option<String> {
        let sent = self.0.lock().unwrap_or_else(|e| e.into_inner());
        sent.iter()
            .rev()
            .find(|(to, _)| to == email)
            .and_then(|(_, link)| link.split("token=").nth(1))
            .map(str::to_string)
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), DocgateError> {
    init_tracing("info,docgate_store=debug");

    let docgate = Docgate::builder().build(MemoryStore::new(), MemoryIdentityProvider::new());
    let outbox = Outbox::default();

    // Print every pending login as it is written or consumed.
    let _watch = docgate
        .documents()
        .watch_collection("sessions", |snap: Snapshot| {
            let state = if snap.exists() { "pending" } else { "consumed" };
            let id = snap.id();
            println!("login {} is {state}", id.get(..8).unwrap_or(id));
        })
        .await?;

    // Step 1: somebody types their email into the login form.
    let email = "ada@example.com";
    let mut extra = Fields::new();
    extra.insert("redirect".into(), json!("/dashboard"));
    let ticket = docgate.initiate(email, Some(extra)).await?;
    println!("uid {} (new user: {})", ticket.uid, ticket.created);
    outbox.send_link(email, &ticket.token);

    // Step 2: they click the link.
    let Some(token) = outbox.token_for(email) else {
        println!("no link was sent to {email}");
        return Ok(());
    };
    let confirmation = docgate.confirm(&token, &ticket.uid, Some("203.0.113.7")).await?;
    println!(
        "signed in, session valid until {} (ip {:?})",
        confirmation.session.expires_at, confirmation.session.ip
    );

    // Following the same link again is rejected.
    match docgate.confirm(&token, &ticket.uid, None).await {
        Err(err) => println!("second click rejected: {err}"),
        Ok(_) => println!("second click unexpectedly accepted"),
    }

    // Store a profile and read it back by email.
    docgate
        .documents()
        .set_document(
            format!("users/{}", ticket.uid),
            json!({"name": "Ada", "visits": 1}).as_object().cloned().unwrap_or_default(),
            false,
        )
        .await?;
    docgate
        .documents()
        .increment_field(format!("users/{}", ticket.uid), "visits", 1)
        .await?;
    docgate
        .documents()
        .server_timestamp_field(format!("users/{}", ticket.uid), "last_login")
        .await?;
    println!("profile: {:?}", docgate.user_data(email).await?);

    // Point the client at a fresh database: the old data stays behind.
    docgate.sessions().switch_database(MemoryStore::new()).await;
    println!("after switch: {:?}", docgate.user_data(email).await?);

    Ok(())
}
